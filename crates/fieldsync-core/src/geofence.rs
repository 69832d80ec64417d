//! Location gate for clock-in.
//!
//! The checker never blocks on missing data: a project without a cached site
//! coordinate is treated as inside its geofence, and callers are expected to
//! degrade to "no location" when the device position cannot be acquired.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldsync_storage::{CachedSiteCoordinate, DraftStore, GeoPoint, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::clock::Clock;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points, in meters
#[must_use]
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Device fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    #[must_use]
    pub const fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Options passed to the platform location API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration, // Oldest cached fix that is still acceptable
}

impl Default for PositionRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionUnavailable {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("no position fix within {0:?}")]
    Timeout(Duration),

    #[error("location is not supported on this device")]
    Unsupported,

    #[error("last position fix is {age_secs}s old")]
    Stale { age_secs: i64 },
}

/// Platform location capability
#[async_trait]
pub trait PositionProvider: Send + Sync {
    /// Acquire the current device position
    ///
    /// # Errors
    ///
    /// Returns an error if permission is denied or no fix is available
    async fn current_position(
        &self,
        request: &PositionRequest,
    ) -> Result<Position, PositionUnavailable>;
}

/// Provider returning a known fix, e.g. from an external receiver or operator input
pub struct FixedPositionProvider {
    position: Position,
}

impl FixedPositionProvider {
    #[must_use]
    pub const fn new(position: Position) -> Self {
        Self { position }
    }
}

#[async_trait]
impl PositionProvider for FixedPositionProvider {
    async fn current_position(
        &self,
        _request: &PositionRequest,
    ) -> Result<Position, PositionUnavailable> {
        Ok(self.position)
    }
}

/// Provider for devices without any location capability
pub struct UnavailablePositionProvider;

#[async_trait]
impl PositionProvider for UnavailablePositionProvider {
    async fn current_position(
        &self,
        _request: &PositionRequest,
    ) -> Result<Position, PositionUnavailable> {
        Err(PositionUnavailable::Unsupported)
    }
}

#[derive(Debug, Error)]
pub enum GeofenceError {
    #[error(transparent)]
    Position(#[from] PositionUnavailable),

    #[error("failed to read site coordinate: {0}")]
    Storage(#[from] StorageError),
}

/// Outcome of a geofence check
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeofenceResult {
    pub is_within: bool,
    pub distance_meters: f64,
    pub radius_meters: f64,
    pub position: Position,
}

impl GeofenceResult {
    /// Whether the project had no cached site and the check failed open
    #[must_use]
    pub fn is_unchecked(&self) -> bool {
        self.radius_meters <= 0.0
    }
}

/// Compares the device position with cached job-site coordinates
pub struct GeofenceChecker {
    provider: Arc<dyn PositionProvider>,
    drafts: DraftStore,
    clock: Arc<dyn Clock>,
    request: PositionRequest,
}

impl GeofenceChecker {
    #[must_use]
    pub fn new(
        provider: Arc<dyn PositionProvider>,
        drafts: DraftStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            drafts,
            clock,
            request: PositionRequest::default(),
        }
    }

    #[must_use]
    pub const fn with_request(mut self, request: PositionRequest) -> Self {
        self.request = request;
        self
    }

    /// Acquire the device position, enforcing the request timeout and maximum fix age
    ///
    /// # Errors
    ///
    /// Returns [`PositionUnavailable`] on denial, timeout, missing capability or a stale fix
    pub async fn get_current_position(&self) -> Result<Position, PositionUnavailable> {
        let request = self.request;
        let position =
            tokio::time::timeout(request.timeout, self.provider.current_position(&request))
                .await
                .map_err(|_| PositionUnavailable::Timeout(request.timeout))??;

        let age = self.clock.now() - position.timestamp;
        let max_age = chrono::Duration::from_std(request.maximum_age)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        if age > max_age {
            return Err(PositionUnavailable::Stale {
                age_secs: age.num_seconds(),
            });
        }

        Ok(position)
    }

    /// Decide whether the device is inside the project's geofence.
    ///
    /// Fails open with `is_within = true` and zero distance and radius when the
    /// project has no cached site coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if the position cannot be acquired or the store read fails
    pub async fn check_geofence(&self, project_id: &str) -> Result<GeofenceResult, GeofenceError> {
        let position = self.get_current_position().await?;

        let Some(site) = self.drafts.get::<CachedSiteCoordinate>(project_id).await? else {
            log::debug!("No cached site for project {project_id}, allowing clock-in");
            return Ok(GeofenceResult {
                is_within: true,
                distance_meters: 0.0,
                radius_meters: 0.0,
                position,
            });
        };

        let distance_meters = haversine_distance(position.point(), site.point());
        let radius_meters = site.radius();

        log::debug!(
            "Project {project_id}: {distance_meters:.1}m from site (radius {radius_meters}m, \
             accuracy {:.0}m)",
            position.accuracy_meters
        );

        Ok(GeofenceResult {
            is_within: distance_meters <= radius_meters,
            distance_meters,
            radius_meters,
            position,
        })
    }

    /// Cache a site coordinate for later offline checks
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails
    pub async fn cache_site_coordinate(
        &self,
        site: &CachedSiteCoordinate,
    ) -> Result<(), StorageError> {
        self.drafts.put(site).await
    }
}
