use fieldsync_storage::{DraftStore, DraftTimeEntry, StorageError};
use std::sync::Arc;
use thiserror::Error;

use crate::clock::Clock;
use crate::geofence::{GeofenceChecker, GeofenceError, GeofenceResult};
use crate::sync::SyncOrchestrator;

#[derive(Debug, Error)]
pub enum ClockInError {
    #[error("{distance_meters:.0}m from the job site, outside the {radius_meters:.0}m geofence")]
    OutsideGeofence {
        distance_meters: f64,
        radius_meters: f64,
    },

    #[error("failed to save time entry: {0}")]
    Storage(#[from] StorageError),
}

/// A queued clock-in
#[derive(Debug, Clone)]
pub struct ClockInOutcome {
    pub entry: DraftTimeEntry,
    pub geofence: Option<GeofenceResult>,
    pub warning: Option<String>, // Set when the clock-in proceeded without a location check
}

/// Location-gated clock-in that never blocks on missing data
pub struct ClockInService {
    drafts: DraftStore,
    geofence: GeofenceChecker,
    orchestrator: Arc<SyncOrchestrator>,
    clock: Arc<dyn Clock>,
}

impl ClockInService {
    #[must_use]
    pub fn new(
        drafts: DraftStore,
        geofence: GeofenceChecker,
        orchestrator: Arc<SyncOrchestrator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            drafts,
            geofence,
            orchestrator,
            clock,
        }
    }

    /// Queue a time entry for `project_id`.
    ///
    /// Only a confirmed position outside the site geofence refuses the
    /// clock-in. An unavailable position or unreadable site data lets it
    /// through with a warning and no location attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is outside the geofence or the draft cannot be saved
    pub async fn clock_in(
        &self,
        project_id: &str,
        notes: Option<String>,
    ) -> Result<ClockInOutcome, ClockInError> {
        let (geofence, warning) = match self.geofence.check_geofence(project_id).await {
            Ok(result) if !result.is_within => {
                log::warn!(
                    "Clock-in refused for project {project_id}: {:.0}m away (radius {:.0}m)",
                    result.distance_meters,
                    result.radius_meters
                );
                return Err(ClockInError::OutsideGeofence {
                    distance_meters: result.distance_meters,
                    radius_meters: result.radius_meters,
                });
            }
            Ok(result) => (Some(result), None),
            Err(GeofenceError::Position(e)) => {
                log::warn!("Clocking in without location: {e}");
                (None, Some(format!("Clocked in without location: {e}")))
            }
            Err(GeofenceError::Storage(e)) => {
                log::warn!("Site coordinate unavailable, skipping geofence: {e}");
                (None, Some(format!("Geofence not checked: {e}")))
            }
        };

        let location = geofence.map(|g| g.position.point());
        let entry = DraftTimeEntry::new(project_id.to_string(), self.clock.now(), notes, location);
        self.drafts.put(&entry).await?;
        log::info!("Queued clock-in {} for project {project_id}", entry.id);

        if let Err(e) = self.orchestrator.refresh_pending().await {
            log::warn!("Failed to refresh pending count: {e}");
        }

        Ok(ClockInOutcome {
            entry,
            geofence,
            warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::WatchConnectivity;
    use crate::geofence::PositionUnavailable;
    use crate::test_support::{memory_drafts, FakePositions, FakeRemote, FixedClock};
    use fieldsync_storage::CachedSiteCoordinate;

    fn service(
        positions: FakePositions,
        drafts: &DraftStore,
        clock: &Arc<FixedClock>,
    ) -> ClockInService {
        let orchestrator = Arc::new(SyncOrchestrator::new(
            drafts.clone(),
            Arc::new(FakeRemote::default()),
            Arc::new(WatchConnectivity::new(false)),
            clock.clone(),
        ));
        let geofence = GeofenceChecker::new(Arc::new(positions), drafts.clone(), clock.clone());
        ClockInService::new(drafts.clone(), geofence, orchestrator, clock.clone())
    }

    async fn cache_site(drafts: &DraftStore) {
        drafts
            .put(&CachedSiteCoordinate {
                project_id: "p-1".to_string(),
                latitude: 30.0,
                longitude: -95.0,
                radius_meters: Some(300.0),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clock_in_inside_geofence_records_location() {
        let drafts = memory_drafts();
        let clock = Arc::new(FixedClock::default());
        cache_site(&drafts).await;
        let service = service(FakePositions::at(30.001, -95.0, clock.now()), &drafts, &clock);

        let outcome = service
            .clock_in("p-1", Some("Framing crew".to_string()))
            .await
            .unwrap();

        assert!(outcome.warning.is_none());
        assert!(outcome.geofence.unwrap().is_within);
        assert_eq!(outcome.entry.clock_in, clock.now());
        let location = outcome.entry.location.unwrap();
        assert!((location.latitude - 30.001).abs() < f64::EPSILON);

        let stored: DraftTimeEntry = drafts.get(&outcome.entry.id).await.unwrap().unwrap();
        assert_eq!(stored, outcome.entry);
        assert_eq!(service.orchestrator.status().pending, 1);
    }

    #[tokio::test]
    async fn test_clock_in_outside_geofence_is_refused() {
        let drafts = memory_drafts();
        let clock = Arc::new(FixedClock::default());
        cache_site(&drafts).await;
        let service = service(FakePositions::at(30.005, -95.0, clock.now()), &drafts, &clock);

        let err = service.clock_in("p-1", None).await.unwrap_err();

        assert!(matches!(
            err,
            ClockInError::OutsideGeofence { distance_meters, .. } if distance_meters > 500.0
        ));
        assert_eq!(drafts.count::<DraftTimeEntry>().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clock_in_without_position_warns_and_proceeds() {
        let drafts = memory_drafts();
        let clock = Arc::new(FixedClock::default());
        cache_site(&drafts).await;
        let service = service(
            FakePositions::failing(PositionUnavailable::PermissionDenied),
            &drafts,
            &clock,
        );

        let outcome = service.clock_in("p-1", None).await.unwrap();

        assert!(outcome.entry.location.is_none());
        assert!(outcome.geofence.is_none());
        assert!(outcome.warning.unwrap().contains("permission denied"));
        assert_eq!(drafts.count::<DraftTimeEntry>().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clock_in_without_site_fails_open() {
        let drafts = memory_drafts();
        let clock = Arc::new(FixedClock::default());
        let service = service(FakePositions::at(10.0, 10.0, clock.now()), &drafts, &clock);

        let outcome = service.clock_in("new-project", None).await.unwrap();

        assert!(outcome.warning.is_none());
        assert!(outcome.geofence.unwrap().is_unchecked());
        assert!(outcome.entry.location.is_some());
    }
}
