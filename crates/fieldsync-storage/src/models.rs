use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Partition;

/// Radius applied when a cached site coordinate carries none
pub const DEFAULT_GEOFENCE_RADIUS_METERS: f64 = 300.0;

/// A record kind persisted in exactly one partition of the local store
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const PARTITION: Partition;

    fn id(&self) -> &str;
}

/// Generate a client-side record id: creation time in milliseconds plus a random suffix
#[must_use]
pub fn new_record_id(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", at.timestamp_millis(), &suffix[..12])
}

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Clock-in recorded on the device, waiting to be submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftTimeEntry {
    pub id: String,
    pub project_id: String,
    pub clock_in: DateTime<Utc>,
    pub notes: Option<String>,
    pub location: Option<GeoPoint>,
}

impl DraftTimeEntry {
    #[must_use]
    pub fn new(
        project_id: String,
        clock_in: DateTime<Utc>,
        notes: Option<String>,
        location: Option<GeoPoint>,
    ) -> Self {
        Self {
            id: new_record_id(clock_in),
            project_id,
            clock_in,
            notes,
            location,
        }
    }
}

/// Binary receipt attached to an expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub file_name: String,
    pub content_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Expense captured in the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftExpense {
    pub id: String,
    pub project_id: String,
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub receipt: Option<Receipt>,
    pub mileage: Option<f64>,
    pub cost_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DraftExpense {
    #[must_use]
    pub fn new(
        project_id: String,
        category: String,
        amount: f64,
        description: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_record_id(timestamp),
            project_id,
            category,
            amount,
            description,
            receipt: None,
            mileage: None,
            cost_code: None,
            timestamp,
        }
    }

    #[must_use]
    pub fn with_receipt(mut self, receipt: Receipt) -> Self {
        self.receipt = Some(receipt);
        self
    }

    #[must_use]
    pub fn with_mileage(mut self, mileage: f64) -> Self {
        self.mileage = Some(mileage);
        self
    }

    #[must_use]
    pub fn with_cost_code(mut self, cost_code: String) -> Self {
        self.cost_code = Some(cost_code);
        self
    }
}

/// Structured weather observation attached to a daily log
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherData {
    pub conditions: Option<String>,
    pub temperature_c: Option<f64>,
    pub wind: Option<String>,
}

/// End-of-day site log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftDailyLog {
    pub id: String,
    pub project_id: String,
    pub log_date: NaiveDate,
    pub notes: String,
    pub weather: Option<WeatherData>,
    #[serde(default)]
    pub photo_ids: Vec<String>, // PendingPhoto ids captured alongside the log
    pub created_at: DateTime<Utc>,
}

impl DraftDailyLog {
    #[must_use]
    pub fn new(
        project_id: String,
        log_date: NaiveDate,
        notes: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_record_id(created_at),
            project_id,
            log_date,
            notes,
            weather: None,
            photo_ids: Vec::new(),
            created_at,
        }
    }
}

/// Photo waiting for the two-phase upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPhoto {
    pub id: String,
    pub project_id: String,
    pub album_id: Option<String>,
    pub file_name: String,
    pub content_type: String,
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
    pub caption: Option<String>,
    pub queued_at: DateTime<Utc>,
}

impl PendingPhoto {
    #[must_use]
    pub fn new(
        project_id: String,
        file_name: String,
        content_type: String,
        payload: Vec<u8>,
        queued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_record_id(queued_at),
            project_id,
            album_id: None,
            file_name,
            content_type,
            payload,
            caption: None,
            queued_at,
        }
    }
}

/// Job-site location cached on the device for geofence checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSiteCoordinate {
    pub project_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: Option<f64>,
}

impl CachedSiteCoordinate {
    #[must_use]
    pub const fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Geofence radius, falling back to the default when unset
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius_meters.unwrap_or(DEFAULT_GEOFENCE_RADIUS_METERS)
    }
}

/// Remote file key of a photo whose binary transfer already succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCheckpoint {
    pub photo_id: String,
    pub file_key: String,
    pub transferred_at: DateTime<Utc>,
}

impl Record for DraftTimeEntry {
    const PARTITION: Partition = Partition::TimeEntries;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for DraftExpense {
    const PARTITION: Partition = Partition::Expenses;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for DraftDailyLog {
    const PARTITION: Partition = Partition::DailyLogs;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for PendingPhoto {
    const PARTITION: Partition = Partition::PendingPhotos;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for CachedSiteCoordinate {
    const PARTITION: Partition = Partition::SiteCoordinates;

    fn id(&self) -> &str {
        &self.project_id
    }
}

impl Record for UploadCheckpoint {
    const PARTITION: Partition = Partition::UploadCheckpoints;

    fn id(&self) -> &str {
        &self.photo_id
    }
}

/// Serialize binary payloads as base64 strings inside JSON bodies
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 18, 7, 30, 0).unwrap()
    }

    #[test]
    fn test_record_id_starts_with_millis() {
        let id = new_record_id(at());
        let (millis, suffix) = id.split_once('-').unwrap();
        assert_eq!(millis, at().timestamp_millis().to_string());
        assert_eq!(suffix.len(), 12);
    }

    #[test]
    fn test_record_ids_are_not_reused() {
        let ids: HashSet<String> = (0..500).map(|_| new_record_id(at())).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_site_radius_defaults_to_300m() {
        let site = CachedSiteCoordinate {
            project_id: "p-1".to_string(),
            latitude: 30.0,
            longitude: -95.0,
            radius_meters: None,
        };
        assert!((site.radius() - 300.0).abs() < f64::EPSILON);

        let custom = CachedSiteCoordinate {
            radius_meters: Some(75.0),
            ..site
        };
        assert!((custom.radius() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_photo_payload_is_base64_in_json() {
        let photo = PendingPhoto::new(
            "p-1".to_string(),
            "slab.jpg".to_string(),
            "image/jpeg".to_string(),
            vec![0xff, 0xd8, 0xff],
            at(),
        );
        let json = serde_json::to_value(&photo).unwrap();
        assert_eq!(json["payload"], "/9j/");

        let back: PendingPhoto = serde_json::from_value(json).unwrap();
        assert_eq!(back.payload, vec![0xff, 0xd8, 0xff]);
    }

    #[test]
    fn test_daily_log_without_photo_ids_deserializes() {
        let json = serde_json::json!({
            "id": "1-abc",
            "project_id": "p-1",
            "log_date": "2024-03-18",
            "notes": "Poured footings",
            "weather": null,
            "created_at": "2024-03-18T17:00:00Z"
        });
        let log: DraftDailyLog = serde_json::from_value(json).unwrap();
        assert!(log.photo_ids.is_empty());
    }
}
