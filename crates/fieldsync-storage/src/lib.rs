pub mod db;
pub mod drafts;
pub mod error;
pub mod migrations;
pub mod models;
pub mod store;

pub use db::SqliteStore;
pub use drafts::DraftStore;
pub use error::StorageError;
pub use models::{
    new_record_id, CachedSiteCoordinate, DraftDailyLog, DraftExpense, DraftTimeEntry, GeoPoint,
    PendingPhoto, Receipt, Record, UploadCheckpoint, WeatherData, DEFAULT_GEOFENCE_RADIUS_METERS,
};
pub use store::{KeyValueStore, Partition};
