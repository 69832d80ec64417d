use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StorageError};

/// Independently addressable collection within the local store, one per record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    TimeEntries,
    Expenses,
    DailyLogs,
    PendingPhotos,
    SiteCoordinates,
    UploadCheckpoints,
}

impl Partition {
    pub const ALL: [Self; 6] = [
        Self::TimeEntries,
        Self::Expenses,
        Self::DailyLogs,
        Self::PendingPhotos,
        Self::SiteCoordinates,
        Self::UploadCheckpoints,
    ];

    /// Partitions the sync orchestrator drains, in drain order
    pub const DRAINABLE: [Self; 3] = [Self::TimeEntries, Self::Expenses, Self::PendingPhotos];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TimeEntries => "time_entries",
            Self::Expenses => "expenses",
            Self::DailyLogs => "daily_logs",
            Self::PendingPhotos => "pending_photos",
            Self::SiteCoordinates => "site_coordinates",
            Self::UploadCheckpoints => "upload_checkpoints",
        }
    }

    /// Whether the records in this partition are user drafts that can be discarded
    #[must_use]
    pub const fn is_draft(&self) -> bool {
        matches!(
            self,
            Self::TimeEntries | Self::Expenses | Self::DailyLogs | Self::PendingPhotos
        )
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| StorageError::UnknownPartition(s.to_string()))
    }
}

/// Durable, partitioned key-value persistence.
///
/// Every operation is individually atomic. There is no multi-record
/// transaction, and `get_all` makes no promise about enumeration order.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Insert or replace the value stored under `id`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying persistence fails
    async fn put(&self, partition: Partition, id: &str, value: &[u8]) -> Result<()>;

    /// Read one value, `None` when absent
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying persistence fails
    async fn get(&self, partition: Partition, id: &str) -> Result<Option<Vec<u8>>>;

    /// Read every `(id, value)` pair in a partition
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying persistence fails
    async fn get_all(&self, partition: Partition) -> Result<Vec<(String, Vec<u8>)>>;

    /// Remove a value; removing an absent id is a no-op
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying persistence fails
    async fn delete(&self, partition: Partition, id: &str) -> Result<()>;

    /// Number of values in a partition
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying persistence fails
    async fn count(&self, partition: Partition) -> Result<usize>;
}
