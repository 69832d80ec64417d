use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Time entry as accepted by the remote system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntrySubmission {
    pub client_id: String, // Local draft id, lets the server spot replays
    pub project_id: String,
    pub clock_in: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Receipt file sent as a multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Expense as accepted by the remote system
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseSubmission {
    pub client_id: String,
    pub project_id: String,
    pub category: String,
    pub amount: f64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage: Option<f64>,
    pub incurred_at: DateTime<Utc>,
    #[serde(skip)]
    pub receipt: Option<ReceiptUpload>,
}

/// Phase (a) of a photo upload: ask for a pre-authorized target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRequest {
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: usize,
}

/// Pre-authorized location the binary payload is transferred to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub upload_url: String,
    pub file_key: String,
}

/// Phase (c) of a photo upload: tell the remote the transfer finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadCompletion {
    pub file_key: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result of a sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub total_entries: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Remote submission capability consumed by the sync orchestrator.
///
/// Every method either acknowledges success with `Ok` or fails; an `Ok`
/// is the only signal that allows a local draft to be deleted.
#[async_trait]
pub trait RemoteSubmitter: Send + Sync {
    /// Create a time entry
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected
    async fn create_time_entry(&self, entry: &TimeEntrySubmission) -> Result<()>;

    /// Create an expense, uploading the receipt alongside when present
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected
    async fn create_expense(&self, expense: &ExpenseSubmission) -> Result<()>;

    /// Request a pre-authorized upload target for a photo
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed
    async fn request_upload_target(&self, request: &UploadRequest) -> Result<UploadTarget>;

    /// Transfer the binary payload directly to the upload target
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails
    async fn transfer_payload(
        &self,
        target: &UploadTarget,
        payload: &[u8],
        content_type: &str,
    ) -> Result<()>;

    /// Notify the remote that a transfer completed
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or is rejected
    async fn complete_upload(&self, completion: &UploadCompletion) -> Result<()>;

    /// Check that the remote is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cannot be reached
    async fn probe(&self) -> Result<()>;

    /// Get the system name
    #[must_use]
    fn system_name(&self) -> &'static str;
}

impl SyncReport {
    /// Record a successful sync
    pub fn record_success(&mut self) {
        self.successful += 1;
    }

    /// Record a failed sync with error message
    pub fn record_failure(&mut self, error: String) {
        self.failed += 1;
        self.errors.push(error);
    }

    /// Check if all entries were synced successfully
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0 && self.successful == self.total_entries
    }
}
