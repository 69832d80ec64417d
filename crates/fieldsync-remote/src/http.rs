//! HTTP utilities for the remote client.

use crate::error::{NetworkError, Result};

/// Extension trait for `reqwest::Response` to handle common error patterns.
#[async_trait::async_trait]
pub trait ResponseExt {
    /// Ensure the response status is successful, returning an error with details if not.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Rejected`] carrying the status code and response
    /// body if the status is not 2xx.
    async fn ensure_success(self, api_name: &'static str) -> Result<Self>
    where
        Self: Sized;
}

#[async_trait::async_trait]
impl ResponseExt for reqwest::Response {
    async fn ensure_success(self, api_name: &'static str) -> Result<Self> {
        if !self.status().is_success() {
            let status = self.status().as_u16();
            let body = self.text().await.unwrap_or_default();
            return Err(NetworkError::Rejected {
                api: api_name,
                status,
                body,
            });
        }
        Ok(self)
    }
}
