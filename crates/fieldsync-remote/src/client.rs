use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{NetworkError, Result};
use crate::http::ResponseExt;
use crate::traits::{
    ExpenseSubmission, RemoteSubmitter, TimeEntrySubmission, UploadCompletion, UploadRequest,
    UploadTarget,
};

const API_NAME: &str = "Field";

/// HTTP client for the construction-management platform
pub struct HttpRemote {
    api_token: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemote {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Platform root, e.g. `https://field.example.com`
    /// * `api_token` - Optional bearer token; refreshing it is the caller's concern
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created
    pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        // Remove trailing slash if present
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            api_token,
            base_url,
            client,
        })
    }

    /// Build API URL for versioned endpoints
    fn build_url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Make an authenticated POST request whose response body is ignored
    async fn post<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        log::debug!("POST {url}");

        self.authorized(self.client.post(url))
            .json(body)
            .send()
            .await?
            .ensure_success(API_NAME)
            .await
    }

    /// Make an authenticated POST request and decode the JSON response
    async fn post_json<T: for<'de> Deserialize<'de>, B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.post(url, body).await?;
        response
            .json()
            .await
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))
    }

    fn expense_form(expense: &ExpenseSubmission) -> Result<Form> {
        let mut form = Form::new()
            .text("client_id", expense.client_id.clone())
            .text("project_id", expense.project_id.clone())
            .text("category", expense.category.clone())
            .text("amount", expense.amount.to_string())
            .text("description", expense.description.clone())
            .text("incurred_at", expense.incurred_at.to_rfc3339());

        if let Some(cost_code) = &expense.cost_code {
            form = form.text("cost_code", cost_code.clone());
        }
        if let Some(mileage) = expense.mileage {
            form = form.text("mileage", mileage.to_string());
        }
        if let Some(receipt) = &expense.receipt {
            let part = Part::bytes(receipt.data.clone())
                .file_name(receipt.file_name.clone())
                .mime_str(&receipt.content_type)?;
            form = form.part("receipt", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl RemoteSubmitter for HttpRemote {
    async fn create_time_entry(&self, entry: &TimeEntrySubmission) -> Result<()> {
        let url = self.build_url("time-entries");
        self.post(&url, entry).await?;
        log::info!("Time entry {} accepted for project {}", entry.client_id, entry.project_id);
        Ok(())
    }

    async fn create_expense(&self, expense: &ExpenseSubmission) -> Result<()> {
        let url = self.build_url("expenses");

        if expense.receipt.is_some() {
            log::debug!("POST {url} (multipart)");
            self.authorized(self.client.post(&url))
                .multipart(Self::expense_form(expense)?)
                .send()
                .await?
                .ensure_success(API_NAME)
                .await?;
        } else {
            self.post(&url, expense).await?;
        }

        log::info!("Expense {} accepted for project {}", expense.client_id, expense.project_id);
        Ok(())
    }

    async fn request_upload_target(&self, request: &UploadRequest) -> Result<UploadTarget> {
        let url = self.build_url("photos/upload-url");
        let target: UploadTarget = self.post_json(&url, request).await?;
        if target.upload_url.is_empty() || target.file_key.is_empty() {
            return Err(NetworkError::InvalidResponse(
                "upload target is missing a url or file key".to_string(),
            ));
        }
        Ok(target)
    }

    async fn transfer_payload(
        &self,
        target: &UploadTarget,
        payload: &[u8],
        content_type: &str,
    ) -> Result<()> {
        // Pre-authorized target: no bearer token
        log::debug!("PUT {} ({} bytes)", target.file_key, payload.len());

        self.client
            .put(&target.upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(payload.to_vec())
            .send()
            .await?
            .ensure_success("Upload target")
            .await?;
        Ok(())
    }

    async fn complete_upload(&self, completion: &UploadCompletion) -> Result<()> {
        let url = self.build_url("photos/complete");
        self.post(&url, completion).await?;
        log::info!(
            "Photo {} registered for project {}",
            completion.file_key,
            completion.project_id
        );
        Ok(())
    }

    async fn probe(&self) -> Result<()> {
        let url = self.build_url("health");

        log::debug!("Probing remote: {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;

        // Any HTTP answer means the network path works
        log::debug!("Probe answered with {}", response.status());
        Ok(())
    }

    fn system_name(&self) -> &'static str {
        "field"
    }
}

// ============================================================================
// Tests
// ============================================================================
