//! `ClaimsApi` over HTTP, talking to the claims service at `{api_url}/claims`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, multipart};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{ApiResult, ClaimsApi};
use crate::config::WizardConfig;
use crate::error::{ApiError, WizardError};
use crate::models::{ClaimPage, ClaimSnapshot, DocumentType, UploadFile};

#[derive(Clone)]
pub struct HttpClaimsApi {
    client: Client,
    claims_url: String,
}

impl HttpClaimsApi {
    pub fn new(config: &WizardConfig) -> crate::error::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| WizardError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            claims_url: format!("{}/claims", config.api_url.trim_end_matches('/')),
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> ApiResult<T> {
        let response = request.send().await.map_err(|e| {
            warn!(operation, error = %e, "claims service unreachable");
            ApiError::Transport(format!("Failed to {operation}: {e}"))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(operation, status = %status, bytes = body.len(), "claims service replied");

        if !status.is_success() {
            let fallback = format!("Failed to {operation} (HTTP {})", status.as_u16());
            return Err(match serde_json::from_str::<Value>(&body) {
                Ok(value) => ApiError::from_body(&value, &fallback),
                Err(_) => ApiError::Rejected(fallback),
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn file_part(file: &UploadFile) -> Result<multipart::Part, ApiError> {
    let part = multipart::Part::bytes(file.data.clone()).file_name(file.file_name.clone());
    match &file.content_type {
        Some(mime) => part
            .mime_str(mime)
            .map_err(|e| ApiError::Transport(format!("invalid content type {mime}: {e}"))),
        None => Ok(part),
    }
}

#[async_trait]
impl ClaimsApi for HttpClaimsApi {
    async fn create_claim(
        &self,
        claim_number: Option<&str>,
        description: Option<&str>,
    ) -> ApiResult<ClaimSnapshot> {
        // the service rejects the form when either field is missing, even if empty
        let form = multipart::Form::new()
            .text("claim_number", claim_number.unwrap_or_default().to_string())
            .text("description", description.unwrap_or_default().to_string());

        let request = self
            .client
            .post(format!("{}/create", self.claims_url))
            .multipart(form);
        self.send(request, "create claim").await
    }

    async fn upload_document(
        &self,
        claim_id: &str,
        document_type: DocumentType,
        file: &UploadFile,
    ) -> ApiResult<Value> {
        let form = multipart::Form::new()
            .text("document_type", document_type.as_str())
            .part("file", file_part(file)?);

        let request = self
            .client
            .post(format!("{}/{claim_id}/documents", self.claims_url))
            .multipart(form);
        self.send(request, "upload document").await
    }

    async fn upload_image(
        &self,
        claim_id: &str,
        file: &UploadFile,
        angle_description: Option<&str>,
    ) -> ApiResult<Value> {
        let mut form = multipart::Form::new().part("file", file_part(file)?);
        if let Some(angle) = angle_description.filter(|a| !a.is_empty()) {
            form = form.text("angle_description", angle.to_string());
        }

        let request = self
            .client
            .post(format!("{}/{claim_id}/images", self.claims_url))
            .multipart(form);
        self.send(request, "upload image").await
    }

    async fn validate_claim(&self, claim_id: &str) -> ApiResult<Value> {
        let request = self
            .client
            .post(format!("{}/{claim_id}/validate", self.claims_url))
            .json(&serde_json::json!({}));
        self.send(request, "validate claim").await
    }

    async fn get_claim(&self, claim_id: &str) -> ApiResult<ClaimSnapshot> {
        let request = self.client.get(format!("{}/{claim_id}", self.claims_url));
        self.send(request, "load claim").await
    }

    async fn list_claims(&self, skip: u32, limit: u32) -> ApiResult<ClaimPage> {
        let request = self
            .client
            .get(format!("{}/", self.claims_url))
            .query(&[("skip", skip), ("limit", limit)]);
        self.send(request, "load claims").await
    }
}

