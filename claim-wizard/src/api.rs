use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::models::{ClaimPage, ClaimSnapshot, DocumentType, UploadFile};

/// Envelope wrapping every claims service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
}

impl<T> ServerResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: None,
            success: false,
            error: Some(message.into()),
        }
    }

    /// Error text carried by the envelope, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.trim().is_empty())
    }

    /// Accept only a successful envelope that carries data.
    pub fn into_data(self, fallback: &str) -> Result<T, ApiError> {
        match self {
            ServerResponse {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            other => Err(ApiError::Rejected(
                other.error_message().unwrap_or(fallback).to_string(),
            )),
        }
    }

    /// Accept a successful envelope regardless of its payload.
    pub fn into_success(self, fallback: &str) -> Result<Option<T>, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected(
                self.error_message().unwrap_or(fallback).to_string(),
            ))
        }
    }
}

pub type ApiResult<T> = std::result::Result<ServerResponse<T>, ApiError>;

/// The five operations of the claims service.
///
/// Implementations normalize every failure into [`ApiError`]; an envelope
/// with `success = false` is returned as `Ok` so callers can inspect it.
#[async_trait]
pub trait ClaimsApi: Send + Sync {
    /// Both fields are always sent; absent values go out as empty strings.
    async fn create_claim(
        &self,
        claim_number: Option<&str>,
        description: Option<&str>,
    ) -> ApiResult<ClaimSnapshot>;

    async fn upload_document(
        &self,
        claim_id: &str,
        document_type: DocumentType,
        file: &UploadFile,
    ) -> ApiResult<Value>;

    async fn upload_image(
        &self,
        claim_id: &str,
        file: &UploadFile,
        angle_description: Option<&str>,
    ) -> ApiResult<Value>;

    async fn validate_claim(&self, claim_id: &str) -> ApiResult<Value>;

    async fn get_claim(&self, claim_id: &str) -> ApiResult<ClaimSnapshot>;

    async fn list_claims(&self, skip: u32, limit: u32) -> ApiResult<ClaimPage>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;
    use serde_json::json;

    fn decode<T: DeserializeOwned>(body: &str) -> serde_json::Result<ServerResponse<T>> {
        serde_json::from_str(body)
    }

    #[test]
    fn envelope_decodes_for_any_payload_type() {
        let response = decode::<ClaimSnapshot>(r#"{"data": {"_id": "abc"}, "success": true}"#).unwrap();
        assert_eq!(response.into_data("Failed to fetch claim").unwrap().id, "abc");

        let response = decode::<ClaimPage>(r#"{"success": false, "error": "not allowed"}"#).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.error_message(), Some("not allowed"));
    }

    #[test]
    fn envelope_decodes_with_missing_fields() {
        let response: ServerResponse<Value> =
            serde_json::from_value(json!({"success": true})).unwrap();
        assert!(response.success);
        assert!(response.data.is_none());

        let response: ServerResponse<Value> =
            serde_json::from_value(json!({"data": null, "success": false, "error": "nope"}))
                .unwrap();
        assert_eq!(response.error_message(), Some("nope"));
    }

    #[test]
    fn into_data_requires_payload() {
        let empty: ServerResponse<Value> = ServerResponse {
            data: None,
            success: true,
            error: None,
        };
        assert_eq!(
            empty.into_data("Failed to create claim"),
            Err(ApiError::Rejected("Failed to create claim".into()))
        );

        let failed: ServerResponse<Value> = ServerResponse::failed("   ");
        assert_eq!(
            failed.into_success("Failed to validate claim"),
            Err(ApiError::Rejected("Failed to validate claim".into()))
        );
    }
}
