use serde_json::Value;
use thiserror::Error;

use crate::models::DocumentType;
use crate::upload::BatchKind;

/// Failure talking to the claims service, normalized once at the boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// No response was received.
    #[error("{0}")]
    Transport(String),

    /// The service answered but refused the operation.
    #[error("{0}")]
    Rejected(String),

    /// The service answered with a body we could not decode.
    #[error("unexpected response from claims service: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build a rejection from an error body, falling back to `fallback` when
    /// the body carries no readable message.
    pub fn from_body(body: &Value, fallback: &str) -> Self {
        ApiError::Rejected(extract_error_message(body).unwrap_or_else(|| fallback.to_string()))
    }
}

/// Find the human-readable message in an error body.
///
/// Precedence: `detail` as a string, `detail.error`, `detail.message`,
/// then top-level `error` and `message`. A null, empty or falsy `detail`
/// counts as absent.
pub fn extract_error_message(body: &Value) -> Option<String> {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };

    let present = |v: &&Value| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => true,
    };

    if let Some(detail) = body.get("detail").filter(present) {
        if let Some(message) = non_empty(Some(detail)) {
            return Some(message);
        }
        return non_empty(detail.get("error")).or_else(|| non_empty(detail.get("message")));
    }

    non_empty(body.get("error")).or_else(|| non_empty(body.get("message")))
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Please create a claim first")]
    MissingClaim,

    #[error(
        "Please upload all required documents (Policy, Claim Form, Driving License, Aadhaar, and PAN); missing: {}",
        .0.iter().map(|d| d.label()).collect::<Vec<_>>().join(", ")
    )]
    MissingDocuments(Vec<DocumentType>),

    #[error("Please upload car photos")]
    NoImages,

    #[error("Please complete all previous steps (upload documents and images)")]
    PrerequisitesIncomplete,

    #[error("Failed to upload some {batch}: {message}")]
    BatchFailed { batch: BatchKind, message: String },

    #[error("Cannot navigate to step {0} before its prerequisites are met")]
    NavigationBlocked(u8),

    #[error("Invalid wizard step: {0}")]
    InvalidStep(String),

    #[error("Unknown document type: {0}")]
    UnknownDocumentType(String),

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WizardError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_detail_wins() {
        let body = json!({"detail": "claim not found", "error": "ignored"});
        assert_eq!(extract_error_message(&body).as_deref(), Some("claim not found"));
    }

    #[test]
    fn nested_detail_error_before_message() {
        let body = json!({"detail": {"error": "bad file", "message": "other", "success": false}});
        assert_eq!(extract_error_message(&body).as_deref(), Some("bad file"));

        let body = json!({"detail": {"message": "only message"}});
        assert_eq!(extract_error_message(&body).as_deref(), Some("only message"));
    }

    #[test]
    fn detail_object_without_text_does_not_fall_through() {
        let body = json!({"detail": {"code": 7}, "error": "top level"});
        assert_eq!(extract_error_message(&body), None);
        assert_eq!(
            ApiError::from_body(&body, "Failed to create claim"),
            ApiError::Rejected("Failed to create claim".into())
        );
    }

    #[test]
    fn empty_detail_falls_through() {
        let body = json!({"detail": "", "error": "top"});
        assert_eq!(extract_error_message(&body).as_deref(), Some("top"));

        let body = json!({"detail": null, "message": "from message"});
        assert_eq!(extract_error_message(&body).as_deref(), Some("from message"));
    }

    #[test]
    fn top_level_fields() {
        assert_eq!(
            extract_error_message(&json!({"error": "boom"})).as_deref(),
            Some("boom")
        );
        assert_eq!(
            extract_error_message(&json!({"message": "oops"})).as_deref(),
            Some("oops")
        );
        assert_eq!(extract_error_message(&json!({})), None);
    }
}
