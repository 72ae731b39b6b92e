use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::error::WizardError;

/// Lifecycle status of a claim as reported by the claims service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClaimStatus {
    #[default]
    Created,
    Draft,
    DocumentsUploaded,
    ImagesUploaded,
    Validating,
    Completed,
    Validated,
    /// A status this client does not know about, kept verbatim.
    Unknown(String),
}

impl ClaimStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ClaimStatus::Created => "created",
            ClaimStatus::Draft => "draft",
            ClaimStatus::DocumentsUploaded => "documents_uploaded",
            ClaimStatus::ImagesUploaded => "images_uploaded",
            ClaimStatus::Validating => "validating",
            ClaimStatus::Completed => "completed",
            ClaimStatus::Validated => "validated",
            ClaimStatus::Unknown(raw) => raw,
        }
    }

    /// Human-readable label used in claim listings.
    pub fn label(&self) -> &str {
        match self {
            ClaimStatus::Created => "Created",
            ClaimStatus::Draft => "Draft",
            ClaimStatus::DocumentsUploaded => "Documents Uploaded",
            ClaimStatus::ImagesUploaded => "Images Uploaded",
            ClaimStatus::Validating => "Validating",
            ClaimStatus::Completed => "Completed",
            ClaimStatus::Validated => "Validated",
            ClaimStatus::Unknown(raw) => raw,
        }
    }
}

impl From<String> for ClaimStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "created" => ClaimStatus::Created,
            "draft" => ClaimStatus::Draft,
            "documents_uploaded" => ClaimStatus::DocumentsUploaded,
            "images_uploaded" => ClaimStatus::ImagesUploaded,
            "validating" => ClaimStatus::Validating,
            "completed" => ClaimStatus::Completed,
            "validated" => ClaimStatus::Validated,
            _ => ClaimStatus::Unknown(raw),
        }
    }
}

impl From<ClaimStatus> for String {
    fn from(status: ClaimStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document kinds accepted by the upload-document operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Policy,
    ClaimForm,
    DrivingLicense,
    Aadhaar,
    Pan,
    RepairEstimate,
}

impl DocumentType {
    /// Mandatory documents, in dispatch order.
    pub const REQUIRED: [DocumentType; 5] = [
        DocumentType::Policy,
        DocumentType::ClaimForm,
        DocumentType::DrivingLicense,
        DocumentType::Aadhaar,
        DocumentType::Pan,
    ];

    pub const ALL: [DocumentType; 6] = [
        DocumentType::Policy,
        DocumentType::ClaimForm,
        DocumentType::DrivingLicense,
        DocumentType::Aadhaar,
        DocumentType::Pan,
        DocumentType::RepairEstimate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Policy => "policy",
            DocumentType::ClaimForm => "claim_form",
            DocumentType::DrivingLicense => "driving_license",
            DocumentType::Aadhaar => "aadhaar",
            DocumentType::Pan => "pan",
            DocumentType::RepairEstimate => "repair_estimate",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Policy => "Policy",
            DocumentType::ClaimForm => "Claim Form",
            DocumentType::DrivingLicense => "Driving License",
            DocumentType::Aadhaar => "Aadhaar",
            DocumentType::Pan => "PAN",
            DocumentType::RepairEstimate => "Repair Estimate",
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, DocumentType::RepairEstimate)
    }
}

impl FromStr for DocumentType {
    type Err = WizardError;

    /// Accepts the wire names plus the short slot names of the upload form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "policy" => Ok(DocumentType::Policy),
            "claim_form" | "claim" => Ok(DocumentType::ClaimForm),
            "driving_license" | "license" => Ok(DocumentType::DrivingLicense),
            "aadhaar" => Ok(DocumentType::Aadhaar),
            "pan" => Ok(DocumentType::Pan),
            "repair_estimate" | "repair" => Ok(DocumentType::RepairEstimate),
            other => Err(WizardError::UnknownDocumentType(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document already stored on the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimDocument {
    #[serde(default, deserialize_with = "lenient::text")]
    pub document_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<Value>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ClaimDocument {
    pub fn new(document_type: DocumentType) -> Self {
        Self {
            document_type: document_type.as_str().to_string(),
            ..Default::default()
        }
    }
}

/// An image already stored on the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_description: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Outcome reported for one of the name, vehicle or date checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryCheck {
    #[serde(default, deserialize_with = "lenient::truthy", skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub mismatches: Vec<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Outcome of the damage check; older payloads only carry `matches_description`.
///
/// A present `is_valid` decides the check even when it is `null`; only a
/// missing key falls back to `matches_description`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageCheck {
    #[serde(default, deserialize_with = "lenient::present_flag", skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(default, deserialize_with = "lenient::truthy", skip_serializing_if = "Option::is_none")]
    pub matches_description: Option<bool>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub mismatches: Vec<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Nested validation block produced by the external validation service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationPayload {
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub name_validation: Option<CategoryCheck>,
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub vehicle_validation: Option<CategoryCheck>,
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub date_validation: Option<CategoryCheck>,
    #[serde(default, deserialize_with = "lenient::object", skip_serializing_if = "Option::is_none")]
    pub damage_validation: Option<DamageCheck>,
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub overall_confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient::strict_bool", skip_serializing_if = "Option::is_none")]
    pub overall_valid: Option<bool>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub issues: Vec<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub warnings: Vec<String>,
}

/// Full server-side claim record as last fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawClaim")]
pub struct ClaimSnapshot {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ClaimStatus,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub documents: Vec<ClaimDocument>,
    pub images: Vec<ClaimImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationPayload>,
}

impl ClaimSnapshot {
    pub fn new(id: impl Into<String>, status: ClaimStatus) -> Self {
        Self {
            id: id.into(),
            status,
            ..Default::default()
        }
    }

    /// First document tagged as the insurance policy.
    pub fn policy_document(&self) -> Option<&ClaimDocument> {
        self.documents
            .iter()
            .find(|doc| doc.document_type == DocumentType::Policy.as_str())
    }
}

/// Wire shape of a claim; the service has used both `_id`/`id` and
/// `CreatedOn`/`createdAt` over time.
#[derive(Deserialize)]
struct RawClaim {
    #[serde(rename = "_id", default)]
    object_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    claim_number: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "CreatedOn", default)]
    created_on: Option<String>,
    #[serde(rename = "createdAt", default)]
    created_at: Option<String>,
    #[serde(default)]
    documents: Option<Vec<ClaimDocument>>,
    #[serde(default)]
    images: Option<Vec<ClaimImage>>,
    #[serde(default, deserialize_with = "lenient::object")]
    validation: Option<ValidationPayload>,
}

impl TryFrom<RawClaim> for ClaimSnapshot {
    type Error = String;

    fn try_from(raw: RawClaim) -> Result<Self, Self::Error> {
        let id = raw
            .object_id
            .or(raw.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "claim record has neither `_id` nor `id`".to_string())?;

        Ok(Self {
            id,
            claim_number: raw.claim_number,
            description: raw.description,
            status: raw
                .status
                .filter(|s| !s.is_empty())
                .map(ClaimStatus::from)
                .unwrap_or_default(),
            created_at: raw.created_on.or(raw.created_at),
            documents: raw.documents.unwrap_or_default(),
            images: raw.images.unwrap_or_default(),
            validation: raw.validation,
        })
    }
}

/// One page of the claims listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClaimPage {
    pub claims: Vec<ClaimSnapshot>,
    pub total: Option<u64>,
}

impl<'de> Deserialize<'de> for ClaimPage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Wrapped {
                #[serde(default)]
                claims: Option<Vec<Value>>,
                #[serde(default, deserialize_with = "lenient::count")]
                total: Option<u64>,
            },
            Bare(Vec<Value>),
        }

        let (rows, total) = match Shape::deserialize(deserializer)? {
            Shape::Wrapped { claims, total } => (claims.unwrap_or_default(), total),
            Shape::Bare(rows) => (rows, None),
        };
        Ok(ClaimPage {
            claims: decode_rows(rows),
            total,
        })
    }
}

/// Decode each listed claim on its own so one malformed row cannot hide the rest.
fn decode_rows(rows: Vec<Value>) -> Vec<ClaimSnapshot> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<ClaimSnapshot>(row) {
            Ok(claim) => Some(claim),
            Err(e) => {
                warn!(row = index, error = %e, "skipping unreadable claim row");
                None
            }
        })
        .collect()
}

/// A file selected locally and not yet sent to the service.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).map(str::to_string);
        Self {
            file_name,
            content_type,
            data: data.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(file_name, data))
    }
}

fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

/// Tolerant field decoders for the validation payload, whose producers do not
/// agree on types.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Truthiness: `0`, `""` and `null` are false-ish, objects are true.
    pub fn truthy<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
            Some(Value::String(s)) => Some(!s.is_empty()),
            Some(_) => Some(true),
        })
    }

    /// Like [`truthy`], but a present `null` is an explicit `false`.
    pub fn present_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => Some(false),
            Value::Bool(b) => Some(b),
            Value::Number(n) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
            Value::String(s) => Some(!s.is_empty()),
            _ => Some(true),
        })
    }

    /// Text field where `null` reads as empty and scalars keep their JSON text.
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        })
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// Only a literal boolean counts.
    pub fn strict_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => Some(b),
            _ => None,
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s],
            _ => Vec::new(),
        })
    }

    /// Decode `T` only when the value is a JSON object; anything else is absent.
    pub fn object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(v @ Value::Object(_)) => serde_json::from_value(v).ok(),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_prefers_object_id_and_created_on() {
        let snapshot: ClaimSnapshot = serde_json::from_value(json!({
            "_id": "abc",
            "id": "ignored",
            "status": "documents_uploaded",
            "CreatedOn": "2024-03-15T10:00:00Z",
            "createdAt": "ignored",
            "documents": [{"document_type": "policy", "file_name": "p.pdf"}]
        }))
        .unwrap();

        assert_eq!(snapshot.id, "abc");
        assert_eq!(snapshot.status, ClaimStatus::DocumentsUploaded);
        assert_eq!(snapshot.created_at.as_deref(), Some("2024-03-15T10:00:00Z"));
        assert_eq!(snapshot.documents.len(), 1);
        assert_eq!(snapshot.documents[0].details["file_name"], "p.pdf");
        assert!(snapshot.images.is_empty());
    }

    #[test]
    fn snapshot_defaults() {
        let snapshot: ClaimSnapshot =
            serde_json::from_value(json!({"id": "x", "documents": null})).unwrap();
        assert_eq!(snapshot.status, ClaimStatus::Created);
        assert!(snapshot.documents.is_empty());
        assert!(snapshot.validation.is_none());
    }

    #[test]
    fn snapshot_without_id_is_rejected() {
        let err = serde_json::from_value::<ClaimSnapshot>(json!({"status": "created"}));
        assert!(err.is_err());
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status = ClaimStatus::from("archived".to_string());
        assert_eq!(status, ClaimStatus::Unknown("archived".into()));
        assert_eq!(status.label(), "archived");
        assert_eq!(ClaimStatus::ImagesUploaded.label(), "Images Uploaded");
    }

    #[test]
    fn validation_payload_tolerates_mixed_types() {
        let payload: ValidationPayload = serde_json::from_value(json!({
            "name_validation": {"is_valid": 1, "confidence": "0.8", "mismatches": ["a", 2, null]},
            "vehicle_validation": "not an object",
            "damage_validation": {"matches_description": true},
            "overall_valid": 0,
            "issues": "single issue"
        }))
        .unwrap();

        let name = payload.name_validation.unwrap();
        assert_eq!(name.is_valid, Some(true));
        assert_eq!(name.confidence, Some(0.8));
        assert_eq!(name.mismatches, vec!["a".to_string(), "2".to_string()]);
        assert!(payload.vehicle_validation.is_none());
        assert_eq!(payload.damage_validation.unwrap().matches_description, Some(true));
        assert_eq!(payload.overall_valid, None);
        assert_eq!(payload.issues, vec!["single issue".to_string()]);
    }

    #[test]
    fn claim_page_accepts_both_shapes() {
        let wrapped: ClaimPage =
            serde_json::from_value(json!({"claims": [{"_id": "a"}], "total": 12})).unwrap();
        assert_eq!(wrapped.claims.len(), 1);
        assert_eq!(wrapped.total, Some(12));

        let bare: ClaimPage = serde_json::from_value(json!([{"id": "a"}, {"id": "b"}])).unwrap();
        assert_eq!(bare.claims.len(), 2);
        assert_eq!(bare.total, None);
    }

    #[test]
    fn null_document_type_does_not_reject_the_claim() {
        let snapshot: ClaimSnapshot = serde_json::from_value(json!({
            "_id": "abc",
            "documents": [{"document_type": null, "file_name": "scan.pdf"}, {"document_type": "policy"}]
        }))
        .unwrap();

        assert_eq!(snapshot.documents.len(), 2);
        assert_eq!(snapshot.documents[0].document_type, "");
        assert!(snapshot.policy_document().is_some());
    }

    #[test]
    fn damage_is_valid_null_is_explicit() {
        let present: DamageCheck =
            serde_json::from_value(json!({"is_valid": null, "matches_description": true})).unwrap();
        assert_eq!(present.is_valid, Some(false));

        let missing: DamageCheck = serde_json::from_value(json!({"matches_description": true})).unwrap();
        assert_eq!(missing.is_valid, None);
    }

    #[test]
    fn claim_page_skips_rows_without_id() {
        let page: ClaimPage = serde_json::from_value(json!({
            "claims": [{"_id": "a"}, {"claim_number": "CLM-2"}, {"id": "c"}],
            "total": 3
        }))
        .unwrap();
        let ids: Vec<_> = page.claims.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(page.total, Some(3));

        let bare: ClaimPage = serde_json::from_value(json!([{"claim_number": "CLM-9"}])).unwrap();
        assert!(bare.claims.is_empty());
    }

    #[test]
    fn document_type_parses_slot_names() {
        assert_eq!("license".parse::<DocumentType>().unwrap(), DocumentType::DrivingLicense);
        assert_eq!("claim_form".parse::<DocumentType>().unwrap(), DocumentType::ClaimForm);
        assert!("passport".parse::<DocumentType>().is_err());
        assert!(!DocumentType::RepairEstimate.is_required());
    }
}
