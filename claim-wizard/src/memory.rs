use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::debug;
use uuid::Uuid;

use crate::api::{ApiResult, ClaimsApi, ServerResponse};
use crate::error::ApiError;
use crate::models::{
    CategoryCheck, ClaimDocument, ClaimImage, ClaimPage, ClaimSnapshot, ClaimStatus, DamageCheck,
    DocumentType, UploadFile, ValidationPayload,
};

/// Operations whose outcome can be scripted to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    Create,
    Document(DocumentType),
    /// 1-based position of the image within its batch.
    Image(usize),
    Validate,
    Fetch,
    List,
}

#[derive(Default)]
struct Counters {
    creates: AtomicUsize,
    uploads: AtomicUsize,
    validations: AtomicUsize,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// In-memory claims service.
///
/// Behaves like the real service for the wizard's purposes: it stores
/// uploads, advances the claim status once the required documents or images
/// are present, and attaches a validation payload on validate. Failures can
/// be scripted per operation.
#[derive(Clone, Default)]
pub struct InMemoryClaimsApi {
    claims: Arc<DashMap<String, (u64, ClaimSnapshot)>>,
    failures: Arc<DashMap<FailurePoint, String>>,
    unreachable: Arc<DashMap<FailurePoint, String>>,
    extracted: Arc<DashMap<DocumentType, Value>>,
    validations: Arc<DashMap<String, ValidationPayload>>,
    offline: Arc<AtomicBool>,
    sequence: Arc<AtomicU64>,
    counters: Arc<Counters>,
}

impl InMemoryClaimsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a claim directly and return its id.
    pub async fn seed_claim(&self, claim_number: &str) -> String {
        self.store(new_claim(Some(claim_number), None))
    }

    /// Store a snapshot as is, replacing any claim with the same id.
    pub fn insert(&self, snapshot: ClaimSnapshot) {
        self.store(snapshot);
    }

    pub fn claim(&self, claim_id: &str) -> Option<ClaimSnapshot> {
        self.claims.get(claim_id).map(|entry| entry.1.clone())
    }

    /// Make `point` answer with a failed envelope carrying `message`.
    pub fn fail(&self, point: FailurePoint, message: impl Into<String>) {
        self.failures.insert(point, message.into());
    }

    pub fn fail_document(&self, document_type: DocumentType, message: impl Into<String>) {
        self.fail(FailurePoint::Document(document_type), message);
    }

    pub fn fail_image(&self, position: usize, message: impl Into<String>) {
        self.fail(FailurePoint::Image(position), message);
    }

    /// Make `point` fail as if the connection dropped, leaving other calls untouched.
    pub fn drop_connection(&self, point: FailurePoint, message: impl Into<String>) {
        self.unreachable.insert(point, message.into());
    }

    pub fn clear_failure(&self, point: &FailurePoint) {
        self.failures.remove(point);
        self.unreachable.remove(point);
    }

    /// While offline every call fails as if no response was received.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Extracted fields attached to every future upload of `document_type`.
    pub fn set_extracted_data(&self, document_type: DocumentType, data: Value) {
        self.extracted.insert(document_type, data);
    }

    /// Payload attached to the claim when it is validated.
    pub fn set_validation(&self, claim_id: &str, payload: ValidationPayload) {
        self.validations.insert(claim_id.to_string(), payload);
    }

    pub fn create_calls(&self) -> usize {
        self.counters.creates.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.counters.uploads.load(Ordering::SeqCst)
    }

    pub fn validate_calls(&self) -> usize {
        self.counters.validations.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.counters.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of uploads that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    fn store(&self, snapshot: ClaimSnapshot) -> String {
        let id = snapshot.id.clone();
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.claims.insert(id.clone(), (seq, snapshot));
        id
    }

    fn check(&self, point: &FailurePoint) -> Result<Option<String>, ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("claims service unreachable".to_string()));
        }
        if let Some(message) = self.unreachable.get(point) {
            return Err(ApiError::Transport(message.clone()));
        }
        Ok(self.failures.get(point).map(|msg| msg.clone()))
    }

    fn not_found<T>(claim_id: &str) -> ApiResult<T> {
        Ok(ServerResponse::failed(format!("Claim {claim_id} not found")))
    }

    async fn track_upload<T>(&self, work: impl FnOnce() -> T) -> T {
        self.counters.uploads.fetch_add(1, Ordering::SeqCst);
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // let the rest of the batch start before this one completes
        tokio::task::yield_now().await;
        let result = work();
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn new_claim(claim_number: Option<&str>, description: Option<&str>) -> ClaimSnapshot {
    ClaimSnapshot {
        id: Uuid::new_v4().simple().to_string(),
        claim_number: claim_number.filter(|s| !s.is_empty()).map(str::to_string),
        description: description.filter(|s| !s.is_empty()).map(str::to_string),
        status: ClaimStatus::Created,
        created_at: Some(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    }
}

fn has_required_documents(claim: &ClaimSnapshot) -> bool {
    DocumentType::REQUIRED
        .iter()
        .all(|doc| claim.documents.iter().any(|d| d.document_type == doc.as_str()))
}

/// Payload used when no outcome was scripted for a claim.
fn sandbox_validation(claim: &ClaimSnapshot) -> ValidationPayload {
    let passed = |confidence: f64| CategoryCheck {
        is_valid: Some(true),
        confidence: Some(confidence),
        ..Default::default()
    };
    ValidationPayload {
        name_validation: Some(passed(1.0)),
        vehicle_validation: Some(passed(1.0)),
        date_validation: Some(passed(1.0)),
        damage_validation: Some(DamageCheck {
            matches_description: Some(!claim.images.is_empty()),
            confidence: Some(if claim.images.is_empty() { 0.0 } else { 1.0 }),
            ..Default::default()
        }),
        overall_confidence: Some(1.0),
        overall_valid: Some(true),
        issues: Vec::new(),
        warnings: vec!["sandbox validation: documents were not analysed".to_string()],
    }
}

#[async_trait]
impl ClaimsApi for InMemoryClaimsApi {
    async fn create_claim(
        &self,
        claim_number: Option<&str>,
        description: Option<&str>,
    ) -> ApiResult<ClaimSnapshot> {
        self.counters.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.check(&FailurePoint::Create)? {
            return Ok(ServerResponse::failed(message));
        }
        let claim = new_claim(claim_number, description);
        self.store(claim.clone());
        debug!(claim_id = %claim.id, "in-memory claim created");
        Ok(ServerResponse::ok(claim))
    }

    async fn upload_document(
        &self,
        claim_id: &str,
        document_type: DocumentType,
        file: &UploadFile,
    ) -> ApiResult<Value> {
        let failure = self.check(&FailurePoint::Document(document_type))?;
        self.track_upload(|| {
            if let Some(message) = failure {
                return Ok(ServerResponse::failed(message));
            }
            let Some(mut entry) = self.claims.get_mut(claim_id) else {
                return Self::not_found(claim_id);
            };
            let claim = &mut entry.1;

            let mut document = ClaimDocument::new(document_type);
            document
                .details
                .insert("file_name".to_string(), json!(file.file_name));
            document.extracted_data = self.extracted.get(&document_type).map(|v| v.clone());
            claim.documents.push(document);

            if matches!(claim.status, ClaimStatus::Created | ClaimStatus::Draft)
                && has_required_documents(claim)
            {
                claim.status = ClaimStatus::DocumentsUploaded;
            }
            Ok(ServerResponse::ok(json!({"document_type": document_type.as_str()})))
        })
        .await
    }

    async fn upload_image(
        &self,
        claim_id: &str,
        file: &UploadFile,
        angle_description: Option<&str>,
    ) -> ApiResult<Value> {
        let position = angle_description
            .and_then(|a| a.strip_prefix("Image "))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        let failure = self.check(&FailurePoint::Image(position))?;
        self.track_upload(|| {
            if let Some(message) = failure {
                return Ok(ServerResponse::failed(message));
            }
            let Some(mut entry) = self.claims.get_mut(claim_id) else {
                return Self::not_found(claim_id);
            };
            let claim = &mut entry.1;

            let mut image = ClaimImage {
                angle_description: angle_description.map(str::to_string),
                ..Default::default()
            };
            image
                .details
                .insert("file_name".to_string(), json!(file.file_name));
            claim.images.push(image);

            if claim.status == ClaimStatus::DocumentsUploaded {
                claim.status = ClaimStatus::ImagesUploaded;
            }
            Ok(ServerResponse::ok(json!({"images": claim.images.len()})))
        })
        .await
    }

    async fn validate_claim(&self, claim_id: &str) -> ApiResult<Value> {
        self.counters.validations.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.check(&FailurePoint::Validate)? {
            return Ok(ServerResponse::failed(message));
        }
        let Some(mut entry) = self.claims.get_mut(claim_id) else {
            return Self::not_found(claim_id);
        };
        let claim = &mut entry.1;

        let payload = self
            .validations
            .get(claim_id)
            .map(|p| p.clone())
            .unwrap_or_else(|| sandbox_validation(claim));
        claim.validation = Some(payload);
        claim.status = ClaimStatus::Validated;
        Ok(ServerResponse::ok(json!({"status": claim.status.as_str()})))
    }

    async fn get_claim(&self, claim_id: &str) -> ApiResult<ClaimSnapshot> {
        self.counters.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.check(&FailurePoint::Fetch)? {
            return Ok(ServerResponse::failed(message));
        }
        match self.claim(claim_id) {
            Some(claim) => Ok(ServerResponse::ok(claim)),
            None => Self::not_found(claim_id),
        }
    }

    async fn list_claims(&self, skip: u32, limit: u32) -> ApiResult<ClaimPage> {
        if let Some(message) = self.check(&FailurePoint::List)? {
            return Ok(ServerResponse::failed(message));
        }
        let mut rows: Vec<(u64, ClaimSnapshot)> =
            self.claims.iter().map(|entry| entry.value().clone()).collect();
        rows.sort_by_key(|(seq, _)| *seq);

        let total = rows.len() as u64;
        let claims = rows
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .map(|(_, claim)| claim)
            .collect();
        Ok(ServerResponse::ok(ClaimPage {
            claims,
            total: Some(total),
        }))
    }
}
