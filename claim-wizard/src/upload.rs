//! Concurrent upload batches with all-or-nothing success.
//!
//! Every member of a batch is dispatched at once and the batch waits for all
//! of them to settle before deciding. Uploads that succeeded inside a failed
//! batch stay on the service; nothing is rolled back.

use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{ClaimsApi, ServerResponse};
use crate::error::{ApiError, Result, WizardError};
use crate::models::{DocumentType, UploadFile};

/// Separator between individual failure messages in a batch error.
pub const FAILURE_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Documents,
    Images,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Documents => f.write_str("documents"),
            BatchKind::Images => f.write_str("images"),
        }
    }
}

/// Document files attached locally, one per slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSlots {
    files: BTreeMap<DocumentType, UploadFile>,
}

impl DocumentSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a file, replacing whatever the slot held.
    pub fn attach(&mut self, document_type: DocumentType, file: UploadFile) -> Option<UploadFile> {
        self.files.insert(document_type, file)
    }

    pub fn detach(&mut self, document_type: DocumentType) -> Option<UploadFile> {
        self.files.remove(&document_type)
    }

    pub fn get(&self, document_type: DocumentType) -> Option<&UploadFile> {
        self.files.get(&document_type)
    }

    /// Attached file name, or an empty string for an empty slot.
    pub fn file_name(&self, document_type: DocumentType) -> &str {
        self.get(document_type)
            .map(|f| f.file_name.as_str())
            .unwrap_or_default()
    }

    pub fn missing_required(&self) -> Vec<DocumentType> {
        DocumentType::REQUIRED
            .into_iter()
            .filter(|doc| !self.files.contains_key(doc))
            .collect()
    }

    /// Attached files in dispatch order: the required ones first, then optional.
    pub fn in_dispatch_order(&self) -> impl Iterator<Item = (DocumentType, &UploadFile)> {
        DocumentType::ALL
            .into_iter()
            .filter_map(|doc| self.files.get(&doc).map(|file| (doc, file)))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Summary of a batch in which every upload succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub kind: BatchKind,
    pub dispatched: usize,
}

/// One upload that did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFailure {
    pub label: String,
    pub message: String,
}

fn settle(label: String, outcome: std::result::Result<ServerResponse<Value>, ApiError>) -> Option<UploadFailure> {
    let message = match outcome {
        Ok(response) if response.success => return None,
        Ok(response) => response
            .error_message()
            .unwrap_or("upload rejected")
            .to_string(),
        Err(error) => error.to_string(),
    };
    Some(UploadFailure { label, message })
}

/// Fans a batch of uploads out to the claims service and joins on all of them.
#[derive(Clone)]
pub struct UploadBatchCoordinator {
    api: Arc<dyn ClaimsApi>,
}

impl UploadBatchCoordinator {
    pub fn new(api: Arc<dyn ClaimsApi>) -> Self {
        Self { api }
    }

    /// Upload the five required documents and the optional repair estimate.
    ///
    /// Fails before any request is sent when there is no claim id or a
    /// required slot is empty.
    pub async fn upload_documents(
        &self,
        claim_id: Option<&str>,
        slots: &DocumentSlots,
    ) -> Result<BatchReport> {
        let claim_id = claim_id.ok_or(WizardError::MissingClaim)?;
        let missing = slots.missing_required();
        if !missing.is_empty() {
            return Err(WizardError::MissingDocuments(missing));
        }

        let uploads = slots.in_dispatch_order().map(|(document_type, file)| {
            let api = self.api.clone();
            async move {
                let outcome = api.upload_document(claim_id, document_type, file).await;
                settle(document_type.label().to_string(), outcome)
            }
        });

        self.join(BatchKind::Documents, claim_id, uploads.collect())
            .await
    }

    /// Upload every selected image, labelled `Image 1`, `Image 2`, ...
    pub async fn upload_images(&self, claim_id: Option<&str>, images: &[UploadFile]) -> Result<BatchReport> {
        let claim_id = claim_id.ok_or(WizardError::MissingClaim)?;
        if images.is_empty() {
            return Err(WizardError::NoImages);
        }

        let uploads = images.iter().enumerate().map(|(index, file)| {
            let api = self.api.clone();
            let angle = format!("Image {}", index + 1);
            async move {
                let outcome = api.upload_image(claim_id, file, Some(angle.as_str())).await;
                settle(angle, outcome)
            }
        });

        self.join(BatchKind::Images, claim_id, uploads.collect())
            .await
    }

    async fn join<F>(&self, kind: BatchKind, claim_id: &str, uploads: Vec<F>) -> Result<BatchReport>
    where
        F: Future<Output = Option<UploadFailure>>,
    {
        let dispatched = uploads.len();
        info!(%kind, claim_id, dispatched, "dispatching upload batch");

        let failures: Vec<UploadFailure> = join_all(uploads).await.into_iter().flatten().collect();

        if failures.is_empty() {
            info!(%kind, claim_id, dispatched, "upload batch complete");
            return Ok(BatchReport { kind, dispatched });
        }

        for failure in &failures {
            warn!(%kind, claim_id, upload = %failure.label, error = %failure.message, "upload failed");
        }
        let message = failures
            .iter()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join(FAILURE_SEPARATOR);
        warn!(%kind, claim_id, dispatched, failed = failures.len(), "upload batch failed");

        Err(WizardError::BatchFailed {
            batch: kind,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FailurePoint, InMemoryClaimsApi};

    fn file(name: &str) -> UploadFile {
        UploadFile::new(name, b"%PDF-1.4".to_vec())
    }

    fn required_slots() -> DocumentSlots {
        let mut slots = DocumentSlots::new();
        for doc in DocumentType::REQUIRED {
            slots.attach(doc, file(&format!("{doc}.pdf")));
        }
        slots
    }

    async fn setup() -> (Arc<InMemoryClaimsApi>, UploadBatchCoordinator, String) {
        let api = Arc::new(InMemoryClaimsApi::new());
        let claim_id = api.seed_claim("CLM-1").await;
        let coordinator = UploadBatchCoordinator::new(api.clone());
        (api, coordinator, claim_id)
    }

    #[tokio::test]
    async fn missing_required_document_sends_nothing() {
        let (api, coordinator, claim_id) = setup().await;
        let mut slots = required_slots();
        slots.detach(DocumentType::Pan);
        slots.attach(DocumentType::RepairEstimate, file("estimate.pdf"));

        let err = coordinator
            .upload_documents(Some(&claim_id), &slots)
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::MissingDocuments(ref m) if m == &vec![DocumentType::Pan]));
        assert_eq!(api.upload_calls(), 0);
    }

    #[tokio::test]
    async fn missing_claim_id_sends_nothing() {
        let (api, coordinator, _) = setup().await;
        let err = coordinator
            .upload_documents(None, &required_slots())
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::MissingClaim));

        let err = coordinator.upload_images(None, &[file("a.jpg")]).await.unwrap_err();
        assert!(matches!(err, WizardError::MissingClaim));
        assert_eq!(api.upload_calls(), 0);
    }

    #[tokio::test]
    async fn dispatches_all_documents_concurrently() {
        let (api, coordinator, claim_id) = setup().await;
        let report = coordinator
            .upload_documents(Some(&claim_id), &required_slots())
            .await
            .unwrap();
        assert_eq!(report.dispatched, 5);
        assert_eq!(api.upload_calls(), 5);
        assert_eq!(api.max_in_flight(), 5);

        let mut with_estimate = required_slots();
        with_estimate.attach(DocumentType::RepairEstimate, file("estimate.pdf"));
        let report = coordinator
            .upload_documents(Some(&claim_id), &with_estimate)
            .await
            .unwrap();
        assert_eq!(report.dispatched, 6);
    }

    #[tokio::test]
    async fn one_failure_fails_the_batch() {
        let (api, coordinator, claim_id) = setup().await;
        api.fail_document(DocumentType::Aadhaar, "Aadhaar scan unreadable");

        let err = coordinator
            .upload_documents(Some(&claim_id), &required_slots())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Aadhaar scan unreadable"), "{message}");
        assert!(message.starts_with("Failed to upload some documents"));
        // the other four are kept by the service
        assert_eq!(api.claim(&claim_id).unwrap().documents.len(), 4);
    }

    #[tokio::test]
    async fn all_failure_messages_are_joined() {
        let (api, coordinator, claim_id) = setup().await;
        api.fail_image(1, "too dark");
        api.fail_image(3, "duplicate");

        let images: Vec<_> = (1..=3).map(|i| file(&format!("car{i}.jpg"))).collect();
        let err = coordinator
            .upload_images(Some(&claim_id), &images)
            .await
            .unwrap_err();
        match err {
            WizardError::BatchFailed { batch, message } => {
                assert_eq!(batch, BatchKind::Images);
                assert_eq!(message, "too dark, duplicate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_of_one_upload_is_joined_with_the_rest() {
        let (api, coordinator, claim_id) = setup().await;
        api.drop_connection(FailurePoint::Image(2), "connection reset by peer");

        let images: Vec<_> = (1..=3).map(|i| file(&format!("car{i}.jpg"))).collect();
        let err = coordinator
            .upload_images(Some(&claim_id), &images)
            .await
            .unwrap_err();
        match err {
            WizardError::BatchFailed { batch, message } => {
                assert_eq!(batch, BatchKind::Images);
                assert_eq!(message, "connection reset by peer");
            }
            other => panic!("unexpected error: {other}"),
        }
        // the other two still landed
        let stored = api.claim(&claim_id).unwrap().images;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].angle_description.as_deref(), Some("Image 3"));
    }

    #[tokio::test]
    async fn empty_image_batch_is_rejected() {
        let (api, coordinator, claim_id) = setup().await;
        let err = coordinator.upload_images(Some(&claim_id), &[]).await.unwrap_err();
        assert!(matches!(err, WizardError::NoImages));
        assert_eq!(api.upload_calls(), 0);
    }

    #[test]
    fn slots_report_file_names() {
        let mut slots = required_slots();
        assert_eq!(slots.file_name(DocumentType::Policy), "policy.pdf");
        assert_eq!(slots.file_name(DocumentType::RepairEstimate), "");
        slots.clear();
        assert_eq!(slots.missing_required().len(), 5);
    }
}
