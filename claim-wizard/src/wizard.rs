//! One wizard session: the claims service, the claim context and the
//! navigation controller wired together.
//!
//! Every user action follows the same shape: check preconditions locally,
//! call the service, then refresh the claim snapshot and let the step
//! resolver decide where the wizard stands.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::ClaimsApi;
use crate::config::WizardConfig;
use crate::context::ClaimContext;
use crate::error::{Result, WizardError};
use crate::history::{InMemoryRouteHistory, RouteHistory};
use crate::listing::ClaimListing;
use crate::models::{ClaimSnapshot, ClaimStatus, DocumentType, UploadFile};
use crate::navigation::NavigationController;
use crate::route::{Route, RouteParams};
use crate::step::{StepResolution, UploadFlags, WizardStep, resolve_step};
use crate::upload::{BatchReport, DocumentSlots, UploadBatchCoordinator};
use crate::validation::{ValidationReport, map_validation};

/// Operations currently waiting on the claims service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub creating: bool,
    pub uploading_documents: bool,
    pub uploading_images: bool,
    pub validating: bool,
    pub fetching: bool,
}

impl Activity {
    pub fn is_processing(&self) -> bool {
        self.creating
            || self.uploading_documents
            || self.uploading_images
            || self.validating
            || self.fetching
    }
}

/// What the wizard shows right now.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub session_id: Uuid,
    pub path: String,
    pub step: WizardStep,
    /// Confirmed snapshot with any optimistic status applied.
    pub claim: Option<ClaimSnapshot>,
    pub flags: UploadFlags,
    pub report: Option<ValidationReport>,
    pub activity: Activity,
    /// Attached file name per document slot, empty when the slot is empty.
    pub documents: Vec<(DocumentType, String)>,
    pub images: Vec<String>,
}

fn normalize_input(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub struct ClaimWizard {
    session_id: Uuid,
    config: WizardConfig,
    api: Arc<dyn ClaimsApi>,
    uploads: UploadBatchCoordinator,
    context: ClaimContext,
    navigation: NavigationController,
    documents: DocumentSlots,
    images: Vec<UploadFile>,
    activity: Activity,
}

impl ClaimWizard {
    pub fn new(api: Arc<dyn ClaimsApi>, config: WizardConfig) -> Self {
        Self::with_history(api, config, Arc::new(InMemoryRouteHistory::new()))
    }

    pub fn with_history(api: Arc<dyn ClaimsApi>, config: WizardConfig, history: Arc<dyn RouteHistory>) -> Self {
        let session_id = Uuid::new_v4();
        let navigation = NavigationController::new(session_id.to_string(), config.base_route.clone(), history);
        Self {
            session_id,
            uploads: UploadBatchCoordinator::new(api.clone()),
            api,
            config,
            context: ClaimContext::new(),
            navigation,
            documents: DocumentSlots::new(),
            images: Vec::new(),
            activity: Activity::default(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn context(&self) -> &ClaimContext {
        &self.context
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn claim_id(&self) -> Option<&str> {
        self.navigation.claim_id()
    }

    pub fn current_step(&self) -> WizardStep {
        self.navigation.current_step()
    }

    pub fn path(&self) -> String {
        self.navigation.path()
    }

    /// Follow a route, e.g. one typed by the user or opened from the claims list.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn open(&mut self, path: &str) -> Result<Route> {
        match Route::resolve(path, &self.config.base_route) {
            Route::ClaimsList => self.leave().await,
            Route::Wizard(params) => {
                self.navigation.visit(Route::Wizard(params.clone())).await?;
                self.on_route(params).await?;
                Ok(self.navigation.route())
            }
        }
    }

    /// React to changed route parameters.
    pub async fn on_route(&mut self, params: RouteParams) -> Result<()> {
        let reconciliation = self.navigation.reconcile(&params);
        if reconciliation.claim_changed {
            self.documents.clear();
            self.images.clear();
        }
        if reconciliation.fetch_required {
            self.refresh().await?;
        } else {
            self.navigation
                .navigate_to_step(self.navigation.current_step())
                .await?;
        }
        Ok(())
    }

    /// Leave the wizard for the claims list, discarding the claim context.
    pub async fn leave(&mut self) -> Result<Route> {
        self.context.clear().await;
        self.documents.clear();
        self.images.clear();
        self.navigation.leave().await
    }

    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn create_claim(&mut self, claim_number: &str, description: &str) -> Result<ClaimSnapshot> {
        let claim_number = normalize_input(claim_number);
        let description = normalize_input(description);

        self.activity.creating = true;
        let outcome = self
            .api
            .create_claim(claim_number.as_deref(), description.as_deref())
            .await;
        self.activity.creating = false;

        let claim = outcome?.into_data("Failed to create claim")?;
        info!(claim_id = %claim.id, claim_number = ?claim.claim_number, "claim created");

        self.documents.clear();
        self.images.clear();
        self.context.replace(claim.clone()).await;
        self.navigation.set_claim_id(Some(claim.id.clone()));
        self.navigation.navigate_to_step(WizardStep::Documents).await?;
        Ok(claim)
    }

    pub fn attach_document(&mut self, document_type: DocumentType, file: UploadFile) {
        self.documents.attach(document_type, file);
    }

    pub fn detach_document(&mut self, document_type: DocumentType) -> Option<UploadFile> {
        self.documents.detach(document_type)
    }

    pub fn document_file_name(&self, document_type: DocumentType) -> &str {
        self.documents.file_name(document_type)
    }

    pub fn documents(&self) -> &DocumentSlots {
        &self.documents
    }

    /// Replace the selected images.
    pub fn set_images(&mut self, images: Vec<UploadFile>) {
        self.images = images;
    }

    pub fn clear_images(&mut self) {
        self.images.clear();
    }

    pub fn images(&self) -> &[UploadFile] {
        &self.images
    }

    /// Upload the attached documents as one batch and move on to images.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn upload_documents(&mut self) -> Result<BatchReport> {
        let claim_id = self.navigation.claim_id().map(str::to_string);

        self.activity.uploading_documents = true;
        let outcome = self
            .uploads
            .upload_documents(claim_id.as_deref(), &self.documents)
            .await;
        self.activity.uploading_documents = false;

        let report = outcome?;
        self.advance_after_batch(ClaimStatus::DocumentsUploaded, WizardStep::Images)
            .await?;
        Ok(report)
    }

    /// Upload the selected images as one batch and move on to validation.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn upload_images(&mut self) -> Result<BatchReport> {
        let claim_id = self.navigation.claim_id().map(str::to_string);

        self.activity.uploading_images = true;
        let outcome = self
            .uploads
            .upload_images(claim_id.as_deref(), &self.images)
            .await;
        self.activity.uploading_images = false;

        let report = outcome?;
        self.advance_after_batch(ClaimStatus::ImagesUploaded, WizardStep::Validate)
            .await?;
        Ok(report)
    }

    async fn advance_after_batch(&mut self, status: ClaimStatus, step: WizardStep) -> Result<()> {
        self.context.set_optimistic_status(status).await;
        self.navigation.navigate_to_step(step).await?;
        self.refresh().await.map(|_| ())
    }

    /// Ask the service to validate the claim, then reload it for the results.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn validate(&mut self) -> Result<ValidationReport> {
        let claim_id = self
            .navigation
            .claim_id()
            .map(str::to_string)
            .ok_or(WizardError::MissingClaim)?;
        let flags = self.flags().await;
        if !flags.documents_uploaded || !flags.images_uploaded {
            return Err(WizardError::PrerequisitesIncomplete);
        }

        self.activity.validating = true;
        let previous = self
            .context
            .set_optimistic_status(ClaimStatus::Validating)
            .await;
        let outcome = self.run_validation(&claim_id).await;
        self.activity.validating = false;

        if let Err(e) = outcome {
            warn!(claim_id = %claim_id, error = %e, "validation failed");
            self.context.restore_optimistic_status(previous).await;
            return Err(e);
        }
        Ok(self.report().await.unwrap_or_default())
    }

    async fn run_validation(&mut self, claim_id: &str) -> Result<()> {
        self.api
            .validate_claim(claim_id)
            .await?
            .into_success("Failed to validate claim")?;
        info!(claim_id, "claim validated");
        self.refresh().await.map(|_| ())
    }

    /// Reload the claim snapshot and re-derive the step from it.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn refresh(&mut self) -> Result<StepResolution> {
        let claim_id = self
            .navigation
            .claim_id()
            .map(str::to_string)
            .ok_or(WizardError::MissingClaim)?;

        self.activity.fetching = true;
        let outcome = self.fetch(&claim_id).await;
        self.activity.fetching = false;
        outcome?;

        self.reconcile_step().await
    }

    async fn fetch(&self, claim_id: &str) -> Result<bool> {
        self.context.set_claim_id(Some(claim_id.to_string())).await;
        let ticket = self.context.begin_fetch(claim_id).await;
        let claim = self
            .api
            .get_claim(claim_id)
            .await?
            .into_data("Failed to load claim")?;
        Ok(self.context.complete_fetch(ticket, claim).await)
    }

    async fn reconcile_step(&mut self) -> Result<StepResolution> {
        let projection = self.context.projection().await;
        let resolution = resolve_step(projection.as_ref(), self.navigation.current_step());
        if projection.is_some() {
            if !resolution.status_recognized {
                warn!(
                    status = ?projection.as_ref().map(|c| c.status.as_str()),
                    "unrecognized claim status, keeping current step"
                );
            }
            self.navigation.navigate_to_step(resolution.step).await?;
        }
        Ok(resolution)
    }

    /// Upload flags derived from the current projection.
    pub async fn flags(&self) -> UploadFlags {
        let projection = self.context.projection().await;
        resolve_step(projection.as_ref(), self.navigation.current_step()).flags
    }

    pub async fn can_navigate_to_step(&self, step: WizardStep) -> bool {
        let flags = self.flags().await;
        self.navigation.can_navigate_to_step(step, flags)
    }

    /// User-initiated step change, refused when prerequisites are missing.
    pub async fn go_to_step(&mut self, step: WizardStep) -> Result<Route> {
        let flags = self.flags().await;
        self.navigation.go_to_step(step, flags).await
    }

    /// Report for the confirmed snapshot: validation results once it carries
    /// any, and policy details as soon as the policy document has extracted data.
    pub async fn report(&self) -> Option<ValidationReport> {
        let claim = self.context.snapshot().await?;
        let report = map_validation(&claim);
        (claim.validation.is_some() || report.policy_details.is_some()).then_some(report)
    }

    pub async fn view(&self) -> WizardView {
        let claim = self.context.projection().await;
        let flags = resolve_step(claim.as_ref(), self.navigation.current_step()).flags;
        WizardView {
            session_id: self.session_id,
            path: self.navigation.path(),
            step: self.navigation.current_step(),
            report: self.report().await,
            claim,
            flags,
            activity: self.activity,
            documents: DocumentType::ALL
                .into_iter()
                .map(|doc| (doc, self.documents.file_name(doc).to_string()))
                .collect(),
            images: self.images.iter().map(|f| f.file_name.clone()).collect(),
        }
    }

    /// One page of the claims list; `page` counts from zero.
    #[instrument(skip(self), fields(session_id = %self.session_id))]
    pub async fn list_claims(&self, page: u32) -> Result<ClaimListing> {
        let limit = self.config.page_size;
        let skip = page.saturating_mul(limit);
        let claims = self
            .api
            .list_claims(skip, limit)
            .await?
            .into_data("Failed to load claims")?;
        Ok(ClaimListing::from_page(&claims, skip, limit))
    }
}
