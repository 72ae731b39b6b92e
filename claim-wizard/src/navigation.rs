use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, WizardError};
use crate::history::RouteHistory;
use crate::route::{Route, RouteParams};
use crate::step::{UploadFlags, WizardStep};

/// Outcome of aligning the controller with route parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub claim_changed: bool,
    /// A claim id arrived that differs from the held one; fetch its snapshot.
    pub fetch_required: bool,
}

/// Keeps the wizard step and claim id in sync with the route.
///
/// Step changes replace the newest history entry instead of adding one, so
/// stepping through the wizard leaves a single entry behind.
pub struct NavigationController {
    session_id: String,
    base_route: String,
    claim_id: Option<String>,
    current: WizardStep,
    history: Arc<dyn RouteHistory>,
}

impl NavigationController {
    pub fn new(session_id: impl Into<String>, base_route: impl Into<String>, history: Arc<dyn RouteHistory>) -> Self {
        Self {
            session_id: session_id.into(),
            base_route: base_route.into(),
            claim_id: None,
            current: WizardStep::Create,
            history,
        }
    }

    pub fn claim_id(&self) -> Option<&str> {
        self.claim_id.as_deref()
    }

    pub fn set_claim_id(&mut self, claim_id: Option<String>) {
        self.claim_id = claim_id;
    }

    pub fn current_step(&self) -> WizardStep {
        self.current
    }

    pub fn base_route(&self) -> &str {
        &self.base_route
    }

    /// Route for the current claim id and step.
    pub fn route(&self) -> Route {
        Route::wizard(self.claim_id(), Some(self.current))
    }

    pub fn path(&self) -> String {
        self.route().to_path(&self.base_route)
    }

    /// Gate on prerequisites. Going back, or staying put, is always allowed.
    pub fn can_navigate_to_step(&self, step: WizardStep, flags: UploadFlags) -> bool {
        if step <= self.current {
            return true;
        }
        match step {
            WizardStep::Create => true,
            WizardStep::Documents => self.claim_id.is_some(),
            WizardStep::Images => flags.documents_uploaded,
            WizardStep::Validate => flags.images_uploaded,
        }
    }

    /// Move to `step` and replace the newest history entry with its route.
    pub async fn navigate_to_step(&mut self, step: WizardStep) -> Result<Route> {
        if step != self.current {
            debug!(session_id = %self.session_id, from = %self.current, to = %step, "changing wizard step");
        }
        self.current = step;
        let route = self.route();
        self.history.replace(&self.session_id, route.clone()).await?;
        Ok(route)
    }

    /// Gated variant of [`Self::navigate_to_step`].
    pub async fn go_to_step(&mut self, step: WizardStep, flags: UploadFlags) -> Result<Route> {
        if !self.can_navigate_to_step(step, flags) {
            return Err(WizardError::NavigationBlocked(step.index()));
        }
        self.navigate_to_step(step).await
    }

    /// Record a route the user opened.
    pub async fn visit(&self, route: Route) -> Result<()> {
        self.history.push(&self.session_id, route).await
    }

    /// Leave the wizard for the claims list, adding a history entry.
    pub async fn leave(&mut self) -> Result<Route> {
        self.claim_id = None;
        self.current = WizardStep::Create;
        self.history.push(&self.session_id, Route::ClaimsList).await?;
        Ok(Route::ClaimsList)
    }

    /// Align with route parameters.
    ///
    /// With a claim id, an id different from the held one asks for a fetch
    /// and a valid step name overrides the current step. Without one, the
    /// held claim id is kept and the step comes from the name, falling back
    /// to the first step.
    pub fn reconcile(&mut self, params: &RouteParams) -> Reconciliation {
        let step = params.step();
        match &params.claim_id {
            Some(claim_id) => {
                let claim_changed = self.claim_id.as_deref() != Some(claim_id.as_str());
                if claim_changed {
                    info!(session_id = %self.session_id, claim_id = %claim_id, "route selected claim");
                    self.claim_id = Some(claim_id.clone());
                }
                if let Some(step) = step {
                    self.current = step;
                }
                Reconciliation {
                    claim_changed,
                    fetch_required: claim_changed,
                }
            }
            None => {
                self.current = step.unwrap_or(WizardStep::Create);
                Reconciliation {
                    claim_changed: false,
                    fetch_required: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryRouteHistory;

    const BASE: &str = "/claim-validator";

    fn controller() -> (NavigationController, Arc<InMemoryRouteHistory>) {
        let history = Arc::new(InMemoryRouteHistory::new());
        (NavigationController::new("s1", BASE, history.clone()), history)
    }

    fn params(claim_id: Option<&str>, step_name: Option<&str>) -> RouteParams {
        RouteParams {
            claim_id: claim_id.map(str::to_string),
            step_name: step_name.map(str::to_string),
        }
    }

    #[test]
    fn forward_navigation_needs_prerequisites() {
        let (mut nav, _) = controller();
        let none = UploadFlags::default();
        assert!(!nav.can_navigate_to_step(WizardStep::Documents, none));

        nav.set_claim_id(Some("abc".into()));
        assert!(nav.can_navigate_to_step(WizardStep::Documents, none));
        assert!(!nav.can_navigate_to_step(WizardStep::Images, none));
        assert!(!nav.can_navigate_to_step(WizardStep::Validate, none));

        let docs = UploadFlags {
            documents_uploaded: true,
            images_uploaded: false,
        };
        assert!(nav.can_navigate_to_step(WizardStep::Images, docs));
        assert!(!nav.can_navigate_to_step(WizardStep::Validate, docs));
    }

    #[tokio::test]
    async fn backward_navigation_always_allowed() {
        let (mut nav, _) = controller();
        nav.navigate_to_step(WizardStep::Validate).await.unwrap();
        for step in WizardStep::ALL {
            assert!(nav.can_navigate_to_step(step, UploadFlags::default()));
        }
    }

    #[tokio::test]
    async fn step_changes_replace_history() {
        let (mut nav, history) = controller();
        nav.set_claim_id(Some("abc".into()));
        nav.navigate_to_step(WizardStep::Documents).await.unwrap();
        nav.navigate_to_step(WizardStep::Images).await.unwrap();

        assert_eq!(history.len("s1").await.unwrap(), 1);
        assert_eq!(nav.path(), "/claim-validator/abc/images");
    }

    #[tokio::test]
    async fn blocked_navigation_reports_target() {
        let (mut nav, _) = controller();
        let err = nav
            .go_to_step(WizardStep::Images, UploadFlags::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::NavigationBlocked(3)));
        assert_eq!(nav.current_step(), WizardStep::Create);
    }

    #[test]
    fn reconcile_new_claim_requests_fetch() {
        let (mut nav, _) = controller();
        let outcome = nav.reconcile(&params(Some("abc"), Some("images")));
        assert!(outcome.fetch_required);
        assert_eq!(nav.current_step(), WizardStep::Images);

        let again = nav.reconcile(&params(Some("abc"), Some("documents")));
        assert!(!again.fetch_required);
        assert_eq!(nav.current_step(), WizardStep::Documents);
    }

    #[test]
    fn reconcile_ignores_unknown_step_name() {
        let (mut nav, _) = controller();
        nav.reconcile(&params(Some("abc"), Some("validate")));
        nav.reconcile(&params(Some("abc"), Some("summary")));
        assert_eq!(nav.current_step(), WizardStep::Validate);
    }

    #[test]
    fn reconcile_without_claim_keeps_held_id() {
        let (mut nav, _) = controller();
        nav.set_claim_id(Some("abc".into()));

        let outcome = nav.reconcile(&params(None, Some("images")));
        assert!(!outcome.fetch_required);
        assert_eq!(nav.claim_id(), Some("abc"));
        assert_eq!(nav.current_step(), WizardStep::Images);

        nav.reconcile(&params(None, None));
        assert_eq!(nav.current_step(), WizardStep::Create);
    }
}
