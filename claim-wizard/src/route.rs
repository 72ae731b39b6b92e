//! Wizard and claims-list routes.
//!
//! Wizard routes take three shapes under the base route:
//! `{base}`, `{base}/{stepName}`, `{base}/{claimId}` and
//! `{base}/{claimId}/{stepName}`. A single segment counts as a step name
//! only when it is one of the four step names.

use std::fmt;
use tracing::warn;

use crate::config::CLAIMS_LIST_ROUTE;
use crate::error::{Result, WizardError};
use crate::step::WizardStep;

/// Parameters carried by a wizard route. The step name is kept raw; an
/// unknown name is ignored during reconciliation rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    pub claim_id: Option<String>,
    pub step_name: Option<String>,
}

impl RouteParams {
    pub fn new(claim_id: Option<&str>, step: Option<WizardStep>) -> Self {
        Self {
            claim_id: claim_id.map(str::to_string),
            step_name: step.map(|s| s.route_name().to_string()),
        }
    }

    pub fn step(&self) -> Option<WizardStep> {
        self.step_name.as_deref().and_then(WizardStep::from_route_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ClaimsList,
    Wizard(RouteParams),
}

impl Route {
    pub fn wizard(claim_id: Option<&str>, step: Option<WizardStep>) -> Self {
        Route::Wizard(RouteParams::new(claim_id, step))
    }

    /// Parse `path` against the wizard `base` route.
    pub fn parse(path: &str, base: &str) -> Result<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let base_segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
        let list_segments: Vec<&str> = CLAIMS_LIST_ROUTE.split('/').filter(|s| !s.is_empty()).collect();

        if segments.is_empty() || segments == list_segments {
            return Ok(Route::ClaimsList);
        }
        if !segments.starts_with(&base_segments) {
            return Err(WizardError::UnknownRoute(path.to_string()));
        }

        let params = match &segments[base_segments.len()..] {
            [] => RouteParams::default(),
            [only] if WizardStep::from_route_name(only).is_some() => RouteParams {
                claim_id: None,
                step_name: Some(only.to_string()),
            },
            [claim_id] => RouteParams {
                claim_id: Some(claim_id.to_string()),
                step_name: None,
            },
            [claim_id, step_name] => RouteParams {
                claim_id: Some(claim_id.to_string()),
                step_name: Some(step_name.to_string()),
            },
            _ => return Err(WizardError::UnknownRoute(path.to_string())),
        };
        Ok(Route::Wizard(params))
    }

    /// Like [`Route::parse`], but unknown paths redirect to the claims list.
    pub fn resolve(path: &str, base: &str) -> Self {
        Self::parse(path, base).unwrap_or_else(|e| {
            warn!(error = %e, "redirecting to claims list");
            Route::ClaimsList
        })
    }

    pub fn to_path(&self, base: &str) -> String {
        match self {
            Route::ClaimsList => CLAIMS_LIST_ROUTE.to_string(),
            Route::Wizard(params) => {
                let mut path = base.trim_end_matches('/').to_string();
                for segment in [&params.claim_id, &params.step_name].into_iter().flatten() {
                    path.push('/');
                    path.push_str(segment);
                }
                path
            }
        }
    }

    pub fn params(&self) -> Option<&RouteParams> {
        match self {
            Route::ClaimsList => None,
            Route::Wizard(params) => Some(params),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::ClaimsList => f.write_str(CLAIMS_LIST_ROUTE),
            Route::Wizard(params) => write!(
                f,
                "wizard(claim={}, step={})",
                params.claim_id.as_deref().unwrap_or("-"),
                params.step_name.as_deref().unwrap_or("-")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "/claim-validator";

    fn wizard(claim_id: Option<&str>, step_name: Option<&str>) -> Route {
        Route::Wizard(RouteParams {
            claim_id: claim_id.map(str::to_string),
            step_name: step_name.map(str::to_string),
        })
    }

    #[test]
    fn parses_wizard_shapes() {
        assert_eq!(Route::parse(BASE, BASE).unwrap(), wizard(None, None));
        assert_eq!(Route::parse("/claim-validator/images", BASE).unwrap(), wizard(None, Some("images")));
        assert_eq!(Route::parse("/claim-validator/abc123", BASE).unwrap(), wizard(Some("abc123"), None));
        assert_eq!(
            Route::parse("/claim-validator/abc123/validate/", BASE).unwrap(),
            wizard(Some("abc123"), Some("validate"))
        );
    }

    #[test]
    fn empty_and_list_paths_go_to_claims() {
        assert_eq!(Route::parse("", BASE).unwrap(), Route::ClaimsList);
        assert_eq!(Route::parse("/", BASE).unwrap(), Route::ClaimsList);
        assert_eq!(Route::parse("/claims?page=2", BASE).unwrap(), Route::ClaimsList);
    }

    #[test]
    fn unknown_paths_redirect() {
        assert!(matches!(Route::parse("/settings", BASE), Err(WizardError::UnknownRoute(_))));
        assert_eq!(Route::resolve("/claim-validator/a/b/c", BASE), Route::ClaimsList);
    }

    #[test]
    fn unknown_step_name_is_kept_raw() {
        let route = Route::parse("/claim-validator/abc/summary", BASE).unwrap();
        let params = route.params().unwrap();
        assert_eq!(params.step_name.as_deref(), Some("summary"));
        assert_eq!(params.step(), None);
    }

    #[test]
    fn builds_paths() {
        assert_eq!(Route::wizard(Some("abc"), Some(WizardStep::Images)).to_path(BASE), "/claim-validator/abc/images");
        assert_eq!(Route::wizard(None, Some(WizardStep::Create)).to_path(BASE), "/claim-validator/create");
        assert_eq!(Route::wizard(None, None).to_path(BASE), "/claim-validator");
        assert_eq!(Route::ClaimsList.to_path(BASE), "/claims");
    }
}
