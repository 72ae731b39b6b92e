pub mod api;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod history;
#[cfg(feature = "http")]
pub mod http;
pub mod listing;
pub mod memory;
pub mod models;
pub mod navigation;
pub mod route;
pub mod step;
pub mod upload;
pub mod validation;
pub mod wizard;

// Re-export commonly used types
pub use api::{ApiResult, ClaimsApi, ServerResponse};
pub use config::WizardConfig;
pub use context::{ClaimContext, FetchTicket};
pub use error::{ApiError, Result, WizardError};
pub use history::{InMemoryRouteHistory, RouteHistory};
#[cfg(feature = "http")]
pub use http::HttpClaimsApi;
pub use listing::{ClaimListing, ClaimSummary};
pub use memory::{FailurePoint, InMemoryClaimsApi};
pub use models::{ClaimPage, ClaimSnapshot, ClaimStatus, DocumentType, UploadFile, ValidationPayload};
pub use navigation::NavigationController;
pub use route::{Route, RouteParams};
pub use step::{StepResolution, UploadFlags, WizardStep, resolve_step};
pub use upload::{BatchKind, BatchReport, DocumentSlots, UploadBatchCoordinator};
pub use validation::{ValidationReport, ValidationResult, ValidationStatus, map_validation};
pub use wizard::{Activity, ClaimWizard, WizardView};
