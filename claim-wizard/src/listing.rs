//! Rows of the claims list and the routes they lead to.

use serde::Serialize;

use crate::display::{NOT_AVAILABLE, format_timestamp};
use crate::models::{ClaimPage, ClaimSnapshot};
use crate::route::Route;
use crate::step::WizardStep;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimSummary {
    pub id: String,
    pub claim_number: String,
    pub status: String,
    pub created: String,
    pub documents: usize,
    pub images: usize,
}

impl From<&ClaimSnapshot> for ClaimSummary {
    fn from(claim: &ClaimSnapshot) -> Self {
        Self {
            id: claim.id.clone(),
            claim_number: claim
                .claim_number
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            status: claim.status.label().to_string(),
            created: claim
                .created_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            documents: claim.documents.len(),
            images: claim.images.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimListing {
    pub rows: Vec<ClaimSummary>,
    pub skip: u32,
    pub limit: u32,
    pub total: Option<u64>,
}

impl ClaimListing {
    pub fn from_page(page: &ClaimPage, skip: u32, limit: u32) -> Self {
        Self {
            rows: page.claims.iter().map(ClaimSummary::from).collect(),
            skip,
            limit,
            total: page.total,
        }
    }

    /// Whether another page may follow. Without a total, a full page implies more.
    pub fn has_more(&self) -> bool {
        let seen = u64::from(self.skip) + self.rows.len() as u64;
        match self.total {
            Some(total) => seen < total,
            None => self.rows.len() as u64 >= u64::from(self.limit),
        }
    }
}

/// Route opened by selecting a claim in the list.
pub fn view_claim_route(claim_id: &str) -> Route {
    Route::wizard(Some(claim_id), Some(WizardStep::Validate))
}

/// Route opened by the "new claim" action.
pub fn new_claim_route() -> Route {
    Route::wizard(None, None)
}
