use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::display::{NOT_AVAILABLE, format_date};
use crate::models::{CategoryCheck, ClaimSnapshot, ValidationPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Review,
    Mismatch,
}

impl ValidationStatus {
    pub fn icon(self) -> &'static str {
        match self {
            ValidationStatus::Passed => "✓",
            ValidationStatus::Review | ValidationStatus::Mismatch => "▲",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStatus::Passed => "passed",
            ValidationStatus::Review => "review",
            ValidationStatus::Mismatch => "mismatch",
        }
    }
}

/// Checks reported by the validation service, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCategory {
    Name,
    Vehicle,
    Date,
    Damage,
}

impl ValidationCategory {
    pub const ORDER: [ValidationCategory; 4] = [
        ValidationCategory::Name,
        ValidationCategory::Vehicle,
        ValidationCategory::Date,
        ValidationCategory::Damage,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ValidationCategory::Name => "Name Validation",
            ValidationCategory::Vehicle => "Vehicle Validation",
            ValidationCategory::Date => "Date Validation",
            ValidationCategory::Damage => "Damage Validation",
        }
    }

    /// Status given to a check that did not pass.
    fn failure_status(self) -> ValidationStatus {
        match self {
            ValidationCategory::Name | ValidationCategory::Vehicle => ValidationStatus::Mismatch,
            ValidationCategory::Date | ValidationCategory::Damage => ValidationStatus::Review,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub category: ValidationCategory,
    pub name: String,
    pub status: ValidationStatus,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub mismatches: Vec<String>,
}

/// Policy fields shown next to the results, each defaulting to `N/A`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDetails {
    pub name: String,
    pub vehicle_reg_no: String,
    pub policy_start: String,
    pub policy_expiry: String,
}

/// Everything the results step shows, derived from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
    pub policy_details: Option<PolicyDetails>,
    pub overall_confidence: f64,
    pub manual_review_required: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub damage_analysis: Option<Value>,
}

fn clamp_confidence(raw: Option<f64>) -> f64 {
    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn category_result(
    category: ValidationCategory,
    passed: bool,
    confidence: Option<f64>,
    mismatches: &[String],
) -> ValidationResult {
    ValidationResult {
        category,
        name: category.title().to_string(),
        status: if passed {
            ValidationStatus::Passed
        } else {
            category.failure_status()
        },
        confidence: clamp_confidence(confidence),
        mismatches: mismatches.to_vec(),
    }
}

fn check_result(category: ValidationCategory, check: &CategoryCheck) -> ValidationResult {
    category_result(
        category,
        check.is_valid.unwrap_or(false),
        check.confidence,
        &check.mismatches,
    )
}

/// Category results in fixed order. Absent categories are skipped, never padded.
pub fn map_results(payload: &ValidationPayload) -> Vec<ValidationResult> {
    ValidationCategory::ORDER
        .into_iter()
        .filter_map(|category| match category {
            ValidationCategory::Name => payload
                .name_validation
                .as_ref()
                .map(|c| check_result(category, c)),
            ValidationCategory::Vehicle => payload
                .vehicle_validation
                .as_ref()
                .map(|c| check_result(category, c)),
            ValidationCategory::Date => payload
                .date_validation
                .as_ref()
                .map(|c| check_result(category, c)),
            ValidationCategory::Damage => payload.damage_validation.as_ref().map(|damage| {
                // explicit validity wins over the older matches_description flag
                let passed = damage
                    .is_valid
                    .or(damage.matches_description)
                    .unwrap_or(false);
                category_result(category, passed, damage.confidence, &damage.mismatches)
            }),
        })
        .collect()
}

/// Project the policy document's extracted fields for display.
///
/// Returns `None` when there is no policy document or it carries no
/// extracted data; individual missing fields become `N/A`.
pub fn policy_details(snapshot: &ClaimSnapshot) -> Option<PolicyDetails> {
    let extracted = snapshot
        .policy_document()?
        .extracted_data
        .as_ref()
        .filter(|data| !data.is_null())?;

    let field = |key: &str| {
        extracted
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let text = |key: &str| field(key).unwrap_or(NOT_AVAILABLE).to_string();
    let date = |key: &str| field(key).map(format_date).unwrap_or_else(|| NOT_AVAILABLE.to_string());

    Some(PolicyDetails {
        name: text("insured_name"),
        vehicle_reg_no: text("vehicle_registration"),
        policy_start: date("policy_start_date"),
        policy_expiry: date("policy_expiry_date"),
    })
}

/// Normalize the nested validation payload of a freshly fetched snapshot.
pub fn map_validation(snapshot: &ClaimSnapshot) -> ValidationReport {
    let policy_details = policy_details(snapshot);
    let Some(payload) = snapshot.validation.as_ref() else {
        return ValidationReport {
            policy_details,
            ..Default::default()
        };
    };

    ValidationReport {
        results: map_results(payload),
        policy_details,
        overall_confidence: clamp_confidence(payload.overall_confidence),
        manual_review_required: payload.overall_valid == Some(false),
        issues: payload.issues.clone(),
        warnings: payload.warnings.clone(),
        damage_analysis: payload
            .damage_validation
            .as_ref()
            .and_then(|damage| serde_json::to_value(damage).ok()),
    }
}
