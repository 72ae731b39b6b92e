use claim_wizard::display::{NOT_AVAILABLE, format_confidence, yes_no};
use claim_wizard::{ClaimListing, ValidationReport, WizardStep, WizardView};
use std::fmt::Write;

pub fn listing(listing: &ClaimListing) -> String {
    let mut out = String::new();
    if listing.rows.is_empty() {
        out.push_str("No claims yet. Type `new` to start one.");
        return out;
    }
    let _ = writeln!(out, "{:<34} {:<14} {:<20} {}", "ID", "CLAIM", "STATUS", "CREATED");
    for row in &listing.rows {
        let _ = writeln!(
            out,
            "{:<34} {:<14} {:<20} {}",
            row.id, row.claim_number, row.status, row.created
        );
    }
    let shown_to = u64::from(listing.skip) + listing.rows.len() as u64;
    let _ = write!(out, "Showing {}-{}", listing.skip + 1, shown_to);
    if let Some(total) = listing.total {
        let _ = write!(out, " of {total}");
    }
    if listing.has_more() {
        let _ = write!(out, " (more with `list --page N`)");
    }
    out
}

pub fn view(view: &WizardView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Route: {}", view.path);
    for step in WizardStep::ALL {
        let marker = if step == view.step { ">" } else { " " };
        let _ = writeln!(out, "{marker} {step}");
    }

    match &view.claim {
        Some(claim) => {
            let _ = writeln!(
                out,
                "Claim {} ({}), status: {}",
                claim.id,
                claim.claim_number.as_deref().unwrap_or(NOT_AVAILABLE),
                claim.status.label()
            );
        }
        None => {
            let _ = writeln!(out, "No claim yet");
        }
    }
    let _ = writeln!(
        out,
        "Documents uploaded: {}  Images uploaded: {}",
        yes_no(view.flags.documents_uploaded),
        yes_no(view.flags.images_uploaded)
    );

    match view.step {
        WizardStep::Documents => {
            for (document_type, file_name) in &view.documents {
                let required = if document_type.is_required() { "*" } else { " " };
                let shown = if file_name.is_empty() { "(empty)" } else { file_name.as_str() };
                let _ = writeln!(out, "  {required} {:<16} {shown}", document_type.label());
            }
        }
        WizardStep::Images => {
            for (index, name) in view.images.iter().enumerate() {
                let _ = writeln!(out, "  Image {}: {name}", index + 1);
            }
        }
        WizardStep::Validate => {
            if let Some(report) = &view.report {
                out.push_str(&self::report(report));
            }
        }
        WizardStep::Create => {}
    }
    if view.activity.is_processing() {
        let _ = writeln!(out, "(working...)");
    }
    out.trim_end().to_string()
}

pub fn report(report: &ValidationReport) -> String {
    let mut out = String::new();
    if let Some(policy) = &report.policy_details {
        let _ = writeln!(out, "Policy holder: {}", policy.name);
        let _ = writeln!(out, "Vehicle: {}", policy.vehicle_reg_no);
        let _ = writeln!(out, "Policy period: {} - {}", policy.policy_start, policy.policy_expiry);
    }
    if report.results.is_empty()
        && report.damage_analysis.is_none()
        && report.issues.is_empty()
        && report.warnings.is_empty()
        && !report.manual_review_required
    {
        // policy details only, nothing validated yet
        return out;
    }
    for result in &report.results {
        let _ = writeln!(
            out,
            "{} {:<20} {:<8} confidence {}",
            result.status.icon(),
            result.name,
            result.status.as_str(),
            format_confidence(result.confidence)
        );
        for mismatch in &result.mismatches {
            let _ = writeln!(out, "    - {mismatch}");
        }
    }
    let _ = writeln!(out, "Overall confidence: {}", format_confidence(report.overall_confidence));
    let _ = writeln!(out, "Manual review required: {}", yes_no(report.manual_review_required));
    for issue in &report.issues {
        let _ = writeln!(out, "Issue: {issue}");
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "Warning: {warning}");
    }
    if let Some(damage) = &report.damage_analysis {
        let _ = writeln!(out, "Damage analysis: {damage}");
    }
    out
}
