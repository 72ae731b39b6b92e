use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WizardError;
use crate::models::{ClaimSnapshot, ClaimStatus};

/// The four ordered stages of the claim workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Create = 1,
    Documents = 2,
    Images = 3,
    Validate = 4,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        WizardStep::Create,
        WizardStep::Documents,
        WizardStep::Images,
        WizardStep::Validate,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index).checked_sub(1)?).copied()
    }

    /// Name used for this step in the route.
    pub fn route_name(self) -> &'static str {
        match self {
            WizardStep::Create => "create",
            WizardStep::Documents => "documents",
            WizardStep::Images => "images",
            WizardStep::Validate => "validate",
        }
    }

    pub fn from_route_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.route_name() == name)
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::Create => "Create Claim",
            WizardStep::Documents => "Upload Documents",
            WizardStep::Images => "Upload Images",
            WizardStep::Validate => "Validate & Results",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.index(), self.title())
    }
}

impl FromStr for WizardStep {
    type Err = WizardError;

    /// Accepts either the step index or its route name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.parse::<u8>()
            .ok()
            .and_then(WizardStep::from_index)
            .or_else(|| WizardStep::from_route_name(s))
            .ok_or_else(|| WizardError::InvalidStep(s.to_string()))
    }
}

/// Upload completion, always derived from a snapshot and never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UploadFlags {
    pub documents_uploaded: bool,
    pub images_uploaded: bool,
}

/// Result of reconciling the wizard position with a claim snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResolution {
    pub step: WizardStep,
    pub flags: UploadFlags,
    /// False when the status gave no opinion and `step` is the caller's current step.
    pub status_recognized: bool,
}

/// Derive the workflow step and upload flags from server state.
///
/// Flags come from array emptiness; the status may force them on but never
/// off. An unrecognized status leaves `current` untouched.
pub fn resolve_step(snapshot: Option<&ClaimSnapshot>, current: WizardStep) -> StepResolution {
    let Some(claim) = snapshot else {
        return StepResolution {
            step: current,
            flags: UploadFlags::default(),
            status_recognized: false,
        };
    };

    let mut flags = UploadFlags {
        documents_uploaded: !claim.documents.is_empty(),
        images_uploaded: !claim.images.is_empty(),
    };

    let step = match claim.status {
        ClaimStatus::Created | ClaimStatus::Draft => {
            if flags.documents_uploaded {
                WizardStep::Images
            } else {
                WizardStep::Documents
            }
        }
        ClaimStatus::DocumentsUploaded => {
            flags.documents_uploaded = true;
            WizardStep::Images
        }
        ClaimStatus::ImagesUploaded
        | ClaimStatus::Validating
        | ClaimStatus::Completed
        | ClaimStatus::Validated => {
            flags.documents_uploaded = true;
            flags.images_uploaded = true;
            WizardStep::Validate
        }
        ClaimStatus::Unknown(_) => {
            return StepResolution {
                step: current,
                flags,
                status_recognized: false,
            };
        }
    };

    StepResolution {
        step,
        flags,
        status_recognized: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClaimDocument, ClaimImage, DocumentType};

    fn claim(status: ClaimStatus, documents: usize, images: usize) -> ClaimSnapshot {
        let mut snapshot = ClaimSnapshot::new("c1", status);
        snapshot.documents = vec![ClaimDocument::new(DocumentType::Policy); documents];
        snapshot.images = vec![ClaimImage::default(); images];
        snapshot
    }

    #[test]
    fn created_and_draft_depend_on_documents() {
        for status in [ClaimStatus::Created, ClaimStatus::Draft] {
            let empty = resolve_step(Some(&claim(status.clone(), 0, 0)), WizardStep::Create);
            assert_eq!(empty.step, WizardStep::Documents);
            assert!(!empty.flags.documents_uploaded);

            let with_docs = resolve_step(Some(&claim(status, 2, 0)), WizardStep::Create);
            assert_eq!(with_docs.step, WizardStep::Images);
            assert!(with_docs.flags.documents_uploaded);
        }
    }

    #[test]
    fn documents_uploaded_forces_flag() {
        let resolution = resolve_step(
            Some(&claim(ClaimStatus::DocumentsUploaded, 0, 0)),
            WizardStep::Create,
        );
        assert_eq!(resolution.step, WizardStep::Images);
        assert!(resolution.flags.documents_uploaded);
        assert!(!resolution.flags.images_uploaded);
    }

    #[test]
    fn late_statuses_land_on_validate() {
        for status in [
            ClaimStatus::ImagesUploaded,
            ClaimStatus::Validating,
            ClaimStatus::Completed,
            ClaimStatus::Validated,
        ] {
            let resolution = resolve_step(Some(&claim(status, 0, 0)), WizardStep::Documents);
            assert_eq!(resolution.step, WizardStep::Validate);
            assert_eq!(
                resolution.flags,
                UploadFlags {
                    documents_uploaded: true,
                    images_uploaded: true
                }
            );
        }
    }

    #[test]
    fn unknown_status_keeps_current_step() {
        let resolution = resolve_step(
            Some(&claim(ClaimStatus::Unknown("archived".into()), 1, 1)),
            WizardStep::Documents,
        );
        assert_eq!(resolution.step, WizardStep::Documents);
        assert!(!resolution.status_recognized);
        assert!(resolution.flags.documents_uploaded);
        assert!(resolution.flags.images_uploaded);
    }

    #[test]
    fn absent_snapshot_is_a_no_op() {
        let resolution = resolve_step(None, WizardStep::Images);
        assert_eq!(resolution.step, WizardStep::Images);
        assert_eq!(resolution.flags, UploadFlags::default());
    }

    #[test]
    fn step_names_round_trip_through_parse() {
        assert_eq!("documents".parse::<WizardStep>().unwrap(), WizardStep::Documents);
        assert_eq!("4".parse::<WizardStep>().unwrap(), WizardStep::Validate);
        assert!("0".parse::<WizardStep>().is_err());
        assert!("summary".parse::<WizardStep>().is_err());
        assert_eq!(WizardStep::from_index(5), None);
    }
}
