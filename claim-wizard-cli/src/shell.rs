//! Line commands of the interactive shell.

use clap::{Parser, Subcommand};
use claim_wizard::{ClaimWizard, DocumentType, Result, Route, UploadFile, WizardStep};
use std::path::PathBuf;
use tracing::info;

use crate::render;

/// One line typed at the prompt.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug)]
pub enum ShellCommand {
    /// List claims, ten per page by default
    List {
        /// Page number, starting at 0
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Start a new claim
    New,
    /// Open a route, e.g. /claim-validator/<id>/images or /claims
    Open { route: String },
    /// View a claim from the list
    View { claim_id: String },
    /// Create the claim (step 1)
    Create {
        #[arg(long, default_value = "")]
        number: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Attach a file to a document slot: policy, claim, license, aadhaar, pan, repair
    Attach { slot: DocumentType, path: PathBuf },
    /// Empty a document slot
    Detach { slot: DocumentType },
    /// Replace the selected car photos
    Images {
        paths: Vec<PathBuf>,
        #[arg(long, conflicts_with = "paths")]
        clear: bool,
    },
    /// Upload the attached documents (step 2)
    UploadDocuments,
    /// Upload the selected photos (step 3)
    UploadImages,
    /// Validate the claim and show the results (step 4)
    Validate,
    /// Go to a step by number or name
    Goto { step: WizardStep },
    /// Reload the claim from the service
    Refresh,
    /// Show the wizard state
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

pub enum Flow {
    Continue,
    Quit,
}

pub async fn execute(wizard: &mut ClaimWizard, command: ShellCommand) -> Result<Flow> {
    let base = wizard.config().base_route.clone();
    match command {
        ShellCommand::List { page } => {
            let listing = wizard.list_claims(page).await?;
            println!("{}", render::listing(&listing));
        }
        ShellCommand::New => {
            let route = claim_wizard::listing::new_claim_route();
            wizard.open(&route.to_path(&base)).await?;
            println!("{}", render::view(&wizard.view().await));
        }
        ShellCommand::Open { route } => {
            if wizard.open(&route).await? == Route::ClaimsList {
                let listing = wizard.list_claims(0).await?;
                println!("{}", render::listing(&listing));
            } else {
                println!("{}", render::view(&wizard.view().await));
            }
        }
        ShellCommand::View { claim_id } => {
            let route = claim_wizard::listing::view_claim_route(&claim_id);
            wizard.open(&route.to_path(&base)).await?;
            println!("{}", render::view(&wizard.view().await));
        }
        ShellCommand::Create {
            number,
            description,
        } => {
            let claim = wizard.create_claim(&number, &description).await?;
            println!("Claim created: {}", claim.id);
            println!("{}", render::view(&wizard.view().await));
        }
        ShellCommand::Attach { slot, path } => {
            let file = UploadFile::from_path(&path).await?;
            info!(document_type = %slot, file_name = %file.file_name, bytes = file.data.len(), "document attached");
            wizard.attach_document(slot, file);
            println!("{}: {}", slot.label(), wizard.document_file_name(slot));
        }
        ShellCommand::Detach { slot } => {
            wizard.detach_document(slot);
            println!("{}: (empty)", slot.label());
        }
        ShellCommand::Images { paths, clear } => {
            if clear {
                wizard.clear_images();
            } else {
                let mut images = Vec::with_capacity(paths.len());
                for path in &paths {
                    images.push(UploadFile::from_path(path).await?);
                }
                wizard.set_images(images);
            }
            println!("{} photo(s) selected", wizard.images().len());
        }
        ShellCommand::UploadDocuments => {
            let report = wizard.upload_documents().await?;
            println!("Uploaded {} documents", report.dispatched);
            println!("{}", render::view(&wizard.view().await));
        }
        ShellCommand::UploadImages => {
            let report = wizard.upload_images().await?;
            println!("Uploaded {} images", report.dispatched);
            println!("{}", render::view(&wizard.view().await));
        }
        ShellCommand::Validate => {
            let report = wizard.validate().await?;
            println!("{}", render::report(&report));
        }
        ShellCommand::Goto { step } => {
            wizard.go_to_step(step).await?;
            println!("{}", render::view(&wizard.view().await));
        }
        ShellCommand::Refresh => {
            wizard.refresh().await?;
            println!("{}", render::view(&wizard.view().await));
        }
        ShellCommand::Show { json } => {
            let view = wizard.view().await;
            if json {
                match serde_json::to_string_pretty(&view) {
                    Ok(text) => println!("{text}"),
                    Err(e) => println!("error: {e}"),
                }
            } else {
                println!("{}", render::view(&view));
            }
        }
        ShellCommand::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ShellCommand {
        let words = shell_words::split(line).unwrap();
        ShellLine::try_parse_from(words).unwrap().command
    }

    #[test]
    fn parses_quoted_create() {
        match parse(r#"create --number CLM-100 --description "rear-end collision""#) {
            ShellCommand::Create {
                number,
                description,
            } => {
                assert_eq!(number, "CLM-100");
                assert_eq!(description, "rear-end collision");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_slot_aliases_and_steps() {
        assert!(matches!(
            parse("attach license ./dl.pdf"),
            ShellCommand::Attach {
                slot: DocumentType::DrivingLicense,
                ..
            }
        ));
        assert!(matches!(
            parse("goto images"),
            ShellCommand::Goto {
                step: WizardStep::Images
            }
        ));
        assert!(matches!(parse("goto 4"), ShellCommand::Goto { step: WizardStep::Validate }));
        assert!(matches!(parse("upload-documents"), ShellCommand::UploadDocuments));
        assert!(matches!(parse("exit"), ShellCommand::Quit));
    }

    #[test]
    fn rejects_unknown_slot() {
        let words = shell_words::split("attach passport ./p.pdf").unwrap();
        assert!(ShellLine::try_parse_from(words).is_err());
    }
}
