mod render;
mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use claim_wizard::{ClaimWizard, ClaimsApi, HttpClaimsApi, InMemoryClaimsApi, WizardConfig};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Instrument, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::shell::{Flow, ShellLine};

#[derive(Parser, Debug)]
#[command(name = "claim-wizard", version, about = "Step-by-step insurance claim validation")]
struct Args {
    /// Claims service root; overrides CLAIMS_API_URL
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Request timeout in seconds; overrides CLAIMS_API_TIMEOUT_SECS
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Run against an in-memory claims service instead of the network
    #[arg(long)]
    in_memory: bool,

    /// Route to open on start, e.g. /claim-validator/<id>/validate
    #[arg(long, value_name = "ROUTE")]
    open: Option<String>,
}

/// Initialize tracing on stderr based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "claim_wizard=info,claim_wizard_cli=info".into());

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

fn load_config(args: &Args) -> Result<WizardConfig> {
    let mut config = WizardConfig::from_env().context("invalid configuration")?;
    if let Some(url) = &args.api_url {
        config.api_url = url.clone();
    }
    if let Some(secs) = args.timeout_secs {
        config.request_timeout = Some(Duration::from_secs(secs));
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = load_config(&args)?;

    let api: Arc<dyn ClaimsApi> = if args.in_memory {
        info!("Using in-memory claims service");
        Arc::new(InMemoryClaimsApi::new())
    } else {
        info!(api_url = %config.api_url, "Using claims service");
        Arc::new(HttpClaimsApi::new(&config)?)
    };

    let mut wizard = ClaimWizard::new(api, config);
    let span = tracing::info_span!("wizard_session", session_id = %wizard.session_id());

    let start = args.open.clone().unwrap_or_else(|| "/claims".to_string());
    run(&mut wizard, &start).instrument(span).await
}

async fn run(wizard: &mut ClaimWizard, start: &str) -> Result<()> {
    info!("Wizard session started");
    let opening = format!("open {}", shell_words::quote(start));
    dispatch(wizard, &opening).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match wizard.claim_id() {
            Some(claim_id) => print!("claim {claim_id} [{}]> ", wizard.current_step().route_name()),
            None => print!("claims> "),
        }
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if matches!(dispatch(wizard, &line).await, Flow::Quit) {
            break;
        }
    }

    info!("Wizard session ended");
    Ok(())
}

async fn dispatch(wizard: &mut ClaimWizard, line: &str) -> Flow {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            println!("error: {e}");
            return Flow::Continue;
        }
    };
    if words.is_empty() {
        return Flow::Continue;
    }

    let command = match ShellLine::try_parse_from(words) {
        Ok(parsed) => parsed.command,
        Err(e) => {
            println!("{e}");
            return Flow::Continue;
        }
    };

    match shell::execute(wizard, command).await {
        Ok(flow) => flow,
        Err(e) => {
            error!(error = %e, "Command failed");
            println!("error: {e}");
            Flow::Continue
        }
    }
}
