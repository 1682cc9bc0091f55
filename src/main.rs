use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use osconnect::config::DEFAULT_CONCURRENCY;
use osconnect::frontend::{self, AssessmentOutcome, AssessmentParams};
use osconnect::resolve::{os_cloud_from_env, reads_profiles};
use osconnect::{CloudConfigStore, Connector};

#[derive(Parser, Debug)]
#[command(
    name = "osconnect",
    version,
    about = "Open authorized sessions to OpenStack clouds and report their status"
)]
struct Cli {
    /// Cloud profile to connect to (repeatable, or comma separated)
    #[arg(short = 'c', long = "cloud", value_delimiter = ',')]
    clouds: Vec<String>,

    /// Connect to every cloud in clouds.yaml (--cloud is ignored)
    #[arg(long)]
    all_clouds: bool,

    /// Maximum connection attempts in flight
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY as i64, allow_negative_numbers = true)]
    threads_nr: i64,

    /// JSON file with assessment parameters (clouds, all_clouds, threads_nr)
    #[arg(long, value_name = "FILE", conflicts_with_all = ["clouds", "all_clouds", "threads_nr"])]
    params: Option<PathBuf>,

    /// YAML or JSON list of inline credential records; each failure is
    /// reported without aborting the others
    #[arg(long, value_name = "FILE")]
    creds_file: Option<PathBuf>,

    /// Read profiles from this clouds.yaml instead of the search path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,
}

async fn load_params(cli: &Cli) -> Result<AssessmentParams> {
    match &cli.params {
        Some(path) => {
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read params file {}", path.display()))?;
            AssessmentParams::from_json(&data)
                .with_context(|| format!("invalid params file {}", path.display()))
        }
        None => Ok(AssessmentParams {
            clouds: cli.clouds.clone(),
            all_clouds: cli.all_clouds,
            threads_nr: cli.threads_nr,
        }),
    }
}

async fn load_store(cli: &Cli) -> Result<CloudConfigStore> {
    let store = match &cli.config {
        Some(path) => CloudConfigStore::from_path(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => CloudConfigStore::load()
            .await
            .context("failed to load clouds.yaml")?,
    };
    Ok(store)
}

async fn run(cli: &Cli) -> Result<AssessmentOutcome> {
    let params = load_params(cli).await?;
    let mut request = match params.to_request() {
        Ok(request) => request,
        Err(e) => return Ok(AssessmentOutcome::from_error(&e)),
    };

    if let Some(path) = &cli.creds_file {
        let creds = frontend::load_credentials(path)
            .await
            .with_context(|| format!("failed to load credentials from {}", path.display()))?;
        request = request.with_creds(creds);
    }

    // clouds.yaml is only read when profiles are the targets.
    let os_cloud = os_cloud_from_env();
    let store = if reads_profiles(&request, os_cloud.as_deref()) {
        load_store(cli).await?
    } else {
        CloudConfigStore::empty()
    };

    Ok(frontend::run_request(&Connector::new(store), &request).await)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("osconnect=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    osconnect::init();

    let outcome = run(&cli).await.unwrap_or_else(|e| AssessmentOutcome::Failed {
        msg: format!("{:#}", e),
    });

    let doc = outcome.to_json();
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&doc)
    } else {
        serde_json::to_string(&doc)
    };
    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => {
            tracing::error!(error = %e, "failed to render result");
            return ExitCode::FAILURE;
        }
    }

    if outcome.is_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
