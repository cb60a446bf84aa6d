use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{Config, ScoringSettings};
use crate::db::create_pool;
use crate::export::clipboard::copy_to_clipboard;
use crate::export::{export_profile, write_profile_file};
use crate::jobs::repository::get_job;
use crate::scoring_client::ScoringClient;

#[derive(Parser, Debug)]
#[command(
    name = "ats-api",
    about = "Recruiting API: jobs, candidates, quick scoring and profile export",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the scoring service status report as JSON
    Status,
    /// Export a job's performance profile as Markdown
    ExportProfile(ExportProfileArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportProfileArgs {
    /// Job whose performance profile is exported
    #[arg(long)]
    pub(crate) job_id: Uuid,
    /// Directory the Markdown file is written to
    #[arg(long, default_value = ".")]
    pub(crate) output_dir: PathBuf,
    /// Also copy the document to the system clipboard
    #[arg(long)]
    pub(crate) clipboard: bool,
}

/// Dispatches the parsed command. Only `serve` and `export-profile` load the full
/// configuration; `status` needs just the scoring settings.
pub(crate) async fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => crate::serve(Config::from_env()?, args).await,
        Command::Status => print_status(&ScoringSettings::from_env()?).await,
        Command::ExportProfile(args) => export_to_file(&Config::from_env()?, args).await,
    }
}

async fn print_status(settings: &ScoringSettings) -> Result<()> {
    let client = ScoringClient::new(&settings.api_url, settings.timeout())?;
    let report = client.check_status().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn export_to_file(config: &Config, args: ExportProfileArgs) -> Result<()> {
    let pool = create_pool(&config.database_url).await?;
    let job = get_job(&pool, args.job_id)
        .await
        .with_context(|| format!("Could not load job {}", args.job_id))?;

    let Some(profile) = job
        .performance_profile
        .as_ref()
        .map(|p| &p.0)
        .filter(|p| !p.is_empty())
    else {
        bail!("Job {} has no performance profile to export", args.job_id);
    };

    let markdown = export_profile(profile, &job.title);
    let path = write_profile_file(&args.output_dir, &job.title, &markdown)
        .await
        .with_context(|| format!("Could not write export to {}", args.output_dir.display()))?;
    info!("Exported performance profile for job {} to {}", job.id, path.display());
    println!("{}", path.display());

    if args.clipboard {
        let outcome = copy_to_clipboard(&markdown).await;
        if outcome.success {
            println!("Copied to clipboard");
        } else {
            warn!(
                "Clipboard copy failed: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(())
}
