use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clarity_agents::agents::OllamaAgent;
use clarity_agents::config::ClarityConfig;
use clarity_agents::orchestrator::{Pipeline, PipelineError, TrackerRun};
use clarity_agents::storage::FsStorage;
use clarity_agents::trackers::{AzureClient, PlaneClient, TrackerClient};
use clarity_coordination::PromptType;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn meeting transcripts into tracker work items", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract work items from a transcript and create them in the trackers.
    Run {
        /// Transcript filename, relative to the transcript directory.
        transcript: String,

        /// Instruction template (A, B or C).
        #[arg(long, default_value_t = PromptType::B)]
        prompt: PromptType,

        /// Sprint/iteration label for Azure DevOps.
        #[arg(long)]
        iteration: Option<String>,

        /// Trackers to dispatch to, in order. Repeatable.
        #[arg(long = "tracker", value_enum, default_values_t = [TrackerKind::Plane])]
        trackers: Vec<TrackerKind>,
    },
    /// List the Azure DevOps project's work items.
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TrackerKind {
    Plane,
    Azure,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ClarityConfig::from_env().context("loading configuration")?;
    let http = config.http_client().context("building HTTP client")?;

    match cli.command {
        Command::Run {
            transcript,
            prompt,
            iteration,
            trackers,
        } => {
            info!(
                model = %config.ollama.model,
                ollama = %config.ollama.url,
                "Clarity pipeline starting"
            );

            let mut pipeline = Pipeline::new(
                Box::new(OllamaAgent::new(&config.ollama, http.clone())),
                Box::new(FsStorage::new(&config.storage)),
            );
            for kind in trackers {
                let (client, target): (Box<dyn TrackerClient>, _) = match kind {
                    TrackerKind::Plane => (
                        Box::new(PlaneClient::new(&config.plane, http.clone())),
                        config.plane.target.clone(),
                    ),
                    TrackerKind::Azure => (
                        Box::new(AzureClient::new(&config.azure, http.clone())),
                        config.azure.target.clone(),
                    ),
                };
                pipeline = pipeline.with_tracker(client, target);
            }

            match pipeline.run(&transcript, prompt, iteration.as_deref()).await {
                Ok(report) => {
                    for run in &report.trackers {
                        match run {
                            TrackerRun::Dispatched(dispatch) => {
                                for failed in dispatch.failures() {
                                    warn!(
                                        tracker = %dispatch.tracker,
                                        title = %failed.title,
                                        error = failed.error.as_deref().unwrap_or("-"),
                                        "Not created"
                                    );
                                }
                            }
                            TrackerRun::Skipped { tracker, missing_field } => {
                                warn!(%tracker, missing_field, "Tracker skipped");
                            }
                        }
                    }
                    if report.succeeded() {
                        info!(items = report.items.len(), "Done");
                        Ok(ExitCode::SUCCESS)
                    } else {
                        error!("Run finished with dispatch failures");
                        Ok(ExitCode::FAILURE)
                    }
                }
                Err(PipelineError::IllegalTransition(e)) => Err(e.into()),
                Err(e) => {
                    error!("Run aborted: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::List => {
            let azure = AzureClient::new(&config.azure, http);
            let target = &config.azure.target;
            if let Some(field) = target.missing_field() {
                error!("Azure DevOps configuration is missing {field}");
                return Ok(ExitCode::FAILURE);
            }

            let items = azure
                .list_work_items(&target.workspace, &target.project)
                .await
                .context("listing Azure DevOps work items")?;

            println!("{:<8} {:<12} {:<20} {:<24} TITLE", "ID", "TYPE", "STATE", "ASSIGNED TO");
            for item in &items {
                println!(
                    "{:<8} {:<12} {:<20} {:<24} {}",
                    item.id, item.work_item_type, item.state, item.assigned_to, item.title
                );
            }
            info!(count = items.len(), "Listed work items");
            Ok(ExitCode::SUCCESS)
        }
    }
}
