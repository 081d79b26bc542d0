use std::{future::Future, io::Write, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    presentation::view_state, CommentForm, CommentsPanel, FeatureForm, PollPhase, PollerState,
    ResearchBackend, ResearchClient, ResearchDashboard,
};
use futures::StreamExt;
use shared::domain::ResearchStatus;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Settings};
use render::{render_comments, render_status};

#[derive(Parser, Debug)]
#[command(about = "Start feature research sessions and follow their progress")]
struct Cli {
    /// Research API base url; overrides config and environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// TOML settings file (defaults to ./dashboard.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a feature for research and follow it to completion.
    Research {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Print the session id and exit without polling.
        #[arg(long)]
        detach: bool,
        /// Print the full analysis once research completes.
        #[arg(long)]
        analysis: bool,
    },
    /// Follow an existing research session.
    Watch {
        session_id: String,
        #[arg(long)]
        analysis: bool,
    },
    #[command(subcommand)]
    Comments(CommentsCommand),
}

#[derive(Subcommand, Debug)]
enum CommentsCommand {
    /// List comments on an issue.
    List { issue_id: String },
    /// Add a comment to an issue.
    Create {
        issue_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }
    debug!(?settings, "resolved settings");

    let client = ResearchClient::with_timeout(&settings.api_base_url, settings.request_timeout())
        .with_context(|| format!("invalid api url {}", settings.api_base_url))?;
    let backend: Arc<dyn ResearchBackend> = Arc::new(client);

    match cli.command {
        Command::Research {
            name,
            description,
            detach,
            analysis,
        } => {
            if detach {
                let request = FeatureForm::new(name, description).validate()?;
                let started = backend.start_research(&request).await?;
                println!("{}", started.session_id);
                return Ok(());
            }
            let mut dashboard = dashboard(&backend, &settings);
            let session_id = dashboard
                .submit(&FeatureForm::new(name, description))
                .await?;
            println!("Started research session {session_id}\n");
            follow(&dashboard, analysis).await?;
        }
        Command::Watch {
            session_id,
            analysis,
        } => {
            let mut dashboard = dashboard(&backend, &settings);
            dashboard.watch(session_id)?;
            follow(&dashboard, analysis).await?;
        }
        Command::Comments(CommentsCommand::List { issue_id }) => {
            let mut panel = CommentsPanel::new(backend);
            panel.load(issue_id).await?;
            println!("{}", render_comments(panel.comments()));
        }
        Command::Comments(CommentsCommand::Create {
            issue_id,
            title,
            content,
        }) => {
            let mut panel = CommentsPanel::new(backend);
            let response = panel
                .submit(&CommentForm::new(issue_id, title, content))
                .await?;
            println!("{}", response.message);
            if panel.error().is_none() {
                println!("\n{}", render_comments(panel.comments()));
            }
        }
    }

    Ok(())
}

fn dashboard(backend: &Arc<dyn ResearchBackend>, settings: &Settings) -> ResearchDashboard {
    ResearchDashboard::new(backend.clone(), settings.poller_config())
}

/// Follows the dashboard's session until polling settles or the user interrupts.
async fn follow(dashboard: &ResearchDashboard, show_analysis: bool) -> Result<()> {
    let interrupted = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let Some(state) =
        render_until_settled(dashboard.subscribe(), interrupted, &mut std::io::stdout()).await?
    else {
        info!("interrupted; session keeps running on the backend");
        return Ok(());
    };

    if state.phase == PollPhase::Stuck {
        bail!("research did not reach a terminal status");
    }
    let Some(snapshot) = state.snapshot else {
        return Ok(());
    };
    match snapshot.status {
        ResearchStatus::Failed => bail!(
            "research failed: {}",
            snapshot.error.as_deref().unwrap_or("no error reported")
        ),
        ResearchStatus::Completed if show_analysis => {
            let analysis = snapshot
                .result_summary()
                .and_then(|summary| summary.analysis);
            match analysis {
                Some(analysis) => println!("{}", serde_json::to_string_pretty(&analysis)?),
                None => println!("No analysis was attached to this session"),
            }
        }
        _ => {}
    }
    Ok(())
}

/// Writes every distinct view until the state settles.
///
/// Returns `None` if `shutdown` resolves first.
async fn render_until_settled(
    updates: watch::Receiver<PollerState>,
    shutdown: impl Future<Output = ()>,
    out: &mut impl Write,
) -> Result<Option<PollerState>> {
    let mut updates = WatchStream::new(updates);
    tokio::pin!(shutdown);
    let mut last_rendered = String::new();

    loop {
        tokio::select! {
            next = updates.next() => {
                let Some(state) = next else {
                    bail!("status updates ended unexpectedly");
                };
                let rendered = render_status(&view_state(&state));
                if rendered != last_rendered {
                    writeln!(out, "{rendered}\n")?;
                    last_rendered = rendered;
                }
                if state.is_settled() {
                    return Ok(Some(state));
                }
            }
            _ = &mut shutdown => return Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
