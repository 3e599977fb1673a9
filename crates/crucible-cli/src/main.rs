//! CLI binary for stress-testing business ideas.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crucible_llm::LlmIdeaGenerator;
use crucible_pipeline::{PipelineEvent, Progress};
use crucible_service::{export, ExportFormat, SessionService};
use crucible_store::{default_db_path, SessionStore, SqliteStore};
use crucible_types::SessionStatus;

#[derive(Parser)]
#[command(name = "crucible", version, about = "Multi-perspective stress testing for business ideas")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an idea and follow the run until it finishes
    Analyze {
        /// The idea to analyze, as free text
        idea: String,

        /// Start the analysis and print the session id without waiting
        #[arg(long)]
        no_wait: bool,
    },

    /// List past and running analysis sessions
    List,

    /// Print the report for one session
    Show {
        /// Session id
        id: String,
    },

    /// Export a session as markdown or json
    Export {
        /// Session id
        id: String,

        /// Output format: markdown or json
        #[arg(short, long, default_value = "markdown")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a session and all of its records
    Delete {
        /// Session id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Analyze { idea, no_wait } => cmd_analyze(&idea, no_wait).await?,
        Commands::List => cmd_list().await?,
        Commands::Show { id } => cmd_show(&id).await?,
        Commands::Export { id, format, output } => {
            cmd_export(&id, &format, output.as_deref()).await?
        }
        Commands::Delete { id } => cmd_delete(&id).await?,
    }

    Ok(())
}

async fn open_store() -> anyhow::Result<Arc<SqliteStore>> {
    let path = default_db_path()?;
    let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("opening database at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn parse_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id.trim()).with_context(|| format!("'{id}' is not a session id"))
}

async fn cmd_analyze(idea: &str, no_wait: bool) -> anyhow::Result<()> {
    let store = open_store().await?;
    let generator = Arc::new(LlmIdeaGenerator::from_env()?);
    let service = SessionService::new(generator, store);
    let mut events = service.events().subscribe();

    let session = service.start_session(idea).await?;
    println!("Session {}", session.id);
    println!("Analyzing: {}", session.title);

    if no_wait {
        println!("Running in the background; follow with: crucible show {}", session.id);
        return Ok(());
    }

    let mut last_line = String::new();
    loop {
        // Surface skipped stages as they happen; the poll below only shows
        // forward progress.
        while let Ok(event) = events.try_recv() {
            if let PipelineEvent::StageSkipped { stage, error, .. } = event {
                println!("  skipped {stage}: {error}");
            }
        }

        let progress = service.get_progress(session.id).await?;
        let line = render_progress(&progress);
        if line != last_line {
            println!("{line}");
            last_line = line;
        }
        if progress.status == SessionStatus::Completed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    println!();
    let report = service
        .export_session(session.id, ExportFormat::Markdown)
        .await?;
    println!("{report}");
    Ok(())
}

fn render_progress(progress: &Progress) -> String {
    format!("[{:>3}%] {}", progress.percent, progress.message)
}

async fn cmd_list() -> anyhow::Result<()> {
    let store = open_store().await?;
    let sessions = store.list_sessions().await?;

    if sessions.is_empty() {
        println!("No sessions yet. Start one with: crucible analyze \"<idea>\"");
        return Ok(());
    }

    for session in sessions {
        let score = session
            .overall_score
            .map(|s| format!("{s:.0}"))
            .unwrap_or_else(|| "--".into());
        let verdict = session
            .recommendation
            .map(|r| r.as_str())
            .unwrap_or(session.status.as_str());
        println!(
            "{}  {:>3}  {:<9}  {}  {}",
            session.id,
            score,
            verdict,
            session.started_at.format("%Y-%m-%d %H:%M"),
            session.title
        );
    }
    Ok(())
}

async fn cmd_show(id: &str) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let store = open_store().await?;
    let detail = store.load_session(id).await?;
    println!("{}", export::to_markdown(&detail));
    Ok(())
}

async fn cmd_export(id: &str, format: &str, output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let format = ExportFormat::parse(format)
        .with_context(|| format!("unknown format '{format}' (expected markdown or json)"))?;

    let store = open_store().await?;
    let detail = store.load_session(id).await?;
    let rendered = match format {
        ExportFormat::Json => export::to_json(&detail)?,
        ExportFormat::Markdown => export::to_markdown(&detail),
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn cmd_delete(id: &str) -> anyhow::Result<()> {
    let id = parse_id(id)?;
    let store = open_store().await?;
    store.delete_session(id).await?;
    println!("Deleted {id}");
    Ok(())
}
