mod config;
mod render;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use mc_client::{Assistant, HttpKnowledgeClient, KnowledgeApi, UploadFile};
use mc_core::{UploadStatus, ViewEvent, ViewModel};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{load_config, ConsoleConfig};

#[derive(Parser)]
#[command(name = "mc-console", version, about = "Ask questions about your medical documents")]
struct Cli {
    /// YAML config file (defaults to configs/default.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides api.base_url
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask one question and print the answer with its sources
    Ask {
        question: String,
        #[arg(long)]
        max_results: Option<u32>,
        /// Show full source previews
        #[arg(long)]
        full: bool,
    },
    /// Upload documents to the knowledge base
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Check service health
    Health {
        /// Keep polling until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Knowledge base statistics
    Stats,
    /// Summary of one stored document
    Summary { document_id: String },
    /// Delete a stored document
    Delete { document_id: String },
    /// Interactive session
    Shell,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).ok();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        cfg.api.base_url = url;
    }
    let api = Arc::new(HttpKnowledgeClient::new(cfg.client_config())?);
    info!(base_url = %cfg.api.base_url, "console starting");

    match cli.command {
        Command::Ask {
            question,
            max_results,
            full,
        } => ask(&cfg, api, &question, max_results, full).await,
        Command::Upload { files } => upload(api, files).await,
        Command::Health { watch } => health(&cfg, api, watch).await,
        Command::Stats => {
            let stats = api.document_stats().await.map_err(user_error)?;
            println!("{}", render::stats(&stats));
            Ok(())
        }
        Command::Summary { document_id } => {
            let summary = api
                .document_summary(&document_id)
                .await
                .map_err(user_error)?;
            println!("{}", render::summary(&summary));
            Ok(())
        }
        Command::Delete { document_id } => {
            let message = api
                .delete_document(&document_id)
                .await
                .map_err(user_error)?;
            println!("{}", message);
            Ok(())
        }
        Command::Shell => shell::run(&cfg, api).await,
    }
}

fn user_error(err: mc_error::McError) -> anyhow::Error {
    if err.is_retryable() {
        anyhow::anyhow!("{} (try again later)", err.user_message())
    } else {
        anyhow::anyhow!(err.user_message())
    }
}

async fn ask(
    cfg: &ConsoleConfig,
    api: Arc<HttpKnowledgeClient>,
    question: &str,
    max_results: Option<u32>,
    full: bool,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let assistant = Assistant::new(api, tx);
    let mut vm = ViewModel::new();

    let max_results = max_results.or(Some(cfg.query.default_max_results));
    assistant
        .submit_query(question, max_results)
        .map_err(user_error)?;
    while let Some(event) = rx.recv().await {
        let done = matches!(
            event,
            ViewEvent::QueryCompleted { .. } | ViewEvent::QueryFailed { .. }
        );
        vm.apply(event);
        if done {
            break;
        }
    }

    match vm.response.clone() {
        Some(resp) => {
            if full {
                for source in &resp.sources {
                    vm.expanded_sources.insert(source.key());
                }
            }
            println!("{}", render::response(&resp, &vm.expanded_sources));
            Ok(())
        }
        None => {
            let reason = vm
                .take_notifications()
                .into_iter()
                .map(|n| n.message)
                .last()
                .unwrap_or_else(|| "Query failed".to_string());
            bail!(reason)
        }
    }
}

async fn upload(api: Arc<HttpKnowledgeClient>, paths: Vec<PathBuf>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let assistant = Assistant::new(api, tx);
    let mut vm = ViewModel::new();

    let (files, unreadable) = open_files(&paths).await;
    for (path, reason) in &unreadable {
        println!("{}: {}", path.display(), reason);
    }
    if !files.is_empty() {
        assistant.upload_files(files).wait().await;
    }
    drop(assistant);

    while let Some(event) = rx.recv().await {
        vm.apply(event);
    }
    for note in vm.take_notifications() {
        println!("{}", render::notification(&note));
    }
    print!("{}", render::uploads(&vm.uploads));

    let failed = unreadable.len()
        + vm
            .uploads
            .iter()
            .filter(|u| u.status == UploadStatus::Error)
            .count();
    if failed > 0 {
        bail!("{} of {} uploads failed", failed, paths.len());
    }
    Ok(())
}

/// Opens every selected path. A path that cannot be opened is reported
/// with its reason and does not stop the others.
pub(crate) async fn open_files(paths: &[PathBuf]) -> (Vec<UploadFile>, Vec<(PathBuf, String)>) {
    let mut files = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in paths {
        match UploadFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open upload");
                unreadable.push((path.clone(), e.user_message()));
            }
        }
    }
    (files, unreadable)
}

async fn health(cfg: &ConsoleConfig, api: Arc<HttpKnowledgeClient>, watch: bool) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let assistant = Assistant::new(api, tx);
    let mut vm = ViewModel::new();

    if !watch {
        assistant.check_health().await;
        drop(assistant);
        while let Some(event) = rx.recv().await {
            vm.apply(event);
        }
        println!("{}", render::health(&vm.health));
        if vm.health.last.is_none() {
            bail!("service unreachable");
        }
        return Ok(());
    }

    let poller = assistant.start_health_polling(cfg.health_interval());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(event) = rx.recv() => {
                let updated = matches!(event, ViewEvent::HealthUpdated { .. });
                vm.apply(event);
                if updated {
                    println!("{}", render::health(&vm.health));
                }
            }
        }
    }
    poller.cancel();
    Ok(())
}
