//! Subcommands of the operator binary.

use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use gestion_sync::client::offline::{ExportOutcome, ImportOutcome, ImportPreview};
use gestion_sync::client::{DrainOutcome, OfflineClient, SqliteStore};
use gestion_sync::shared::config::SyncConfig;
use gestion_sync::shared::error::{Result, SyncError};
use gestion_sync::shared::event::SyncEvent;
use gestion_sync::shared::operation::Method;

#[derive(Debug, Parser)]
#[command(name = "gestion-sync", version, about = "Offline write queue for the gestion backend")]
pub struct Cli {
    /// TOML configuration file (defaults to GESTION_* environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend API root, e.g. http://127.0.0.1:8000/api
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// SQLite file holding the queue
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show pending count, reachability and the indicator
    Status,
    /// Probe the backend once
    Probe,
    /// Drain the queue now
    Sync,
    /// Write the queue to a transfer file
    Export {
        /// Target directory (defaults to the data directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Submit a transfer file to the backend
    Import {
        file: PathBuf,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Send one request through the gateway
    Send {
        method: Method,
        path: String,
        /// JSON body
        #[arg(long)]
        data: Option<String>,
    },
    /// Run the probe loop and print events until Ctrl-C
    Watch,
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let client = open_client(&cli).await?;

    match cli.command {
        Command::Status => {
            let outcome = client.monitor().probe().await;
            println!("Backend:  {:?}", outcome.status);
            println!("Pending:  {}", client.pending_count().await);
            println!("Status:   {} ({})", outcome.indicator.label(), outcome.indicator.title());
            Ok(ExitCode::SUCCESS)
        }
        Command::Probe => {
            let outcome = client.monitor().probe().await;
            println!("{:?} (changed: {})", outcome.status, outcome.transitioned);
            if let Some(drain) = outcome.drain {
                print_drain(&drain);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Sync => {
            let outcome = client.sync_now().await;
            print_drain(&outcome);
            match outcome.into_error() {
                Some(e) => {
                    eprintln!("{}", e.user_message());
                    Ok(ExitCode::FAILURE)
                }
                None => Ok(ExitCode::SUCCESS),
            }
        }
        Command::Export { dir } => {
            let outcome = match dir {
                Some(dir) => client.transfer().export_to_dir(&dir).await?,
                None => client.transfer().export().await?,
            };
            match outcome {
                ExportOutcome::NothingToExport => println!("No pending operations to export."),
                ExportOutcome::Exported { path, count } => {
                    println!("Exported {} operations to {}", count, path.display())
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Import { file, yes } => {
            let outcome = client
                .transfer()
                .import_file(&file, |preview| yes || confirm(preview))
                .await?;
            match outcome {
                ImportOutcome::Cancelled => {
                    println!("Import cancelled.");
                    Ok(ExitCode::SUCCESS)
                }
                ImportOutcome::Completed(report) => {
                    println!("{}", report.summary());
                    Ok(if report.failures.is_empty() {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    })
                }
            }
        }
        Command::Send { method, path, data } => {
            let body = data
                .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
                .transpose()
                .map_err(|e| SyncError::serialization(format!("--data is not valid JSON: {}", e)))?;
            let reply = client.gateway().request(method, &path, body).await;
            println!("{}", serde_json::to_string_pretty(&reply.to_json())?);
            Ok(if reply.is_ok() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Watch => {
            watch(&client).await;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn open_client(cli: &Cli) -> Result<OfflineClient> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::from_env()?,
    };
    if let Some(url) = &cli.api_url {
        config = config.with_api_base_url(url.clone())?;
    }

    match &cli.db {
        Some(db) => {
            let store = SqliteStore::open(db).await?;
            OfflineClient::new(config, Arc::new(store))
        }
        None => OfflineClient::open(config).await,
    }
}

async fn watch(client: &OfflineClient) {
    let mut events = client.subscribe();
    let monitor = client.spawn_monitor();
    println!("Watching {} (Ctrl-C to stop)", client.config().api_base_url);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "[CLI] Event stream lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.shutdown().await;
}

fn print_event(event: &SyncEvent) {
    match event {
        SyncEvent::IndicatorChanged { indicator } => println!("[indicator] {}", indicator.label()),
        SyncEvent::Notification(notification) => {
            println!("[{:?}] {}", notification.level, notification.message)
        }
        SyncEvent::ConnectivityChanged { status } => println!("[connectivity] {:?}", status),
        SyncEvent::OperationQueued { method, path, pending } => {
            println!("[queued] {} {} ({} pending)", method, path, pending)
        }
        SyncEvent::RefreshRequested => println!("[refresh]"),
    }
}

fn print_drain(outcome: &DrainOutcome) {
    match outcome {
        DrainOutcome::Empty => println!("Nothing to sync."),
        DrainOutcome::AlreadyRunning => println!("A sync is already running."),
        DrainOutcome::Unreachable => println!("Backend unreachable; queue left as it was."),
        DrainOutcome::Rejected { error } => println!("Sync rejected: {}", error),
        DrainOutcome::Completed(result) => {
            println!("Synced {}/{} operations", result.succeeded, result.total)
        }
    }
}

fn confirm(preview: &ImportPreview) -> bool {
    println!("{}", preview);
    print!("Import and sync these operations with the backend? [y/N] ");
    if std::io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match std::io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
