//! # Thumbnail Reconciler - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Coercizione del flag `--dry-run` (unico punto in cui avviene)
//! - Creazione di store, audit log e orchestratore
//! - Conversione di un errore non gestito in una risposta di fallimento
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (sottocomando, config, root, audit log)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose) su stderr
//! 3. Carica e valida la configurazione, applicando gli override della CLI
//! 4. Apre il backend filesystem e il log di audit
//! 5. Esegue il sottocomando e stampa il risultato (testo o JSON)
//!
//! ## Esempio di utilizzo:
//! ```bash
//! thumb-reconcile --root /srv/assets reconcile --dry-run false
//! thumb-reconcile --json cleanup
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use thumbnail_reconciler::{
    json_output::{coerce_dry_run, JsonResponse},
    progress::{ProgressManager, RunSummary},
    Config, FileAuditSink, FsAssetStore, SystemClock, ThumbnailReconciler,
};

#[derive(Parser)]
#[command(name = "thumb-reconcile")]
#[command(about = "Match video thumbnails by filename and quarantine stale ones")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Library root directory (one subdirectory per collection)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Audit log file
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,

    /// Create missing collection directories under the library root
    #[arg(long, global = true)]
    init: bool,

    /// Output responses as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Match videos with inbox thumbnails and attach them
    Reconcile {
        /// Dry run: true/false, 1/0, yes/no, on/off (anything else means true)
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        dry_run: Option<String>,
    },
    /// Move thumbnails referenced by nothing to the backup collection
    Cleanup {
        /// Dry run: true/false, 1/0, yes/no, on/off (anything else means true)
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        dry_run: Option<String>,
    },
    /// Remove the audit log
    ClearLog,
    /// Show the most recent audit entry
    LatestLog,
    /// Show every retained audit entry
    Log,
    /// List videos together with the latest audit entry
    Videos,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let (json_output, result) = execute(args).await;
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Unhandled error: {:#}", e);
            if json_output {
                JsonResponse::failure("Unhandled exception", Some(e.to_string())).emit();
                std::process::exit(1);
            }
            Err(e)
        }
    }
}

/// Load the configuration and run the command.
///
/// Also returns whether failures must be reported as JSON, which falls back
/// to the `--json` flag when the configuration cannot be loaded.
async fn execute(args: Args) -> (bool, Result<()>) {
    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => return (args.json, Err(e)),
    };
    let json_output = config.json_output;
    (json_output, run(args.command, config, args.init).await)
}

async fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref path) => {
            if !path.exists() {
                return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
            }
            Config::from_file(path).await?
        }
        None => Config::default(),
    };

    if let Some(ref root) = args.root {
        config.library_root = root.clone();
    }
    if let Some(ref audit_log) = args.audit_log {
        config.audit_log_path = audit_log.clone();
    }
    if args.json {
        config.json_output = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run(command: Command, config: Config, init: bool) -> Result<()> {
    let json_output = config.json_output;

    let store = Arc::new(FsAssetStore::open(&config.library_root).await?);
    if init {
        for collection in [
            &config.videos_collection,
            &config.inbox_collection,
            &config.target_collection,
            &config.backup_collection,
        ] {
            store.ensure_collection(collection).await?;
        }
        info!("Collections ready under {}", store.library_root().display());
    }

    let audit = Arc::new(FileAuditSink::new(&config.audit_log_path, config.audit_capacity));
    let reconciler = ThumbnailReconciler::new(config, store, Arc::new(SystemClock), audit);

    match command {
        Command::Reconcile { dry_run } => {
            let dry_run = coerce_dry_run(dry_run.as_deref());
            info!("Match thumbnails - dryRun: {}", dry_run);

            let spinner = (!json_output).then(|| ProgressManager::spinner("Matching thumbnails..."));
            let report = reconciler.reconcile_all(dry_run).await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            let report = report?;

            if json_output {
                JsonResponse::reconcile(report, dry_run).emit();
            } else {
                println!("{}", RunSummary::reconcile(&report, dry_run));
            }
        }
        Command::Cleanup { dry_run } => {
            let dry_run = coerce_dry_run(dry_run.as_deref());
            info!("Clean thumbnails - dryRun: {}", dry_run);

            let spinner = (!json_output).then(|| ProgressManager::spinner("Looking for unused thumbnails..."));
            let report = reconciler.cleanup_unused(dry_run).await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            let report = report?;

            if json_output {
                JsonResponse::cleanup(report, dry_run).emit();
            } else {
                println!("{}", RunSummary::cleanup(&report, dry_run));
            }
        }
        Command::ClearLog => {
            let cleared = reconciler.clear_audit_log().await?;
            if json_output {
                JsonResponse::cleared(cleared).emit();
            } else {
                println!("Audit log cleared");
            }
        }
        Command::LatestLog => {
            let latest = reconciler.latest_audit_entry().await?;
            if json_output {
                JsonResponse::latest(latest).emit();
            } else {
                match latest {
                    Some(entry) => println!("{}", RunSummary::audit_entry(&entry)),
                    None => println!("Audit log is empty"),
                }
            }
        }
        Command::Log => {
            let entries = reconciler.audit_entries().await?;
            if json_output {
                JsonResponse::log(entries).emit();
            } else if entries.is_empty() {
                println!("Audit log is empty");
            } else {
                for entry in &entries {
                    println!("{}", RunSummary::audit_entry(entry));
                }
            }
        }
        Command::Videos => {
            let videos = reconciler.list_videos().await?;
            let latest = reconciler.latest_audit_entry().await?;
            if json_output {
                JsonResponse::videos(&videos, latest).emit();
            } else {
                info!("Found {} videos", videos.len());
                for video in &videos {
                    println!("{}", video.filename);
                }
                if let Some(entry) = latest {
                    println!("\nLatest run:\n{}", RunSummary::audit_entry(&entry));
                }
            }
        }
    }

    Ok(())
}
