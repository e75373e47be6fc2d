//! conpack - consolidated tool-package builder
//!
//! Reads a list of upstream tool packages, deduplicates their files and
//! writes one content-addressed archive with an `index.json` manifest.

mod cli;
mod error;
mod logging;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use clap::Parser;
use conpack_config::Config;
use conpack_events::EventReceiver;
use conpack_index::ConsolidatedPackageIndex;
use conpack_ops::{Consolidate, ConsolidationReport};
use conpack_types::PackageList;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting conpack v{}", env!("CARGO_PKG_VERSION"));

    // 1. File config (or defaults), 2. environment, 3. CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.command);
    config.validate()?;

    match cli.command {
        Commands::Consolidate {
            packages,
            output_dir,
            ..
        } => {
            let report = consolidate(config, packages, output_dir).await?;
            render_report(&report, cli.global.json)?;
        }
        Commands::Inspect { archive } => {
            let index_name = config.consolidation.index_name.clone();
            let index =
                tokio::task::spawn_blocking(move || read_index(&archive, &index_name)).await??;
            render_index(&index, cli.global.json)?;
        }
    }

    info!("Command completed successfully");
    Ok(())
}

fn apply_cli_config(config: &mut Config, command: &Commands) {
    if let Commands::Consolidate {
        keep_going,
        no_prune,
        tools_folder,
        compression,
        ..
    } = command
    {
        if *keep_going {
            config.consolidation.fail_fast = false;
        }
        if *no_prune {
            config.consolidation.prune_stale = false;
        }
        if let Some(folder) = tools_folder {
            config.consolidation.tools_folder.clone_from(folder);
        }
        if let Some(compression) = compression {
            config.consolidation.compression = (*compression).into();
        }
    }
}

/// Run the blocking pipeline off the async runtime while logging its events
async fn consolidate(
    config: Config,
    packages: PathBuf,
    output_dir: PathBuf,
) -> Result<ConsolidationReport, CliError> {
    let list = PackageList::load(&packages)?;
    let (event_sender, event_receiver) = conpack_events::channel();
    let consolidate = Consolidate::new(config).with_event_sender(event_sender);

    let task = tokio::task::spawn_blocking(move || {
        consolidate.execute(&output_dir, &list.packages)
    });

    let report = drain_events_until(task, event_receiver).await??;
    Ok(report)
}

/// Log events as they arrive until `task` finishes
async fn drain_events_until<T>(
    task: tokio::task::JoinHandle<T>,
    mut event_receiver: EventReceiver,
) -> Result<T, tokio::task::JoinError> {
    let mut task = task;
    loop {
        select! {
            result = &mut task => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    logging::log_event_with_tracing(&event);
                }
                return result;
            }

            Some(event) = event_receiver.recv() => {
                logging::log_event_with_tracing(&event);
            }
        }
    }
}

fn read_index(archive: &Path, index_name: &str) -> Result<ConsolidatedPackageIndex, CliError> {
    let mut zip = conpack_package::archive::open_archive(archive)?;
    let mut entry = zip.by_name(index_name).map_err(|e| {
        conpack_errors::Error::from(conpack_errors::StorageError::archive(archive, &e))
    })?;
    let mut json = String::new();
    entry.read_to_string(&mut json)?;
    let index = ConsolidatedPackageIndex::from_json(&json)?;
    index.validate()?;
    Ok(index)
}

fn render_report(report: &ConsolidationReport, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("{}", report.destination.display());
    match &report.summary {
        Some(summary) => println!(
            "{} packages, {} blobs ({} bytes) from {} files",
            summary.packages, summary.blobs_written, summary.bytes_written, summary.descriptors
        ),
        None => println!("up to date"),
    }
    for id in &report.skipped {
        println!("skipped: {id}");
    }
    for path in &report.removed {
        println!("removed: {}", path.display());
    }
    Ok(())
}

fn render_index(index: &ConsolidatedPackageIndex, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", index.to_json()?);
        return Ok(());
    }

    for package in index.packages.values() {
        let kind = if package.is_single_payload {
            "single"
        } else {
            "multi"
        };
        println!("{} {} ({kind})", package.id, package.version);
        for (platform, hashes) in &package.platforms {
            println!("  {platform}: {} files", hashes.len());
        }
    }
    println!(
        "{} packages, {} distinct blobs",
        index.packages.len(),
        index.distinct_hashes()
    );
    Ok(())
}

/// Logs go to stderr so stdout carries only command output
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "info,conpack=debug,conpack_ops=debug"
    } else {
        "warn,conpack=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);
    let result = if json_mode {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("Warning: failed to initialize logging: {e}");
    }
}
