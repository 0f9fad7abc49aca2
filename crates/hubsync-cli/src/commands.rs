use anyhow::{Context, Result};
use chrono::Utc;
use hubsync_config::{
    default_config_path, default_log_path, default_mapping_path, log_file_name, AppConfig,
};
use hubsync_core::export::{export_events, ExportOptions};
use hubsync_core::import::{ImportOptions, Synchronizer};
use hubsync_core::ActionLog;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Cli, Command, EventCommand, ExportArgs, ImportArgs};
use crate::logging::init_tracing;
use crate::rest::RestHub;

pub async fn run(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    init_tracing(&config.logging.level, cli.verbose);
    info!("Using config {}", config_path.display());

    match cli.command {
        Command::Event(EventCommand::Export(args)) => export(&config, args).await,
        Command::Event(EventCommand::Import(args)) => import(&config, args).await,
    }
}

async fn export(config: &AppConfig, args: ExportArgs) -> Result<()> {
    let profile = config.hub(&args.hub)?;
    let hub = RestHub::new(&profile)?;
    let mut log = open_log(config, "export", args.log_file.as_deref())?;
    let options = export_options(&args);

    let result = export_events(&hub, &args.dir, &options, &mut log).await;
    if let Err(err) = &result {
        log.error(format!("Export failed: {}", err));
    }
    log.close(result.is_ok()).context("closing action log")?;

    let summary = result.context("event export failed")?;
    println!(
        "Exported {} event(s) and {} snapshot(s) to {}",
        summary.events,
        summary.snapshots,
        args.dir.display()
    );
    print_log_location(&log);
    Ok(())
}

async fn import(config: &AppConfig, args: ImportArgs) -> Result<()> {
    let profile = config.hub(&args.hub)?;
    let hub = RestHub::new(&profile)?;
    let map_file = match &args.map_file {
        Some(path) => path.clone(),
        None => default_mapping_path(&profile.hub_id)?,
    };
    let mut log = open_log(config, "import", args.log_file.as_deref())?;
    let options = import_options(config, &args, map_file);

    let sync = Synchronizer::new(&hub, options);
    let result = sync.import_directory(&args.dir, &mut log).await;
    log.close(result.is_ok()).context("closing action log")?;

    let summary = result.context("event import failed")?;
    println!("{}", summary);
    print_log_location(&log);
    Ok(())
}

fn export_options(args: &ExportArgs) -> ExportOptions {
    ExportOptions {
        from: args.from_date,
        to: args.to_date,
        id: args.id.clone(),
        snapshots: args.snapshots,
    }
}

/// Config supplies the defaults; flags can only switch behaviour on.
fn import_options(config: &AppConfig, args: &ImportArgs, map_file: PathBuf) -> ImportOptions {
    let mut options = ImportOptions::from(&config.import);
    options.map_file = Some(map_file);
    options.original_ids |= args.original_ids;
    options.schedule |= args.schedule;
    options.catchup |= args.catchup;
    options
}

fn log_path(config: &AppConfig, kind: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    Ok(match (explicit, &config.logging.log_dir) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(dir)) => dir.join(log_file_name(kind, Utc::now())),
        (None, None) => default_log_path(kind)?,
    })
}

fn open_log(config: &AppConfig, kind: &str, explicit: Option<&Path>) -> Result<ActionLog> {
    let path = log_path(config, kind, explicit)?;
    ActionLog::to_file(format!("hubsync event {} log", kind), &path)
        .with_context(|| format!("creating log file {}", path.display()))
}

fn print_log_location(log: &ActionLog) {
    if let Some(path) = log.path() {
        println!("Log written to {}", path.display());
    }
}
