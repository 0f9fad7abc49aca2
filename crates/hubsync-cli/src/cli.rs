use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hubsync", version)]
#[command(about = "Migrate scheduled events, editions and slots between content hubs", long_about = None)]
pub struct Cli {
    /// Config file (defaults to $HUBSYNC_CONFIG or the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Events with their editions and slots
    #[command(subcommand)]
    Event(EventCommand),
}

#[derive(Subcommand, Debug)]
pub enum EventCommand {
    /// Write events from a hub to a directory
    Export(ExportArgs),
    /// Create or update events in a hub from an exported directory
    Import(ImportArgs),
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output directory
    pub dir: PathBuf,

    /// Hub profile from the config file
    #[arg(long)]
    pub hub: String,

    /// Export a single event
    #[arg(long)]
    pub id: Option<String>,

    /// Skip events that end before this date
    #[arg(long = "fromDate", value_parser = parse_date)]
    pub from_date: Option<DateTime<Utc>>,

    /// Skip events that start after this date
    #[arg(long = "toDate", value_parser = parse_date)]
    pub to_date: Option<DateTime<Utc>>,

    /// Also export snapshots referenced from slots
    #[arg(long)]
    pub snapshots: bool,

    #[arg(long = "logFile")]
    pub log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Directory written by `event export`
    pub dir: PathBuf,

    /// Hub profile from the config file
    #[arg(long)]
    pub hub: String,

    /// Id mapping file (defaults to one per destination hub in the data directory)
    #[arg(long = "mapFile")]
    pub map_file: Option<PathBuf>,

    /// Match destination resources that share the source id
    #[arg(long = "originalIds")]
    pub original_ids: bool,

    /// Schedule editions that are scheduled in the source
    #[arg(long)]
    pub schedule: bool,

    /// Schedule editions even if they have already ended
    #[arg(long)]
    pub catchup: bool,

    #[arg(long = "logFile")]
    pub log_file: Option<PathBuf>,
}

/// RFC 3339, or a plain `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("invalid date '{}', expected RFC 3339 or YYYY-MM-DD", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_export_arguments() {
        let cli = Cli::try_parse_from([
            "hubsync",
            "event",
            "export",
            "out",
            "--hub",
            "source",
            "--fromDate",
            "2024-06-01",
            "--toDate",
            "2024-07-01T12:00:00+02:00",
            "--snapshots",
        ])
        .unwrap();

        let Command::Event(EventCommand::Export(args)) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.dir, PathBuf::from("out"));
        assert_eq!(args.hub, "source");
        assert_eq!(args.from_date, Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));
        assert_eq!(args.to_date, Some(Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap()));
        assert!(args.snapshots);
        assert!(args.id.is_none());
    }

    #[test]
    fn parses_import_arguments_with_global_flags() {
        let cli = Cli::try_parse_from([
            "hubsync",
            "event",
            "import",
            "in",
            "--hub",
            "dest",
            "--mapFile",
            "map.json",
            "--schedule",
            "--originalIds",
            "--config",
            "alt.toml",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        let Command::Event(EventCommand::Import(args)) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(args.map_file, Some(PathBuf::from("map.json")));
        assert!(args.schedule);
        assert!(args.original_ids);
        assert!(!args.catchup);
    }

    #[test]
    fn hub_is_required() {
        assert!(Cli::try_parse_from(["hubsync", "event", "import", "in"]).is_err());
    }

    #[test]
    fn rejects_bad_dates() {
        assert!(parse_date("June 1st").is_err());
        assert!(Cli::try_parse_from([
            "hubsync", "event", "export", "out", "--hub", "s", "--fromDate", "yesterday",
        ])
        .is_err());
    }
}
