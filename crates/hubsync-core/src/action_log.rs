//! Structured record of what an export or import run did.
//!
//! Every entry is echoed through `tracing` and, when a file is attached,
//! written as one line as soon as it is added:
//!
//! ```text
//! // hubsync event import log
//! // 2024-06-01T10:00:00Z
//! EVENT-CREATE 5f1c... 60aa...
//! // WARNING: Failed to unschedule edition ...
//! // SUCCESS
//! ```

use chrono::Utc;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogAction {
    EventCreate,
    EventUpdate,
    EditionCreate,
    EditionUpdate,
    SlotCreate,
    SlotUpdate,
    SnapshotCreate,
}

impl LogAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventCreate => "EVENT-CREATE",
            Self::EventUpdate => "EVENT-UPDATE",
            Self::EditionCreate => "EDITION-CREATE",
            Self::EditionUpdate => "EDITION-UPDATE",
            Self::SlotCreate => "SLOT-CREATE",
            Self::SlotUpdate => "SLOT-UPDATE",
            Self::SnapshotCreate => "SNAPSHOT-CREATE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Action { action: LogAction, args: Vec<String> },
    Comment(String),
    Warning(String),
    Error(String),
}

impl LogEntry {
    fn to_line(&self) -> String {
        match self {
            Self::Action { action, args } if args.is_empty() => action.as_str().to_string(),
            Self::Action { action, args } => format!("{} {}", action.as_str(), args.join(" ")),
            Self::Comment(text) => format!("// {}", text),
            Self::Warning(text) => format!("// WARNING: {}", text),
            Self::Error(text) => format!("// ERROR: {}", text),
        }
    }
}

pub struct ActionLog {
    title: String,
    entries: Vec<LogEntry>,
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    closed: bool,
}

impl ActionLog {
    /// A log kept only in memory.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            entries: Vec::new(),
            writer: None,
            path: None,
            closed: false,
        }
    }

    /// A log that is also written to `path` as entries arrive.
    pub fn to_file(title: impl Into<String>, path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        let title = title.into();
        writeln!(writer, "// {}", title)?;
        writeln!(writer, "// {}", Utc::now().to_rfc3339())?;
        writer.flush()?;

        Ok(Self {
            title,
            entries: Vec::new(),
            writer: Some(writer),
            path: Some(path.to_path_buf()),
            closed: false,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Arguments of every recorded `action`, in order.
    pub fn actions(&self, action: LogAction) -> Vec<&[String]> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::Action { action: a, args } if *a == action => Some(args.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::Warning(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::Error(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn add_action(&mut self, action: LogAction, args: &[&str]) {
        info!("{} {}", action.as_str(), args.join(" "));
        self.push(LogEntry::Action {
            action,
            args: args.iter().map(|a| a.to_string()).collect(),
        });
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!("{}", text);
        self.push(LogEntry::Comment(text));
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!("{}", text);
        self.push(LogEntry::Warning(text));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        error!("{}", text);
        self.push(LogEntry::Error(text));
    }

    fn push(&mut self, entry: LogEntry) {
        if let Some(writer) = self.writer.as_mut() {
            let written = writeln!(writer, "{}", entry.to_line()).and_then(|_| writer.flush());
            if let Err(e) = written {
                warn!("Action log write failed, continuing in memory only: {}", e);
                self.writer = None;
            }
        }
        self.entries.push(entry);
    }

    /// Append the run outcome and flush. Further calls are no-ops.
    pub fn close(&mut self, success: bool) -> std::io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let outcome = if success { "SUCCESS" } else { "FAILURE" };
        self.entries.push(LogEntry::Comment(outcome.to_string()));

        if let Some(mut writer) = self.writer.take() {
            writeln!(writer, "// {}", outcome)?;
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn records_actions_and_messages() {
        let mut log = ActionLog::new("test");
        log.add_action(LogAction::EventCreate, &["src", "dest"]);
        log.add_action(LogAction::SnapshotCreate, &["snap"]);
        log.warn("careful");
        log.error("broken");

        let created = log.actions(LogAction::EventCreate);
        assert_eq!(created.len(), 1);
        assert_eq!(created[0], ["src", "dest"]);
        assert_eq!(log.actions(LogAction::SnapshotCreate).len(), 1);
        assert!(log.actions(LogAction::SlotUpdate).is_empty());
        assert_eq!(log.warnings(), vec!["careful"]);
        assert_eq!(log.errors(), vec!["broken"]);
    }

    #[test]
    fn writes_lines_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("import.log");

        let mut log = ActionLog::to_file("hubsync event import log", &path).unwrap();
        log.add_action(LogAction::EditionUpdate, &["a", "b"]);
        log.warn("slot skipped");
        log.close(true).unwrap();
        log.close(false).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines[0], "// hubsync event import log");
        assert_eq!(lines[2], "EDITION-UPDATE a b");
        assert_eq!(lines[3], "// WARNING: slot skipped");
        assert_eq!(lines[4], "// SUCCESS");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn entries_reach_disk_before_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.log");

        let mut log = ActionLog::to_file("hubsync event export log", &path).unwrap();
        log.add_action(LogAction::SlotCreate, &["s1", "d1"]);
        log.error("hub unreachable");

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "SLOT-CREATE s1 d1");
        assert_eq!(lines[3], "// ERROR: hub unreachable");
    }
}
