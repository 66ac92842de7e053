use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::session::domain::event_log::{EventLog, Severity};
use crate::shared::constants::LOG_TIMESTAMP_FORMAT;

/// Appends `"<timestamp>  <SEVERITY>  <message>"` lines to a file and
/// mirrors each entry to the `log` facade.
///
/// Lines are flushed as they are written so the file can be tailed.
pub struct FileEventLog {
    file: File,
    path: PathBuf,
}

impl FileEventLog {
    pub fn open(path: &Path) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn format_line(timestamp: &str, severity: Severity, message: &str) -> String {
    format!("{timestamp}  {}  {message}", severity.tag())
}

impl EventLog for FileEventLog {
    fn record(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => log::info!("{message}"),
            Severity::Warning => log::warn!("{message}"),
            Severity::Error => log::error!("{message}"),
        }

        let timestamp = chrono::Local::now().format(LOG_TIMESTAMP_FORMAT).to_string();
        let line = format_line(&timestamp, severity, message);
        let written = writeln!(self.file, "{line}").and_then(|_| self.file.flush());
        if let Err(e) = written {
            log::error!("Could not append to {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_format_line_layout() {
        assert_eq!(
            format_line("2024-03-05T14:07:09+0000", Severity::Warning, "clip failed"),
            "2024-03-05T14:07:09+0000  WARNING  clip failed"
        );
    }

    #[test]
    fn test_creates_parent_directories_and_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/detections.log");

        let mut log = FileEventLog::open(&path).unwrap();
        log.info("session started");
        log.warning("queue full");

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("  INFO  session started"));
        assert!(lines[1].ends_with("  WARNING  queue full"));
    }

    #[test]
    fn test_timestamp_prefix_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.log");

        let mut log = FileEventLog::open(&path).unwrap();
        log.info("hello");

        let line = &read_lines(&path)[0];
        let timestamp = line.split("  ").next().unwrap();
        assert!(chrono::DateTime::parse_from_str(timestamp, LOG_TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.log");

        FileEventLog::open(&path).unwrap().info("run one");
        FileEventLog::open(&path).unwrap().info("run two");

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("run two"));
    }

    #[test]
    fn test_open_under_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();

        assert!(FileEventLog::open(&blocker.join("detections.log")).is_err());
    }
}
