use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Append-only record of session lifecycle and detection events.
///
/// Constructed by the caller and handed to the components that write to it,
/// so tests can capture entries without process-wide state.
pub trait EventLog: Send {
    fn record(&mut self, severity: Severity, message: &str);

    fn info(&mut self, message: &str) {
        self.record(Severity::Info, message);
    }

    fn warning(&mut self, message: &str) {
        self.record(Severity::Warning, message);
    }

    fn error(&mut self, message: &str) {
        self.record(Severity::Error, message);
    }
}

/// Discards every entry.
pub struct NullEventLog;

impl EventLog for NullEventLog {
    fn record(&mut self, _severity: Severity, _message: &str) {}
}

/// Keeps entries in a shared buffer. Clones see the same entries.
#[derive(Clone, Default)]
pub struct MemoryEventLog {
    entries: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, msg)| msg).collect()
    }

    /// Number of entries whose message contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.entries()
            .iter()
            .filter(|(_, msg)| msg.contains(needle))
            .count()
    }
}

impl EventLog for MemoryEventLog {
    fn record(&mut self, severity: Severity, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((severity, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_tags() {
        assert_eq!(Severity::Info.to_string(), "INFO");
        assert_eq!(Severity::Warning.to_string(), "WARNING");
        assert_eq!(Severity::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_memory_log_preserves_write_order() {
        let mut log = MemoryEventLog::new();
        let view = log.clone();

        log.info("first");
        log.warning("second");
        log.error("third");

        assert_eq!(
            view.entries(),
            vec![
                (Severity::Info, "first".to_string()),
                (Severity::Warning, "second".to_string()),
                (Severity::Error, "third".to_string()),
            ]
        );
        assert_eq!(view.count_containing("ir"), 2);
    }

    #[test]
    fn test_null_log_accepts_everything() {
        let mut log = NullEventLog;
        log.info("ignored");
        log.error("ignored");
    }
}
