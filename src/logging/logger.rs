//! Command-facing logger with summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::STAGE_TARGET;
use super::types::{EntryStatus, SummaryEntry};
use super::utils::log_file_path;

/// Logger handed to command handlers.
///
/// Messages become [`tracing`] events, so the console formatter and the
/// per-command log file (set up by [`init_subscriber`](super::init_subscriber))
/// both see them. Commands touching several targets or repositories record
/// one [`SummaryEntry`] each and print the summary at the end.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<SummaryEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a logger for `command`. Does not touch the log file.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> Vec<SummaryEntry> {
        self.entries.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header.
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (console only with `-v`; always in the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Record one summary line.
    pub fn record(&self, name: &str, status: EntryStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(SummaryEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Number of failed entries.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|e| e.status == EntryStatus::Failed)
                .count()
        })
    }

    /// Print the recorded entries and their totals. No-op if nothing was
    /// recorded.
    pub fn print_summary(&self) {
        let entries = match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if entries.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");

        let (mut ok, mut skipped, mut failed) = (0u32, 0u32, 0u32);
        for entry in &entries {
            match entry.status {
                EntryStatus::Ok => ok += 1,
                EntryStatus::Skipped => skipped += 1,
                EntryStatus::Failed => failed += 1,
            }
            let (icon, color) = entry.status.style();
            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.name));
        }

        println!();
        self.info(&format!(
            "{} total: \x1b[32m{ok} ok\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[31m{failed} failed\x1b[0m",
            ok + skipped + failed
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    #[test]
    fn logger_new_has_no_entries() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(log.entries().is_empty());
        assert_eq!(log.failure_count(), 0);
    }

    #[test]
    fn record_keeps_order_and_message() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record("Game A", EntryStatus::Ok, None);
        log.record("Game B", EntryStatus::Skipped, Some("directory missing"));
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Game A");
        assert_eq!(entries[1].message.as_deref(), Some("directory missing"));
    }

    #[test]
    fn failure_count_counts_failed_only() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record("a", EntryStatus::Ok, None);
        log.record("b", EntryStatus::Failed, Some("error 1"));
        log.record("c", EntryStatus::Failed, Some("error 2"));
        log.record("d", EntryStatus::Skipped, None);
        assert_eq!(log.failure_count(), 2);
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("[debug]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn log_file_starts_with_one_header_line() {
        let (log, _tmp, _guard) = isolated_logger();
        log.info("after-header");
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("# reshade-linux "));
        assert!(header.contains(" test "));
        assert!(lines.next().unwrap().ends_with("after-header"));
    }

    #[test]
    fn levels_are_tagged_in_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.warn("warn-marker");
        log.error("error-marker");
        log.stage("stage-marker");
        log.info("\x1b[32minfo-marker\x1b[0m");
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("[warn] warn-marker"));
        assert!(contents.contains("[error] error-marker"));
        assert!(contents.contains("==> stage-marker"));
        assert!(contents.contains("info-marker"));
        assert!(!contents.contains('\x1b'), "ANSI codes should be stripped");
    }

    #[test]
    fn summary_is_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record("Game A", EntryStatus::Ok, None);
        log.record("Game B", EntryStatus::Failed, Some("missing dll"));
        log.print_summary();
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("==> Summary"));
        assert!(contents.contains("✗ Game B (missing dll)"));
        assert!(contents.contains("2 total: 1 ok, 0 skipped, 1 failed"));
    }
}
