//! Summary entries recorded by multi-target commands.

/// One line of the end-of-run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    /// Target or repository name.
    pub name: String,
    /// How the step ended.
    pub status: EntryStatus,
    /// Optional detail (skip reason or error description).
    pub message: Option<String>,
}

/// Outcome of one summarised step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Completed.
    Ok,
    /// Nothing to do.
    Skipped,
    /// Failed; the command continued with the next entry.
    Failed,
}

impl EntryStatus {
    /// Summary icon and ANSI colour.
    pub(super) const fn style(self) -> (&'static str, &'static str) {
        match self {
            Self::Ok => ("✓", "\x1b[32m"),
            Self::Skipped => ("○", "\x1b[33m"),
            Self::Failed => ("✗", "\x1b[31m"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_status_has_distinct_icon() {
        let icons: Vec<&str> = [EntryStatus::Ok, EntryStatus::Skipped, EntryStatus::Failed]
            .into_iter()
            .map(|s| s.style().0)
            .collect();
        assert_eq!(icons, vec!["✓", "○", "✗"]);
    }
}
