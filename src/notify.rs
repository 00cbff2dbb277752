// 📨 Run Log + Notification Sink
// Debug-gated log of one regeneration, optionally shipped to a recipient

use crate::error::FeedResult;
use std::sync::Mutex;
use tracing::{debug, info, warn};

// ============================================================================
// RUN LOG
// ============================================================================

/// RunLog - what happened during one regeneration
///
/// Every entry goes to `tracing` at debug level. With the debug flag on,
/// entries are also raised to info/warn and kept for the notification body.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    debug: bool,
    lines: Vec<String>,
}

impl RunLog {
    pub fn new(debug: bool) -> Self {
        RunLog {
            debug,
            lines: Vec::new(),
        }
    }

    /// Progress note
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        if self.debug {
            info!("{}", message);
            self.lines.push(message);
        }
    }

    /// Recoverable failure (masked, never interrupts the response)
    pub fn failure(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!("{}", message);
        if self.debug {
            warn!("{}", message);
            self.lines.push(format!("FAILED: {}", message));
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

// ============================================================================
// NOTIFIER
// ============================================================================

/// Notifier - injected sink for the run report
pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> FeedResult<()>;
}

/// Writes the report to the log (binaries' default sink)
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> FeedResult<()> {
        info!(recipient, subject, "{}", body);
        Ok(())
    }
}

/// A delivered report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Keeps every report in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> FeedResult<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Notification {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}

/// Report body for a finished regeneration
pub fn format_report(record_count: usize, ttl_secs: u64, log: &RunLog) -> String {
    let mut body = format!(
        "Regenerated {} records (cached for {} seconds)\n",
        record_count, ttl_secs
    );
    for line in log.lines() {
        body.push_str(line);
        body.push('\n');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_quiet_without_debug() {
        let mut log = RunLog::new(false);
        log.note("fetched source");
        log.failure("link unreachable");
        assert!(log.lines().is_empty());
    }

    #[test]
    fn test_run_log_collects_with_debug() {
        let mut log = RunLog::new(true);
        log.note("fetched source");
        log.failure("link unreachable");
        assert_eq!(log.lines(), &["fetched source", "FAILED: link unreachable"]);
    }

    #[test]
    fn test_format_report() {
        let mut log = RunLog::new(true);
        log.note("parsed 2 records");
        let body = format_report(2, 600, &log);

        assert!(body.starts_with("Regenerated 2 records (cached for 600 seconds)"));
        assert!(body.contains("parsed 2 records"));
    }

    #[test]
    fn test_memory_notifier_records() {
        let notifier = MemoryNotifier::new();
        notifier.notify("ops@example.com", "subject", "body").unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "ops@example.com");
    }
}
