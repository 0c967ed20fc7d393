//! Observability collaborator boundary
//!
//! Dispatch failures and parse failures are reported as structured events
//! (kind, record id or input text, reason) so the surrounding application can
//! forward them wherever it wants. The default sink just logs.

use log::warn;

/// Receives failure events from the scheduler and the service. Implementations
/// must be cheap and non-blocking; the reminder subsystem never waits on its
/// observer.
pub trait EventReporter: Send + Sync {
    fn dispatch_failed(&self, record_id: &str, reason: &str);
    fn parse_failed(&self, input: &str, reason: &str);
}

/// Default reporter backed by the `log` crate.
pub struct LogReporter;

impl EventReporter for LogReporter {
    fn dispatch_failed(&self, record_id: &str, reason: &str) {
        warn!("event=dispatch_failed id={record_id} reason={reason}");
    }

    fn parse_failed(&self, input: &str, reason: &str) {
        warn!("event=parse_failed input={input:?} reason={reason}");
    }
}
