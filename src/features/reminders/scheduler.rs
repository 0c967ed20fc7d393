//! # Reminder Scheduler
//!
//! Background polling loop that scans the store for due notifications,
//! dispatches them, and advances recurrence state.
//!
//! Each cycle runs Scanning → Dispatching → Advancing over a snapshot of the
//! due set, oldest trigger first. Dispatch failures are isolated per record
//! and retried on the next cycle (at-least-once delivery); only a successful
//! dispatch mutates the record, and it does so through one atomic store
//! operation so shutdown can never leave a record fired-but-not-advanced.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use tokio::sync::watch;

use super::dispatcher::Delivery;
use super::error::{DeliveryError, StoreError};
use super::events::EventReporter;
use super::store::NotificationStore;

/// Default scan interval, matching the deployment default.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Default per-record dispatch timeout. One slow delivery must not delay the
/// rest of the due set.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A record successfully sent within this window is not re-sent, even if it
/// is still marked due because the post-dispatch advance failed to commit.
const SUPPRESSION_WINDOW_SECS: i64 = 300;

/// Dispatching pause after the messaging platform reports a rate limit.
const RATE_LIMIT_COOLDOWN_SECS: i64 = 3600;

/// Ceiling for exponential backoff after consecutive scan failures.
const MAX_ERROR_BACKOFF_SECS: u64 = 30;

/// Outcome counts of one scanning pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub dispatched: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct ReminderScheduler {
    store: Arc<NotificationStore>,
    delivery: Arc<dyn Delivery>,
    reporter: Arc<dyn EventReporter>,
    check_interval: Duration,
    dispatch_timeout: Duration,
    recently_sent: DashMap<String, DateTime<Utc>>,
    cooldown_until: Mutex<Option<DateTime<Utc>>>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<NotificationStore>,
        delivery: Arc<dyn Delivery>,
        reporter: Arc<dyn EventReporter>,
    ) -> Self {
        ReminderScheduler {
            store,
            delivery,
            reporter,
            check_interval: DEFAULT_CHECK_INTERVAL,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            recently_sent: DashMap::new(),
            cooldown_until: Mutex::new(None),
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Poll until `shutdown` flips to true. The in-flight record is finished
    /// before stopping; no new pass starts afterwards.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Reminder scheduler started (interval: {:?}, dispatch timeout: {:?})",
            self.check_interval, self.dispatch_timeout
        );

        let mut interval = tokio::time::interval(self.check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut error_count: u32 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() {
                break;
            }

            match self.pass_inner(Utc::now(), Some(&shutdown)).await {
                Ok(summary) => {
                    error_count = 0;
                    if summary.dispatched > 0 || summary.failed > 0 {
                        info!(
                            "Scanning pass done: {} delivered, {} failed, {} suppressed",
                            summary.dispatched, summary.failed, summary.skipped
                        );
                    }
                }
                Err(e) => {
                    error_count += 1;
                    error!("Scanning pass failed ({error_count} consecutive): {e}");
                    let backoff = self
                        .check_interval
                        .as_secs()
                        .saturating_mul(2u64.saturating_pow(error_count))
                        .min(MAX_ERROR_BACKOFF_SECS);
                    warn!("Waiting {backoff}s before the next scan");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
            }

            if *shutdown.borrow() {
                break;
            }
        }

        info!("Reminder scheduler stopped");
    }

    /// Execute one scanning pass against the reference instant `now`.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassSummary, StoreError> {
        self.pass_inner(now, None).await
    }

    async fn pass_inner(
        &self,
        now: DateTime<Utc>,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> Result<PassSummary, StoreError> {
        {
            let mut cooldown = self.cooldown_until.lock().expect("cooldown poisoned");
            if let Some(until) = *cooldown {
                if until > now {
                    debug!("Dispatch cooldown active until {until}, skipping pass");
                    return Ok(PassSummary::default());
                }
                *cooldown = None;
            }
        }

        // Scanning: one snapshot per pass; re-querying mid-pass could hand
        // us the same record twice
        let due = self.store.due(now).await?;
        let mut summary = PassSummary::default();
        if due.is_empty() {
            return Ok(summary);
        }
        debug!("{} notification(s) due as of {now}", due.len());

        for notification in due {
            if let Some(rx) = shutdown {
                if *rx.borrow() {
                    debug!("Shutdown requested, abandoning the rest of the pass");
                    break;
                }
            }

            if self.is_suppressed(&notification.id, now) {
                debug!(
                    "Notification {} sent recently, suppressing duplicate",
                    notification.id
                );
                summary.skipped += 1;
                continue;
            }

            // Dispatching
            let dispatched =
                tokio::time::timeout(self.dispatch_timeout, self.delivery.deliver(&notification))
                    .await;

            match dispatched {
                Err(_) => {
                    summary.failed += 1;
                    self.reporter
                        .dispatch_failed(&notification.id, "dispatch timed out");
                }
                Ok(Err(DeliveryError::RateLimited)) => {
                    summary.failed += 1;
                    self.reporter
                        .dispatch_failed(&notification.id, "rate limited by messaging platform");
                    let until = now + chrono::Duration::seconds(RATE_LIMIT_COOLDOWN_SECS);
                    *self.cooldown_until.lock().expect("cooldown poisoned") = Some(until);
                    warn!("Messaging platform rate limit hit, pausing dispatch until {until}");
                    break;
                }
                Ok(Err(e)) => {
                    summary.failed += 1;
                    self.reporter.dispatch_failed(&notification.id, &e.to_string());
                }
                Ok(Ok(())) => {
                    self.recently_sent.insert(notification.id.clone(), now);

                    // Advancing
                    match self.store.complete_occurrence(&notification.id, now).await {
                        Ok(updated) => {
                            summary.dispatched += 1;
                            if updated.active {
                                info!(
                                    "Delivered {} to {}, next trigger {}",
                                    updated.id, updated.owner, updated.trigger_time
                                );
                            } else {
                                info!("Delivered one-shot {} to {}", updated.id, updated.owner);
                            }
                        }
                        Err(StoreError::NotFound) => {
                            debug!("Notification {} vanished mid-pass", notification.id);
                        }
                        Err(e) => {
                            error!(
                                "Delivered {} but could not advance it: {e}",
                                notification.id
                            );
                        }
                    }
                }
            }
        }

        self.recently_sent.retain(|_, sent_at| {
            now.signed_duration_since(*sent_at).num_seconds() < SUPPRESSION_WINDOW_SECS
        });

        Ok(summary)
    }

    fn is_suppressed(&self, id: &str, now: DateTime<Utc>) -> bool {
        self.recently_sent
            .get(id)
            .map(|sent_at| {
                now.signed_duration_since(*sent_at).num_seconds() < SUPPRESSION_WINDOW_SECS
            })
            .unwrap_or(false)
    }
}
