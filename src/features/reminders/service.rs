//! # Reminder Service
//!
//! Facade the message-handling front-end talks to: turns user text into
//! stored notifications via the two-stage resolver, and wraps the store's
//! administrative operations (list, snooze, re-prioritize, delete) with
//! ownership checks so one user can never touch another user's reminders.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::info;

use super::error::{ReminderError, StoreError};
use super::events::EventReporter;
use super::model::{NewNotification, Notification, NotificationUpdate, Priority};
use super::resolver::TimeResolver;
use super::store::{ListFilter, NotificationStore};

/// Per-user cap on stored notifications, matching the deployment default.
pub const DEFAULT_MAX_PER_OWNER: usize = 100;

/// Word-overlap ratio above which two notification texts count as duplicates.
const SIMILARITY_THRESHOLD: f64 = 0.7;

const DEFAULT_TITLE: &str = "リマインダー";

pub struct ReminderService {
    store: Arc<NotificationStore>,
    resolver: TimeResolver,
    reporter: Arc<dyn EventReporter>,
    max_per_owner: usize,
}

impl ReminderService {
    pub fn new(
        store: Arc<NotificationStore>,
        resolver: TimeResolver,
        reporter: Arc<dyn EventReporter>,
    ) -> Self {
        ReminderService {
            store,
            resolver,
            reporter,
            max_per_owner: DEFAULT_MAX_PER_OWNER,
        }
    }

    pub fn with_owner_cap(mut self, max_per_owner: usize) -> Self {
        self.max_per_owner = max_per_owner;
        self
    }

    /// Create a notification from free-form user text.
    ///
    /// Checks the per-user cap and similar-duplicate guard before resolving,
    /// then persists. Parse failures are reported to the observability
    /// collaborator and returned typed so the front-end can offer candidate
    /// times on ambiguity.
    pub async fn create_from_text(
        &self,
        owner: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Notification, ReminderError> {
        let existing = self.store.list(owner, &ListFilter::default()).await;
        if existing.len() >= self.max_per_owner {
            return Err(ReminderError::LimitExceeded {
                max: self.max_per_owner,
            });
        }
        if let Some(similar) = existing.iter().find(|n| is_similar(&n.body, text)) {
            info!(
                "Rejecting duplicate notification for {owner}: similar to {}",
                similar.id
            );
            return Err(ReminderError::Duplicate {
                existing_id: similar.id.clone(),
            });
        }

        let resolution = match self.resolver.resolve(text, now).await {
            Ok(resolution) => resolution,
            Err(e) => {
                self.reporter.parse_failed(text, &e.to_string());
                return Err(e.into());
            }
        };

        let created = self
            .store
            .create(NewNotification {
                owner: owner.to_string(),
                title: resolution
                    .title
                    .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                body: resolution.body.unwrap_or_else(|| text.to_string()),
                trigger_time: resolution.trigger_time,
                recurrence: resolution.recurrence,
                priority: resolution.priority.unwrap_or_default(),
            })
            .await?;

        info!(
            "Scheduled {} for {owner} at {} ({:?})",
            created.id, created.trigger_time, created.recurrence
        );
        Ok(created)
    }

    pub async fn get(&self, owner: &str, id: &str) -> Result<Notification, ReminderError> {
        Ok(self.owned(owner, id).await?)
    }

    pub async fn list(&self, owner: &str, filter: &ListFilter) -> Vec<Notification> {
        self.store.list(owner, filter).await
    }

    /// Shift a notification's trigger by `minutes` ("会議を1時間遅らせて").
    pub async fn snooze(
        &self,
        owner: &str,
        id: &str,
        minutes: i64,
    ) -> Result<Notification, ReminderError> {
        let current = self.owned(owner, id).await?;
        let update = NotificationUpdate {
            trigger_time: Some(current.trigger_time + Duration::minutes(minutes)),
            ..Default::default()
        };
        Ok(self.store.update(id, update).await?)
    }

    /// Change display priority ("これは重要").
    pub async fn set_priority(
        &self,
        owner: &str,
        id: &str,
        priority: Priority,
    ) -> Result<Notification, ReminderError> {
        self.owned(owner, id).await?;
        let update = NotificationUpdate {
            priority: Some(priority),
            ..Default::default()
        };
        Ok(self.store.update(id, update).await?)
    }

    /// Move a notification to an absolute trigger time.
    pub async fn reschedule(
        &self,
        owner: &str,
        id: &str,
        trigger_time: DateTime<Utc>,
    ) -> Result<Notification, ReminderError> {
        self.owned(owner, id).await?;
        let update = NotificationUpdate {
            trigger_time: Some(trigger_time),
            ..Default::default()
        };
        Ok(self.store.update(id, update).await?)
    }

    pub async fn delete(&self, owner: &str, id: &str) -> Result<(), ReminderError> {
        self.owned(owner, id).await?;
        Ok(self.store.delete(id).await?)
    }

    /// Remove everything the owner has; returns the count.
    pub async fn delete_all(&self, owner: &str) -> Result<usize, ReminderError> {
        Ok(self.store.delete_owner(owner).await?)
    }

    /// Fetch a record, reporting NotFound when it belongs to someone else.
    async fn owned(&self, owner: &str, id: &str) -> Result<Notification, StoreError> {
        let record = self.store.get(id).await?;
        if record.owner != owner {
            return Err(StoreError::NotFound);
        }
        Ok(record)
    }
}

/// Word-overlap similarity used to catch re-submitted reminders. Recurrence
/// and unit words are stripped first so "毎日7時に薬" and "7時に薬" collide.
fn is_similar(a: &str, b: &str) -> bool {
    let normalize = |s: &str| {
        s.to_lowercase()
            .replace("毎日", "")
            .replace('時', "")
            .replace('分', "")
    };
    let a = normalize(a);
    let b = normalize(b);
    let a_words: HashSet<&str> = a.split_whitespace().collect();
    let b_words: HashSet<&str> = b.split_whitespace().collect();
    if a_words.is_empty() || b_words.is_empty() {
        return false;
    }
    let common = a_words.intersection(&b_words).count();
    common as f64 / a_words.len().max(b_words.len()) as f64 >= SIMILARITY_THRESHOLD
}
