//! # Notification Store
//!
//! Durable keyed storage for notification records. Every mutating operation
//! commits to the backend before returning success, so a crash immediately
//! after a successful call never loses the mutation. Mutations are serialized
//! behind one async mutex; readers get point-in-time clones.
//!
//! The durable medium is pluggable behind [`StorageBackend`]; the default is
//! a flat JSON collection on disk, written atomically (temp file + rename)
//! with a `.bak` copy of the previous generation.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::StoreError;
use super::model::{
    NewNotification, Notification, NotificationUpdate, Priority, MAX_ROLLOVER_STEPS,
};

/// Durable medium for the notification collection.
pub trait StorageBackend: Send + Sync {
    fn load(&self) -> Result<HashMap<String, Notification>, StoreError>;
    fn persist(&self, records: &HashMap<String, Notification>) -> Result<(), StoreError>;
}

// ============================================================================
// JSON file backend
// ============================================================================

/// Flat JSON file, one object keyed by notification id.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileBackend { path: path.into() }
    }

    fn ensure_parent(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(format!("create {parent:?}: {e}")))?;
            }
        }
        Ok(())
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self) -> Result<HashMap<String, Notification>, StoreError> {
        if !self.path.exists() {
            self.ensure_parent()?;
            fs::write(&self.path, b"{}")
                .map_err(|e| StoreError::Unavailable(format!("initialize {:?}: {e}", self.path)))?;
            debug!("Created initial notification file at {:?}", self.path);
            return Ok(HashMap::new());
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Unavailable(format!("read {:?}: {e}", self.path)))?;

        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                // Quarantine the broken file and start empty rather than
                // refusing to boot
                let quarantine = self
                    .path
                    .with_extension(format!("corrupted_{}", Utc::now().timestamp()));
                warn!(
                    "Notification file {:?} is corrupted ({e}), moving aside to {:?}",
                    self.path, quarantine
                );
                if let Err(rename_err) = fs::rename(&self.path, &quarantine) {
                    warn!("Failed to quarantine corrupted file: {rename_err}");
                }
                Ok(HashMap::new())
            }
        }
    }

    fn persist(&self, records: &HashMap<String, Notification>) -> Result<(), StoreError> {
        self.ensure_parent()?;

        if self.path.exists() {
            let backup = self.path.with_extension("bak");
            if let Err(e) = fs::copy(&self.path, &backup) {
                warn!("Failed to write backup {backup:?}: {e}");
            }
        }

        let data = serde_json::to_vec_pretty(records)
            .map_err(|e| StoreError::Unavailable(format!("serialize: {e}")))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data)
            .map_err(|e| StoreError::Unavailable(format!("write {tmp:?}: {e}")))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Unavailable(format!("replace {:?}: {e}", self.path)))?;
        Ok(())
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-process backend for tests and embedded use. `set_failing(true)` makes
/// every persist report `StorageUnavailable`, for exercising commit-failure
/// paths.
#[derive(Default)]
pub struct MemoryBackend {
    records: std::sync::Mutex<HashMap<String, Notification>>,
    failing: std::sync::atomic::AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> Result<HashMap<String, Notification>, StoreError> {
        Ok(self.records.lock().expect("backend poisoned").clone())
    }

    fn persist(&self, records: &HashMap<String, Notification>) -> Result<(), StoreError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory backend failing".to_string()));
        }
        *self.records.lock().expect("backend poisoned") = records.clone();
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

/// List query options: active-only and a minimum priority threshold.
#[derive(Debug, Clone)]
pub struct ListFilter {
    pub active_only: bool,
    pub min_priority: Option<Priority>,
}

impl Default for ListFilter {
    fn default() -> Self {
        ListFilter {
            active_only: true,
            min_priority: None,
        }
    }
}

/// The single owner of persisted notification state. All mutation paths,
/// user-driven and scheduler-driven, go through its per-record operations.
pub struct NotificationStore {
    backend: Box<dyn StorageBackend>,
    tz: FixedOffset,
    records: Mutex<HashMap<String, Notification>>,
}

impl NotificationStore {
    /// Load the collection from the backend.
    pub fn new(backend: Box<dyn StorageBackend>, tz: FixedOffset) -> Result<Self, StoreError> {
        let records = backend.load()?;
        info!("Loaded {} notification(s) from storage", records.len());
        Ok(NotificationStore {
            backend,
            tz,
            records: Mutex::new(records),
        })
    }

    /// Create a notification. Assigns a fresh id, persists, returns the full
    /// record. A one-shot trigger in the past is rejected before persistence.
    pub async fn create(&self, new: NewNotification) -> Result<Notification, StoreError> {
        if new.owner.trim().is_empty() {
            return Err(StoreError::Validation("owner must not be empty".to_string()));
        }
        if new.title.trim().is_empty() || new.body.trim().is_empty() {
            return Err(StoreError::Validation(
                "title and body must not be empty".to_string(),
            ));
        }
        let now = Utc::now();
        if new.recurrence.is_none() && new.trigger_time <= now {
            return Err(StoreError::Validation(
                "trigger_time is in the past for a one-shot notification".to_string(),
            ));
        }

        let mut records = self.records.lock().await;

        let mut id = new_id();
        while records.contains_key(&id) {
            id = new_id();
        }

        let record = Notification {
            id: id.clone(),
            owner: new.owner,
            title: new.title,
            body: new.body,
            trigger_time: new.trigger_time,
            recurrence: new.recurrence,
            priority: new.priority,
            active: true,
            last_fired_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut next = records.clone();
        next.insert(id.clone(), record.clone());
        self.backend.persist(&next)?;
        *records = next;

        debug!("Created notification {id} for {}", record.owner);
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<Notification, StoreError> {
        self.records
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Merge a partial update into a record. `id`, `owner` and `created_at`
    /// cannot be changed ([`NotificationUpdate`] has no such fields).
    pub async fn update(
        &self,
        id: &str,
        update: NotificationUpdate,
    ) -> Result<Notification, StoreError> {
        if update.is_empty() {
            return Err(StoreError::Validation(
                "update contains no fields".to_string(),
            ));
        }

        let mut records = self.records.lock().await;
        let current = records.get(id).ok_or(StoreError::NotFound)?;

        let mut updated = current.clone();
        if let Some(title) = update.title {
            updated.title = title;
        }
        if let Some(body) = update.body {
            updated.body = body;
        }
        if let Some(trigger_time) = update.trigger_time {
            updated.trigger_time = trigger_time;
        }
        if let Some(recurrence) = update.recurrence {
            updated.recurrence = recurrence;
        }
        if let Some(priority) = update.priority {
            updated.priority = priority;
        }
        if let Some(active) = update.active {
            updated.active = active;
        }

        if updated.title.trim().is_empty() || updated.body.trim().is_empty() {
            return Err(StoreError::Validation(
                "title and body must not be empty".to_string(),
            ));
        }
        if updated.active
            && updated.recurrence.is_none()
            && updated.trigger_time != current.trigger_time
            && updated.trigger_time <= Utc::now()
        {
            return Err(StoreError::Validation(
                "trigger_time is in the past for a one-shot notification".to_string(),
            ));
        }

        updated.updated_at = Utc::now();

        let mut next = records.clone();
        next.insert(id.to_string(), updated.clone());
        self.backend.persist(&next)?;
        *records = next;

        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        if !records.contains_key(id) {
            return Err(StoreError::NotFound);
        }

        let mut next = records.clone();
        next.remove(id);
        self.backend.persist(&next)?;
        *records = next;

        info!("Deleted notification {id}");
        Ok(())
    }

    /// Remove every notification belonging to `owner`; returns the count.
    pub async fn delete_owner(&self, owner: &str) -> Result<usize, StoreError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        let before = next.len();
        next.retain(|_, n| n.owner != owner);
        let removed = before - next.len();
        if removed == 0 {
            return Ok(0);
        }

        self.backend.persist(&next)?;
        *records = next;

        info!("Deleted {removed} notification(s) for {owner}");
        Ok(removed)
    }

    /// Notifications for one owner, ascending by trigger time.
    pub async fn list(&self, owner: &str, filter: &ListFilter) -> Vec<Notification> {
        let records = self.records.lock().await;
        let mut result: Vec<Notification> = records
            .values()
            .filter(|n| n.owner == owner)
            .filter(|n| !filter.active_only || n.active)
            .filter(|n| filter.min_priority.map_or(true, |min| n.priority >= min))
            .cloned()
            .collect();
        result.sort_by_key(|n| n.trigger_time);
        result
    }

    /// All active records whose trigger time has passed as of `as_of`,
    /// ascending by trigger time (oldest due first).
    ///
    /// Reloads the collection from the backend first so a scheduler running
    /// beside other processes observes their committed mutations; a backend
    /// failure here aborts the caller's scanning pass.
    pub async fn due(&self, as_of: DateTime<Utc>) -> Result<Vec<Notification>, StoreError> {
        let mut records = self.records.lock().await;
        *records = self.backend.load()?;

        let mut result: Vec<Notification> = records
            .values()
            .filter(|n| n.active && n.trigger_time <= as_of)
            .cloned()
            .collect();
        result.sort_by_key(|n| n.trigger_time);
        Ok(result)
    }

    /// Record a successful delivery: set `last_fired_at`, then either
    /// deactivate a one-shot or advance a recurring trigger. One atomic,
    /// persisted mutation, so a shutdown can never leave a record fired but
    /// not advanced.
    ///
    /// The recurrence rule is applied to the previous trigger time, not to
    /// `fired_at`, so late polling does not accumulate drift; when the
    /// result is still in the past (downtime spanning occurrences) the rule
    /// is reapplied until the trigger is in the future.
    pub async fn complete_occurrence(
        &self,
        id: &str,
        fired_at: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        let mut records = self.records.lock().await;
        let current = records.get(id).ok_or(StoreError::NotFound)?;

        let mut updated = current.clone();
        updated.last_fired_at = Some(
            current
                .last_fired_at
                .map_or(fired_at, |prev| prev.max(fired_at)),
        );

        match current.recurrence.advance(current.trigger_time, self.tz) {
            None => {
                updated.active = false;
            }
            Some(mut next_trigger) => {
                let mut steps = 1u32;
                while next_trigger <= fired_at && steps < MAX_ROLLOVER_STEPS {
                    match current.recurrence.advance(next_trigger, self.tz) {
                        Some(n) => next_trigger = n,
                        None => break,
                    }
                    steps += 1;
                }
                if next_trigger <= fired_at {
                    warn!("Rollover cap reached for {id}, trigger left at {next_trigger}");
                }
                updated.trigger_time = next_trigger;
            }
        }
        updated.updated_at = Utc::now();

        let mut next = records.clone();
        next.insert(id.to_string(), updated.clone());
        self.backend.persist(&next)?;
        *records = next;

        Ok(updated)
    }

    pub async fn count(&self) -> usize {
        self.records.lock().await.len()
    }
}

fn new_id() -> String {
    format!("n_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::model::Recurrence;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn memory_store() -> NotificationStore {
        NotificationStore::new(Box::new(MemoryBackend::new()), jst()).unwrap()
    }

    fn sample(owner: &str, minutes_ahead: i64) -> NewNotification {
        NewNotification {
            owner: owner.to_string(),
            title: "会議リマインダー".to_string(),
            body: "会議の通知".to_string(),
            trigger_time: Utc::now() + Duration::minutes(minutes_ahead),
            recurrence: Recurrence::None,
            priority: Priority::Medium,
        }
    }

    #[tokio::test]
    async fn test_create_then_get_roundtrip() {
        let store = memory_store();
        let input = sample("U1", 60);
        let created = store.create(input.clone()).await.unwrap();

        assert!(created.id.starts_with("n_"));
        assert!(created.active);
        assert!(created.last_fired_at.is_none());
        assert_eq!(created.owner, input.owner);
        assert_eq!(created.trigger_time, input.trigger_time);

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let store = memory_store();
        let mut input = sample("U1", 60);
        input.title = "  ".to_string();
        assert!(matches!(
            store.create(input).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_past_one_shot() {
        let store = memory_store();
        let input = sample("U1", -5);
        assert!(matches!(
            store.create(input).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_allows_past_trigger_for_recurring() {
        let store = memory_store();
        let mut input = sample("U1", -5);
        input.recurrence = Recurrence::Daily;
        assert!(store.create(input).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = memory_store();
        assert!(matches!(
            store.get("n_missing").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_shifts_trigger_time() {
        // "会議の時間を1時間遅らせて" -> trigger_time = T + 1h, rest unchanged
        let store = memory_store();
        let created = store.create(sample("U1", 60)).await.unwrap();
        let delayed = created.trigger_time + Duration::hours(1);

        let updated = store
            .update(
                &created.id,
                NotificationUpdate {
                    trigger_time: Some(delayed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.trigger_time, delayed);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.body, created.body);
        assert_eq!(updated.owner, created.owner);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.priority, created.priority);
    }

    #[tokio::test]
    async fn test_update_rejects_past_one_shot_trigger() {
        let store = memory_store();
        let created = store.create(sample("U1", 60)).await.unwrap();
        let result = store
            .update(
                &created.id,
                NotificationUpdate {
                    trigger_time: Some(Utc::now() - Duration::hours(1)),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_empty_is_validation_error() {
        let store = memory_store();
        let created = store.create(sample("U1", 60)).await.unwrap();
        assert!(matches!(
            store.update(&created.id, NotificationUpdate::default()).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_then_not_found() {
        let store = memory_store();
        let created = store.create(sample("U1", 60)).await.unwrap();
        store.delete(&created.id).await.unwrap();
        assert!(matches!(
            store.get(&created.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete(&created.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_owner_removes_only_theirs() {
        let store = memory_store();
        store.create(sample("U1", 10)).await.unwrap();
        store.create(sample("U1", 20)).await.unwrap();
        store.create(sample("U2", 30)).await.unwrap();

        let removed = store.delete_owner("U1").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.list("U1", &ListFilter::default()).await.len(), 0);
        assert_eq!(store.list("U2", &ListFilter::default()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_by_trigger_time() {
        let store = memory_store();
        let later = store.create(sample("U1", 120)).await.unwrap();
        let sooner = store.create(sample("U1", 30)).await.unwrap();

        let listed = store.list("U1", &ListFilter::default()).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, sooner.id);
        assert_eq!(listed[1].id, later.id);
    }

    #[tokio::test]
    async fn test_list_priority_threshold() {
        let store = memory_store();
        let mut low = sample("U1", 10);
        low.priority = Priority::Low;
        store.create(low).await.unwrap();
        let mut high = sample("U1", 20);
        high.priority = Priority::High;
        let high = store.create(high).await.unwrap();

        let filter = ListFilter {
            active_only: true,
            min_priority: Some(Priority::Medium),
        };
        let listed = store.list("U1", &filter).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, high.id);
    }

    #[tokio::test]
    async fn test_due_is_idempotent_without_dispatch() {
        let store = memory_store();
        let mut input = sample("U1", -10);
        input.recurrence = Recurrence::Daily;
        let created = store.create(input).await.unwrap();

        let as_of = Utc::now();
        let first = store.due(as_of).await.unwrap();
        let second = store.due(as_of).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, created.id);
    }

    #[tokio::test]
    async fn test_due_excludes_future_and_inactive() {
        let store = memory_store();
        let mut past = sample("U1", -10);
        past.recurrence = Recurrence::Daily;
        let past = store.create(past).await.unwrap();
        store.create(sample("U1", 60)).await.unwrap();

        let due = store.due(Utc::now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, past.id);

        store.complete_occurrence(&past.id, Utc::now()).await.unwrap();
        // advanced to tomorrow, nothing due anymore
        assert!(store.due(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_one_shot_deactivates() {
        let store = memory_store();
        let created = store.create(sample("U1", 1)).await.unwrap();
        let fired_at = Utc::now() + Duration::minutes(2);

        let updated = store.complete_occurrence(&created.id, fired_at).await.unwrap();
        assert!(!updated.active);
        assert_eq!(updated.last_fired_at, Some(fired_at));
        assert_eq!(updated.trigger_time, created.trigger_time);

        assert!(store
            .due(fired_at + Duration::minutes(1))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_complete_recurring_advances_from_previous_trigger() {
        let store = memory_store();
        let trigger = Utc::now() - Duration::minutes(3);
        let mut input = sample("U1", 0);
        input.trigger_time = trigger;
        input.recurrence = Recurrence::Daily;
        let created = store.create(input).await.unwrap();

        // fired late; the next trigger is previous + 1 day, not now + 1 day
        let updated = store
            .complete_occurrence(&created.id, Utc::now())
            .await
            .unwrap();
        assert!(updated.active);
        assert_eq!(updated.trigger_time, trigger + Duration::days(1));
        assert!(updated.trigger_time > created.trigger_time);
    }

    #[tokio::test]
    async fn test_complete_recurring_catches_up_after_downtime() {
        let store = memory_store();
        let trigger = Utc::now() - Duration::days(3);
        let mut input = sample("U1", 0);
        input.trigger_time = trigger;
        input.recurrence = Recurrence::Daily;
        let created = store.create(input).await.unwrap();

        let fired_at = Utc::now();
        let updated = store.complete_occurrence(&created.id, fired_at).await.unwrap();
        assert!(updated.trigger_time > fired_at);
        assert_eq!(updated.trigger_time, trigger + Duration::days(4));
    }

    #[tokio::test]
    async fn test_last_fired_at_is_monotonic() {
        let store = memory_store();
        let trigger = Utc::now() - Duration::minutes(1);
        let mut input = sample("U1", 0);
        input.trigger_time = trigger;
        input.recurrence = Recurrence::Daily;
        let created = store.create(input).await.unwrap();

        let late = Utc::now();
        let earlier = late - Duration::minutes(10);
        store.complete_occurrence(&created.id, late).await.unwrap();
        let updated = store.complete_occurrence(&created.id, earlier).await.unwrap();
        assert_eq!(updated.last_fired_at, Some(late));
    }

    #[tokio::test]
    async fn test_failed_persist_does_not_apply_mutation() {
        let backend = Arc::new(MemoryBackend::new());
        struct Shared(Arc<MemoryBackend>);
        impl StorageBackend for Shared {
            fn load(&self) -> Result<HashMap<String, Notification>, StoreError> {
                self.0.load()
            }
            fn persist(&self, r: &HashMap<String, Notification>) -> Result<(), StoreError> {
                self.0.persist(r)
            }
        }

        let store =
            NotificationStore::new(Box::new(Shared(backend.clone())), jst()).unwrap();
        backend.set_failing(true);

        let err = store.create(sample("U1", 60)).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        backend.set_failing(false);
        assert_eq!(store.list("U1", &ListFilter::default()).await.len(), 0);
    }

    #[tokio::test]
    async fn test_json_backend_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifications.json");

        let created = {
            let store = NotificationStore::new(
                Box::new(JsonFileBackend::new(&path)),
                jst(),
            )
            .unwrap();
            store.create(sample("U1", 60)).await.unwrap()
        };

        let reopened =
            NotificationStore::new(Box::new(JsonFileBackend::new(&path)), jst()).unwrap();
        let fetched = reopened.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_json_backend_quarantines_corrupted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notifications.json");
        fs::write(&path, b"{ not json at all").unwrap();

        let store =
            NotificationStore::new(Box::new(JsonFileBackend::new(&path)), jst()).unwrap();
        assert_eq!(store.count().await, 0);

        // the broken file was moved aside, not silently destroyed
        let quarantined = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().contains("corrupted_"));
        assert!(quarantined);
    }

    #[test]
    fn test_jst_timestamp_of_completed() {
        // advance happens in the configured offset; a JST evening trigger
        // stays on the same local clock time after a daily advance
        let tz = jst();
        let trigger = tz
            .with_ymd_and_hms(2025, 3, 10, 18, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let next = Recurrence::Daily.advance(trigger, tz).unwrap();
        assert_eq!(
            next.with_timezone(&tz).format("%H:%M").to_string(),
            "18:00"
        );
    }
}
