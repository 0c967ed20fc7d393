//! Notification data model
//!
//! The `Notification` record is the unit of schedulable reminder state. It is
//! persisted as-is in the notification collection and owned exclusively by the
//! [`NotificationStore`](super::store::NotificationStore); the scheduler only
//! holds transient copies while processing a firing pass.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use chrono::{DateTime, Datelike, Duration, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for catch-up recurrence rollover in one step. A recurring
/// notification whose trigger is far in the past (process downtime) is rolled
/// forward at most this many occurrences before giving up.
pub const MAX_ROLLOVER_STEPS: u32 = 1000;

/// Day-of-month ceiling for monthly recurrence. Advancing a monthly
/// notification clamps the day to this value so every month has a valid date.
pub const MONTHLY_DAY_CLAMP: u32 = 28;

/// How a notification repeats after firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    /// Parse the wire form used by the semantic parser ("none"/"daily"/...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(Recurrence::None),
            "daily" => Some(Recurrence::Daily),
            "weekly" => Some(Recurrence::Weekly),
            "monthly" => Some(Recurrence::Monthly),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Recurrence::None)
    }

    /// Compute the next trigger time after `from`.
    ///
    /// Daily and weekly recurrences are plain offsets. Monthly recurrence is
    /// calendar arithmetic in the configured timezone: the day-of-month is
    /// preserved, clamped to [`MONTHLY_DAY_CLAMP`] so February never produces
    /// an invalid date. Returns `None` for non-recurring notifications.
    pub fn advance(&self, from: DateTime<Utc>, tz: FixedOffset) -> Option<DateTime<Utc>> {
        match self {
            Recurrence::None => None,
            Recurrence::Daily => Some(from + Duration::days(1)),
            Recurrence::Weekly => Some(from + Duration::weeks(1)),
            Recurrence::Monthly => {
                let local = from.with_timezone(&tz);
                let (mut year, mut month) = (local.year(), local.month());
                if month == 12 {
                    year += 1;
                    month = 1;
                } else {
                    month += 1;
                }
                let day = local.day().min(MONTHLY_DAY_CLAMP);
                let next = local
                    .date_naive()
                    .with_year(year)?
                    .with_day(1)?
                    .with_month(month)?
                    .with_day(day)?
                    .and_time(local.time());
                Some(tz.from_local_datetime(&next).single()?.with_timezone(&Utc))
            }
        }
    }
}

/// Display priority of a notification. Ordering is meaningful: `Low < Medium
/// < High`, used by the priority-threshold list filter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// A scheduled reminder.
///
/// While `active` is true, `trigger_time` is always the next pending fire
/// time. After firing, one-shot notifications are deactivated and recurring
/// ones have their trigger advanced; both transitions happen atomically in
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub body: String,
    pub trigger_time: DateTime<Utc>,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub priority: Priority,
    pub active: bool,
    #[serde(default)]
    pub last_fired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a notification. The store assigns `id`, `created_at`,
/// `updated_at` and starts the record active.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub owner: String,
    pub title: String,
    pub body: String,
    pub trigger_time: DateTime<Utc>,
    pub recurrence: Recurrence,
    pub priority: Priority,
}

/// Partial update applied by [`NotificationStore::update`].
///
/// `id`, `owner` and `created_at` are deliberately not representable here;
/// `last_fired_at` is owned by the firing path and not user-assignable.
#[derive(Debug, Clone, Default)]
pub struct NotificationUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub trigger_time: Option<DateTime<Utc>>,
    pub recurrence: Option<Recurrence>,
    pub priority: Option<Priority>,
    pub active: Option<bool>,
}

impl NotificationUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.trigger_time.is_none()
            && self.recurrence.is_none()
            && self.priority.is_none()
            && self.active.is_none()
    }
}
