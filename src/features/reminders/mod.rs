//! # Reminders Feature
//!
//! Natural-language reminder scheduling: resolve a time expression, persist
//! the notification, poll for due records, push them to the messaging
//! platform, and advance recurrence state.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod model;
pub mod resolver;
pub mod scheduler;
pub mod service;
pub mod store;

pub use dispatcher::{Delivery, LinePushDispatcher};
pub use error::{DeliveryError, ReminderError, ResolveError, StoreError};
pub use events::{EventReporter, LogReporter};
pub use model::{NewNotification, Notification, NotificationUpdate, Priority, Recurrence};
pub use resolver::{PatternResolver, Resolution, ResolveStrategy, SemanticResolver, TimeResolver};
pub use scheduler::{PassSummary, ReminderScheduler};
pub use service::ReminderService;
pub use store::{JsonFileBackend, ListFilter, MemoryBackend, NotificationStore, StorageBackend};
