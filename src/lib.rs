// Core layer - shared types and configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Re-export core config for convenience
pub use crate::core::Config;

// Re-export feature items for convenience
pub use crate::features::reminders::{
    // Delivery boundary
    Delivery, LinePushDispatcher,
    // Errors
    DeliveryError, ReminderError, ResolveError, StoreError,
    // Observability boundary
    EventReporter, LogReporter,
    // Data model
    NewNotification, Notification, NotificationUpdate, Priority, Recurrence,
    // Resolver
    PatternResolver, Resolution, ResolveStrategy, SemanticResolver, TimeResolver,
    // Scheduler
    PassSummary, ReminderScheduler,
    // Service facade
    ReminderService,
    // Store
    JsonFileBackend, ListFilter, MemoryBackend, NotificationStore, StorageBackend,
};
