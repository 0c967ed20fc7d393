//! Error types for the reminder subsystem
//!
//! Resolver, store and delivery failures are ordinary typed results, never
//! control flow. `NotFound` is distinguishable from `Validation` so callers
//! can answer "no such reminder" differently from "bad request".

use thiserror::Error;

/// Failure modes of time-expression resolution.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The expression names a vague period without a concrete clock time.
    /// `candidates` holds "HH:MM" suggestions the front-end can offer.
    #[error("time expression is ambiguous (candidates: {})", candidates.join(", "))]
    Ambiguous { candidates: Vec<String> },

    /// No strategy could extract a time with sufficient confidence.
    #[error("could not resolve a time expression")]
    Unresolvable,

    /// A strategy was unavailable (e.g. the LLM API errored). The resolver
    /// falls through to the next ranked strategy on this variant.
    #[error("resolver backend unavailable: {0}")]
    Backend(String),
}

/// Failure modes of the notification store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("notification not found")]
    NotFound,

    /// Rejected before persistence (empty fields, past trigger for a
    /// one-shot, malformed recurrence).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Durable storage could not commit; the mutation did NOT apply.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failure modes of the delivery transport.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// The platform rejected the push with a rate-limit response. The
    /// scheduler pauses dispatching for a cooldown period.
    #[error("delivery rate limited by the messaging platform")]
    RateLimited,

    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Umbrella error for the service facade.
#[derive(Debug, Clone, Error)]
pub enum ReminderError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("notification limit reached ({max} per user)")]
    LimitExceeded { max: usize },

    #[error("a similar notification already exists ({existing_id})")]
    Duplicate { existing_id: String },
}
