//! # Time Expression Resolver
//!
//! Converts natural-language time phrases ("明日の朝7時", "3時間後",
//! "every monday at 9") into a concrete next trigger time plus an optional
//! recurrence rule.
//!
//! Two ranked strategies sit behind one interface: a semantic LLM parse and a
//! deterministic pattern matcher. The resolver tries them in order and the
//! caller never learns which one produced the result, so the scheduler and
//! store are independent of AI availability.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod pattern;
pub mod semantic;

pub use pattern::PatternResolver;
pub use semantic::SemanticResolver;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::error::ResolveError;
use super::model::{Priority, Recurrence};

/// A resolved time expression.
///
/// `title`, `body` and `priority` are hints extracted alongside the time;
/// the service fills in defaults for anything a strategy leaves empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub trigger_time: DateTime<Utc>,
    pub recurrence: Recurrence,
    pub title: Option<String>,
    pub body: Option<String>,
    pub priority: Option<Priority>,
}

/// One ranked parsing strategy. Implementations are pure with respect to
/// `(text, now)`: no side effects, same answer for the same inputs.
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, text: &str, now: DateTime<Utc>) -> Result<Resolution, ResolveError>;
}

/// Runs strategies in rank order until one succeeds.
///
/// `Backend` and `Unresolvable` failures fall through to the next strategy.
/// `Ambiguous` is terminal: a strategy that confidently identified candidate
/// times should have them surfaced to the user, not second-guessed by a
/// cruder parser.
pub struct TimeResolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl TimeResolver {
    pub fn new(strategies: Vec<Box<dyn ResolveStrategy>>) -> Self {
        TimeResolver { strategies }
    }

    pub async fn resolve(
        &self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Resolution, ResolveError> {
        let mut last_err = ResolveError::Unresolvable;

        for strategy in &self.strategies {
            match strategy.resolve(text, now).await {
                Ok(resolution) => {
                    debug!(
                        "Resolved '{}' via {} strategy -> {} ({:?})",
                        text,
                        strategy.name(),
                        resolution.trigger_time,
                        resolution.recurrence
                    );
                    return Ok(resolution);
                }
                Err(err @ ResolveError::Ambiguous { .. }) => {
                    debug!("{} strategy found '{}' ambiguous", strategy.name(), text);
                    return Err(err);
                }
                Err(ResolveError::Backend(reason)) => {
                    warn!(
                        "{} strategy unavailable, falling back: {reason}",
                        strategy.name()
                    );
                    last_err = ResolveError::Backend(reason);
                }
                Err(ResolveError::Unresolvable) => {
                    debug!("{} strategy could not resolve '{}'", strategy.name(), text);
                    last_err = ResolveError::Unresolvable;
                }
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    struct FailingStrategy;

    #[async_trait]
    impl ResolveStrategy for FailingStrategy {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn resolve(
            &self,
            _text: &str,
            _now: DateTime<Utc>,
        ) -> Result<Resolution, ResolveError> {
            Err(ResolveError::Backend("api down".to_string()))
        }
    }

    fn jst_now() -> DateTime<Utc> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 10, 20, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_falls_back_when_first_strategy_unavailable() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let resolver = TimeResolver::new(vec![
            Box::new(FailingStrategy),
            Box::new(PatternResolver::new(tz)),
        ]);

        let resolution = resolver.resolve("明日の7時に会議", jst_now()).await.unwrap();
        assert_eq!(resolution.recurrence, Recurrence::None);
    }

    #[tokio::test]
    async fn test_all_strategies_failing_reports_last_error() {
        let resolver = TimeResolver::new(vec![Box::new(FailingStrategy)]);
        let err = resolver.resolve("whenever", jst_now()).await.unwrap_err();
        assert!(matches!(err, ResolveError::Backend(_)));
    }

    #[tokio::test]
    async fn test_ambiguous_is_terminal() {
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let resolver = TimeResolver::new(vec![Box::new(PatternResolver::new(tz))]);

        let err = resolver.resolve("明日の夕方に通知", jst_now()).await.unwrap_err();
        assert!(matches!(err, ResolveError::Ambiguous { .. }));
    }
}
