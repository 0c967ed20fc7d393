//! Semantic time-expression parser backed by the OpenAI chat API
//!
//! Primary resolver strategy: the model is prompted to return a small JSON
//! object with the parsed datetime, title, message, priority and recurrence.
//! Any API failure, refusal or malformed response is reported as a `Backend`
//! error so the resolver falls through to the deterministic pattern matcher;
//! AI unavailability must never take the reminder subsystem down with it.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use log::debug;
use serde::Deserialize;

use super::{ResolveStrategy, Resolution};
use crate::features::reminders::error::ResolveError;
use crate::features::reminders::model::{Priority, Recurrence};

/// Datetime layouts the model is allowed to answer with. Mirrors what the
/// messaging front-end historically produced.
const ACCEPTED_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// LLM-backed strategy. Pure with respect to (text, now): `now` is embedded
/// in the prompt so the model resolves relative expressions against it, not
/// against its own notion of the current date.
pub struct SemanticResolver {
    model: String,
    tz: FixedOffset,
}

impl SemanticResolver {
    pub fn new(model: String, tz: FixedOffset) -> Self {
        SemanticResolver { model, tz }
    }

    fn build_prompt(&self, text: &str, now: DateTime<Utc>) -> String {
        let local_now = now.with_timezone(&self.tz);
        format!(
            r#"ユーザーの通知設定リクエストを解析してください。

現在日時: {now}
入力テキスト: "{text}"

以下のJSON形式のみで回答してください:
{{
  "datetime": "YYYY-MM-DD HH:MM",
  "title": "通知タイトル",
  "message": "通知メッセージ",
  "priority": "high/medium/low",
  "repeat": "none/daily/weekly/monthly"
}}

解析できない場合はnullを返してください。"#,
            now = local_now.format("%Y-%m-%d %H:%M (%a)"),
            text = text
        )
    }

    fn parse_response(
        &self,
        content: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Resolution, ResolveError> {
        let stripped = strip_code_fences(content);
        if stripped.is_empty() || stripped == "null" {
            return Err(ResolveError::Unresolvable);
        }

        let parsed: ParsedReminder = serde_json::from_str(stripped)
            .map_err(|e| ResolveError::Backend(format!("malformed model response: {e}")))?;

        let Some(datetime) = parsed.datetime.as_deref().filter(|s| !s.is_empty()) else {
            // The model understood the request but not the time; vague
            // periods become concrete candidates for the user to pick.
            if let Some(candidates) = super::pattern::vague_candidates(text) {
                return Err(ResolveError::Ambiguous { candidates });
            }
            return Err(ResolveError::Unresolvable);
        };

        let naive = parse_any_format(datetime)
            .ok_or_else(|| ResolveError::Backend(format!("unparseable datetime: {datetime}")))?;
        let trigger_time = self
            .tz
            .from_local_datetime(&naive)
            .single()
            .ok_or(ResolveError::Unresolvable)?
            .with_timezone(&Utc);

        if trigger_time <= now {
            debug!("semantic parse produced a past trigger ({trigger_time}), rejecting");
            return Err(ResolveError::Unresolvable);
        }

        let recurrence = match parsed.repeat.as_deref() {
            None | Some("") => Recurrence::None,
            Some(r) => Recurrence::parse(r).ok_or(ResolveError::Unresolvable)?,
        };

        Ok(Resolution {
            trigger_time,
            recurrence,
            title: parsed.title.filter(|t| !t.is_empty()),
            body: parsed.message.filter(|m| !m.is_empty()),
            priority: parsed.priority.as_deref().and_then(Priority::parse),
        })
    }
}

#[async_trait]
impl ResolveStrategy for SemanticResolver {
    fn name(&self) -> &'static str {
        "semantic"
    }

    async fn resolve(&self, text: &str, now: DateTime<Utc>) -> Result<Resolution, ResolveError> {
        let messages = vec![openai::chat::ChatCompletionMessage {
            role: openai::chat::ChatCompletionMessageRole::User,
            content: Some(self.build_prompt(text, now)),
            name: None,
            function_call: None,
            tool_call_id: None,
            tool_calls: None,
        }];

        let chat_completion = openai::chat::ChatCompletion::builder(&self.model, messages)
            .create()
            .await
            .map_err(|e| ResolveError::Backend(format!("OpenAI API error: {e}")))?;

        let content = chat_completion
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ResolveError::Backend("empty model response".to_string()))?;

        self.parse_response(&content, text, now)
    }
}

#[derive(Debug, Deserialize)]
struct ParsedReminder {
    #[serde(default)]
    datetime: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    repeat: Option<String>,
}

fn parse_any_format(s: &str) -> Option<NaiveDateTime> {
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
}

/// Models routinely wrap JSON in markdown fences despite instructions.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}
