//! Deterministic time-expression parser
//!
//! Regex-based fallback strategy used when the semantic parse is unavailable
//! or unconfident. Handles clock times (7時, 12時40分, 15:00, "at 9pm"),
//! date qualifiers (今日/明日/明後日/来週, tomorrow, weekday names), relative
//! offsets (3時間後, "in 20 minutes") and recurrence markers (毎日, 毎週月曜,
//! 毎月1日, "every day", "every monday", "1st of every month").
//!
//! A bare time-of-day that has already passed rolls forward to the next day
//! it is reachable; a weekday-qualified time rolls to the next matching
//! weekday. Vague periods without an explicit hour (朝/夕方/夜) are rejected
//! as ambiguous together with candidate times. Nonsensical values (25時,
//! the 32nd) are rejected outright.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Timelike, Utc, Weekday,
};
use regex::Regex;

use super::{ResolveStrategy, Resolution};
use crate::features::reminders::error::ResolveError;
use crate::features::reminders::model::{Recurrence, MONTHLY_DAY_CLAMP};

use async_trait::async_trait;

/// Deterministic pattern-matching strategy.
pub struct PatternResolver {
    tz: FixedOffset,
    re_jp_hours_after: Regex,
    re_jp_minutes_after: Regex,
    re_en_in_hours: Regex,
    re_en_hours_from_now: Regex,
    re_en_in_minutes: Regex,
    re_jp_clock: Regex,
    re_colon_clock: Regex,
    re_en_at: Regex,
    re_en_bare_ampm: Regex,
    re_jp_weekday: Regex,
    re_en_weekday: Regex,
    re_jp_monthly: Regex,
    re_en_monthly: Regex,
    re_daily: Regex,
    re_weekly: Regex,
}

impl PatternResolver {
    pub fn new(tz: FixedOffset) -> Self {
        PatternResolver {
            tz,
            re_jp_hours_after: Regex::new(r"(\d{1,3})時間後").unwrap(),
            re_jp_minutes_after: Regex::new(r"(\d{1,3})分後").unwrap(),
            re_en_in_hours: Regex::new(r"(?i)\bin\s+(\d{1,3})\s+hours?\b").unwrap(),
            re_en_hours_from_now: Regex::new(r"(?i)\b(\d{1,3})\s+hours?\s+from\s+now\b").unwrap(),
            re_en_in_minutes: Regex::new(r"(?i)\bin\s+(\d{1,3})\s+min(?:ute)?s?\b").unwrap(),
            re_jp_clock: Regex::new(r"(\d{1,2})時(?:(\d{1,2})分)?").unwrap(),
            // No \b here: kana count as word characters, so a boundary would
            // reject "15:00に休憩"
            re_colon_clock: Regex::new(r"(\d{1,2}):(\d{2})").unwrap(),
            re_en_at: Regex::new(r"(?i)\bat\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").unwrap(),
            re_en_bare_ampm: Regex::new(r"(?i)\b(\d{1,2})\s*(am|pm)\b").unwrap(),
            re_jp_weekday: Regex::new(r"([月火水木金土日])曜").unwrap(),
            re_en_weekday: Regex::new(
                r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
            )
            .unwrap(),
            re_jp_monthly: Regex::new(r"毎月\s*(\d{1,2})日").unwrap(),
            re_en_monthly: Regex::new(
                r"(?i)\b(?:on\s+the\s+)?(\d{1,2})(?:st|nd|rd|th)\s+of\s+every\s+month\b",
            )
            .unwrap(),
            re_daily: Regex::new(r"(?i)毎日|毎朝|毎晩|\bevery\s+day\b|\bdaily\b").unwrap(),
            re_weekly: Regex::new(r"(?i)毎週|\bevery\s+week\b|\bweekly\b").unwrap(),
        }
    }

    /// Parse `text` against the reference instant `now`. Pure function.
    pub fn parse(&self, text: &str, now: DateTime<Utc>) -> Result<Resolution, ResolveError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ResolveError::Unresolvable);
        }

        // Relative offsets win outright; "3時間後" must not be misread as
        // a 3 o'clock wall-clock time.
        if let Some(minutes) = self.relative_minutes(text) {
            return Ok(Resolution {
                trigger_time: truncate_to_minute(now + Duration::minutes(minutes)),
                recurrence: Recurrence::None,
                title: infer_title(text),
                body: Some(text.to_string()),
                priority: None,
            });
        }

        let local_now = now.with_timezone(&self.tz);
        let recurrence = self.detect_recurrence(text)?;

        let (hour, minute) = match self.clock_time(text)? {
            Some(hm) => hm,
            None => {
                // 毎朝/毎晩 carry an implied hour of their own.
                if text.contains("毎朝") {
                    (8, 0)
                } else if text.contains("毎晩") {
                    (20, 0)
                } else if let Some(candidates) = vague_candidates(text) {
                    return Err(ResolveError::Ambiguous { candidates });
                } else {
                    return Err(ResolveError::Unresolvable);
                }
            }
        };

        let trigger_local = match recurrence {
            Detected::Monthly(day) => {
                self.next_monthly(local_now, day.min(MONTHLY_DAY_CLAMP), hour, minute)?
            }
            _ => {
                if let Some(weekday) = self.weekday_in(text) {
                    self.next_weekday(local_now, weekday, hour, minute, text)?
                } else {
                    self.next_plain(local_now, hour, minute, text)?
                }
            }
        };

        Ok(Resolution {
            trigger_time: trigger_local.with_timezone(&Utc),
            recurrence: recurrence.into(),
            title: infer_title(text),
            body: Some(text.to_string()),
            priority: None,
        })
    }

    /// Total relative offset in minutes, if the text is a relative
    /// expression ("3時間後", "in 20 minutes").
    fn relative_minutes(&self, text: &str) -> Option<i64> {
        let mut total: i64 = 0;

        for re in [&self.re_jp_hours_after, &self.re_en_in_hours, &self.re_en_hours_from_now] {
            if let Some(caps) = re.captures(text) {
                total += caps[1].parse::<i64>().ok()? * 60;
                break;
            }
        }
        for re in [&self.re_jp_minutes_after, &self.re_en_in_minutes] {
            if let Some(caps) = re.captures(text) {
                total += caps[1].parse::<i64>().ok()?;
                break;
            }
        }

        (total > 0).then_some(total)
    }

    fn detect_recurrence(&self, text: &str) -> Result<Detected, ResolveError> {
        for re in [&self.re_jp_monthly, &self.re_en_monthly] {
            if let Some(caps) = re.captures(text) {
                let day: u32 = caps[1].parse().map_err(|_| ResolveError::Unresolvable)?;
                if day == 0 || day > 31 {
                    // "the 32nd" is nonsense, not a guess we should make
                    return Err(ResolveError::Unresolvable);
                }
                return Ok(Detected::Monthly(day));
            }
        }
        if self.re_weekly.is_match(text) || self.en_weekly_weekday(text) {
            return Ok(Detected::Weekly);
        }
        if self.re_daily.is_match(text) {
            return Ok(Detected::Daily);
        }
        Ok(Detected::OneShot)
    }

    /// "every monday" style marks weekly recurrence without the 毎週 prefix.
    fn en_weekly_weekday(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains("every ") && self.re_en_weekday.is_match(&lower)
    }

    /// Extract an explicit clock time. `Ok(None)` when no pattern matched;
    /// `Err(Unresolvable)` when one matched with a nonsensical value.
    fn clock_time(&self, text: &str) -> Result<Option<(u32, u32)>, ResolveError> {
        let pm_context = text.contains("午後");
        let am_context = text.contains("午前");

        // JP clock, skipping the 時間 (duration) false positive
        for caps in self.re_jp_clock.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            if text[whole.end()..].starts_with('間') {
                continue;
            }
            let hour: u32 = caps[1].parse().map_err(|_| ResolveError::Unresolvable)?;
            let minute: u32 = caps
                .get(2)
                .map(|m| m.as_str().parse())
                .transpose()
                .map_err(|_| ResolveError::Unresolvable)?
                .unwrap_or(0);
            return validate_clock(hour, minute, pm_context, am_context).map(Some);
        }

        if let Some(caps) = self.re_colon_clock.captures(text) {
            let hour: u32 = caps[1].parse().map_err(|_| ResolveError::Unresolvable)?;
            let minute: u32 = caps[2].parse().map_err(|_| ResolveError::Unresolvable)?;
            return validate_clock(hour, minute, pm_context, am_context).map(Some);
        }

        for re in [&self.re_en_at, &self.re_en_bare_ampm] {
            if let Some(caps) = re.captures(text) {
                let hour: u32 = caps[1].parse().map_err(|_| ResolveError::Unresolvable)?;
                let minute: u32 = caps
                    .get(2)
                    .filter(|m| m.as_str().chars().all(|c| c.is_ascii_digit()))
                    .map(|m| m.as_str().parse())
                    .transpose()
                    .map_err(|_| ResolveError::Unresolvable)?
                    .unwrap_or(0);
                let suffix = caps
                    .iter()
                    .skip(2)
                    .flatten()
                    .map(|m| m.as_str().to_lowercase())
                    .find(|s| s == "am" || s == "pm");
                let pm = pm_context || suffix.as_deref() == Some("pm");
                let am = am_context || suffix.as_deref() == Some("am");
                return validate_clock(hour, minute, pm, am).map(Some);
            }
        }

        Ok(None)
    }

    fn weekday_in(&self, text: &str) -> Option<Weekday> {
        if let Some(caps) = self.re_jp_weekday.captures(text) {
            return jp_weekday(&caps[1]);
        }
        if let Some(caps) = self.re_en_weekday.captures(text) {
            return en_weekday(&caps[1].to_lowercase());
        }
        None
    }

    /// Next occurrence of `weekday` at the given time. A weekday-qualified
    /// time never resolves to today unless 今日/本日/today is explicit, and
    /// rolls a full week forward when the clock time has already passed.
    fn next_weekday(
        &self,
        local_now: DateTime<FixedOffset>,
        weekday: Weekday,
        hour: u32,
        minute: u32,
        text: &str,
    ) -> Result<DateTime<FixedOffset>, ResolveError> {
        let today = local_now.date_naive();
        let days_until = if text.contains("来週") {
            // 来週X曜 means X of next week, counted from next Monday
            (7 - today.weekday().num_days_from_monday()) + weekday.num_days_from_monday()
        } else {
            let raw = (weekday.num_days_from_monday() + 7
                - today.weekday().num_days_from_monday())
                % 7;
            let today_marker = text.contains("今日")
                || text.contains("本日")
                || text.to_lowercase().contains("today");
            if raw == 0 && !today_marker {
                7
            } else {
                raw
            }
        };

        let date = today + Duration::days(i64::from(days_until));
        let mut candidate = self.compose(date, hour, minute)?;
        if candidate <= local_now {
            candidate += Duration::weeks(1);
        }
        Ok(candidate)
    }

    /// Date-qualified or bare time. A bare time already past today rolls to
    /// tomorrow.
    fn next_plain(
        &self,
        local_now: DateTime<FixedOffset>,
        hour: u32,
        minute: u32,
        text: &str,
    ) -> Result<DateTime<FixedOffset>, ResolveError> {
        let lower = text.to_lowercase();
        let day_offset = if text.contains("明後日") {
            2
        } else if text.contains("明日") || lower.contains("tomorrow") {
            1
        } else if text.contains("来週") || lower.contains("next week") {
            7
        } else {
            0
        };

        let date = local_now.date_naive() + Duration::days(day_offset);
        let mut candidate = self.compose(date, hour, minute)?;
        if candidate <= local_now {
            candidate += Duration::days(1);
        }
        Ok(candidate)
    }

    /// First future occurrence of day-of-month `day` at the given time.
    /// `day` is already clamped to a value every month has.
    fn next_monthly(
        &self,
        local_now: DateTime<FixedOffset>,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Result<DateTime<FixedOffset>, ResolveError> {
        let (mut year, mut month) = (local_now.year(), local_now.month());
        for _ in 0..2 {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                let candidate = self.compose(date, hour, minute)?;
                if candidate > local_now {
                    return Ok(candidate);
                }
            }
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }
        Err(ResolveError::Unresolvable)
    }

    fn compose(
        &self,
        date: NaiveDate,
        hour: u32,
        minute: u32,
    ) -> Result<DateTime<FixedOffset>, ResolveError> {
        let naive = date
            .and_hms_opt(hour, minute, 0)
            .ok_or(ResolveError::Unresolvable)?;
        self.tz
            .from_local_datetime(&naive)
            .single()
            .ok_or(ResolveError::Unresolvable)
    }
}

#[async_trait]
impl ResolveStrategy for PatternResolver {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn resolve(&self, text: &str, now: DateTime<Utc>) -> Result<Resolution, ResolveError> {
        self.parse(text, now)
    }
}

/// Internal recurrence detection result; Monthly carries the day-of-month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detected {
    OneShot,
    Daily,
    Weekly,
    Monthly(u32),
}

impl From<Detected> for Recurrence {
    fn from(d: Detected) -> Self {
        match d {
            Detected::OneShot => Recurrence::None,
            Detected::Daily => Recurrence::Daily,
            Detected::Weekly => Recurrence::Weekly,
            Detected::Monthly(_) => Recurrence::Monthly,
        }
    }
}

fn jp_weekday(ch: &str) -> Option<Weekday> {
    match ch {
        "月" => Some(Weekday::Mon),
        "火" => Some(Weekday::Tue),
        "水" => Some(Weekday::Wed),
        "木" => Some(Weekday::Thu),
        "金" => Some(Weekday::Fri),
        "土" => Some(Weekday::Sat),
        "日" => Some(Weekday::Sun),
        _ => None,
    }
}

fn en_weekday(name: &str) -> Option<Weekday> {
    match name {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn validate_clock(
    hour: u32,
    minute: u32,
    pm: bool,
    am: bool,
) -> Result<(u32, u32), ResolveError> {
    let hour = if pm && hour <= 12 {
        (hour % 12) + 12
    } else if am && hour <= 12 {
        hour % 12
    } else {
        hour
    };
    if hour > 23 || minute > 59 {
        return Err(ResolveError::Unresolvable);
    }
    Ok((hour, minute))
}

fn truncate_to_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Candidate clock times for vague period words, offered back to the user
/// instead of guessing.
pub(super) fn vague_candidates(text: &str) -> Option<Vec<String>> {
    let lower = text.to_lowercase();
    let table: [(&[&str], &[&str]); 4] = [
        (&["夕方", "ゆうがた", "evening"], &["17:00", "18:00"]),
        (&["朝", "あさ", "morning"], &["08:00", "09:00"]),
        (&["夜", "よる", "tonight", "night"], &["20:00", "21:00"]),
        (&["昼", "noon"], &["12:00", "14:00"]),
    ];
    for (keywords, candidates) in table {
        if keywords.iter().any(|k| lower.contains(k)) {
            return Some(candidates.iter().map(|s| s.to_string()).collect());
        }
    }
    None
}

/// Guess a display title from content keywords; the caller falls back to a
/// generic one when nothing matches.
fn infer_title(text: &str) -> Option<String> {
    let table = [
        ("起きる", "起床時間"),
        ("会議", "会議リマインダー"),
        ("課題", "課題リマインダー"),
        ("薬", "服薬リマインダー"),
        ("食事", "食事時間"),
        ("夕食", "食事時間"),
        ("朝食", "食事時間"),
        ("昼食", "食事時間"),
        ("運動", "運動時間"),
        ("勉強", "勉強時間"),
    ];
    table
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, title)| title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn resolver() -> PatternResolver {
        PatternResolver::new(jst())
    }

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        jst()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_tomorrow_morning_with_explicit_hour() {
        // 2025-03-10 is a Monday; reference now is 20:00
        let now = local(2025, 3, 10, 20, 0);
        let r = resolver().parse("明日の朝7時に会議の通知", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 11, 7, 0));
        assert_eq!(r.recurrence, Recurrence::None);
        assert_eq!(r.title.as_deref(), Some("会議リマインダー"));
    }

    #[test]
    fn test_daily_at_18() {
        let now = local(2025, 3, 10, 20, 0);
        let r = resolver().parse("毎日18時に夕食の準備", now).unwrap();
        // 18:00 already passed, next upcoming is tomorrow
        assert_eq!(r.trigger_time, local(2025, 3, 11, 18, 0));
        assert_eq!(r.recurrence, Recurrence::Daily);
    }

    #[test]
    fn test_daily_at_18_before_18() {
        let now = local(2025, 3, 10, 9, 0);
        let r = resolver().parse("毎日18時に夕食の準備", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 10, 18, 0));
        assert_eq!(r.recurrence, Recurrence::Daily);
    }

    #[test]
    fn test_three_hours_from_now() {
        let now = local(2025, 3, 10, 10, 0);
        let r = resolver().parse("3時間後に会議", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 10, 13, 0));
        assert_eq!(r.recurrence, Recurrence::None);
    }

    #[test]
    fn test_in_20_minutes_english() {
        let now = local(2025, 3, 10, 10, 0);
        let r = resolver().parse("check the oven in 20 minutes", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 10, 10, 20));
    }

    #[test]
    fn test_bare_time_rolls_to_tomorrow() {
        let now = local(2025, 3, 10, 16, 0);
        let r = resolver().parse("15:00に休憩", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 11, 15, 0));
    }

    #[test]
    fn test_bare_time_today_still_ahead() {
        let now = local(2025, 3, 10, 9, 0);
        let r = resolver().parse("15:00に休憩", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 10, 15, 0));
    }

    #[test]
    fn test_minutes_precision() {
        let now = local(2025, 3, 10, 9, 0);
        let r = resolver().parse("12時40分に課題をやる", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 10, 12, 40));
        assert_eq!(r.title.as_deref(), Some("課題リマインダー"));
    }

    #[test]
    fn test_next_weekday() {
        // Monday 2025-03-10: next 水曜 (Wednesday) is 03-12
        let now = local(2025, 3, 10, 9, 0);
        let r = resolver().parse("水曜日の9時に打ち合わせ", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 12, 9, 0));
        assert_eq!(r.recurrence, Recurrence::None);
    }

    #[test]
    fn test_same_weekday_rolls_a_week() {
        // Monday, asking for 月曜 without 今日 -> next Monday
        let now = local(2025, 3, 10, 8, 0);
        let r = resolver().parse("月曜日の9時に報告", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 17, 9, 0));
    }

    #[test]
    fn test_every_monday_at_9() {
        let now = local(2025, 3, 10, 20, 0);
        let r = resolver().parse("every monday at 9", now).unwrap();
        assert_eq!(r.recurrence, Recurrence::Weekly);
        assert_eq!(r.trigger_time, local(2025, 3, 17, 9, 0));
    }

    #[test]
    fn test_weekly_jp() {
        let now = local(2025, 3, 10, 20, 0);
        let r = resolver().parse("毎週金曜18時に掃除", now).unwrap();
        assert_eq!(r.recurrence, Recurrence::Weekly);
        assert_eq!(r.trigger_time, local(2025, 3, 14, 18, 0));
    }

    #[test]
    fn test_monthly_first() {
        let now = local(2025, 3, 10, 9, 0);
        let r = resolver().parse("毎月1日の10時に家賃の振込", now).unwrap();
        assert_eq!(r.recurrence, Recurrence::Monthly);
        assert_eq!(r.trigger_time, local(2025, 4, 1, 10, 0));
    }

    #[test]
    fn test_monthly_english() {
        let now = local(2025, 3, 10, 9, 0);
        let r = resolver()
            .parse("pay rent on the 1st of every month at 10:00", now)
            .unwrap();
        assert_eq!(r.recurrence, Recurrence::Monthly);
        assert_eq!(r.trigger_time, local(2025, 4, 1, 10, 0));
    }

    #[test]
    fn test_thirty_second_rejected() {
        let now = local(2025, 3, 10, 9, 0);
        let err = resolver().parse("毎月32日の10時に通知", now).unwrap_err();
        assert!(matches!(err, ResolveError::Unresolvable));
    }

    #[test]
    fn test_hour_25_rejected() {
        let now = local(2025, 3, 10, 9, 0);
        let err = resolver().parse("25時に通知", now).unwrap_err();
        assert!(matches!(err, ResolveError::Unresolvable));
    }

    #[test]
    fn test_vague_evening_is_ambiguous() {
        let now = local(2025, 3, 10, 9, 0);
        let err = resolver().parse("明日の夕方に買い物", now).unwrap_err();
        match err {
            ResolveError::Ambiguous { candidates } => {
                assert_eq!(candidates, vec!["17:00", "18:00"]);
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn test_no_time_at_all_rejected() {
        let now = local(2025, 3, 10, 9, 0);
        let err = resolver().parse("そのうち散歩したい", now).unwrap_err();
        assert!(matches!(err, ResolveError::Unresolvable));
    }

    #[test]
    fn test_pm_suffix() {
        let now = local(2025, 3, 10, 9, 0);
        let r = resolver().parse("remind me at 9pm", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 10, 21, 0));
    }

    #[test]
    fn test_gogo_context() {
        let now = local(2025, 3, 10, 9, 0);
        let r = resolver().parse("午後3時に電話", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 10, 15, 0));
    }

    #[test]
    fn test_maiasa_default_hour() {
        let now = local(2025, 3, 10, 9, 0);
        let r = resolver().parse("毎朝薬を飲む", now).unwrap();
        assert_eq!(r.recurrence, Recurrence::Daily);
        assert_eq!(r.trigger_time, local(2025, 3, 11, 8, 0));
        assert_eq!(r.title.as_deref(), Some("服薬リマインダー"));
    }

    #[test]
    fn test_tomorrow_english() {
        let now = local(2025, 3, 10, 20, 0);
        let r = resolver().parse("standup tomorrow at 9:30", now).unwrap();
        assert_eq!(r.trigger_time, local(2025, 3, 11, 9, 30));
    }

    #[test]
    fn test_empty_input() {
        let now = local(2025, 3, 10, 20, 0);
        assert!(resolver().parse("   ", now).is_err());
    }
}
