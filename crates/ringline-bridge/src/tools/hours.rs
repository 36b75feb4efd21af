use super::{decode_args, function_schema, Tool, ToolContext, ToolError};
use crate::local_time::{business_tz, day_label, WEEKDAYS};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use ringline_types::BusinessConfig;
use serde::Deserialize;
use serde_json::{json, Value};

/// Open/closed status for a day, computed from the configured weekly hours
/// at business-local `now`.
pub fn check_hours(
    business: &BusinessConfig,
    day_of_week: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Value, ToolError> {
    let tz = business_tz(business);
    let local = now.with_timezone(&tz);
    let today_index = local.weekday().num_days_from_monday() as usize;
    let today = WEEKDAYS[today_index];

    let requested = day_of_week
        .map(|d| d.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty());
    let day = match requested.as_deref() {
        None | Some("today") => today,
        Some("tomorrow") => WEEKDAYS[(today_index + 1) % 7],
        Some(name) => WEEKDAYS
            .iter()
            .copied()
            .find(|d| *d == name)
            .ok_or_else(|| ToolError::InvalidArguments(format!("unknown day: {}", name)))?,
    };
    let is_today = day == today;
    let label = day_label(day);
    let now_local = local.time();
    // Yesterday's overnight window may still be running this morning.
    let carried_over = if is_today {
        day_window(business, WEEKDAYS[(today_index + 6) % 7])
            .and_then(|(start, end)| Some((parse_clock(&start)?, parse_clock(&end)?, end)))
            .filter(|(open_at, close_at, _)| close_at <= open_at && now_local < *close_at)
            .map(|(_, _, end)| end)
    } else {
        None
    };

    let Some((start, end)) = day_window(business, day) else {
        let mut result = json!({
            "success": true,
            "day": label,
            "is_open": false,
            "message": format!("We are closed on {}.", label),
        });
        if is_today {
            result["is_currently_open"] = json!(carried_over.is_some());
            if let Some(end) = carried_over {
                result["closing_time"] = json!(end);
                result["message"] = json!(format!("We're open right now until {}.", end));
            }
        }
        return Ok(result);
    };

    let mut result = json!({
        "success": true,
        "day": label,
        "is_open": true,
        "open_time": start,
        "close_time": end,
        "message": format!("On {} we are open from {} to {}.", label, start, end),
    });

    if is_today {
        let (open_at, close_at) = match (parse_clock(&start), parse_clock(&end)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                tracing::warn!(business_id = %business.id, day, "unparseable business hours");
                return Ok(result);
            }
        };
        // A close time at or before the open time runs past midnight.
        let overnight = close_at <= open_at;
        let tonight = now_local >= open_at && (overnight || now_local < close_at);
        let (open_now, closing, message) = if let Some(early_close) = carried_over {
            let message = format!("We're open right now until {}.", early_close);
            (true, early_close, message)
        } else if tonight {
            (true, end.clone(), format!("We're open right now until {}.", end))
        } else if now_local < open_at {
            let message = format!("We're closed right now. We open today at {}.", start);
            (false, end.clone(), message)
        } else {
            let message = format!("We're closed for the day. We closed today at {}.", end);
            (false, end.clone(), message)
        };
        result["is_currently_open"] = json!(open_now);
        result["closing_time"] = json!(closing);
        result["message"] = json!(message);
    }

    Ok(result)
}

fn day_window(business: &BusinessConfig, day: &str) -> Option<(String, String)> {
    business.hours.day(day).and_then(|h| match (h.open, h.start.as_deref(), h.end.as_deref()) {
        (true, Some(start), Some(end)) => Some((start.to_string(), end.to_string())),
        _ => None,
    })
}

fn parse_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

#[derive(Deserialize)]
struct HoursArgs {
    #[serde(default)]
    day_of_week: Option<String>,
}

pub struct CheckBusinessHours;

#[async_trait]
impl Tool for CheckBusinessHours {
    fn name(&self) -> &'static str {
        "check_business_hours"
    }

    fn schema(&self) -> Value {
        function_schema(
            self.name(),
            "Check whether the business is open on a given day, or right now.",
            json!({
                "type": "object",
                "properties": {
                    "day_of_week": {
                        "type": "string",
                        "description": "\"today\", \"tomorrow\", or a weekday name. Defaults to today."
                    }
                }
            }),
        )
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, ToolError> {
        let business = ctx.business()?;
        let args: HoursArgs = decode_args(args)?;
        check_hours(business, args.day_of_week.as_deref(), Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ringline_types::{DayHours, WeeklyHours};

    fn salon() -> BusinessConfig {
        let mut hours = WeeklyHours::default();
        hours.set("saturday", DayHours::open("09:00", "17:00"));
        hours.set("sunday", DayHours::closed());
        BusinessConfig {
            id: "biz-1".into(),
            name: "Shear Delight".into(),
            phone_number: None,
            instructions: None,
            voice: "alloy".into(),
            language: "en".into(),
            timezone: "America/New_York".into(),
            hours,
            services: vec![],
            knowledge_base: None,
        }
    }

    // 2026-10-17 is a Saturday; New York is UTC-4 that day.
    fn at_local(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, hour + 4, minute, 0).unwrap()
    }

    #[test]
    fn open_now_reports_closing_time() {
        let result = check_hours(&salon(), Some("today"), at_local(11, 15)).unwrap();
        assert_eq!(result["day"], "Saturday");
        assert_eq!(result["is_currently_open"], true);
        assert_eq!(result["closing_time"], "17:00");
    }

    #[test]
    fn before_opening_reports_next_open() {
        let result = check_hours(&salon(), None, at_local(7, 30)).unwrap();
        assert_eq!(result["is_currently_open"], false);
        assert!(result["message"].as_str().unwrap().contains("open today at 09:00"));
    }

    #[test]
    fn after_closing_reports_already_closed() {
        let result = check_hours(&salon(), Some("Today"), at_local(17, 0)).unwrap();
        assert_eq!(result["is_currently_open"], false);
        assert!(result["message"].as_str().unwrap().contains("closed today at 17:00"));
    }

    #[test]
    fn other_days_and_closed_days() {
        let sunday = check_hours(&salon(), Some("tomorrow"), at_local(12, 0)).unwrap();
        assert_eq!(sunday["day"], "Sunday");
        assert_eq!(sunday["is_open"], false);
        assert!(sunday.get("is_currently_open").is_none());

        let monday = check_hours(&salon(), Some("monday"), at_local(12, 0)).unwrap();
        assert_eq!(monday["is_open"], false);

        assert!(matches!(
            check_hours(&salon(), Some("caturday"), at_local(12, 0)),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn overnight_hours_stay_open_past_midnight() {
        let mut bar = salon();
        bar.hours.set("saturday", DayHours::open("18:00", "02:00"));

        let late = check_hours(&bar, None, at_local(19, 45)).unwrap();
        assert_eq!(late["is_currently_open"], true);
        assert_eq!(late["closing_time"], "02:00");

        let midday = check_hours(&bar, None, at_local(12, 0)).unwrap();
        assert_eq!(midday["is_currently_open"], false);
        assert!(midday["message"].as_str().unwrap().contains("open today at 18:00"));
    }

    #[test]
    fn friday_late_shift_carries_into_saturday_morning() {
        let mut bar = salon();
        bar.hours.set("friday", DayHours::open("20:00", "02:00"));
        bar.hours.set("saturday", DayHours::closed());

        let small_hours = check_hours(&bar, None, at_local(1, 30)).unwrap();
        assert_eq!(small_hours["is_open"], false);
        assert_eq!(small_hours["is_currently_open"], true);
        assert_eq!(small_hours["closing_time"], "02:00");

        let after = check_hours(&bar, None, at_local(2, 0)).unwrap();
        assert_eq!(after["is_currently_open"], false);
    }

    #[test]
    fn invalid_timezone_falls_back_to_utc() {
        let mut business = salon();
        business.timezone = "Mars/Olympus_Mons".into();
        let noon_utc = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let result = check_hours(&business, None, noon_utc).unwrap();
        assert_eq!(result["day"], "Saturday");
        assert_eq!(result["is_currently_open"], true);
    }
}
