//! Schedule expression parsing.

use std::str::FromStr;

use cron::Schedule;

use crate::error::{AppError, Result};

/// Crontab day-of-week numbers; both 0 and 7 are Sunday.
const WEEKDAYS: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Parse a cron-style schedule expression.
///
/// Accepts the classic five-field form (`min hour dom month dow`) by
/// pinning seconds to zero. Its numeric weekdays use crontab numbering
/// (0 or 7 = Sunday) and are rewritten to day names, since the `cron`
/// crate counts from 1 = Sunday. Six and seven field expressions pass
/// through unchanged.
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let normalized = match fields.as_slice() {
        [minute, hour, dom, month, dow] => {
            format!("0 {minute} {hour} {dom} {month} {}", crontab_weekdays(dow))
        }
        _ => fields.join(" "),
    };
    Schedule::from_str(&normalized).map_err(|e| AppError::schedule(expression, e))
}

/// Rewrite a crontab day-of-week field with day names.
///
/// Names, `*` and `*/n` are kept as written. Tokens that are not valid
/// weekdays are left alone so the parser reports them.
fn crontab_weekdays(field: &str) -> String {
    field
        .split(',')
        .map(weekday_item)
        .collect::<Vec<_>>()
        .join(",")
}

fn weekday_item(item: &str) -> String {
    let (body, step) = match item.split_once('/') {
        Some((body, step)) => match step.parse::<usize>() {
            Ok(step) if step > 0 => (body, Some(step)),
            _ => return item.to_string(),
        },
        None => (item, None),
    };

    let (start, end) = match body.split_once('-') {
        Some((start, end)) => match (weekday_number(start), weekday_number(end)) {
            (Some(start), Some(end)) if start <= end => (start, end),
            _ => return item.to_string(),
        },
        None => match weekday_number(body) {
            Some(day) if step.is_some() => (day, 6),
            Some(day) => return WEEKDAYS[day].to_string(),
            None => return item.to_string(),
        },
    };

    match step {
        // Sunday sorts first in the cron crate, so a range ending on 7 wraps
        None if end < 7 || start == 0 => {
            format!("{}-{}", WEEKDAYS[start], WEEKDAYS[end.min(6)])
        }
        _ => {
            let mut days: Vec<&str> = Vec::new();
            for day in (start..=end).step_by(step.unwrap_or(1)) {
                if !days.contains(&WEEKDAYS[day]) {
                    days.push(WEEKDAYS[day]);
                }
            }
            days.join(",")
        }
    }
}

fn weekday_number(token: &str) -> Option<usize> {
    token.parse::<usize>().ok().filter(|day| *day < WEEKDAYS.len())
}
