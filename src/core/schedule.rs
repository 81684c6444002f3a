use crate::utils::error::{ApiError, Result};
use chrono::{DateTime, TimeDelta, Timelike, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CronField {
    Any,
    At(u32),
    Every(u32),
}

impl CronField {
    fn parse(raw: &str, max: u32, field: &str, expression: &str) -> Result<Self> {
        let invalid = |reason: String| ApiError::InvalidTrigger {
            expression: expression.to_string(),
            reason,
        };

        if raw == "*" {
            return Ok(CronField::Any);
        }

        if let Some(step) = raw.strip_prefix("*/") {
            let step: u32 = step
                .parse()
                .map_err(|_| invalid(format!("{} step '{}' is not a number", field, step)))?;
            if step == 0 || step > max {
                return Err(invalid(format!("{} step must be between 1 and {}", field, max)));
            }
            return Ok(CronField::Every(step));
        }

        let value: u32 = raw
            .parse()
            .map_err(|_| invalid(format!("unsupported {} field '{}'", field, raw)))?;
        if value > max {
            return Err(invalid(format!("{} must be between 0 and {}", field, max)));
        }
        Ok(CronField::At(value))
    }

    fn matches(&self, value: u32) -> bool {
        match self {
            CronField::Any => true,
            CronField::At(v) => *v == value,
            CronField::Every(step) => value % step == 0,
        }
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CronField::Any => f.write_str("*"),
            CronField::At(v) => write!(f, "{}", v),
            CronField::Every(step) => write!(f, "*/{}", step),
        }
    }
}

/// crontab 風格的觸發條件，只支援分與時兩個欄位（UTC）
///
/// 日、月、星期欄位必須是 `*`。每個合法的觸發條件在任意 24 小時內至少觸發一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    minute: CronField,
    hour: CronField,
}

impl Trigger {
    /// 每天 hour:minute
    pub fn daily_at(hour: u32, minute: u32) -> Result<Self> {
        format!("{} {} * * *", minute, hour).parse()
    }

    /// 每 hours 小時的整點
    pub fn every_hours(hours: u32) -> Result<Self> {
        format!("0 */{} * * *", hours).parse()
    }

    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        self.minute.matches(at.minute()) && self.hour.matches(at.hour())
    }

    /// 嚴格晚於 `after` 的下一次觸發時間
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let floor = after
            .with_nanosecond(0)
            .and_then(|t| t.with_second(0))
            .unwrap_or(after);
        let mut candidate = floor + TimeDelta::minutes(1);
        while !self.matches(candidate) {
            candidate += TimeDelta::minutes(1);
        }
        candidate
    }

    pub fn describe(&self) -> String {
        match (self.minute, self.hour) {
            (CronField::At(m), CronField::At(h)) => format!("daily at {:02}:{:02}", h, m),
            (CronField::At(0), CronField::Every(1)) => "every hour".to_string(),
            (CronField::At(0), CronField::Every(n)) => format!("every {} hours", n),
            (CronField::At(m), CronField::Every(n)) => {
                format!("every {} hours at minute {}", n, m)
            }
            (CronField::At(m), CronField::Any) => format!("hourly at minute {}", m),
            (CronField::Every(n), CronField::Any) => format!("every {} minutes", n),
            (CronField::Any, CronField::Any) => "every minute".to_string(),
            _ => self.to_string(),
        }
    }
}

impl FromStr for Trigger {
    type Err = ApiError;

    fn from_str(expression: &str) -> Result<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ApiError::InvalidTrigger {
                expression: expression.to_string(),
                reason: format!("expected 5 fields, found {}", fields.len()),
            });
        }

        if let Some(field) = fields[2..].iter().find(|f| **f != "*") {
            return Err(ApiError::InvalidTrigger {
                expression: expression.to_string(),
                reason: format!("day, month and weekday fields must be '*', found '{}'", field),
            });
        }

        Ok(Self {
            minute: CronField::parse(fields[0], 59, "minute", expression)?,
            hour: CronField::parse(fields[1], 23, "hour", expression)?,
        })
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} * * *", self.minute, self.hour)
    }
}

impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, m, s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let trigger: Trigger = "0 */6 * * *".parse().unwrap();
        assert_eq!(trigger.to_string(), "0 */6 * * *");
        assert_eq!(trigger.describe(), "every 6 hours");

        let daily: Trigger = "0 0 * * *".parse().unwrap();
        assert_eq!(daily.describe(), "daily at 00:00");
        assert_eq!(Trigger::daily_at(0, 0).unwrap(), daily);
        assert_eq!(Trigger::every_hours(6).unwrap(), trigger);
    }

    #[test]
    fn test_parse_rejects_bad_expressions() {
        assert!("0 0 * *".parse::<Trigger>().is_err());
        assert!("0 0 1 * *".parse::<Trigger>().is_err());
        assert!("60 0 * * *".parse::<Trigger>().is_err());
        assert!("0 24 * * *".parse::<Trigger>().is_err());
        assert!("0 */0 * * *".parse::<Trigger>().is_err());
        assert!("0 a * * *".parse::<Trigger>().is_err());
    }

    #[test]
    fn test_daily_next_after() {
        let daily = Trigger::daily_at(0, 0).unwrap();
        let next = daily.next_after(at(13, 45, 12));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());
        // 剛好在觸發點時取下一次
        assert_eq!(
            daily.next_after(Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()),
            Utc.with_ymd_and_hms(2024, 3, 12, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_every_six_hours_next_after() {
        let trigger = Trigger::every_hours(6).unwrap();
        assert_eq!(trigger.next_after(at(0, 0, 0)), at(6, 0, 0));
        assert_eq!(trigger.next_after(at(5, 59, 59)), at(6, 0, 0));
        assert_eq!(trigger.next_after(at(13, 1, 0)), at(18, 0, 0));
        assert_eq!(
            trigger.next_after(at(18, 0, 30)),
            Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_serializes_as_expression() {
        let trigger = Trigger::every_hours(6).unwrap();
        assert_eq!(serde_json::to_value(trigger).unwrap(), "0 */6 * * *");
    }
}
