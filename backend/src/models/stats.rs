//! Derived statistics returned by the statistics engine.
//!
//! None of these types are persisted; they are recomputed from the ledger on
//! every request.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Open-fraction for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStat {
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub probability: f64,
}

/// Open-fraction for one hour of one weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyStat {
    #[serde(with = "two_digit_hour")]
    pub hour: u32,
    pub probability: f64,
}

/// One row of the weekly heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStat {
    /// English weekday name, e.g. `Monday`.
    pub day: String,
    pub daily_probability: f64,
    /// Hours 9..=21 with at least one observation, ascending.
    pub hourly: Vec<HourlyStat>,
}

/// Output of `DailyChangeStats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChangeStats {
    /// Row count of the whole ledger.
    pub total_changes: i64,
    /// Trailing window, ascending by date, days without events omitted.
    pub daily_stats: Vec<DailyStat>,
}

/// Summary document served by `GET /stats/summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_changes: i64,
    pub last_change: Option<DateTime<Utc>>,
    pub current_state: bool,
    pub daily_changes: Vec<DailyStat>,
}

/// Hours go over the wire as zero-padded strings (`"09"`), matching the
/// dashboard's expectations.
mod two_digit_hour {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hour: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:02}", hour))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let hour: u32 = raw.parse().map_err(de::Error::custom)?;
        if hour > 23 {
            return Err(de::Error::custom(format!("hour out of range: {}", hour)));
        }
        Ok(hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekly_stat_wire_shape() {
        let stat = WeeklyStat {
            day: "Monday".to_string(),
            daily_probability: 0.5,
            hourly: vec![HourlyStat {
                hour: 9,
                probability: 1.0,
            }],
        };

        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(json["day"], "Monday");
        assert_eq!(json["dailyProbability"], 0.5);
        assert_eq!(json["hourly"][0]["hour"], "09");
        assert_eq!(json["hourly"][0]["probability"], 1.0);

        let back: WeeklyStat = serde_json::from_value(json).unwrap();
        assert_eq!(back, stat);
    }

    #[test]
    fn test_hour_out_of_range_rejected() {
        let result: Result<HourlyStat, _> =
            serde_json::from_str(r#"{"hour":"24","probability":0.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_daily_stat_date_format() {
        let stat = DailyStat {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            probability: 0.25,
        };
        let json = serde_json::to_string(&stat).unwrap();
        assert_eq!(json, r#"{"date":"2024-01-02","probability":0.25}"#);
    }
}
