//! Open-probability aggregation over the event ledger.
//!
//! The aggregation functions are pure: they take the events and `now` and
//! recompute everything on each call. A bucket's probability is the share
//! of its events that record an open state; empty buckets are left out.
//!
//! # Windows
//!
//! | Aggregate | Window | Bucket |
//! |---|---|---|
//! | [`daily_change_stats`] | last 30 days | UTC calendar day |
//! | [`weekly_breakdown`] | last 90 days | weekday, weekday × hour (9–21) |

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};

use super::ledger::Ledger;
use crate::clock::Clock;
use crate::db::repository::RepositoryResult;
use crate::models::{DailyChangeStats, DailyStat, HourlyStat, StatsSummary, StatusEvent, WeeklyStat};

pub const DAILY_WINDOW_DAYS: i64 = 30;
pub const WEEKLY_WINDOW_DAYS: i64 = 90;
pub const FIRST_HOUR: u32 = 9;
pub const LAST_HOUR: u32 = 21;

/// Weekday names indexed from Sunday.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    open: u32,
    total: u32,
}

impl Tally {
    fn record(&mut self, is_open: bool) {
        self.total += 1;
        if is_open {
            self.open += 1;
        }
    }

    fn probability(&self) -> Option<f64> {
        (self.total > 0).then(|| f64::from(self.open) / f64::from(self.total))
    }
}

fn in_window<'a>(
    events: &'a [StatusEvent],
    now: DateTime<Utc>,
    days: i64,
) -> impl Iterator<Item = &'a StatusEvent> {
    let since = now - Duration::days(days);
    events
        .iter()
        .filter(move |e| e.timestamp >= since && e.timestamp <= now)
}

/// Per-day open probability over the trailing 30 days, ascending by date.
///
/// `total_changes` is passed through unchanged; it counts the whole ledger,
/// not just the window.
pub fn daily_change_stats(
    events: &[StatusEvent],
    total_changes: i64,
    now: DateTime<Utc>,
) -> DailyChangeStats {
    let mut days: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    for event in in_window(events, now, DAILY_WINDOW_DAYS) {
        days.entry(event.timestamp.date_naive())
            .or_default()
            .record(event.is_open);
    }

    let daily_stats = days
        .into_iter()
        .filter_map(|(date, tally)| {
            tally
                .probability()
                .map(|probability| DailyStat { date, probability })
        })
        .collect();

    DailyChangeStats {
        total_changes,
        daily_stats,
    }
}

/// Weekday × hour open probabilities over the trailing 90 days.
///
/// Weekdays run Sunday first and only appear when they have events. The
/// hourly list is restricted to 09–21 and may be empty for a weekday whose
/// events all fall outside those hours.
pub fn weekly_breakdown(events: &[StatusEvent], now: DateTime<Utc>) -> Vec<WeeklyStat> {
    let mut days = [Tally::default(); 7];
    let mut hours: BTreeMap<(usize, u32), Tally> = BTreeMap::new();

    for event in in_window(events, now, WEEKLY_WINDOW_DAYS) {
        let day = event.timestamp.weekday().num_days_from_sunday() as usize;
        let hour = event.timestamp.hour();
        days[day].record(event.is_open);
        if (FIRST_HOUR..=LAST_HOUR).contains(&hour) {
            hours.entry((day, hour)).or_default().record(event.is_open);
        }
    }

    days.iter()
        .enumerate()
        .filter_map(|(day, tally)| {
            let daily_probability = tally.probability()?;
            let hourly = hours
                .range((day, FIRST_HOUR)..=(day, LAST_HOUR))
                .filter_map(|(&(_, hour), t)| {
                    t.probability()
                        .map(|probability| HourlyStat { hour, probability })
                })
                .collect();
            Some(WeeklyStat {
                day: WEEKDAY_NAMES[day].to_string(),
                daily_probability,
                hourly,
            })
        })
        .collect()
}

/// Read side of the ledger: recomputes aggregates per call.
#[derive(Clone)]
pub struct StatisticsService {
    ledger: Ledger,
    clock: Arc<dyn Clock>,
}

impl StatisticsService {
    pub fn new(ledger: Ledger, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    pub async fn weekly_breakdown(&self) -> RepositoryResult<Vec<WeeklyStat>> {
        let now = self.clock.now();
        let events = self
            .ledger
            .events_since(now - Duration::days(WEEKLY_WINDOW_DAYS))
            .await?;
        Ok(weekly_breakdown(&events, now))
    }

    pub async fn daily_change_stats(&self) -> RepositoryResult<DailyChangeStats> {
        let now = self.clock.now();
        let total = self.ledger.count().await?;
        let events = self
            .ledger
            .events_since(now - Duration::days(DAILY_WINDOW_DAYS))
            .await?;
        Ok(daily_change_stats(&events, total, now))
    }

    /// Totals, latest change and the 30-day daily series in one document.
    pub async fn summary(&self) -> RepositoryResult<StatsSummary> {
        let latest = self.ledger.get_latest().await?;
        let daily = self.daily_change_stats().await?;
        Ok(StatsSummary {
            total_changes: daily.total_changes,
            last_change: latest.as_ref().map(|e| e.timestamp),
            current_state: latest.map(|e| e.is_open).unwrap_or(false),
            daily_changes: daily.daily_stats,
        })
    }
}
