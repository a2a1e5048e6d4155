use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use crate::clock::ManualClock;
use crate::db::repositories::LocalRepository;
use crate::models::{EventId, NewStatusEvent, StatusEvent};
use crate::services::ledger::Ledger;
use crate::services::statistics::{daily_change_stats, weekly_breakdown, StatisticsService};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn events(raw: &[(bool, DateTime<Utc>)]) -> Vec<StatusEvent> {
    raw.iter()
        .enumerate()
        .map(|(i, &(is_open, timestamp))| {
            NewStatusEvent::new(is_open, timestamp).with_id(EventId(i as i64 + 1))
        })
        .collect()
}

// 2024-06-03 is a Monday.
fn now() -> DateTime<Utc> {
    at(2024, 6, 10, 12, 0)
}

#[test]
fn test_weekly_breakdown_empty() {
    assert!(weekly_breakdown(&[], now()).is_empty());
}

#[test]
fn test_weekly_breakdown_monday_tuesday() {
    let evs = events(&[
        (true, at(2024, 6, 3, 10, 0)),
        (false, at(2024, 6, 3, 14, 0)),
        (true, at(2024, 6, 4, 11, 0)),
    ]);

    let weekly = weekly_breakdown(&evs, now());
    assert_eq!(weekly.len(), 2);

    assert_eq!(weekly[0].day, "Monday");
    assert_eq!(weekly[0].daily_probability, 0.5);
    let monday: Vec<_> = weekly[0].hourly.iter().map(|h| (h.hour, h.probability)).collect();
    assert_eq!(monday, vec![(10, 1.0), (14, 0.0)]);

    assert_eq!(weekly[1].day, "Tuesday");
    assert_eq!(weekly[1].daily_probability, 1.0);
    assert_eq!(weekly[1].hourly.len(), 1);
    assert_eq!(weekly[1].hourly[0].hour, 11);
    assert_eq!(weekly[1].hourly[0].probability, 1.0);
}

#[test]
fn test_weekly_breakdown_is_sunday_first() {
    let evs = events(&[
        (true, at(2024, 6, 8, 10, 0)), // Saturday
        (true, at(2024, 6, 9, 10, 0)), // Sunday
        (true, at(2024, 6, 5, 10, 0)), // Wednesday
    ]);

    let days: Vec<_> = weekly_breakdown(&evs, now()).into_iter().map(|w| w.day).collect();
    assert_eq!(days, vec!["Sunday", "Wednesday", "Saturday"]);
}

#[test]
fn test_hours_outside_range_only_count_daily() {
    let evs = events(&[
        (true, at(2024, 6, 3, 8, 59)),
        (false, at(2024, 6, 3, 22, 0)),
        (true, at(2024, 6, 3, 21, 30)),
    ]);

    let weekly = weekly_breakdown(&evs, now());
    assert_eq!(weekly.len(), 1);
    assert!((weekly[0].daily_probability - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(weekly[0].hourly.len(), 1);
    assert_eq!(weekly[0].hourly[0].hour, 21);
}

#[test]
fn test_weekday_with_only_night_events_has_empty_hourly() {
    let evs = events(&[(false, at(2024, 6, 4, 3, 0))]);

    let weekly = weekly_breakdown(&evs, now());
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].day, "Tuesday");
    assert_eq!(weekly[0].daily_probability, 0.0);
    assert!(weekly[0].hourly.is_empty());
}

#[test]
fn test_weekly_window_is_ninety_days() {
    let evs = events(&[
        (true, now() - Duration::days(91)),
        (false, now() - Duration::days(89)),
        (true, now() + Duration::minutes(1)),
    ]);

    let weekly = weekly_breakdown(&evs, now());
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly[0].daily_probability, 0.0);
}

#[test]
fn test_daily_change_stats_groups_by_day() {
    let evs = events(&[
        (true, at(2024, 6, 9, 9, 0)),
        (false, at(2024, 6, 9, 18, 0)),
        (true, at(2024, 6, 9, 20, 0)),
        (true, at(2024, 6, 1, 10, 0)),
        (false, now() - Duration::days(31)),
    ]);

    let stats = daily_change_stats(&evs, 42, now());
    assert_eq!(stats.total_changes, 42);

    let days: Vec<_> = stats.daily_stats.iter().map(|d| d.date).collect();
    assert_eq!(
        days,
        vec![
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
        ]
    );
    assert_eq!(stats.daily_stats[0].probability, 1.0);
    assert!((stats.daily_stats[1].probability - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_daily_change_stats_empty() {
    let stats = daily_change_stats(&[], 0, now());
    assert_eq!(stats.total_changes, 0);
    assert!(stats.daily_stats.is_empty());
}

#[tokio::test]
async fn test_service_summary() {
    let repo = LocalRepository::new();
    repo.insert_events([
        NewStatusEvent::new(true, now() - Duration::days(200)),
        NewStatusEvent::new(true, at(2024, 6, 3, 10, 0)),
        NewStatusEvent::new(false, at(2024, 6, 3, 14, 0)),
    ]);
    let clock = ManualClock::new(now());
    let stats = StatisticsService::new(Ledger::new(Arc::new(repo)), Arc::new(clock));

    let summary = stats.summary().await.unwrap();
    assert_eq!(summary.total_changes, 3);
    assert_eq!(summary.last_change, Some(at(2024, 6, 3, 14, 0)));
    assert!(!summary.current_state);
    assert_eq!(summary.daily_changes.len(), 1);
    assert_eq!(summary.daily_changes[0].probability, 0.5);

    let weekly = stats.weekly_breakdown().await.unwrap();
    assert_eq!(weekly.len(), 1);
    assert_eq!(weekly, stats.weekly_breakdown().await.unwrap());
}

#[tokio::test]
async fn test_service_summary_empty_ledger() {
    let clock = ManualClock::new(now());
    let stats = StatisticsService::new(
        Ledger::new(Arc::new(LocalRepository::new())),
        Arc::new(clock),
    );

    let summary = stats.summary().await.unwrap();
    assert_eq!(summary.total_changes, 0);
    assert!(summary.last_change.is_none());
    assert!(!summary.current_state);
}

fn arb_events() -> impl Strategy<Value = Vec<StatusEvent>> {
    // Offsets up to 120 days before now, in minutes.
    prop::collection::vec((any::<bool>(), 0i64..(120 * 24 * 60)), 0..200).prop_map(|raw| {
        let raw: Vec<_> = raw
            .into_iter()
            .map(|(open, mins)| (open, now() - Duration::minutes(mins)))
            .collect();
        events(&raw)
    })
}

proptest! {
    #[test]
    fn prop_weekly_breakdown_bounds(evs in arb_events()) {
        let weekly = weekly_breakdown(&evs, now());
        prop_assert!(weekly.len() <= 7);
        for day in &weekly {
            prop_assert!((0.0..=1.0).contains(&day.daily_probability));
            let mut last = None;
            for h in &day.hourly {
                prop_assert!((9..=21).contains(&h.hour));
                prop_assert!((0.0..=1.0).contains(&h.probability));
                prop_assert!(last.map_or(true, |l| l < h.hour));
                last = Some(h.hour);
            }
        }
        prop_assert_eq!(weekly.clone(), weekly_breakdown(&evs, now()));
    }

    #[test]
    fn prop_daily_stats_ascending_and_bounded(evs in arb_events()) {
        let stats = daily_change_stats(&evs, evs.len() as i64, now());
        prop_assert!(stats.daily_stats.len() <= 31);
        for pair in stats.daily_stats.windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
        }
        for d in &stats.daily_stats {
            prop_assert!((0.0..=1.0).contains(&d.probability));
        }
    }

    #[test]
    fn prop_single_day_probability_is_open_share(opens in prop::collection::vec(any::<bool>(), 1..50)) {
        let raw: Vec<_> = opens
            .iter()
            .enumerate()
            .map(|(i, &o)| (o, at(2024, 6, 9, 9, 0) + Duration::minutes(i as i64)))
            .collect();
        let stats = daily_change_stats(&events(&raw), raw.len() as i64, now());
        let expected = opens.iter().filter(|&&o| o).count() as f64 / opens.len() as f64;
        prop_assert_eq!(stats.daily_stats.len(), 1);
        prop_assert_eq!(stats.daily_stats[0].probability, expected);
    }
}
