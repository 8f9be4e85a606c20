//! Joins a fetched rate series with a fund's purchase dates.
//!
//! Every purchase day is valued with the most recently known rate and compared
//! against the latest rate of the series ("gain if sold today").

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use crate::dates::format_day;
use crate::provider::RatePoint;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DayRecord {
    pub rate: Option<f64>,
    pub purchase_rate: Option<f64>,
    pub purchase_gain_percent: Option<f64>,
}

impl DayRecord {
    pub fn is_purchase(&self) -> bool {
        self.purchase_rate.is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FundReport {
    pub latest_rate: f64,
    pub days: BTreeMap<String, DayRecord>,
}

impl FundReport {
    /// Largest purchase gain, 0 without any valued purchase.
    pub fn best_gain(&self) -> f64 {
        self.days
            .values()
            .filter_map(|day| day.purchase_gain_percent)
            .fold(0.0, f64::max)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `latest / purchase_rate` as a percentage, 0 when there is nothing to divide by.
pub fn gain_percent(latest_rate: f64, purchase_rate: Option<f64>) -> f64 {
    match purchase_rate {
        Some(rate) if rate != 0.0 => round2(latest_rate / rate * 100.0),
        _ => 0.0,
    }
}

/// Rate of the newest point, or of the newest point that has one.
pub fn latest_rate(series: &[RatePoint]) -> Option<f64> {
    series.iter().rev().find_map(|point| point.rate)
}

/// Day string to rate for every point newer than `cutoff_secs`.
pub fn rate_history(
    series: &[RatePoint],
    cutoff_secs: i64,
) -> Result<BTreeMap<String, Option<f64>>> {
    let mut history = BTreeMap::new();
    for point in series {
        if point.timestamp_ms > cutoff_secs * 1000 {
            let day = format_day(point.timestamp_ms.div_euclid(1000))?;
            history.insert(day, point.rate);
        }
    }
    Ok(history)
}

pub fn add_purchase_days(
    history: &mut BTreeMap<String, Option<f64>>,
    purchases: &BTreeSet<String>,
) {
    for day in purchases {
        history.entry(day.clone()).or_insert(None);
    }
}

/// Values every purchase day with the rate known at that point of the walk.
///
/// The cursor is refreshed by a purchase day's own rate, then replaced by the
/// raw rate of each visited day, so a day without a rate clears it.
pub fn carry_forward(
    history: &BTreeMap<String, Option<f64>>,
    purchases: &BTreeSet<String>,
    latest_rate: f64,
) -> BTreeMap<String, DayRecord> {
    let mut cursor: Option<f64> = None;
    let mut days = BTreeMap::new();

    for (day, rate) in history {
        let mut record = DayRecord {
            rate: *rate,
            ..Default::default()
        };

        if purchases.contains(day) {
            // a zero quote counts as no quote here and keeps the carried rate
            if let Some(rate) = rate.filter(|r| *r != 0.0) {
                cursor = Some(rate);
            }
            record.purchase_rate = cursor;
            record.purchase_gain_percent = cursor.map(|r| gain_percent(latest_rate, Some(r)));
        }

        days.insert(day.clone(), record);
        cursor = *rate;
    }

    days
}

pub fn reconcile(
    mut series: Vec<RatePoint>,
    cutoff_secs: i64,
    purchases: &BTreeSet<String>,
) -> Result<FundReport> {
    series.sort_by_key(|point| point.timestamp_ms);

    let latest_rate = latest_rate(&series).context("Rate series has no rate at all")?;

    let mut history = rate_history(&series, cutoff_secs)?;
    add_purchase_days(&mut history, purchases);
    let days = carry_forward(&history, purchases, latest_rate);

    Ok(FundReport { latest_rate, days })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 86_400_000;
    // 2020.01.01 00:00 UTC
    const JAN_1: i64 = 1_577_836_800_000;

    fn purchases(days: &[&str]) -> BTreeSet<String> {
        days.iter().map(|d| d.to_string()).collect()
    }

    fn history(entries: &[(&str, Option<f64>)]) -> BTreeMap<String, Option<f64>> {
        entries.iter().map(|(d, r)| (d.to_string(), *r)).collect()
    }

    #[test]
    fn test_gain_percent() {
        assert_eq!(gain_percent(1.2, Some(1.0)), 120.0);
        assert_eq!(gain_percent(1.0, Some(3.0)), 33.33);
        assert_eq!(gain_percent(1.2, Some(0.0)), 0.0);
        assert_eq!(gain_percent(1.2, None), 0.0);
    }

    #[test]
    fn test_latest_rate() {
        let series = vec![
            RatePoint::new(JAN_1, Some(1.0)),
            RatePoint::new(JAN_1 + DAY_MS, Some(1.1)),
        ];
        assert_eq!(latest_rate(&series), Some(1.1));

        let series = vec![
            RatePoint::new(JAN_1, Some(1.0)),
            RatePoint::new(JAN_1 + DAY_MS, None),
        ];
        assert_eq!(latest_rate(&series), Some(1.0));
        assert_eq!(latest_rate(&[]), None);
    }

    #[test]
    fn test_carry_over_missing_day() {
        let history = history(&[
            ("2020.01.01", Some(1.0)),
            ("2020.01.02", None),
            ("2020.01.03", Some(1.2)),
        ]);
        let days = carry_forward(&history, &purchases(&["2020.01.02"]), 1.2);

        let purchase = days["2020.01.02"];
        assert_eq!(purchase.rate, None);
        assert_eq!(purchase.purchase_rate, Some(1.0));
        assert_eq!(purchase.purchase_gain_percent, Some(120.0));

        assert!(!days["2020.01.01"].is_purchase());
        assert!(!days["2020.01.03"].is_purchase());
        assert_eq!(days["2020.01.03"].rate, Some(1.2));
    }

    #[test]
    fn test_purchase_day_with_own_rate() {
        let history = history(&[("2020.01.01", Some(1.0)), ("2020.01.02", Some(1.1))]);
        let days = carry_forward(&history, &purchases(&["2020.01.02"]), 1.21);
        assert_eq!(days["2020.01.02"].purchase_rate, Some(1.1));
        assert_eq!(days["2020.01.02"].purchase_gain_percent, Some(110.0));
    }

    #[test]
    fn test_null_day_clears_cursor() {
        // the cursor only reaches back one visited day
        let history = history(&[
            ("2020.01.01", Some(1.0)),
            ("2020.01.02", None),
            ("2020.01.03", None),
            ("2020.01.04", Some(1.5)),
        ]);
        let days = carry_forward(&history, &purchases(&["2020.01.02", "2020.01.03"]), 1.5);
        assert_eq!(days["2020.01.02"].purchase_rate, Some(1.0));
        assert_eq!(days["2020.01.03"].purchase_rate, None);
        assert_eq!(days["2020.01.03"].purchase_gain_percent, None);
    }

    #[test]
    fn test_zero_rate_purchase_keeps_previous_cursor() {
        let history = history(&[("2020.01.01", Some(2.0)), ("2020.01.02", Some(0.0))]);
        let days = carry_forward(&history, &purchases(&["2020.01.02"]), 3.0);
        assert_eq!(days["2020.01.02"].purchase_rate, Some(2.0));
        assert_eq!(days["2020.01.02"].purchase_gain_percent, Some(150.0));

        // a zero carried in from the day before yields a zero gain
        let history = self::history(&[("2020.01.01", Some(0.0)), ("2020.01.02", None)]);
        let days = carry_forward(&history, &purchases(&["2020.01.02"]), 3.0);
        assert_eq!(days["2020.01.02"].purchase_rate, Some(0.0));
        assert_eq!(days["2020.01.02"].purchase_gain_percent, Some(0.0));
    }

    #[test]
    fn test_purchase_before_any_rate() {
        let history = history(&[("2019.12.01", None), ("2020.01.01", Some(1.0))]);
        let days = carry_forward(&history, &purchases(&["2019.12.01"]), 1.0);
        assert_eq!(days["2019.12.01"].purchase_rate, None);
        assert_eq!(days["2019.12.01"].purchase_gain_percent, None);
    }

    #[test]
    fn test_rate_history_cutoff_and_duplicates() {
        let cutoff = JAN_1 / 1000;
        let series = vec![
            RatePoint::new(JAN_1 - DAY_MS, Some(0.9)),
            RatePoint::new(JAN_1, Some(1.0)),
            RatePoint::new(JAN_1 + DAY_MS, Some(1.1)),
            RatePoint::new(JAN_1 + DAY_MS + 3_600_000, Some(1.15)),
        ];
        let history = rate_history(&series, cutoff).unwrap();
        assert_eq!(history, self::history(&[("2020.01.02", Some(1.15))]));
    }

    #[test]
    fn test_reconcile() {
        let series = vec![
            RatePoint::new(JAN_1 + 2 * DAY_MS, Some(1.2)),
            RatePoint::new(JAN_1, Some(1.0)),
        ];
        let report = reconcile(
            series,
            JAN_1 / 1000 - 10 * 86400,
            &purchases(&["2020.01.02", "2019.11.01"]),
        )
        .unwrap();

        assert_eq!(report.latest_rate, 1.2);
        assert_eq!(
            report.days.keys().collect::<Vec<_>>(),
            vec!["2019.11.01", "2020.01.01", "2020.01.02", "2020.01.03"]
        );
        assert_eq!(report.days["2020.01.02"].purchase_gain_percent, Some(120.0));
        assert_eq!(report.days["2019.11.01"].purchase_rate, None);
        assert_eq!(report.best_gain(), 120.0);
    }

    #[test]
    fn test_reconcile_unsorted_matches_sorted() {
        let sorted = vec![
            RatePoint::new(JAN_1, Some(1.0)),
            RatePoint::new(JAN_1 + DAY_MS, Some(1.3)),
            RatePoint::new(JAN_1 + 3 * DAY_MS, Some(1.1)),
        ];
        let mut unsorted = sorted.clone();
        unsorted.reverse();
        let buys = purchases(&["2020.01.03"]);

        let a = reconcile(sorted, 0, &buys).unwrap();
        let b = reconcile(unsorted, 0, &buys).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.latest_rate, 1.1);
        assert_eq!(a.days["2020.01.03"].purchase_rate, Some(1.3));
    }

    #[test]
    fn test_reconcile_without_rates() {
        let series = vec![RatePoint::new(JAN_1, None)];
        assert!(reconcile(series, 0, &purchases(&[])).is_err());
        assert!(reconcile(vec![], 0, &purchases(&[])).is_err());
    }
}
