//! Forecast aggregation
//!
//! Transforms the flat, not-necessarily-sorted list of raw forecast entries
//! into the two derived views consumers render: an hourly view restricted to
//! the 24 hours after `now`, and a daily view grouped by calendar day with
//! per-day min/max temperatures and a representative icon.
//!
//! Day boundaries use the UTC calendar so results are reproducible across
//! environments. `now` is always passed explicitly; aggregation never reads
//! the system clock, which keeps it idempotent for a fixed input.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::classify::icon_for;
use crate::data::{DailySample, HourlySample, RawForecastEntry};

/// The derived hourly and daily forecast views
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastBundle {
    /// Samples within 24 h of `now`, ascending by timestamp
    pub hourly: Vec<HourlySample>,
    /// One entry per calendar day covered by the input, ascending by date
    pub daily: Vec<DailySample>,
}

/// Aggregates raw forecast entries into hourly and daily views
///
/// # Arguments
/// * `entries` - Raw forecast feed entries, in any order
/// * `now` - The reference instant for the 24 h hourly window
///
/// # Returns
/// A `ForecastBundle`; empty input yields empty views, never an error.
/// The daily view is not capped here — trimming to a display horizon is a
/// presentation concern.
pub fn aggregate(entries: &[RawForecastEntry], now: DateTime<Utc>) -> ForecastBundle {
    ForecastBundle {
        hourly: hourly_view(entries, now),
        daily: daily_view(entries),
    }
}

/// Builds the hourly view: entries up to 24 h past `now`, sorted ascending
fn hourly_view(entries: &[RawForecastEntry], now: DateTime<Utc>) -> Vec<HourlySample> {
    let window_end = now + Duration::hours(24);

    let mut samples: Vec<HourlySample> = entries
        .iter()
        .filter(|e| e.timestamp <= window_end)
        .map(|e| HourlySample {
            timestamp: e.timestamp,
            temperature: e.temperature,
            icon: icon_for(&e.condition).to_string(),
        })
        .collect();

    samples.sort_by_key(|s| s.timestamp);
    samples
}

/// Builds the daily view: per-UTC-day min/max with a representative icon
///
/// The representative icon comes from the sample with the day's highest
/// temperature; when several samples tie, the earliest one wins.
fn daily_view(entries: &[RawForecastEntry]) -> Vec<DailySample> {
    // BTreeMap keeps the days in ascending date order
    let mut days: BTreeMap<NaiveDate, Vec<&RawForecastEntry>> = BTreeMap::new();
    for entry in entries {
        days.entry(entry.timestamp.date_naive())
            .or_default()
            .push(entry);
    }

    days.into_iter()
        .map(|(date, mut group)| {
            group.sort_by_key(|e| e.timestamp);

            let mut high = f64::NEG_INFINITY;
            let mut low = f64::INFINITY;
            let mut hottest = group[0];
            for &entry in &group {
                if entry.temperature > high {
                    high = entry.temperature;
                    hottest = entry;
                }
                if entry.temperature < low {
                    low = entry.temperature;
                }
            }

            DailySample {
                date,
                high_temp: high,
                low_temp: low,
                icon: icon_for(&hottest.condition).to_string(),
            }
        })
        .collect()
}
