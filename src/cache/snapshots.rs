//! In-memory keyed snapshot cache
//!
//! Holds exactly one `WeatherSnapshot` per `CityKey` with upsert-by-key
//! semantics: a re-fetch for an existing key overwrites fields in place
//! rather than creating a duplicate entry. The cache is owned exclusively
//! by the engine task, which serializes all mutation; it is deliberately
//! not `Sync`-shared.

use std::collections::HashMap;

use chrono::Utc;

use crate::data::{CityKey, SnapshotPatch, WeatherSnapshot};

/// Keyed store for reconciled weather snapshots
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: HashMap<CityKey, WeatherSnapshot>,
}

impl SnapshotCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a patch into the entry for `key`, creating it if absent
    ///
    /// Only fields present in the patch are overwritten; a fresh entry gets
    /// defaults for everything the patch omits (temperature 0, empty
    /// forecasts, "Unknown" condition). `fetched_at` is refreshed on every
    /// upsert.
    ///
    /// # Returns
    /// A reference to the merged snapshot.
    pub fn upsert(&mut self, key: &CityKey, patch: SnapshotPatch) -> &WeatherSnapshot {
        let snap = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| WeatherSnapshot::empty(key.clone()));

        if let Some(city) = patch.city {
            snap.city = city;
        }
        if let Some(v) = patch.temperature {
            snap.temperature = v;
        }
        if let Some(v) = patch.high_temp {
            snap.high_temp = v;
        }
        if let Some(v) = patch.low_temp {
            snap.low_temp = v;
        }
        if let Some(v) = patch.condition {
            snap.condition = v;
        }
        if let Some(v) = patch.condition_description {
            snap.condition_description = v;
        }
        if let Some(v) = patch.humidity {
            snap.humidity = v;
        }
        if let Some(v) = patch.wind_speed {
            snap.wind_speed = v;
        }
        if let Some(v) = patch.pressure {
            snap.pressure = Some(v);
        }
        if let Some(v) = patch.feels_like {
            snap.feels_like = Some(v);
        }
        if let Some(v) = patch.sunrise {
            snap.sunrise = Some(v);
        }
        if let Some(v) = patch.sunset {
            snap.sunset = Some(v);
        }
        if let Some(v) = patch.latitude {
            snap.latitude = v;
        }
        if let Some(v) = patch.longitude {
            snap.longitude = v;
        }
        if let Some(v) = patch.hourly {
            snap.hourly = v;
        }
        if let Some(v) = patch.daily {
            snap.daily = v;
        }
        snap.fetched_at = Utc::now();

        snap
    }

    /// Inserts a fully-formed snapshot, replacing any existing entry
    ///
    /// Used when restoring persisted state at startup.
    pub fn insert(&mut self, snapshot: WeatherSnapshot) {
        self.entries.insert(snapshot.key.clone(), snapshot);
    }

    /// Looks up the snapshot for a key
    pub fn get(&self, key: &CityKey) -> Option<&WeatherSnapshot> {
        self.entries.get(key)
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DailySample, HourlySample};
    use chrono::NaiveDate;

    fn london() -> CityKey {
        CityKey::from_city("London")
    }

    #[test]
    fn test_upsert_creates_entry_with_defaults() {
        let mut cache = SnapshotCache::new();
        let patch = SnapshotPatch {
            temperature: Some(15.0),
            ..Default::default()
        };

        let snap = cache.upsert(&london(), patch);

        assert!((snap.temperature - 15.0).abs() < 0.01);
        assert_eq!(snap.condition, "Unknown");
        assert!(snap.hourly.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_upsert_same_key_does_not_duplicate() {
        let mut cache = SnapshotCache::new();
        cache.upsert(&london(), SnapshotPatch::default());
        cache.upsert(&CityKey::from_city(" LONDON "), SnapshotPatch::default());

        assert_eq!(cache.len(), 1, "normalized keys must collapse to one entry");
    }

    #[test]
    fn test_disjoint_patches_union_fields() {
        let mut cache = SnapshotCache::new();

        cache.upsert(
            &london(),
            SnapshotPatch {
                temperature: Some(15.0),
                condition: Some("Clouds".to_string()),
                ..Default::default()
            },
        );
        cache.upsert(
            &london(),
            SnapshotPatch {
                humidity: Some(80),
                wind_speed: Some(4.2),
                ..Default::default()
            },
        );

        let snap = cache.get(&london()).expect("entry must exist");
        assert!((snap.temperature - 15.0).abs() < 0.01, "field must not regress");
        assert_eq!(snap.condition, "Clouds");
        assert_eq!(snap.humidity, 80);
        assert!((snap.wind_speed - 4.2).abs() < 0.01);
    }

    #[test]
    fn test_forecast_patch_preserves_conditions() {
        let mut cache = SnapshotCache::new();
        cache.upsert(
            &london(),
            SnapshotPatch {
                temperature: Some(15.0),
                condition: Some("Clouds".to_string()),
                ..Default::default()
            },
        );

        let hourly = vec![HourlySample {
            timestamp: Utc::now(),
            temperature: 14.0,
            icon: "cloud".to_string(),
        }];
        let daily = vec![DailySample {
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            high_temp: 16.0,
            low_temp: 11.0,
            icon: "cloud".to_string(),
        }];
        cache.upsert(&london(), SnapshotPatch::from_forecast(hourly, daily));

        let snap = cache.get(&london()).expect("entry must exist");
        assert!((snap.temperature - 15.0).abs() < 0.01);
        assert_eq!(snap.condition, "Clouds");
        assert_eq!(snap.hourly.len(), 1);
        assert_eq!(snap.daily.len(), 1);
    }

    #[test]
    fn test_get_missing_key() {
        let cache = SnapshotCache::new();
        assert!(cache.get(&CityKey::from_city("Nowhere")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_replaces_wholesale() {
        let mut cache = SnapshotCache::new();
        cache.upsert(
            &london(),
            SnapshotPatch {
                temperature: Some(15.0),
                ..Default::default()
            },
        );

        let mut restored = WeatherSnapshot::empty(london());
        restored.temperature = 3.0;
        cache.insert(restored);

        let snap = cache.get(&london()).expect("entry must exist");
        assert!((snap.temperature - 3.0).abs() < 0.01);
        assert_eq!(cache.len(), 1);
    }
}
