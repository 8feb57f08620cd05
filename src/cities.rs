//! User-curated saved city list
//!
//! An ordered collection of `SavedCity` records, deduplicated by id,
//! persisted through the disk store on every mutation and loaded at
//! startup. Insertion order is preserved; it is the order the user
//! added cities in.

use tracing::warn;

use crate::cache::DiskStore;
use crate::data::SavedCity;

/// Store key under which the city list is persisted
const CITIES_STORE_KEY: &str = "saved_cities";

/// The saved-city list with optional persistence
#[derive(Debug, Default)]
pub struct SavedCities {
    cities: Vec<SavedCity>,
    store: Option<DiskStore>,
}

impl SavedCities {
    /// Creates an empty, non-persisted list (used in tests)
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the list from the store, starting empty if nothing is persisted
    pub fn load(store: DiskStore) -> Self {
        let cities = store
            .read::<Vec<SavedCity>>(CITIES_STORE_KEY)
            .map(|record| record.data)
            .unwrap_or_default();
        Self {
            cities,
            store: Some(store),
        }
    }

    /// Adds a city to the end of the list
    ///
    /// # Returns
    /// `true` if the city was added, `false` if an entry with the same id
    /// already exists (the list is left untouched).
    pub fn add(&mut self, city: SavedCity) -> bool {
        if self.cities.iter().any(|c| c.id == city.id) {
            return false;
        }
        self.cities.push(city);
        self.persist();
        true
    }

    /// Removes the city with the given id
    ///
    /// # Returns
    /// `true` if a city was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.cities.len();
        self.cities.retain(|c| c.id != id);
        let removed = self.cities.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// The cities in insertion order
    pub fn list(&self) -> &[SavedCity] {
        &self.cities
    }

    /// Number of saved cities
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    fn persist(&self) {
        if let Some(ref store) = self.store {
            // The list never goes stale; losing a write is tolerable, losing
            // the in-memory list is not
            if let Err(e) = store.write(CITIES_STORE_KEY, &self.cities, None) {
                warn!("failed to persist saved cities: {}", e);
            }
        }
    }
}
