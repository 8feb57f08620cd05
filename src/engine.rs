//! Weather fetch engine
//!
//! A single task owns the snapshot cache and all per-key fetch state;
//! callers talk to it through a cloneable handle over an mpsc channel and
//! observe results on a watch channel. Network fetches run on spawned
//! tasks that report back over the same command channel, so every mutation
//! of shared state happens on the engine task.
//!
//! Per key, a fetch cycle walks `FetchingCurrent -> FetchingForecast ->
//! Ready`, dropping to `Failed` on error. The forecast leg is only ever
//! issued after the current-conditions leg succeeded in the same cycle.
//! Duplicate requests for a key that is already fetching are coalesced,
//! and completions of superseded cycles are discarded by generation check.
//! Failures never evict previously cached data; stale data beats a blank
//! screen.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::aggregate::aggregate;
use crate::cache::{DiskStore, SnapshotCache};
use crate::data::{
    CityKey, CurrentConditions, LocationEvent, RawForecastEntry, SnapshotPatch, WeatherApi,
    WeatherError, WeatherSnapshot,
};

/// Store key for the most recently completed snapshot
const LAST_SNAPSHOT_KEY: &str = "last_snapshot";

/// Freshness horizon for persisted snapshots
const SNAPSHOT_TTL_HOURS: u64 = 1;

/// Command channel depth
const COMMAND_BUFFER: usize = 32;

/// A weather request target, before key resolution by the provider
#[derive(Debug, Clone)]
pub enum Query {
    /// Fetch by city name
    City(String),
    /// Fetch by coordinate pair
    Coords { lat: f64, lon: f64 },
}

impl Query {
    /// The cache key under which this query's fetch cycle is tracked
    fn key(&self) -> CityKey {
        match self {
            Self::City(name) => CityKey::from_city(name),
            Self::Coords { lat, lon } => CityKey::from_coords(*lat, *lon),
        }
    }
}

/// Phase of a fetch cycle for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPhase {
    FetchingCurrent,
    FetchingForecast,
    Ready,
    Failed,
}

impl FetchPhase {
    fn is_in_flight(self) -> bool {
        matches!(self, Self::FetchingCurrent | Self::FetchingForecast)
    }
}

/// Per-key fetch bookkeeping
#[derive(Debug)]
struct FetchSlot {
    /// Generation of the cycle this slot tracks; completions from older
    /// cycles are discarded
    generation: u64,
    phase: FetchPhase,
    /// Canonical key resolved from the provider response, once known
    canonical: Option<CityKey>,
}

/// Messages processed by the engine task
enum Command {
    Request(Query),
    Location(LocationEvent),
    CurrentDone {
        query_key: CityKey,
        generation: u64,
        result: Result<CurrentConditions, WeatherError>,
    },
    ForecastDone {
        query_key: CityKey,
        generation: u64,
        result: Result<Vec<RawForecastEntry>, WeatherError>,
    },
    Shutdown,
}

/// Observable engine state consumed by the presentation layer
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    /// Whether a fetch cycle for the active key is outstanding
    pub loading: bool,
    /// Most recent error, cleared by the next successful leg; last wins
    pub error: Option<String>,
    /// Snapshot for the active key, possibly stale
    pub current: Option<WeatherSnapshot>,
    /// Whether the active snapshot's forecast views come from a completed
    /// forecast leg
    pub forecast_loaded: bool,
}

/// Handle for sending requests to the engine and observing its state
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
    state: watch::Receiver<EngineState>,
}

impl EngineHandle {
    /// Spawns an engine without persistence
    pub fn spawn(api: Arc<dyn WeatherApi>) -> Self {
        Self::spawn_with_store(api, None)
    }

    /// Spawns an engine, restoring the last persisted snapshot if a store
    /// is given
    pub fn spawn_with_store(api: Arc<dyn WeatherApi>, store: Option<DiskStore>) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);

        let mut cache = SnapshotCache::new();
        let mut active_key = None;
        if let Some(ref store) = store {
            // Stale data is fine here; it beats an empty screen at startup
            if let Some(record) = store.read::<WeatherSnapshot>(LAST_SNAPSHOT_KEY) {
                debug!(city = %record.data.city, stale = record.is_stale, "restored last snapshot");
                active_key = Some(record.data.key.clone());
                cache.insert(record.data);
            }
        }

        let initial = EngineState {
            loading: false,
            error: None,
            current: active_key.as_ref().and_then(|k| cache.get(k).cloned()),
            forecast_loaded: active_key
                .as_ref()
                .and_then(|k| cache.get(k))
                .map(|s| !s.daily.is_empty())
                .unwrap_or(false),
        };
        let (state_tx, state_rx) = watch::channel(initial);

        let engine = Engine {
            api,
            cache,
            slots: std::collections::HashMap::new(),
            active_key,
            next_generation: 0,
            error: None,
            tx: tx.clone(),
            state_tx,
            store,
        };
        tokio::spawn(engine.run(rx));

        Self {
            tx,
            state: state_rx,
        }
    }

    /// Requests weather for a city name
    pub async fn request_city(&self, city: &str) {
        let _ = self
            .tx
            .send(Command::Request(Query::City(city.to_string())))
            .await;
    }

    /// Requests weather for a coordinate pair
    pub async fn request_coords(&self, lat: f64, lon: f64) {
        let _ = self
            .tx
            .send(Command::Request(Query::Coords { lat, lon }))
            .await;
    }

    /// Feeds a location event into the engine
    pub async fn location_event(&self, event: LocationEvent) {
        let _ = self.tx.send(Command::Location(event)).await;
    }

    /// Returns a fresh receiver for observing engine state
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.clone()
    }

    /// Asks the engine task to stop
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }
}

/// Waits until the engine publishes a non-loading state
///
/// The receiver should be obtained via [`EngineHandle::subscribe`] before
/// the request is sent, so the request's own publishes are observed.
pub async fn settled(rx: &mut watch::Receiver<EngineState>) -> EngineState {
    loop {
        if rx.changed().await.is_err() {
            return rx.borrow().clone();
        }
        let state = rx.borrow_and_update().clone();
        if !state.loading {
            return state;
        }
    }
}

/// The engine task: sole owner of cache and fetch state
struct Engine {
    api: Arc<dyn WeatherApi>,
    cache: SnapshotCache,
    slots: std::collections::HashMap<CityKey, FetchSlot>,
    /// Key of the most recent request; its snapshot is the published one
    active_key: Option<CityKey>,
    next_generation: u64,
    error: Option<String>,
    /// Sender handed to spawned fetch tasks for reporting completions
    tx: mpsc::Sender<Command>,
    state_tx: watch::Sender<EngineState>,
    store: Option<DiskStore>,
}

impl Engine {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Request(query) => self.handle_request(query),
                Command::Location(event) => self.handle_location(event),
                Command::CurrentDone {
                    query_key,
                    generation,
                    result,
                } => self.handle_current_done(query_key, generation, result),
                Command::ForecastDone {
                    query_key,
                    generation,
                    result,
                } => self.handle_forecast_done(query_key, generation, result),
                Command::Shutdown => break,
            }
            self.publish();
        }
    }

    fn handle_request(&mut self, query: Query) {
        let key = query.key();
        self.active_key = Some(key.clone());

        if let Some(slot) = self.slots.get(&key) {
            if slot.phase.is_in_flight() {
                // Coalesce: this key is already being fetched; the caller
                // converges on the in-flight cycle's result
                debug!(%key, "request coalesced with in-flight fetch");
                return;
            }
        }

        let generation = self.next_generation;
        self.next_generation += 1;
        self.slots.insert(
            key.clone(),
            FetchSlot {
                generation,
                phase: FetchPhase::FetchingCurrent,
                canonical: None,
            },
        );
        self.error = None;

        info!(%key, generation, "starting fetch cycle");
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match query {
                Query::City(city) => api.current_by_city(&city).await,
                Query::Coords { lat, lon } => api.current_by_coords(lat, lon).await,
            };
            let _ = tx
                .send(Command::CurrentDone {
                    query_key: key,
                    generation,
                    result,
                })
                .await;
        });
    }

    fn handle_location(&mut self, event: LocationEvent) {
        match event {
            LocationEvent::Fix {
                latitude,
                longitude,
            } => self.handle_request(Query::Coords {
                lat: latitude,
                lon: longitude,
            }),
            LocationEvent::PermissionDenied => {
                // Short-circuit: no network call is attempted
                self.error = Some(
                    WeatherError::LocationUnavailable("permission denied".to_string()).to_string(),
                );
            }
            LocationEvent::Unavailable => {
                self.error = Some(
                    WeatherError::LocationUnavailable("no location fix".to_string()).to_string(),
                );
            }
        }
    }

    fn handle_current_done(
        &mut self,
        query_key: CityKey,
        generation: u64,
        result: Result<CurrentConditions, WeatherError>,
    ) {
        let Some(slot) = self.slots.get_mut(&query_key) else {
            return;
        };
        if slot.generation != generation || slot.phase != FetchPhase::FetchingCurrent {
            debug!(key = %query_key, generation, "discarding superseded current-conditions result");
            return;
        }

        let conditions = match result {
            Ok(conditions) => conditions,
            Err(e) => {
                warn!(key = %query_key, error = %e, "current-conditions fetch failed");
                slot.phase = FetchPhase::Failed;
                self.error = Some(e.to_string());
                return;
            }
        };

        // The provider's canonical city name keys the cache, so a
        // coordinate query and a later name query merge into one entry
        let canonical = CityKey::from_city(&conditions.city);
        let (lat, lon) = (conditions.latitude, conditions.longitude);

        slot.canonical = Some(canonical.clone());
        slot.phase = FetchPhase::FetchingForecast;
        self.error = None;
        self.cache
            .upsert(&canonical, SnapshotPatch::from_conditions(&conditions));

        info!(key = %query_key, city = %conditions.city, "current conditions merged, fetching forecast");
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.forecast(lat, lon).await;
            let _ = tx
                .send(Command::ForecastDone {
                    query_key,
                    generation,
                    result,
                })
                .await;
        });
    }

    fn handle_forecast_done(
        &mut self,
        query_key: CityKey,
        generation: u64,
        result: Result<Vec<RawForecastEntry>, WeatherError>,
    ) {
        let Some(slot) = self.slots.get_mut(&query_key) else {
            return;
        };
        if slot.generation != generation || slot.phase != FetchPhase::FetchingForecast {
            debug!(key = %query_key, generation, "discarding superseded forecast result");
            return;
        }
        let Some(canonical) = slot.canonical.clone() else {
            return;
        };

        match result {
            Ok(entries) => {
                let bundle = aggregate(&entries, Utc::now());
                slot.phase = FetchPhase::Ready;
                self.error = None;
                let snapshot = self
                    .cache
                    .upsert(
                        &canonical,
                        SnapshotPatch::from_forecast(bundle.hourly, bundle.daily),
                    )
                    .clone();
                info!(key = %query_key, days = snapshot.daily.len(), "forecast merged");
                self.persist(&snapshot);
            }
            Err(e) => {
                // The current-conditions snapshot stays; only the forecast
                // leg failed
                warn!(key = %query_key, error = %e, "forecast fetch failed");
                slot.phase = FetchPhase::Failed;
                self.error = Some(e.to_string());
            }
        }
    }

    fn persist(&self, snapshot: &WeatherSnapshot) {
        if let Some(ref store) = self.store {
            let city_key = format!("weather_{}", snapshot.key.slug());
            if let Err(e) = store.write(&city_key, snapshot, Some(SNAPSHOT_TTL_HOURS)) {
                warn!("failed to persist snapshot: {}", e);
            }
            if let Err(e) = store.write(LAST_SNAPSHOT_KEY, snapshot, Some(SNAPSHOT_TTL_HOURS)) {
                warn!("failed to persist last snapshot: {}", e);
            }
        }
    }

    fn publish(&self) {
        let slot = self
            .active_key
            .as_ref()
            .and_then(|key| self.slots.get(key));
        let loading = slot.map(|s| s.phase.is_in_flight()).unwrap_or(false);

        let display_key = slot
            .and_then(|s| s.canonical.clone())
            .or_else(|| self.active_key.clone());
        let current = display_key.and_then(|key| self.cache.get(&key).cloned());

        let forecast_loaded = match slot {
            Some(s) => s.phase == FetchPhase::Ready,
            None => current
                .as_ref()
                .map(|s| !s.daily.is_empty())
                .unwrap_or(false),
        };

        let _ = self.state_tx.send(EngineState {
            loading,
            error: self.error.clone(),
            current,
            forecast_loaded,
        });
    }
}
