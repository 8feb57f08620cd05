//! skywatch - current weather and forecast in the terminal
//!
//! Fetches current conditions and a 5-day forecast from OpenWeatherMap for
//! a city or coordinate pair, keeps the last result cached on disk, and
//! maintains a saved-city list.

mod aggregate;
mod cache;
mod cities;
mod classify;
mod cli;
mod data;
mod engine;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cache::DiskStore;
use cities::SavedCities;
use classify::icon_for;
use cli::{resolve_api_key, Cli, CityCommand, FetchTarget, StartupConfig};
use data::{OpenWeatherClient, SavedCity, WeatherSnapshot};
use engine::{settled, EngineHandle};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so the report stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    let store = DiskStore::new();
    if store.is_none() {
        debug!("no cache directory available, running without persistence");
    }
    let mut saved = match store.clone() {
        Some(store) => SavedCities::load(store),
        None => SavedCities::new(),
    };

    if let Some(command) = &config.command {
        run_city_command(command, &mut saved);
        if config.target.is_none() {
            return ExitCode::SUCCESS;
        }
    }

    let Some(target) = config.target.clone() else {
        return ExitCode::SUCCESS;
    };

    let Some(api_key) = resolve_api_key(config.api_key.clone()) else {
        eprintln!("error: no API key; pass --api-key or set OPENWEATHER_API_KEY");
        return ExitCode::from(2);
    };

    let client = match OpenWeatherClient::new(api_key.as_str()) {
        Ok(client) => match config.lang {
            Some(ref lang) => client.with_lang(lang.as_str()),
            None => client,
        },
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let handle = EngineHandle::spawn_with_store(Arc::new(client), store);
    let mut rx = handle.subscribe();
    match &target {
        FetchTarget::City(city) => handle.request_city(city).await,
        FetchTarget::Coords { lat, lon } => handle.request_coords(*lat, *lon).await,
    }
    let state = settled(&mut rx).await;
    handle.shutdown().await;

    if let Some(error) = &state.error {
        eprintln!("error: {}", error);
    }

    let Some(snapshot) = &state.current else {
        return ExitCode::FAILURE;
    };
    if state.error.is_some() {
        eprintln!("showing last known data for {}", snapshot.city);
    }

    print_report(snapshot, config.days);

    if config.save && state.error.is_none() {
        let city = SavedCity::new(&snapshot.city, snapshot.latitude, snapshot.longitude);
        if saved.add(city) {
            println!("\nsaved {}", snapshot.city);
        }
    }

    if state.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Runs a saved-city maintenance command; no network involved
fn run_city_command(command: &CityCommand, saved: &mut SavedCities) {
    match command {
        CityCommand::List => {
            if saved.is_empty() {
                println!("no saved cities");
                return;
            }
            for city in saved.list() {
                println!(
                    "{:<30} {:>9.4} {:>9.4}  {}",
                    city.name, city.latitude, city.longitude, city.id
                );
            }
        }
        CityCommand::Forget(id) => {
            if saved.remove(id) {
                println!("removed {}", id);
            } else {
                println!("no saved city with id {}", id);
            }
        }
    }
}

/// Prints the weather report for a snapshot, capping daily rows at `days`
fn print_report(snapshot: &WeatherSnapshot, days: usize) {
    println!(
        "{}  {}  {:.1}°C  {}",
        snapshot.city,
        snapshot.condition_description,
        snapshot.temperature,
        icon_for(&snapshot.condition)
    );
    print!(
        "high {:.1}°C  low {:.1}°C  humidity {}%  wind {:.1} m/s",
        snapshot.high_temp, snapshot.low_temp, snapshot.humidity, snapshot.wind_speed
    );
    if let Some(feels_like) = snapshot.feels_like {
        print!("  feels like {:.1}°C", feels_like);
    }
    if let Some(pressure) = snapshot.pressure {
        print!("  pressure {} hPa", pressure);
    }
    println!();
    if let (Some(sunrise), Some(sunset)) = (snapshot.sunrise, snapshot.sunset) {
        println!(
            "sunrise {}  sunset {}",
            sunrise.format("%H:%M"),
            sunset.format("%H:%M")
        );
    }

    if !snapshot.hourly.is_empty() {
        println!("\nnext 24 hours:");
        for sample in &snapshot.hourly {
            println!(
                "  {}  {:>6.1}°C  {}",
                sample.timestamp.format("%a %H:%M"),
                sample.temperature,
                sample.icon
            );
        }
    }

    if !snapshot.daily.is_empty() {
        println!("\ndaily:");
        for day in snapshot.daily.iter().take(days) {
            println!(
                "  {}  high {:>6.1}°C  low {:>6.1}°C  {}",
                day.date.format("%a %Y-%m-%d"),
                day.high_temp,
                day.low_temp,
                day.icon
            );
        }
    }
}
