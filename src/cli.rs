//! Command-line interface parsing for skywatch
//!
//! This module handles parsing of CLI arguments using clap, including the
//! city/coordinate fetch targets and the saved-city maintenance flags, and
//! validates argument combinations into a `StartupConfig`.

use clap::Parser;
use thiserror::Error;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// Both a city name and coordinates were given
    #[error("Give either a city name or --lat/--lon, not both")]
    ConflictingTarget,
    /// Only one of the two coordinate flags was given
    #[error("--lat and --lon must be given together")]
    IncompleteCoords,
    /// No fetch target and no saved-city command
    #[error("Nothing to do: give a city name, --lat/--lon, --cities, or --forget <ID>")]
    MissingTarget,
    /// --save needs something to save
    #[error("--save requires a city or coordinate target")]
    SaveWithoutTarget,
    /// Zero forecast days make no sense
    #[error("--days must be at least 1")]
    InvalidDays,
}

/// skywatch - current conditions and forecast for a city or coordinates
#[derive(Parser, Debug)]
#[command(name = "skywatch")]
#[command(about = "Current weather and 5-day forecast from OpenWeatherMap")]
#[command(version)]
pub struct Cli {
    /// City to fetch weather for (e.g. "London")
    #[arg(value_name = "CITY")]
    pub city: Option<String>,

    /// Latitude of the location to fetch (requires --lon)
    #[arg(long, value_name = "DEG", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the location to fetch (requires --lat)
    #[arg(long, value_name = "DEG", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Save the fetched city to the saved-city list
    #[arg(long)]
    pub save: bool,

    /// List saved cities and exit (no network)
    #[arg(long)]
    pub cities: bool,

    /// Remove a saved city by id and exit (no network)
    #[arg(long, value_name = "ID")]
    pub forget: Option<String>,

    /// Number of forecast days to display
    #[arg(long, value_name = "N", default_value_t = 7)]
    pub days: usize,

    /// OpenWeatherMap API key; falls back to $OPENWEATHER_API_KEY
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Language code for condition descriptions (e.g. "de")
    #[arg(long, value_name = "CODE")]
    pub lang: Option<String>,
}

/// What to fetch, before provider-side key resolution
#[derive(Debug, Clone, PartialEq)]
pub enum FetchTarget {
    /// Fetch by city name
    City(String),
    /// Fetch by coordinate pair
    Coords { lat: f64, lon: f64 },
}

/// Saved-city maintenance commands that run without a fetch
#[derive(Debug, Clone, PartialEq)]
pub enum CityCommand {
    /// Print the saved-city list
    List,
    /// Remove the city with the given id
    Forget(String),
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    /// The weather target to fetch, if any
    pub target: Option<FetchTarget>,
    /// Whether to save the fetched city afterwards
    pub save: bool,
    /// Saved-city command to run instead of (or before) fetching
    pub command: Option<CityCommand>,
    /// How many forecast days to display
    pub days: usize,
    /// API key from the command line, if given
    pub api_key: Option<String>,
    /// Language code for condition descriptions, if given
    pub lang: Option<String>,
}

impl StartupConfig {
    /// Validates parsed CLI arguments into a StartupConfig.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if the argument combination is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.days == 0 {
            return Err(CliError::InvalidDays);
        }

        let coords = match (cli.lat, cli.lon) {
            (Some(lat), Some(lon)) => Some(FetchTarget::Coords { lat, lon }),
            (None, None) => None,
            _ => return Err(CliError::IncompleteCoords),
        };

        let target = match (&cli.city, coords) {
            (Some(_), Some(_)) => return Err(CliError::ConflictingTarget),
            (Some(city), None) => Some(FetchTarget::City(city.clone())),
            (None, coords) => coords,
        };

        let command = if cli.cities {
            Some(CityCommand::List)
        } else {
            cli.forget.clone().map(CityCommand::Forget)
        };

        if target.is_none() && command.is_none() {
            return Err(CliError::MissingTarget);
        }
        if cli.save && target.is_none() {
            return Err(CliError::SaveWithoutTarget);
        }

        Ok(StartupConfig {
            target,
            save: cli.save,
            command,
            days: cli.days,
            api_key: cli.api_key.clone(),
            lang: cli.lang.clone(),
        })
    }
}

/// Resolves the API key from the CLI flag or the environment
pub fn resolve_api_key(flag: Option<String>) -> Option<String> {
    flag.or_else(|| std::env::var("OPENWEATHER_API_KEY").ok())
}
