//! OpenWeatherMap API client
//!
//! Fetches current conditions (`/weather`, by city name or coordinates) and
//! the 3-hourly forecast feed (`/forecast`) and maps the snake_case wire
//! format into the internal models. The `WeatherApi` trait is the seam the
//! engine fetches through, so tests can substitute fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;

use super::{CurrentConditions, RawForecastEntry, WeatherError};

/// Default base URL for the OpenWeatherMap 2.5 API
const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Number of 3-hour slots to request from the forecast feed (5 days)
const FORECAST_SLOTS: u32 = 40;

/// HTTP timeout for provider requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Abstract fetch capability the engine depends on
///
/// Implemented by `OpenWeatherClient` for production and by in-memory fakes
/// in the engine tests.
#[async_trait]
pub trait WeatherApi: Send + Sync {
    /// Fetches current conditions for a city name query
    async fn current_by_city(&self, city: &str) -> Result<CurrentConditions, WeatherError>;

    /// Fetches current conditions for a coordinate pair
    async fn current_by_coords(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<CurrentConditions, WeatherError>;

    /// Fetches the raw forecast feed for a coordinate pair
    async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<RawForecastEntry>, WeatherError>;
}

/// Client for the OpenWeatherMap API
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    http: Client,
    api_key: String,
    base_url: String,
    lang: String,
}

impl OpenWeatherClient {
    /// Creates a client with the default base URL
    ///
    /// # Errors
    /// Returns `WeatherError::Transport` if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, WeatherError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
            lang: "en".to_string(),
        })
    }

    /// Overrides the base URL (used with a mock server in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the language code passed to the provider
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    async fn fetch_current(
        &self,
        query: &[(&str, String)],
    ) -> Result<CurrentConditions, WeatherError> {
        let url = format!("{}/weather", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WeatherError::Server(status.as_u16()));
        }

        let parsed: CurrentResponse =
            serde_json::from_str(&body).map_err(|e| WeatherError::Decode(e.to_string()))?;
        Ok(parse_current(parsed))
    }

    /// Fetches the forecast feed and flattens it into raw entries
    async fn fetch_forecast(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<RawForecastEntry>, WeatherError> {
        let url = format!("{}/forecast", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("lat", lat.to_string()), ("lon", lon.to_string())])
            .query(&[
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("cnt", &FORECAST_SLOTS.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WeatherError::Server(status.as_u16()));
        }

        let parsed: ForecastResponse =
            serde_json::from_str(&body).map_err(|e| WeatherError::Decode(e.to_string()))?;
        Ok(parse_forecast(parsed))
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherClient {
    async fn current_by_city(&self, city: &str) -> Result<CurrentConditions, WeatherError> {
        let trimmed = city.trim();
        if trimmed.is_empty() {
            return Err(WeatherError::InvalidQuery("empty city name".to_string()));
        }
        self.fetch_current(&[("q", trimmed.to_string())]).await
    }

    async fn current_by_coords(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<CurrentConditions, WeatherError> {
        self.fetch_current(&[("lat", lat.to_string()), ("lon", lon.to_string())])
            .await
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<RawForecastEntry>, WeatherError> {
        self.fetch_forecast(lat, lon).await
    }
}

/// Maps the `/weather` response into `CurrentConditions`
fn parse_current(response: CurrentResponse) -> CurrentConditions {
    let (condition, description) = response
        .weather
        .first()
        .map(|w| (w.main.clone(), w.description.clone()))
        .unwrap_or_else(|| ("Unknown".to_string(), String::new()));

    CurrentConditions {
        city: response.name,
        latitude: response.coord.lat,
        longitude: response.coord.lon,
        temperature: response.main.temp,
        high_temp: response.main.temp_max,
        low_temp: response.main.temp_min,
        condition,
        condition_description: description,
        humidity: response.main.humidity,
        wind_speed: response.wind.map(|w| w.speed).unwrap_or(0.0),
        pressure: response.main.pressure,
        feels_like: response.main.feels_like,
        sunrise: response.sys.as_ref().and_then(|s| unix_to_utc(s.sunrise?)),
        sunset: response.sys.as_ref().and_then(|s| unix_to_utc(s.sunset?)),
    }
}

/// Maps the `/forecast` response into raw entries for the aggregator
fn parse_forecast(response: ForecastResponse) -> Vec<RawForecastEntry> {
    response
        .list
        .into_iter()
        .filter_map(|item| {
            let timestamp = unix_to_utc(item.dt)?;
            let condition = item
                .weather
                .first()
                .map(|w| w.main.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            Some(RawForecastEntry {
                timestamp,
                temperature: item.main.temp,
                condition,
            })
        })
        .collect()
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

// Wire DTOs: snake_case field names match the provider JSON directly.

#[derive(Debug, serde::Deserialize)]
struct CurrentResponse {
    coord: Coord,
    weather: Vec<ConditionDto>,
    main: MainDto,
    wind: Option<WindDto>,
    sys: Option<SysDto>,
    name: String,
}

#[derive(Debug, serde::Deserialize)]
struct Coord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, serde::Deserialize)]
struct ConditionDto {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, serde::Deserialize)]
struct MainDto {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
    pressure: Option<u32>,
    feels_like: Option<f64>,
}

#[derive(Debug, serde::Deserialize)]
struct WindDto {
    speed: f64,
}

#[derive(Debug, serde::Deserialize)]
struct SysDto {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
}

#[derive(Debug, serde::Deserialize)]
struct ForecastItem {
    dt: i64,
    main: ForecastMain,
    weather: Vec<ConditionDto>,
}

#[derive(Debug, serde::Deserialize)]
struct ForecastMain {
    temp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Sample /weather response for London
    const CURRENT_JSON: &str = r#"{
        "coord": {"lon": -0.1257, "lat": 51.5085},
        "weather": [{"id": 804, "main": "Clouds", "description": "overcast clouds", "icon": "04d"}],
        "main": {
            "temp": 15.0,
            "feels_like": 14.2,
            "temp_min": 12.3,
            "temp_max": 17.1,
            "pressure": 1012,
            "humidity": 72
        },
        "wind": {"speed": 3.6, "deg": 240},
        "sys": {"sunrise": 1736748000, "sunset": 1736777000},
        "dt": 1736760000,
        "name": "London"
    }"#;

    /// Sample /forecast response with two 3-hour slots
    const FORECAST_JSON: &str = r#"{
        "city": {"name": "London", "country": "GB"},
        "cnt": 2,
        "list": [
            {
                "dt": 1736769600,
                "main": {"temp": 14.0, "temp_min": 13.5, "temp_max": 14.0, "humidity": 75},
                "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}]
            },
            {
                "dt": 1736780400,
                "main": {"temp": 12.5, "temp_min": 12.0, "temp_max": 12.5, "humidity": 80},
                "weather": [{"id": 804, "main": "Clouds", "description": "overcast clouds", "icon": "04n"}]
            }
        ]
    }"#;

    #[test]
    fn test_parse_current_response() {
        let parsed: CurrentResponse =
            serde_json::from_str(CURRENT_JSON).expect("valid response must parse");
        let cond = parse_current(parsed);

        assert_eq!(cond.city, "London");
        assert!((cond.temperature - 15.0).abs() < 0.01);
        assert!((cond.high_temp - 17.1).abs() < 0.01);
        assert!((cond.low_temp - 12.3).abs() < 0.01);
        assert_eq!(cond.condition, "Clouds");
        assert_eq!(cond.condition_description, "overcast clouds");
        assert_eq!(cond.humidity, 72);
        assert!((cond.wind_speed - 3.6).abs() < 0.01);
        assert_eq!(cond.pressure, Some(1012));
        assert!(cond.sunrise.is_some());
        assert!(cond.sunset.is_some());
        assert!((cond.latitude - 51.5085).abs() < 0.0001);
    }

    #[test]
    fn test_parse_current_without_optional_fields() {
        let minimal = r#"{
            "coord": {"lon": 2.35, "lat": 48.86},
            "weather": [],
            "main": {"temp": 9.0, "temp_min": 8.0, "temp_max": 10.0, "humidity": 60},
            "name": "Paris"
        }"#;

        let parsed: CurrentResponse = serde_json::from_str(minimal).expect("must parse");
        let cond = parse_current(parsed);

        assert_eq!(cond.condition, "Unknown");
        assert!((cond.wind_speed - 0.0).abs() < f64::EPSILON);
        assert!(cond.pressure.is_none());
        assert!(cond.feels_like.is_none());
        assert!(cond.sunrise.is_none());
    }

    #[test]
    fn test_parse_forecast_response() {
        let parsed: ForecastResponse =
            serde_json::from_str(FORECAST_JSON).expect("valid response must parse");
        let entries = parse_forecast(parsed);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].condition, "Rain");
        assert!((entries[0].temperature - 14.0).abs() < 0.01);
        assert!(entries[0].timestamp < entries[1].timestamp);
    }

    #[test]
    fn test_parse_malformed_json_fails() {
        let result: Result<CurrentResponse, _> = serde_json::from_str("{ nope }");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_current_by_city_hits_weather_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "London"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CURRENT_JSON))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new("test-key")
            .expect("client must build")
            .with_base_url(server.uri());

        let cond = client
            .current_by_city("London")
            .await
            .expect("fetch must succeed");
        assert_eq!(cond.city, "London");
    }

    #[tokio::test]
    async fn test_current_by_coords_sends_lat_lon() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("lat", "51.5"))
            .and(query_param("lon", "-0.13"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CURRENT_JSON))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new("test-key")
            .expect("client must build")
            .with_base_url(server.uri());

        let cond = client
            .current_by_coords(51.5, -0.13)
            .await
            .expect("fetch must succeed");
        assert_eq!(cond.city, "London");
    }

    #[tokio::test]
    async fn test_forecast_fetch_and_flatten() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_JSON))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new("test-key")
            .expect("client must build")
            .with_base_url(server.uri());

        let entries = client
            .forecast(51.5, -0.13)
            .await
            .expect("fetch must succeed");
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"city not found"}"#))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new("test-key")
            .expect("client must build")
            .with_base_url(server.uri());

        let err = client
            .current_by_city("Nowhereville")
            .await
            .expect_err("must fail");
        match err {
            WeatherError::Server(status) => assert_eq!(status, 404),
            other => panic!("expected Server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_body_maps_to_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new("test-key")
            .expect("client must build")
            .with_base_url(server.uri());

        let err = client.current_by_city("London").await.expect_err("must fail");
        assert!(matches!(err, WeatherError::Decode(_)));
    }

    #[tokio::test]
    async fn test_empty_city_is_rejected_before_any_request() {
        let client = OpenWeatherClient::new("test-key").expect("client must build");
        let err = client.current_by_city("   ").await.expect_err("must fail");
        assert!(matches!(err, WeatherError::InvalidQuery(_)));
    }
}
