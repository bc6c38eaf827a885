//! Weather adapter contract.
//!
//! Machines only consume a [`WeatherObservation`]. Fetching one is the job
//! of a [`WeatherProvider`]; the coordinate comes either from a hall's fixed
//! location or from a [`LocationProvider`]. The transport itself lives
//! outside this crate. What lives here is the OpenWeatherMap wire format:
//! request URLs and response decoding.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// The subset of a weather report that drives processing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub temperature_c: f64,
    pub description: String,
}

impl WeatherObservation {
    pub fn new(temperature_c: f64, description: impl Into<String>) -> Self {
        Self {
            temperature_c,
            description: description.into(),
        }
    }
}

/// A full current-conditions report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub description: String,
    pub icon: String,
}

impl WeatherReport {
    pub fn observation(&self) -> WeatherObservation {
        WeatherObservation::new(self.temperature_c, self.description.clone())
    }

    /// Icon image URL on the provider's CDN.
    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}@2x.png", self.icon)
    }
}

/// One step of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub report: WeatherReport,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeatherError {
    #[error("weather API error: {message}")]
    Api { message: String },
    #[error("location request timed out")]
    Timeout,
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable")]
    LocationUnavailable,
    #[error("weather transport failed: {0}")]
    Transport(String),
    #[error("malformed weather response: {0}")]
    Decode(String),
}

impl WeatherError {
    /// Short message suitable for the weather display.
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::Api { message } => format!("API error: {message}"),
            WeatherError::Timeout => "Location timeout - try again".to_string(),
            WeatherError::PermissionDenied => "Location access denied".to_string(),
            WeatherError::LocationUnavailable
            | WeatherError::Transport(_)
            | WeatherError::Decode(_) => "Weather info unavailable".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider traits
// ---------------------------------------------------------------------------

/// Fetches current conditions for a coordinate.
pub trait WeatherProvider {
    fn current_weather(&self, at: GeoPoint) -> Result<WeatherReport, WeatherError>;
}

/// Resolves the device's own position.
pub trait LocationProvider {
    fn current_location(&self) -> Result<GeoPoint, WeatherError>;
}

// ---------------------------------------------------------------------------
// OpenWeatherMap wire format
// ---------------------------------------------------------------------------

/// Request parameters for the OpenWeatherMap 2.5 API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherApiSettings {
    pub base_url: String,
    pub api_key: String,
    pub units: String,
    pub language: String,
}

impl Default for WeatherApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            api_key: String::new(),
            units: "metric".to_string(),
            language: "nl".to_string(),
        }
    }
}

impl WeatherApiSettings {
    pub fn current_weather_url(&self, at: GeoPoint) -> String {
        format!(
            "{}/weather?lat={}&lon={}&appid={}&units={}&lang={}",
            self.base_url.trim_end_matches('/'),
            at.latitude,
            at.longitude,
            self.api_key,
            self.units,
            self.language
        )
    }

    pub fn forecast_url(&self, at: GeoPoint) -> String {
        format!(
            "{}/forecast?lat={}&lon={}&appid={}&units={}",
            self.base_url.trim_end_matches('/'),
            at.latitude,
            at.longitude,
            self.api_key,
            self.units
        )
    }
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Deserialize)]
struct OwmCondition {
    description: String,
    icon: String,
}

#[derive(Deserialize)]
struct OwmCurrent {
    main: OwmMain,
    wind: OwmWind,
    weather: Vec<OwmCondition>,
}

#[derive(Deserialize)]
struct OwmForecastItem {
    dt: i64,
    #[serde(flatten)]
    conditions: OwmCurrent,
}

#[derive(Deserialize)]
struct OwmForecast {
    list: Vec<OwmForecastItem>,
}

#[derive(Deserialize)]
struct OwmErrorBody {
    message: Option<String>,
}

impl TryFrom<OwmCurrent> for WeatherReport {
    type Error = WeatherError;

    fn try_from(raw: OwmCurrent) -> Result<Self, Self::Error> {
        let condition = raw
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Decode("empty 'weather' array".to_string()))?;
        Ok(WeatherReport {
            temperature_c: raw.main.temp,
            feels_like_c: raw.main.feels_like,
            humidity: raw.main.humidity,
            wind_speed: raw.wind.speed,
            description: condition.description,
            icon: condition.icon,
        })
    }
}

fn api_error(body: &str) -> WeatherError {
    let message = serde_json::from_str::<OwmErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| "Unknown error".to_string());
    WeatherError::Api { message }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Decode a current-weather response. Non-2xx statuses become
/// [`WeatherError::Api`] carrying the provider's `message`.
pub fn decode_current_weather(status: u16, body: &str) -> Result<WeatherReport, WeatherError> {
    if !is_success(status) {
        return Err(api_error(body));
    }
    let raw: OwmCurrent =
        serde_json::from_str(body).map_err(|e| WeatherError::Decode(e.to_string()))?;
    raw.try_into()
}

/// Decode a 5-day forecast response.
pub fn decode_forecast(status: u16, body: &str) -> Result<Vec<ForecastEntry>, WeatherError> {
    if !is_success(status) {
        return Err(WeatherError::Api {
            message: "Weather forecast could not be fetched".to_string(),
        });
    }
    let raw: OwmForecast =
        serde_json::from_str(body).map_err(|e| WeatherError::Decode(e.to_string()))?;
    raw.list
        .into_iter()
        .map(|item| {
            Ok(ForecastEntry {
                timestamp: item.dt,
                report: item.conditions.try_into()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = r#"{
        "coord": {"lon": 46.6753, "lat": 24.7136},
        "weather": [{"id": 800, "main": "Clear", "description": "onbewolkt", "icon": "01d"}],
        "main": {"temp": 38.2, "feels_like": 36.9, "temp_min": 37.0, "temp_max": 39.1, "pressure": 1008, "humidity": 9},
        "wind": {"speed": 4.6, "deg": 340},
        "name": "Riyadh"
    }"#;

    #[test]
    fn decodes_current_weather() {
        let report = decode_current_weather(200, CURRENT).unwrap();
        assert_eq!(report.temperature_c, 38.2);
        assert_eq!(report.feels_like_c, 36.9);
        assert_eq!(report.humidity, 9.0);
        assert_eq!(report.wind_speed, 4.6);
        assert_eq!(report.description, "onbewolkt");
        assert_eq!(report.icon, "01d");
        assert_eq!(
            report.observation(),
            WeatherObservation::new(38.2, "onbewolkt")
        );
    }

    #[test]
    fn api_error_carries_provider_message() {
        let err = decode_current_weather(401, r#"{"cod": 401, "message": "Invalid API key"}"#)
            .unwrap_err();
        assert_eq!(
            err,
            WeatherError::Api {
                message: "Invalid API key".into()
            }
        );
        assert_eq!(err.user_message(), "API error: Invalid API key");
    }

    #[test]
    fn api_error_without_body_message() {
        let err = decode_current_weather(500, "<html>oops</html>").unwrap_err();
        assert_eq!(
            err,
            WeatherError::Api {
                message: "Unknown error".into()
            }
        );
    }

    #[test]
    fn malformed_success_body_is_decode_error() {
        assert!(matches!(
            decode_current_weather(200, "{}"),
            Err(WeatherError::Decode(_))
        ));
        let no_conditions = r#"{"weather": [], "main": {"temp": 1, "feels_like": 1, "humidity": 1}, "wind": {"speed": 0}}"#;
        assert!(matches!(
            decode_current_weather(200, no_conditions),
            Err(WeatherError::Decode(_))
        ));
    }

    #[test]
    fn decodes_forecast() {
        let body = r#"{"cnt": 2, "list": [
            {"dt": 1700000000, "main": {"temp": 5.0, "feels_like": 2.0, "humidity": 80}, "wind": {"speed": 3.0}, "weather": [{"description": "light rain", "icon": "10d"}]},
            {"dt": 1700010800, "main": {"temp": 6.5, "feels_like": 4.0, "humidity": 75}, "wind": {"speed": 2.5}, "weather": [{"description": "clouds", "icon": "03d"}]}
        ]}"#;
        let entries = decode_forecast(200, body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp, 1_700_000_000);
        assert_eq!(entries[0].report.description, "light rain");
        assert_eq!(entries[1].report.temperature_c, 6.5);
    }

    #[test]
    fn urls_follow_provider_layout() {
        let settings = WeatherApiSettings {
            api_key: "KEY".into(),
            ..WeatherApiSettings::default()
        };
        let at = GeoPoint::new(24.7136, 46.6753);
        assert_eq!(
            settings.current_weather_url(at),
            "https://api.openweathermap.org/data/2.5/weather?lat=24.7136&lon=46.6753&appid=KEY&units=metric&lang=nl"
        );
        assert_eq!(
            settings.forecast_url(at),
            "https://api.openweathermap.org/data/2.5/forecast?lat=24.7136&lon=46.6753&appid=KEY&units=metric"
        );
    }

    #[test]
    fn user_messages() {
        assert_eq!(WeatherError::Timeout.user_message(), "Location timeout - try again");
        assert_eq!(WeatherError::PermissionDenied.user_message(), "Location access denied");
        assert_eq!(
            WeatherError::Transport("reset".into()).user_message(),
            "Weather info unavailable"
        );
    }
}
