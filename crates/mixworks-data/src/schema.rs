//! Serde structs for the on-disk session config.
//!
//! Every field is optional; whatever a file leaves out keeps the value from
//! [`SessionSettings::default`]. [`SessionConfigData::into_settings`]
//! validates and converts into core types.

use crate::loader::ConfigError;
use mixworks_core::hall::HallLocation;
use mixworks_core::id::HallId;
use mixworks_core::ingredient::IngredientStyle;
use mixworks_core::settings::{HallSettings, SessionSettings};
use mixworks_core::timing::SpeedCosts;
use mixworks_core::weather::GeoPoint;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

// ===========================================================================
// Data structs
// ===========================================================================

/// A hall definition. Both coordinates pin it to a fixed location; without
/// them it follows the device location.
#[derive(Debug, Clone, Deserialize)]
pub struct HallData {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SpeedCostsData {
    pub easy: u64,
    pub medium: u64,
    pub hard: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngredientStyleData {
    pub saturation: Option<u8>,
    pub lightness: Option<u8>,
    pub min_time_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WeatherApiData {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub units: Option<String>,
    pub language: Option<String>,
}

/// Top-level contents of `session.{ron,toml,json}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfigData {
    pub halls: Option<Vec<HallData>>,
    pub initial_hall: Option<u32>,
    pub default_mix_time_ms: Option<u64>,
    pub speed_costs: Option<SpeedCostsData>,
    pub heat_cap_celsius: Option<f64>,
    pub weather_refresh_interval_ms: Option<u64>,
    pub drop_min_time_ms: Option<u64>,
    pub ingredient: Option<IngredientStyleData>,
    pub rng_seed: Option<u64>,
    pub event_history: Option<usize>,
    pub weather_api: Option<WeatherApiData>,
}

// ===========================================================================
// Conversion
// ===========================================================================

fn invalid(file: &Path, field: &'static str, detail: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        file: file.to_path_buf(),
        field,
        detail: detail.into(),
    }
}

impl HallData {
    fn location(&self, file: &Path) -> Result<HallLocation, ConfigError> {
        match (self.latitude, self.longitude) {
            (None, None) => Ok(HallLocation::Local),
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    return Err(invalid(
                        file,
                        "halls",
                        format!("hall {} has coordinates out of range ({lat}, {lon})", self.id),
                    ));
                }
                Ok(HallLocation::Fixed(GeoPoint::new(lat, lon)))
            }
            _ => Err(invalid(
                file,
                "halls",
                format!("hall {} needs both latitude and longitude", self.id),
            )),
        }
    }
}

impl SessionConfigData {
    /// Validate and merge over the defaults. `file` labels errors.
    pub fn into_settings(self, file: &Path) -> Result<SessionSettings, ConfigError> {
        let mut settings = SessionSettings::default();

        if let Some(halls) = self.halls {
            if halls.is_empty() {
                return Err(invalid(file, "halls", "at least one hall is required"));
            }
            let mut seen = HashSet::new();
            let mut converted = Vec::with_capacity(halls.len());
            for hall in &halls {
                if !seen.insert(hall.id) {
                    return Err(ConfigError::DuplicateHall {
                        file: file.to_path_buf(),
                        id: hall.id,
                    });
                }
                converted.push(HallSettings {
                    id: HallId(hall.id),
                    name: hall.name.clone(),
                    location: hall.location(file)?,
                });
            }
            settings.initial_hall = converted[0].id;
            settings.halls = converted;
        }

        if let Some(id) = self.initial_hall {
            if !settings.halls.iter().any(|h| h.id == HallId(id)) {
                return Err(ConfigError::UnknownInitialHall {
                    file: file.to_path_buf(),
                    id,
                });
            }
            settings.initial_hall = HallId(id);
        }

        if let Some(mix) = self.default_mix_time_ms {
            settings.default_mix_time_ms = mix;
        }

        if let Some(costs) = self.speed_costs {
            if costs.easy == 0 || costs.medium == 0 || costs.hard == 0 {
                return Err(invalid(file, "speed_costs", "costs must be positive"));
            }
            settings.speed_costs = SpeedCosts {
                easy: costs.easy,
                medium: costs.medium,
                hard: costs.hard,
            };
        }

        if let Some(cap) = self.heat_cap_celsius {
            if !cap.is_finite() {
                return Err(invalid(file, "heat_cap_celsius", "must be a finite number"));
            }
            settings.heat_cap_celsius = cap;
        }

        if let Some(interval) = self.weather_refresh_interval_ms {
            if interval == 0 {
                return Err(invalid(file, "weather_refresh_interval_ms", "must be positive"));
            }
            settings.weather_refresh_interval_ms = interval;
        }

        if let Some(min) = self.drop_min_time_ms {
            settings.drop_min_time_ms = min;
        }

        if let Some(style) = self.ingredient {
            let defaults = IngredientStyle::default();
            let saturation = style.saturation.unwrap_or(defaults.saturation);
            let lightness = style.lightness.unwrap_or(defaults.lightness);
            if saturation > 100 || lightness > 100 {
                return Err(invalid(file, "ingredient", "saturation and lightness are percentages"));
            }
            settings.ingredient_style = IngredientStyle {
                saturation,
                lightness,
                min_time_ms: style.min_time_ms.unwrap_or(defaults.min_time_ms),
            };
        }

        if let Some(seed) = self.rng_seed {
            settings.rng_seed = seed;
        }

        if let Some(history) = self.event_history {
            if history == 0 {
                return Err(invalid(file, "event_history", "must be positive"));
            }
            settings.event_history = history;
        }

        if let Some(api) = self.weather_api {
            let target = &mut settings.weather_api;
            if let Some(url) = api.base_url {
                target.base_url = url;
            }
            if let Some(key) = api.api_key {
                target.api_key = key;
            }
            if let Some(units) = api.units {
                target.units = units;
            }
            if let Some(language) = api.language {
                target.language = language;
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> &'static Path {
        Path::new("session.json")
    }

    fn parse(json: &str) -> Result<SessionSettings, ConfigError> {
        let data: SessionConfigData = serde_json::from_str(json).unwrap();
        data.into_settings(file())
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(parse("{}").unwrap(), SessionSettings::default());
    }

    #[test]
    fn replacing_halls_moves_initial_hall_to_the_first() {
        let s = parse(r#"{ "halls": [ { "id": 7, "name": "Seven" } ] }"#).unwrap();
        assert_eq!(s.initial_hall, HallId(7));
        assert_eq!(s.halls[0].location, HallLocation::Local);
    }

    #[test]
    fn unknown_initial_hall_is_rejected() {
        assert!(matches!(
            parse(r#"{ "initial_hall": 3 }"#),
            Err(ConfigError::UnknownInitialHall { id: 3, .. })
        ));
    }

    #[test]
    fn zero_speed_cost_is_rejected() {
        assert!(matches!(
            parse(r#"{ "speed_costs": { "easy": 0, "medium": 1, "hard": 2 } }"#),
            Err(ConfigError::InvalidValue { field: "speed_costs", .. })
        ));
    }

    #[test]
    fn half_a_coordinate_is_rejected() {
        assert!(matches!(
            parse(r#"{ "halls": [ { "id": 1, "name": "A", "latitude": 10.0 } ] }"#),
            Err(ConfigError::InvalidValue { field: "halls", .. })
        ));
        assert!(matches!(
            parse(r#"{ "halls": [ { "id": 1, "name": "A", "latitude": 91.0, "longitude": 0.0 } ] }"#),
            Err(ConfigError::InvalidValue { field: "halls", .. })
        ));
    }

    #[test]
    fn empty_hall_list_is_rejected() {
        assert!(matches!(
            parse(r#"{ "halls": [] }"#),
            Err(ConfigError::InvalidValue { field: "halls", .. })
        ));
    }

    #[test]
    fn partial_ingredient_style_keeps_other_defaults() {
        let s = parse(r#"{ "ingredient": { "lightness": 40 } }"#).unwrap();
        assert_eq!(s.ingredient_style.lightness, 40);
        assert_eq!(s.ingredient_style.saturation, 80);
        assert!(parse(r#"{ "ingredient": { "saturation": 120 } }"#).is_err());
    }
}
