//! Tunables of a session. `Default` reproduces the stock behavior.

use crate::fixed::Millis;
use crate::hall::{Hall, HallLocation, default_halls};
use crate::id::HallId;
use crate::ingredient::IngredientStyle;
use crate::timing::SpeedCosts;
use crate::weather::WeatherApiSettings;
use serde::{Deserialize, Serialize};

/// A hall to create when the session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallSettings {
    pub id: HallId,
    pub name: String,
    pub location: HallLocation,
}

impl From<&Hall> for HallSettings {
    fn from(hall: &Hall) -> Self {
        Self {
            id: hall.id(),
            name: hall.name().to_string(),
            location: hall.location(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub halls: Vec<HallSettings>,
    pub initial_hall: HallId,
    /// Mix time given to every new machine.
    pub default_mix_time_ms: Millis,
    pub speed_costs: SpeedCosts,
    /// Above this temperature a hall may hold only one running machine.
    pub heat_cap_celsius: f64,
    pub weather_refresh_interval_ms: Millis,
    /// Minimum time stamped on ingredients dropped into a pot.
    pub drop_min_time_ms: Millis,
    pub ingredient_style: IngredientStyle,
    pub rng_seed: u64,
    pub event_history: usize,
    pub weather_api: WeatherApiSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            halls: default_halls().iter().map(HallSettings::from).collect(),
            initial_hall: HallId(1),
            default_mix_time_ms: 1000,
            speed_costs: SpeedCosts::default(),
            heat_cap_celsius: 35.0,
            weather_refresh_interval_ms: 5 * 60 * 1000,
            drop_min_time_ms: 1000,
            ingredient_style: IngredientStyle::default(),
            rng_seed: 0x5EED_CAFE,
            event_history: 256,
            weather_api: WeatherApiSettings::default(),
        }
    }
}
