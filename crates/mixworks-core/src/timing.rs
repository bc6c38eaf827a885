//! Processing-time calculation.
//!
//! A batch's duration is the sum of its ingredients' speed costs plus the
//! machine's fixed mix time, scaled by a weather-derived [`TimeFactor`].

use crate::fixed::{Fixed64, Millis, f64_to_fixed64, scale_millis};
use crate::ingredient::{Ingredient, Speed};
use crate::weather::WeatherObservation;
use serde::{Deserialize, Serialize};

/// Per-speed processing cost in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedCosts {
    pub easy: Millis,
    pub medium: Millis,
    pub hard: Millis,
}

impl Default for SpeedCosts {
    fn default() -> Self {
        Self {
            easy: 2000,
            medium: 7000,
            hard: 15000,
        }
    }
}

impl SpeedCosts {
    pub fn cost(&self, speed: Speed) -> Millis {
        match speed {
            Speed::Easy => self.easy,
            Speed::Medium => self.medium,
            Speed::Hard => self.hard,
        }
    }
}

/// Weather surcharge applied to a processing duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFactor {
    /// Rain or snow in the description.
    Precipitation,
    /// Below [`COLD_THRESHOLD_CELSIUS`].
    Cold,
    Normal,
}

/// Temperatures strictly below this count as cold.
pub const COLD_THRESHOLD_CELSIUS: f64 = 10.0;

impl TimeFactor {
    /// Classify an observation. Precipitation is checked before cold.
    pub fn for_weather(weather: &WeatherObservation) -> Self {
        let description = weather.description.to_lowercase();
        if description.contains("rain") || description.contains("snow") {
            TimeFactor::Precipitation
        } else if weather.temperature_c < COLD_THRESHOLD_CELSIUS {
            TimeFactor::Cold
        } else {
            TimeFactor::Normal
        }
    }

    /// Multiplier as Q32.32.
    pub fn multiplier(self) -> Fixed64 {
        match self {
            TimeFactor::Precipitation => f64_to_fixed64(1.10),
            TimeFactor::Cold => f64_to_fixed64(1.15),
            TimeFactor::Normal => Fixed64::ONE,
        }
    }

    /// Surcharge label for display, `None` when there is no surcharge.
    pub fn label(self) -> Option<&'static str> {
        match self {
            TimeFactor::Precipitation => Some("+10% mix time"),
            TimeFactor::Cold => Some("+15% mix time"),
            TimeFactor::Normal => None,
        }
    }
}

/// Unscaled duration: speed costs of every ingredient plus the mix time.
pub fn base_duration<'a>(
    ingredients: impl IntoIterator<Item = &'a Ingredient>,
    mix_time_ms: Millis,
    costs: &SpeedCosts,
) -> Millis {
    ingredients
        .into_iter()
        .map(|ing| costs.cost(ing.speed()))
        .fold(mix_time_ms, Millis::saturating_add)
}

/// Full processing duration. Without an observation no factor is applied.
pub fn processing_duration<'a>(
    ingredients: impl IntoIterator<Item = &'a Ingredient>,
    mix_time_ms: Millis,
    costs: &SpeedCosts,
    weather: Option<&WeatherObservation>,
) -> Millis {
    let base = base_duration(ingredients, mix_time_ms, costs);
    match weather {
        Some(w) => scale_millis(base, TimeFactor::for_weather(w).multiplier()),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IngredientId;
    use crate::ingredient::{IngredientSpec, Structure};

    fn ingredients(speeds: &[Speed]) -> Vec<Ingredient> {
        speeds
            .iter()
            .enumerate()
            .map(|(i, &speed)| {
                Ingredient::new(
                    IngredientId(i as u32 + 1),
                    IngredientSpec::new("#000000", Structure::Grain, speed),
                )
            })
            .collect()
    }

    fn weather(temp: f64, description: &str) -> WeatherObservation {
        WeatherObservation::new(temp, description)
    }

    #[test]
    fn canonical_costs() {
        let costs = SpeedCosts::default();
        assert_eq!(costs.cost(Speed::Easy), 2000);
        assert_eq!(costs.cost(Speed::Medium), 7000);
        assert_eq!(costs.cost(Speed::Hard), 15000);
    }

    #[test]
    fn two_easy_without_weather() {
        let ings = ingredients(&[Speed::Easy, Speed::Easy]);
        assert_eq!(
            processing_duration(&ings, 1000, &SpeedCosts::default(), None),
            5000
        );
    }

    #[test]
    fn empty_is_just_mix_time() {
        assert_eq!(
            processing_duration(&Vec::<Ingredient>::new(), 1000, &SpeedCosts::default(), None),
            1000
        );
    }

    #[test]
    fn precipitation_wins_over_cold() {
        assert_eq!(
            TimeFactor::for_weather(&weather(-5.0, "light rain")),
            TimeFactor::Precipitation
        );
        assert_eq!(
            TimeFactor::for_weather(&weather(-5.0, "Heavy SNOW")),
            TimeFactor::Precipitation
        );
    }

    #[test]
    fn cold_threshold_is_strict() {
        assert_eq!(
            TimeFactor::for_weather(&weather(9.99, "clear sky")),
            TimeFactor::Cold
        );
        assert_eq!(
            TimeFactor::for_weather(&weather(10.0, "clear sky")),
            TimeFactor::Normal
        );
    }

    #[test]
    fn factors_scale_duration() {
        let ings = ingredients(&[Speed::Easy, Speed::Easy]);
        let costs = SpeedCosts::default();
        let rain = weather(20.0, "moderate rain");
        let cold = weather(2.0, "clear sky");
        let warm = weather(25.0, "clear sky");
        assert_eq!(processing_duration(&ings, 1000, &costs, Some(&rain)), 5500);
        assert_eq!(processing_duration(&ings, 1000, &costs, Some(&cold)), 5750);
        assert_eq!(processing_duration(&ings, 1000, &costs, Some(&warm)), 5000);
    }

    #[test]
    fn mixed_speed_costs_add_up() {
        let ings = ingredients(&[Speed::Hard, Speed::Medium]);
        assert_eq!(base_duration(&ings, 0, &SpeedCosts::default()), 22000);
    }

    #[test]
    fn labels() {
        assert_eq!(TimeFactor::Precipitation.label(), Some("+10% mix time"));
        assert_eq!(TimeFactor::Cold.label(), Some("+15% mix time"));
        assert_eq!(TimeFactor::Normal.label(), None);
    }
}
