//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::id::{IngredientId, MachineId, PotId};
use crate::ingredient::{IngredientSpec, Speed, Structure};
use crate::session::Session;
use crate::settings::SessionSettings;
use crate::weather::{
    GeoPoint, LocationProvider, WeatherError, WeatherObservation, WeatherProvider, WeatherReport,
};
use std::cell::RefCell;

// ===========================================================================
// Weather fixtures
// ===========================================================================

pub fn report(temperature_c: f64, description: &str) -> WeatherReport {
    WeatherReport {
        temperature_c,
        feels_like_c: temperature_c,
        humidity: 60.0,
        wind_speed: 3.5,
        description: description.to_string(),
        icon: "10d".to_string(),
    }
}

pub fn mild() -> WeatherObservation {
    WeatherObservation::new(18.0, "clear sky")
}

pub fn rainy() -> WeatherObservation {
    WeatherObservation::new(-5.0, "light rain")
}

pub fn scorching() -> WeatherObservation {
    WeatherObservation::new(41.0, "clear sky")
}

/// Answers every request with the same result and records where it was
/// asked.
#[derive(Debug)]
pub struct FixedWeather {
    result: Result<WeatherReport, WeatherError>,
    requests: RefCell<Vec<GeoPoint>>,
}

impl FixedWeather {
    pub fn ok(report: WeatherReport) -> Self {
        Self {
            result: Ok(report),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(err: WeatherError) -> Self {
        Self {
            result: Err(err),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GeoPoint> {
        self.requests.borrow().clone()
    }
}

impl WeatherProvider for FixedWeather {
    fn current_weather(&self, at: GeoPoint) -> Result<WeatherReport, WeatherError> {
        self.requests.borrow_mut().push(at);
        self.result.clone()
    }
}

#[derive(Debug, Clone)]
pub struct FixedLocation(pub Result<GeoPoint, WeatherError>);

impl FixedLocation {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self(Ok(GeoPoint::new(latitude, longitude)))
    }

    pub fn denied() -> Self {
        Self(Err(WeatherError::PermissionDenied))
    }
}

impl LocationProvider for FixedLocation {
    fn current_location(&self) -> Result<GeoPoint, WeatherError> {
        self.0.clone()
    }
}

// ===========================================================================
// Session builders
// ===========================================================================

pub fn session() -> Session {
    match Session::new(SessionSettings::default()) {
        Ok(s) => s,
        Err(err) => panic!("default settings must build a session: {err}"),
    }
}

pub fn spec(color: &str, speed: Speed) -> IngredientSpec {
    IngredientSpec::new(color, Structure::Grain, speed)
}

/// A new pot filled with one ingredient per color, all of `speed`.
pub fn filled_pot(session: &mut Session, speed: Speed, colors: &[&str]) -> PotId {
    let pot = session.create_pot();
    for color in colors {
        let ing: IngredientId = session.create_ingredient(spec(color, speed));
        if let Err(err) = session.add_ingredient_to_pot(ing, pot) {
            panic!("same-speed ingredient refused: {err}");
        }
    }
    pot
}

/// A machine of `speed` in the active hall holding one pot per color list.
pub fn loaded_machine(
    session: &mut Session,
    speed: Speed,
    pots: &[&[&str]],
) -> (MachineId, Vec<PotId>) {
    let machine = match session.create_machine(speed, None) {
        Ok(m) => m,
        Err(err) => panic!("machine creation failed: {err}"),
    };
    let ids = pots
        .iter()
        .map(|colors| {
            let pot = filled_pot(session, speed, colors);
            if let Err(err) = session.assign_pot_id(pot, machine) {
                panic!("assign failed: {err}");
            }
            pot
        })
        .collect();
    (machine, ids)
}
