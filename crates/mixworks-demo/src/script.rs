//! A scripted session: one machine per speed, random pots, a full run to
//! idle, and a summary of every pot's outcome.

use crate::error::DemoError;
use mixworks_core::color::{Hsl, Rgb};
use mixworks_core::fixed::Millis;
use mixworks_core::id::{HallId, PotId};
use mixworks_core::ingredient::Speed;
use mixworks_core::session::Session;
use mixworks_core::settings::SessionSettings;
use mixworks_core::weather::{
    GeoPoint, LocationProvider, WeatherError, WeatherObservation, WeatherProvider, WeatherReport,
};
use std::fmt;

/// Weather source that reports the same conditions everywhere.
#[derive(Debug, Clone)]
pub struct StaticWeather {
    report: WeatherReport,
}

impl StaticWeather {
    pub fn new(temperature_c: f64, description: impl Into<String>) -> Self {
        Self {
            report: WeatherReport {
                temperature_c,
                feels_like_c: temperature_c,
                humidity: 50.0,
                wind_speed: 0.0,
                description: description.into(),
                icon: "01d".to_string(),
            },
        }
    }
}

impl WeatherProvider for StaticWeather {
    fn current_weather(&self, _at: GeoPoint) -> Result<WeatherReport, WeatherError> {
        Ok(self.report.clone())
    }
}

impl LocationProvider for StaticWeather {
    fn current_location(&self) -> Result<GeoPoint, WeatherError> {
        Ok(GeoPoint::new(0.0, 0.0))
    }
}

#[derive(Debug, Clone)]
pub struct ScriptOptions {
    pub hall: u32,
    pub pots: usize,
    pub ingredients_per_pot: usize,
    pub temperature_c: f64,
    pub description: String,
    pub grid_size: usize,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            hall: 1,
            pots: 6,
            ingredients_per_pot: 3,
            temperature_c: 18.0,
            description: "clear sky".to_string(),
            grid_size: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PotSummary {
    pub pot: PotId,
    pub speed: Option<Speed>,
    pub ingredients: usize,
    pub processed: bool,
    pub mixed_color: Option<Rgb>,
    pub triadic: Option<[Hsl; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptReport {
    pub hall: HallId,
    pub weather: WeatherObservation,
    pub machines: Vec<String>,
    pub rejected_machines: usize,
    pub rejected_ingredients: usize,
    pub pots: Vec<PotSummary>,
    pub finished_at: Millis,
    pub grid_filled: usize,
}

impl fmt::Display for ScriptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Hall {} | {}°C, {} ===",
            self.hall, self.weather.temperature_c, self.weather.description
        )?;
        for line in &self.machines {
            writeln!(f, "  {line}")?;
        }
        if self.rejected_machines > 0 {
            writeln!(f, "  ({} machine(s) refused by the heat cap)", self.rejected_machines)?;
        }
        for pot in &self.pots {
            let speed = pot.speed.map_or("-", Speed::as_str);
            let color = pot
                .mixed_color
                .map_or_else(|| "none".to_string(), |c| c.to_string());
            write!(
                f,
                "  {} [{speed}] {} ingredient(s), color {color}",
                pot.pot.external(),
                pot.ingredients
            )?;
            match (pot.processed, pot.triadic) {
                (true, Some([a, b])) => writeln!(f, ", triadic {a} / {b}")?,
                (true, None) => writeln!(f, ", processed")?,
                (false, _) => writeln!(f, ", not processed")?,
            }
        }
        writeln!(
            f,
            "  {} ingredient(s) rejected, finished at {} ms, {} grid cell(s) filled",
            self.rejected_ingredients, self.finished_at, self.grid_filled
        )
    }
}

/// Run the script on a fresh session built from `settings`.
pub fn run_script(settings: SessionSettings, options: &ScriptOptions) -> Result<ScriptReport, DemoError> {
    let hall = HallId(options.hall);
    if !settings.halls.iter().any(|h| h.id == hall) {
        return Err(DemoError::UnknownHall(options.hall));
    }
    let mut session = Session::new(settings)?;
    session.switch_hall(hall);

    let weather = StaticWeather::new(options.temperature_c, options.description.clone());
    let observation = session.refresh_weather(&weather, &weather)?.observation();

    let mut rejected_machines = 0;
    for speed in Speed::ALL {
        match session.create_machine(speed, Some(&observation)) {
            Ok(_) => {}
            Err(err) if err.is_rejection() => {
                tracing::info!(%speed, error = %err, "machine refused");
                rejected_machines += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    let mut rejected_ingredients = 0;
    let mut pots = Vec::with_capacity(options.pots);
    for _ in 0..options.pots {
        let pot = session.create_pot();
        for _ in 0..options.ingredients_per_pot.max(1) {
            let ingredient = session.create_random_ingredient();
            match session.drop_ingredient(&ingredient.external(), &pot.external()) {
                Ok(()) => {}
                Err(err) if err.is_rejection() => rejected_ingredients += 1,
                Err(err) => return Err(err.into()),
            }
        }
        pots.push(pot);
    }

    for &pot in &pots {
        let speed = session.store().pot(pot).and_then(|p| p.speed());
        let target = session
            .store()
            .machines_in_hall(hall)
            .find(|m| Some(m.speed()) == speed && m.is_enabled())
            .map(|m| m.id());
        match target {
            Some(machine) => {
                session.assign_pot_id(pot, machine)?;
            }
            None => tracing::info!(pot = %pot.external(), "no machine for this pot"),
        }
    }

    let machines: Vec<_> = session.store().machines_in_hall(hall).map(|m| m.id()).collect();
    for machine in machines {
        if session.store().pots_in_machine(machine).is_empty() {
            continue;
        }
        if let Err(err) = session.start_machine(machine) {
            tracing::warn!(machine = machine.0, error = %err, "machine did not start");
        }
    }
    session.run_until_idle();

    session.create_grid(options.grid_size)?;
    let mut cell = 0;
    for &pot in &pots {
        if cell >= session.grid().len() {
            break;
        }
        if session.place_in_grid(cell, pot).is_ok() {
            cell += 1;
        }
    }

    let summaries = pots
        .iter()
        .filter_map(|&pot| session.inspect_pot(pot))
        .map(|inspection| PotSummary {
            pot: inspection.pot,
            speed: inspection.speed,
            ingredients: inspection.ingredient_count,
            processed: inspection.processed,
            mixed_color: inspection.mixed_color,
            triadic: inspection.harmony.map(|h| h.triadic),
        })
        .collect();

    session.deliver_events();
    Ok(ScriptReport {
        hall,
        weather: observation,
        machines: session
            .store()
            .machines_in_hall(hall)
            .map(|m| m.status_line())
            .collect(),
        rejected_machines,
        rejected_ingredients,
        pots: summaries,
        finished_at: session.now(),
        grid_filled: session.grid().filled().count(),
    })
}
