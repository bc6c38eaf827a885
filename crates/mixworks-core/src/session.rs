//! The user-action layer.
//!
//! A [`Session`] owns the store, the virtual clock, the event bus and the
//! RNG, and turns each user action into validated store mutations plus
//! events. Deferred work (pot completions) is scheduled on the virtual
//! clock and runs when the caller advances it with [`Session::advance`].
//!
//! Rejections come back as `Err` and are also emitted as `*Rejected`
//! events, so a presentation layer can react to either.

use crate::color::{ColorHarmony, ColorResolver, CssColorResolver, Rgb};
use crate::event::{Event, EventBus};
use crate::fixed::Millis;
use crate::grid::{ColorGrid, GridCell, GridError};
use crate::hall::HallLocation;
use crate::id::{HallId, IngredientId, MachineId, PotId};
use crate::ingredient::{IngredientFactory, IngredientSpec, Speed, StandardIngredientFactory};
use crate::machine::{AssignCheck, PotJob};
use crate::rng::SimRng;
use crate::scheduler::Scheduler;
use crate::settings::SessionSettings;
use crate::store::{Store, StoreError};
use crate::weather::{
    LocationProvider, WeatherError, WeatherObservation, WeatherProvider, WeatherReport,
};
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("'{0}' does not name an existing pot or ingredient")]
    UnknownReference(String),
    #[error("cannot create another machine in hall {hall}: {temperature_c}°C is above the heat cap")]
    HeatCap { hall: HallId, temperature_c: f64 },
    #[error("pot {0:?} has not been processed")]
    PotNotProcessed(PotId),
    #[error("pot {0:?} has no resolvable mixed color")]
    NoMixedColor(PotId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Weather(#[from] WeatherError),
    #[error(transparent)]
    Grid(#[from] GridError),
}

impl SessionError {
    /// Whether this is an ordinary user-facing refusal (wrong speed, busy
    /// machine, heat cap, ...) rather than a bad reference or an outage.
    pub fn is_rejection(&self) -> bool {
        match self {
            SessionError::HeatCap { .. }
            | SessionError::PotNotProcessed(_)
            | SessionError::NoMixedColor(_) => true,
            SessionError::Store(err) => matches!(
                err,
                StoreError::Pot(_)
                    | StoreError::Machine(_)
                    | StoreError::PotAlreadyPlaced { .. }
                    | StoreError::NoActiveHall
                    | StoreError::DuplicateHall(_)
            ),
            SessionError::UnknownReference(_)
            | SessionError::Weather(_)
            | SessionError::Grid(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Deferred work and inspection results
// ---------------------------------------------------------------------------

/// Payload of a scheduled pot completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Batch { machine: MachineId, pot: PotId },
    Single { machine: MachineId, pot: PotId },
}

/// What a user sees when inspecting a pot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotInspection {
    pub pot: PotId,
    pub speed: Option<Speed>,
    pub ingredient_count: usize,
    pub processed: bool,
    pub mixed_color: Option<Rgb>,
    /// Only for processed pots with a resolvable color.
    pub harmony: Option<ColorHarmony>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session {
    settings: SessionSettings,
    store: Store,
    scheduler: Scheduler<Completion>,
    events: EventBus,
    rng: SimRng,
    resolver: Box<dyn ColorResolver>,
    grid: ColorGrid,
    weather: Option<WeatherReport>,
    last_weather_attempt: Option<Millis>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("now", &self.scheduler.now())
            .field("store", &self.store)
            .field("pending", &self.scheduler.pending())
            .field("weather", &self.weather)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(settings: SessionSettings) -> Result<Self, SessionError> {
        Self::with_factory(settings, Rc::new(StandardIngredientFactory))
    }

    /// Build a session whose pots materialize ingredients through `factory`.
    pub fn with_factory(
        settings: SessionSettings,
        factory: Rc<dyn IngredientFactory>,
    ) -> Result<Self, SessionError> {
        let mut store = Store::new(factory);
        for hall in &settings.halls {
            store.create_hall(hall.id, hall.name.clone(), hall.location)?;
        }
        store.switch_hall(settings.initial_hall);
        Ok(Self {
            scheduler: Scheduler::new(),
            events: EventBus::new(settings.event_history),
            rng: SimRng::new(settings.rng_seed),
            resolver: Box::new(CssColorResolver),
            grid: ColorGrid::default(),
            weather: None,
            last_weather_attempt: None,
            store,
            settings,
        })
    }

    /// Replace the resolver used for named and other non-RGB colors.
    pub fn set_color_resolver(&mut self, resolver: Box<dyn ColorResolver>) {
        self.resolver = resolver;
    }

    // -- Accessors --

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Hand queued events to listeners.
    pub fn deliver_events(&mut self) -> usize {
        self.events.deliver()
    }

    /// Current virtual time.
    pub fn now(&self) -> Millis {
        self.scheduler.now()
    }

    /// Completions still waiting on the clock.
    pub fn pending_completions(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn next_completion(&self) -> Option<Millis> {
        self.scheduler.next_due()
    }

    /// Last successfully fetched report.
    pub fn weather(&self) -> Option<&WeatherReport> {
        self.weather.as_ref()
    }

    pub fn grid(&self) -> &ColorGrid {
        &self.grid
    }

    // -- Ingredients and pots --

    pub fn create_ingredient(&mut self, spec: IngredientSpec) -> IngredientId {
        let id = self.store.create_ingredient(spec).id();
        self.events.emit(Event::IngredientCreated {
            ingredient: id,
            at: self.now(),
        });
        id
    }

    /// Random hue, structure and speed in the configured style.
    pub fn create_random_ingredient(&mut self) -> IngredientId {
        let spec = IngredientSpec::random(&mut self.rng, &self.settings.ingredient_style);
        self.create_ingredient(spec)
    }

    pub fn create_pot(&mut self) -> PotId {
        let id = self.store.create_pot();
        self.events.emit(Event::PotCreated {
            pot: id,
            at: self.now(),
        });
        id
    }

    /// The drag-and-drop path: both ends are composite ids. The ingredient
    /// is rebuilt through the pot's factory with the drop minimum time.
    pub fn drop_ingredient(&mut self, ingredient_ref: &str, pot_ref: &str) -> Result<(), SessionError> {
        let ingredient = self
            .store
            .ingredient_by_external_id(ingredient_ref)
            .map(|i| i.id())
            .ok_or_else(|| SessionError::UnknownReference(ingredient_ref.to_string()))?;
        let pot = self
            .store
            .pot_by_external_id(pot_ref)
            .map(|p| p.id())
            .ok_or_else(|| SessionError::UnknownReference(pot_ref.to_string()))?;
        let result =
            self.store
                .drop_ingredient_into_pot(ingredient, pot, self.settings.drop_min_time_ms);
        self.finish_pot_update(ingredient, pot, result)
    }

    pub fn add_ingredient_to_pot(
        &mut self,
        ingredient: IngredientId,
        pot: PotId,
    ) -> Result<(), SessionError> {
        let result = self.store.add_ingredient_to_pot(ingredient, pot);
        self.finish_pot_update(ingredient, pot, result)
    }

    fn finish_pot_update(
        &mut self,
        ingredient: IngredientId,
        pot: PotId,
        result: Result<(), StoreError>,
    ) -> Result<(), SessionError> {
        let at = self.now();
        match result {
            Ok(()) => {
                self.events.emit(Event::PotUpdated {
                    pot,
                    ingredient,
                    at,
                });
                Ok(())
            }
            Err(err) => {
                if let StoreError::Pot(reason) = &err {
                    tracing::debug!(pot = pot.0, ingredient = ingredient.0, %reason, "ingredient rejected");
                    self.events.emit(Event::IngredientRejected {
                        pot,
                        ingredient,
                        reason: reason.to_string(),
                        at,
                    });
                }
                Err(err.into())
            }
        }
    }

    // -- Machines --

    /// Create a machine in the active hall.
    ///
    /// Above the heat cap a hall that already has a machine gets no more.
    /// The observation, when given, is handed to the new machine.
    pub fn create_machine(
        &mut self,
        speed: Speed,
        weather: Option<&WeatherObservation>,
    ) -> Result<MachineId, SessionError> {
        let at = self.now();
        let hall_id = self.store.active_hall_id();
        let Some(hall) = self.store.active_hall() else {
            let err = StoreError::NoActiveHall;
            self.events.emit(Event::MachineRejected {
                hall: hall_id,
                reason: err.to_string(),
                at,
            });
            return Err(err.into());
        };
        let hall = hall.id();
        let hot = weather.filter(|w| w.temperature_c > self.settings.heat_cap_celsius);
        if let Some(w) = hot
            && self.store.machines_in_hall(hall).next().is_some()
        {
            let err = SessionError::HeatCap {
                hall,
                temperature_c: w.temperature_c,
            };
            tracing::debug!(hall = hall.0, temperature = w.temperature_c, "heat cap reached");
            self.events.emit(Event::MachineRejected {
                hall: Some(hall),
                reason: err.to_string(),
                at,
            });
            return Err(err);
        }

        let id = self
            .store
            .add_machine(speed, self.settings.default_mix_time_ms)?;
        if let Some(w) = weather
            && let Some(machine) = self.store.machine_mut(id)
        {
            machine.set_weather(w.clone());
        }
        if hot.is_some() {
            self.apply_heat_throttle(hall, true);
        }
        self.events.emit(Event::MachineCreated {
            machine: id,
            hall,
            speed,
            at,
        });
        Ok(id)
    }

    pub fn create_random_machine(
        &mut self,
        weather: Option<&WeatherObservation>,
    ) -> Result<MachineId, SessionError> {
        let speed = self.rng.pick(&Speed::ALL).copied().unwrap_or(Speed::Easy);
        self.create_machine(speed, weather)
    }

    /// While hot, only the first machine of a hall may start new work.
    fn apply_heat_throttle(&mut self, hall: HallId, hot: bool) {
        let machines: Vec<MachineId> = self.store.machines_in_hall(hall).map(|m| m.id()).collect();
        for (index, id) in machines.into_iter().enumerate() {
            if let Some(machine) = self.store.machine_mut(id) {
                machine.set_enabled(!hot || index == 0);
            }
        }
    }

    /// Put a pot (by composite id) into a machine.
    pub fn assign_pot(&mut self, pot_ref: &str, machine: MachineId) -> Result<AssignCheck, SessionError> {
        let pot = self
            .store
            .pot_by_external_id(pot_ref)
            .map(|p| p.id())
            .ok_or_else(|| SessionError::UnknownReference(pot_ref.to_string()))?;
        self.assign_pot_id(pot, machine)
    }

    pub fn assign_pot_id(&mut self, pot: PotId, machine: MachineId) -> Result<AssignCheck, SessionError> {
        let at = self.now();
        match self.store.assign_pot(pot, machine) {
            Ok(check) => {
                if check == AssignCheck::Accept {
                    self.events.emit(Event::PotAssigned { pot, machine, at });
                }
                Ok(check)
            }
            Err(err) => {
                self.events.emit(Event::AssignRejected {
                    pot,
                    machine,
                    reason: err.to_string(),
                    at,
                });
                Err(err.into())
            }
        }
    }

    /// Start a batch over the machine's unprocessed pots.
    pub fn start_machine(&mut self, machine: MachineId) -> Result<Vec<PotJob>, SessionError> {
        let costs = self.settings.speed_costs;
        let (m, pots) = self
            .store
            .machine_and_pots(machine)
            .ok_or(StoreError::UnknownMachine(machine))?;
        let jobs = m
            .start_batch(|id| pots.get(&id), &costs)
            .map_err(StoreError::from)?;
        for job in &jobs {
            self.scheduler
                .schedule(job.duration_ms, Completion::Batch { machine, pot: job.pot });
        }
        let duration_ms = jobs.iter().map(|j| j.duration_ms).max().unwrap_or(0);
        self.events.emit(Event::ProcessingStarted {
            machine,
            pots: jobs.iter().map(|j| j.pot).collect(),
            duration_ms,
            at: self.now(),
        });
        Ok(jobs)
    }

    /// Process one pot on a machine, outside any batch.
    pub fn process_single_pot(&mut self, machine: MachineId, pot: PotId) -> Result<PotJob, SessionError> {
        let costs = self.settings.speed_costs;
        let (m, pots) = self
            .store
            .machine_and_pots(machine)
            .ok_or(StoreError::UnknownMachine(machine))?;
        let p = pots.get(&pot).ok_or(StoreError::UnknownPot(pot))?;
        let job = m.start_single(p, &costs).map_err(StoreError::from)?;
        self.scheduler
            .schedule(job.duration_ms, Completion::Single { machine, pot });
        self.events.emit(Event::ProcessingStarted {
            machine,
            pots: vec![pot],
            duration_ms: job.duration_ms,
            at: self.now(),
        });
        Ok(job)
    }

    // -- Time --

    /// Move the virtual clock forward and apply every completion that came
    /// due, then deliver queued events. Returns the pots that finished, in
    /// completion order.
    pub fn advance(&mut self, ms: Millis) -> Vec<PotId> {
        let fired = self.scheduler.advance_by(ms);
        let mut finished = Vec::with_capacity(fired.len());
        for task in fired {
            let (machine, pot, batch) = match task.payload {
                Completion::Batch { machine, pot } => (machine, pot, true),
                Completion::Single { machine, pot } => (machine, pot, false),
            };
            self.store.mark_pot_processed(pot);
            let idle = self
                .store
                .machine_mut(machine)
                .is_some_and(|m| m.complete_pot());
            let mixed_color = self
                .store
                .pot(pot)
                .and_then(|p| p.mixed_color_with(self.resolver.as_ref()));
            self.events.emit(Event::PotProcessed {
                machine,
                pot,
                mixed_color,
                at: task.due,
            });
            if idle && batch {
                tracing::info!(machine = machine.0, at = task.due, "batch completed");
                self.events.emit(Event::BatchCompleted {
                    machine,
                    at: task.due,
                });
            }
            finished.push(pot);
        }
        self.events.deliver();
        finished
    }

    /// Advance until nothing is scheduled.
    pub fn run_until_idle(&mut self) -> Vec<PotId> {
        let mut finished = Vec::new();
        while let Some(due) = self.scheduler.next_due() {
            let delta = due.saturating_sub(self.now());
            finished.extend(self.advance(delta));
        }
        finished
    }

    // -- Halls --

    pub fn switch_hall(&mut self, hall: HallId) {
        self.store.switch_hall(hall);
        self.events.emit(Event::HallSwitched {
            hall,
            at: self.now(),
        });
    }

    /// Flip between hall 1 and hall 2.
    pub fn toggle_hall(&mut self) -> HallId {
        let next = if self.store.active_hall_id() == Some(HallId(1)) {
            HallId(2)
        } else {
            HallId(1)
        };
        self.switch_hall(next);
        next
    }

    /// Location of the active hall, `None` without one.
    pub fn active_location(&self) -> Option<HallLocation> {
        self.store.active_hall().map(|h| h.location())
    }

    // -- Weather --

    /// Give every machine in every hall the observation.
    pub fn apply_weather(&mut self, observation: &WeatherObservation) {
        for machine in self.store.machines_mut() {
            machine.set_weather(observation.clone());
        }
        let hot = observation.temperature_c > self.settings.heat_cap_celsius;
        let halls: Vec<HallId> = self.store.halls().map(|h| h.id()).collect();
        for hall in halls {
            self.apply_heat_throttle(hall, hot);
        }
        self.events.emit(Event::WeatherUpdated {
            observation: observation.clone(),
            at: self.now(),
        });
    }

    /// Fetch fresh weather for the active hall and apply it.
    ///
    /// On failure machines keep their last-known observation and a
    /// `WeatherUnavailable` event carries the user message.
    pub fn refresh_weather(
        &mut self,
        provider: &dyn WeatherProvider,
        locator: &dyn LocationProvider,
    ) -> Result<WeatherReport, SessionError> {
        self.last_weather_attempt = Some(self.now());
        let fetched = match self.active_location() {
            Some(HallLocation::Fixed(point)) => provider.current_weather(point),
            Some(HallLocation::Local) | None => locator
                .current_location()
                .and_then(|point| provider.current_weather(point)),
        };
        match fetched {
            Ok(report) => {
                self.apply_weather(&report.observation());
                self.weather = Some(report.clone());
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(error = %err, "weather refresh failed");
                self.events.emit(Event::WeatherUnavailable {
                    message: err.user_message(),
                    at: self.now(),
                });
                Err(err.into())
            }
        }
    }

    /// Whether the refresh interval has elapsed since the last attempt.
    pub fn weather_refresh_due(&self) -> bool {
        self.last_weather_attempt.is_none_or(|last| {
            self.now().saturating_sub(last) >= self.settings.weather_refresh_interval_ms
        })
    }

    // -- Inspection --

    pub fn inspect_pot(&self, pot: PotId) -> Option<PotInspection> {
        let p = self.store.pot(pot)?;
        let mixed_color = p.mixed_color_with(self.resolver.as_ref());
        let harmony = mixed_color
            .filter(|_| p.is_processed())
            .map(ColorHarmony::of);
        Some(PotInspection {
            pot,
            speed: p.speed(),
            ingredient_count: p.ingredients().len(),
            processed: p.is_processed(),
            mixed_color,
            harmony,
        })
    }

    // -- Color grid --

    /// Replace the grid with an empty `size` x `size` one.
    /// Replace the grid with an empty `size` x `size` one. A size above
    /// [`MAX_GRID_SIZE`](crate::grid::MAX_GRID_SIZE) leaves the old grid.
    pub fn create_grid(&mut self, size: usize) -> Result<&ColorGrid, SessionError> {
        self.grid = ColorGrid::new(size)?;
        Ok(&self.grid)
    }

    /// Drop a processed pot's mixed color onto a grid cell.
    pub fn place_in_grid(&mut self, cell: usize, pot: PotId) -> Result<&GridCell, SessionError> {
        let p = self.store.pot(pot).ok_or(StoreError::UnknownPot(pot))?;
        if !p.is_processed() {
            return Err(SessionError::PotNotProcessed(pot));
        }
        let color = p
            .mixed_color_with(self.resolver.as_ref())
            .ok_or(SessionError::NoMixedColor(pot))?;
        Ok(self.grid.place(cell, color)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::ingredient::Structure;
    use crate::machine::MachineError;
    use crate::weather::GeoPoint;
    use std::cell::Cell;

    fn session() -> Session {
        Session::new(SessionSettings::default()).unwrap()
    }

    fn easy_pot(s: &mut Session, colors: &[&str]) -> PotId {
        let pot = s.create_pot();
        for color in colors {
            let ing = s.create_ingredient(IngredientSpec::new(*color, Structure::Grain, Speed::Easy));
            s.add_ingredient_to_pot(ing, pot).unwrap();
        }
        pot
    }

    struct FixedWeather(Result<WeatherReport, WeatherError>, Cell<Option<GeoPoint>>);

    impl WeatherProvider for FixedWeather {
        fn current_weather(&self, at: GeoPoint) -> Result<WeatherReport, WeatherError> {
            self.1.set(Some(at));
            self.0.clone()
        }
    }

    struct Here(Result<GeoPoint, WeatherError>);

    impl LocationProvider for Here {
        fn current_location(&self) -> Result<GeoPoint, WeatherError> {
            self.0.clone()
        }
    }

    fn report(temp: f64, description: &str) -> WeatherReport {
        WeatherReport {
            temperature_c: temp,
            feels_like_c: temp,
            humidity: 50.0,
            wind_speed: 1.0,
            description: description.into(),
            icon: "01d".into(),
        }
    }

    #[test]
    fn duplicate_halls_in_settings_fail() {
        let mut settings = SessionSettings::default();
        settings.halls.push(settings.halls[0].clone());
        assert_eq!(
            Session::new(settings).unwrap_err(),
            SessionError::Store(StoreError::DuplicateHall(HallId(1)))
        );
    }

    #[test]
    fn batch_marks_every_pot_once_and_frees_the_machine() {
        let mut s = session();
        let m = s.create_machine(Speed::Easy, None).unwrap();
        let a = easy_pot(&mut s, &["rgb(255,0,0)", "rgb(0,255,0)"]);
        let b = easy_pot(&mut s, &["#0000ff"]);
        s.assign_pot_id(a, m).unwrap();
        s.assign_pot_id(b, m).unwrap();

        let jobs = s.start_machine(m).unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(s.store().machine(m).unwrap().is_busy());

        assert_eq!(s.advance(3000), vec![b]);
        assert!(s.store().machine(m).unwrap().is_busy());
        assert_eq!(s.advance(2000), vec![a]);
        assert!(!s.store().machine(m).unwrap().is_busy());
        assert!(s.store().pot(a).unwrap().is_processed());
        assert_eq!(s.events().total_emitted(EventKind::PotProcessed), 2);
        assert_eq!(s.events().total_emitted(EventKind::BatchCompleted), 1);

        assert_eq!(
            s.start_machine(m).unwrap_err(),
            SessionError::Store(StoreError::Machine(MachineError::NoPendingPots(m)))
        );
    }

    #[test]
    fn busy_machine_refuses_and_accepts_new_pots() {
        let mut s = session();
        let m = s.create_machine(Speed::Easy, None).unwrap();
        let a = easy_pot(&mut s, &["red"]);
        s.assign_pot_id(a, m).unwrap();
        s.start_machine(m).unwrap();
        let err = s.start_machine(m).unwrap_err();
        assert!(err.is_rejection());
        let b = easy_pot(&mut s, &["blue"]);
        assert_eq!(s.assign_pot_id(b, m), Ok(AssignCheck::Accept));
        s.run_until_idle();
        assert!(!s.store().pot(b).unwrap().is_processed());
        s.start_machine(m).unwrap();
        assert_eq!(s.run_until_idle(), vec![b]);
    }

    #[test]
    fn heat_cap_allows_only_the_first_machine() {
        let mut s = session();
        let hot = WeatherObservation::new(40.0, "clear sky");
        let first = s.create_machine(Speed::Easy, Some(&hot)).unwrap();
        let err = s.create_machine(Speed::Easy, Some(&hot)).unwrap_err();
        assert_eq!(
            err,
            SessionError::HeatCap {
                hall: HallId(1),
                temperature_c: 40.0
            }
        );
        assert!(err.is_rejection());
        assert_eq!(s.store().machines().count(), 1);
        assert_eq!(s.events().total_emitted(EventKind::MachineRejected), 1);
        assert_eq!(
            s.store().machine(first).unwrap().weather(),
            Some(&hot)
        );

        // Another hall is unaffected.
        s.switch_hall(HallId(2));
        assert!(s.create_machine(Speed::Easy, Some(&hot)).is_ok());
    }

    #[test]
    fn heat_throttle_disables_all_but_first_machine() {
        let mut s = session();
        let a = s.create_machine(Speed::Easy, None).unwrap();
        let b = s.create_machine(Speed::Easy, None).unwrap();
        s.apply_weather(&WeatherObservation::new(38.0, "clear sky"));
        assert!(s.store().machine(a).unwrap().is_enabled());
        assert!(!s.store().machine(b).unwrap().is_enabled());
        s.apply_weather(&WeatherObservation::new(20.0, "clear sky"));
        assert!(s.store().machine(b).unwrap().is_enabled());
    }

    #[test]
    fn machine_creation_without_active_hall_is_rejected() {
        let mut s = session();
        s.switch_hall(HallId(77));
        let err = s.create_machine(Speed::Hard, None).unwrap_err();
        assert_eq!(err, SessionError::Store(StoreError::NoActiveHall));
        assert_eq!(s.store().machines().count(), 0);
        assert!(s.store().check_consistency().is_empty());
    }

    #[test]
    fn drop_uses_composite_ids() {
        let mut s = session();
        let ing = s.create_ingredient(
            IngredientSpec::new("red", Structure::Slimy, Speed::Medium).with_min_time(5000),
        );
        let pot = s.create_pot();
        s.drop_ingredient(&ing.external(), &pot.external()).unwrap();
        let dropped = &s.store().pot(pot).unwrap().ingredients()[0];
        assert_eq!(dropped.min_time_ms(), 1000);

        assert_eq!(
            s.drop_ingredient("ingredient-99", "pot-1"),
            Err(SessionError::UnknownReference("ingredient-99".into()))
        );
        assert_eq!(
            s.drop_ingredient("ingredient-1", "machine-1"),
            Err(SessionError::UnknownReference("machine-1".into()))
        );
    }

    #[test]
    fn rejected_ingredient_emits_event() {
        let mut s = session();
        let pot = easy_pot(&mut s, &["red"]);
        let hard = s.create_ingredient(IngredientSpec::new("blue", Structure::Grain, Speed::Hard));
        let err = s.add_ingredient_to_pot(hard, pot).unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(s.events().total_emitted(EventKind::IngredientRejected), 1);
        assert_eq!(s.store().pot(pot).unwrap().ingredients().len(), 1);
    }

    #[test]
    fn toggle_flips_between_default_halls() {
        let mut s = session();
        assert_eq!(s.toggle_hall(), HallId(2));
        assert_eq!(
            s.active_location(),
            Some(HallLocation::Fixed(GeoPoint::new(24.7136, 46.6753)))
        );
        assert_eq!(s.toggle_hall(), HallId(1));
        assert_eq!(s.active_location(), Some(HallLocation::Local));
    }

    #[test]
    fn refresh_uses_fixed_location_for_hall_b() {
        let mut s = session();
        s.create_machine(Speed::Easy, None).unwrap();
        s.switch_hall(HallId(2));
        let provider = FixedWeather(Ok(report(-2.0, "light snow")), Cell::new(None));
        let locator = Here(Err(WeatherError::PermissionDenied));
        let got = s.refresh_weather(&provider, &locator).unwrap();
        assert_eq!(got.description, "light snow");
        assert_eq!(provider.1.get(), Some(GeoPoint::new(24.7136, 46.6753)));
        let m = s.store().machines().next().unwrap();
        assert_eq!(m.time_factor_label(), Some("+10% mix time"));
    }

    #[test]
    fn failed_refresh_keeps_last_known_weather() {
        let mut s = session();
        let m = s.create_machine(Speed::Easy, None).unwrap();
        let ok = FixedWeather(Ok(report(5.0, "clear")), Cell::new(None));
        let here = Here(Ok(GeoPoint::new(52.37, 4.9)));
        s.refresh_weather(&ok, &here).unwrap();
        assert_eq!(ok.1.get(), Some(GeoPoint::new(52.37, 4.9)));

        let denied = Here(Err(WeatherError::PermissionDenied));
        let err = s.refresh_weather(&ok, &denied).unwrap_err();
        assert_eq!(err, SessionError::Weather(WeatherError::PermissionDenied));
        assert!(!err.is_rejection());
        assert_eq!(
            s.store().machine(m).unwrap().weather(),
            Some(&WeatherObservation::new(5.0, "clear"))
        );
        assert_eq!(s.weather().map(|w| w.temperature_c), Some(5.0));
        let last = s.events().history_of(EventKind::WeatherUnavailable).last();
        assert!(matches!(
            last,
            Some(Event::WeatherUnavailable { message, .. }) if message == "Location access denied"
        ));
    }

    #[test]
    fn refresh_interval_follows_virtual_clock() {
        let mut s = session();
        assert!(s.weather_refresh_due());
        let provider = FixedWeather(Err(WeatherError::Timeout), Cell::new(None));
        let here = Here(Ok(GeoPoint::new(0.0, 0.0)));
        let _ = s.refresh_weather(&provider, &here);
        assert!(!s.weather_refresh_due());
        s.advance(299_999);
        assert!(!s.weather_refresh_due());
        s.advance(1);
        assert!(s.weather_refresh_due());
    }

    #[test]
    fn inspection_reports_harmony_only_when_processed() {
        let mut s = session();
        let m = s.create_machine(Speed::Easy, None).unwrap();
        let pot = easy_pot(&mut s, &["rgb(255,0,0)"]);
        let before = s.inspect_pot(pot).unwrap();
        assert_eq!(before.mixed_color, Some(Rgb::new(255, 0, 0)));
        assert_eq!(before.harmony, None);

        s.process_single_pot(m, pot).unwrap();
        s.run_until_idle();
        let after = s.inspect_pot(pot).unwrap();
        assert!(after.processed);
        let harmony = after.harmony.unwrap();
        assert_eq!(harmony.triadic_rgb, [Rgb::new(0, 255, 0), Rgb::new(0, 0, 255)]);
        assert!(s.inspect_pot(PotId(99)).is_none());
    }

    #[test]
    fn grid_accepts_only_processed_pots() {
        let mut s = session();
        let m = s.create_machine(Speed::Easy, None).unwrap();
        let pot = easy_pot(&mut s, &["#00ff00"]);
        assert_eq!(
            s.place_in_grid(0, pot).unwrap_err(),
            SessionError::PotNotProcessed(pot)
        );
        s.process_single_pot(m, pot).unwrap();
        s.run_until_idle();
        s.create_grid(3).unwrap();
        let cell = *s.place_in_grid(4, pot).unwrap();
        assert_eq!(cell.color, Rgb::new(0, 255, 0));
        assert!(matches!(
            s.place_in_grid(9, pot),
            Err(SessionError::Grid(GridError::OutOfBounds { index: 9, cells: 9 }))
        ));
    }

    #[test]
    fn oversized_grid_is_refused_and_old_grid_kept() {
        let mut s = session();
        s.create_grid(4).unwrap();
        for size in [usize::MAX, 1 << 33, crate::grid::MAX_GRID_SIZE + 1] {
            assert!(matches!(
                s.create_grid(size),
                Err(SessionError::Grid(GridError::TooLarge { .. }))
            ));
        }
        assert_eq!(s.grid().size(), 4);
    }

    #[test]
    fn advancing_delivers_so_the_queue_stays_bounded() {
        let mut s = session();
        let m = s.create_machine(Speed::Easy, None).unwrap();
        let delivered = Rc::new(Cell::new(0));
        let counter = Rc::clone(&delivered);
        s.events_mut()
            .on(EventKind::PotProcessed, Box::new(move |_| counter.set(counter.get() + 1)));
        for _ in 0..500 {
            let pot = easy_pot(&mut s, &["#123456"]);
            s.process_single_pot(m, pot).unwrap();
            s.run_until_idle();
            assert!(s.events().queued().is_empty());
        }
        assert_eq!(delivered.get(), 500);
        assert_eq!(s.events().undelivered_dropped(), 0);
        assert!(s.events().history().len() <= s.settings().event_history);
    }
}
