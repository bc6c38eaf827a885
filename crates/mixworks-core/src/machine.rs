//! Machines: speed-specific processors that run batches of pots.
//!
//! A machine is either idle or busy. Starting a batch computes one duration
//! per pending pot and marks the machine busy; the owner schedules the
//! completions and reports each one back through [`Machine::complete_pot`].
//! The machine does not own its pots; it only keeps their ids in hold order.

use crate::fixed::Millis;
use crate::id::{HallId, MachineId, PotId};
use crate::ingredient::Speed;
use crate::pot::Pot;
use crate::timing::{SpeedCosts, TimeFactor, processing_duration};
use crate::weather::WeatherObservation;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    #[error("pot speed {pot:?} does not match machine speed {machine}")]
    SpeedMismatch { machine: Speed, pot: Option<Speed> },
    #[error("machine {0} is already processing")]
    Busy(MachineId),
    #[error("machine {0} holds no pots")]
    NoPots(MachineId),
    #[error("every pot in machine {0} is already processed")]
    NoPendingPots(MachineId),
    #[error("machine {0} is disabled")]
    Disabled(MachineId),
}

/// Outcome of [`Machine::check_assign`] when the pot is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignCheck {
    /// The pot is new to this machine.
    Accept,
    /// The pot is already held; assigning again changes nothing.
    AlreadyAssigned,
}

/// One pot's share of a started batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PotJob {
    pub pot: PotId,
    pub duration_ms: Millis,
}

#[derive(Debug, Clone)]
pub struct Machine {
    id: MachineId,
    speed: Speed,
    mix_time_ms: Millis,
    hall: HallId,
    busy: bool,
    enabled: bool,
    weather: Option<WeatherObservation>,
    pots: Vec<PotId>,
    in_flight: usize,
}

impl Machine {
    pub fn new(id: MachineId, speed: Speed, mix_time_ms: Millis, hall: HallId) -> Self {
        Self {
            id,
            speed,
            mix_time_ms,
            hall,
            busy: false,
            enabled: true,
            weather: None,
            pots: Vec::new(),
            in_flight: 0,
        }
    }

    pub fn id(&self) -> MachineId {
        self.id
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn mix_time_ms(&self) -> Millis {
        self.mix_time_ms
    }

    pub fn hall(&self) -> HallId {
        self.hall
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Pot ids in the order they were assigned.
    pub fn pots(&self) -> &[PotId] {
        &self.pots
    }

    pub fn holds(&self, pot: PotId) -> bool {
        self.pots.contains(&pot)
    }

    pub fn weather(&self) -> Option<&WeatherObservation> {
        self.weather.as_ref()
    }

    pub fn set_weather(&mut self, weather: WeatherObservation) {
        self.weather = Some(weather);
    }

    /// Weather surcharge in effect, if an observation is known.
    pub fn time_factor(&self) -> Option<TimeFactor> {
        self.weather.as_ref().map(TimeFactor::for_weather)
    }

    pub fn time_factor_label(&self) -> Option<&'static str> {
        self.time_factor().and_then(TimeFactor::label)
    }

    /// Completions still outstanding for the running batch.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Whether `pot` may be assigned here.
    pub fn check_assign(&self, pot: &Pot) -> Result<AssignCheck, MachineError> {
        if pot.speed() != Some(self.speed) {
            return Err(MachineError::SpeedMismatch {
                machine: self.speed,
                pot: pot.speed(),
            });
        }
        if self.holds(pot.id()) {
            return Ok(AssignCheck::AlreadyAssigned);
        }
        Ok(AssignCheck::Accept)
    }

    pub(crate) fn hold(&mut self, pot: PotId) {
        if !self.holds(pot) {
            self.pots.push(pot);
        }
    }

    pub(crate) fn release(&mut self, pot: PotId) -> bool {
        let before = self.pots.len();
        self.pots.retain(|&p| p != pot);
        self.pots.len() != before
    }

    /// Processing duration for one pot on this machine.
    pub fn duration_for(&self, pot: &Pot, costs: &SpeedCosts) -> Millis {
        processing_duration(
            pot.ingredients(),
            self.mix_time_ms,
            costs,
            self.weather.as_ref(),
        )
    }

    fn guard_start(&self) -> Result<(), MachineError> {
        if self.busy {
            return Err(MachineError::Busy(self.id));
        }
        if !self.enabled {
            return Err(MachineError::Disabled(self.id));
        }
        Ok(())
    }

    /// Start a batch over every held pot that is not yet processed.
    ///
    /// `lookup` resolves held ids to pots; ids it cannot resolve are skipped.
    /// On success the machine is busy until every returned job has been
    /// reported through [`complete_pot`](Self::complete_pot).
    pub fn start_batch<'a>(
        &mut self,
        lookup: impl Fn(PotId) -> Option<&'a Pot>,
        costs: &SpeedCosts,
    ) -> Result<Vec<PotJob>, MachineError> {
        self.guard_start()?;
        if self.pots.is_empty() {
            return Err(MachineError::NoPots(self.id));
        }
        let jobs: Vec<PotJob> = self
            .pots
            .iter()
            .filter_map(|&id| lookup(id))
            .filter(|pot| !pot.is_processed())
            .map(|pot| PotJob {
                pot: pot.id(),
                duration_ms: self.duration_for(pot, costs),
            })
            .collect();
        if jobs.is_empty() {
            return Err(MachineError::NoPendingPots(self.id));
        }
        self.busy = true;
        self.in_flight = jobs.len();
        tracing::debug!(machine = self.id.0, pots = jobs.len(), "batch started");
        Ok(jobs)
    }

    /// Start processing a single pot, held or not.
    pub fn start_single(&mut self, pot: &Pot, costs: &SpeedCosts) -> Result<PotJob, MachineError> {
        self.guard_start()?;
        let job = PotJob {
            pot: pot.id(),
            duration_ms: self.duration_for(pot, costs),
        };
        self.busy = true;
        self.in_flight = 1;
        tracing::debug!(machine = self.id.0, pot = pot.id().0, "single pot started");
        Ok(job)
    }

    /// Record one finished job. Returns `true` when it was the last one and
    /// the machine is idle again.
    pub fn complete_pot(&mut self) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 && self.busy {
            self.busy = false;
            tracing::debug!(machine = self.id.0, "machine idle");
            return true;
        }
        false
    }

    /// One-line summary, e.g. `Machine #3 (speed: easy) | 21.5°C, clear sky`.
    pub fn status_line(&self) -> String {
        let mut line = format!("Machine #{} (speed: {})", self.id, self.speed);
        if let Some(w) = &self.weather {
            let _ = write!(line, " | {}°C, {}", w.temperature_c, w.description);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IngredientId;
    use crate::ingredient::{Ingredient, IngredientSpec, StandardIngredientFactory, Structure};
    use std::rc::Rc;

    fn pot_with(id: u32, speeds: &[Speed]) -> Pot {
        let mut pot = Pot::new(PotId(id), Rc::new(StandardIngredientFactory));
        for (i, &speed) in speeds.iter().enumerate() {
            pot.add_ingredient(Ingredient::new(
                IngredientId(id * 100 + i as u32),
                IngredientSpec::new("#808080", Structure::Grain, speed),
            ))
            .unwrap();
        }
        pot
    }

    fn machine(speed: Speed) -> Machine {
        Machine::new(MachineId(1), speed, 1000, HallId(1))
    }

    #[test]
    fn assign_gate_checks_speed() {
        let m = machine(Speed::Easy);
        assert_eq!(
            m.check_assign(&pot_with(1, &[Speed::Easy])),
            Ok(AssignCheck::Accept)
        );
        assert_eq!(
            m.check_assign(&pot_with(2, &[Speed::Hard])),
            Err(MachineError::SpeedMismatch {
                machine: Speed::Easy,
                pot: Some(Speed::Hard)
            })
        );
    }

    #[test]
    fn empty_pot_never_matches() {
        let m = machine(Speed::Easy);
        assert!(matches!(
            m.check_assign(&pot_with(1, &[])),
            Err(MachineError::SpeedMismatch { pot: None, .. })
        ));
    }

    #[test]
    fn assigning_twice_is_a_no_op() {
        let mut m = machine(Speed::Easy);
        let pot = pot_with(1, &[Speed::Easy]);
        m.hold(pot.id());
        assert_eq!(m.check_assign(&pot), Ok(AssignCheck::AlreadyAssigned));
        m.hold(pot.id());
        assert_eq!(m.pots(), &[PotId(1)]);
    }

    #[test]
    fn start_refuses_without_pots() {
        let mut m = machine(Speed::Easy);
        let err = m.start_batch(|_| None, &SpeedCosts::default()).unwrap_err();
        assert_eq!(err, MachineError::NoPots(MachineId(1)));
        assert!(!m.is_busy());
    }

    #[test]
    fn batch_runs_until_last_completion() {
        let mut m = machine(Speed::Easy);
        let a = pot_with(1, &[Speed::Easy, Speed::Easy]);
        let b = pot_with(2, &[Speed::Easy]);
        m.hold(a.id());
        m.hold(b.id());
        let pots = [&a, &b];
        let jobs = m
            .start_batch(
                |id| pots.iter().copied().find(|p| p.id() == id),
                &SpeedCosts::default(),
            )
            .unwrap();
        assert_eq!(
            jobs,
            vec![
                PotJob { pot: PotId(1), duration_ms: 5000 },
                PotJob { pot: PotId(2), duration_ms: 3000 },
            ]
        );
        assert!(m.is_busy());
        assert_eq!(
            m.start_batch(|_| None, &SpeedCosts::default()),
            Err(MachineError::Busy(MachineId(1)))
        );
        assert!(!m.complete_pot());
        assert!(m.is_busy());
        assert!(m.complete_pot());
        assert!(!m.is_busy());
    }

    #[test]
    fn processed_pots_are_left_out() {
        let mut m = machine(Speed::Easy);
        let mut done = pot_with(1, &[Speed::Easy]);
        done.mark_processed();
        m.hold(done.id());
        let err = m
            .start_batch(|id| (id == done.id()).then_some(&done), &SpeedCosts::default())
            .unwrap_err();
        assert_eq!(err, MachineError::NoPendingPots(MachineId(1)));
        assert!(!m.is_busy());
    }

    #[test]
    fn weather_scales_durations() {
        let mut m = machine(Speed::Easy);
        m.set_weather(WeatherObservation::new(-5.0, "light rain"));
        let pot = pot_with(1, &[Speed::Easy, Speed::Easy]);
        assert_eq!(m.duration_for(&pot, &SpeedCosts::default()), 5500);
        assert_eq!(m.time_factor_label(), Some("+10% mix time"));
    }

    #[test]
    fn disabled_machine_refuses_to_start() {
        let mut m = machine(Speed::Easy);
        m.set_enabled(false);
        let pot = pot_with(1, &[Speed::Easy]);
        assert_eq!(
            m.start_single(&pot, &SpeedCosts::default()),
            Err(MachineError::Disabled(MachineId(1)))
        );
    }

    #[test]
    fn single_pot_path() {
        let mut m = machine(Speed::Hard);
        let pot = pot_with(1, &[Speed::Hard]);
        let job = m.start_single(&pot, &SpeedCosts::default()).unwrap();
        assert_eq!(job.duration_ms, 16000);
        assert!(m.is_busy());
        assert!(m.complete_pot());
        assert!(!m.is_busy());
    }

    #[test]
    fn status_line_includes_weather() {
        let mut m = machine(Speed::Medium);
        assert_eq!(m.status_line(), "Machine #1 (speed: medium)");
        m.set_weather(WeatherObservation::new(21.5, "clear sky"));
        assert_eq!(m.status_line(), "Machine #1 (speed: medium) | 21.5°C, clear sky");
    }
}
