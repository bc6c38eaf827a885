//! The session store: every ingredient, pot, machine and hall, the active
//! hall, and the placement map recording which pots sit in which machine.
//!
//! Mutations that touch more than one collection validate everything first
//! and only then write, so a rejected call leaves the store unchanged.

use crate::fixed::Millis;
use crate::hall::{Hall, HallLocation, default_halls};
use crate::id::{HallId, IngredientId, MachineId, PotId};
use crate::ingredient::{Ingredient, IngredientFactory, IngredientSpec, Speed};
use crate::machine::{AssignCheck, Machine, MachineError};
use crate::pot::{Pot, PotError};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("hall {0} already exists")]
    DuplicateHall(HallId),
    #[error("no active hall")]
    NoActiveHall,
    #[error("unknown pot {0:?}")]
    UnknownPot(PotId),
    #[error("unknown ingredient {0:?}")]
    UnknownIngredient(IngredientId),
    #[error("unknown machine {0}")]
    UnknownMachine(MachineId),
    #[error("pot {pot:?} is already placed in machine {machine}")]
    PotAlreadyPlaced { pot: PotId, machine: MachineId },
    #[error(transparent)]
    Pot(#[from] PotError),
    #[error(transparent)]
    Machine(#[from] MachineError),
}

// ---------------------------------------------------------------------------
// Placement map
// ---------------------------------------------------------------------------

/// `MachineId -> ordered set of PotId`, plus the reverse index.
#[derive(Debug, Clone, Default)]
pub struct PlacementMap {
    by_machine: BTreeMap<MachineId, Vec<PotId>>,
    by_pot: HashMap<PotId, MachineId>,
}

impl PlacementMap {
    /// Create the (empty) entry for a machine. No-op if it exists.
    pub fn register_machine(&mut self, machine: MachineId) {
        self.by_machine.entry(machine).or_default();
    }

    /// Place `pot` in `machine`, clearing any previous placement.
    /// Returns `false` if it was already there.
    pub fn add(&mut self, pot: PotId, machine: MachineId) -> bool {
        match self.by_pot.get(&pot) {
            Some(&current) if current == machine => return false,
            Some(&current) => {
                self.remove(pot, current);
            }
            None => {}
        }
        self.by_machine.entry(machine).or_default().push(pot);
        self.by_pot.insert(pot, machine);
        true
    }

    /// Remove `pot` from `machine`. Returns `false` if it was not there.
    pub fn remove(&mut self, pot: PotId, machine: MachineId) -> bool {
        if self.by_pot.get(&pot) != Some(&machine) {
            return false;
        }
        self.by_pot.remove(&pot);
        if let Some(pots) = self.by_machine.get_mut(&machine) {
            pots.retain(|&p| p != pot);
        }
        true
    }

    /// Pots placed in `machine`, in placement order. Unknown machines have
    /// none.
    pub fn pots_in(&self, machine: MachineId) -> &[PotId] {
        self.by_machine.get(&machine).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn machine_of(&self, pot: PotId) -> Option<MachineId> {
        self.by_pot.get(&pot).copied()
    }

    pub fn machines(&self) -> impl Iterator<Item = MachineId> + '_ {
        self.by_machine.keys().copied()
    }

    pub fn placed_count(&self) -> usize {
        self.by_pot.len()
    }
}

// ---------------------------------------------------------------------------
// Consistency
// ---------------------------------------------------------------------------

/// A broken structural invariant, as reported by [`Store::check_consistency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    PlacedPotMissing { machine: MachineId, pot: PotId },
    PlacementMachineMissing(MachineId),
    PotPlacedTwice(PotId),
    ReverseIndexMismatch(PotId),
    MachineListMismatch(MachineId),
    MachineWithoutPlacementEntry(MachineId),
    MachineHallMissing { machine: MachineId, hall: HallId },
    MachineNotInHall { machine: MachineId, hall: HallId },
    HallListsUnknownMachine { hall: HallId, machine: MachineId },
    MachineInSeveralHalls(MachineId),
    MixedSpeedPot(PotId),
    PotSpeedMismatch { machine: MachineId, pot: PotId },
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct Store {
    factory: Rc<dyn IngredientFactory>,
    ingredients: BTreeMap<IngredientId, Ingredient>,
    pots: BTreeMap<PotId, Pot>,
    machines: BTreeMap<MachineId, Machine>,
    halls: BTreeMap<HallId, Hall>,
    active_hall: Option<HallId>,
    placements: PlacementMap,
    next_ingredient: u32,
    next_pot: u32,
    next_machine: u32,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("ingredients", &self.ingredients.len())
            .field("pots", &self.pots.len())
            .field("machines", &self.machines.len())
            .field("halls", &self.halls.keys().collect::<Vec<_>>())
            .field("active_hall", &self.active_hall)
            .field("placements", &self.placements)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// An empty store with no halls and no active hall.
    pub fn new(factory: Rc<dyn IngredientFactory>) -> Self {
        Self {
            factory,
            ingredients: BTreeMap::new(),
            pots: BTreeMap::new(),
            machines: BTreeMap::new(),
            halls: BTreeMap::new(),
            active_hall: None,
            placements: PlacementMap::default(),
            next_ingredient: 1,
            next_pot: 1,
            next_machine: 1,
        }
    }

    /// A store with the two default halls, hall 1 active.
    pub fn with_default_halls(factory: Rc<dyn IngredientFactory>) -> Self {
        let mut store = Self::new(factory);
        for hall in default_halls() {
            store.halls.insert(hall.id(), hall);
        }
        store.active_hall = Some(HallId(1));
        store
    }

    pub fn factory(&self) -> &Rc<dyn IngredientFactory> {
        &self.factory
    }

    // -- Halls --

    pub fn create_hall(
        &mut self,
        id: HallId,
        name: impl Into<String>,
        location: HallLocation,
    ) -> Result<&Hall, StoreError> {
        if self.halls.contains_key(&id) {
            return Err(StoreError::DuplicateHall(id));
        }
        Ok(self
            .halls
            .entry(id)
            .or_insert_with(|| Hall::new(id, name, location)))
    }

    /// Set the active hall. Unknown ids are accepted; [`active_hall`]
    /// then yields `None`.
    ///
    /// [`active_hall`]: Store::active_hall
    pub fn switch_hall(&mut self, id: HallId) {
        self.active_hall = Some(id);
    }

    pub fn active_hall_id(&self) -> Option<HallId> {
        self.active_hall
    }

    pub fn active_hall(&self) -> Option<&Hall> {
        self.active_hall.and_then(|id| self.halls.get(&id))
    }

    pub fn hall(&self, id: HallId) -> Option<&Hall> {
        self.halls.get(&id)
    }

    pub fn halls(&self) -> impl Iterator<Item = &Hall> {
        self.halls.values()
    }

    // -- Ingredients --

    pub fn create_ingredient(&mut self, spec: IngredientSpec) -> &Ingredient {
        let id = IngredientId(self.next_ingredient);
        self.next_ingredient += 1;
        let ingredient = self.factory.build(id, spec);
        self.ingredients.entry(id).or_insert(ingredient)
    }

    pub fn ingredient(&self, id: IngredientId) -> Option<&Ingredient> {
        self.ingredients.get(&id)
    }

    pub fn ingredient_by_external_id(&self, external: &str) -> Option<&Ingredient> {
        IngredientId::from_external(external).and_then(|id| self.ingredient(id))
    }

    pub fn ingredients(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredients.values()
    }

    // -- Pots --

    pub fn create_pot(&mut self) -> PotId {
        let id = PotId(self.next_pot);
        self.next_pot += 1;
        self.pots.insert(id, Pot::new(id, Rc::clone(&self.factory)));
        id
    }

    pub fn pot(&self, id: PotId) -> Option<&Pot> {
        self.pots.get(&id)
    }

    pub fn pot_by_external_id(&self, external: &str) -> Option<&Pot> {
        PotId::from_external(external).and_then(|id| self.pot(id))
    }

    pub fn pots(&self) -> impl Iterator<Item = &Pot> {
        self.pots.values()
    }

    /// Put an existing ingredient into a pot as-is.
    pub fn add_ingredient_to_pot(
        &mut self,
        ingredient: IngredientId,
        pot: PotId,
    ) -> Result<(), StoreError> {
        let item = self
            .ingredients
            .get(&ingredient)
            .ok_or(StoreError::UnknownIngredient(ingredient))?;
        let target = self.pots.get_mut(&pot).ok_or(StoreError::UnknownPot(pot))?;
        target.add_ingredient(item.clone())?;
        Ok(())
    }

    /// Rebuild an existing ingredient through the pot's factory with a new
    /// minimum time, then add it.
    pub fn drop_ingredient_into_pot(
        &mut self,
        ingredient: IngredientId,
        pot: PotId,
        min_time_ms: Millis,
    ) -> Result<(), StoreError> {
        let spec = self
            .ingredients
            .get(&ingredient)
            .ok_or(StoreError::UnknownIngredient(ingredient))?
            .spec()
            .with_min_time(min_time_ms);
        let target = self.pots.get_mut(&pot).ok_or(StoreError::UnknownPot(pot))?;
        target.add_from_spec(ingredient, spec)?;
        Ok(())
    }

    pub(crate) fn mark_pot_processed(&mut self, pot: PotId) -> bool {
        self.pots.get_mut(&pot).is_some_and(Pot::mark_processed)
    }

    // -- Machines --

    /// Create a machine in the active hall. The global list, the hall's
    /// membership and the placement entry are written together or not at
    /// all.
    pub fn add_machine(&mut self, speed: Speed, mix_time_ms: Millis) -> Result<MachineId, StoreError> {
        let hall_id = self.active_hall.ok_or(StoreError::NoActiveHall)?;
        let hall = self
            .halls
            .get_mut(&hall_id)
            .ok_or(StoreError::NoActiveHall)?;
        let id = MachineId(self.next_machine);
        self.next_machine += 1;
        hall.push_machine(id);
        self.machines
            .insert(id, Machine::new(id, speed, mix_time_ms, hall_id));
        self.placements.register_machine(id);
        tracing::debug!(machine = id.0, hall = hall_id.0, %speed, "machine added");
        Ok(id)
    }

    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.machines.get(&id)
    }

    pub fn machine_mut(&mut self, id: MachineId) -> Option<&mut Machine> {
        self.machines.get_mut(&id)
    }

    pub fn machines(&self) -> impl Iterator<Item = &Machine> {
        self.machines.values()
    }

    pub fn machines_mut(&mut self) -> impl Iterator<Item = &mut Machine> {
        self.machines.values_mut()
    }

    /// Machines of one hall, in creation order.
    pub fn machines_in_hall(&self, hall: HallId) -> impl Iterator<Item = &Machine> {
        self.halls
            .get(&hall)
            .map(Hall::machines)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| self.machines.get(id))
    }

    // -- Placement --

    pub fn placements(&self) -> &PlacementMap {
        &self.placements
    }

    /// Record `pot` in `machine`, moving it out of any other machine.
    /// Idempotent. Does not apply the machine's speed gate.
    pub fn add_pot_to_machine(&mut self, pot: PotId, machine: MachineId) -> Result<bool, StoreError> {
        if !self.pots.contains_key(&pot) {
            return Err(StoreError::UnknownPot(pot));
        }
        if !self.machines.contains_key(&machine) {
            return Err(StoreError::UnknownMachine(machine));
        }
        if let Some(previous) = self.placements.machine_of(pot)
            && previous != machine
            && let Some(old) = self.machines.get_mut(&previous)
        {
            old.release(pot);
        }
        let added = self.placements.add(pot, machine);
        if let Some(m) = self.machines.get_mut(&machine) {
            m.hold(pot);
        }
        Ok(added)
    }

    /// Take `pot` out of `machine`. Absent pots are a no-op.
    pub fn remove_pot_from_machine(&mut self, pot: PotId, machine: MachineId) -> bool {
        let removed = self.placements.remove(pot, machine);
        if let Some(m) = self.machines.get_mut(&machine) {
            m.release(pot);
        }
        removed
    }

    pub fn pots_in_machine(&self, machine: MachineId) -> &[PotId] {
        self.placements.pots_in(machine)
    }

    /// Assign a pot to a machine through the machine's speed gate. A pot
    /// already placed in a different machine is refused.
    pub fn assign_pot(&mut self, pot: PotId, machine: MachineId) -> Result<AssignCheck, StoreError> {
        let p = self.pots.get(&pot).ok_or(StoreError::UnknownPot(pot))?;
        let m = self
            .machines
            .get(&machine)
            .ok_or(StoreError::UnknownMachine(machine))?;
        let check = m.check_assign(p)?;
        if let Some(other) = self.placements.machine_of(pot)
            && other != machine
        {
            return Err(StoreError::PotAlreadyPlaced {
                pot,
                machine: other,
            });
        }
        if check == AssignCheck::Accept {
            self.add_pot_to_machine(pot, machine)?;
        }
        Ok(check)
    }

    /// Split borrow used to start a batch: the machine mutably, the pots
    /// shared.
    pub(crate) fn machine_and_pots(
        &mut self,
        machine: MachineId,
    ) -> Option<(&mut Machine, &BTreeMap<PotId, Pot>)> {
        let m = self.machines.get_mut(&machine)?;
        Some((m, &self.pots))
    }

    // -- Invariants --

    /// Every broken structural invariant. Empty when the store is sound.
    pub fn check_consistency(&self) -> Vec<Inconsistency> {
        let mut problems = Vec::new();

        let mut seen: HashMap<PotId, MachineId> = HashMap::new();
        for machine in self.placements.machines() {
            if !self.machines.contains_key(&machine) {
                problems.push(Inconsistency::PlacementMachineMissing(machine));
            }
            for &pot in self.placements.pots_in(machine) {
                if !self.pots.contains_key(&pot) {
                    problems.push(Inconsistency::PlacedPotMissing { machine, pot });
                }
                if seen.insert(pot, machine).is_some() {
                    problems.push(Inconsistency::PotPlacedTwice(pot));
                }
                if self.placements.machine_of(pot) != Some(machine) {
                    problems.push(Inconsistency::ReverseIndexMismatch(pot));
                }
            }
        }
        for (&pot, machine) in &self.placements.by_pot {
            if seen.get(&pot) != Some(machine) {
                problems.push(Inconsistency::ReverseIndexMismatch(pot));
            }
        }

        let mut hall_of: HashMap<MachineId, HallId> = HashMap::new();
        for hall in self.halls.values() {
            for &machine in hall.machines() {
                if !self.machines.contains_key(&machine) {
                    problems.push(Inconsistency::HallListsUnknownMachine {
                        hall: hall.id(),
                        machine,
                    });
                }
                if hall_of.insert(machine, hall.id()).is_some() {
                    problems.push(Inconsistency::MachineInSeveralHalls(machine));
                }
            }
        }

        for machine in self.machines.values() {
            let id = machine.id();
            if machine.pots() != self.placements.pots_in(id) {
                problems.push(Inconsistency::MachineListMismatch(id));
            }
            if !self.placements.by_machine.contains_key(&id) {
                problems.push(Inconsistency::MachineWithoutPlacementEntry(id));
            }
            if !self.halls.contains_key(&machine.hall()) {
                problems.push(Inconsistency::MachineHallMissing {
                    machine: id,
                    hall: machine.hall(),
                });
            } else if hall_of.get(&id) != Some(&machine.hall()) {
                problems.push(Inconsistency::MachineNotInHall {
                    machine: id,
                    hall: machine.hall(),
                });
            }
            for pot in machine.pots().iter().filter_map(|p| self.pots.get(p)) {
                if pot.speed() != Some(machine.speed()) {
                    problems.push(Inconsistency::PotSpeedMismatch {
                        machine: id,
                        pot: pot.id(),
                    });
                }
            }
        }

        for pot in self.pots.values() {
            if let Some(speed) = pot.speed()
                && pot.ingredients().iter().any(|i| i.speed() != speed)
            {
                problems.push(Inconsistency::MixedSpeedPot(pot.id()));
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingredient::{StandardIngredientFactory, Structure};

    fn store() -> Store {
        Store::with_default_halls(Rc::new(StandardIngredientFactory))
    }

    fn pot_of(store: &mut Store, speed: Speed) -> PotId {
        let ing = store
            .create_ingredient(IngredientSpec::new("#112233", Structure::Grain, speed))
            .id();
        let pot = store.create_pot();
        store.add_ingredient_to_pot(ing, pot).unwrap();
        pot
    }

    #[test]
    fn starts_with_two_halls_and_hall_one_active() {
        let s = store();
        assert_eq!(s.halls().count(), 2);
        assert_eq!(s.active_hall().map(Hall::id), Some(HallId(1)));
        assert!(s.check_consistency().is_empty());
    }

    #[test]
    fn duplicate_hall_is_rejected() {
        let mut s = store();
        assert_eq!(
            s.create_hall(HallId(1), "again", HallLocation::Local).unwrap_err(),
            StoreError::DuplicateHall(HallId(1))
        );
        assert_eq!(s.hall(HallId(1)).map(Hall::name), Some("Hall A"));
        assert!(s.create_hall(HallId(3), "Hall C", HallLocation::Local).is_ok());
    }

    #[test]
    fn switching_to_unknown_hall_leaves_no_active_hall() {
        let mut s = store();
        s.switch_hall(HallId(42));
        assert_eq!(s.active_hall_id(), Some(HallId(42)));
        assert!(s.active_hall().is_none());
        assert_eq!(s.add_machine(Speed::Easy, 1000), Err(StoreError::NoActiveHall));
        assert_eq!(s.machines().count(), 0);
        assert!(s.check_consistency().is_empty());
    }

    #[test]
    fn add_machine_does_triple_bookkeeping() {
        let mut s = store();
        let m = s.add_machine(Speed::Medium, 1000).unwrap();
        assert_eq!(m, MachineId(1));
        assert_eq!(s.hall(HallId(1)).unwrap().machines(), &[m]);
        assert_eq!(s.pots_in_machine(m), &[] as &[PotId]);
        assert_eq!(s.machine(m).unwrap().hall(), HallId(1));
        assert!(s.check_consistency().is_empty());
    }

    #[test]
    fn external_lookup() {
        let mut s = store();
        let pot = s.create_pot();
        let ing = s
            .create_ingredient(IngredientSpec::new("red", Structure::Slimy, Speed::Hard))
            .id();
        assert_eq!(s.pot_by_external_id("pot-1").map(Pot::id), Some(pot));
        assert!(s.pot_by_external_id("pot-2").is_none());
        assert!(s.pot_by_external_id("ingredient-1").is_none());
        assert!(s.pot_by_external_id("pot-x").is_none());
        assert_eq!(
            s.ingredient_by_external_id("ingredient-1").map(Ingredient::id),
            Some(ing)
        );
    }

    #[test]
    fn assigning_the_same_pot_twice_keeps_one_entry() {
        let mut s = store();
        let m = s.add_machine(Speed::Easy, 1000).unwrap();
        let pot = pot_of(&mut s, Speed::Easy);
        assert_eq!(s.assign_pot(pot, m), Ok(AssignCheck::Accept));
        assert_eq!(s.assign_pot(pot, m), Ok(AssignCheck::AlreadyAssigned));
        assert_eq!(s.pots_in_machine(m), &[pot]);
        assert_eq!(s.machine(m).unwrap().pots(), &[pot]);
        assert!(s.check_consistency().is_empty());
    }

    #[test]
    fn assign_rejects_speed_mismatch_without_changes() {
        let mut s = store();
        let m = s.add_machine(Speed::Easy, 1000).unwrap();
        let pot = pot_of(&mut s, Speed::Hard);
        assert!(matches!(
            s.assign_pot(pot, m),
            Err(StoreError::Machine(MachineError::SpeedMismatch { .. }))
        ));
        assert!(s.pots_in_machine(m).is_empty());
    }

    #[test]
    fn assign_rejects_pot_placed_elsewhere() {
        let mut s = store();
        let a = s.add_machine(Speed::Easy, 1000).unwrap();
        let b = s.add_machine(Speed::Easy, 1000).unwrap();
        let pot = pot_of(&mut s, Speed::Easy);
        s.assign_pot(pot, a).unwrap();
        assert_eq!(
            s.assign_pot(pot, b),
            Err(StoreError::PotAlreadyPlaced { pot, machine: a })
        );
        assert_eq!(s.pots_in_machine(a), &[pot]);
        assert!(s.pots_in_machine(b).is_empty());
    }

    #[test]
    fn add_pot_to_machine_moves_between_machines() {
        let mut s = store();
        let a = s.add_machine(Speed::Easy, 1000).unwrap();
        let b = s.add_machine(Speed::Easy, 1000).unwrap();
        let pot = pot_of(&mut s, Speed::Easy);
        assert_eq!(s.add_pot_to_machine(pot, a), Ok(true));
        assert_eq!(s.add_pot_to_machine(pot, a), Ok(false));
        assert_eq!(s.add_pot_to_machine(pot, b), Ok(true));
        assert!(s.pots_in_machine(a).is_empty());
        assert_eq!(s.pots_in_machine(b), &[pot]);
        assert!(s.check_consistency().is_empty());
    }

    #[test]
    fn remove_and_unknown_lookups_are_no_ops() {
        let mut s = store();
        let m = s.add_machine(Speed::Easy, 1000).unwrap();
        let pot = pot_of(&mut s, Speed::Easy);
        assert!(!s.remove_pot_from_machine(pot, m));
        s.assign_pot(pot, m).unwrap();
        assert!(s.remove_pot_from_machine(pot, m));
        assert!(s.pots_in_machine(m).is_empty());
        assert!(s.pots_in_machine(MachineId(99)).is_empty());
        assert!(s.check_consistency().is_empty());
    }

    #[test]
    fn drop_rebuilds_with_new_min_time() {
        let mut s = store();
        let ing = s
            .create_ingredient(
                IngredientSpec::new("blue", Structure::Smooth, Speed::Easy).with_min_time(2000),
            )
            .id();
        let pot = s.create_pot();
        s.drop_ingredient_into_pot(ing, pot, 1000).unwrap();
        let dropped = &s.pot(pot).unwrap().ingredients()[0];
        assert_eq!(dropped.id(), ing);
        assert_eq!(dropped.min_time_ms(), 1000);
        assert_eq!(s.ingredient(ing).unwrap().min_time_ms(), 2000);
    }

    #[test]
    fn unknown_references_are_reported() {
        let mut s = store();
        assert_eq!(
            s.add_ingredient_to_pot(IngredientId(7), PotId(1)),
            Err(StoreError::UnknownIngredient(IngredientId(7)))
        );
        assert_eq!(
            s.assign_pot(PotId(3), MachineId(1)),
            Err(StoreError::UnknownPot(PotId(3)))
        );
    }
}
