//! Mixworks Core -- the simulation engine of a small mixing factory.
//!
//! Ingredients go into pots, pots go into machines, machines process them
//! on a virtual clock at a pace set by ingredient speed and the weather, and
//! processed pots can be inspected for their mixed color and its triadic
//! harmony.
//!
//! # Flow of a user action
//!
//! Every action goes through [`session::Session`]:
//!
//! 1. **Resolve** -- composite ids (`pot-3`, `ingredient-7`) are parsed at the
//!    boundary into typed ids.
//! 2. **Validate** -- the pot, machine or store checks its invariant (one
//!    speed per pot, machine speed gate, heat cap) before anything is written.
//! 3. **Mutate** -- the [`store::Store`] applies the change to every
//!    collection it touches, all or nothing.
//! 4. **Schedule** -- starting a machine schedules one completion per pot on
//!    the [`scheduler::Scheduler`].
//! 5. **Notify** -- an [`event::Event`] is queued for listeners; rejections
//!    are events too.
//!
//! Time only moves when the caller calls [`session::Session::advance`]:
//!
//! ```rust,ignore
//! let mut session = Session::new(SessionSettings::default())?;
//! let machine = session.create_machine(Speed::Easy, None)?;
//! session.assign_pot("pot-1", machine)?;
//! session.start_machine(machine)?;
//! let finished = session.run_until_idle();
//! ```
//!
//! # Key Types
//!
//! - [`session::Session`] -- user actions, weather refresh, inspection.
//! - [`store::Store`] -- entities, active hall and the placement map.
//! - [`machine::Machine`] -- speed gate and batch bookkeeping.
//! - [`pot::Pot`] -- single-speed ingredient list and mixed color.
//! - [`timing`] -- per-speed costs and the weather time factor.
//! - [`color`] -- RGB/HSL parsing, conversion and harmonies.
//! - [`weather`] -- provider contracts and OpenWeatherMap decoding.

pub mod color;
pub mod event;
pub mod fixed;
pub mod grid;
pub mod hall;
pub mod id;
pub mod ingredient;
pub mod machine;
pub mod pot;
pub mod rng;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod store;
pub mod timing;
pub mod weather;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
