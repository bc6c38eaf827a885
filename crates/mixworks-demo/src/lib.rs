//! Headless runner for the Mixworks engine.
//!
//! Loads the session config, drives a scripted session against fixed
//! weather and reports what happened to every pot.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mixworks_demo::script::{ScriptOptions, run_script};
//!
//! let settings = mixworks_data::load_session_config(Path::new("config/"))?;
//! let report = run_script(settings, &ScriptOptions::default())?;
//! println!("{report}");
//! ```

pub mod error;
pub mod logging;
pub mod script;

pub use error::DemoError;
pub use script::{ScriptOptions, ScriptReport, run_script};
