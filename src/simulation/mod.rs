//! Lock-step simulation of an EIG run.
//!
//! A [`Simulation`] owns every [`Participant`](crate::eig::Participant) and
//! walks them through `Setup -> Round(1..=R) -> Decide -> Evaluate`. Within a
//! round each participant only touches its own state, so generation and
//! application run on the rayon pool unless the config turns that off. Every
//! random choice is drawn from the configured seed.

mod config;
mod report;
mod runner;

pub use config::{SimulationConfig, DEFAULT_LIE_PROB, DEFAULT_SEED};
pub use report::{check_agreement, check_termination, check_validity, Property, Report};
pub use runner::{Simulation, SimulationPhase};
