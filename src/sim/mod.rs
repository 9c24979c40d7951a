//! Deterministic simulation module
//!
//! All ball physics lives here. This module must be pure and deterministic:
//! - Fixed timestep only (one tick per frame)
//! - No rendering or platform dependencies

pub mod frame;
pub mod state;
pub mod tick;

pub use frame::{FrameLoop, FrameTicket};
pub use state::{Ball, Physics, Simulation, SimulationPhase};
pub use tick::{TickOutcome, run_to_rest, tick};
