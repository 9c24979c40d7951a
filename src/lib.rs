//! Ball Drop - block programs driving a falling-ball simulation
//!
//! Core modules:
//! - `script`: Sandboxed evaluator and the host API exposed to block scripts
//! - `sim`: Deterministic simulation (ball state, phases, drop physics, frame gating)
//! - `controller`: Setup/drop runs and commit of validated build records
//! - `render`: Render sink contract and canvas coordinate mapping
//! - `settings`: Physics and simulation configuration

pub mod controller;
pub mod error;
pub mod render;
pub mod script;
pub mod settings;
pub mod sim;

pub use controller::{Controller, RunKind, RunReport};
pub use error::{ErrorKind, HostError, RunError, ScriptError};
pub use render::{RenderFrame, RenderSink};
pub use settings::Settings;

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Simulation area in logical units
    pub const SIM_WIDTH: f32 = 500.0;
    pub const SIM_HEIGHT: f32 = 400.0;

    /// Height of the floor strip painted at the bottom of the scene
    pub const FLOOR_THICKNESS: f32 = 10.0;

    /// Ball defaults
    pub const DEFAULT_BALL_RADIUS: f32 = 20.0;
    /// Largest radius that still fits half the simulation width
    pub const MAX_BALL_RADIUS: f32 = 180.0;

    /// Downward acceleration, units/tick²
    pub const GRAVITY: f32 = 0.5;
    /// Fraction of vertical speed kept after a floor bounce
    pub const RESTITUTION: f32 = 0.5;
    /// Landing speeds at or below this settle the ball
    pub const BOUNCE_THRESHOLD: f32 = 2.5;

    /// Iterations a single script run may spend in loops
    pub const SCRIPT_LOOP_BUDGET: u32 = 10_000;
    /// Longest string a script may build, in bytes
    pub const SCRIPT_STRING_LIMIT: usize = 64 * 1024;

    /// Canvas colours (RGBA)
    pub mod colors {
        pub const BALL: [f32; 4] = [0.129, 0.588, 0.953, 1.0]; // #2196f3
        pub const BACKGROUND: [f32; 4] = [0.933, 0.933, 0.933, 1.0]; // #eee
        pub const FLOOR: [f32; 4] = [0.267, 0.267, 0.267, 1.0]; // #444
    }
}

/// Map a logical position to canvas pixels for a scene `width` units wide
/// (horizontal origin shifted from the centre to the left edge)
#[inline]
pub fn logical_to_canvas(pos: Vec2, width: f32) -> Vec2 {
    Vec2::new(pos.x + width / 2.0, pos.y)
}

/// Format an RGBA colour as a CSS `rgba()` string
pub fn css_color(color: [f32; 4]) -> String {
    let [r, g, b, a] = color;
    format!(
        "rgba({}, {}, {}, {})",
        (r.clamp(0.0, 1.0) * 255.0).round() as u8,
        (g.clamp(0.0, 1.0) * 255.0).round() as u8,
        (b.clamp(0.0, 1.0) * 255.0).round() as u8,
        a.clamp(0.0, 1.0)
    )
}
