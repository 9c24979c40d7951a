//! Simulation state and core ball types
//!
//! The committed state shared by the controller and the integrator lives here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::settings::Settings;

/// Lifecycle phase of the simulated ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimulationPhase {
    /// No ball exists
    #[default]
    Empty,
    /// Ball placed by a setup run, not in the physics loop
    Configured,
    /// Integrator advances the ball every tick
    Falling,
    /// Ball fixed in place, still rendered
    Resting,
}

impl SimulationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationPhase::Empty => "empty",
            SimulationPhase::Configured => "configured",
            SimulationPhase::Falling => "falling",
            SimulationPhase::Resting => "resting",
        }
    }
}

/// The simulated ball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    /// Logical position, x in [-250, 250], y in [0, 400] with 0 at the top
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Display colour (RGBA)
    pub color: [f32; 4],
}

impl Ball {
    /// Fresh ball resting against the top edge at the horizontal centre
    pub fn new(radius: f32) -> Self {
        Self {
            pos: Vec2::new(0.0, radius),
            vel: Vec2::ZERO,
            radius,
            color: colors::BALL,
        }
    }

    pub fn at(x: f32, y: f32, radius: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            ..Self::new(radius)
        }
    }

    /// Copy of this ball with all motion removed
    pub fn stopped(mut self) -> Self {
        self.vel = Vec2::ZERO;
        self
    }
}

/// Physics constants for one motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    pub gravity: f32,
    pub restitution: f32,
    pub bounce_threshold: f32,
    pub height: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            restitution: RESTITUTION,
            bounce_threshold: BOUNCE_THRESHOLD,
            height: SIM_HEIGHT,
        }
    }
}

impl Physics {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            gravity: settings.gravity,
            restitution: settings.restitution,
            bounce_threshold: settings.bounce_threshold,
            height: settings.height,
        }
    }

    /// Landing speed at or below which the ball settles.
    ///
    /// Never lower than `2g / (1 - k)`: below that the discrete bounce
    /// sequence stops losing height and would bounce forever.
    pub fn settle_speed(&self) -> f32 {
        let decay_floor = 2.0 * self.gravity / (1.0 - self.restitution);
        self.bounce_threshold.max(decay_floor)
    }

    /// Resting height of a ball's centre
    #[inline]
    pub fn floor_for(&self, radius: f32) -> f32 {
        self.height - radius
    }
}

/// Committed simulation state (single ball)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Simulation {
    pub phase: SimulationPhase,
    pub ball: Option<Ball>,
    /// Physics for the current motion (may carry a script gravity override)
    pub physics: Physics,
    /// Ticks advanced during the current motion
    pub motion_ticks: u64,
    /// Floor bounces during the current motion
    pub bounces: u32,
}

impl Simulation {
    pub fn new(physics: Physics) -> Self {
        Self {
            physics,
            ..Default::default()
        }
    }

    /// Place a ball without starting motion
    pub fn configure(&mut self, ball: Ball) {
        self.ball = Some(ball);
        self.phase = SimulationPhase::Configured;
        self.motion_ticks = 0;
        self.bounces = 0;
    }

    /// Start a motion from the given ball, velocity zeroed
    pub fn drop_ball(&mut self, ball: Ball, physics: Physics) {
        self.ball = Some(ball.stopped());
        self.physics = physics;
        self.phase = SimulationPhase::Falling;
        self.motion_ticks = 0;
        self.bounces = 0;
    }

    /// Leave the ball where it is, no motion
    pub fn rest(&mut self, ball: Ball) {
        self.ball = Some(ball.stopped());
        self.phase = SimulationPhase::Resting;
        self.motion_ticks = 0;
        self.bounces = 0;
    }

    /// Remove the ball and return to the empty phase
    pub fn clear(&mut self) {
        self.ball = None;
        self.phase = SimulationPhase::Empty;
        self.motion_ticks = 0;
        self.bounces = 0;
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.phase == SimulationPhase::Falling
    }
}
