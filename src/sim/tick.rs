//! Fixed-step drop integrator
//!
//! Advances the falling ball one frame deterministically.

use super::state::{SimulationPhase, Simulation};

/// What a single tick did to the ball
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not falling, nothing advanced
    Idle,
    /// Moved under gravity without touching the floor
    Moving,
    /// Hit the floor fast enough to bounce
    Bounced,
    /// Hit the floor slowly and settled
    Settled,
}

impl TickOutcome {
    /// Whether another tick should be scheduled
    #[inline]
    pub fn keeps_running(&self) -> bool {
        matches!(self, TickOutcome::Moving | TickOutcome::Bounced)
    }
}

/// Advance the simulation by one frame
pub fn tick(sim: &mut Simulation) -> TickOutcome {
    if sim.phase != SimulationPhase::Falling {
        return TickOutcome::Idle;
    }
    let Some(ball) = sim.ball.as_mut() else {
        // Falling without a ball cannot render anything
        sim.phase = SimulationPhase::Empty;
        return TickOutcome::Idle;
    };

    let physics = sim.physics;
    sim.motion_ticks += 1;

    // Horizontal motion is not modelled; x and vx pass through
    let mut vy = ball.vel.y + physics.gravity;
    let mut y = ball.pos.y + vy;

    let floor = physics.floor_for(ball.radius);
    let outcome = if y > floor {
        if vy.abs() > physics.settle_speed() {
            vy = -vy * physics.restitution;
            // Push back out using the reflected velocity so the next frame separates
            y = floor + vy;
            sim.bounces += 1;
            TickOutcome::Bounced
        } else {
            y = floor;
            vy = 0.0;
            TickOutcome::Settled
        }
    } else {
        TickOutcome::Moving
    };

    ball.vel.y = vy;
    ball.pos.y = y;

    if outcome == TickOutcome::Settled {
        sim.phase = SimulationPhase::Resting;
        log::info!(
            "Ball settled at y={} after {} ticks ({} bounces)",
            y,
            sim.motion_ticks,
            sim.bounces
        );
    } else {
        log::debug!("tick {}: y={} vy={}", sim.motion_ticks, y, vy);
    }

    outcome
}

/// Run ticks until the ball settles or `max_ticks` is reached, returning the tick count
pub fn run_to_rest(sim: &mut Simulation, max_ticks: u64) -> u64 {
    let mut count = 0;
    while count < max_ticks {
        match tick(sim) {
            TickOutcome::Idle => break,
            TickOutcome::Settled => return count + 1,
            TickOutcome::Moving | TickOutcome::Bounced => count += 1,
        }
    }
    count
}
