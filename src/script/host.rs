//! Script Host API
//!
//! The only surface a block script can reach. Every call is validated here
//! and recorded into a per-run [`BuildRecord`]; nothing touches the committed
//! simulation until the controller accepts the finished record.

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::error::HostError;
use crate::settings::Settings;
use crate::sim::Ball;

/// Operations exposed to compiled scripts
pub trait ScriptHost {
    fn create_ball(&mut self, radius: Option<&Value>) -> Result<(), HostError>;
    fn set_ball_position(
        &mut self,
        x: Option<&Value>,
        y: Option<&Value>,
    ) -> Result<(), HostError>;
    fn set_ball_radius(&mut self, radius: Option<&Value>) -> Result<(), HostError>;
    fn drop_ball(&mut self) -> Result<(), HostError>;
    fn print(&mut self, message: Option<&Value>);
    fn set_gravity(&mut self, gravity: Option<&Value>) -> Result<(), HostError>;
}

/// State change produced by a successful host call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostEvent {
    BallCreated { radius: f32 },
    PositionSet { x: f32, y: f32 },
    RadiusSet { radius: f32 },
    GravitySet { gravity: f32 },
    /// `from_setup` is set when the drop adopted the last setup snapshot
    DropRequested { from_setup: bool },
    Printed,
}

/// Ball under construction; coordinates stay optional until validated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallDraft {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub radius: f32,
    pub color: [f32; 4],
}

impl BallDraft {
    fn from_ball(ball: &Ball) -> Self {
        Self {
            x: Some(ball.pos.x),
            y: Some(ball.pos.y),
            radius: ball.radius,
            color: ball.color,
        }
    }

    /// Finished ball, or `IncompleteBall` if either coordinate is missing
    pub fn complete(&self) -> Result<Ball, HostError> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => {
                let mut ball = Ball::at(x, y, self.radius);
                ball.color = self.color;
                Ok(ball)
            }
            _ => Err(HostError::IncompleteBall),
        }
    }
}

/// Configured state left behind by a successful setup run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetupSnapshot {
    pub ball: Ball,
    pub gravity: Option<f32>,
}

/// Per-run accumulation of ball fields, discarded unless committed
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRecord {
    pub ball_created: bool,
    pub position_set: bool,
    /// Active radius (last validated)
    pub radius: f32,
    pub ball: Option<BallDraft>,
    pub gravity: Option<f32>,
    pub drop_requested: bool,
    pub events: Vec<HostEvent>,
}

impl BuildRecord {
    pub fn new(default_radius: f32) -> Self {
        Self {
            ball_created: false,
            position_set: false,
            radius: default_radius,
            ball: None,
            gravity: None,
            drop_requested: false,
            events: Vec::new(),
        }
    }
}

/// Request-scoped context a script runs against
pub struct RunContext<'a> {
    settings: &'a Settings,
    snapshot: Option<&'a SetupSnapshot>,
    record: BuildRecord,
    output: Vec<String>,
    calls: u32,
}

/// What a completed script left behind
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub record: BuildRecord,
    pub output: Vec<String>,
    /// Number of host operations invoked
    pub calls: u32,
}

impl<'a> RunContext<'a> {
    pub fn new(settings: &'a Settings, snapshot: Option<&'a SetupSnapshot>) -> Self {
        Self {
            settings,
            snapshot,
            record: BuildRecord::new(settings.default_radius),
            output: Vec::new(),
            calls: 0,
        }
    }

    pub fn record(&self) -> &BuildRecord {
        &self.record
    }

    pub fn finish(self) -> RunOutput {
        RunOutput {
            record: self.record,
            output: self.output,
            calls: self.calls,
        }
    }

    fn emit(&mut self, event: HostEvent) {
        log::debug!("host event: {:?}", event);
        self.record.events.push(event);
    }

    /// Radius in the committed precision; anything outside (0, max] is `InvalidRadius`
    fn radius_arg(&self, value: Option<&Value>) -> Result<f32, HostError> {
        let invalid = HostError::InvalidRadius {
            max: self.settings.max_radius,
        };
        let radius = value
            .filter(|v| !v.is_absent())
            .and_then(Value::to_number)
            .map(|n| n as f32)
            .ok_or(invalid.clone())?;
        if radius.is_nan() || radius <= 0.0 || radius > self.settings.max_radius {
            return Err(invalid);
        }
        Ok(radius)
    }
}

/// Present argument, or `MissingValue`
fn required<'v>(op: &'static str, value: Option<&'v Value>) -> Result<&'v Value, HostError> {
    match value {
        Some(v) if !v.is_absent() => Ok(v),
        _ => Err(HostError::MissingValue { op }),
    }
}

/// Coerce to the committed `f32` precision; NaN or out of `f32` range is `NotANumber`
fn to_f32(op: &'static str, value: &Value) -> Result<f32, HostError> {
    match value.to_number().map(|n| n as f32) {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(HostError::NotANumber { op }),
    }
}

fn number_arg(op: &'static str, value: Option<&Value>) -> Result<f32, HostError> {
    to_f32(op, required(op, value)?)
}

impl ScriptHost for RunContext<'_> {
    fn create_ball(&mut self, radius: Option<&Value>) -> Result<(), HostError> {
        self.calls += 1;
        if self.record.ball_created {
            return Err(HostError::DuplicateCreate);
        }
        let radius = self.radius_arg(radius)?;

        self.record.ball_created = true;
        self.record.radius = radius;
        self.record.ball = Some(BallDraft {
            x: Some(0.0),
            y: Some(radius),
            radius,
            color: self.settings.ball_color,
        });
        self.emit(HostEvent::BallCreated { radius });
        Ok(())
    }

    fn set_ball_position(
        &mut self,
        x: Option<&Value>,
        y: Option<&Value>,
    ) -> Result<(), HostError> {
        const OP: &str = "setBallPosition";
        self.calls += 1;
        if !self.record.ball_created {
            return Err(HostError::NoBallYet);
        }
        let (x, y) = (required(OP, x)?, required(OP, y)?);
        let (x, y) = (to_f32(OP, x)?, to_f32(OP, y)?);
        if x == 0.0 || y == 0.0 {
            return Err(HostError::ZeroCoordinate);
        }
        let (x_min, x_max) = self.settings.x_range();
        let (y_min, y_max) = self.settings.y_range();
        if x < x_min || x > x_max || y < y_min || y > y_max {
            return Err(HostError::OutOfBounds);
        }

        if let Some(draft) = self.record.ball.as_mut() {
            draft.x = Some(x);
            draft.y = Some(y);
        }
        self.record.position_set = true;
        self.emit(HostEvent::PositionSet { x, y });
        Ok(())
    }

    fn set_ball_radius(&mut self, radius: Option<&Value>) -> Result<(), HostError> {
        const OP: &str = "setBallRadius";
        self.calls += 1;
        if !self.record.ball_created {
            return Err(HostError::NoBallYet);
        }
        let radius = number_arg(OP, radius)?;
        if radius <= 0.0 {
            return Err(HostError::NonPositive {
                what: "ball radius",
            });
        }
        if radius > self.settings.max_radius {
            return Err(HostError::InvalidRadius {
                max: self.settings.max_radius,
            });
        }

        self.record.radius = radius;
        if let Some(draft) = self.record.ball.as_mut() {
            draft.radius = radius;
        }
        self.emit(HostEvent::RadiusSet { radius });
        Ok(())
    }

    fn drop_ball(&mut self) -> Result<(), HostError> {
        self.calls += 1;
        let from_setup = if self.record.ball.is_some() {
            false
        } else if let Some(snapshot) = self.snapshot {
            self.record.ball = Some(BallDraft::from_ball(&snapshot.ball));
            self.record.radius = snapshot.ball.radius;
            self.record.gravity = self.record.gravity.or(snapshot.gravity);
            true
        } else {
            return Err(HostError::NoBallYet);
        };

        if let Some(draft) = &self.record.ball {
            draft.complete()?;
        }
        self.record.drop_requested = true;
        self.emit(HostEvent::DropRequested { from_setup });
        Ok(())
    }

    fn print(&mut self, message: Option<&Value>) {
        self.calls += 1;
        let line = message.map(Value::to_string).unwrap_or_default();
        log::debug!("script print: {}", line);
        self.output.push(line);
        self.emit(HostEvent::Printed);
    }

    fn set_gravity(&mut self, gravity: Option<&Value>) -> Result<(), HostError> {
        const OP: &str = "setGravity";
        self.calls += 1;
        let gravity = number_arg(OP, gravity)?;
        if gravity <= 0.0 {
            return Err(HostError::NonPositive { what: "gravity" });
        }

        self.record.gravity = Some(gravity);
        self.emit(HostEvent::GravitySet { gravity });
        Ok(())
    }
}
