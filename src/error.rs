//! Error types for script runs
//!
//! Display strings are the exact messages shown in the output log.

use thiserror::Error;

/// Failure raised by a Script Host API call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("Error: ball radius must be a number between 0 and {max}.")]
    InvalidRadius { max: f32 },

    #[error("Error: a ball was already created in this program.")]
    DuplicateCreate,

    #[error("Error: ball has no x and y values.")]
    NoBallYet,

    #[error("Error: {op} is missing a value.")]
    MissingValue { op: &'static str },

    #[error("Error: {op} needs a number.")]
    NotANumber { op: &'static str },

    #[error("Error: ball x and y values should not be 0.")]
    ZeroCoordinate,

    #[error("Error: ball x must be between -250 and 250, y must be between 0 and 400.")]
    OutOfBounds,

    #[error("Error: {what} should not be 0.")]
    NonPositive { what: &'static str },

    #[error("Error: ball has no x and y values.")]
    IncompleteBall,
}

/// Coarse class of a host failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostErrorClass {
    /// Bad, missing or out-of-range argument
    Validation,
    /// Operation invoked in the wrong lifecycle order
    State,
}

impl HostError {
    pub fn class(&self) -> HostErrorClass {
        match self {
            HostError::NoBallYet | HostError::DuplicateCreate | HostError::IncompleteBall => {
                HostErrorClass::State
            }
            _ => HostErrorClass::Validation,
        }
    }
}

/// Failure while lexing, parsing or evaluating a script
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Error: unexpected character '{text}' at position {pos}.")]
    Lex { pos: usize, text: String },

    #[error("Error: {message} at position {pos}.")]
    Parse { pos: usize, message: String },

    #[error("Error: unknown block operation '{0}'.")]
    UnknownOperation(String),

    #[error("Error: '{0}' is not defined.")]
    Undefined(String),

    #[error("Error: program repeats too many times (limit {0}).")]
    LoopBudget(u32),

    #[error("Error: text is too long (limit {0} characters).")]
    StringTooLong(usize),
}

impl ScriptError {
    pub fn parse(pos: usize, message: impl Into<String>) -> Self {
        ScriptError::Parse {
            pos,
            message: message.into(),
        }
    }
}

/// Outcome class of a rejected or failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    State,
    Concurrency,
    NoOp,
    Script,
}

/// Failure of a whole setup or drop run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error("Error: program has no blocks to run.")]
    NoOpScript,

    #[error("Simulation still running. Wait for the ball to stop before dropping again.")]
    SimulationRunning,

    #[error("Error: the simulation view has been closed.")]
    ViewClosed,
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Script(ScriptError::Host(host)) => match host.class() {
                HostErrorClass::Validation => ErrorKind::Validation,
                HostErrorClass::State => ErrorKind::State,
            },
            RunError::Script(_) => ErrorKind::Script,
            RunError::NoOpScript => ErrorKind::NoOp,
            RunError::SimulationRunning => ErrorKind::Concurrency,
            RunError::ViewClosed => ErrorKind::State,
        }
    }
}

impl From<HostError> for RunError {
    fn from(err: HostError) -> Self {
        RunError::Script(ScriptError::Host(err))
    }
}
