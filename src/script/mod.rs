//! Sandboxed execution of compiled block scripts
//!
//! A script string is tokenized, parsed into a small statement tree and
//! evaluated against a [`ScriptHost`]. The host is the only object in scope;
//! calls to anything else are rejected at parse time.

pub mod ast;
pub mod eval;
pub mod host;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{HostOp, Program};
pub use eval::{Interpreter, ScriptLimits};
pub use host::{
    BallDraft, BuildRecord, HostEvent, RunContext, RunOutput, ScriptHost, SetupSnapshot,
};
pub use parser::parse;
pub use value::Value;

use crate::error::ScriptError;

/// Parse and execute `source` against `host`
pub fn run_script<H: ScriptHost>(
    source: &str,
    host: &mut H,
    limits: ScriptLimits,
) -> Result<(), ScriptError> {
    let program = parse(source)?;
    Interpreter::new(host, limits).run(&program)
}
