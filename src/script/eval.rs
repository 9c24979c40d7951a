//! Tree-walking evaluator
//!
//! Runs a parsed [`Program`] against a [`ScriptHost`]. Scripts see local
//! variables and the host operations, nothing else.

use std::collections::HashMap;

use super::ast::*;
use super::host::ScriptHost;
use super::value::Value;
use crate::consts::{SCRIPT_LOOP_BUDGET, SCRIPT_STRING_LIMIT};
use crate::error::ScriptError;
use crate::settings::Settings;

/// Resource caps for a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLimits {
    /// Loop iterations, summed over every loop in the run
    pub loop_budget: u32,
    /// Longest string value, in bytes
    pub max_string_len: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            loop_budget: SCRIPT_LOOP_BUDGET,
            max_string_len: SCRIPT_STRING_LIMIT,
        }
    }
}

impl ScriptLimits {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            loop_budget: settings.loop_budget,
            max_string_len: settings.max_string_len,
        }
    }
}

pub struct Interpreter<'h, H: ScriptHost> {
    host: &'h mut H,
    vars: HashMap<String, Value>,
    limits: ScriptLimits,
    iterations: u32,
}

impl<'h, H: ScriptHost> Interpreter<'h, H> {
    pub fn new(host: &'h mut H, limits: ScriptLimits) -> Self {
        Self {
            host,
            vars: HashMap::new(),
            limits,
            iterations: 0,
        }
    }

    /// Execute every statement; the first failure aborts the rest
    pub fn run(&mut self, program: &Program) -> Result<(), ScriptError> {
        self.exec_all(&program.body)
    }

    fn exec_all(&mut self, body: &[Stmt]) -> Result<(), ScriptError> {
        for stmt in body {
            self.exec(stmt)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        match stmt {
            Stmt::Empty => {}
            Stmt::Block(body) => self.exec_all(body)?,
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Var(decls) => {
                for (name, init) in decls {
                    match init {
                        Some(expr) => {
                            let value = self.eval(expr)?;
                            self.vars.insert(name.clone(), value);
                        }
                        // Redeclaring keeps the current value
                        None => {
                            self.vars.entry(name.clone()).or_default();
                        }
                    }
                }
            }
            Stmt::Assign { name, op, value } => {
                let rhs = self.eval(value)?;
                let value = match op {
                    AssignOp::Set => rhs,
                    AssignOp::Add => add(
                        &self.lookup_or_undefined(name),
                        &rhs,
                        self.limits.max_string_len,
                    )?,
                    AssignOp::Sub => {
                        Value::Number(self.lookup_or_undefined(name).as_number() - rhs.as_number())
                    }
                };
                self.vars.insert(name.clone(), value);
            }
            Stmt::Step { name, delta } => {
                let current = self.lookup_or_undefined(name).as_number();
                self.vars.insert(name.clone(), Value::Number(current + delta));
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.exec(init)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval(cond)?.is_truthy() {
                            break;
                        }
                    }
                    self.spend_iteration()?;
                    self.exec_all(body)?;
                    if let Some(update) = update {
                        self.exec(update)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn spend_iteration(&mut self) -> Result<(), ScriptError> {
        self.iterations += 1;
        if self.iterations > self.limits.loop_budget {
            return Err(ScriptError::LoopBudget(self.limits.loop_budget));
        }
        Ok(())
    }

    fn lookup_or_undefined(&self, name: &str) -> Value {
        self.vars.get(name).cloned().unwrap_or_default()
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, ScriptError> {
        let value = match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Undefined => Value::Undefined,
            Expr::Null => Value::Null,
            Expr::Ident { name, .. } => match self.vars.get(name) {
                Some(value) => value.clone(),
                None => return Err(ScriptError::Undefined(name.clone())),
            },
            Expr::Unary { op, expr } => {
                let n = self.eval(expr)?.as_number();
                match op {
                    UnaryOp::Neg => Value::Number(-n),
                    UnaryOp::Plus => Value::Number(n),
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, &lhs, &rhs, self.limits.max_string_len)?
            }
            Expr::Call(call) => self.call(call)?,
        };
        Ok(value)
    }

    fn call(&mut self, call: &HostCall) -> Result<Value, ScriptError> {
        let args = call
            .args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let arg = |i: usize| args.get(i);

        match call.op {
            HostOp::CreateBall => self.host.create_ball(arg(0))?,
            HostOp::SetBallPosition => self.host.set_ball_position(arg(0), arg(1))?,
            HostOp::SetBallRadius => self.host.set_ball_radius(arg(0))?,
            HostOp::DropBall => self.host.drop_ball()?,
            HostOp::Print => self.host.print(arg(0)),
            HostOp::SetGravity => self.host.set_gravity(arg(0))?,
        }
        Ok(Value::Undefined)
    }
}

/// `+`: concatenation when either side is a string, numeric addition otherwise
fn add(lhs: &Value, rhs: &Value, max_len: usize) -> Result<Value, ScriptError> {
    match (lhs, rhs) {
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            let joined = format!("{}{}", lhs, rhs);
            if joined.len() > max_len {
                return Err(ScriptError::StringTooLong(max_len));
            }
            Ok(Value::Str(joined))
        }
        _ => Ok(Value::Number(lhs.as_number() + rhs.as_number())),
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value, max_len: usize) -> Result<Value, ScriptError> {
    let value = match op {
        BinaryOp::Add => return add(lhs, rhs, max_len),
        BinaryOp::Sub => Value::Number(lhs.as_number() - rhs.as_number()),
        BinaryOp::Mul => Value::Number(lhs.as_number() * rhs.as_number()),
        BinaryOp::Div => Value::Number(lhs.as_number() / rhs.as_number()),
        BinaryOp::Eq => Value::Bool(loose_eq(lhs, rhs)),
        BinaryOp::NotEq => Value::Bool(!loose_eq(lhs, rhs)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = match (lhs, rhs) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => lhs.as_number().partial_cmp(&rhs.as_number()),
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::LtEq => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    };
    Ok(value)
}

fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (a, b) if a.is_absent() || b.is_absent() => a.is_absent() && b.is_absent(),
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => lhs.as_number() == rhs.as_number(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use crate::script::parser::parse;

    /// Host that records calls without validating anything
    #[derive(Default)]
    struct TraceHost {
        calls: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl TraceHost {
        fn record(&mut self, op: &'static str, args: &[Option<&Value>]) -> Result<(), HostError> {
            let args: Vec<String> = args
                .iter()
                .map(|a| a.map(Value::to_string).unwrap_or_else(|| "-".into()))
                .collect();
            self.calls.push(format!("{}({})", op, args.join(",")));
            if self.fail_on == Some(op) {
                return Err(HostError::NoBallYet);
            }
            Ok(())
        }
    }

    impl ScriptHost for TraceHost {
        fn create_ball(&mut self, radius: Option<&Value>) -> Result<(), HostError> {
            self.record("createBall", &[radius])
        }
        fn set_ball_position(
            &mut self,
            x: Option<&Value>,
            y: Option<&Value>,
        ) -> Result<(), HostError> {
            self.record("setBallPosition", &[x, y])
        }
        fn set_ball_radius(&mut self, radius: Option<&Value>) -> Result<(), HostError> {
            self.record("setBallRadius", &[radius])
        }
        fn drop_ball(&mut self) -> Result<(), HostError> {
            self.record("dropBall", &[])
        }
        fn print(&mut self, message: Option<&Value>) {
            let _ = self.record("print", &[message]);
        }
        fn set_gravity(&mut self, gravity: Option<&Value>) -> Result<(), HostError> {
            self.record("setGravity", &[gravity])
        }
    }

    fn run(source: &str, host: &mut TraceHost) -> Result<(), ScriptError> {
        let program = parse(source)?;
        let limits = ScriptLimits {
            loop_budget: 100,
            max_string_len: 64,
        };
        Interpreter::new(host, limits).run(&program)
    }

    #[test]
    fn test_repeat_loop_calls_host() {
        let mut host = TraceHost::default();
        run(
            "var count;\nfor (var count = 0; count < 3; count++) {\n  api.print('tick ' + count);\n}\n",
            &mut host,
        )
        .unwrap();
        assert_eq!(host.calls, vec!["print(tick 0)", "print(tick 1)", "print(tick 2)"]);
    }

    #[test]
    fn test_ramp_print_concatenation() {
        let mut host = TraceHost::default();
        run("api.print('Created ramp with angle: ' + (30));", &mut host).unwrap();
        assert_eq!(host.calls, vec!["print(Created ramp with angle: 30)"]);
    }

    #[test]
    fn test_arguments_evaluate_before_call() {
        let mut host = TraceHost::default();
        run("var r = 10; r += 5; api.createBall(r * 2); api.setBallPosition(-r, 4 / 2);", &mut host)
            .unwrap();
        assert_eq!(host.calls, vec!["createBall(30)", "setBallPosition(-15,2)"]);
    }

    #[test]
    fn test_failure_stops_remaining_statements() {
        let mut host = TraceHost {
            fail_on: Some("setBallPosition"),
            ..Default::default()
        };
        let err = run(
            "api.createBall(20); api.setBallPosition(1, 2); api.dropBall();",
            &mut host,
        )
        .unwrap_err();
        assert_eq!(err, ScriptError::Host(HostError::NoBallYet));
        assert_eq!(host.calls.len(), 2);
    }

    #[test]
    fn test_undefined_variable() {
        let mut host = TraceHost::default();
        assert_eq!(
            run("api.createBall(size);", &mut host).unwrap_err(),
            ScriptError::Undefined("size".into())
        );
        assert!(host.calls.is_empty());
    }

    #[test]
    fn test_missing_argument_is_absent() {
        let mut host = TraceHost::default();
        run("api.setBallPosition(5);", &mut host).unwrap();
        assert_eq!(host.calls, vec!["setBallPosition(5,-)"]);
    }

    #[test]
    fn test_loop_budget() {
        let mut host = TraceHost::default();
        let err = run("for (var i = 0; i < 1000; i++) { api.dropBall(); }", &mut host).unwrap_err();
        assert_eq!(err, ScriptError::LoopBudget(100));
        assert_eq!(host.calls.len(), 100);

        let mut host = TraceHost::default();
        assert_eq!(
            run("for (;;) {}", &mut host).unwrap_err(),
            ScriptError::LoopBudget(100)
        );
    }

    #[test]
    fn test_string_doubling_hits_length_cap() {
        let mut host = TraceHost::default();
        let err = run(
            "var s = 'xxxxxxxx'; for (var i = 0; i < 40; i++) { s = s + s; } api.print(s);",
            &mut host,
        )
        .unwrap_err();
        assert_eq!(err, ScriptError::StringTooLong(64));
        assert!(host.calls.is_empty());

        // Exactly at the cap is fine
        let mut host = TraceHost::default();
        run(
            "var s = 'xxxxxxxx'; for (var i = 0; i < 3; i++) { s += s; } api.print(s);",
            &mut host,
        )
        .unwrap();
        assert_eq!(host.calls, vec![format!("print({})", "x".repeat(64))]);
    }

    #[test]
    fn test_comparisons() {
        let cmp = |op, lhs: Value, rhs: Value| binary(op, &lhs, &rhs, 64).unwrap();
        assert_eq!(
            cmp(BinaryOp::Lt, Value::Number(1.0), Value::Str("2".into())),
            Value::Bool(true)
        );
        assert_eq!(
            cmp(BinaryOp::Eq, Value::Undefined, Value::Null),
            Value::Bool(true)
        );
        assert_eq!(
            cmp(BinaryOp::GtEq, Value::Number(f64::NAN), Value::Number(1.0)),
            Value::Bool(false)
        );
    }
}
