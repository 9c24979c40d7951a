//! Execution controller
//!
//! Runs compiled scripts in "setup" or "drop" mode, commits validated build
//! records to the simulation, and hands out frame tickets while the ball is
//! falling. The simulation is only written here and by the integrator, and
//! a drop is refused while a motion is in progress.

use crate::error::{HostError, RunError};
use crate::render::{RenderFrame, RenderSink};
use crate::script::{HostEvent, RunContext, RunOutput, ScriptLimits, SetupSnapshot, run_script};
use crate::settings::Settings;
use crate::sim::{Ball, FrameLoop, FrameTicket, Physics, Simulation, SimulationPhase, tick};

/// Which button started the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Build the initial state without motion
    Setup,
    /// Commit the ball and start it falling
    Drop,
}

/// Result of an accepted run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub kind: RunKind,
    pub phase: SimulationPhase,
    /// First tick to schedule, when a motion started
    pub ticket: Option<FrameTicket>,
    /// Host events recorded by the script, in call order
    pub events: Vec<HostEvent>,
}

pub struct Controller {
    settings: Settings,
    sim: Simulation,
    snapshot: Option<SetupSnapshot>,
    frames: FrameLoop,
    output: Vec<String>,
}

impl Controller {
    pub fn new(settings: Settings) -> Self {
        let sim = Simulation::new(Physics::from_settings(&settings));
        Self {
            settings,
            sim,
            snapshot: None,
            frames: FrameLoop::new(),
            output: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn phase(&self) -> SimulationPhase {
        self.sim.phase
    }

    pub fn ball(&self) -> Option<&Ball> {
        self.sim.ball.as_ref()
    }

    /// Ball left by the last successful setup run
    pub fn snapshot(&self) -> Option<&SetupSnapshot> {
        self.snapshot.as_ref()
    }

    /// Output log lines of the last run
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn output_text(&self) -> String {
        self.output.join("\n")
    }

    /// Whether a tick chain is active
    pub fn is_running(&self) -> bool {
        self.frames.is_running()
    }

    pub fn run(&mut self, kind: RunKind, script: &str) -> Result<RunReport, RunError> {
        match kind {
            RunKind::Setup => self.setup_run(script),
            RunKind::Drop => self.drop_run(script),
        }
    }

    /// Execute `script` to configure a ball without starting motion.
    ///
    /// Accepted even while falling; the running motion is left alone and only
    /// the configured snapshot changes.
    pub fn setup_run(&mut self, script: &str) -> Result<RunReport, RunError> {
        if self.frames.is_disposed() {
            return Err(self.reject(RunError::ViewClosed));
        }
        self.output.clear();
        let out = match self.execute(script) {
            Ok(out) => out,
            Err(err) => return Err(self.fail(RunKind::Setup, err)),
        };

        if out.calls == 0 {
            if self.sim.is_falling() {
                log::debug!("Ignoring empty setup run during motion");
                return Ok(self.report(RunKind::Setup, None, Vec::new()));
            }
            return Err(self.reject(RunError::NoOpScript));
        }

        let ball = match resolve_ball(&out) {
            Ok(ball) => ball,
            Err(err) => return Err(self.fail(RunKind::Setup, err.into())),
        };

        self.output = out.output;
        self.snapshot = Some(SetupSnapshot {
            ball,
            gravity: out.record.gravity,
        });
        if !self.sim.is_falling() {
            self.sim.configure(ball);
        }
        log::info!(
            "Setup run configured ball at ({}, {}) r={}",
            ball.pos.x,
            ball.pos.y,
            ball.radius
        );

        Ok(self.report(RunKind::Setup, None, out.record.events))
    }

    /// Execute `script` and commit its ball: falling if it called `dropBall`,
    /// resting in place otherwise.
    pub fn drop_run(&mut self, script: &str) -> Result<RunReport, RunError> {
        if self.frames.is_disposed() {
            return Err(self.reject(RunError::ViewClosed));
        }
        if self.sim.is_falling() {
            return Err(self.reject(RunError::SimulationRunning));
        }

        self.output.clear();
        let out = match self.execute(script) {
            Ok(out) => out,
            Err(err) => return Err(self.fail(RunKind::Drop, err)),
        };

        if out.calls == 0 {
            return Err(self.reject(RunError::NoOpScript));
        }

        let ball = match resolve_ball(&out) {
            Ok(ball) => ball,
            Err(err) => return Err(self.fail(RunKind::Drop, err.into())),
        };

        self.output = out.output;
        let ticket = if out.record.drop_requested {
            let mut physics = Physics::from_settings(&self.settings);
            if let Some(gravity) = out.record.gravity {
                physics.gravity = gravity;
            }
            self.sim.drop_ball(ball, physics);
            log::info!(
                "Dropping ball from ({}, {}) r={} g={}",
                ball.pos.x,
                ball.pos.y,
                ball.radius,
                physics.gravity
            );
            self.frames.start()
        } else {
            self.frames.cancel();
            self.sim.rest(ball);
            log::info!(
                "Ball placed at rest at ({}, {}) without a drop",
                ball.pos.x,
                ball.pos.y
            );
            None
        };

        Ok(self.report(RunKind::Drop, ticket, out.record.events))
    }

    /// Advance one scheduled frame; returns the ticket for the next one
    pub fn frame<S: RenderSink + ?Sized>(
        &mut self,
        ticket: FrameTicket,
        sink: &mut S,
    ) -> Option<FrameTicket> {
        if !self.frames.admits(ticket) {
            log::debug!("Skipping stale frame (generation {})", ticket.generation());
            return None;
        }

        let outcome = tick(&mut self.sim);
        self.present(sink);

        if outcome.keeps_running() {
            Some(ticket)
        } else {
            self.frames.finish(ticket);
            None
        }
    }

    /// Paint the current state (empty scene when there is no ball)
    pub fn present<S: RenderSink + ?Sized>(&self, sink: &mut S) {
        let frame = self.sim.ball.as_ref().map(RenderFrame::from_ball);
        sink.present(frame.as_ref());
    }

    /// Back to the empty scene; pending frames go stale
    pub fn restart(&mut self) {
        self.frames.cancel();
        self.sim = Simulation::new(Physics::from_settings(&self.settings));
        self.snapshot = None;
        self.output.clear();
        log::info!("Simulation restarted");
    }

    /// Stop all scheduling for good (render target torn down); later runs
    /// are refused with `ViewClosed`
    pub fn dispose(&mut self) {
        self.frames.dispose();
        log::info!("Simulation view disposed");
    }

    fn execute(&self, script: &str) -> Result<RunOutput, RunError> {
        let mut ctx = RunContext::new(&self.settings, self.snapshot.as_ref());
        run_script(script, &mut ctx, ScriptLimits::from_settings(&self.settings))?;
        Ok(ctx.finish())
    }

    /// Refuse a run without touching the simulation
    fn reject(&mut self, err: RunError) -> RunError {
        log::warn!("Run rejected: {}", err);
        self.output = vec![err.to_string()];
        err
    }

    /// Discard the build record and return to the empty scene
    fn fail(&mut self, kind: RunKind, err: RunError) -> RunError {
        log::warn!("{:?} run failed: {}", kind, err);
        self.output = vec![err.to_string()];
        self.snapshot = None;
        if !self.sim.is_falling() {
            self.frames.cancel();
            self.sim.clear();
        }
        err
    }

    fn report(
        &self,
        kind: RunKind,
        ticket: Option<FrameTicket>,
        events: Vec<HostEvent>,
    ) -> RunReport {
        for event in &events {
            log::debug!("recorded {:?}", event);
        }
        RunReport {
            kind,
            phase: self.sim.phase,
            ticket,
            events,
        }
    }
}

/// The record's finished ball, if the script produced one
fn resolve_ball(out: &RunOutput) -> Result<Ball, HostError> {
    out.record
        .ball
        .as_ref()
        .ok_or(HostError::NoBallYet)
        .and_then(|draft| draft.complete())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::render::RecordingSink;
    use glam::Vec2;

    fn controller() -> Controller {
        Controller::new(Settings::default())
    }

    fn drive(ctl: &mut Controller, ticket: FrameTicket, sink: &mut RecordingSink) -> usize {
        let mut next = Some(ticket);
        let mut ticks = 0;
        while let Some(t) = next {
            next = ctl.frame(t, sink);
            ticks += 1;
        }
        ticks
    }

    #[test]
    fn test_setup_run_configures_without_motion() {
        let mut ctl = controller();
        let report = ctl
            .setup_run("api.createBall(30);\napi.setBallPosition(10, 50);\napi.dropBall();\n")
            .unwrap();
        assert_eq!(report.phase, SimulationPhase::Configured);
        assert!(report.ticket.is_none());
        assert_eq!(ctl.ball().unwrap().pos, Vec2::new(10.0, 50.0));
        assert_eq!(ctl.snapshot().unwrap().ball.radius, 30.0);
    }

    #[test]
    fn test_created_ball_renders_at_top() {
        let mut ctl = controller();
        ctl.setup_run("api.createBall(45);").unwrap();

        let mut sink = RecordingSink::new();
        ctl.present(&mut sink);
        let frame = sink.last().unwrap();
        assert_eq!((frame.x, frame.y, frame.radius), (0.0, 45.0, 45.0));
    }

    #[test]
    fn test_drop_run_falls_then_rests() {
        let mut ctl = controller();
        let report = ctl
            .drop_run("api.createBall(30);\napi.setBallPosition(10, 50);\napi.dropBall();\n")
            .unwrap();
        assert_eq!(report.phase, SimulationPhase::Falling);
        let ball = *ctl.ball().unwrap();
        assert_eq!(ball.pos, Vec2::new(10.0, 50.0));
        assert_eq!(ball.vel, Vec2::ZERO);
        assert_eq!(ball.radius, 30.0);

        let mut sink = RecordingSink::new();
        let ticks = drive(&mut ctl, report.ticket.unwrap(), &mut sink);
        assert_eq!(ticks, 110);
        assert_eq!(sink.frames.len(), 110);
        assert_eq!(ctl.phase(), SimulationPhase::Resting);
        assert_eq!(sink.last().unwrap().y, 370.0);
        assert!(!ctl.is_running());
    }

    #[test]
    fn test_drop_rejected_while_falling() {
        let mut ctl = controller();
        let report = ctl
            .drop_run("api.createBall(30); api.setBallPosition(10, 50); api.dropBall();")
            .unwrap();
        let ticket = report.ticket.unwrap();
        let before = ctl.simulation().clone();

        let err = ctl
            .drop_run("api.createBall(10); api.setBallPosition(-5, 5); api.dropBall();")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Concurrency);
        assert_eq!(ctl.simulation().ball, before.ball);
        assert_eq!(ctl.phase(), SimulationPhase::Falling);
        assert_eq!(ctl.output(), &[RunError::SimulationRunning.to_string()]);

        // Original chain keeps running
        let mut sink = RecordingSink::new();
        assert_eq!(ctl.frame(ticket, &mut sink), Some(ticket));
    }

    #[test]
    fn test_undropped_ball_rests_in_place() {
        let mut ctl = controller();
        let report = ctl
            .drop_run("api.createBall(25); api.setBallPosition(-100, 200);")
            .unwrap();
        assert_eq!(report.phase, SimulationPhase::Resting);
        assert!(report.ticket.is_none());
        assert_eq!(ctl.ball().unwrap().pos, Vec2::new(-100.0, 200.0));
    }

    #[test]
    fn test_drop_uses_setup_snapshot() {
        let mut ctl = controller();
        ctl.setup_run("api.createBall(15); api.setBallPosition(40, 80); api.setGravity(1);")
            .unwrap();
        let report = ctl.drop_run("api.dropBall();").unwrap();
        assert_eq!(report.phase, SimulationPhase::Falling);
        assert_eq!(ctl.ball().unwrap().pos, Vec2::new(40.0, 80.0));
        assert_eq!(ctl.simulation().physics.gravity, 1.0);
    }

    #[test]
    fn test_empty_script_is_noop() {
        let mut ctl = controller();
        ctl.setup_run("api.createBall(20);").unwrap();

        let err = ctl.drop_run("").unwrap_err();
        assert_eq!(err, RunError::NoOpScript);
        assert_eq!(ctl.output(), &[RunError::NoOpScript.to_string()]);
        assert_eq!(ctl.phase(), SimulationPhase::Configured);

        let err = ctl.setup_run("// only a comment\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoOp);
        assert_eq!(ctl.phase(), SimulationPhase::Configured);
    }

    #[test]
    fn test_empty_setup_ignored_while_falling() {
        let mut ctl = controller();
        ctl.drop_run("api.createBall(20); api.dropBall();").unwrap();
        let report = ctl.setup_run("").unwrap();
        assert_eq!(report.phase, SimulationPhase::Falling);
        assert!(ctl.output().is_empty());
    }

    #[test]
    fn test_validation_error_discards_record() {
        let mut ctl = controller();
        ctl.setup_run("api.createBall(20); api.setBallPosition(10, 10);")
            .unwrap();

        let err = ctl
            .setup_run("api.print('before'); api.createBall(20); api.setBallPosition(0, 10); api.print('after');")
            .unwrap_err();
        assert_eq!(err, RunError::from(HostError::ZeroCoordinate));
        assert_eq!(ctl.output(), &["Error: ball x and y values should not be 0.".to_string()]);
        assert_eq!(ctl.phase(), SimulationPhase::Empty);
        assert!(ctl.ball().is_none());
        assert!(ctl.snapshot().is_none());
    }

    #[test]
    fn test_setup_during_motion_keeps_falling() {
        let mut ctl = controller();
        let ticket = ctl
            .drop_run("api.createBall(20); api.setBallPosition(5, 5); api.dropBall();")
            .unwrap()
            .ticket
            .unwrap();

        ctl.setup_run("api.createBall(50); api.setBallPosition(100, 100);")
            .unwrap();
        assert_eq!(ctl.phase(), SimulationPhase::Falling);
        assert_eq!(ctl.ball().unwrap().radius, 20.0);
        assert_eq!(ctl.snapshot().unwrap().ball.radius, 50.0);

        let err = ctl.setup_run("api.createBall(-1);").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(ctl.phase(), SimulationPhase::Falling);
        assert!(ctl.snapshot().is_none());

        let mut sink = RecordingSink::new();
        assert_eq!(ctl.frame(ticket, &mut sink), Some(ticket));
    }

    #[test]
    fn test_print_only_script_has_no_ball() {
        let mut ctl = controller();
        let err = ctl.drop_run("api.print('hello');").unwrap_err();
        assert_eq!(err, RunError::from(HostError::NoBallYet));
        assert_eq!(ctl.output(), &["Error: ball has no x and y values.".to_string()]);
    }

    #[test]
    fn test_restart_invalidates_frames() {
        let mut ctl = controller();
        let ticket = ctl
            .drop_run("api.createBall(20); api.dropBall();")
            .unwrap()
            .ticket
            .unwrap();
        ctl.restart();
        assert_eq!(ctl.phase(), SimulationPhase::Empty);

        let mut sink = RecordingSink::new();
        assert_eq!(ctl.frame(ticket, &mut sink), None);
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_dispose_stops_ticks() {
        let mut ctl = controller();
        let ticket = ctl
            .drop_run("api.createBall(20); api.dropBall();")
            .unwrap()
            .ticket
            .unwrap();
        ctl.dispose();

        let mut sink = RecordingSink::new();
        assert_eq!(ctl.frame(ticket, &mut sink), None);
        assert!(sink.frames.is_empty());
        assert_eq!(ctl.ball().unwrap().pos, Vec2::new(0.0, 20.0));
    }

    #[test]
    fn test_runs_refused_after_dispose() {
        let mut ctl = controller();
        ctl.setup_run("api.createBall(20);").unwrap();
        ctl.dispose();

        let err = ctl
            .drop_run("api.createBall(20); api.dropBall();")
            .unwrap_err();
        assert_eq!(err, RunError::ViewClosed);
        assert_eq!(ctl.phase(), SimulationPhase::Configured);
        assert!(!ctl.is_running());
        assert_eq!(ctl.output(), &[err.to_string()]);

        assert_eq!(
            ctl.setup_run("api.createBall(30);").unwrap_err(),
            RunError::ViewClosed
        );
        assert_eq!(ctl.ball().unwrap().radius, 20.0);
    }

    #[test]
    fn test_second_drop_after_rest() {
        let mut ctl = controller();
        let ticket = ctl
            .drop_run("api.createBall(20); api.setBallPosition(1, 1); api.dropBall();")
            .unwrap()
            .ticket
            .unwrap();
        let mut sink = RecordingSink::new();
        drive(&mut ctl, ticket, &mut sink);
        assert_eq!(ctl.phase(), SimulationPhase::Resting);

        let report = ctl
            .drop_run("api.createBall(20); api.setBallPosition(1, 1); api.dropBall();")
            .unwrap();
        assert_eq!(report.phase, SimulationPhase::Falling);
        assert_ne!(report.ticket, Some(ticket));
    }
}
