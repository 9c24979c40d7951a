//! Ball Drop entry point
//!
//! Web: canvas render sink, frame loop and the editor buttons.
//! Native: runs a compiled script file headlessly and reports the result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod web_app {
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

    use ball_drop::consts::*;
    use ball_drop::render::{RenderFrame, RenderSink};
    use ball_drop::sim::FrameTicket;
    use ball_drop::{Controller, RunKind, Settings, css_color};

    // Compile step supplied by the block editor on the page
    #[wasm_bindgen(inline_js = "
        export function compile_program() {
            if (window.Blockly && window.Blockly.getMainWorkspace &&
                window.BlocklyJS && typeof window.BlocklyJS.workspaceToCode === 'function') {
                return window.BlocklyJS.workspaceToCode(window.Blockly.getMainWorkspace());
            }
            return undefined;
        }
    ")]
    extern "C" {
        fn compile_program() -> Option<String>;
    }

    const EDITOR_MISSING: &str = "Blockly or code generator not loaded.";

    /// Paints frames onto the simulation canvas
    struct CanvasPainter {
        ctx: CanvasRenderingContext2d,
        width: f64,
        height: f64,
    }

    impl CanvasPainter {
        fn scene(&self) {
            self.ctx.clear_rect(0.0, 0.0, self.width, self.height);
            self.ctx.set_fill_style_str(&css_color(colors::BACKGROUND));
            self.ctx.fill_rect(0.0, 0.0, self.width, self.height);
        }

        fn floor(&self) {
            let thickness = FLOOR_THICKNESS as f64;
            self.ctx.set_fill_style_str(&css_color(colors::FLOOR));
            self.ctx
                .fill_rect(0.0, self.height - thickness, self.width, thickness);
        }
    }

    impl RenderSink for CanvasPainter {
        fn present(&mut self, frame: Option<&RenderFrame>) {
            self.scene();
            if let Some(frame) = frame {
                let center = frame.canvas_center(self.width as f32);
                self.ctx.set_fill_style_str(&css_color(frame.color));
                self.ctx.begin_path();
                if let Err(e) = self.ctx.arc(
                    center.x as f64,
                    center.y as f64,
                    frame.radius as f64,
                    0.0,
                    TAU,
                ) {
                    log::warn!("Ball draw failed: {:?}", e);
                }
                self.ctx.fill();
            }
            self.floor();
        }
    }

    struct App {
        controller: Controller,
        painter: CanvasPainter,
    }

    impl App {
        fn show_output(&self) {
            let document = web_sys::window().and_then(|w| w.document());
            if let Some(el) = document.and_then(|d| d.get_element_by_id("output")) {
                el.set_text_content(Some(&self.controller.output_text()));
            }
        }

        fn show_message(&self, message: &str) {
            let document = web_sys::window().and_then(|w| w.document());
            if let Some(el) = document.and_then(|d| d.get_element_by_id("output")) {
                el.set_text_content(Some(message));
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Ball Drop starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("sim-canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        let settings = Settings::load();
        canvas.set_width(settings.width as u32);
        canvas.set_height(settings.height as u32);

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .expect("no 2d context")
            .dyn_into()
            .expect("not a 2d context");

        let painter = CanvasPainter {
            ctx,
            width: settings.width as f64,
            height: settings.height as f64,
        };
        let app = Rc::new(RefCell::new(App {
            controller: Controller::new(settings),
            painter,
        }));

        {
            let mut a = app.borrow_mut();
            let a = &mut *a;
            a.controller.present(&mut a.painter);
        }

        setup_run_button(app.clone(), "run-btn", RunKind::Setup);
        setup_run_button(app.clone(), "drop-btn", RunKind::Drop);
        setup_restart_button(app.clone());
        setup_teardown(app);

        log::info!("Ball Drop running!");
    }

    fn setup_run_button(app: Rc<RefCell<App>>, id: &str, kind: RunKind) {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();

        if let Some(btn) = document.get_element_by_id(id) {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let Some(code) = compile_program() else {
                    app.borrow().show_message(EDITOR_MISSING);
                    return;
                };

                let ticket = {
                    let mut a = app.borrow_mut();
                    let a = &mut *a;
                    let result = a.controller.run(kind, &code);
                    a.show_output();
                    a.controller.present(&mut a.painter);
                    result.ok().and_then(|report| report.ticket)
                };

                if let Some(ticket) = ticket {
                    request_animation_frame(app.clone(), ticket);
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_restart_button(app: Rc<RefCell<App>>) {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();

        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                let a = &mut *a;
                a.controller.restart();
                a.show_output();
                a.controller.present(&mut a.painter);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Stop frame callbacks once the page is going away
    fn setup_teardown(app: Rc<RefCell<App>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            app.borrow_mut().controller.dispose();
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(app: Rc<RefCell<App>>, ticket: FrameTicket) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |_time: f64| {
            frame_loop(app, ticket);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame_loop(app: Rc<RefCell<App>>, ticket: FrameTicket) {
        let next = {
            let mut a = app.borrow_mut();
            let a = &mut *a;
            a.controller.frame(ticket, &mut a.painter)
        };

        if let Some(ticket) = next {
            request_animation_frame(app, ticket);
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    web_app::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::io::Read;
    use std::path::PathBuf;

    use ball_drop::render::{RenderFrame, RenderSink};
    use ball_drop::settings::SettingsError;
    use ball_drop::{Controller, RunKind, Settings};

    /// Upper bound on ticks driven from the command line
    const MAX_TICKS: u64 = 1_000_000;

    const USAGE: &str = "usage: ball-drop [--config <settings.json>] [--setup] <script | ->";

    #[derive(Debug, thiserror::Error)]
    pub enum CliError {
        #[error("{0}")]
        Usage(String),

        #[error("cannot read {path}: {source}")]
        Io {
            path: String,
            source: std::io::Error,
        },

        #[error(transparent)]
        Settings(#[from] SettingsError),
    }

    struct Args {
        config: Option<PathBuf>,
        kind: RunKind,
        script: String,
    }

    fn parse_args() -> Result<Args, CliError> {
        let mut config = None;
        let mut kind = RunKind::Drop;
        let mut script = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args
                        .next()
                        .ok_or_else(|| CliError::Usage("--config needs a path".into()))?;
                    config = Some(PathBuf::from(path));
                }
                "--setup" => kind = RunKind::Setup,
                "-h" | "--help" => return Err(CliError::Usage(USAGE.into())),
                _ if script.is_none() => script = Some(arg),
                _ => return Err(CliError::Usage(USAGE.into())),
            }
        }

        let script = script.ok_or_else(|| CliError::Usage(USAGE.into()))?;
        Ok(Args {
            config,
            kind,
            script,
        })
    }

    fn read_source(path: &str) -> Result<String, CliError> {
        let io = |source| CliError::Io {
            path: path.to_string(),
            source,
        };
        if path == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map_err(io)?;
            Ok(buf)
        } else {
            std::fs::read_to_string(path).map_err(io)
        }
    }

    /// Logs every frame and remembers the last one
    #[derive(Default)]
    struct LogSink {
        frames: u64,
        last: Option<RenderFrame>,
    }

    impl RenderSink for LogSink {
        fn present(&mut self, frame: Option<&RenderFrame>) {
            self.frames += 1;
            match frame {
                Some(f) => log::debug!("frame {}: x={} y={} r={}", self.frames, f.x, f.y, f.radius),
                None => log::debug!("frame {}: empty scene", self.frames),
            }
            self.last = frame.copied();
        }
    }

    pub fn run() -> Result<(), CliError> {
        let args = parse_args()?;

        let settings = match &args.config {
            Some(path) => {
                let json = read_source(&path.to_string_lossy())?;
                Settings::from_json(&json)?
            }
            None => Settings::load(),
        };
        let source = read_source(&args.script)?;

        let mut controller = Controller::new(settings);
        let mut sink = LogSink::default();

        let result = controller.run(args.kind, &source);
        for line in controller.output() {
            println!("{}", line);
        }

        let report = match result {
            Ok(report) => report,
            Err(err) => {
                log::info!("Run ended with {:?}", err.kind());
                return Ok(());
            }
        };

        let mut next = report.ticket;
        let mut ticks = 0;
        while let Some(ticket) = next {
            if ticks >= MAX_TICKS {
                log::warn!("Stopping after {} ticks", MAX_TICKS);
                break;
            }
            next = controller.frame(ticket, &mut sink);
            ticks += 1;
        }
        if ticks == 0 {
            controller.present(&mut sink);
        }

        let phase = controller.phase();
        match sink.last {
            Some(f) => println!(
                "{} after {} ticks: x={} y={} radius={}",
                phase.as_str(),
                ticks,
                f.x,
                f.y,
                f.radius
            ),
            None => println!("{}: no ball", phase.as_str()),
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Ball Drop (native) starting...");

    if let Err(e) = native::run() {
        eprintln!("{}", e);
        std::process::exit(2);
    }
}
