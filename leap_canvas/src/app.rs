//! Top-level application loop.
//!
//! `AppState` owns the [`CanvasEngine`] and the status line.  It consumes
//! [`SourceEvent`]s and drives the visualizer each frame.

use std::sync::mpsc::{self, Receiver, TryRecvError};

use gesture_canvas::{CanvasConfig, CanvasEngine, DetectionFrame, HostAction};
use tracing::{debug, info, warn};

use crate::source::{spawn_into, SimDetectionSource, SimInput, SourceEvent};
use crate::visualizer::Visualizer;

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
pub struct AppConfig {
    pub canvas: CanvasConfig,
    pub title:  String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            canvas: CanvasConfig::default(),
            title:  "Leap Canvas — Multi-Hand Drawing".to_string(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    engine: CanvasEngine,

    /// Last command feedback, shown after the live counters.
    pub status: String,

    // ── host actions ─────────────────────────────────────────────────────
    exports: u32,
    camera:  u32,

    /// Frames superseded by a newer one before they were processed.
    skipped_frames: u64,
}

/// What the main loop should do after draining the source channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pump {
    Continue,
    Quit,
}

impl AppState {
    pub fn new(engine: CanvasEngine) -> Self {
        AppState {
            engine,
            status: "Ready".to_string(),
            exports: 0,
            camera: 0,
            skipped_frames: 0,
        }
    }

    pub fn engine(&self) -> &CanvasEngine { &self.engine }
    pub fn engine_mut(&mut self) -> &mut CanvasEngine { &mut self.engine }
    pub fn exports(&self) -> u32 { self.exports }
    pub fn camera(&self) -> u32 { self.camera }
    pub fn skipped_frames(&self) -> u64 { self.skipped_frames }

    /// Handle one event.  Returns false on `Quit`.
    pub fn handle_event(&mut self, event: SourceEvent) -> bool {
        match event {
            SourceEvent::Frame(frame) => {
                let outcome = self.engine.process_frame(frame);
                debug!(?outcome, "frame");
            }
            SourceEvent::Command(text) => self.handle_command(&text),
            SourceEvent::Failure { timestamp_ms, message } => {
                self.engine.report_detector_failure(timestamp_ms, &message);
            }
            SourceEvent::Quit => return false,
        }
        true
    }

    fn handle_command(&mut self, text: &str) {
        match self.engine.apply_text_command(text) {
            Ok(None) => self.status = format!("\"{text}\""),
            Ok(Some(HostAction::Export)) => {
                self.exports += 1;
                let strokes = self.engine.store().len();
                info!(export = self.exports, strokes, "export requested");
                self.status = format!("export #{} requested: {strokes} strokes", self.exports);
            }
            Ok(Some(HostAction::CameraSwitch)) => {
                self.camera += 1;
                info!(camera = self.camera, "camera switch requested");
                self.status = format!("camera switch requested: #{}", self.camera);
            }
            Err(e) => {
                warn!(error = %e, "command rejected");
                self.status = e.to_string();
            }
        }
    }

    /// Drain everything queued on `rx`.
    ///
    /// Commands and failures are handled in arrival order.  Of the queued
    /// detection frames only the newest is processed, after the drain.
    pub fn pump(&mut self, rx: &Receiver<SourceEvent>) -> Pump {
        let mut newest: Option<DetectionFrame> = None;
        let mut quit = false;
        loop {
            match rx.try_recv() {
                Ok(SourceEvent::Frame(frame)) => {
                    if newest.replace(frame).is_some() {
                        self.skipped_frames += 1;
                    }
                }
                Ok(SourceEvent::Quit) => {
                    quit = true;
                    break;
                }
                Ok(evt) => {
                    self.handle_event(evt);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    quit = true;
                    break;
                }
            }
        }
        if let Some(frame) = newest {
            self.handle_event(SourceEvent::Frame(frame));
        }
        if quit { Pump::Quit } else { Pump::Continue }
    }

    pub fn toggle_pause(&mut self) {
        let paused = !self.engine.is_paused();
        self.engine.set_paused(paused);
    }

    /// One-line HUD text.
    pub fn status_line(&self) -> String {
        let s = self.engine.status();
        let mut line = format!(
            "FPS {:.0}  LAT {:.1}MS  HANDS {}  STROKES {}  WIDTH {:.0}",
            s.fps,
            s.latency_ms,
            s.active_tracks(),
            s.strokes,
            self.engine.settings().thickness,
        );
        if s.guest_seconds_left > 0 {
            line.push_str(&format!("  GUESTS {}S", s.guest_seconds_left));
        }
        if s.eraser {
            line.push_str("  ERASER");
        }
        if s.paused {
            line.push_str("  PAUSED");
        }
        for t in &s.tracks {
            line.push_str(&format!("  {}:{}/{}", t.id, t.role.label(), t.phase.label()));
        }
        let message = s.message.as_deref().unwrap_or(&self.status);
        line.push_str("  | ");
        line.push_str(message);
        line
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  It creates the engine,
/// the visualizer and the detection source (simulation by default, hardware
/// with `--features leap`), and drives the event/render loop at ~60 fps.
pub fn run(cfg: AppConfig) -> Result<(), String> {
    let engine = CanvasEngine::with_config(cfg.canvas).map_err(|e| e.to_string())?;
    let mirror_x = engine.config().canvas.mirror_x;

    // ── Source channel ────────────────────────────────────────────────────
    let (event_tx, event_rx) = mpsc::channel::<SourceEvent>();
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();

    #[cfg(feature = "leap")]
    {
        spawn_into(crate::source::LeapDetectionSource, event_tx.clone());
        spawn_into(SimDetectionSource::commands_only(sim_rx), event_tx);
    }
    #[cfg(not(feature = "leap"))]
    spawn_into(SimDetectionSource::new(sim_rx), event_tx);

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(&cfg.title, &engine, sim_tx)?;

    let mut app = AppState::new(engine);
    info!("canvas ready");

    // ── Main loop ─────────────────────────────────────────────────────────
    while vis.is_open() {
        // 1. Poll window input → SimInput
        if !vis.poll_input(mirror_x) { break; }
        if vis.take_pause_toggle() {
            app.toggle_pause();
        }

        // 2. Drain source events
        if app.pump(&event_rx) == Pump::Quit {
            break;
        }

        // 3. Render
        let damage = app.engine_mut().take_damage();
        let status = app.status_line();
        vis.render(app.engine(), &damage, &status);
    }

    let stats = app.engine().stats();
    info!(
        processed = stats.processed,
        dropped = stats.dropped(),
        skipped = app.skipped_frames(),
        mean_fps = stats.mean_fps(),
        "session finished"
    );
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
