//! The per-frame pipeline.
//!
//! [`CanvasEngine`] owns every stage and runs them in a fixed order for each
//! accepted detection frame:
//!
//! ```text
//! DetectionFrame ─► TrackAssigner ─► RoleArbitrator::observe
//!                ─► Track::classify (per track)
//!                ─► InteractionResolver::step ─► StrokeStore
//! ```
//!
//! Frames closer together than the configured rate cap are dropped, never
//! queued.  Commands go through the same store and role entry points the
//! resolver uses.

use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::commands::{Command, HostAction, Thickness};
use crate::config::{CanvasConfig, Settings};
use crate::detection::DetectionFrame;
use crate::error::{CanvasError, Result};
use crate::resolver::{InteractionResolver, TwoActorSession};
use crate::roles::{Role, RoleArbitrator};
use crate::store::{Damage, Stroke, StrokeStore};
use crate::tracker::{Track, TrackAssigner, TrackId, TrackPhase};

/// Step applied by `Thicker` / `Thinner`, in pixels.
const THICKNESS_STEP: f32 = 2.0;
/// Timestamp jitter tolerated by the rate cap.
const RATE_SLACK_MS: f64 = 1.0;
/// Weight of the newest sample in the fps and latency averages.
const EMA_ALPHA: f32 = 0.1;

// ════════════════════════════════════════════════════════════════════════════
// Outcomes & status
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Processed,
    DroppedRateLimited,
    /// Timestamp not after the last accepted frame.
    DroppedStale,
    Paused,
}

/// Running frame counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub processed:     u64,
    pub dropped_rate:  u64,
    pub dropped_stale: u64,
    pub ignored_paused: u64,
    pub detector_failures: u64,
    first_ms: Option<u64>,
    last_ms:  Option<u64>,
}

impl FrameStats {
    /// Average processed frames per second of detection time.
    pub fn mean_fps(&self) -> f32 {
        match (self.first_ms, self.last_ms) {
            (Some(a), Some(b)) if b > a => {
                (self.processed.saturating_sub(1)) as f32 * 1000.0 / (b - a) as f32
            }
            _ => 0.0,
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped_rate + self.dropped_stale
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackStatus {
    pub id:    TrackId,
    pub role:  Role,
    pub phase: TrackPhase,
}

/// Everything a HUD needs, by value.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusSummary {
    pub tracks:             Vec<TrackStatus>,
    pub guest_seconds_left: u64,
    pub fps:                f32,
    pub latency_ms:         f32,
    pub paused:             bool,
    pub eraser:             bool,
    pub strokes:            usize,
    /// Transient message, e.g. a detector failure.
    pub message:            Option<String>,
    pub stats:              FrameStats,
}

impl StatusSummary {
    pub fn active_tracks(&self) -> usize {
        self.tracks.len()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CanvasEngine
// ════════════════════════════════════════════════════════════════════════════

pub struct CanvasEngine {
    cfg:      CanvasConfig,
    settings: Settings,
    tracker:  TrackAssigner,
    roles:    RoleArbitrator,
    store:    StrokeStore,
    resolver: InteractionResolver,

    paused:        bool,
    last_accepted: Option<u64>,
    /// Latest timestamp seen from any source; the clock for commands.
    clock_ms:      u64,
    failing:       bool,
    message:       Option<String>,
    fps_ema:       f32,
    latency_ema:   f32,
    stats:         FrameStats,
}

impl CanvasEngine {
    pub fn new(cfg: CanvasConfig) -> Self {
        CanvasEngine {
            settings: Settings::from_config(&cfg.interaction),
            tracker:  TrackAssigner::new(cfg.tracking.clone(), cfg.filter.clone()),
            roles:    RoleArbitrator::new(cfg.roles.clone()),
            store:    StrokeStore::new(cfg.store.clone()),
            resolver: InteractionResolver::new(cfg.interaction.clone(), cfg.canvas.clone()),
            cfg,
            paused: false,
            last_accepted: None,
            clock_ms: 0,
            failing: false,
            message: None,
            fps_ema: 0.0,
            latency_ema: 0.0,
            stats: FrameStats::default(),
        }
    }

    /// Validate `cfg` first; fails with every problem found.
    pub fn with_config(cfg: CanvasConfig) -> Result<Self> {
        let problems = cfg.validate();
        if !problems.is_empty() {
            return Err(CanvasError::InvalidConfig { problems });
        }
        Ok(CanvasEngine::new(cfg))
    }

    // ── frames ───────────────────────────────────────────────────────────

    pub fn process_frame(&mut self, frame: DetectionFrame) -> FrameOutcome {
        let ts = frame.timestamp_ms;
        if self.paused {
            self.stats.ignored_paused += 1;
            return FrameOutcome::Paused;
        }
        if let Some(prev) = self.last_accepted {
            if ts <= prev {
                self.stats.dropped_stale += 1;
                trace!(ts, prev, "stale frame dropped");
                return FrameOutcome::DroppedStale;
            }
            if ((ts - prev) as f64) + RATE_SLACK_MS < self.cfg.frame.min_interval_ms() {
                self.stats.dropped_rate += 1;
                trace!(ts, prev, "frame over rate cap dropped");
                return FrameOutcome::DroppedRateLimited;
            }
            let inst = 1000.0 / (ts - prev) as f32;
            self.fps_ema = if self.fps_ema == 0.0 { inst } else { ema(self.fps_ema, inst) };
        }

        let started = Instant::now();
        self.last_accepted = Some(ts);
        self.clock_ms = self.clock_ms.max(ts);
        if self.failing {
            info!("detector recovered");
        }
        self.failing = false;
        self.message = None;

        let report = self.tracker.update(frame.hands, ts);
        if report.malformed > 0 || report.over_cap > 0 {
            debug!(malformed = report.malformed, over_cap = report.over_cap, "detections skipped");
        }
        self.run_stages(ts);

        let latency = started.elapsed().as_secs_f32() * 1000.0;
        self.latency_ema = if self.stats.processed == 0 { latency } else { ema(self.latency_ema, latency) };
        self.stats.processed += 1;
        self.stats.first_ms.get_or_insert(ts);
        self.stats.last_ms = Some(ts);
        trace!(
            ts,
            tracks = self.tracker.len(),
            strokes = self.store.len(),
            latency_ms = latency,
            "frame processed"
        );
        FrameOutcome::Processed
    }

    /// The detector failed to deliver a frame at `now_ms`.
    ///
    /// The message is surfaced once per failure streak; tracks decay as if
    /// the frame had been empty.
    pub fn report_detector_failure(&mut self, now_ms: u64, msg: &str) {
        self.stats.detector_failures += 1;
        if !self.failing {
            warn!(error = msg, "detector failure");
            self.message = Some(format!("detector: {msg}"));
            self.failing = true;
        }
        if self.paused {
            return;
        }
        let now = now_ms.max(self.clock_ms);
        self.clock_ms = now;
        self.tracker.update(Vec::new(), now);
        self.run_stages(now);
    }

    fn run_stages(&mut self, now_ms: u64) {
        self.roles.observe(self.tracker.tracks());
        for t in self.tracker.tracks_mut() {
            t.classify(&self.cfg.gestures);
        }
        self.resolver.step(
            self.tracker.tracks_mut(),
            &mut self.roles,
            &mut self.store,
            &self.settings,
            now_ms,
        );
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            info!(paused, "pause toggled");
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // ── commands ─────────────────────────────────────────────────────────

    /// Apply one command; returns the host action, if it has one.
    pub fn apply_command(&mut self, cmd: Command) -> Option<HostAction> {
        info!(command = ?cmd, "command");
        match cmd {
            Command::Undo => {
                self.store.undo();
            }
            Command::Redo => {
                self.store.redo();
            }
            Command::Clear => self.store.clear_all(),
            Command::SetColor(c) => self.settings.brush_color = c,
            Command::SetThickness(t) => {
                let (lo, hi) = (self.cfg.store.min_width, self.cfg.store.max_width);
                let next = match t {
                    Thickness::Absolute(w) => w,
                    Thickness::Thicker     => self.settings.thickness + THICKNESS_STEP,
                    Thickness::Thinner     => self.settings.thickness - THICKNESS_STEP,
                };
                self.settings.thickness = next.clamp(lo, hi);
            }
            Command::ToggleGlow      => self.settings.glow = !self.settings.glow,
            Command::ToggleLandmarks => self.settings.show_landmarks = !self.settings.show_landmarks,
            Command::ToggleEraser    => self.settings.eraser = !self.settings.eraser,
            Command::GuestLock       => self.roles.lock_guests(),
            Command::GuestUnlock     => self.roles.unlock_guests(self.clock_ms),
            Command::CameraSwitch | Command::Export => {}
        }
        cmd.host_action()
    }

    /// Parse and apply a transcript.
    pub fn apply_text_command(&mut self, text: &str) -> Result<Option<HostAction>> {
        let cmd = Command::parse(text)?;
        Ok(self.apply_command(cmd))
    }

    // ── read side ────────────────────────────────────────────────────────

    /// Render-invalidate signal accumulated since the last call.
    pub fn take_damage(&mut self) -> Damage {
        self.store.take_damage()
    }

    /// Strokes in z-order.
    pub fn strokes(&self) -> impl Iterator<Item = &Stroke> + '_ {
        self.store.iter()
    }

    pub fn snapshot(&self) -> Vec<Stroke> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &StrokeStore {
        &self.store
    }

    pub fn tracks(&self) -> &[Track] {
        self.tracker.tracks()
    }

    pub fn roles(&self) -> &RoleArbitrator {
        &self.roles
    }

    pub fn session(&self) -> Option<&TwoActorSession> {
        self.resolver.session()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.cfg
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn status(&self) -> StatusSummary {
        StatusSummary {
            tracks: self
                .tracker
                .tracks()
                .iter()
                .map(|t| TrackStatus { id: t.id, role: self.roles.role(t), phase: t.phase })
                .collect(),
            guest_seconds_left: self.roles.guest_window_remaining_secs(self.clock_ms),
            fps:        self.fps_ema,
            latency_ms: self.latency_ema,
            paused:     self.paused,
            eraser:     self.settings.eraser,
            strokes:    self.store.len(),
            message:    self.message.clone(),
            stats:      self.stats.clone(),
        }
    }
}

fn ema(prev: f32, sample: f32) -> f32 {
    prev * (1.0 - EMA_ALPHA) + sample * EMA_ALPHA
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::detection::{HandDetection, HandPose};
    use crate::geometry::Point2;

    fn pointing(ts: u64, x: f32) -> DetectionFrame {
        DetectionFrame::new(ts, vec![HandDetection::upright(HandPose::Point, Point2::new(x, 0.5), 0.1)])
    }

    fn uncapped() -> CanvasEngine {
        let mut cfg = CanvasConfig::default();
        cfg.frame.max_fps = 0.0;
        CanvasEngine::new(cfg)
    }

    #[test]
    fn rate_cap_drops_early_frames() {
        let mut e = CanvasEngine::new(CanvasConfig::default());
        assert_eq!(e.process_frame(pointing(0, 0.5)), FrameOutcome::Processed);
        assert_eq!(e.process_frame(pointing(10, 0.5)), FrameOutcome::DroppedRateLimited);
        assert_eq!(e.process_frame(pointing(33, 0.5)), FrameOutcome::Processed);
        assert_eq!(e.stats().processed, 2);
        assert_eq!(e.stats().dropped_rate, 1);
    }

    #[test]
    fn stale_frames_are_dropped() {
        let mut e = uncapped();
        e.process_frame(pointing(100, 0.5));
        assert_eq!(e.process_frame(pointing(100, 0.5)), FrameOutcome::DroppedStale);
        assert_eq!(e.process_frame(pointing(50, 0.5)), FrameOutcome::DroppedStale);
        assert_eq!(e.stats().dropped(), 2);
    }

    #[test]
    fn paused_frames_are_ignored() {
        let mut e = uncapped();
        e.set_paused(true);
        for i in 1..10 {
            assert_eq!(e.process_frame(pointing(i * 30, 0.5)), FrameOutcome::Paused);
        }
        assert!(e.tracks().is_empty());
        e.set_paused(false);
        assert_eq!(e.process_frame(pointing(400, 0.5)), FrameOutcome::Processed);
        assert_eq!(e.tracks().len(), 1);
    }

    #[test]
    fn failure_message_once_then_cleared() {
        let mut e = uncapped();
        for i in 1..=6 {
            e.process_frame(pointing(i * 30, 0.3 + 0.01 * i as f32));
        }
        assert_eq!(e.tracks()[0].phase, TrackPhase::Pointing);

        for i in 7..=12 {
            e.report_detector_failure(i * 30, "camera timeout");
        }
        let st = e.status();
        assert_eq!(st.message.as_deref(), Some("detector: camera timeout"));
        assert_eq!(st.stats.detector_failures, 6);
        // Counters drained while the detector was down.
        assert_eq!(e.tracks()[0].phase, TrackPhase::Idle);
        assert_eq!(e.store().len(), 1);

        e.process_frame(pointing(13 * 30, 0.4));
        assert_eq!(e.status().message, None);
    }

    #[test]
    fn text_commands_use_store_entry_points() {
        let mut e = uncapped();
        for i in 1..=8 {
            e.process_frame(pointing(i * 30, 0.3 + 0.01 * i as f32));
        }
        for i in 9..=14 {
            e.process_frame(DetectionFrame::new(i * 30, vec![]));
        }
        assert_eq!(e.store().len(), 1);
        assert_eq!(e.apply_text_command("undo").unwrap(), None);
        assert!(e.store().is_empty());
        e.apply_text_command("redo please").unwrap();
        assert_eq!(e.store().len(), 1);
        assert!(e.take_damage().full_redraw);
        e.apply_text_command("clear the canvas").unwrap();
        assert!(e.snapshot().is_empty());
        assert!(e.apply_text_command("do a backflip").is_err());
    }

    #[test]
    fn settings_commands() {
        let mut e = uncapped();
        e.apply_command(Command::SetColor(Color::GREEN));
        assert_eq!(e.settings().brush_color, Color::GREEN);
        e.apply_command(Command::SetThickness(Thickness::Absolute(500.0)));
        assert_eq!(e.settings().thickness, e.config().store.max_width);
        e.apply_command(Command::SetThickness(Thickness::Absolute(6.0)));
        e.apply_command(Command::SetThickness(Thickness::Thinner));
        assert_eq!(e.settings().thickness, 4.0);
        e.apply_command(Command::ToggleEraser);
        assert!(e.status().eraser);
        assert_eq!(e.apply_command(Command::Export), Some(HostAction::Export));
    }

    #[test]
    fn unlock_command_uses_frame_clock() {
        let mut e = uncapped();
        e.process_frame(pointing(5_000, 0.5));
        e.apply_command(Command::GuestUnlock);
        assert_eq!(e.status().guest_seconds_left, 30);
        assert!(e.roles().guest_window_active(34_999));
        assert!(!e.roles().guest_window_active(35_000));
        e.apply_command(Command::GuestLock);
        assert_eq!(e.status().guest_seconds_left, 0);
    }

    #[test]
    fn status_reports_tracks() {
        let mut e = uncapped();
        for i in 1..=4 {
            e.process_frame(pointing(i * 30, 0.5));
        }
        let st = e.status();
        assert_eq!(st.active_tracks(), 1);
        assert_eq!(st.tracks[0].role, Role::Admin);
        assert_eq!(st.tracks[0].phase, TrackPhase::Pointing);
        assert!((st.fps - 1000.0 / 30.0).abs() < 0.01);
        assert_eq!(st.strokes, 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = CanvasConfig::default();
        cfg.tracking.max_tracks = 0;
        assert!(CanvasEngine::with_config(cfg).is_err());
    }
}
