//! Tuning configuration for the whole pipeline.
//!
//! Every stage reads its thresholds from one [`CanvasConfig`], loadable from
//! TOML at startup:
//!
//! ```toml
//! [tracking]
//! max_match_distance = 0.2
//! ttl_ms = 700
//!
//! [gestures]
//! stability_max = 6
//! activate_at = 3
//!
//! [frame]
//! max_fps = 30.0
//! ```
//!
//! Missing tables and fields fall back to [`Default`], so an empty file is a
//! valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{CanvasError, Result};

// ════════════════════════════════════════════════════════════════════════════
// CanvasConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub filter:      FilterConfig,
    pub tracking:    TrackingConfig,
    pub gestures:    GestureConfig,
    pub roles:       RoleConfig,
    pub store:       StoreConfig,
    pub interaction: InteractionConfig,
    pub canvas:      CanvasGeometry,
    pub frame:       FrameConfig,
}

/// Adaptive low-pass parameters (shared by all three per-track filters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Cutoff (Hz) at rest.
    pub min_cutoff: f32,
    /// How much the cutoff rises per unit of speed (normalized units / s).
    pub beta: f32,
    /// Cutoff (Hz) for the derivative estimate.
    pub d_cutoff: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig { min_cutoff: 1.2, beta: 8.0, d_cutoff: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Largest wrist displacement (normalized) still treated as the same hand.
    pub max_match_distance: f32,
    /// How long an unmatched track survives.
    pub ttl_ms: u64,
    pub max_tracks: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        TrackingConfig { max_match_distance: 0.2, ttl_ms: 700, max_tracks: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Fingertip must beat the middle joint by this fraction of hand scale.
    pub extension_margin: f32,
    /// Upper clamp of each stability counter.
    pub stability_max: u8,
    /// Counter value at which a gesture turns on.
    pub activate_at: u8,
    /// Counter value below which an active gesture turns off.
    pub release_below: u8,
    /// POINT and PALM require pinch strength under this.
    pub open_pinch_max: f32,
    /// Pinch strength that starts a GRAB.
    pub pinch_on: f32,
    /// Pinch strength that keeps an already active GRAB alive.
    pub pinch_off: f32,
    /// External labels below this confidence are ignored.
    pub label_min_confidence: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            extension_margin:     0.1,
            stability_max:        6,
            activate_at:          3,
            release_below:        3,
            open_pinch_max:       0.4,
            pinch_on:             0.8,
            pinch_off:            0.6,
            label_min_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Weight kept by the reference scale each frame.
    pub reference_keep: f32,
    /// A hand this fraction (or less) smaller than the reference is still admin.
    pub admin_tolerance: f32,
    pub guest_window_secs: u64,
    /// Color that marks guest strokes and opens the guest window.
    pub sentinel_color: Color,
}

impl Default for RoleConfig {
    fn default() -> Self {
        RoleConfig {
            reference_keep:    0.85,
            admin_tolerance:   0.22,
            guest_window_secs: 30,
            sentinel_color:    Color::GOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Per-call scale factor clamp.
    pub min_scale: f32,
    pub max_scale: f32,
    /// Point width clamp (pixels).
    pub min_width: f32,
    pub max_width: f32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig { min_scale: 0.25, max_scale: 3.0, min_width: 1.0, max_width: 64.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Initial brush color.
    pub brush_color: Color,
    /// Initial stroke width (pixels) for a hand at the reference scale.
    pub base_thickness: f32,
    pub pick_radius_px: f32,
    pub eraser_radius_px: f32,
    /// Single-hand pinch scale ratio is clamped to `1 ± band` per frame.
    pub pinch_scale_band: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            brush_color:      Color::CYAN,
            base_thickness:   6.0,
            pick_radius_px:   28.0,
            eraser_radius_px: 22.0,
            pinch_scale_band: 0.08,
        }
    }
}

/// Mapping from normalized detection space to canvas pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasGeometry {
    pub width: u32,
    pub height: u32,
    /// Flip x (selfie-camera view).
    pub mirror_x: bool,
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        CanvasGeometry { width: 1280, height: 720, mirror_x: false }
    }
}

impl CanvasGeometry {
    pub fn to_canvas(&self, p: crate::geometry::Point2) -> crate::geometry::Point2 {
        let x = if self.mirror_x { 1.0 - p.x } else { p.x };
        crate::geometry::Point2::new(x * self.width as f32, p.y * self.height as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frames closer together than `1 / max_fps` are dropped. `0` disables the cap.
    pub max_fps: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig { max_fps: 30.0 }
    }
}

impl FrameConfig {
    pub fn min_interval_ms(&self) -> f64 {
        if self.max_fps > 0.0 { 1000.0 / self.max_fps as f64 } else { 0.0 }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Settings — the user-adjustable part, owned by the engine
// ════════════════════════════════════════════════════════════════════════════

/// Runtime settings changed by commands and read by every frame step.
///
/// The engine owns the only mutable copy; pipeline stages receive `&Settings`.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub brush_color:    Color,
    pub thickness:      f32,
    pub eraser:         bool,
    pub glow:           bool,
    pub show_landmarks: bool,
}

impl Settings {
    pub fn from_config(cfg: &InteractionConfig) -> Self {
        Settings {
            brush_color:    cfg.brush_color,
            thickness:      cfg.base_thickness,
            eraser:         false,
            glow:           false,
            show_landmarks: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from_config(&InteractionConfig::default())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Loading & validation
// ════════════════════════════════════════════════════════════════════════════

impl CanvasConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CanvasError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML; feeding the result back to `from_toml_str` yields an
    /// equal config.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let cfg = Self::from_toml_file(path)?;
        let problems = cfg.validate();
        if problems.is_empty() {
            Ok(cfg)
        } else {
            Err(CanvasError::InvalidConfig { problems })
        }
    }

    /// Returns every problem found; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut positive = |name: &str, v: f32| {
            if !(v > 0.0 && v.is_finite()) {
                errors.push(format!("{name} must be > 0, got {v}"));
            }
        };
        positive("filter.min_cutoff", self.filter.min_cutoff);
        positive("filter.d_cutoff", self.filter.d_cutoff);
        positive("tracking.max_match_distance", self.tracking.max_match_distance);
        positive("interaction.base_thickness", self.interaction.base_thickness);
        positive("interaction.pick_radius_px", self.interaction.pick_radius_px);
        positive("interaction.eraser_radius_px", self.interaction.eraser_radius_px);
        positive("store.min_scale", self.store.min_scale);
        positive("store.min_width", self.store.min_width);

        if self.filter.beta < 0.0 {
            errors.push(format!("filter.beta must be >= 0, got {}", self.filter.beta));
        }
        if self.tracking.max_tracks == 0 {
            errors.push("tracking.max_tracks must be > 0".into());
        }
        let g = &self.gestures;
        if g.activate_at == 0 || g.activate_at > g.stability_max {
            errors.push(format!(
                "gestures.activate_at must be in 1..={}, got {}",
                g.stability_max, g.activate_at
            ));
        }
        if g.release_below > g.activate_at {
            errors.push(format!(
                "gestures.release_below ({}) must not exceed activate_at ({})",
                g.release_below, g.activate_at
            ));
        }
        if g.pinch_off > g.pinch_on {
            errors.push(format!(
                "gestures.pinch_off ({}) must not exceed pinch_on ({})",
                g.pinch_off, g.pinch_on
            ));
        }
        if g.open_pinch_max > g.pinch_off {
            errors.push(format!(
                "gestures.open_pinch_max ({}) must not exceed pinch_off ({})",
                g.open_pinch_max, g.pinch_off
            ));
        }
        let r = &self.roles;
        if !(0.0..1.0).contains(&r.reference_keep) {
            errors.push(format!("roles.reference_keep must be in [0, 1), got {}", r.reference_keep));
        }
        if !(0.0..1.0).contains(&r.admin_tolerance) {
            errors.push(format!("roles.admin_tolerance must be in [0, 1), got {}", r.admin_tolerance));
        }
        if self.store.max_scale < self.store.min_scale {
            errors.push("store.max_scale must be >= store.min_scale".into());
        }
        if self.store.max_width < self.store.min_width {
            errors.push("store.max_width must be >= store.min_width".into());
        }
        if !(0.0..1.0).contains(&self.interaction.pinch_scale_band) {
            errors.push(format!(
                "interaction.pinch_scale_band must be in [0, 1), got {}",
                self.interaction.pinch_scale_band
            ));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            errors.push("canvas dimensions must be non-zero".into());
        }
        if self.frame.max_fps < 0.0 {
            errors.push(format!("frame.max_fps must be >= 0, got {}", self.frame.max_fps));
        }
        errors
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
