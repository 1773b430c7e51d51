//! Speed-adaptive low-pass filtering of noisy 2D landmark streams.
//!
//! A [`PointFilter`] keeps two pieces of state per axis: the smoothed
//! position and a smoothed derivative.  The derivative magnitude drives the
//! position cutoff:
//!
//! ```text
//! cutoff = min_cutoff + beta · |ẋ|
//! α      = 1 / (1 + τ/Δt),   τ = 1 / (2π · cutoff)
//! x̂ₙ     = α·xₙ + (1 − α)·x̂ₙ₋₁
//! ```
//!
//! A slow hand gets a low cutoff (heavy smoothing, no jitter); a fast hand
//! gets a high one (little lag).  Output is a pure function of the exact
//! `(point, timestamp)` sequence fed in.

use std::f32::consts::PI;

use crate::config::FilterConfig;
use crate::error::{CanvasError, Result};
use crate::geometry::Point2;

// ════════════════════════════════════════════════════════════════════════════
// LowPass — single exponential smoother
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default)]
struct LowPass {
    last: Option<f32>,
}

impl LowPass {
    fn apply(&mut self, x: f32, alpha: f32) -> f32 {
        let y = match self.last {
            Some(prev) => alpha * x + (1.0 - alpha) * prev,
            None       => x,
        };
        self.last = Some(y);
        y
    }
}

fn smoothing_factor(cutoff_hz: f32, dt_secs: f32) -> f32 {
    let tau = 1.0 / (2.0 * PI * cutoff_hz);
    1.0 / (1.0 + tau / dt_secs)
}

// ════════════════════════════════════════════════════════════════════════════
// PointFilter
// ════════════════════════════════════════════════════════════════════════════

/// Adaptive filter for one semantic point of one track.
#[derive(Clone, Debug)]
pub struct PointFilter {
    params:  FilterConfig,
    x:       LowPass,
    y:       LowPass,
    dx:      LowPass,
    dy:      LowPass,
    raw:     Option<Point2>,
    last_ms: Option<u64>,
}

impl PointFilter {
    pub fn new(params: FilterConfig) -> Self {
        PointFilter {
            params,
            x:       LowPass::default(),
            y:       LowPass::default(),
            dx:      LowPass::default(),
            dy:      LowPass::default(),
            raw:     None,
            last_ms: None,
        }
    }

    /// Filter one sample.
    ///
    /// The first sample of a fresh (or reset) filter is returned unchanged.
    /// Later samples must carry a strictly larger timestamp.
    pub fn filter(&mut self, p: Point2, t_ms: u64) -> Result<Point2> {
        let (prev_raw, prev_ms) = match (self.raw, self.last_ms) {
            (Some(r), Some(t)) => (r, t),
            _ => {
                self.raw = Some(p);
                self.last_ms = Some(t_ms);
                self.x.apply(p.x, 1.0);
                self.y.apply(p.y, 1.0);
                self.dx.apply(0.0, 1.0);
                self.dy.apply(0.0, 1.0);
                return Ok(p);
            }
        };
        if t_ms <= prev_ms {
            return Err(CanvasError::NonMonotonicTimestamp { prev_ms, now_ms: t_ms });
        }

        let dt = (t_ms - prev_ms) as f32 / 1000.0;
        let d_alpha = smoothing_factor(self.params.d_cutoff, dt);
        let vx = self.dx.apply((p.x - prev_raw.x) / dt, d_alpha);
        let vy = self.dy.apply((p.y - prev_raw.y) / dt, d_alpha);

        let cutoff = self.params.min_cutoff + self.params.beta * vx.hypot(vy);
        let alpha = smoothing_factor(cutoff, dt);
        let out = Point2::new(self.x.apply(p.x, alpha), self.y.apply(p.y, alpha));

        self.raw = Some(p);
        self.last_ms = Some(t_ms);
        Ok(out)
    }

    /// Last filtered output, if any sample has been seen.
    pub fn current(&self) -> Option<Point2> {
        Some(Point2::new(self.x.last?, self.y.last?))
    }

    /// Forget all state; the next sample passes through unchanged.
    pub fn reset(&mut self) {
        *self = PointFilter::new(self.params.clone());
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
