//! Presenter/guest arbitration from hand size alone.
//!
//! The hand closest to the camera (largest hand-scale proxy) is treated as
//! the presenter ("admin").  A slow moving reference follows the largest
//! scale seen each frame:
//!
//! ```text
//! reference ← reference · keep + max(scales) · (1 − keep)
//! ```
//!
//! Hands at least `(1 − tolerance) · reference` are admin; the rest are
//! guests.  Guests may draw only while the global unlock window is open.
//! None of this is authentication.

use tracing::info;

use crate::config::RoleConfig;
use crate::tracker::Track;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Guest,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Guest => "guest",
        }
    }
}

pub struct RoleArbitrator {
    cfg:          RoleConfig,
    reference:    Option<f32>,
    /// Live track count at the last observation.
    live:         usize,
    unlock_until: Option<u64>,
}

impl RoleArbitrator {
    pub fn new(cfg: RoleConfig) -> Self {
        RoleArbitrator { cfg, reference: None, live: 0, unlock_until: None }
    }

    /// Fold this frame's hand scales into the reference.
    ///
    /// With exactly one hand in view the reference snaps to it: a lone hand
    /// is the presenter whatever its absolute size.
    pub fn observe(&mut self, tracks: &[Track]) {
        let scales = tracks.iter().filter(|t| t.fresh).map(Track::hand_scale);
        let max = scales.fold(None, |m: Option<f32>, s| Some(m.map_or(s, |m| m.max(s))));
        self.live = tracks.len();
        let Some(max) = max else { return };

        self.reference = Some(match self.reference {
            Some(r) if tracks.len() > 1 => {
                r * self.cfg.reference_keep + max * (1.0 - self.cfg.reference_keep)
            }
            _ => max,
        });
    }

    pub fn reference(&self) -> Option<f32> {
        self.reference
    }

    pub fn role_for_scale(&self, scale: f32) -> Role {
        if self.live <= 1 {
            return Role::Admin;
        }
        match self.reference {
            Some(r) if scale < r * (1.0 - self.cfg.admin_tolerance) => Role::Guest,
            _ => Role::Admin,
        }
    }

    pub fn role(&self, track: &Track) -> Role {
        self.role_for_scale(track.hand_scale())
    }

    pub fn is_admin(&self, track: &Track) -> bool {
        self.role(track) == Role::Admin
    }

    /// `is_admin(track) || guest_window_active(now)`
    pub fn allowed(&self, track: &Track, now_ms: u64) -> bool {
        self.is_admin(track) || self.guest_window_active(now_ms)
    }

    // ── guest unlock window ───────────────────────────────────────────────

    pub fn unlock_guests(&mut self, now_ms: u64) {
        let until = now_ms + self.cfg.guest_window_secs * 1000;
        self.unlock_until = Some(until);
        info!(secs = self.cfg.guest_window_secs, "guest window opened");
    }

    pub fn lock_guests(&mut self) {
        if self.unlock_until.take().is_some() {
            info!("guest window closed");
        }
    }

    pub fn guest_window_active(&self, now_ms: u64) -> bool {
        self.unlock_until.is_some_and(|until| now_ms < until)
    }

    /// Whole seconds left in the window, rounded up; 0 when closed.
    pub fn guest_window_remaining_secs(&self, now_ms: u64) -> u64 {
        match self.unlock_until {
            Some(until) if now_ms < until => (until - now_ms).div_ceil(1000),
            _ => 0,
        }
    }

    pub fn sentinel_color(&self) -> crate::color::Color {
        self.cfg.sentinel_color
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
