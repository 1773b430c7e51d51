//! Gesture classification with per-track hysteresis.
//!
//! Each frame a detection is reduced to three raw predicates (POINT, PALM,
//! GRAB).  Raw predicates flicker, so each feeds a bounded
//! [`StabilityCounter`]; only the counter's state is exposed to the resolver.
//!
//! # Invariants
//!
//! 1. A gesture turns on only after the counter reaches `activate_at`, and
//!    turns off only once it drops below `release_below`.  With the defaults
//!    (max 6, threshold 3) a fully charged gesture survives three bad frames.
//! 2. GRAB preempts POINT and PALM: when GRAB is active the other two flags
//!    read false for that frame, whatever their counters say.
//! 3. An external label only ever adds evidence (OR), never vetoes.

use crate::config::GestureConfig;
use crate::detection::{
    GestureLabel, HandDetection, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, PINKY_PIP,
    PINKY_TIP, RING_PIP, RING_TIP,
};

// ════════════════════════════════════════════════════════════════════════════
// Gesture — closed set of stabilized gestures
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gesture {
    None,
    Point,
    Palm,
    Grab,
}

// ════════════════════════════════════════════════════════════════════════════
// StabilityCounter
// ════════════════════════════════════════════════════════════════════════════

/// Bounded up/down counter with an on/off latch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StabilityCounter {
    count:  u8,
    active: bool,
}

impl StabilityCounter {
    /// Feed one frame's raw predicate; returns the latched state.
    pub fn update(&mut self, raw: bool, cfg: &GestureConfig) -> bool {
        if raw {
            self.count = self.count.saturating_add(1).min(cfg.stability_max);
        } else {
            self.count = self.count.saturating_sub(1);
        }
        if !self.active && self.count >= cfg.activate_at {
            self.active = true;
        } else if self.active && self.count < cfg.release_below {
            self.active = false;
        }
        self.active
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Raw predicates
// ════════════════════════════════════════════════════════════════════════════

/// Which of index, middle, ring, pinky are extended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerExtension {
    pub index:  bool,
    pub middle: bool,
    pub ring:   bool,
    pub pinky:  bool,
}

impl FingerExtension {
    /// A fingertip counts as extended when it is farther from the wrist than
    /// its middle joint by `margin · hand_scale`.
    pub fn measure(det: &HandDetection, margin: f32) -> Self {
        let wrist = det.wrist();
        let slack = margin * det.hand_scale;
        let ext = |tip: usize, pip: usize| {
            wrist.distance(det.landmark(tip)) > wrist.distance(det.landmark(pip)) + slack
        };
        FingerExtension {
            index:  ext(INDEX_TIP, INDEX_PIP),
            middle: ext(MIDDLE_TIP, MIDDLE_PIP),
            ring:   ext(RING_TIP, RING_PIP),
            pinky:  ext(PINKY_TIP, PINKY_PIP),
        }
    }
}

/// Unstabilized per-frame predicates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawGestures {
    pub point: bool,
    pub palm:  bool,
    pub grab:  bool,
}

impl RawGestures {
    /// `grab_latched` selects the pinch release threshold instead of the
    /// onset threshold, giving the pinch reading its own hysteresis band.
    pub fn classify(det: &HandDetection, cfg: &GestureConfig, grab_latched: bool) -> Self {
        let fingers = FingerExtension::measure(det, cfg.extension_margin);
        let open = det.pinch_strength < cfg.open_pinch_max;

        let label = det
            .gesture
            .filter(|g| g.confidence >= cfg.label_min_confidence)
            .map(|g| g.label)
            .unwrap_or(GestureLabel::None);

        let geo_point = fingers.index && !fingers.middle && !fingers.ring && !fingers.pinky && open;
        let geo_palm = fingers.index && fingers.middle && fingers.ring && fingers.pinky && open;
        let pinch_threshold = if grab_latched { cfg.pinch_off } else { cfg.pinch_on };
        let geo_grab = det.pinch_strength >= pinch_threshold;

        RawGestures {
            point: geo_point || label == GestureLabel::Point,
            palm:  geo_palm || label == GestureLabel::Palm,
            grab:  geo_grab || matches!(label, GestureLabel::Fist | GestureLabel::ThumbsUp),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureState — what a track carries between frames
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GestureState {
    point: StabilityCounter,
    palm:  StabilityCounter,
    grab:  StabilityCounter,
    /// Published flags after preemption.
    pub pointing:  bool,
    pub pinching:  bool,
    pub palm_open: bool,
}

impl GestureState {
    /// Advance with a fresh detection.
    pub fn observe(&mut self, det: &HandDetection, cfg: &GestureConfig) {
        let raw = RawGestures::classify(det, cfg, self.grab.is_active());
        self.advance(raw, cfg);
    }

    /// Advance without a detection (dropout): every predicate reads false so
    /// the counters drain toward idle.
    pub fn decay(&mut self, cfg: &GestureConfig) {
        self.advance(RawGestures::default(), cfg);
    }

    fn advance(&mut self, raw: RawGestures, cfg: &GestureConfig) {
        let grab = self.grab.update(raw.grab, cfg);
        let point = self.point.update(raw.point, cfg);
        let palm = self.palm.update(raw.palm, cfg);

        self.pinching = grab;
        self.pointing = point && !grab;
        self.palm_open = palm && !grab && !self.pointing;
    }

    /// The single dominant gesture.
    pub fn dominant(&self) -> Gesture {
        if self.pinching {
            Gesture::Grab
        } else if self.pointing {
            Gesture::Point
        } else if self.palm_open {
            Gesture::Palm
        } else {
            Gesture::None
        }
    }

    pub fn counters(&self) -> (u8, u8, u8) {
        (self.point.count(), self.palm.count(), self.grab.count())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::HandPose;
    use crate::geometry::Point2;

    fn cfg() -> GestureConfig {
        GestureConfig::default()
    }

    fn hand(pose: HandPose) -> HandDetection {
        HandDetection::upright(pose, Point2::new(0.5, 0.4), 0.1)
    }

    #[test]
    fn geometric_predicates_per_pose() {
        let c = cfg();
        let p = RawGestures::classify(&hand(HandPose::Point), &c, false);
        assert_eq!(p, RawGestures { point: true, palm: false, grab: false });
        let o = RawGestures::classify(&hand(HandPose::Palm), &c, false);
        assert_eq!(o, RawGestures { point: false, palm: true, grab: false });
        let g = RawGestures::classify(&hand(HandPose::Pinch), &c, false);
        assert_eq!(g, RawGestures { point: false, palm: false, grab: true });
        let f = RawGestures::classify(&hand(HandPose::Fist), &c, false);
        assert_eq!(f, RawGestures::default());
    }

    #[test]
    fn extension_is_scale_invariant() {
        let near = HandDetection::upright(HandPose::Point, Point2::new(0.5, 0.5), 0.25);
        let far = HandDetection::upright(HandPose::Point, Point2::new(0.5, 0.5), 0.03);
        assert_eq!(FingerExtension::measure(&near, 0.1), FingerExtension::measure(&far, 0.1));
    }

    #[test]
    fn counter_needs_threshold_frames_to_activate() {
        let c = cfg();
        let mut s = StabilityCounter::default();
        assert!(!s.update(true, &c));
        assert!(!s.update(true, &c));
        assert!(s.update(true, &c));
    }

    #[test]
    fn counter_release_lags_and_clamps() {
        let c = cfg();
        let mut s = StabilityCounter::default();
        for _ in 0..20 {
            s.update(true, &c);
        }
        assert_eq!(s.count(), c.stability_max);
        // 6 → 5 → 4 → 3 still active; 2 releases.
        assert!(s.update(false, &c));
        assert!(s.update(false, &c));
        assert!(s.update(false, &c));
        assert!(!s.update(false, &c));
        for _ in 0..20 {
            s.update(false, &c);
        }
        assert_eq!(s.count(), 0);
    }

    #[test]
    fn counter_saturates_at_type_max() {
        let mut c = cfg();
        c.stability_max = u8::MAX;
        let mut s = StabilityCounter::default();
        for _ in 0..300 {
            s.update(true, &c);
        }
        assert_eq!(s.count(), u8::MAX);
        assert!(s.is_active());
    }

    #[test]
    fn single_frame_glitch_does_not_flicker() {
        let c = cfg();
        let mut st = GestureState::default();
        for _ in 0..6 {
            st.observe(&hand(HandPose::Point), &c);
        }
        st.observe(&hand(HandPose::Fist), &c);
        assert!(st.pointing);
    }

    #[test]
    fn grab_preempts_point() {
        let c = cfg();
        let mut st = GestureState::default();
        // Charge POINT fully, then pinch: POINT's counter is still high while
        // GRAB activates, but the published flag must flip immediately.
        for _ in 0..6 {
            st.observe(&hand(HandPose::Point), &c);
        }
        for _ in 0..3 {
            st.observe(&hand(HandPose::Pinch), &c);
        }
        assert!(st.pinching);
        assert!(!st.pointing);
        assert_eq!(st.dominant(), Gesture::Grab);
    }

    #[test]
    fn external_label_is_ored_in() {
        let c = cfg();
        let fist = hand(HandPose::Fist).with_gesture(GestureLabel::Fist, 0.9);
        assert!(RawGestures::classify(&fist, &c, false).grab);
        let weak = hand(HandPose::Fist).with_gesture(GestureLabel::Point, 0.2);
        assert!(!RawGestures::classify(&weak, &c, false).point);
        // A label never vetoes geometry.
        let contradict = hand(HandPose::Point).with_gesture(GestureLabel::Palm, 0.99);
        let raw = RawGestures::classify(&contradict, &c, false);
        assert!(raw.point && raw.palm);
    }

    #[test]
    fn pinch_reading_has_its_own_band() {
        let c = cfg();
        let mut det = hand(HandPose::Fist);
        det.pinch_strength = 0.7;
        assert!(!RawGestures::classify(&det, &c, false).grab);
        assert!(RawGestures::classify(&det, &c, true).grab);
    }

    #[test]
    fn decay_drains_to_idle() {
        let c = cfg();
        let mut st = GestureState::default();
        for _ in 0..6 {
            st.observe(&hand(HandPose::Palm), &c);
        }
        assert!(st.palm_open);
        for _ in 0..6 {
            st.decay(&c);
        }
        assert_eq!(st.dominant(), Gesture::None);
        assert_eq!(st.counters(), (0, 0, 0));
    }
}
