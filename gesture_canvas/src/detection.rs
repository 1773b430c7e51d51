//! Per-frame hand detections — the contract with the external vision model.
//!
//! A detector delivers, for every camera frame, an unordered list of
//! [`HandDetection`]s with 21 normalized landmarks each:
//!
//! ```text
//!          8   12  16  20        tips
//!          7   11  15  19
//!     4    6   10  14  18        middle joints (PIP)
//!      3   5    9  13  17        knuckles (MCP)
//!       2
//!        1
//!              0                 wrist
//! ```
//!
//! Nothing correlates detections across frames; that is the tracker's job.

use crate::error::{CanvasError, Result};
use crate::geometry::Point2;

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST:      usize = 0;
pub const THUMB_MCP:  usize = 2;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_MCP:  usize = 5;
pub const INDEX_PIP:  usize = 6;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP:   usize = 13;
pub const RING_PIP:   usize = 14;
pub const RING_TIP:   usize = 16;
pub const PINKY_MCP:  usize = 17;
pub const PINKY_PIP:  usize = 18;
pub const PINKY_TIP:  usize = 20;

/// Thumb–index tip distance (in hand-scale units) at which pinch strength hits zero.
const PINCH_SPAN: f32 = 0.6;

// ════════════════════════════════════════════════════════════════════════════
// Labels
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// Gesture label optionally supplied by a higher-quality external classifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GestureLabel {
    #[default]
    None,
    Point,
    Palm,
    Fist,
    ThumbsUp,
    Victory,
}

impl GestureLabel {
    /// Parse the label names common hand-gesture models emit.
    /// Unknown labels collapse to [`GestureLabel::None`].
    pub fn parse(label: &str) -> GestureLabel {
        let norm: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "pointingup" | "point" | "pointing"  => GestureLabel::Point,
            "openpalm" | "palm" | "open"         => GestureLabel::Palm,
            "closedfist" | "fist"                => GestureLabel::Fist,
            "thumbup" | "thumbsup"               => GestureLabel::ThumbsUp,
            "victory" | "peace"                  => GestureLabel::Victory,
            _                                    => GestureLabel::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExternalGesture {
    pub label:      GestureLabel,
    pub confidence: f32,
}

// ════════════════════════════════════════════════════════════════════════════
// HandDetection
// ════════════════════════════════════════════════════════════════════════════

/// One hand as seen in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct HandDetection {
    /// Normalized image coordinates, `LANDMARK_COUNT` entries when well formed.
    pub landmarks:      Vec<Point2>,
    pub handedness:     Option<Handedness>,
    /// Wrist → middle-knuckle distance; normalizes thresholds for depth.
    pub hand_scale:     f32,
    /// 0.0 = thumb and index apart, 1.0 = touching.
    pub pinch_strength: f32,
    pub gesture:        Option<ExternalGesture>,
}

impl HandDetection {
    /// Build a detection from raw landmarks, deriving hand scale and pinch
    /// strength from the geometry.
    pub fn from_landmarks(landmarks: Vec<Point2>) -> Result<Self> {
        check_landmarks(&landmarks)?;
        let hand_scale = landmarks[WRIST].distance(landmarks[MIDDLE_MCP]);
        let pinch_strength = pinch_strength_for(&landmarks, hand_scale);
        Ok(HandDetection {
            landmarks,
            handedness: None,
            hand_scale,
            pinch_strength,
            gesture: None,
        })
    }

    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = Some(handedness);
        self
    }

    pub fn with_gesture(mut self, label: GestureLabel, confidence: f32) -> Self {
        self.gesture = Some(ExternalGesture { label, confidence });
        self
    }

    /// Fails for detections the pipeline cannot use this frame.
    pub fn validate(&self) -> Result<()> {
        check_landmarks(&self.landmarks)?;
        if !(self.hand_scale.is_finite() && self.hand_scale > 0.0) {
            return Err(CanvasError::MalformedDetection {
                found:    self.landmarks.len(),
                expected: LANDMARK_COUNT,
            });
        }
        Ok(())
    }

    pub fn landmark(&self, idx: usize) -> Point2 {
        self.landmarks[idx]
    }

    /// Stable anchor for cross-frame matching.
    pub fn wrist(&self) -> Point2 {
        self.landmarks[WRIST]
    }

    pub fn pointer(&self) -> Point2 {
        self.landmarks[INDEX_TIP]
    }

    pub fn pinch_midpoint(&self) -> Point2 {
        self.landmarks[THUMB_TIP].midpoint(self.landmarks[INDEX_TIP])
    }

    pub fn palm_centroid(&self) -> Point2 {
        let idx = [WRIST, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];
        let (sx, sy) = idx
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &i| (sx + self.landmarks[i].x, sy + self.landmarks[i].y));
        Point2::new(sx / idx.len() as f32, sy / idx.len() as f32)
    }

    /// Orientation of the thumb-base → index-base line; rotates with the hand.
    pub fn pinch_angle(&self) -> f32 {
        self.landmarks[THUMB_MCP].angle_to(self.landmarks[INDEX_MCP])
    }

    /// Orientation of the wrist → index-knuckle line.
    pub fn palm_angle(&self) -> f32 {
        self.landmarks[WRIST].angle_to(self.landmarks[INDEX_MCP])
    }
}

fn check_landmarks(landmarks: &[Point2]) -> Result<()> {
    if landmarks.len() < LANDMARK_COUNT || landmarks.iter().any(|p| !p.is_finite()) {
        return Err(CanvasError::MalformedDetection {
            found:    landmarks.len(),
            expected: LANDMARK_COUNT,
        });
    }
    Ok(())
}

fn pinch_strength_for(landmarks: &[Point2], hand_scale: f32) -> f32 {
    if hand_scale <= f32::EPSILON {
        return 0.0;
    }
    let d = landmarks[THUMB_TIP].distance(landmarks[INDEX_TIP]) / hand_scale;
    (1.0 - d / PINCH_SPAN).clamp(0.0, 1.0)
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic hands — simulator input and test fixtures
// ════════════════════════════════════════════════════════════════════════════

/// Canonical hand shapes the synthesizer can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandPose {
    /// Index extended, others curled.
    Point,
    /// Thumb tip touching index tip.
    Pinch,
    /// All four fingers extended, thumb out.
    Palm,
    /// Everything curled.
    Fist,
}

// Upright right hand, wrist at the origin, +y down, one unit = hand scale.
const OPEN_FINGERS: [[(f32, f32); 4]; 4] = [
    [(-0.35, -1.0), (-0.38, -1.40), (-0.40, -1.65), (-0.42, -1.90)],
    [( 0.00, -1.0), ( 0.00, -1.45), ( 0.00, -1.75), ( 0.00, -2.00)],
    [( 0.30, -0.95), ( 0.32, -1.35), ( 0.34, -1.60), ( 0.35, -1.85)],
    [( 0.55, -0.85), ( 0.60, -1.15), ( 0.63, -1.35), ( 0.65, -1.55)],
];
const THUMB_OUT: [(f32, f32); 4] = [(-0.40, -0.20), (-0.70, -0.45), (-0.90, -0.70), (-1.05, -0.90)];
const THUMB_TUCKED: [(f32, f32); 4] = [(-0.35, -0.22), (-0.55, -0.40), (-0.62, -0.50), (-0.60, -0.55)];

fn curled(finger: [(f32, f32); 4]) -> [(f32, f32); 4] {
    let (mx, my) = finger[0];
    let (px, py) = finger[1];
    [(mx, my), (px, py), (px + 0.04, py + 0.25), (mx + 0.05, my + 0.15)]
}

impl HandDetection {
    /// A geometrically consistent detection whose index fingertip sits at
    /// `anchor`, sized by `scale` and rotated by `angle` radians.
    pub fn synthetic(pose: HandPose, anchor: Point2, scale: f32, angle: f32) -> HandDetection {
        let mut local: Vec<(f32, f32)> = Vec::with_capacity(LANDMARK_COUNT);
        local.push((0.0, 0.0));

        let index = match pose {
            HandPose::Point | HandPose::Palm => OPEN_FINGERS[0],
            HandPose::Pinch => {
                // Index hooked forward so the tip sits in front of the knuckle.
                [(-0.35, -1.0), (-0.45, -1.35), (-0.55, -1.40), (-0.62, -1.32)]
            }
            HandPose::Fist => curled(OPEN_FINGERS[0]),
        };
        let thumb = match pose {
            HandPose::Palm => THUMB_OUT,
            HandPose::Pinch => {
                let (tx, ty) = index[3];
                [(-0.40, -0.20), (-0.60, -0.50), (-0.66, -0.85), (tx, ty)]
            }
            HandPose::Point | HandPose::Fist => THUMB_TUCKED,
        };
        local.extend_from_slice(&thumb);
        local.extend_from_slice(&index);
        for finger in &OPEN_FINGERS[1..] {
            let f = if pose == HandPose::Palm { *finger } else { curled(*finger) };
            local.extend_from_slice(&f);
        }

        let (sin, cos) = angle.sin_cos();
        let (ax, ay) = local[INDEX_TIP];
        let landmarks = local
            .iter()
            .map(|&(x, y)| {
                let (dx, dy) = ((x - ax) * scale, (y - ay) * scale);
                Point2::new(anchor.x + dx * cos - dy * sin, anchor.y + dx * sin + dy * cos)
            })
            .collect::<Vec<_>>();

        let hand_scale = landmarks[WRIST].distance(landmarks[MIDDLE_MCP]);
        let pinch_strength = pinch_strength_for(&landmarks, hand_scale);
        HandDetection {
            landmarks,
            handedness: None,
            hand_scale,
            pinch_strength,
            gesture: None,
        }
    }

    /// Upright synthetic hand (`angle = 0`).
    pub fn upright(pose: HandPose, anchor: Point2, scale: f32) -> HandDetection {
        Self::synthetic(pose, anchor, scale, 0.0)
    }
}

/// Mirror a normalized x coordinate; used for a second simulated hand.
pub fn mirrored(p: Point2) -> Point2 {
    Point2::new(1.0 - p.x, p.y)
}

// ════════════════════════════════════════════════════════════════════════════
// DetectionFrame
// ════════════════════════════════════════════════════════════════════════════

/// Everything the detector reported for one camera frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionFrame {
    /// Capture time in milliseconds on the host's monotonic clock.
    pub timestamp_ms: u64,
    pub hands:        Vec<HandDetection>,
}

impl DetectionFrame {
    pub fn new(timestamp_ms: u64, hands: Vec<HandDetection>) -> Self {
        DetectionFrame { timestamp_ms, hands }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
