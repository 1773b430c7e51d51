//! Temporal identity for hands.
//!
//! The detector reports an unordered set of hands per frame.  The
//! [`TrackAssigner`] bridges frames by greedy nearest-neighbour matching on
//! the wrist landmark:
//!
//! * each detection takes the closest still-unused track within
//!   `max_match_distance`;
//! * unmatched detections open new tracks (up to `max_tracks`);
//! * unmatched tracks linger for `ttl_ms` to ride out detector dropouts.
//!
//! Matching is greedy, not globally optimal: two hands crossing quickly can
//! swap identities.  That is accepted.

use tracing::{debug, info};

use crate::classifier::GestureState;
use crate::config::{FilterConfig, GestureConfig, TrackingConfig};
use crate::detection::HandDetection;
use crate::filter::PointFilter;
use crate::geometry::Point2;
use crate::store::StrokeId;

// ════════════════════════════════════════════════════════════════════════════
// Identifiers & phases
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u32);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Interaction state of one track, advanced by the resolver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackPhase {
    #[default]
    Idle,
    Pointing,
    Pinching,
    PalmSelected,
}

impl TrackPhase {
    pub fn label(self) -> &'static str {
        match self {
            TrackPhase::Idle         => "idle",
            TrackPhase::Pointing     => "point",
            TrackPhase::Pinching     => "pinch",
            TrackPhase::PalmSelected => "palm",
        }
    }
}

/// Previous-frame references for incremental single-hand transforms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ManipulationRef {
    /// Filtered anchor in canvas pixels.
    pub anchor: Point2,
    pub angle:  f32,
    pub scale:  f32,
}

// ════════════════════════════════════════════════════════════════════════════
// Track
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Track {
    pub id:         TrackId,
    pub created_ms: u64,
    pub last_seen_ms: u64,
    /// Most recent detection matched to this track.
    pub detection:  HandDetection,
    /// Whether `detection` arrived in the frame being processed.
    pub fresh:      bool,

    pointer_filter: PointFilter,
    pinch_filter:   PointFilter,
    palm_filter:    PointFilter,
    /// Filtered semantic points, normalized image space.
    pub pointer:    Point2,
    pub pinch_mid:  Point2,
    pub palm:       Point2,

    pub gestures:   GestureState,
    pub phase:      TrackPhase,

    /// Stroke this track is currently drawing.
    pub drawing:    Option<StrokeId>,
    /// Stroke last picked by this track.
    pub selected:   Option<StrokeId>,
    /// Onset-or-previous-frame references while pinching / palm rotating.
    pub manip:      Option<ManipulationRef>,
}

impl Track {
    fn new(id: TrackId, det: HandDetection, now_ms: u64, filter: &FilterConfig) -> Self {
        let mut t = Track {
            id,
            created_ms: now_ms,
            last_seen_ms: now_ms,
            pointer: det.pointer(),
            pinch_mid: det.pinch_midpoint(),
            palm: det.palm_centroid(),
            detection: det,
            fresh: true,
            pointer_filter: PointFilter::new(filter.clone()),
            pinch_filter: PointFilter::new(filter.clone()),
            palm_filter: PointFilter::new(filter.clone()),
            gestures: GestureState::default(),
            phase: TrackPhase::Idle,
            drawing: None,
            selected: None,
            manip: None,
        };
        t.run_filters(now_ms);
        t
    }

    fn ingest(&mut self, det: HandDetection, now_ms: u64) {
        self.detection = det;
        self.last_seen_ms = now_ms;
        self.fresh = true;
        self.run_filters(now_ms);
    }

    fn run_filters(&mut self, now_ms: u64) {
        let det = &self.detection;
        self.pointer = filter_or_reseed(&mut self.pointer_filter, det.pointer(), now_ms);
        self.pinch_mid = filter_or_reseed(&mut self.pinch_filter, det.pinch_midpoint(), now_ms);
        self.palm = filter_or_reseed(&mut self.palm_filter, det.palm_centroid(), now_ms);
    }

    pub fn hand_scale(&self) -> f32 {
        self.detection.hand_scale
    }

    /// Advance gesture counters for this frame.
    pub fn classify(&mut self, cfg: &GestureConfig) {
        if self.fresh {
            self.gestures.observe(&self.detection, cfg);
        } else {
            self.gestures.decay(cfg);
        }
    }
}

fn filter_or_reseed(f: &mut PointFilter, p: Point2, now_ms: u64) -> Point2 {
    match f.filter(p, now_ms) {
        Ok(out) => out,
        Err(e) => {
            debug!(error = %e, "filter out of order; reseeding");
            f.reset();
            f.filter(p, now_ms).unwrap_or(p)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TrackAssigner
// ════════════════════════════════════════════════════════════════════════════

/// What one `update` call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssignReport {
    pub matched:   usize,
    pub created:   Vec<TrackId>,
    pub expired:   Vec<TrackId>,
    /// Detections skipped as malformed.
    pub malformed: usize,
    /// Detections ignored because the track cap was reached.
    pub over_cap:  usize,
}

pub struct TrackAssigner {
    cfg:     TrackingConfig,
    filter:  FilterConfig,
    tracks:  Vec<Track>,
    next_id: u32,
}

impl TrackAssigner {
    pub fn new(cfg: TrackingConfig, filter: FilterConfig) -> Self {
        TrackAssigner { cfg, filter, tracks: Vec::new(), next_id: 1 }
    }

    /// Correlate this frame's detections with existing tracks.
    pub fn update(&mut self, detections: Vec<HandDetection>, now_ms: u64) -> AssignReport {
        let mut report = AssignReport::default();
        for t in &mut self.tracks {
            t.fresh = false;
        }
        let mut used = vec![false; self.tracks.len()];

        for det in detections {
            if let Err(e) = det.validate() {
                debug!(error = %e, "skipping detection");
                report.malformed += 1;
                continue;
            }

            let wrist = det.wrist();
            let best = self
                .tracks
                .iter()
                .enumerate()
                .filter(|(i, _)| !used[*i])
                .map(|(i, t)| (i, t.detection.wrist().distance(wrist)))
                .filter(|&(_, d)| d <= self.cfg.max_match_distance)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match best {
                Some((i, _)) => {
                    used[i] = true;
                    self.tracks[i].ingest(det, now_ms);
                    report.matched += 1;
                }
                None if self.tracks.len() < self.cfg.max_tracks => {
                    let id = TrackId(self.next_id);
                    self.next_id += 1;
                    self.tracks.push(Track::new(id, det, now_ms, &self.filter));
                    used.push(true);
                    info!(track = %id, "track created");
                    report.created.push(id);
                }
                None => report.over_cap += 1,
            }
        }

        let ttl = self.cfg.ttl_ms;
        self.tracks.retain(|t| {
            let keep = now_ms.saturating_sub(t.last_seen_ms) <= ttl;
            if !keep {
                info!(track = %t.id, "track expired");
                report.expired.push(t.id);
            }
            keep
        });
        report
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
