//! Turns stabilized gestures into canvas mutations.
//!
//! Each track runs a small phase machine, advanced once per frame:
//!
//! ```text
//!              ┌──────────── pinch ─────────────┐
//!              │                                ▼
//!   Idle ── point ──► Pointing ── pinch ──► Pinching ── palm ──► PalmSelected
//!     ▲                  │                      │                     │
//!     └────── none / not allowed ───────────────┴─────────────────────┘
//! ```
//!
//! * **Pointing** draws: the onset frame starts a stroke, every frame
//!   appends the filtered pointer.  In eraser mode it cuts instead.
//! * **Pinching** picks the stroke under the pinch midpoint at onset, then
//!   translates, rotates and scales it by per-frame deltas.
//! * **PalmSelected** rotates the current selection by the palm's angle delta.
//!
//! Leaving Pointing always finalizes the stroke in progress.
//!
//! When two allowed tracks pinch at once they form a [`TwoActorSession`]
//! that drives one shared target; single-hand manipulation is suspended
//! for both actors while it lasts.

use tracing::debug;

use crate::config::{CanvasGeometry, InteractionConfig, Settings};
use crate::detection::{INDEX_MCP, THUMB_MCP, WRIST};
use crate::geometry::{normalize_angle, Point2};
use crate::roles::{Role, RoleArbitrator};
use crate::store::{StrokeId, StrokeStore};
use crate::tracker::{ManipulationRef, Track, TrackId, TrackPhase};

/// Pinch points closer than this (pixels) give no usable scale or angle.
const MIN_SPAN_PX: f32 = 24.0;

// ════════════════════════════════════════════════════════════════════════════
// Events
// ════════════════════════════════════════════════════════════════════════════

/// Notable things one resolver step did.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
    StrokeStarted { track: TrackId, stroke: StrokeId },
    StrokeFinalized { track: TrackId, stroke: StrokeId },
    Selected { track: TrackId, stroke: Option<StrokeId> },
    Erased { track: TrackId, removed: usize, created: usize },
    SessionStarted { actors: (TrackId, TrackId), target: Option<StrokeId> },
    SessionEnded { actors: (TrackId, TrackId) },
}

// ════════════════════════════════════════════════════════════════════════════
// TwoActorSession
// ════════════════════════════════════════════════════════════════════════════

/// Two pinching hands driving one stroke.
///
/// Every frame the target is translated by the midpoint delta, scaled by the
/// distance ratio and rotated by the angle delta of the line between the two
/// pinch points, all relative to the previous frame.  A pure translation of
/// both hands therefore yields a pure translation of the stroke.
#[derive(Clone, Debug, PartialEq)]
pub struct TwoActorSession {
    pub actors: (TrackId, TrackId),
    pub target: Option<StrokeId>,
    /// Span and angle of the pinch pair when the session began.
    pub baseline_distance: f32,
    pub baseline_angle:    f32,
    prev_mid:      Point2,
    prev_distance: f32,
    prev_angle:    f32,
    /// Product of the scale factors and sum of the turns actually applied.
    pub total_scale:    f32,
    pub total_rotation: f32,
}

impl TwoActorSession {
    fn begin(actors: (TrackId, TrackId), target: Option<StrokeId>, a: Point2, b: Point2) -> Self {
        TwoActorSession {
            actors,
            target,
            baseline_distance: a.distance(b),
            baseline_angle: a.angle_to(b),
            prev_mid: a.midpoint(b),
            prev_distance: a.distance(b),
            prev_angle: a.angle_to(b),
            total_scale: 1.0,
            total_rotation: 0.0,
        }
    }

    fn involves(&self, id: TrackId) -> bool {
        self.actors.0 == id || self.actors.1 == id
    }

    /// Apply this frame's deltas to the target.
    fn advance(&mut self, a: Point2, b: Point2, store: &mut StrokeStore) {
        let mid = a.midpoint(b);
        let distance = a.distance(b);
        let angle = a.angle_to(b);

        if let Some(id) = self.target {
            let shift = mid.sub(self.prev_mid);
            if shift != Point2::default() {
                store.translate(id, shift.x, shift.y);
            }
            if self.prev_distance >= MIN_SPAN_PX && distance >= MIN_SPAN_PX {
                let ratio = distance / self.prev_distance;
                if ratio != 1.0 {
                    if let Some(applied) = store.scale(id, ratio) {
                        self.total_scale *= applied;
                    }
                }
                let turn = normalize_angle(angle - self.prev_angle);
                if turn != 0.0 && store.rotate(id, turn) {
                    self.total_rotation += turn;
                }
            }
        }

        self.prev_mid = mid;
        if distance >= MIN_SPAN_PX || self.prev_distance < MIN_SPAN_PX {
            self.prev_distance = distance;
            self.prev_angle = angle;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// InteractionResolver
// ════════════════════════════════════════════════════════════════════════════

pub struct InteractionResolver {
    cfg:     InteractionConfig,
    canvas:  CanvasGeometry,
    session: Option<TwoActorSession>,
}

impl InteractionResolver {
    pub fn new(cfg: InteractionConfig, canvas: CanvasGeometry) -> Self {
        InteractionResolver { cfg, canvas, session: None }
    }

    pub fn session(&self) -> Option<&TwoActorSession> {
        self.session.as_ref()
    }

    /// Advance every track's phase and apply the resulting edits.
    ///
    /// `tracks` must already be classified for this frame.
    pub fn step(
        &mut self,
        tracks: &mut [Track],
        roles: &mut RoleArbitrator,
        store: &mut StrokeStore,
        settings: &Settings,
        now_ms: u64,
    ) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        let allowed: Vec<bool> = tracks.iter().map(|t| roles.allowed(t, now_ms)).collect();

        let pinchers: Vec<usize> = (0..tracks.len())
            .filter(|&i| allowed[i] && tracks[i].gestures.pinching)
            .collect();
        let pair = match pinchers.as_slice() {
            [a, b, ..] => Some((*a, *b)),
            _ => None,
        };

        // A session whose actor pair no longer matches is over.
        let pair_ids = pair.map(|(a, b)| (tracks[a].id, tracks[b].id));
        if self.session.as_ref().is_some_and(|s| Some(s.actors) != pair_ids) {
            if let Some(s) = self.session.take() {
                for t in tracks.iter_mut().filter(|t| s.involves(t.id)) {
                    t.manip = None;
                }
                debug!(a = %s.actors.0, b = %s.actors.1, "two-hand session ended");
                events.push(InteractionEvent::SessionEnded { actors: s.actors });
            }
        }

        for (i, track) in tracks.iter_mut().enumerate() {
            let in_session = pair.is_some_and(|(a, b)| i == a || i == b);
            self.step_track(track, allowed[i], in_session, roles, store, settings, now_ms, &mut events);
        }

        if let Some((a, b)) = pair {
            let pa = self.canvas.to_canvas(tracks[a].pinch_mid);
            let pb = self.canvas.to_canvas(tracks[b].pinch_mid);
            if let Some(s) = self.session.as_mut() {
                s.advance(pa, pb, store);
            } else {
                let target = self.session_target(&tracks[a], &tracks[b], pa.midpoint(pb), store);
                let actors = (tracks[a].id, tracks[b].id);
                for i in [a, b] {
                    tracks[i].selected = target;
                    tracks[i].manip = None;
                }
                debug!(a = %actors.0, b = %actors.1, target = ?target, "two-hand session started");
                events.push(InteractionEvent::SessionStarted { actors, target });
                self.session = Some(TwoActorSession::begin(actors, target, pa, pb));
            }
        }
        events
    }

    /// Shared prior selection, else the stroke under the midpoint, else the
    /// most recent stroke.
    fn session_target(
        &self,
        a: &Track,
        b: &Track,
        mid: Point2,
        store: &StrokeStore,
    ) -> Option<StrokeId> {
        match (a.selected, b.selected) {
            (Some(x), Some(y)) if x == y && store.contains(x) => Some(x),
            _ => store.pick(mid, self.cfg.pick_radius_px).or_else(|| store.latest()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn step_track(
        &self,
        track: &mut Track,
        allowed: bool,
        in_session: bool,
        roles: &mut RoleArbitrator,
        store: &mut StrokeStore,
        settings: &Settings,
        now_ms: u64,
        events: &mut Vec<InteractionEvent>,
    ) {
        let g = track.gestures;
        let next = if !allowed {
            TrackPhase::Idle
        } else if g.pinching {
            TrackPhase::Pinching
        } else if g.pointing {
            TrackPhase::Pointing
        } else if g.palm_open {
            TrackPhase::PalmSelected
        } else {
            TrackPhase::Idle
        };

        let onset = next != track.phase;
        if onset {
            if let Some(stroke) = track.drawing.take() {
                debug!(track = %track.id, stroke = stroke.0, "stroke finalized");
                events.push(InteractionEvent::StrokeFinalized { track: track.id, stroke });
            }
            track.manip = None;
            debug!(track = %track.id, from = track.phase.label(), to = next.label(), "phase");
            track.phase = next;
        }

        match next {
            TrackPhase::Idle => {}
            TrackPhase::Pointing => self.draw_or_erase(track, roles, store, settings, now_ms, events),
            TrackPhase::Pinching if in_session => {}
            TrackPhase::Pinching => self.pinch_manipulate(track, onset, store, events),
            TrackPhase::PalmSelected => self.palm_rotate(track, store),
        }
    }

    fn draw_or_erase(
        &self,
        track: &mut Track,
        roles: &mut RoleArbitrator,
        store: &mut StrokeStore,
        settings: &Settings,
        now_ms: u64,
        events: &mut Vec<InteractionEvent>,
    ) {
        // A track riding out a dropout keeps its stroke open but adds nothing.
        if !track.fresh {
            return;
        }
        let at = self.canvas.to_canvas(track.pointer);

        if settings.eraser {
            if let Some(stroke) = track.drawing.take() {
                events.push(InteractionEvent::StrokeFinalized { track: track.id, stroke });
            }
            let out = store.erase_at(at, self.cfg.eraser_radius_px);
            if !out.removed.is_empty() {
                events.push(InteractionEvent::Erased {
                    track:   track.id,
                    removed: out.removed.len(),
                    created: out.created.len(),
                });
            }
            return;
        }

        let id = match track.drawing {
            Some(id) => id,
            None => {
                let role = roles.role(track);
                let sentinel = roles.sentinel_color();
                let color = match role {
                    Role::Guest => sentinel,
                    Role::Admin => settings.brush_color,
                };
                if role == Role::Admin && color == sentinel {
                    roles.unlock_guests(now_ms);
                }
                let id = store.start_stroke(color);
                track.drawing = Some(id);
                events.push(InteractionEvent::StrokeStarted { track: track.id, stroke: id });
                id
            }
        };

        let relative = match roles.reference() {
            Some(r) if r > f32::EPSILON => (track.hand_scale() / r).clamp(0.25, 4.0),
            _ => 1.0,
        };
        if !store.add_point(id, at, now_ms, settings.thickness * relative) {
            // Undone or cleared mid-gesture; the next frame starts afresh.
            track.drawing = None;
        }
    }

    fn pinch_manipulate(
        &self,
        track: &mut Track,
        onset: bool,
        store: &mut StrokeStore,
        events: &mut Vec<InteractionEvent>,
    ) {
        let current = ManipulationRef {
            anchor: self.canvas.to_canvas(track.pinch_mid),
            angle:  self.canvas_angle(track, THUMB_MCP, INDEX_MCP),
            scale:  track.hand_scale(),
        };

        if onset {
            let picked = store.pick(current.anchor, self.cfg.pick_radius_px);
            debug!(track = %track.id, stroke = ?picked, "pinch pick");
            track.selected = picked;
            events.push(InteractionEvent::Selected { track: track.id, stroke: picked });
        }

        let Some(prev) = track.manip.replace(current) else {
            return;
        };
        let Some(id) = track.selected else { return };

        let shift = current.anchor.sub(prev.anchor);
        if shift != Point2::default() {
            store.translate(id, shift.x, shift.y);
        }

        let turn = normalize_angle(current.angle - prev.angle);
        if turn != 0.0 {
            store.rotate(id, turn);
        }

        if prev.scale > f32::EPSILON {
            let band = self.cfg.pinch_scale_band;
            let ratio = (current.scale / prev.scale).clamp(1.0 - band, 1.0 + band);
            if ratio != 1.0 {
                store.scale(id, ratio);
            }
        }
    }

    fn palm_rotate(&self, track: &mut Track, store: &mut StrokeStore) {
        let current = ManipulationRef {
            anchor: self.canvas.to_canvas(track.palm),
            angle:  self.canvas_angle(track, WRIST, INDEX_MCP),
            scale:  track.hand_scale(),
        };
        let Some(prev) = track.manip.replace(current) else {
            return;
        };
        if let Some(id) = track.selected {
            let turn = normalize_angle(current.angle - prev.angle);
            if turn != 0.0 {
                store.rotate(id, turn);
            }
        }
    }

    /// Angle of the `from → to` landmark line as seen on the canvas.
    fn canvas_angle(&self, track: &Track, from: usize, to: usize) -> f32 {
        let det = &track.detection;
        self.canvas
            .to_canvas(det.landmark(from))
            .angle_to(self.canvas.to_canvas(det.landmark(to)))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::config::{CanvasConfig, GestureConfig, StoreConfig};
    use crate::detection::{HandDetection, HandPose};
    use crate::tracker::TrackAssigner;

    struct Rig {
        cfg:      CanvasConfig,
        tracker:  TrackAssigner,
        roles:    RoleArbitrator,
        store:    StrokeStore,
        resolver: InteractionResolver,
        settings: Settings,
        now:      u64,
    }

    impl Rig {
        fn new() -> Self {
            let cfg = CanvasConfig::default();
            Rig {
                tracker:  TrackAssigner::new(cfg.tracking.clone(), cfg.filter.clone()),
                roles:    RoleArbitrator::new(cfg.roles.clone()),
                store:    StrokeStore::new(cfg.store.clone()),
                resolver: InteractionResolver::new(cfg.interaction.clone(), cfg.canvas.clone()),
                settings: Settings::default(),
                now:      0,
                cfg,
            }
        }

        fn frame(&mut self, hands: Vec<HandDetection>) -> Vec<InteractionEvent> {
            self.now += 30;
            self.tracker.update(hands, self.now);
            self.roles.observe(self.tracker.tracks());
            let gestures: &GestureConfig = &self.cfg.gestures;
            for t in self.tracker.tracks_mut() {
                t.classify(gestures);
            }
            self.resolver.step(
                self.tracker.tracks_mut(),
                &mut self.roles,
                &mut self.store,
                &self.settings,
                self.now,
            )
        }

        fn hold(&mut self, n: usize, hands: impl Fn() -> Vec<HandDetection>) {
            for _ in 0..n {
                self.frame(hands());
            }
        }

        /// One horizontal stroke from x = 0.3 to 0.5 at y = 0.5.
        fn draw_line(&mut self) -> StrokeId {
            for i in 0..=10 {
                let x = 0.3 + 0.02 * i as f32;
                self.frame(vec![HandDetection::upright(HandPose::Point, Point2::new(x, 0.5), 0.1)]);
            }
            // Let the track expire so later hands start unfiltered.
            self.hold(25, || vec![]);
            self.store.latest().unwrap()
        }
    }

    fn point_at(x: f32, y: f32) -> Vec<HandDetection> {
        vec![HandDetection::upright(HandPose::Point, Point2::new(x, y), 0.1)]
    }

    #[test]
    fn pointing_draws_one_point_per_frame() {
        let mut rig = Rig::new();
        rig.hold(2, || point_at(0.5, 0.5));
        assert!(rig.store.is_empty());
        let ev = rig.frame(point_at(0.5, 0.5));
        assert!(matches!(ev[0], InteractionEvent::StrokeStarted { .. }));
        rig.hold(4, || point_at(0.5, 0.5));
        let stroke = rig.store.get(rig.store.latest().unwrap()).unwrap();
        assert_eq!(stroke.len(), 5);
        assert_eq!(stroke.color, Settings::default().brush_color);
    }

    #[test]
    fn leaving_point_finalizes_stroke() {
        let mut rig = Rig::new();
        rig.hold(5, || point_at(0.5, 0.5));
        let mut finalized = false;
        for _ in 0..6 {
            let ev = rig.frame(vec![HandDetection::upright(HandPose::Fist, Point2::new(0.5, 0.5), 0.1)]);
            finalized |= ev.iter().any(|e| matches!(e, InteractionEvent::StrokeFinalized { .. }));
        }
        assert!(finalized);
        assert_eq!(rig.tracker.tracks()[0].phase, TrackPhase::Idle);
        assert!(rig.tracker.tracks()[0].drawing.is_none());
        assert_eq!(rig.store.len(), 1);
    }

    #[test]
    fn pinch_preempts_drawing_and_keeps_stroke() {
        let mut rig = Rig::new();
        rig.hold(6, || point_at(0.5, 0.5));
        rig.hold(3, || vec![HandDetection::upright(HandPose::Pinch, Point2::new(0.5, 0.5), 0.1)]);
        let t = &rig.tracker.tracks()[0];
        assert_eq!(t.phase, TrackPhase::Pinching);
        assert!(t.drawing.is_none());
        assert_eq!(rig.store.len(), 1);
    }

    #[test]
    fn pinch_drag_translates_selection() {
        let mut rig = Rig::new();
        let id = rig.draw_line();
        let before = rig.store.get(id).unwrap().centroid().unwrap();

        let pinch = |x: f32| vec![HandDetection::upright(HandPose::Pinch, Point2::new(x, 0.5), 0.1)];
        rig.hold(3, || pinch(0.4));
        assert_eq!(rig.tracker.tracks()[0].selected, Some(id));
        rig.hold(60, || pinch(0.45));

        let after = rig.store.get(id).unwrap().centroid().unwrap();
        assert!((after.x - before.x - 0.05 * 1280.0).abs() < 1.0, "{before:?} → {after:?}");
        assert!((after.y - before.y).abs() < 1.0);
    }

    #[test]
    fn pinch_on_empty_space_selects_nothing() {
        let mut rig = Rig::new();
        let id = rig.draw_line();
        let before = rig.store.get(id).unwrap().clone();
        let pinch = |y: f32| vec![HandDetection::upright(HandPose::Pinch, Point2::new(0.4, y), 0.1)];
        rig.hold(3, || pinch(0.1));
        assert_eq!(rig.tracker.tracks()[0].selected, None);
        rig.hold(20, || pinch(0.15));
        assert_eq!(rig.store.get(id).unwrap(), &before);
    }

    #[test]
    fn single_hand_scale_is_banded_per_frame() {
        let mut rig = Rig::new();
        let id = rig.draw_line();
        let w0 = rig.store.get(id).unwrap().bbox.unwrap().width();
        let pinch = |s: f32| vec![HandDetection::upright(HandPose::Pinch, Point2::new(0.4, 0.5), s)];
        rig.hold(3, || pinch(0.1));
        // Doubling the hand in one frame grows the stroke by at most 8 %.
        rig.frame(pinch(0.2));
        let w1 = rig.store.get(id).unwrap().bbox.unwrap().width();
        assert!(w1 <= w0 * 1.08 + 0.5, "{w0} → {w1}");
        assert!(w1 > w0);
    }

    #[test]
    fn palm_rotates_selection() {
        let mut rig = Rig::new();
        let id = rig.draw_line();
        let pinch = vec![HandDetection::upright(HandPose::Pinch, Point2::new(0.4, 0.5), 0.1)];
        rig.hold(4, || pinch.clone());
        assert_eq!(rig.tracker.tracks()[0].selected, Some(id));

        let palm = |a: f32| {
            vec![HandDetection::synthetic(HandPose::Palm, Point2::new(0.4, 0.5), 0.1, a)]
        };
        rig.hold(8, || palm(0.0));
        assert_eq!(rig.tracker.tracks()[0].phase, TrackPhase::PalmSelected);
        let flat = rig.store.get(id).unwrap().bbox.unwrap();
        rig.frame(palm(0.6));
        let turned = rig.store.get(id).unwrap().bbox.unwrap();
        assert!(turned.height() > flat.height() + 10.0, "{flat:?} → {turned:?}");
    }

    #[test]
    fn eraser_mode_cuts_instead_of_drawing() {
        let mut rig = Rig::new();
        let id = rig.draw_line();
        rig.settings.eraser = true;
        rig.hold(6, || point_at(0.4, 0.5));
        assert!(!rig.store.contains(id));
        assert_eq!(rig.store.len(), 2);
    }

    #[test]
    fn guest_is_denied_without_window() {
        let mut rig = Rig::new();
        let hands = || {
            vec![
                HandDetection::upright(HandPose::Fist, Point2::new(0.2, 0.5), 0.12),
                HandDetection::upright(HandPose::Point, Point2::new(0.7, 0.5), 0.05),
            ]
        };
        rig.hold(10, hands);
        assert!(rig.store.is_empty());
        let guest = &rig.tracker.tracks()[1];
        assert_eq!(rig.roles.role(guest), Role::Guest);
        assert_eq!(guest.phase, TrackPhase::Idle);
    }

    #[test]
    fn sentinel_stroke_unlocks_guests() {
        let mut rig = Rig::new();
        rig.settings.brush_color = Color::GOLD;
        rig.hold(4, || point_at(0.3, 0.3));
        assert!(rig.roles.guest_window_active(rig.now));
        rig.hold(6, || vec![]);

        rig.settings.brush_color = Color::RED;
        let hands = || {
            vec![
                HandDetection::upright(HandPose::Fist, Point2::new(0.2, 0.5), 0.12),
                HandDetection::upright(HandPose::Point, Point2::new(0.7, 0.5), 0.05),
            ]
        };
        rig.hold(6, hands);
        let guest_stroke = rig.store.get(rig.store.latest().unwrap()).unwrap();
        assert_eq!(guest_stroke.color, Color::GOLD);
        assert_eq!(rig.store.len(), 2);
    }

    #[test]
    fn two_pinches_share_one_target() {
        let mut rig = Rig::new();
        let id = rig.draw_line();
        let pinch = |a: f32, b: f32| {
            vec![
                HandDetection::upright(HandPose::Pinch, Point2::new(a, 0.6), 0.1),
                HandDetection::upright(HandPose::Pinch, Point2::new(b, 0.6), 0.1),
            ]
        };
        rig.hold(3, || pinch(0.2, 0.6));
        let s = rig.resolver.session().unwrap();
        assert_eq!(s.target, Some(id));

        let before = rig.store.get(id).unwrap().bbox.unwrap().width();
        rig.hold(60, || pinch(0.1, 0.7));
        let s = rig.resolver.session().unwrap();
        assert!((s.total_scale - 1.5).abs() < 0.01, "{}", s.total_scale);
        assert!(s.total_rotation.abs() < 1e-3);
        let after = rig.store.get(id).unwrap().bbox.unwrap().width();
        assert!((after / before - 1.5).abs() < 0.02);

        let ev = rig.frame(vec![]);
        assert!(ev.iter().all(|e| !matches!(e, InteractionEvent::SessionEnded { .. })));
        rig.hold(6, || vec![]);
        assert!(rig.resolver.session().is_none());
    }

    /// Canvas-space direction from a stroke's first point to its last.
    fn heading(store: &StrokeStore, id: StrokeId) -> f32 {
        let pts = &store.get(id).unwrap().points;
        pts[0].pos().angle_to(pts[pts.len() - 1].pos())
    }

    fn pinch_pair(a: (f32, f32), b: (f32, f32)) -> Vec<HandDetection> {
        vec![
            HandDetection::upright(HandPose::Pinch, Point2::new(a.0, a.1), 0.1),
            HandDetection::upright(HandPose::Pinch, Point2::new(b.0, b.1), 0.1),
        ]
    }

    #[test]
    fn two_pinches_rotate_target() {
        let mut rig = Rig::new();
        let id = rig.draw_line();
        rig.hold(3, || pinch_pair((0.2, 0.5), (0.6, 0.5)));
        let s = rig.resolver.session().unwrap();
        assert_eq!(s.target, Some(id));
        assert!(s.baseline_angle.abs() < 1e-3);
        assert!((s.baseline_distance - 0.4 * 1280.0).abs() < 1.0);

        rig.hold(60, || pinch_pair((0.2, 0.6), (0.6, 0.4)));
        // 512 px across, 144 px up on a 1280×720 canvas.
        let expected = (-144.0f32).atan2(512.0);
        let s = rig.resolver.session().unwrap();
        assert!((s.total_rotation - expected).abs() < 0.01, "{}", s.total_rotation);
        assert!((heading(&rig.store, id) - expected).abs() < 0.01);
        // Baselines stay at onset values.
        assert!(s.baseline_angle.abs() < 1e-3);
    }

    #[test]
    fn two_hand_turn_across_half_circle_stays_small() {
        let mut rig = Rig::new();
        let id = rig.draw_line();
        // The line from the first to the second pinch points left, so its
        // angle sits next to ±π and crosses it as the second hand drops.
        rig.hold(3, || pinch_pair((0.6, 0.5), (0.2, 0.47)));
        assert_eq!(rig.resolver.session().unwrap().target, Some(id));
        for i in 0..=12 {
            let y = 0.47 + 0.005 * i as f32;
            rig.frame(pinch_pair((0.6, 0.5), (0.2, y)));
        }
        rig.hold(60, || pinch_pair((0.6, 0.5), (0.2, 0.53)));

        let start = (-21.6f32).atan2(-512.0);
        let end = 21.6f32.atan2(-512.0);
        let expected = normalize_angle(end - start);
        assert!(expected < 0.0 && expected > -0.1);
        let s = rig.resolver.session().unwrap();
        assert!((s.total_rotation - expected).abs() < 0.01, "{}", s.total_rotation);
        assert!((normalize_angle(heading(&rig.store, id)) - expected).abs() < 0.01);
    }

    #[test]
    fn total_scale_tracks_clamped_factor() {
        let mut rig = Rig::new();
        rig.store = StrokeStore::new(StoreConfig { max_scale: 1.01, ..StoreConfig::default() });
        let id = rig.draw_line();
        let w0 = rig.store.get(id).unwrap().bbox.unwrap().width();
        rig.hold(3, || pinch_pair((0.3, 0.5), (0.5, 0.5)));
        rig.hold(60, || pinch_pair((0.2, 0.5), (0.6, 0.5)));
        let s = rig.resolver.session().unwrap();
        let w1 = rig.store.get(id).unwrap().bbox.unwrap().width();
        // Hands doubled their span but the per-frame cap held the stroke back.
        assert!(w1 / w0 < 1.9, "{w0} → {w1}");
        assert!((w1 / w0 - s.total_scale).abs() < 0.01, "{w0} → {w1} vs {}", s.total_scale);
    }

    #[test]
    fn single_pinch_turn_rotates_selection() {
        let mut rig = Rig::new();
        let id = rig.draw_line();
        let pinch = |a: f32| {
            vec![HandDetection::synthetic(HandPose::Pinch, Point2::new(0.4, 0.5), 0.1, a)]
        };
        rig.hold(4, || pinch(0.0));
        assert_eq!(rig.tracker.tracks()[0].selected, Some(id));
        for i in 1..=4 {
            rig.frame(pinch(0.1 * i as f32));
        }
        let turned = heading(&rig.store, id);
        // The canvas is wider than tall, so a 0.4 rad hand turn maps to a
        // slightly different canvas angle.
        assert!((turned - 0.4).abs() < 0.05, "{turned}");
    }

    #[test]
    fn stale_selection_is_a_no_op() {
        let mut rig = Rig::new();
        let id = rig.draw_line();
        let pinch = |x: f32| vec![HandDetection::upright(HandPose::Pinch, Point2::new(x, 0.5), 0.1)];
        rig.hold(3, || pinch(0.4));
        rig.store.undo();
        rig.hold(10, || pinch(0.45));
        assert!(!rig.store.contains(id));
        assert!(rig.store.is_empty());
    }
}
