//! The authoritative stroke collection.
//!
//! [`StrokeStore`] owns every stroke on the canvas, keeps z-order, an
//! id → stroke map, a linear redo stack, and per-stroke bounding boxes used
//! to reject picks and erases cheaply before any per-segment geometry.
//!
//! # Invariants
//!
//! 1. `stroke.bbox` is always the tight bound of `stroke.points`: expanded on
//!    append, shifted on translate, fully recomputed after rotate, scale and
//!    erase splits.
//! 2. Any mutation except `undo`/`redo` clears the redo stack.
//! 3. Missing ids are never fatal: mutators return `false`, queries `None`.
//!
//! All coordinates are canvas pixels.

use std::collections::HashMap;

use tracing::debug;

use crate::color::Color;
use crate::config::StoreConfig;
use crate::geometry::{centroid, point_segment_distance, Point2, Rect};

// ════════════════════════════════════════════════════════════════════════════
// Stroke
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrokeId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokePoint {
    pub x:     f32,
    pub y:     f32,
    pub t_ms:  u64,
    pub width: f32,
}

impl StrokePoint {
    pub fn pos(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub id:     StrokeId,
    pub color:  Color,
    pub points: Vec<StrokePoint>,
    /// `None` only while the stroke has no points.
    pub bbox:   Option<Rect>,
}

impl Stroke {
    fn recompute_bbox(&mut self) {
        self.bbox = Rect::bounding(self.points.iter().map(StrokePoint::pos));
    }

    /// Point-set centroid.
    pub fn centroid(&self) -> Option<Point2> {
        centroid(self.points.iter().map(StrokePoint::pos))
    }

    /// Distance from `p` to the polyline.
    pub fn distance_to(&self, p: Point2) -> Option<f32> {
        match self.points.as_slice() {
            []    => None,
            [one] => Some(one.pos().distance(p)),
            pts   => pts
                .windows(2)
                .map(|w| point_segment_distance(p, w[0].pos(), w[1].pos()))
                .min_by(f32::total_cmp),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Damage — render-invalidate signal
// ════════════════════════════════════════════════════════════════════════════

/// What changed since the painter last looked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Damage {
    /// Everything must be repainted (undo/redo/erase/transform/clear).
    pub full_redraw: bool,
    /// Strokes that only gained points; paint their new tail segments.
    pub appended: Vec<StrokeId>,
}

impl Damage {
    pub fn is_clean(&self) -> bool {
        !self.full_redraw && self.appended.is_empty()
    }
}

/// Result of an erase pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EraseOutcome {
    pub removed: Vec<StrokeId>,
    pub created: Vec<StrokeId>,
}

// ════════════════════════════════════════════════════════════════════════════
// StrokeStore
// ════════════════════════════════════════════════════════════════════════════

pub struct StrokeStore {
    cfg:     StoreConfig,
    strokes: HashMap<StrokeId, Stroke>,
    /// Z-order, oldest first.
    order:   Vec<StrokeId>,
    redo:    Vec<Stroke>,
    next_id: u64,
    damage:  Damage,
}

impl StrokeStore {
    pub fn new(cfg: StoreConfig) -> Self {
        StrokeStore {
            cfg,
            strokes: HashMap::new(),
            order:   Vec::new(),
            redo:    Vec::new(),
            next_id: 1,
            damage:  Damage::default(),
        }
    }

    fn alloc_id(&mut self) -> StrokeId {
        let id = StrokeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn mutated(&mut self) {
        self.redo.clear();
    }

    fn invalidate(&mut self) {
        self.damage.full_redraw = true;
        self.damage.appended.clear();
    }

    // ── creation ──────────────────────────────────────────────────────────

    /// Begin an empty stroke.
    pub fn start_stroke(&mut self, color: Color) -> StrokeId {
        let id = self.alloc_id();
        self.strokes.insert(id, Stroke { id, color, points: Vec::new(), bbox: None });
        self.order.push(id);
        self.mutated();
        debug!(stroke = id.0, "stroke started");
        id
    }

    /// Append a point; `false` if the stroke no longer exists.
    pub fn add_point(&mut self, id: StrokeId, p: Point2, t_ms: u64, width: f32) -> bool {
        let width = width.clamp(self.cfg.min_width, self.cfg.max_width);
        let Some(stroke) = self.strokes.get_mut(&id) else {
            return false;
        };
        stroke.points.push(StrokePoint { x: p.x, y: p.y, t_ms, width });
        match &mut stroke.bbox {
            Some(b) => b.expand(p),
            None    => stroke.bbox = Some(Rect::from_point(p)),
        }
        self.redo.clear();
        if !self.damage.full_redraw && !self.damage.appended.contains(&id) {
            self.damage.appended.push(id);
        }
        true
    }

    // ── history ──────────────────────────────────────────────────────────

    /// Remove the most recent stroke onto the redo stack.
    pub fn undo(&mut self) -> Option<StrokeId> {
        let id = self.order.pop()?;
        let stroke = self.strokes.remove(&id)?;
        self.redo.push(stroke);
        self.invalidate();
        debug!(stroke = id.0, "undo");
        Some(id)
    }

    /// Restore the most recently undone stroke.
    pub fn redo(&mut self) -> Option<StrokeId> {
        let stroke = self.redo.pop()?;
        let id = stroke.id;
        self.order.push(id);
        self.strokes.insert(id, stroke);
        self.invalidate();
        debug!(stroke = id.0, "redo");
        Some(id)
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear_all(&mut self) {
        self.strokes.clear();
        self.order.clear();
        self.mutated();
        self.invalidate();
    }

    // ── spatial queries ──────────────────────────────────────────────────

    /// Closest stroke within `radius` of `p`, or `None`.
    pub fn pick(&self, p: Point2, radius: f32) -> Option<StrokeId> {
        self.order
            .iter()
            .filter_map(|id| self.strokes.get(id))
            .filter(|s| s.bbox.is_some_and(|b| b.padded(radius).contains(p)))
            .filter_map(|s| s.distance_to(p).map(|d| (s.id, d)))
            .filter(|&(_, d)| d <= radius)
            // Later strokes win ties: they are drawn on top.
            .fold(None, |best: Option<(StrokeId, f32)>, cand| match best {
                Some(b) if b.1 < cand.1 => Some(b),
                _ => Some(cand),
            })
            .map(|(id, _)| id)
    }

    /// Cut every point within `radius` of `p` out of every stroke, keeping
    /// surviving runs of at least two points as new strokes.
    pub fn erase_at(&mut self, p: Point2, radius: f32) -> EraseOutcome {
        let mut outcome = EraseOutcome::default();
        let candidates: Vec<StrokeId> = self
            .order
            .iter()
            .copied()
            .filter(|id| {
                self.strokes
                    .get(id)
                    .and_then(|s| s.bbox)
                    .is_some_and(|b| b.padded(radius).contains(p))
            })
            .collect();

        for id in candidates {
            let Some(stroke) = self.strokes.get(&id) else { continue };
            if !stroke.points.iter().any(|q| q.pos().distance(p) <= radius) {
                continue;
            }
            let color = stroke.color;
            let runs: Vec<Vec<StrokePoint>> = stroke
                .points
                .split(|q| q.pos().distance(p) <= radius)
                .filter(|run| run.len() >= 2)
                .map(<[StrokePoint]>::to_vec)
                .collect();

            let Some(pos) = self.order.iter().position(|x| *x == id) else { continue };
            self.strokes.remove(&id);
            let mut replacement = Vec::with_capacity(runs.len());
            for points in runs {
                let new_id = self.alloc_id();
                let mut s = Stroke { id: new_id, color, points, bbox: None };
                s.recompute_bbox();
                self.strokes.insert(new_id, s);
                replacement.push(new_id);
            }
            self.order.splice(pos..=pos, replacement.iter().copied());
            outcome.removed.push(id);
            outcome.created.extend(replacement);
        }

        if !outcome.removed.is_empty() {
            self.mutated();
            self.invalidate();
            debug!(removed = outcome.removed.len(), created = outcome.created.len(), "erase");
        }
        outcome
    }

    // ── transforms ───────────────────────────────────────────────────────

    pub fn translate(&mut self, id: StrokeId, dx: f32, dy: f32) -> bool {
        let Some(stroke) = self.strokes.get_mut(&id) else {
            return false;
        };
        for q in &mut stroke.points {
            q.x += dx;
            q.y += dy;
        }
        if let Some(b) = &mut stroke.bbox {
            b.translate(dx, dy);
        }
        self.mutated();
        self.invalidate();
        true
    }

    /// Rotate around the stroke's current centroid.
    pub fn rotate(&mut self, id: StrokeId, radians: f32) -> bool {
        let Some(stroke) = self.strokes.get_mut(&id) else {
            return false;
        };
        let Some(c) = stroke.centroid() else {
            return false;
        };
        for q in &mut stroke.points {
            let r = q.pos().rotate_around(c, radians);
            q.x = r.x;
            q.y = r.y;
        }
        stroke.recompute_bbox();
        self.mutated();
        self.invalidate();
        true
    }

    /// Scale around the stroke's current centroid.  The factor is clamped to
    /// the configured range and point widths scale with it.
    ///
    /// Returns the factor actually applied, or `None` if nothing changed.
    pub fn scale(&mut self, id: StrokeId, factor: f32) -> Option<f32> {
        if !factor.is_finite() {
            return None;
        }
        let factor = factor.clamp(self.cfg.min_scale, self.cfg.max_scale);
        let (min_w, max_w) = (self.cfg.min_width, self.cfg.max_width);
        let stroke = self.strokes.get_mut(&id)?;
        let c = stroke.centroid()?;
        for q in &mut stroke.points {
            let s = q.pos().scale_around(c, factor);
            q.x = s.x;
            q.y = s.y;
            q.width = (q.width * factor).clamp(min_w, max_w);
        }
        stroke.recompute_bbox();
        self.mutated();
        self.invalidate();
        Some(factor)
    }

    // ── read access ──────────────────────────────────────────────────────

    pub fn get(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.get(&id)
    }

    pub fn contains(&self, id: StrokeId) -> bool {
        self.strokes.contains_key(&id)
    }

    /// Strokes in paint order.
    pub fn iter(&self) -> impl Iterator<Item = &Stroke> + '_ {
        self.order.iter().filter_map(|id| self.strokes.get(id))
    }

    /// Owned copy for a renderer on another thread.
    pub fn snapshot(&self) -> Vec<Stroke> {
        self.iter().cloned().collect()
    }

    /// Most recently created stroke still present.
    pub fn latest(&self) -> Option<StrokeId> {
        self.order.last().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Hand the accumulated damage to the painter and reset it.
    pub fn take_damage(&mut self) -> Damage {
        std::mem::take(&mut self.damage)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
