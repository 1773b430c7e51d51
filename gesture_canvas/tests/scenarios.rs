//! End-to-end scenarios: synthetic detections in, strokes out.

use gesture_canvas::{
    CanvasConfig, CanvasEngine, Command, DetectionFrame, FrameOutcome, HandDetection, HandPose,
    Point2, Role, Stroke,
};

const STEP_MS: u64 = 30;

struct Rig {
    engine: CanvasEngine,
    now:    u64,
}

impl Rig {
    fn new() -> Self {
        let mut cfg = CanvasConfig::default();
        cfg.frame.max_fps = 0.0;
        Rig { engine: CanvasEngine::new(cfg), now: 0 }
    }

    fn frame(&mut self, hands: Vec<HandDetection>) -> FrameOutcome {
        self.now += STEP_MS;
        self.engine.process_frame(DetectionFrame::new(self.now, hands))
    }

    fn hold(&mut self, n: usize, hands: Vec<HandDetection>) {
        for _ in 0..n {
            self.frame(hands.clone());
        }
    }

    /// Long enough for gestures to release and tracks to expire.
    fn rest(&mut self) {
        self.hold(25, vec![]);
        assert!(self.engine.tracks().is_empty());
    }

    /// Horizontal stroke at height `y`, returned after the hand has left.
    fn draw_line(&mut self, from_x: f32, to_x: f32, y: f32) -> Stroke {
        let steps = ((to_x - from_x) / 0.02).round() as usize;
        for i in 0..=steps {
            self.frame(vec![point(from_x + 0.02 * i as f32, y)]);
        }
        self.rest();
        self.engine.snapshot().pop().expect("a stroke was drawn")
    }
}

fn point(x: f32, y: f32) -> HandDetection {
    HandDetection::upright(HandPose::Point, Point2::new(x, y), 0.1)
}

fn pinch(x: f32, y: f32) -> HandDetection {
    HandDetection::upright(HandPose::Pinch, Point2::new(x, y), 0.1)
}

#[test]
fn stable_point_draws_one_stroke() {
    let mut rig = Rig::new();
    // Two warm-up frames; the third reaches the stability threshold.
    rig.hold(2, vec![point(0.1, 0.1)]);
    assert!(rig.engine.store().is_empty());
    for x in [0.1, 0.2, 0.3] {
        assert_eq!(rig.frame(vec![point(x, 0.1)]), FrameOutcome::Processed);
    }
    rig.rest();

    let strokes = rig.engine.snapshot();
    assert_eq!(strokes.len(), 1);
    let pts = &strokes[0].points;
    assert_eq!(pts.len(), 3);
    assert!((pts[0].x - 128.0).abs() < 1e-3);
    assert!(pts.windows(2).all(|w| w[1].x > w[0].x));
    assert!(pts.iter().all(|p| (p.y - 72.0).abs() < 1e-3));
    assert!(pts.windows(2).all(|w| w[1].t_ms - w[0].t_ms == STEP_MS));
}

#[test]
fn two_hand_pinch_scales_and_translates() {
    let mut rig = Rig::new();
    let before = rig.draw_line(0.25, 0.41, 0.5);

    rig.hold(3, vec![pinch(0.2, 0.5), pinch(0.4, 0.5)]);
    let session = rig.engine.session().expect("two pinches form a session");
    assert_eq!(session.target, Some(before.id));

    rig.hold(60, vec![pinch(0.25, 0.5), pinch(0.55, 0.5)]);
    let session = rig.engine.session().expect("session still running");
    assert!((session.total_scale - 1.5).abs() < 0.01, "scale {}", session.total_scale);
    assert!(session.total_rotation.abs() < 1e-3);

    let after = rig.engine.store().get(before.id).unwrap().clone();
    let (c0, c1) = (before.centroid().unwrap(), after.centroid().unwrap());
    // Midpoint moved from x = 0.3 to 0.4 of a 1280 px canvas.
    assert!((c1.x - c0.x - 128.0).abs() < 1.0, "{c0:?} → {c1:?}");
    assert!((c1.y - c0.y).abs() < 1.0);
    let (w0, w1) = (before.bbox.unwrap().width(), after.bbox.unwrap().width());
    assert!((w1 / w0 - 1.5).abs() < 0.02, "{w0} → {w1}");
}

#[test]
fn two_hand_translation_is_rigid() {
    for (dx, dy) in [(0.05, 0.0), (0.0, -0.08), (-0.06, 0.04)] {
        let mut rig = Rig::new();
        let before = rig.draw_line(0.3, 0.5, 0.5);
        rig.hold(3, vec![pinch(0.3, 0.5), pinch(0.5, 0.5)]);
        rig.hold(60, vec![pinch(0.3 + dx, 0.5 + dy), pinch(0.5 + dx, 0.5 + dy)]);

        let session = rig.engine.session().unwrap();
        assert!((session.total_scale - 1.0).abs() < 1e-3, "({dx}, {dy})");
        assert!(session.total_rotation.abs() < 1e-3, "({dx}, {dy})");

        let after = rig.engine.store().get(before.id).unwrap();
        let (b0, b1) = (before.bbox.unwrap(), after.bbox.unwrap());
        assert!((b1.width() - b0.width()).abs() < 0.5);
        assert!((b1.min.x - b0.min.x - dx * 1280.0).abs() < 1.0);
        assert!((b1.min.y - b0.min.y - dy * 720.0).abs() < 1.0);
    }
}

#[test]
fn guest_cannot_draw_without_window() {
    let mut rig = Rig::new();
    let admin = HandDetection::upright(HandPose::Fist, Point2::new(0.2, 0.5), 0.12);
    let guest = HandDetection::upright(HandPose::Point, Point2::new(0.7, 0.5), 0.05);
    rig.hold(10, vec![admin, guest]);

    assert!(rig.engine.store().is_empty());
    let status = rig.engine.status();
    assert_eq!(status.active_tracks(), 2);
    assert_eq!(status.tracks[0].role, Role::Admin);
    assert_eq!(status.tracks[1].role, Role::Guest);
    assert_eq!(status.guest_seconds_left, 0);
}

#[test]
fn guest_draws_in_gold_once_unlocked() {
    let mut rig = Rig::new();
    rig.engine.apply_text_command("red").unwrap();
    let admin = HandDetection::upright(HandPose::Fist, Point2::new(0.2, 0.5), 0.12);
    let guest = HandDetection::upright(HandPose::Point, Point2::new(0.7, 0.5), 0.05);
    rig.hold(2, vec![admin.clone(), guest.clone()]);
    rig.engine.apply_text_command("unlock guests").unwrap();
    rig.hold(6, vec![admin, guest]);

    let strokes = rig.engine.snapshot();
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].color, gesture_canvas::Color::GOLD);
    assert!(rig.engine.status().guest_seconds_left > 0);
}

#[test]
fn undo_then_redo_restores_stroke() {
    let mut rig = Rig::new();
    rig.engine.apply_command(Command::SetColor(gesture_canvas::Color::PURPLE));
    let drawn = rig.draw_line(0.2, 0.4, 0.3);
    rig.engine.take_damage();

    rig.engine.apply_command(Command::Undo);
    assert!(rig.engine.store().is_empty());
    assert!(rig.engine.take_damage().full_redraw);
    rig.engine.apply_command(Command::Redo);

    let restored = rig.engine.snapshot();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].points, drawn.points);
    assert_eq!(restored[0].color, gesture_canvas::Color::PURPLE);
}

#[test]
fn eraser_splits_stroke_in_two() {
    let mut rig = Rig::new();
    let drawn = rig.draw_line(0.3, 0.5, 0.5);
    rig.engine.apply_text_command("eraser").unwrap();
    rig.hold(5, vec![point(0.4, 0.5)]);
    rig.rest();

    let pieces = rig.engine.snapshot();
    assert_eq!(pieces.len(), 2);
    assert!(pieces.iter().all(|s| s.points.len() >= 2 && s.color == drawn.color));
    assert!(pieces.iter().all(|s| s.id != drawn.id));
    let total: usize = pieces.iter().map(|s| s.points.len()).sum();
    assert!(total < drawn.points.len());
}

#[test]
fn damage_is_incremental_while_drawing() {
    let mut rig = Rig::new();
    rig.hold(3, vec![point(0.5, 0.5)]);
    rig.engine.take_damage();
    rig.frame(vec![point(0.51, 0.5)]);
    let damage = rig.engine.take_damage();
    assert!(!damage.full_redraw);
    assert_eq!(damage.appended.len(), 1);
}
