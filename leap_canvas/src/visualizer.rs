//! Software-rendered canvas using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                                                                  │
//! │   stroke layer (persistent, repainted only on full redraw)      │
//! │   + hand overlay (landmarks, cursors; redrawn every frame)      │
//! │                                                                  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  status bar: fps · latency · hands · strokes · guest window     │
//! │  key legend                                                      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pixel work lives on [`Raster`], which has no window and is tested on its
//! own; [`Visualizer`] only owns the window and composes the layers.

use std::sync::mpsc::Sender;

use gesture_canvas::detection::{
    INDEX_MCP, INDEX_PIP, INDEX_TIP, MIDDLE_MCP, MIDDLE_PIP, MIDDLE_TIP, PINKY_MCP, PINKY_PIP,
    PINKY_TIP, RING_MCP, RING_PIP, RING_TIP, THUMB_MCP, THUMB_TIP, WRIST,
};
use gesture_canvas::{CanvasEngine, Damage, HandPose, Point2, Role, Stroke, StrokePoint, TrackPhase};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::source::{SimHands, SimInput};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const STATUS_H:     usize = 28;
const BG_COLOR:     u32   = 0xFF1A1A2E;
const TEXT_BG:      u32   = 0xFF0F3460;
const ADMIN_COLOR:  u32   = 0xFF7CFC00;
const GUEST_COLOR:  u32   = 0xFFFFB347;
const BONE_COLOR:   u32   = 0xFF5A6A8A;
/// Fraction of the stroke color kept in the glow halo.
const GLOW_MIX:     f32   = 0.35;
const GLOW_SPREAD:  f32   = 3.0;

const LEGEND: &str =
    "LMB=point RMB=pinch SPACE=palm M=2nd hand J=guest size WHEEL=depth  \
     U/R=undo/redo C=clear E=eraser G=glow L=landmarks K=unlock 1-7=color [ ]=width T=type P=pause Q=quit";

/// Landmark pairs joined when the skeleton overlay is on.
const BONES: [(usize, usize); 15] = [
    (WRIST, THUMB_MCP), (THUMB_MCP, THUMB_TIP),
    (WRIST, INDEX_MCP), (INDEX_MCP, INDEX_PIP), (INDEX_PIP, INDEX_TIP),
    (INDEX_MCP, MIDDLE_MCP), (MIDDLE_MCP, MIDDLE_PIP), (MIDDLE_PIP, MIDDLE_TIP),
    (MIDDLE_MCP, RING_MCP), (RING_MCP, RING_PIP), (RING_PIP, RING_TIP),
    (RING_MCP, PINKY_MCP), (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_TIP),
    (WRIST, PINKY_MCP),
];

// ════════════════════════════════════════════════════════════════════════════
// Raster — window-free pixel buffer
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    pub w:  usize,
    pub h:  usize,
    pub px: Vec<u32>,
}

impl Raster {
    pub fn new(w: usize, h: usize, color: u32) -> Self {
        Raster { w, h, px: vec![color; w * h] }
    }

    pub fn fill(&mut self, color: u32) {
        self.px.fill(color);
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.w && y < self.h).then(|| self.px[y * self.w + x])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.w && y < self.h {
            self.px[y * self.w + x] = color;
        }
    }

    fn set_signed(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.h) {
            for col in x..(x + w).min(self.w) {
                self.px[row * self.w + col] = color;
            }
        }
    }

    pub fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 {
            return;
        }
        for col in x..(x + w).min(self.w) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..(y + h).min(self.h) {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    /// Filled disc.  `r < 0.5` still paints the centre pixel.
    pub fn disc(&mut self, c: Point2, r: f32, color: u32) {
        let r = r.max(0.5);
        let (x0, x1) = ((c.x - r).floor() as isize, (c.x + r).ceil() as isize);
        let (y0, y1) = ((c.y - r).floor() as isize, (c.y + r).ceil() as isize);
        let r2 = r * r;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (dx, dy) = (x as f32 + 0.5 - c.x, y as f32 + 0.5 - c.y);
                if dx * dx + dy * dy <= r2 {
                    self.set_signed(x, y, color);
                }
            }
        }
        self.set_signed(c.x.floor() as isize, c.y.floor() as isize, color);
    }

    /// Disc blended into what is already there.
    pub fn halo(&mut self, c: Point2, r: f32, color: u32, t: f32) {
        let (x0, x1) = ((c.x - r).floor() as isize, (c.x + r).ceil() as isize);
        let (y0, y1) = ((c.y - r).floor() as isize, (c.y + r).ceil() as isize);
        let r2 = r * r;
        for y in y0.max(0)..=y1 {
            for x in x0.max(0)..=x1 {
                let (dx, dy) = (x as f32 + 0.5 - c.x, y as f32 + 0.5 - c.y);
                if dx * dx + dy * dy <= r2 {
                    if let Some(under) = self.get(x as usize, y as usize) {
                        self.set_pixel(x as usize, y as usize, blend(under, color, t));
                    }
                }
            }
        }
    }

    /// Thick segment as a run of discs one pixel apart.
    pub fn segment(&mut self, a: Point2, b: Point2, width: f32, color: u32) {
        let r = width / 2.0;
        let steps = a.distance(b).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.disc(Point2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t), r, color);
        }
    }

    /// Minimal bitmap font — 3×5 characters for status rendering.
    /// Each character is encoded as 5 rows × 3 bits.
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > self.w { break; }
        }
    }

    // ── strokes ───────────────────────────────────────────────────────────

    /// Paint a whole stroke.
    pub fn draw_stroke(&mut self, stroke: &Stroke, glow: bool) {
        let color = stroke.color.argb();
        if glow {
            self.stroke_pass(&stroke.points, GLOW_SPREAD, blend(BG_COLOR, color, GLOW_MIX));
        }
        self.stroke_pass(&stroke.points, 1.0, color);
    }

    /// Paint only the newest segment of a stroke that is still growing.
    ///
    /// The halo of the new segment overlaps the previous one, so its core is
    /// repainted too.
    pub fn extend_stroke(&mut self, stroke: &Stroke, glow: bool) {
        let color = stroke.color.argb();
        let n = stroke.points.len();
        if glow {
            self.stroke_pass(&stroke.points[n.saturating_sub(2)..], GLOW_SPREAD, blend(BG_COLOR, color, GLOW_MIX));
            self.stroke_pass(&stroke.points[n.saturating_sub(3)..], 1.0, color);
        } else {
            self.stroke_pass(&stroke.points[n.saturating_sub(2)..], 1.0, color);
        }
    }

    fn stroke_pass(&mut self, points: &[StrokePoint], spread: f32, color: u32) {
        match points {
            [] => {}
            [p] => self.disc(p.pos(), p.width * spread / 2.0, color),
            pts => {
                for w in pts.windows(2) {
                    let width = (w[0].width + w[1].width) / 2.0 * spread;
                    self.segment(w[0].pos(), w[1].pos(), width, color);
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:  Window,
    /// Committed strokes; survives between frames.
    strokes: Raster,
    /// Strokes + overlay + status bar, what the window shows.
    frame:   Raster,
    sim_tx:  Sender<SimInput>,
    sim:     SimHands,
    /// Glow flag the stroke layer was last painted with.
    painted_glow: bool,
    pause_toggle: bool,
}

impl Visualizer {
    pub fn new(title: &str, engine: &CanvasEngine, sim_tx: Sender<SimInput>) -> Result<Self, String> {
        let geom = &engine.config().canvas;
        let (w, h) = (geom.width as usize, geom.height as usize);
        let mut window = Window::new(
            title,
            w, h + STATUS_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        let mut strokes = Raster::new(w, h, BG_COLOR);
        let glow = engine.settings().glow;
        for s in engine.strokes() {
            strokes.draw_stroke(s, glow);
        }

        Ok(Visualizer {
            window,
            strokes,
            frame: Raster::new(w, h + STATUS_H, BG_COLOR),
            sim_tx,
            sim: SimHands::default(),
            painted_glow: glow,
            pause_toggle: false,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// True once after P was pressed.
    pub fn take_pause_toggle(&mut self) -> bool {
        std::mem::take(&mut self.pause_toggle)
    }

    /// Poll mouse and keyboard and translate to SimInput events.
    pub fn poll_input(&mut self, mirror_x: bool) -> bool {
        if !self.window.is_open() { return false; }

        let shift = self.window.is_key_down(Key::LeftShift)
                 || self.window.is_key_down(Key::RightShift);

        // Keys that trigger on first press only
        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        // Keys that repeat while held
        let held     = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            let _ = self.sim_tx.send(SimInput::Quit);
            return false;
        }

        let mut commands: Vec<&str> = Vec::new();
        let bindings = [
            (Key::U, "undo"),
            (Key::R, "redo"),
            (Key::C, "clear"),
            (Key::E, "eraser"),
            (Key::G, "glow"),
            (Key::L, "landmarks"),
            (Key::X, "export"),
            (Key::V, "switch camera"),
            (Key::Key1, "red"),
            (Key::Key2, "orange"),
            (Key::Key3, "yellow"),
            (Key::Key4, "green"),
            (Key::Key5, "blue"),
            (Key::Key6, "purple"),
            (Key::Key7, "gold"),
        ];
        for (key, text) in bindings {
            if one_shot(key) {
                commands.push(text);
            }
        }
        if one_shot(Key::K) {
            commands.push(if shift { "lock guests" } else { "unlock guests" });
        }
        if held(Key::LeftBracket) {
            commands.push("thinner");
        }
        if held(Key::RightBracket) {
            commands.push("thicker");
        }
        let prompt = one_shot(Key::T);
        if one_shot(Key::P) {
            self.pause_toggle = true;
        }
        if one_shot(Key::M) {
            self.sim.mirror = !self.sim.mirror;
        }
        if one_shot(Key::J) {
            self.sim.guest_small = !self.sim.guest_small;
        }

        // ── simulated hands ───────────────────────────────────────────────
        if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Clamp) {
            let nx = mx / self.strokes.w as f32;
            let nx = if mirror_x { 1.0 - nx } else { nx };
            self.sim.cursor = Point2::new(nx, my / self.strokes.h as f32);
        }
        if let Some((_, dy)) = self.window.get_scroll_wheel() {
            self.sim.scale = (self.sim.scale * (1.0 + dy.signum() * 0.05)).clamp(0.03, 0.4);
        }
        self.sim.pose = if self.window.get_mouse_down(MouseButton::Right) {
            Some(HandPose::Pinch)
        } else if self.window.is_key_down(Key::Space) {
            Some(HandPose::Palm)
        } else if self.window.get_mouse_down(MouseButton::Left) {
            Some(HandPose::Point)
        } else {
            None
        };

        let _ = self.sim_tx.send(SimInput::Hands(self.sim));
        for text in commands {
            let _ = self.sim_tx.send(SimInput::Command(text.to_string()));
        }
        if prompt {
            let _ = self.sim_tx.send(SimInput::PromptCommand);
        }
        true
    }

    /// Render one frame.
    pub fn render(&mut self, engine: &CanvasEngine, damage: &Damage, status: &str) {
        let glow = engine.settings().glow;

        // ── Stroke layer ──────────────────────────────────────────────────
        if damage.full_redraw || glow != self.painted_glow {
            self.strokes.fill(BG_COLOR);
            for s in engine.strokes() {
                self.strokes.draw_stroke(s, glow);
            }
            self.painted_glow = glow;
        } else {
            for id in &damage.appended {
                if let Some(s) = engine.store().get(*id) {
                    self.strokes.extend_stroke(s, glow);
                }
            }
        }

        // ── Compose ───────────────────────────────────────────────────────
        let w = self.strokes.w;
        let canvas_len = self.strokes.px.len();
        self.frame.px[..canvas_len].copy_from_slice(&self.strokes.px);

        self.draw_hands(engine);

        // ── Status bar ────────────────────────────────────────────────────
        let bar_y = self.strokes.h;
        self.frame.fill_rect(0, bar_y, w, STATUS_H, TEXT_BG);
        let swatch = engine.settings().brush_color.argb();
        self.frame.fill_rect(6, bar_y + 5, 10, 8, swatch);
        self.frame.draw_border(5, bar_y + 4, 12, 10, 0xFFEEEEEE);
        self.frame.draw_label(status, 24, bar_y + 6, 0xFFEEEEEE);
        self.frame.draw_label(LEGEND, 6, bar_y + 18, 0xFF888888);

        self.window
            .update_with_buffer(&self.frame.px, self.frame.w, self.frame.h)
            .ok();
    }

    fn draw_hands(&mut self, engine: &CanvasEngine) {
        let geom = &engine.config().canvas;
        let show_landmarks = engine.settings().show_landmarks;
        for track in engine.tracks() {
            let color = match engine.roles().role(track) {
                Role::Admin => ADMIN_COLOR,
                Role::Guest => GUEST_COLOR,
            };
            let lm = &track.detection.landmarks;
            if show_landmarks {
                for (a, b) in BONES {
                    if let (Some(&pa), Some(&pb)) = (lm.get(a), lm.get(b)) {
                        self.frame.segment(geom.to_canvas(pa), geom.to_canvas(pb), 1.0, BONE_COLOR);
                    }
                }
                for &p in lm {
                    self.frame.disc(geom.to_canvas(p), 2.0, color);
                }
            }
            let (anchor, r) = match track.phase {
                TrackPhase::Pinching     => (track.pinch_mid, 7.0),
                TrackPhase::PalmSelected => (track.palm, 9.0),
                _                        => (track.pointer, 4.0),
            };
            let c = geom.to_canvas(anchor);
            self.frame.halo(c, r + 3.0, color, 0.5);
            self.frame.disc(c, r / 2.0, color);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '[' => [0b110, 0b100, 0b100, 0b100, 0b110],
        ']' => [0b011, 0b001, 0b001, 0b001, 0b011],
        '|' => [0b010, 0b010, 0b010, 0b010, 0b010],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0-t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar,br) << 16) | (lerp(ag,bg) << 8) | lerp(ab,bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
