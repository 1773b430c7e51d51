//! Detection sources — LeapMotion hardware and mouse/keyboard simulation.
//!
//! The public interface is [`SourceEvent`] delivered over a `mpsc` channel.
//! The main loop doesn't need to know whether frames came from real hardware
//! or the simulator; both produce 21-landmark [`HandDetection`]s.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;

use gesture_canvas::detection::mirrored;
use gesture_canvas::{DetectionFrame, HandDetection, HandPose, Handedness, Point2};

// ════════════════════════════════════════════════════════════════════════════
// SourceEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    /// Everything detected in one camera / controller frame.
    Frame(DetectionFrame),
    /// Transcribed or typed command text.
    Command(String),
    /// The detector could not deliver a frame.
    Failure { timestamp_ms: u64, message: String },
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// DetectionSource trait — unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`SourceEvent`]s over a channel.
pub trait DetectionSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>);
}

/// Spawn a source on its own thread and return the receiving end.
pub fn spawn_detection_source<S: DetectionSource>(source: S) -> Receiver<SourceEvent> {
    let (tx, rx) = mpsc::channel();
    spawn_into(source, tx);
    rx
}

/// Spawn a source feeding an existing channel, so several sources can share
/// one receiver.
pub fn spawn_into<S: DetectionSource>(source: S, tx: Sender<SourceEvent>) {
    thread::spawn(move || Box::new(source).run(tx));
}

/// Milliseconds since `start`, forced strictly increasing.
struct Clock {
    start: Instant,
    last:  Option<u64>,
}

impl Clock {
    fn new() -> Self {
        Clock { start: Instant::now(), last: None }
    }

    fn now_ms(&mut self) -> u64 {
        let t = self.start.elapsed().as_millis() as u64;
        let t = match self.last {
            Some(last) if t <= last => last + 1,
            _ => t,
        };
        self.last = Some(t);
        t
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapDetectionSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Detection source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// Each tracked hand's bones are flattened into the 21-landmark layout
/// (wrist, then four joints per digit from thumb to pinky) and projected
/// from the controller's millimetre space onto the unit square, looking
/// down at the device from above.
#[cfg(feature = "leap")]
pub struct LeapDetectionSource;

#[cfg(feature = "leap")]
impl DetectionSource for LeapDetectionSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        use leaprs::*;

        // Consecutive poll errors before the failure is reported.
        const FAILURE_STREAK: u32 = 10;

        let mut clock = Clock::new();
        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c) => c,
            Err(e) => {
                let message = format!("LeapC connection failed: {e:?}");
                let _ = tx.send(SourceEvent::Failure { timestamp_ms: clock.now_ms(), message });
                return;
            }
        };
        if let Err(e) = connection.open() {
            let message = format!("LeapMotion device unavailable: {e:?}");
            let _ = tx.send(SourceEvent::Failure { timestamp_ms: clock.now_ms(), message });
            return;
        }

        let mut errors = 0u32;
        loop {
            let msg = match connection.poll(100) {
                Ok(m) => {
                    errors = 0;
                    m
                }
                Err(e) => {
                    errors += 1;
                    if errors == FAILURE_STREAK {
                        let message = format!("LeapC poll: {e:?}");
                        let ev = SourceEvent::Failure { timestamp_ms: clock.now_ms(), message };
                        if tx.send(ev).is_err() {
                            return;
                        }
                    }
                    continue;
                }
            };

            if let Event::Tracking(frame) = msg.event() {
                let hands = frame
                    .hands()
                    .filter_map(|h| {
                        let det = HandDetection::from_landmarks(leap_landmarks(&h)).ok()?;
                        let side = match h.hand_type() {
                            HandType::Left => Handedness::Left,
                            _ => Handedness::Right,
                        };
                        Some(det.with_handedness(side))
                    })
                    .collect();
                let frame = DetectionFrame::new(clock.now_ms(), hands);
                if tx.send(SourceEvent::Frame(frame)).is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(feature = "leap")]
fn leap_landmarks(hand: &leaprs::Hand) -> Vec<Point2> {
    // Interaction box, millimetres: x across the device, y height above it.
    const X_RANGE: f32 = 400.0;
    const Y_MIN:   f32 = 100.0;
    const Y_RANGE: f32 = 400.0;
    let project = |x: f32, y: f32| {
        Point2::new((x + X_RANGE / 2.0) / X_RANGE, 1.0 - (y - Y_MIN) / Y_RANGE)
    };

    let digits: Vec<_> = hand.digits().collect();
    let mut out = Vec::with_capacity(gesture_canvas::detection::LANDMARK_COUNT);
    if let Some(middle) = digits.get(2) {
        let w = middle.metacarpal().prev_joint();
        out.push(project(w.x, w.y));
    }
    for digit in &digits {
        let (p, i, d) = (digit.proximal(), digit.intermediate(), digit.distal());
        for j in [p.prev_joint(), i.prev_joint(), d.prev_joint(), d.next_joint()] {
            out.push(project(j.x, j.y));
        }
    }
    out
}

// ════════════════════════════════════════════════════════════════════════════
// SimDetectionSource — mouse/keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Snapshot of the simulated hands, sent by the visualizer every poll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimHands {
    /// Cursor position, normalized detection space.
    pub cursor:      Point2,
    /// `None` = relaxed hand (tracked, no gesture).
    pub pose:        Option<HandPose>,
    pub scale:       f32,
    /// Add a second hand mirrored across the vertical centre line.
    pub mirror:      bool,
    /// Shrink the mirrored hand to guest size.
    pub guest_small: bool,
}

impl Default for SimHands {
    fn default() -> Self {
        SimHands {
            cursor:      Point2::new(0.5, 0.5),
            pose:        None,
            scale:       0.12,
            mirror:      false,
            guest_small: false,
        }
    }
}

/// Guest hands are drawn at this fraction of the presenter's size.
pub const GUEST_SCALE: f32 = 0.5;

impl SimHands {
    /// Synthetic detections for this snapshot.
    pub fn detections(&self) -> Vec<HandDetection> {
        let pose = self.pose.unwrap_or(HandPose::Fist);
        let mut hands = vec![
            HandDetection::upright(pose, self.cursor, self.scale).with_handedness(Handedness::Right),
        ];
        if self.mirror {
            let scale = if self.guest_small { self.scale * GUEST_SCALE } else { self.scale };
            hands.push(
                HandDetection::upright(pose, mirrored(self.cursor), scale)
                    .with_handedness(Handedness::Left),
            );
        }
        hands
    }
}

/// Raw input from the simulation window.
#[derive(Clone, Debug, PartialEq)]
pub enum SimInput {
    Hands(SimHands),
    /// A command bound to a key.
    Command(String),
    /// Ask for a command on stdin.
    PromptCommand,
    Quit,
}

/// Detection source driven by [`SimInput`] events from the visualizer's
/// window.  This decouples the window event loop from detection timing.
pub struct SimDetectionSource {
    pub rx: Receiver<SimInput>,
    /// When false only commands are forwarded (hardware supplies the hands).
    pub emit_hands: bool,
}

impl SimDetectionSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimDetectionSource { rx, emit_hands: true }
    }

    pub fn commands_only(rx: Receiver<SimInput>) -> Self {
        SimDetectionSource { rx, emit_hands: false }
    }
}

impl DetectionSource for SimDetectionSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        let mut clock = Clock::new();
        for input in self.rx {
            let event = match input {
                SimInput::Hands(h) if self.emit_hands => {
                    SourceEvent::Frame(DetectionFrame::new(clock.now_ms(), h.detections()))
                }
                SimInput::Hands(_) => continue,
                SimInput::Command(text) => SourceEvent::Command(text),
                SimInput::PromptCommand => match prompt_command() {
                    Some(text) => SourceEvent::Command(text),
                    None => continue,
                },
                SimInput::Quit => {
                    let _ = tx.send(SourceEvent::Quit);
                    return;
                }
            };
            if tx.send(event).is_err() {
                return;
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Typed command prompt
// ════════════════════════════════════════════════════════════════════════════

/// Prompt for a command on stdout/stdin.  Blocks only the source thread.
pub fn prompt_command() -> Option<String> {
    use std::io::{self, Write};
    print!("\n  Command: ");
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok()?;
    let text = buf.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
