//! # leap_canvas
//!
//! Interactive host for the `gesture_canvas` engine: a LeapMotion (or
//! simulated) hand source, a software-rendered canvas window, and the
//! typed-command prompt.
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: mouse and keyboard drive one or two
//!   synthetic hands.
//! * `leap` — **Hardware mode**: polls a real LeapMotion controller via
//!   LeapC; the keyboard still issues commands.
//!
//! ### Simulation controls
//!
//! | Input | Gesture / command |
//! |---|---|
//! | Mouse move | Move the hand |
//! | Left button | POINT (draw) |
//! | Right button | Pinch (select / drag) |
//! | `Space` | Open palm (rotate) |
//! | Wheel | Hand size (distance to camera) |
//! | `M` | Toggle a second, mirrored hand |
//! | `J` | Shrink the second hand to guest size |
//! | `U` / `R` | Undo / redo |
//! | `C` | Clear |
//! | `E` / `G` / `L` | Eraser / glow / landmark overlay |
//! | `K` / `Shift+K` | Unlock / lock guests |
//! | `1`–`7` | Red, orange, yellow, green, blue, purple, gold |
//! | `[` / `]` | Thinner / thicker |
//! | `X` / `V` | Export / switch camera |
//! | `T` | Type a command on stdin |
//! | `P` | Pause |
//! | `Q` / `Escape` | Quit |

pub mod source;
pub mod visualizer;
pub mod app;
