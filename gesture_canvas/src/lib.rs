//! # gesture_canvas
//!
//! Real-time multi-hand gesture engine for a shared vector drawing canvas.
//! Each detection frame from an external hand-landmark model flows through a
//! fixed pipeline:
//!
//! ```text
//! HandDetection[] ─► TrackAssigner ─► PointFilter ─► GestureState
//!                 ─► RoleArbitrator ─► InteractionResolver ─► StrokeStore
//! ```
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Hands | Action |
//! |---|---|---|
//! | POINT (index only) | One | Draw a stroke following the index fingertip |
//! | POINT in eraser mode | One | Cut strokes under the fingertip |
//! | GRAB (pinch) | One | Pick the stroke under the pinch, drag / rotate / scale it |
//! | PALM (all fingers) | One | Rotate the current selection |
//! | GRAB + GRAB | Two | Move, scale and rotate one shared stroke together |
//!
//! ## Roles
//!
//! The hand closest to the camera is the presenter ("admin"); smaller hands
//! are guests and may only draw while the guest window is open.  Drawing in
//! the reserved gold color opens it.
//!
//! ## Commands
//!
//! Transcribed voice or typed text such as `"undo"`, `"red"`,
//! `"thickness 12"` or `"unlock guests"` is parsed into a [`Command`] and
//! applied through the same store entry points gestures use.

pub mod classifier;
pub mod color;
pub mod commands;
pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod resolver;
pub mod roles;
pub mod store;
pub mod tracker;

pub use color::Color;
pub use commands::{Command, HostAction, Thickness};
pub use config::{CanvasConfig, Settings};
pub use detection::{DetectionFrame, GestureLabel, HandDetection, HandPose, Handedness};
pub use engine::{CanvasEngine, FrameOutcome, FrameStats, StatusSummary, TrackStatus};
pub use error::{CanvasError, Result};
pub use geometry::{Point2, Rect};
pub use roles::Role;
pub use store::{Damage, Stroke, StrokeId, StrokePoint, StrokeStore};
pub use tracker::{TrackId, TrackPhase};
