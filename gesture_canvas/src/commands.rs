//! Spoken / typed command vocabulary.
//!
//! Transcripts arrive already converted to text.  [`Command::parse`] maps
//! them onto a small fixed vocabulary by whole-word keyword matching, so
//! "please undo that" and "undo" mean the same thing while "clock" is not
//! "lock".  The first matching keyword wins: `redo` before `undo`, editing
//! commands before thickness, thickness before colors.

use crate::color::Color;
use crate::error::{CanvasError, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Thickness {
    Absolute(f32),
    Thicker,
    Thinner,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Undo,
    Redo,
    Clear,
    SetColor(Color),
    SetThickness(Thickness),
    ToggleGlow,
    ToggleLandmarks,
    ToggleEraser,
    CameraSwitch,
    GuestLock,
    GuestUnlock,
    Export,
}

/// Commands the engine cannot carry out itself; handed back to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostAction {
    CameraSwitch,
    Export,
}

impl Command {
    pub fn parse(text: &str) -> Result<Command> {
        let lower = text.trim().to_ascii_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '.')
            .map(|w| w.trim_matches('.'))
            .filter(|w| !w.is_empty())
            .collect();
        let has = |kws: &[&str]| words.iter().any(|w| kws.contains(w));

        let cmd = if has(&["redo"]) {
            Command::Redo
        } else if has(&["undo"]) {
            Command::Undo
        } else if has(&["clear", "wipe"]) {
            Command::Clear
        } else if has(&["unlock"]) {
            Command::GuestUnlock
        } else if has(&["lock"]) {
            Command::GuestLock
        } else if has(&["erase", "eraser"]) {
            Command::ToggleEraser
        } else if has(&["glow"]) {
            Command::ToggleGlow
        } else if has(&["landmark", "landmarks", "skeleton"]) {
            Command::ToggleLandmarks
        } else if has(&["camera"]) {
            Command::CameraSwitch
        } else if has(&["export", "save", "snapshot"]) {
            Command::Export
        } else if let Some(t) = parse_thickness(&words) {
            Command::SetThickness(t)
        } else if let Some(c) = words.iter().find_map(|w| Color::from_name(w)) {
            Command::SetColor(c)
        } else {
            return Err(CanvasError::UnrecognizedCommand { text: text.to_string() });
        };
        Ok(cmd)
    }

    /// The host-side action, for commands that have one.
    pub fn host_action(self) -> Option<HostAction> {
        match self {
            Command::CameraSwitch => Some(HostAction::CameraSwitch),
            Command::Export       => Some(HostAction::Export),
            _ => None,
        }
    }
}

const THICKNESS_WORDS: [&str; 9] =
    ["thick", "thicker", "thickness", "thin", "thinner", "width", "size", "bigger", "smaller"];

fn parse_thickness(words: &[&str]) -> Option<Thickness> {
    if !words.iter().any(|w| THICKNESS_WORDS.contains(w)) {
        return None;
    }
    if let Some(n) = words.iter().find_map(|w| w.parse::<f32>().ok()) {
        if n.is_finite() && n > 0.0 {
            return Some(Thickness::Absolute(n));
        }
    }
    if words.iter().any(|w| matches!(*w, "thin" | "thinner" | "smaller")) {
        Some(Thickness::Thinner)
    } else {
        Some(Thickness::Thicker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_keywords_resolve_in_order() {
        assert_eq!(Command::parse("Redo").unwrap(), Command::Redo);
        assert_eq!(Command::parse("please undo that").unwrap(), Command::Undo);
        assert_eq!(Command::parse("unlock guests").unwrap(), Command::GuestUnlock);
        assert_eq!(Command::parse("lock guests").unwrap(), Command::GuestLock);
        assert_eq!(Command::parse("toggle eraser").unwrap(), Command::ToggleEraser);
    }

    #[test]
    fn colors_and_thickness() {
        assert_eq!(Command::parse("make it red").unwrap(), Command::SetColor(Color::RED));
        assert_eq!(Command::parse("Gold!").unwrap(), Command::SetColor(Color::GOLD));
        assert_eq!(
            Command::parse("thickness 12").unwrap(),
            Command::SetThickness(Thickness::Absolute(12.0))
        );
        assert_eq!(Command::parse("thinner").unwrap(), Command::SetThickness(Thickness::Thinner));
        assert_eq!(Command::parse("thicker").unwrap(), Command::SetThickness(Thickness::Thicker));
    }

    #[test]
    fn host_actions() {
        let cam = Command::parse("switch camera").unwrap();
        assert_eq!(cam.host_action(), Some(HostAction::CameraSwitch));
        assert_eq!(Command::parse("export").unwrap().host_action(), Some(HostAction::Export));
        assert_eq!(Command::Undo.host_action(), None);
    }

    #[test]
    fn unknown_text_is_an_error() {
        match Command::parse("sing a song") {
            Err(CanvasError::UnrecognizedCommand { text }) => assert_eq!(text, "sing a song"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_eq!(Command::parse("erase").unwrap(), Command::ToggleEraser);
        assert_eq!(Command::parse("Save.").unwrap(), Command::Export);
        assert_eq!(
            Command::parse("width 2.5").unwrap(),
            Command::SetThickness(Thickness::Absolute(2.5))
        );
        for text in ["clock", "unblock the door", "it is unclear", "saved", "thinking"] {
            assert!(
                matches!(Command::parse(text), Err(CanvasError::UnrecognizedCommand { .. })),
                "{text:?} should not parse"
            );
        }
        // "redone" is not "redo", so the color still gets through.
        assert_eq!(Command::parse("redone in blue").unwrap(), Command::SetColor(Color::BLUE));
    }
}
