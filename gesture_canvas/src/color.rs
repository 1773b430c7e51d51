//! Packed ARGB stroke colors.

use serde::{Deserialize, Serialize};

/// A packed `0xAARRGGBB` color, the same layout the painter's framebuffer uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE:  Color = Color(0xFFFFFFFF);
    pub const BLACK:  Color = Color(0xFF000000);
    pub const RED:    Color = Color(0xFFFF3B30);
    pub const ORANGE: Color = Color(0xFFFF9500);
    pub const YELLOW: Color = Color(0xFFFFEB3B);
    pub const GREEN:  Color = Color(0xFF34C759);
    pub const CYAN:   Color = Color(0xFF32D2F5);
    pub const BLUE:   Color = Color(0xFF0A84FF);
    pub const PURPLE: Color = Color(0xFFAF52DE);
    pub const PINK:   Color = Color(0xFFFF2D92);
    /// Reserved for guest strokes; an admin drawing with it opens the guest window.
    pub const GOLD:   Color = Color(0xFFFFD700);

    /// Look up a spoken color name.
    pub fn from_name(name: &str) -> Option<Color> {
        let c = match name.trim().to_ascii_lowercase().as_str() {
            "white"                => Color::WHITE,
            "black"                => Color::BLACK,
            "red"                  => Color::RED,
            "orange"               => Color::ORANGE,
            "yellow"               => Color::YELLOW,
            "green"                => Color::GREEN,
            "cyan" | "teal"        => Color::CYAN,
            "blue"                 => Color::BLUE,
            "purple" | "violet"    => Color::PURPLE,
            "pink" | "magenta"     => Color::PINK,
            "gold" | "golden"      => Color::GOLD,
            _ => return None,
        };
        Some(c)
    }

    pub fn argb(self) -> u32 {
        self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::CYAN
    }
}
