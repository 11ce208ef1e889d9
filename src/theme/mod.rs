// Theme module - Color palette
//
// Colors shared by all panels. Status colors map scheduler and slot state
// (live/fixed, loading, failed) onto the palette.

use crate::dom::Slot;
use crate::window::Mode;
use ratatui::style::Color;

/// Primary accent - borders, titles, key hints
/// RGB: (187, 154, 247)
pub const ACCENT: Color = Color::Rgb(187, 154, 247);

/// Warnings - render mismatches, fixed windows
/// RGB: (255, 158, 100)
pub const WARN: Color = Color::Rgb(255, 158, 100);

/// Errors - failed fetches, invariant violations
/// RGB: (247, 118, 142)
pub const ERROR: Color = Color::Rgb(247, 118, 142);

/// Healthy - live refresh, mounted fragments
/// RGB: (158, 206, 106)
pub const OK: Color = Color::Rgb(158, 206, 106);

/// Regular text
/// RGB: (169, 177, 214)
pub const TEXT: Color = Color::Rgb(169, 177, 214);

/// De-emphasized text - placeholders, hidden panels
pub const MUTED: Color = Color::Rgb(86, 95, 137);

/// Background of the highlighted (hovered) row
pub const HIGHLIGHT_BG: Color = Color::Rgb(65, 72, 104);

/// Tooltip popup background
pub const TOOLTIP_BG: Color = Color::Rgb(36, 40, 59);

pub fn mode_color(mode: Mode) -> Color {
    match mode {
        Mode::Live => OK,
        Mode::Fixed => WARN,
    }
}

pub fn mode_label(mode: Mode) -> &'static str {
    match mode {
        Mode::Live => "LIVE",
        Mode::Fixed => "FIXED",
    }
}

/// Border color for a panel showing `slot`
pub fn slot_color(slot: &Slot) -> Color {
    if slot.error.is_some() {
        ERROR
    } else if slot.notice.is_some() {
        WARN
    } else if slot.content.is_some() {
        ACCENT
    } else {
        MUTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_color_priority() {
        let mut slot = Slot::default();
        assert_eq!(slot_color(&slot), MUTED);
        slot.content = Some(Default::default());
        assert_eq!(slot_color(&slot), ACCENT);
        slot.notice = Some("flow: markup has no hover-element entries".into());
        assert_eq!(slot_color(&slot), WARN);
        slot.error = Some("flow: backend responded 500".into());
        assert_eq!(slot_color(&slot), ERROR);
    }

    #[test]
    fn test_mode_styles() {
        assert_eq!(mode_label(Mode::Live), "LIVE");
        assert_eq!(mode_color(Mode::Fixed), WARN);
    }
}
