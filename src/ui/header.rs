// Header rendering module
//
// Renders the window bounds, refresh mode and cadence, plus a banner when
// the scheduler has recorded an invariant violation.

use crate::app::Dashboard;
use crate::theme::{mode_color, mode_label, ACCENT, ERROR, MUTED, TEXT, WARN};
use crate::window::{DAY_SECS, HOUR_SECS};
use chrono::{Local, TimeZone};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};
use std::time::Duration;

pub fn render_header(f: &mut Frame, area: Rect, app: &Dashboard) {
    let window = app.window();
    let scheduler = app.scheduler();

    let cadence_style = if app.config.recently_changed() {
        Style::default().fg(WARN).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT)
    };
    let cadence = if scheduler.has_active_timer() {
        format!("every {}", cadence_label(scheduler.schedule().cadence))
    } else {
        "paused".to_string()
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(
            " flowdeck ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                " {} → {} ",
                format_timestamp(window.start),
                format_timestamp(window.end)
            ),
            Style::default().fg(TEXT),
        ),
        Span::styled(
            format!("[{}]", mode_label(window.mode)),
            Style::default()
                .fg(mode_color(window.mode))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} ({}) ", app.preset(), span_label(window.duration())),
            Style::default().fg(TEXT),
        ),
        Span::styled(cadence, cadence_style),
    ])];

    // Invariant violations must be visible, not just logged
    let second = match scheduler.fault() {
        Some(fault) => Line::from(Span::styled(
            format!(" ⚠ scheduler fault: {fault}"),
            Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
        )),
        None => Line::from(Span::styled(
            format!(" {}  [{}]", app.config.base_url, scheduler.schedule().fragments),
            Style::default().fg(MUTED),
        )),
    };
    lines.push(second);

    let border = if scheduler.fault().is_some() { ERROR } else { ACCENT };
    let header = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(border)),
        )
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}

/// Local date and time for an epoch second
pub fn format_timestamp(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => secs.to_string(),
    }
}

/// Compact window length, e.g. `6h`, `7d`, `13h 20m`
pub fn span_label(secs: i64) -> String {
    let secs = secs.max(0);
    if secs >= DAY_SECS && secs % DAY_SECS == 0 {
        return format!("{}d", secs / DAY_SECS);
    }
    let hours = secs / HOUR_SECS;
    let minutes = (secs % HOUR_SECS) / 60;
    match (hours, minutes) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Refresh cadence, e.g. `10s`, `1.5s`, `500ms`
pub fn cadence_label(cadence: Duration) -> String {
    let ms = cadence.as_millis();
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms % 1_000 == 0 {
        format!("{}s", ms / 1_000)
    } else {
        format!("{:.1}s", ms as f64 / 1_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_label() {
        assert_eq!(span_label(6 * HOUR_SECS), "6h");
        assert_eq!(span_label(7 * DAY_SECS), "7d");
        assert_eq!(span_label(13 * HOUR_SECS + 20 * 60), "13h 20m");
        assert_eq!(span_label(1), "0m");
        assert_eq!(span_label(36 * HOUR_SECS), "36h");
    }

    #[test]
    fn test_cadence_label() {
        assert_eq!(cadence_label(Duration::from_secs(10)), "10s");
        assert_eq!(cadence_label(Duration::from_millis(1_500)), "1.5s");
        assert_eq!(cadence_label(Duration::from_millis(500)), "500ms");
    }
}
