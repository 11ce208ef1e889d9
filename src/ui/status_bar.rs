// Status Bar rendering module
//
// Renders the bottom status bar with keyboard shortcuts and scheduler
// indicators.

use crate::app::Dashboard;
use crate::theme::{mode_color, mode_label, ACCENT, ERROR, OK, TEXT};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

pub fn render_status_bar(f: &mut Frame, area: Rect, app: &Dashboard) {
    // Calculate available width for hints (subtract borders and indicators)
    let available_width = area.width.saturating_sub(40);

    struct Hint {
        priority: u8,
        key: &'static str,
        desc: &'static str,
        color: Color,
    }

    let hints = [
        Hint {
            priority: 1,
            key: "Q:",
            desc: "Quit | ",
            color: ERROR,
        },
        Hint {
            priority: 1,
            key: "1-8:",
            desc: "Period | ",
            color: ACCENT,
        },
        Hint {
            priority: 1,
            key: "←→:",
            desc: "Day | ",
            color: ACCENT,
        },
        Hint {
            priority: 2,
            key: "L:",
            desc: "Live | ",
            color: ACCENT,
        },
        Hint {
            priority: 2,
            key: "R:",
            desc: "Refresh | ",
            color: ACCENT,
        },
        Hint {
            priority: 3,
            key: "+/-:",
            desc: "Cadence | ",
            color: ACCENT,
        },
        Hint {
            priority: 3,
            key: "T/F/S/B:",
            desc: "Panels | ",
            color: ACCENT,
        },
    ];

    let mut spans = vec![Span::styled(" ◈ ", Style::default().fg(ACCENT))];
    let mut current_length = 3;

    // Process hints by priority
    for priority in 1..=3 {
        for hint in hints.iter().filter(|h| h.priority == priority) {
            let hint_length = hint.key.chars().count() + hint.desc.len();
            if current_length + hint_length <= available_width as usize {
                spans.push(Span::styled(
                    hint.key,
                    Style::default().fg(hint.color).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw(hint.desc));
                current_length += hint_length;
            }
        }
    }

    spans.push(Span::raw(" "));
    spans.extend(build_indicators(app));

    let status_bar = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(ACCENT)),
        )
        .alignment(Alignment::Left);

    f.render_widget(status_bar, area);
}

/// Scheduler indicators: [LIVE] [refreshes] [timers] [failed]
pub fn build_indicators(app: &Dashboard) -> Vec<Span<'static>> {
    let mode = app.window().mode;
    let stats = app.scheduler().stats();
    let live_timers = app.scheduler().live_timers();
    let bracket = Style::default().fg(TEXT);

    let mut spans = vec![
        Span::styled("[", bracket),
        Span::styled(
            mode_label(mode),
            Style::default()
                .fg(mode_color(mode))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("] ", bracket),
        Span::styled(format!("[↻ {}] ", stats.refreshes), bracket),
    ];

    // More than one live timer would mean overlapping refresh loops
    let timer_color = if live_timers > 1 { ERROR } else { OK };
    spans.push(Span::styled("[T:", bracket));
    spans.push(Span::styled(
        live_timers.to_string(),
        Style::default().fg(timer_color).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("] ", bracket));

    if stats.failed > 0 {
        spans.push(Span::styled(
            format!("[✗ {}]", stats.failed),
            Style::default().fg(ERROR),
        ));
    }
    spans
}
