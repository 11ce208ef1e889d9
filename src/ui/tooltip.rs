// Tooltip popup
//
// Draws the shared tooltip next to the pointer. The anchor comes from the
// hover controller's placement rule: to the right of the pointer, or to its
// left near the right edge.

use crate::app::{Dashboard, TooltipAnchor};
use crate::dom::hover::Side;
use crate::theme::{ACCENT, TEXT, TOOLTIP_BG};
use ratatui::{
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

pub fn render_tooltip(f: &mut Frame, app: &Dashboard) {
    let Some(anchor) = app.tooltip_anchor() else {
        return;
    };
    let lines = app.document().tooltip.lines();
    if lines.is_empty() {
        return;
    }
    let content_width = lines.iter().map(|l| l.width()).max().unwrap_or(0);
    let area = popup_area(anchor, content_width, lines.len(), f.area());
    if area.width < 3 || area.height < 3 {
        return;
    }

    let text: Vec<Line> = lines.into_iter().map(Line::from).collect();
    let popup = Paragraph::new(text)
        .style(Style::default().fg(TEXT).bg(TOOLTIP_BG))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(ACCENT).bg(TOOLTIP_BG)),
        );
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

/// Popup rectangle for `rows` lines of `content_width` columns, kept inside
/// `bounds`
pub fn popup_area(anchor: TooltipAnchor, content_width: usize, rows: usize, bounds: Rect) -> Rect {
    let width = (content_width as u16).saturating_add(2).min(bounds.width);
    let height = (rows as u16).saturating_add(2).min(bounds.height);

    let x = match anchor.side {
        Side::Right => anchor.col,
        Side::Left => anchor.col.saturating_sub(width.saturating_sub(1)),
    };
    let max_x = bounds.right().saturating_sub(width);
    let max_y = bounds.bottom().saturating_sub(height);
    Rect::new(
        x.clamp(bounds.x, max_x.max(bounds.x)),
        anchor.row.clamp(bounds.y, max_y.max(bounds.y)),
        width,
        height,
    )
}
