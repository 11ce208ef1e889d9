// Fragment panel rendering
//
// Each slot is drawn as a bordered panel. Interactive elements become one
// row each; the rows are returned as hit regions so pointer events can be
// routed back to the element they were drawn from. Stats markup is a
// six-column grid and is drawn as a table instead.

use crate::app::{Dashboard, HitRegion, HitTarget};
use crate::dom::{Element, Slot, Subtree};
use crate::net::FragmentKind;
use crate::theme::{slot_color, ACCENT, ERROR, HIGHLIGHT_BG, MUTED, TEXT, WARN};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthChar;

/// Columns of the stats grid
pub const STATS_COLUMNS: usize = 6;

fn panel_title(kind: FragmentKind) -> &'static str {
    match kind {
        FragmentKind::Timeline => " Timeline ",
        FragmentKind::Flow => " Flow ",
        FragmentKind::Stats => " Stats ",
        FragmentKind::Band => " Band ",
    }
}

fn panel_block(kind: FragmentKind, slot: &Slot) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            panel_title(kind),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(slot_color(slot)))
}

/// Status lines shown above a slot's content (error placeholder, notice)
fn status_lines(slot: &Slot) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if let Some(error) = &slot.error {
        lines.push(Line::from(Span::styled(
            format!("⚠ {error}"),
            Style::default().fg(ERROR),
        )));
    }
    if let Some(notice) = &slot.notice {
        lines.push(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(WARN),
        )));
    }
    lines
}

fn is_shown(app: &Dashboard, kind: FragmentKind) -> bool {
    app.scheduler().schedule().fragments.contains(kind)
}

fn placeholder(app: &Dashboard, kind: FragmentKind, slot: &Slot) -> Option<&'static str> {
    if !is_shown(app, kind) {
        Some("not shown in this dashboard")
    } else if slot.content.is_none() && slot.error.is_none() {
        Some("loading…")
    } else {
        None
    }
}

/// Render a slot whose interactive elements are listed as rows
pub fn render_fragment_panel(
    f: &mut Frame,
    area: Rect,
    app: &Dashboard,
    kind: FragmentKind,
) -> Vec<HitRegion> {
    let slot = app.document().slot(kind);
    let block = panel_block(kind, slot);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = status_lines(slot);
    if let Some(text) = placeholder(app, kind, slot) {
        lines.push(Line::from(Span::styled(text, Style::default().fg(MUTED))));
    }
    let header_rows = lines.len() as u16;

    let mut regions = Vec::new();
    if let Some(content) = slot.content.as_ref().filter(|_| is_shown(app, kind)) {
        let width = inner.width as usize;
        let available = inner.height.saturating_sub(header_rows) as usize;
        let rows = element_rows(content);
        let hidden = rows.len().saturating_sub(available);
        let shown = if hidden > 0 {
            available.saturating_sub(1)
        } else {
            rows.len()
        };

        for (offset, (idx, element)) in rows.into_iter().take(shown).enumerate() {
            let style = if element.is_highlighted() {
                Style::default()
                    .fg(TEXT)
                    .bg(HIGHLIGHT_BG)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(TEXT)
            };
            lines.push(Line::from(Span::styled(
                truncate_to_width(&row_label(element), width),
                style,
            )));
            regions.push(HitRegion {
                area: Rect::new(inner.x, inner.y + header_rows + offset as u16, inner.width, 1),
                target: HitTarget { kind, element: idx },
            });
        }
        if hidden > 0 && available > 0 {
            lines.push(Line::from(Span::styled(
                format!("… {} more", rows_remaining(content, shown)),
                Style::default().fg(MUTED),
            )));
        }
        if content.interactive().next().is_none() && content.text_items.is_empty() {
            lines.push(Line::from(Span::styled("(empty)", Style::default().fg(MUTED))));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
    regions
}

fn rows_remaining(content: &Subtree, shown: usize) -> usize {
    content.interactive().count().saturating_sub(shown)
}

/// Interactive elements with their element indices
fn element_rows(content: &Subtree) -> Vec<(usize, &Element)> {
    content
        .elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_interactive())
        .collect()
}

/// One-line label: tooltip lines joined, else the element's own text
pub fn row_label(element: &Element) -> String {
    let lines = element.tooltip_lines();
    if lines.is_empty() {
        element.text.clone()
    } else {
        lines.join(" · ")
    }
}

/// Cut `s` to at most `width` terminal columns, marking the cut with '…'
pub fn truncate_to_width(s: &str, width: usize) -> String {
    let total: usize = s.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// Stats grid split out of the fragment's text items
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Trailing text after the grid (the points total)
    pub footer: Option<String>,
}

impl StatsTable {
    pub fn from_subtree(content: &Subtree) -> Self {
        let items = &content.text_items;
        if items.len() < STATS_COLUMNS {
            return Self {
                footer: (!items.is_empty()).then(|| items.join(" ")),
                ..Default::default()
            };
        }
        let header = items[..STATS_COLUMNS].to_vec();
        let mut rows = Vec::new();
        let mut footer = None;
        for chunk in items[STATS_COLUMNS..].chunks(STATS_COLUMNS) {
            if chunk.len() == STATS_COLUMNS {
                rows.push(chunk.to_vec());
            } else {
                footer = Some(chunk.join(" "));
            }
        }
        Self {
            header,
            rows,
            footer,
        }
    }
}

/// Render the stats slot as a table
pub fn render_stats_panel(f: &mut Frame, area: Rect, app: &Dashboard) {
    let kind = FragmentKind::Stats;
    let slot = app.document().slot(kind);
    let mut block = panel_block(kind, slot);

    let table = slot
        .content
        .as_ref()
        .filter(|_| is_shown(app, kind))
        .map(StatsTable::from_subtree);
    if let Some(footer) = table.as_ref().and_then(|t| t.footer.clone()) {
        block = block.title_bottom(Line::from(Span::styled(
            format!(" {footer} "),
            Style::default().fg(TEXT),
        )));
    }
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = status_lines(slot);
    if let Some(text) = placeholder(app, kind, slot) {
        lines.push(Line::from(Span::styled(text, Style::default().fg(MUTED))));
    }
    let status_height = (lines.len() as u16).min(inner.height);
    f.render_widget(
        Paragraph::new(lines),
        Rect::new(inner.x, inner.y, inner.width, status_height),
    );

    let Some(table) = table else {
        return;
    };
    if table.header.is_empty() {
        return;
    }
    let table_area = Rect::new(
        inner.x,
        inner.y + status_height,
        inner.width,
        inner.height - status_height,
    );
    let widths = [Constraint::Ratio(1, STATS_COLUMNS as u32); STATS_COLUMNS];
    let header = Row::new(table.header.clone())
        .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    let rows = table
        .rows
        .iter()
        .map(|r| Row::new(r.clone()).style(Style::default().fg(TEXT)));
    f.render_widget(Table::new(rows, widths).header(header), table_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_markup;

    #[test]
    fn test_stats_table_split() {
        let content = parse_markup(
            "<span class='stats-container'><span>Category</span><span>Actual</span>\
             <span>Ideal</span><span>Comp.</span><span>Pred.</span><span>Ratio</span>\
             <span>work</span><span>6.000</span><span>8.000</span><span>7</span>\
             <span>6</span><span>0.750</span>12.000 points</span>",
        );
        let table = StatsTable::from_subtree(&content);
        assert_eq!(table.header[0], "Category");
        assert_eq!(table.header[5], "Ratio");
        assert_eq!(table.rows, vec![vec!["work", "6.000", "8.000", "7", "6", "0.750"]]);
        assert_eq!(table.footer.as_deref(), Some("12.000 points"));
    }

    #[test]
    fn test_stats_table_short_content() {
        let table = StatsTable::from_subtree(&parse_markup("<span>0.000 points</span>"));
        assert!(table.header.is_empty());
        assert_eq!(table.footer.as_deref(), Some("0.000 points"));
        assert_eq!(StatsTable::from_subtree(&Subtree::default()), StatsTable::default());
    }

    #[test]
    fn test_row_label() {
        let content = parse_markup(
            "<g class='hover-element' data-tooltip='2024-01-01<br>3.250 points'><text>3</text></g>\
             <rect class='hover-element'>bare</rect>",
        );
        let rows: Vec<&Element> = content.interactive().collect();
        assert_eq!(row_label(rows[0]), "2024-01-01 · 3.250 points");
        assert_eq!(row_label(rows[1]), "bare");
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("work (60%)", 20), "work (60%)");
        assert_eq!(truncate_to_width("work (60%)", 5), "work…");
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }
}
