// UI rendering module
//
// The main draw() function lays out the header, the fragment panels and the
// status bar, records the interactive rows for mouse hit-testing and draws
// the tooltip popup last so it sits above every panel.

mod header;
mod panels;
mod status_bar;
mod tooltip;

use crate::app::Dashboard;
use crate::net::FragmentKind;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use header::render_header;
use panels::{render_fragment_panel, render_stats_panel};
use status_bar::render_status_bar;
use tooltip::render_tooltip;

/// Main UI drawing function
pub fn draw(f: &mut Frame, app: &mut Dashboard) {
    let size = f.area();
    let fragments = app.scheduler().schedule().fragments;

    let timeline_rows = app.document().interactive_count(FragmentKind::Timeline) as u16;
    let timeline_height = if fragments.contains(FragmentKind::Timeline) {
        (timeline_rows + 3).clamp(4, 9)
    } else {
        0
    };
    let stats_height = if fragments.contains(FragmentKind::Stats) {
        9
    } else {
        0
    };

    // Main layout: header, timeline, body, stats, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),               // Header
            Constraint::Length(timeline_height), // Timeline
            Constraint::Min(5),                  // Flow + band
            Constraint::Length(stats_height),    // Stats
            Constraint::Length(3),               // Status bar
        ])
        .split(size);

    let mut regions = Vec::new();

    render_header(f, chunks[0], app);

    if timeline_height > 0 {
        regions.extend(render_fragment_panel(f, chunks[1], app, FragmentKind::Timeline));
    }

    // Body: flow chart beside the band chart when both are shown
    if fragments.contains(FragmentKind::Band) {
        let body_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[2]);
        regions.extend(render_fragment_panel(f, body_chunks[0], app, FragmentKind::Flow));
        regions.extend(render_fragment_panel(f, body_chunks[1], app, FragmentKind::Band));
    } else {
        regions.extend(render_fragment_panel(f, chunks[2], app, FragmentKind::Flow));
    }

    if stats_height > 0 {
        render_stats_panel(f, chunks[3], app);
    }

    render_status_bar(f, chunks[4], app);

    app.hit_regions = regions;
    render_tooltip(f, app);
}
