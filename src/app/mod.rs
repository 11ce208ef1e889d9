// Dashboard controller
//
// Wires the period selector, day navigation and pointer input to the time
// window and the refresh scheduler. All window changes go through
// RefreshScheduler::apply_window().

pub mod config;
pub mod event;

pub use config::{DashboardConfig, JumpBehavior};

use crate::dom::hover::Side;
use crate::dom::{Document, Element, PointerEvent};
use crate::net::{FragmentKind, Viewport};
use crate::scheduler::{RefreshScheduler, SchedulerEvent};
use crate::window::{Mode, Preset, TimeWindow, DAY_SECS};
use config::{FALLBACK_CELL_HEIGHT_PX, FALLBACK_CELL_WIDTH_PX};
use ratatui::layout::{Position, Rect};
use tracing::{info, warn};

/// Terminal size in cells, plus its pixel size when the terminal reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    pub cols: u16,
    pub rows: u16,
    pub pixels: Option<(u32, u32)>,
}

impl Screen {
    pub fn new(cols: u16, rows: u16, pixels: Option<(u32, u32)>) -> Self {
        Self { cols, rows, pixels }
    }

    /// Query the terminal; cell size falls back to a fixed estimate
    pub fn detect(cols: u16, rows: u16) -> Self {
        let pixels = crossterm::terminal::window_size()
            .ok()
            .filter(|size| size.width > 0 && size.height > 0)
            .map(|size| (size.width as u32, size.height as u32));
        Self::new(cols, rows, pixels)
    }

    /// Pixel size of one cell
    pub fn cell_px(&self) -> (u32, u32) {
        match self.pixels {
            Some((w, h)) if self.cols > 0 && self.rows > 0 => (
                (w / self.cols as u32).max(1),
                (h / self.rows as u32).max(1),
            ),
            _ => (FALLBACK_CELL_WIDTH_PX, FALLBACK_CELL_HEIGHT_PX),
        }
    }

    /// Sizing hint for fragment requests
    pub fn viewport(&self) -> Viewport {
        let (cw, ch) = self.cell_px();
        let (w, h) = self
            .pixels
            .unwrap_or((self.cols as u32 * cw, self.rows as u32 * ch));
        Viewport::new(w.max(1), h.max(1))
    }

    /// Pixel position of the middle of a cell
    pub fn to_px(&self, col: u16, row: u16) -> (i32, i32) {
        let (cw, ch) = self.cell_px();
        (
            (col as u32 * cw + cw / 2) as i32,
            (row as u32 * ch + ch / 2) as i32,
        )
    }

    /// Cell containing a pixel position
    pub fn to_cell(&self, x: i32, y: i32) -> (u16, u16) {
        let (cw, ch) = self.cell_px();
        let col = (x.max(0) as u32 / cw).min(u16::MAX as u32) as u16;
        let row = (y.max(0) as u32 / ch).min(u16::MAX as u32) as u16;
        (col, row)
    }
}

/// An interactive element of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTarget {
    pub kind: FragmentKind,
    /// Index into the slot's element list
    pub element: usize,
}

/// Screen area an interactive element was drawn into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitRegion {
    pub area: Rect,
    pub target: HitTarget,
}

/// Tooltip anchor in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooltipAnchor {
    pub col: u16,
    pub row: u16,
    pub side: Side,
}

/// Main controller state
pub struct Dashboard {
    /// Whether the application is running
    pub running: bool,

    pub config: DashboardConfig,

    scheduler: RefreshScheduler,

    /// Last selected period preset
    preset: Preset,

    screen: Screen,

    /// Interactive rows recorded during the last draw
    pub hit_regions: Vec<HitRegion>,

    /// Element currently under the pointer
    hovered: Option<HitTarget>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig, mut scheduler: RefreshScheduler, screen: Screen) -> Self {
        scheduler.set_viewport(config.viewport.unwrap_or_else(|| screen.viewport()));
        Self {
            running: true,
            config,
            scheduler,
            preset: Preset::Today,
            screen,
            hit_regions: Vec::new(),
            hovered: None,
        }
    }

    /// Apply the configured period (normally "today") and start refreshing
    pub fn start(&mut self) {
        info!(
            base_url = %self.config.base_url,
            variant = ?self.config.variant,
            fragments = %self.config.fragments,
            cadence_ms = self.config.cadence.as_millis() as u64,
            period = %self.config.period,
            "dashboard starting"
        );
        let period = self.config.period.clone();
        if !self.select_period(&period) {
            self.select_preset(Preset::Today);
        }
    }

    /// Period selector change; unknown values leave the window alone
    pub fn select_period(&mut self, value: &str) -> bool {
        match value.parse::<Preset>() {
            Ok(preset) => {
                self.select_preset(preset);
                true
            }
            Err(e) => {
                warn!(error = %e, "ignoring period selection");
                false
            }
        }
    }

    pub fn select_preset(&mut self, preset: Preset) {
        self.preset = preset;
        let window = self
            .window()
            .with_preset(preset, &self.scheduler.clock().now());
        self.scheduler.apply_window(window);
    }

    /// Show the day with epoch-day index `day`
    pub fn jump_to_day(&mut self, day: i64) {
        let window = self.window().at_epoch_day(day, self.jump_mode());
        info!(day, "jumping to day");
        self.scheduler.apply_window(window);
    }

    /// Show the day starting at `day_start` (a timeline column's target)
    pub fn jump_to_timestamp(&mut self, day_start: i64) {
        let window = self.window().pinned_at(day_start, self.jump_mode());
        info!(day_start, "jumping to timeline day");
        self.scheduler.apply_window(window);
    }

    pub fn previous_day(&mut self) {
        self.jump_to_day(self.window().end_day() - 1);
    }

    /// Step forward one day; stepping past the present returns to live
    pub fn next_day(&mut self) {
        let day = self.window().end_day() + 1;
        if day * DAY_SECS > self.scheduler.clock().now_secs() {
            self.resume_live();
        } else {
            self.jump_to_day(day);
        }
    }

    /// Return to a live window for the last selected preset
    pub fn resume_live(&mut self) {
        self.select_preset(self.preset);
    }

    /// Show or hide one panel; hiding the last visible panel is refused
    pub fn toggle_fragment(&mut self, kind: FragmentKind) {
        let mut fragments = self.scheduler.schedule().fragments;
        fragments.toggle(kind);
        self.scheduler.set_visible_fragments(fragments);
        self.config.fragments = self.scheduler.schedule().fragments;

        if self.config.fragments.contains(kind) {
            return;
        }
        if let Some(hovered) = self.hovered.filter(|h| h.kind == kind) {
            let hover = *self.scheduler.hover();
            let width = self.screen.viewport().width as i32;
            let doc = self.scheduler.document_mut();
            hover.dispatch(doc, kind, hovered.element, PointerEvent::Leave, width);
            self.hovered = None;
        }
        self.hit_regions.retain(|r| r.target.kind != kind);
    }

    pub fn refresh_now(&mut self) {
        self.scheduler.refresh_now();
    }

    /// Shorten the refresh cadence by one step
    pub fn faster_cadence(&mut self) {
        let cadence = self.config.faster_cadence();
        self.scheduler.set_cadence(cadence);
    }

    /// Lengthen the refresh cadence by one step
    pub fn slower_cadence(&mut self) {
        let cadence = self.config.slower_cadence();
        self.scheduler.set_cadence(cadence);
    }

    pub fn handle_scheduler_event(&mut self, event: SchedulerEvent) {
        self.scheduler.handle_event(event);
        // A remount of the hovered slot discards the element under the pointer
        if let Some(hovered) = self.hovered {
            if self.scheduler.document().tooltip.owner != Some(hovered.kind) {
                self.hovered = None;
            }
        }
    }

    /// Pointer moved to a cell: leave/enter on target change, then move
    pub fn pointer_moved(&mut self, col: u16, row: u16) {
        let target = self.hit_test(col, row);
        let hover = *self.scheduler.hover();
        let width = self.screen.viewport().width as i32;
        let doc = self.scheduler.document_mut();

        if target != self.hovered {
            if let Some(old) = self.hovered.take() {
                hover.dispatch(doc, old.kind, old.element, PointerEvent::Leave, width);
            }
            if let Some(new) = target {
                if hover.dispatch(doc, new.kind, new.element, PointerEvent::Enter, width) > 0 {
                    self.hovered = Some(new);
                }
            }
        }

        if let Some(current) = self.hovered {
            let (x, y) = self.screen.to_px(col, row);
            hover.dispatch(doc, current.kind, current.element, PointerEvent::Move { x, y }, width);
        }
    }

    /// Mouse click; timeline columns jump to their day
    pub fn clicked(&mut self, col: u16, row: u16) {
        let Some(target) = self.hit_test(col, row) else {
            return;
        };
        if target.kind != FragmentKind::Timeline {
            return;
        }
        let day_start = self
            .document()
            .slot(FragmentKind::Timeline)
            .content
            .as_ref()
            .and_then(|c| c.element(target.element))
            .and_then(Element::jump_target);
        if let Some(day_start) = day_start {
            self.jump_to_timestamp(day_start);
        }
    }

    pub fn resize(&mut self, screen: Screen) {
        self.screen = screen;
        if self.config.viewport.is_none() && self.scheduler.viewport() != screen.viewport() {
            self.scheduler.set_viewport(screen.viewport());
        }
    }

    /// Stop refreshing and leave the event loop
    pub fn teardown(&mut self) {
        self.scheduler.stop();
        self.running = false;
        info!(stats = ?self.scheduler.stats(), "dashboard stopped");
    }

    pub fn hit_test(&self, col: u16, row: u16) -> Option<HitTarget> {
        let at = Position::new(col, row);
        self.hit_regions
            .iter()
            .find(|r| r.area.contains(at))
            .map(|r| r.target)
    }

    /// Where the tooltip should be drawn, if it is showing
    pub fn tooltip_anchor(&self) -> Option<TooltipAnchor> {
        let tooltip = &self.document().tooltip;
        if !tooltip.visible {
            return None;
        }
        let placement = tooltip.placement?;
        let (col, row) = self.screen.to_cell(placement.x, placement.y);
        Some(TooltipAnchor {
            col,
            row,
            side: placement.side,
        })
    }

    pub fn window(&self) -> TimeWindow {
        *self.scheduler.active_window()
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn document(&self) -> &Document {
        self.scheduler.document()
    }

    #[cfg(test)]
    pub fn hovered(&self) -> Option<HitTarget> {
        self.hovered
    }

    fn jump_mode(&self) -> Mode {
        match self.config.jump_behavior {
            JumpBehavior::Pin => Mode::Fixed,
            JumpBehavior::ResumeLive => Mode::Live,
        }
    }
}
