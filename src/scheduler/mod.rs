// Refresh scheduler
//
// Owns the active window, the single recurring timer and the document the
// fragments are mounted into. Everything runs on one event loop: fetches and
// timer ticks come back as SchedulerEvents over a channel and are applied by
// handle_event(), so no state here is ever shared across threads.
//
// Ordering rules:
// - apply_window() cancels the running timer before anything else, then
//   bumps the window generation and dispatches the new fetches.
// - Every fetch carries a RefreshTicket; results from an older generation,
//   or older than what a slot already shows, are dropped on arrival.
// - Ticks carry the generation of the timer that sent them and are ignored
//   once that timer has been replaced.

#[cfg(test)]
pub(crate) mod testing;

use crate::dom::{Document, HoverController};
use crate::net::{
    FetchFailure, FragmentKind, FragmentRequest, FragmentSet, FragmentSource, Viewport,
};
use crate::window::{Clock, TimeWindow};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Messages delivered back to the scheduler on the event loop
#[derive(Debug)]
pub enum SchedulerEvent {
    /// A fragment fetch finished
    Loaded {
        ticket: RefreshTicket,
        kind: FragmentKind,
        result: Result<String, FetchFailure>,
    },
    /// The recurring timer fired
    Tick { generation: u64 },
}

/// Identifies the refresh a fetch was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    /// Window generation at dispatch
    pub generation: u64,
    /// Refresh sequence number, increasing across all refreshes
    pub seq: u64,
    /// Window snapshot the request was built from
    pub window: TimeWindow,
}

/// What to refresh and how often
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    /// Tick cadence while the window is live
    pub cadence: Duration,
    /// Fragments fetched on every refresh
    pub fragments: FragmentSet,
}

/// Internal invariant violations; these indicate a logic bug
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerFault {
    #[error("refresh timer started while timer of generation {previous} was still active")]
    DuplicateTimer { previous: u64 },
}

/// Mounted markup lacked the interactive elements its fragment should carry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: markup has no hover-element entries")]
pub struct RenderMismatch {
    pub kind: FragmentKind,
}

/// Counters for the status bar and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    pub refreshes: u64,
    pub timers_started: u64,
    pub timers_cancelled: u64,
    pub mounted: u64,
    pub failed: u64,
    pub discarded: u64,
}

#[derive(Debug)]
struct TimerHandle {
    generation: u64,
    abort: AbortHandle,
}

pub struct RefreshScheduler {
    source: Arc<dyn FragmentSource>,
    clock: Arc<dyn Clock>,
    events: UnboundedSender<SchedulerEvent>,
    hover: HoverController,
    document: Document,
    active_window: TimeWindow,
    timer: Option<TimerHandle>,
    schedule: RefreshSchedule,
    viewport: Viewport,
    generation: u64,
    seq: u64,
    stats: SchedulerStats,
    fault: Option<SchedulerFault>,
}

impl RefreshScheduler {
    /// Create an idle scheduler; nothing is fetched until apply_window()
    pub fn new(
        source: Arc<dyn FragmentSource>,
        clock: Arc<dyn Clock>,
        events: UnboundedSender<SchedulerEvent>,
        schedule: RefreshSchedule,
        hover: HoverController,
        viewport: Viewport,
    ) -> Self {
        let active_window = TimeWindow::today(&clock.now());
        Self {
            source,
            clock,
            events,
            hover,
            document: Document::new(),
            active_window,
            timer: None,
            schedule,
            viewport,
            generation: 0,
            seq: 0,
            stats: SchedulerStats::default(),
            fault: None,
        }
    }

    /// Commit `window`, refresh once, and schedule ticks if it is live
    pub fn apply_window(&mut self, window: TimeWindow) {
        self.cancel_timer();
        self.generation += 1;
        self.active_window = window;
        info!(
            generation = self.generation,
            start = window.start,
            end = window.end,
            mode = ?window.mode,
            "window applied"
        );

        self.refresh_now();
        if window.is_live() {
            self.start_timer();
        }
    }

    /// Fetch every visible fragment for the current window
    pub fn refresh_now(&mut self) {
        self.seq += 1;
        self.stats.refreshes += 1;
        let ticket = RefreshTicket {
            generation: self.generation,
            seq: self.seq,
            window: self.active_window,
        };
        debug!(
            generation = ticket.generation,
            seq = ticket.seq,
            fragments = %self.schedule.fragments,
            "dispatching refresh"
        );

        for kind in self.schedule.fragments.iter() {
            let request = FragmentRequest::new(kind, ticket.window, self.viewport);
            let source = Arc::clone(&self.source);
            let events = self.events.clone();
            tokio::spawn(async move {
                let result = source.fetch(&request).await;
                // Receiver gone means the dashboard is shutting down
                let _ = events.send(SchedulerEvent::Loaded {
                    ticket,
                    kind,
                    result,
                });
            });
        }
    }

    /// Cancel the recurring timer; in-flight fetches are left to finish
    pub fn stop(&mut self) {
        self.cancel_timer();
    }

    /// Apply one event from the channel
    pub fn handle_event(&mut self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::Tick { generation } => self.on_tick(generation),
            SchedulerEvent::Loaded {
                ticket,
                kind,
                result,
            } => self.on_loaded(ticket, kind, result),
        }
    }

    /// Change the visible fragment set and restart the schedule
    pub fn set_visible_fragments(&mut self, fragments: FragmentSet) {
        if fragments.is_empty() {
            warn!("ignoring empty fragment set");
            return;
        }
        self.schedule.fragments = fragments;
        let mut window = self.active_window;
        window.advance_to_now(&self.clock.now());
        self.apply_window(window);
    }

    /// Change the tick cadence and restart the schedule
    pub fn set_cadence(&mut self, cadence: Duration) {
        self.schedule.cadence = cadence;
        if self.timer.is_some() {
            self.apply_window(self.active_window);
        }
    }

    /// Sizing hint used from the next dispatch on
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            debug!(?viewport, "viewport changed");
        }
        self.viewport = viewport;
    }

    pub fn active_window(&self) -> &TimeWindow {
        &self.active_window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn hover(&self) -> &HoverController {
        &self.hover
    }

    pub fn schedule(&self) -> RefreshSchedule {
        self.schedule
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn fault(&self) -> Option<&SchedulerFault> {
        self.fault.as_ref()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn has_active_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Timers started and not yet cancelled
    pub fn live_timers(&self) -> u64 {
        self.stats.timers_started - self.stats.timers_cancelled
    }

    fn on_tick(&mut self, generation: u64) {
        let current = self.timer.as_ref().map(|t| t.generation);
        if current != Some(generation) {
            debug!(generation, ?current, "ignoring tick from replaced timer");
            return;
        }
        self.active_window.advance_to_now(&self.clock.now());
        self.refresh_now();
    }

    fn on_loaded(
        &mut self,
        ticket: RefreshTicket,
        kind: FragmentKind,
        result: Result<String, FetchFailure>,
    ) {
        if ticket.generation != self.generation {
            self.stats.discarded += 1;
            debug!(
                %kind,
                generation = ticket.generation,
                current = self.generation,
                "discarding fragment from superseded window"
            );
            return;
        }
        if ticket.seq < self.document.slot(kind).mounted_seq {
            self.stats.discarded += 1;
            debug!(%kind, seq = ticket.seq, "discarding out-of-order fragment");
            return;
        }

        match result {
            Ok(markup) => {
                // The hovered element is about to be discarded with its subtree
                if self.document.tooltip.owner == Some(kind) {
                    self.document.tooltip.hide();
                }
                let subtree = self.document.mount(kind, markup, ticket.seq);
                let bound = self.hover.bind(subtree);
                let has_markers = subtree.has_hover_markers();
                self.stats.mounted += 1;
                debug!(%kind, seq = ticket.seq, listeners = bound, "fragment mounted");

                if kind.expects_hover_markers() && !has_markers {
                    let mismatch = RenderMismatch { kind };
                    warn!(%kind, "{mismatch}");
                    self.document.slot_mut(kind).notice = Some(mismatch.to_string());
                }
            }
            Err(e) => {
                self.stats.failed += 1;
                warn!(%kind, error = %e, "fragment fetch failed");
                self.document.fail(kind, e.to_string());
            }
        }
    }

    fn start_timer(&mut self) {
        if let Some(existing) = self.timer.take() {
            let fault = SchedulerFault::DuplicateTimer {
                previous: existing.generation,
            };
            error!(error = %fault, "scheduler invariant violated");
            self.fault = Some(fault);
            self.abort_timer(existing);
        }

        let generation = self.generation;
        let cadence = self.schedule.cadence;
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + cadence, cadence);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(SchedulerEvent::Tick { generation }).is_err() {
                    break;
                }
            }
        });

        self.timer = Some(TimerHandle {
            generation,
            abort: task.abort_handle(),
        });
        self.stats.timers_started += 1;
        debug!(generation, cadence_ms = cadence.as_millis() as u64, "refresh timer started");
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.abort_timer(timer);
        }
    }

    fn abort_timer(&mut self, timer: TimerHandle) {
        timer.abort.abort();
        self.stats.timers_cancelled += 1;
        debug!(generation = timer.generation, "refresh timer cancelled");
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort.abort();
        }
    }
}
