// Test doubles shared by the scheduler and dashboard tests

use super::{RefreshSchedule, RefreshScheduler, SchedulerEvent};
use crate::dom::HoverController;
use crate::net::{
    FetchFailure, FragmentKind, FragmentRequest, FragmentSet, FragmentSource, Viewport,
};
use crate::window::ManualClock;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use url::Url;

pub const TEST_BASE: &str = "http://backend.test/";

/// Canned markup shaped like the backend's responses
pub fn markup_for(kind: FragmentKind) -> &'static str {
    match kind {
        FragmentKind::Timeline => {
            "<svg id=timeline width='100%' height='80'>\
             <g class='hover-element' data-tooltip='2024-01-01<br>3.250 points' onclick='changegraph(1704067200);'>\
             <rect x='0' y='0' width='5' height='2' /><text>3</text></g>\
             <g class='hover-element' data-tooltip='2024-01-02<br>1.000 points' onclick='changegraph(1704153600);'>\
             <rect x='5' y='0' width='5' height='2' /><text>1</text></g></svg>"
        }
        FragmentKind::Flow => {
            "<svg width='100%' height='100%'>\
             <rect class='hover-element' data-tooltip='work (60.000%)' x='0' y='0' />\
             <rect class='hover-element' data-tooltip='play (40.000%)' x='0' y='6' /></svg>"
        }
        FragmentKind::Stats => {
            "<span class='stats-container'><span>Category</span><span>Actual</span>\
             <span>Ideal</span><span>Comp.</span><span>Pred.</span><span>Ratio</span>\
             <span>work</span><span>6.000</span><span>8.000</span><span>7.000</span>\
             <span>6.500</span><span>0.750</span>12.000 points</span>"
        }
        FragmentKind::Band => {
            "<svg><rect class='hover-element' data-tooltip='code<br>1:00:00' x='0' y='0' /></svg>"
        }
    }
}

/// Records every request and answers with canned markup or a failure
#[derive(Default)]
pub struct RecordingSource {
    requests: Mutex<Vec<FragmentRequest>>,
    failing: Mutex<FragmentSet>,
    overrides: Mutex<BTreeMap<FragmentKind, String>>,
}

impl RecordingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(kinds: FragmentSet) -> Self {
        let source = Self::default();
        source.set_failing(kinds);
        source
    }

    pub fn set_failing(&self, kinds: FragmentSet) {
        *self.failing.lock().unwrap() = kinds;
    }

    pub fn set_markup(&self, kind: FragmentKind, markup: &str) {
        self.overrides
            .lock()
            .unwrap()
            .insert(kind, markup.to_string());
    }

    pub fn requests(&self) -> Vec<FragmentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<FragmentKind> {
        self.requests().iter().map(|r| r.kind).collect()
    }

    pub fn urls(&self) -> Vec<String> {
        let base = Url::parse(TEST_BASE).unwrap();
        self.requests()
            .iter()
            .map(|r| r.url(&base).unwrap().to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl FragmentSource for RecordingSource {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchFailure> {
        self.requests.lock().unwrap().push(request.clone());
        let kind = request.kind;
        if self.failing.lock().unwrap().contains(kind) {
            return Err(FetchFailure::BadResponse {
                kind,
                status: StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        let markup = self
            .overrides
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| markup_for(kind).to_string());
        Ok(markup)
    }
}

pub struct Harness {
    pub scheduler: RefreshScheduler,
    pub events: UnboundedReceiver<SchedulerEvent>,
    pub source: Arc<RecordingSource>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(
    fragments: FragmentSet,
    cadence: Duration,
    source: RecordingSource,
    now_secs: i64,
) -> Harness {
    let (tx, rx) = mpsc::unbounded_channel();
    let source = Arc::new(source);
    let clock = Arc::new(ManualClock::new(now_secs));
    let scheduler = RefreshScheduler::new(
        source.clone(),
        clock.clone(),
        tx,
        RefreshSchedule { cadence, fragments },
        HoverController::default(),
        Viewport::new(1280, 720),
    );
    Harness {
        scheduler,
        events: rx,
        source,
        clock,
    }
}

/// Handle events until `loaded` fragment results have been applied
pub async fn pump(
    scheduler: &mut RefreshScheduler,
    events: &mut UnboundedReceiver<SchedulerEvent>,
    loaded: usize,
) {
    let mut seen = 0;
    while seen < loaded {
        let event = events.recv().await.unwrap();
        if matches!(event, SchedulerEvent::Loaded { .. }) {
            seen += 1;
        }
        scheduler.handle_event(event);
    }
}

/// Apply fragment results until the next tick arrives, and return it
pub async fn next_tick(
    scheduler: &mut RefreshScheduler,
    events: &mut UnboundedReceiver<SchedulerEvent>,
) -> SchedulerEvent {
    loop {
        let event = events.recv().await.unwrap();
        if matches!(event, SchedulerEvent::Tick { .. }) {
            return event;
        }
        scheduler.handle_event(event);
    }
}
