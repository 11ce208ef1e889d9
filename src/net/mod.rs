// Fragment client module
//
// The only network boundary: read-only GET requests against the backend's
// four fragment endpoints. Responses are returned as raw markup; retry
// policy is left to the scheduler (the next tick is the retry).

use crate::window::TimeWindow;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Visualization fragments served by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FragmentKind {
    Timeline,
    Flow,
    Stats,
    Band,
}

impl FragmentKind {
    pub const ALL: [FragmentKind; 4] = [
        FragmentKind::Timeline,
        FragmentKind::Flow,
        FragmentKind::Stats,
        FragmentKind::Band,
    ];

    /// Endpoint path on the backend
    pub fn path(self) -> &'static str {
        match self {
            FragmentKind::Timeline => "/timeline",
            FragmentKind::Flow => "/sankey",
            FragmentKind::Stats => "/stats",
            FragmentKind::Band => "/band",
        }
    }

    /// DOM id of the element this fragment is mounted into
    pub fn mount_point(self) -> &'static str {
        match self {
            FragmentKind::Timeline => "timeline",
            FragmentKind::Flow => "app",
            FragmentKind::Stats => "stats",
            FragmentKind::Band => "band",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FragmentKind::Timeline => "timeline",
            FragmentKind::Flow => "flow",
            FragmentKind::Stats => "stats",
            FragmentKind::Band => "band",
        }
    }

    /// Whether the backend tags this fragment's elements with hover markers
    pub fn expects_hover_markers(self) -> bool {
        !matches!(self, FragmentKind::Stats)
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FragmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timeline" => Ok(FragmentKind::Timeline),
            "flow" | "sankey" | "app" => Ok(FragmentKind::Flow),
            "stats" => Ok(FragmentKind::Stats),
            "band" => Ok(FragmentKind::Band),
            other => Err(format!("unknown fragment: {other}")),
        }
    }
}

/// Subset of fragment kinds shown by a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FragmentSet(u8);

impl FragmentSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Self::from_kinds(&FragmentKind::ALL)
    }

    pub fn from_kinds(kinds: &[FragmentKind]) -> Self {
        Self(kinds.iter().fold(0, |acc, k| acc | k.bit()))
    }

    pub fn contains(self, kind: FragmentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: FragmentKind) {
        self.0 |= kind.bit();
    }

    pub fn toggle(&mut self, kind: FragmentKind) {
        self.0 ^= kind.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[cfg(test)]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in a stable order
    pub fn iter(self) -> impl Iterator<Item = FragmentKind> {
        FragmentKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl fmt::Display for FragmentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(FragmentKind::name).collect();
        f.write_str(&names.join("+"))
    }
}

/// Sizing hint forwarded to the backend, in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// One fragment fetch, fully parameterized at dispatch time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRequest {
    pub kind: FragmentKind,
    pub window: TimeWindow,
    pub viewport: Viewport,
}

impl FragmentRequest {
    pub fn new(kind: FragmentKind, window: TimeWindow, viewport: Viewport) -> Self {
        Self {
            kind,
            window,
            viewport,
        }
    }

    /// Query parameters in the order the backend documents them
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self.kind {
            FragmentKind::Timeline => size_query(self.viewport),
            FragmentKind::Stats => window_query(&self.window),
            FragmentKind::Flow | FragmentKind::Band => {
                let mut pairs = window_query(&self.window);
                pairs.extend(size_query(self.viewport));
                pairs
            }
        }
    }

    /// Absolute request URL against `base`
    pub fn url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut url = base.join(self.kind.path().trim_start_matches('/'))?;
        url.query_pairs_mut().clear().extend_pairs(self.query_pairs());
        Ok(url)
    }
}

fn window_query(window: &TimeWindow) -> Vec<(&'static str, String)> {
    vec![
        ("start_time", window.start.to_string()),
        ("end_time", window.end.to_string()),
    ]
}

fn size_query(viewport: Viewport) -> Vec<(&'static str, String)> {
    vec![
        ("width", viewport.width.to_string()),
        ("height", viewport.height.to_string()),
    ]
}

/// A fragment fetch that did not produce markup
#[derive(Debug, thiserror::Error)]
pub enum FetchFailure {
    /// Request rejected before a response arrived (offline, DNS, timeout)
    #[error("{kind}: network failure: {source}")]
    Network {
        kind: FragmentKind,
        #[source]
        source: reqwest::Error,
    },

    /// Backend answered with a non-success status
    #[error("{kind}: backend responded {status}")]
    BadResponse { kind: FragmentKind, status: StatusCode },

    /// Response body could not be read as text
    #[error("{kind}: unreadable body: {source}")]
    Body {
        kind: FragmentKind,
        #[source]
        source: reqwest::Error,
    },

    /// Request URL could not be built from the configured base
    #[error("{kind}: invalid request url: {source}")]
    Url {
        kind: FragmentKind,
        #[source]
        source: url::ParseError,
    },
}

/// Anything that can turn a fragment request into markup
#[async_trait]
pub trait FragmentSource: Send + Sync + 'static {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchFailure>;
}

/// HTTP client for the fragment endpoints
#[derive(Debug, Clone)]
pub struct FragmentClient {
    http: reqwest::Client,
    base: Url,
}

impl FragmentClient {
    pub fn new(base: Url, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET the fragment described by `request` and return its markup
    ///
    /// Timeline requests ignore the window and stats requests ignore the
    /// viewport; see [`FragmentRequest::query_pairs`].
    async fn get(&self, request: &FragmentRequest) -> Result<String, FetchFailure> {
        let kind = request.kind;
        let url = request
            .url(&self.base)
            .map_err(|source| FetchFailure::Url { kind, source })?;
        debug!(%kind, %url, "fetching fragment");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FetchFailure::Network { kind, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::BadResponse { kind, status });
        }

        response
            .text()
            .await
            .map_err(|source| FetchFailure::Body { kind, source })
    }
}

#[async_trait]
impl FragmentSource for FragmentClient {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchFailure> {
        self.get(request).await
    }
}
