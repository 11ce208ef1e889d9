// Dashboard configuration
//
// This module contains:
// - Defaults and bounds for refresh cadence, timeouts and cell sizes
// - The deployment variant (single chart vs full dashboard)
// - Command line parsing into a validated DashboardConfig

use crate::net::{FragmentKind, FragmentSet, Viewport};
use crate::scheduler::RefreshSchedule;
use crate::window::{Preset, UnknownPreset};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Backend address used when none is given
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8723/";

/// Refresh cadence of the single-chart deployment
pub const SINGLE_CADENCE_MS: u64 = 1_000;

/// Refresh cadence of the full dashboard
pub const FULL_CADENCE_MS: u64 = 10_000;

/// Minimum refresh cadence in milliseconds
pub const MIN_CADENCE_MS: u64 = 500;

/// Maximum refresh cadence in milliseconds
pub const MAX_CADENCE_MS: u64 = 300_000;

/// Cadence adjustment step in milliseconds
pub const CADENCE_STEP_MS: u64 = 1_000;

/// Per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Duration to highlight a recently changed cadence
pub const CHANGE_HIGHLIGHT_DURATION: Duration = Duration::from_millis(500);

/// Cell size assumed when the terminal does not report its pixel size
pub const FALLBACK_CELL_WIDTH_PX: u32 = 8;
pub const FALLBACK_CELL_HEIGHT_PX: u32 = 16;

// ============================================================================
// Enums
// ============================================================================

/// Deployment variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Variant {
    /// Flow chart and timeline, refreshed every second
    Single,
    /// All four fragments, refreshed every ten seconds
    #[default]
    Full,
}

impl Variant {
    pub fn fragments(self) -> FragmentSet {
        match self {
            Variant::Single => {
                FragmentSet::from_kinds(&[FragmentKind::Timeline, FragmentKind::Flow])
            }
            Variant::Full => FragmentSet::all(),
        }
    }

    pub fn cadence(self) -> Duration {
        match self {
            Variant::Single => Duration::from_millis(SINGLE_CADENCE_MS),
            Variant::Full => Duration::from_millis(FULL_CADENCE_MS),
        }
    }
}

/// What a day jump does to the refresh timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum JumpBehavior {
    /// Pin the window to the chosen day and suspend refreshing
    #[default]
    Pin,
    /// Show the chosen day once; the next tick returns to the live window
    ResumeLive,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Invalid command line values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid backend url {url:?}: {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("backend url must be http or https, got {0:?}")]
    Scheme(String),

    #[error("cadence {0}ms outside {min}..={max}ms", min = MIN_CADENCE_MS, max = MAX_CADENCE_MS)]
    Cadence(u64),

    #[error("{0}")]
    UnknownFragment(String),

    #[error("fragment set is empty")]
    EmptyFragments,

    #[error("invalid viewport {0:?}, expected WIDTHxHEIGHT")]
    Viewport(String),

    #[error("request timeout must be at least one second")]
    Timeout,

    #[error(transparent)]
    Period(#[from] UnknownPreset),
}

/// Validated dashboard settings
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub base_url: Url,
    pub variant: Variant,
    pub cadence: Duration,
    pub fragments: FragmentSet,
    pub timeout: Duration,
    /// Fixed request sizing; otherwise derived from the terminal
    pub viewport: Option<Viewport>,
    pub jump_behavior: JumpBehavior,
    /// Period selector value applied at startup
    pub period: String,
    pub log_file: Option<PathBuf>,
    /// Timestamp of last cadence change (for visual feedback)
    pub last_change: Option<Instant>,
}

impl DashboardConfig {
    /// Defaults for `variant` against `base_url`
    pub fn new(base_url: Url, variant: Variant) -> Self {
        Self {
            base_url,
            variant,
            cadence: variant.cadence(),
            fragments: variant.fragments(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            viewport: None,
            jump_behavior: JumpBehavior::default(),
            period: Preset::Today.as_str().to_string(),
            log_file: None,
            last_change: None,
        }
    }

    pub fn schedule(&self) -> RefreshSchedule {
        RefreshSchedule {
            cadence: self.cadence,
            fragments: self.fragments,
        }
    }

    /// Shorter cadence by one step, clamped to the minimum
    pub fn faster_cadence(&mut self) -> Duration {
        let ms = (self.cadence.as_millis() as u64)
            .saturating_sub(CADENCE_STEP_MS)
            .max(MIN_CADENCE_MS);
        self.set_cadence(ms)
    }

    /// Longer cadence by one step, clamped to the maximum
    pub fn slower_cadence(&mut self) -> Duration {
        let ms = (self.cadence.as_millis() as u64)
            .saturating_add(CADENCE_STEP_MS)
            .min(MAX_CADENCE_MS);
        self.set_cadence(ms)
    }

    fn set_cadence(&mut self, ms: u64) -> Duration {
        self.cadence = Duration::from_millis(ms);
        self.last_change = Some(Instant::now());
        self.cadence
    }

    /// Whether the cadence changed within the highlight window
    pub fn recently_changed(&self) -> bool {
        self.highlight_remaining().is_some()
    }

    /// Time until the cadence highlight goes away, if it is showing
    pub fn highlight_remaining(&self) -> Option<Duration> {
        self.last_change
            .and_then(|t| CHANGE_HIGHLIGHT_DURATION.checked_sub(t.elapsed()))
            .filter(|left| !left.is_zero())
    }
}

/// Terminal dashboard for a traffic/flow visualization backend
#[derive(Debug, Parser)]
#[command(name = "flowdeck", version, about)]
pub struct Cli {
    /// Backend base URL serving /timeline, /sankey, /stats and /band
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Deployment variant
    #[arg(long, value_enum, default_value_t = Variant::Full)]
    pub variant: Variant,

    /// Refresh cadence override in milliseconds
    #[arg(long, value_name = "MS")]
    pub cadence_ms: Option<u64>,

    /// Fragment set override, e.g. `flow,stats`
    #[arg(long, value_delimiter = ',', value_name = "KIND")]
    pub fragments: Vec<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Pixel size sent to the backend, e.g. `1280x720`
    #[arg(long, value_name = "WxH")]
    pub viewport: Option<String>,

    /// What clicking a timeline day or stepping days does to live refresh
    #[arg(long, value_enum, default_value_t = JumpBehavior::Pin)]
    pub jump_behavior: JumpBehavior,

    /// Starting period: today, 1-hour, 6-hours, 12-hours, 24-hours,
    /// weekly, monthly or yearly
    #[arg(long, default_value = "today")]
    pub period: String,

    /// Write logs to this file (the terminal is busy with the dashboard)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn into_config(self) -> Result<DashboardConfig, ConfigError> {
        let mut config = DashboardConfig::new(parse_base_url(&self.base_url)?, self.variant);

        if let Some(ms) = self.cadence_ms {
            if !(MIN_CADENCE_MS..=MAX_CADENCE_MS).contains(&ms) {
                return Err(ConfigError::Cadence(ms));
            }
            config.cadence = Duration::from_millis(ms);
        }

        if !self.fragments.is_empty() {
            let mut fragments = FragmentSet::empty();
            for name in self.fragments.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
                let kind: FragmentKind = name.parse().map_err(ConfigError::UnknownFragment)?;
                fragments.insert(kind);
            }
            if fragments.is_empty() {
                return Err(ConfigError::EmptyFragments);
            }
            config.fragments = fragments;
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Timeout);
        }
        config.timeout = Duration::from_secs(self.timeout_secs);

        config.viewport = self.viewport.as_deref().map(parse_viewport).transpose()?;
        config.jump_behavior = self.jump_behavior;
        config.period = self.period.parse::<Preset>()?.as_str().to_string();
        config.log_file = self.log_file;
        Ok(config)
    }
}

/// Parse the backend URL, forcing a trailing slash so endpoint paths join
/// under any path prefix
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|source| ConfigError::BaseUrl {
        url: raw.clone(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Scheme(other.to_string())),
    }
}

/// Parse `WIDTHxHEIGHT`
pub fn parse_viewport(raw: &str) -> Result<Viewport, ConfigError> {
    let invalid = || ConfigError::Viewport(raw.to_string());
    let (w, h) = raw
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok(Viewport::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["flowdeck"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_are_full_dashboard() {
        let config = cli(&[]).into_config().unwrap();
        assert_eq!(config.variant, Variant::Full);
        assert_eq!(config.fragments, FragmentSet::all());
        assert_eq!(config.cadence, Duration::from_secs(10));
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.jump_behavior, JumpBehavior::Pin);
        assert_eq!(config.period, "today");
        assert!(config.viewport.is_none());
    }

    #[test]
    fn test_single_variant() {
        let config = cli(&["--variant", "single"]).into_config().unwrap();
        assert_eq!(config.cadence, Duration::from_secs(1));
        assert!(config.fragments.contains(FragmentKind::Flow));
        assert!(config.fragments.contains(FragmentKind::Timeline));
        assert!(!config.fragments.contains(FragmentKind::Stats));
    }

    #[test]
    fn test_overrides() {
        let config = cli(&[
            "--base-url",
            "https://dash.example/flows",
            "--cadence-ms",
            "2500",
            "--fragments",
            "sankey,stats",
            "--viewport",
            "1280x720",
            "--jump-behavior",
            "resume-live",
            "--period",
            "weekly",
        ])
        .into_config()
        .unwrap();
        assert_eq!(config.base_url.as_str(), "https://dash.example/flows/");
        assert_eq!(config.cadence, Duration::from_millis(2500));
        assert_eq!(
            config.fragments,
            FragmentSet::from_kinds(&[FragmentKind::Flow, FragmentKind::Stats])
        );
        assert_eq!(config.viewport, Some(Viewport::new(1280, 720)));
        assert_eq!(config.jump_behavior, JumpBehavior::ResumeLive);
        assert_eq!(config.period, "weekly");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            cli(&["--cadence-ms", "10"]).into_config(),
            Err(ConfigError::Cadence(10))
        ));
        assert!(matches!(
            cli(&["--fragments", "pie"]).into_config(),
            Err(ConfigError::UnknownFragment(_))
        ));
        assert!(matches!(
            cli(&["--fragments", ","]).into_config(),
            Err(ConfigError::EmptyFragments)
        ));
        assert!(matches!(
            cli(&["--viewport", "wide"]).into_config(),
            Err(ConfigError::Viewport(_))
        ));
        assert!(matches!(
            cli(&["--base-url", "ftp://host/"]).into_config(),
            Err(ConfigError::Scheme(_))
        ));
        assert!(matches!(
            cli(&["--timeout-secs", "0"]).into_config(),
            Err(ConfigError::Timeout)
        ));
        assert!(matches!(
            cli(&["--period", "fortnight"]).into_config(),
            Err(ConfigError::Period(_))
        ));
    }

    #[test]
    fn test_highlight_expires() {
        let base_url = parse_base_url(DEFAULT_BASE_URL).unwrap();
        let mut config = DashboardConfig::new(base_url, Variant::Full);
        assert_eq!(config.highlight_remaining(), None);

        config.last_change = Instant::now().checked_sub(CHANGE_HIGHLIGHT_DURATION * 2);
        assert_eq!(config.highlight_remaining(), None);
        assert!(!config.recently_changed());

        config.last_change = Some(Instant::now());
        assert!(config.recently_changed());
    }

    #[test]
    fn test_viewport_parsing() {
        assert_eq!(parse_viewport("800X600").unwrap(), Viewport::new(800, 600));
        assert!(parse_viewport("0x600").is_err());
        assert!(parse_viewport("800").is_err());
    }

    #[test]
    fn test_cadence_steps_are_bounded() {
        let base_url = parse_base_url(DEFAULT_BASE_URL).unwrap();
        let mut config = DashboardConfig::new(base_url, Variant::Single);
        assert_eq!(config.faster_cadence(), Duration::from_millis(MIN_CADENCE_MS));
        assert_eq!(config.faster_cadence(), Duration::from_millis(MIN_CADENCE_MS));
        assert!(config.recently_changed());
        assert!(config
            .highlight_remaining()
            .is_some_and(|left| left <= CHANGE_HIGHLIGHT_DURATION));
        assert_eq!(config.slower_cadence(), Duration::from_millis(1_500));

        config.cadence = Duration::from_millis(MAX_CADENCE_MS);
        assert_eq!(config.slower_cadence(), Duration::from_millis(MAX_CADENCE_MS));
    }
}
