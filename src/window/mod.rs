// Time window state machine
//
// Holds the selected interval every fragment request is parameterized by.
// Pure state: all "now" values come in through the Clock trait so the
// window arithmetic is testable without touching the wall clock.

use chrono::{DateTime, Local, NaiveTime};
use std::fmt;
use std::str::FromStr;
#[cfg(test)]
use {
    chrono::TimeZone,
    std::sync::atomic::{AtomicI64, Ordering},
    std::sync::Arc,
};

/// Seconds in one day
pub const DAY_SECS: i64 = 60 * 60 * 24;

/// Seconds in one hour
pub const HOUR_SECS: i64 = 60 * 60;

/// Span used before any preset has set one (24 hours)
pub const DEFAULT_SPAN_SECS: i64 = DAY_SECS;

// ============================================================================
// Clock
// ============================================================================

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    /// Current time as whole seconds since the epoch
    fn now_secs(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock that only moves when told to; shared between a test and the
/// scheduler under test.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    secs: Arc<AtomicI64>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(secs: i64) -> Self {
        Self {
            secs: Arc::new(AtomicI64::new(secs)),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        let secs = self.secs.load(Ordering::SeqCst);
        Local
            .timestamp_opt(secs, 0)
            .single()
            .unwrap_or_else(Local::now)
    }

    fn now_secs(&self) -> i64 {
        self.secs.load(Ordering::SeqCst)
    }
}

/// Epoch seconds of local midnight for the day containing `now`
///
/// Falls back to subtracting the seconds elapsed since midnight when the
/// local midnight does not exist (DST transitions at 00:00).
pub fn start_of_local_day(now: &DateTime<Local>) -> i64 {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match midnight.and_local_timezone(Local).earliest() {
        Some(sod) => sod.timestamp(),
        None => {
            let elapsed = now.time().signed_duration_since(NaiveTime::MIN);
            now.timestamp() - elapsed.num_seconds()
        }
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Period presets offered by the period selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// Local midnight until now
    Today,
    OneHour,
    SixHours,
    TwelveHours,
    TwentyFourHours,
    Weekly,
    Monthly,
    Yearly,
}

impl Preset {
    /// All presets in selector order
    pub const ALL: [Preset; 8] = [
        Preset::Today,
        Preset::OneHour,
        Preset::SixHours,
        Preset::TwelveHours,
        Preset::TwentyFourHours,
        Preset::Weekly,
        Preset::Monthly,
        Preset::Yearly,
    ];

    /// Trailing span in seconds, `None` for `Today`
    pub fn duration_secs(self) -> Option<i64> {
        match self {
            Preset::Today => None,
            Preset::OneHour => Some(HOUR_SECS),
            Preset::SixHours => Some(6 * HOUR_SECS),
            Preset::TwelveHours => Some(12 * HOUR_SECS),
            Preset::TwentyFourHours => Some(DAY_SECS),
            Preset::Weekly => Some(7 * DAY_SECS),
            Preset::Monthly => Some(30 * DAY_SECS),
            Preset::Yearly => Some(365 * DAY_SECS),
        }
    }

    /// Selector value for this preset
    pub fn as_str(self) -> &'static str {
        match self {
            Preset::Today => "today",
            Preset::OneHour => "1-hour",
            Preset::SixHours => "6-hours",
            Preset::TwelveHours => "12-hours",
            Preset::TwentyFourHours => "24-hours",
            Preset::Weekly => "weekly",
            Preset::Monthly => "monthly",
            Preset::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector value that does not name a preset
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown period preset: {0:?}")]
pub struct UnknownPreset(pub String);

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

// ============================================================================
// Window
// ============================================================================

/// Whether the window follows the wall clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Window tracks "now" on every tick
    #[default]
    Live,
    /// Window is pinned to a pivot chosen by the user
    Fixed,
}

/// How a live window's start is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Start at local midnight of the current day
    StartOfDay,
    /// Start at `end - span`
    Trailing,
}

/// Selected time interval, `[start, end)` in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
    /// Current period length; used for trailing windows and day jumps
    pub span: i64,
    pub anchor: Anchor,
    pub mode: Mode,
}

impl TimeWindow {
    /// Default window at controller start: live, local midnight until now
    pub fn today(now: &DateTime<Local>) -> Self {
        let mut window = Self {
            start: 0,
            end: 1,
            span: DEFAULT_SPAN_SECS,
            anchor: Anchor::StartOfDay,
            mode: Mode::Live,
        };
        window.recompute(now);
        window
    }

    /// New live window for `preset`, keeping the current span for `Today`
    pub fn with_preset(&self, preset: Preset, now: &DateTime<Local>) -> Self {
        let mut window = *self;
        match preset.duration_secs() {
            None => window.anchor = Anchor::StartOfDay,
            Some(span) => {
                window.span = span;
                window.anchor = Anchor::Trailing;
            }
        }
        window.mode = Mode::Live;
        window.recompute(now);
        window
    }

    /// Window ending one day after `day_start`, spanning the current period
    pub fn pinned_at(&self, day_start: i64, mode: Mode) -> Self {
        let end = day_start + DAY_SECS;
        Self {
            start: end - self.span,
            end,
            span: self.span,
            anchor: self.anchor,
            mode,
        }
    }

    /// Window for epoch day `day` (`[day * 86400, day * 86400 + 86400)` at 24h)
    pub fn at_epoch_day(&self, day: i64, mode: Mode) -> Self {
        self.pinned_at(day * DAY_SECS, mode)
    }

    /// Recompute bounds from `now`; no-op for fixed windows
    pub fn advance_to_now(&mut self, now: &DateTime<Local>) {
        if self.mode == Mode::Live {
            self.recompute(now);
        }
    }

    /// Epoch day containing the last second of the window
    pub fn end_day(&self) -> i64 {
        (self.end - 1).div_euclid(DAY_SECS)
    }

    pub fn is_live(&self) -> bool {
        self.mode == Mode::Live
    }

    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    fn recompute(&mut self, now: &DateTime<Local>) {
        let now_secs = now.timestamp();
        self.end = now_secs;
        self.start = match self.anchor {
            Anchor::StartOfDay => start_of_local_day(now),
            Anchor::Trailing => now_secs - self.span,
        };
        // Exactly at midnight the day window would be empty
        if self.end <= self.start {
            self.end = self.start + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Local> {
        ManualClock::new(secs).now()
    }

    #[test]
    fn test_preset_round_trip_from_selector_values() {
        for preset in Preset::ALL {
            assert_eq!(preset.as_str().parse::<Preset>(), Ok(preset));
        }
        assert!("fortnight".parse::<Preset>().is_err());
    }

    #[test]
    fn test_six_hour_preset_bounds() {
        let t = 1_700_000_000;
        let window = TimeWindow::today(&at(t)).with_preset(Preset::SixHours, &at(t));
        assert_eq!(window.start, t - 21_600);
        assert_eq!(window.end, t);
        assert_eq!(window.mode, Mode::Live);
    }

    #[test]
    fn test_today_keeps_previous_span() {
        let t = 1_700_000_000;
        let weekly = TimeWindow::today(&at(t)).with_preset(Preset::Weekly, &at(t));
        let today = weekly.with_preset(Preset::Today, &at(t));
        assert_eq!(today.anchor, Anchor::StartOfDay);
        assert_eq!(today.span, 7 * DAY_SECS);
        assert_eq!(today.start, start_of_local_day(&at(t)));
    }

    #[test]
    fn test_jump_to_epoch_day_with_default_span() {
        let window = TimeWindow::today(&at(1_700_000_000));
        let d = 19_000;
        let pinned = window.at_epoch_day(d, Mode::Fixed);
        assert_eq!(pinned.start, d * 86_400);
        assert_eq!(pinned.end, d * 86_400 + 86_400);
        assert_eq!(pinned.mode, Mode::Fixed);
    }

    #[test]
    fn test_advance_is_noop_for_fixed_windows() {
        let mut window = TimeWindow::today(&at(1_700_000_000)).at_epoch_day(19_000, Mode::Fixed);
        let before = window;
        window.advance_to_now(&at(1_800_000_000));
        assert_eq!(window, before);
    }

    #[test]
    fn test_live_jump_reverts_on_advance() {
        let now = 1_700_000_000;
        let mut window = TimeWindow::today(&at(now))
            .with_preset(Preset::TwentyFourHours, &at(now))
            .at_epoch_day(19_000, Mode::Live);
        assert_eq!(window.end, 19_001 * DAY_SECS);
        window.advance_to_now(&at(now + 10));
        assert_eq!(window.end, now + 10);
        assert_eq!(window.start, now + 10 - DAY_SECS);
    }

    #[test]
    fn test_end_day() {
        let window = TimeWindow::today(&at(0)).at_epoch_day(42, Mode::Fixed);
        assert_eq!(window.end_day(), 42);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every trailing preset yields a window exactly as long as the preset
        #[test]
        fn prop_trailing_preset_duration(
            now in 1_000_000_000i64..2_000_000_000i64,
            idx in 1usize..8usize,
        ) {
            let preset = Preset::ALL[idx];
            let window = TimeWindow::today(&at(now)).with_preset(preset, &at(now));
            prop_assert_eq!(Some(window.end - window.start), preset.duration_secs());
            prop_assert_eq!(window.end, now);
        }

        /// Today starts at local midnight and never runs past now
        #[test]
        fn prop_today_starts_at_local_midnight(now in 1_000_000_000i64..2_000_000_000i64) {
            let clock_now = at(now);
            let window = TimeWindow::today(&clock_now);
            prop_assert_eq!(window.start, start_of_local_day(&clock_now));
            prop_assert!(window.start < window.end);
            // Only exactly at midnight is end clamped past now
            prop_assert!(window.end <= now || window.start == now);
        }

        /// Day jumps always produce a non-empty window
        #[test]
        fn prop_jump_is_non_empty(
            day in 0i64..40_000i64,
            idx in 0usize..8usize,
        ) {
            let now = at(1_700_000_000);
            let window = TimeWindow::today(&now)
                .with_preset(Preset::ALL[idx], &now)
                .at_epoch_day(day, Mode::Fixed);
            prop_assert!(window.start < window.end);
            prop_assert_eq!(window.end, (day + 1) * DAY_SECS);
        }
    }
}
