use market::{ConfigError, Interval, adapter::MAX_PAGE_SIZE};

use serde::{Deserialize, Serialize};

use std::{fmt, str::FromStr};

/// User-chosen total historical span to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum LookbackWindow {
    D7,
    M1,
    M3,
    Y1,
    Max,
}

impl LookbackWindow {
    pub const ALL: [LookbackWindow; 5] = [
        LookbackWindow::D7,
        LookbackWindow::M1,
        LookbackWindow::M3,
        LookbackWindow::Y1,
        LookbackWindow::Max,
    ];

    fn days(self) -> Option<usize> {
        match self {
            LookbackWindow::D7 => Some(7),
            LookbackWindow::M1 => Some(30),
            LookbackWindow::M3 => Some(90),
            LookbackWindow::Y1 => Some(365),
            LookbackWindow::Max => None,
        }
    }
}

impl fmt::Display for LookbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LookbackWindow::D7 => "7d",
                LookbackWindow::M1 => "1M",
                LookbackWindow::M3 => "3M",
                LookbackWindow::Y1 => "1Y",
                LookbackWindow::Max => "MAX",
            }
        )
    }
}

impl FromStr for LookbackWindow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(LookbackWindow::D7),
            "1M" => Ok(LookbackWindow::M1),
            "3M" => Ok(LookbackWindow::M3),
            "1Y" => Ok(LookbackWindow::Y1),
            "MAX" => Ok(LookbackWindow::Max),
            _ => Err(ConfigError::UnknownWindow(s.to_string())),
        }
    }
}

/// Total candle count needed to cover `window` at `interval`. May exceed the
/// provider's page ceiling; realizing an oversized requirement is the batch
/// orchestrator's job.
pub fn required_candles(window: LookbackWindow, interval: Interval) -> usize {
    match window.days() {
        Some(days) => days * interval.candles_per_day(),
        // "maximum" means as much as one page can carry, not a calendar span
        None => MAX_PAGE_SIZE,
    }
}

/// Single-page limit for `window` at `interval`: the required count clamped
/// to the provider's per-call ceiling.
pub fn resolve(window: LookbackWindow, interval: Interval) -> usize {
    required_candles(window, interval).min(MAX_PAGE_SIZE)
}
