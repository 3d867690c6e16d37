use market::Candle;

use serde::{Deserialize, Serialize};

use std::fmt;

/// Derived overlay kinds computed from the canonical series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 3] = [IndicatorKind::Sma, IndicatorKind::Ema, IndicatorKind::Rsi];

    pub fn default_period(self) -> usize {
        match self {
            IndicatorKind::Sma | IndicatorKind::Ema => 20,
            IndicatorKind::Rsi => 14,
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma => write!(f, "SMA"),
            IndicatorKind::Ema => write!(f, "EMA"),
            IndicatorKind::Rsi => write!(f, "RSI"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub time: u64,
    pub value: f64,
}

/// Per-indicator user settings; the session recomputes only enabled overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndicatorConfig {
    pub kind: IndicatorKind,
    pub period: usize,
    pub enabled: bool,
}

impl IndicatorConfig {
    pub fn new(kind: IndicatorKind) -> Self {
        IndicatorConfig {
            kind,
            period: kind.default_period(),
            enabled: false,
        }
    }
}

pub fn compute(kind: IndicatorKind, candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    match kind {
        IndicatorKind::Sma => sma(candles, period),
        IndicatorKind::Ema => ema(candles, period),
        IndicatorKind::Rsi => rsi(candles, period),
    }
}

/// Simple moving average of closes over a trailing window. The first value
/// lands at index `period - 1`; fewer candles than `period` yields an empty
/// output, the defined insufficient-data policy rather than an error.
pub fn sma(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    candles
        .windows(period)
        .map(|window| {
            let sum: f64 = window.iter().map(|c| c.close).sum();
            IndicatorPoint {
                time: window[period - 1].time,
                value: sum / period as f64,
            }
        })
        .collect()
}

/// Exponential moving average seeded with the `period`-point SMA of the first
/// closes, then smoothed with multiplier `2 / (period + 1)`.
pub fn ema(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = candles[..period].iter().map(|c| c.close).sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(candles.len() - period + 1);
    result.push(IndicatorPoint {
        time: candles[period - 1].time,
        value: seed,
    });

    let mut value = seed;
    for candle in &candles[period..] {
        value = (candle.close - value) * multiplier + value;
        result.push(IndicatorPoint {
            time: candle.time,
            value,
        });
    }

    result
}

/// Relative strength index over per-step close deltas. Average gain/loss are
/// seeded as simple means over the first `period` deltas, then Wilder
/// smoothed; the first value lands at the candle following those deltas.
pub fn rsi(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || candles.len() < period + 1 {
        return Vec::new();
    }

    let deltas: Vec<f64> = candles.windows(2).map(|w| w[1].close - w[0].close).collect();

    let mut avg_gain = deltas[..period]
        .iter()
        .map(|d| d.max(0.0))
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = deltas[..period]
        .iter()
        .map(|d| (-d).max(0.0))
        .sum::<f64>()
        / period as f64;

    let mut result = Vec::with_capacity(deltas.len() - period + 1);
    result.push(IndicatorPoint {
        time: candles[period].time,
        value: rsi_value(avg_gain, avg_loss),
    });

    for (delta, candle) in deltas[period..].iter().zip(&candles[period + 1..]) {
        avg_gain = (avg_gain * (period as f64 - 1.0) + delta.max(0.0)) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + (-delta).max(0.0)) / period as f64;

        result.push(IndicatorPoint {
            time: candle.time,
            value: rsi_value(avg_gain, avg_loss),
        });
    }

    result
}

// A flat-or-rising window has zero average loss; RS pins to 100 so RSI
// saturates near 100 by convention instead of dividing by zero.
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let rs = if avg_loss == 0.0 {
        100.0
    } else {
        avg_gain / avg_loss
    };
    100.0 - 100.0 / (1.0 + rs)
}
