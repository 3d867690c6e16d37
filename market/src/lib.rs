pub mod adapter;

pub use adapter::{MAX_PAGE_SIZE, PriceHistorySource, ProviderError};

use serde::{Deserialize, Serialize};

use std::{fmt, str::FromStr};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown interval: {0}")]
    UnknownInterval(String),
    #[error("Unknown lookback window: {0}")]
    UnknownWindow(String),
    #[error("Invalid instrument symbol: {0}")]
    InvalidInstrument(String),
}

/// A single OHLC candle.
///
/// `time` is seconds since epoch and the natural key: a canonical series
/// never holds two candles with the same `time`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Candle {
    pub time: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Fixed time spacing between consecutive candles of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Interval {
    M1,
    M5,
    M15,
    H1,
    H4,
    D1,
}

impl Interval {
    pub const ALL: [Interval; 6] = [
        Interval::M1,
        Interval::M5,
        Interval::M15,
        Interval::H1,
        Interval::H4,
        Interval::D1,
    ];

    pub fn to_seconds(self) -> u64 {
        match self {
            Interval::M1 => 60,
            Interval::M5 => 300,
            Interval::M15 => 900,
            Interval::H1 => 3_600,
            Interval::H4 => 14_400,
            Interval::D1 => 86_400,
        }
    }

    pub fn candles_per_day(self) -> usize {
        match self {
            Interval::M1 => 1_440,
            Interval::M5 => 288,
            Interval::M15 => 96,
            Interval::H1 => 24,
            Interval::H4 => 6,
            Interval::D1 => 1,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Interval::M1 => "1m",
                Interval::M5 => "5m",
                Interval::M15 => "15m",
                Interval::H1 => "1h",
                Interval::H4 => "4h",
                Interval::D1 => "1d",
            }
        )
    }
}

impl FromStr for Interval {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::M1),
            "5m" => Ok(Interval::M5),
            "15m" => Ok(Interval::M15),
            "1h" => Ok(Interval::H1),
            "4h" => Ok(Interval::H4),
            "1d" => Ok(Interval::D1),
            _ => Err(ConfigError::UnknownInterval(s.to_string())),
        }
    }
}

/// The traded symbol a series describes, e.g. "BTCUSDT".
///
/// Stored uppercased in a fixed inline buffer so selections stay `Copy` and
/// cheap to compare as map keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instrument {
    bytes: [u8; Instrument::MAX_LEN],
}

impl Instrument {
    const MAX_LEN: usize = 20;

    pub fn new(symbol: &str) -> Result<Self, ConfigError> {
        let valid = !symbol.is_empty()
            && symbol.len() <= Self::MAX_LEN
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if !valid {
            return Err(ConfigError::InvalidInstrument(symbol.to_string()));
        }

        let mut bytes = [0u8; Self::MAX_LEN];
        for (dst, src) in bytes.iter_mut().zip(symbol.bytes()) {
            *dst = src.to_ascii_uppercase();
        }

        Ok(Instrument { bytes })
    }

    #[inline]
    fn as_str(&self) -> &str {
        let end = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(Self::MAX_LEN);
        std::str::from_utf8(&self.bytes[..end]).unwrap()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instrument({})", self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Instrument::new(s)
    }
}

impl Serialize for Instrument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Instrument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Instrument::new(&s).map_err(serde::de::Error::custom)
    }
}

fn de_string_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    s.parse::<f64>().map_err(serde::de::Error::custom)
}
