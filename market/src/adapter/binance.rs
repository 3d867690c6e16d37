use super::{MAX_PAGE_SIZE, PriceHistorySource, ProviderError};
use crate::{Candle, Instrument, Interval, de_string_to_f64};

use serde::Deserialize;

use std::{sync::LazyLock, time::Duration};

const SPOT_DOMAIN: &str = "https://api.binance.com";

/// Per-page fetch deadline; a timed-out page is treated as a failed page.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("failed to create HTTP client")
});

/// One row of the klines response, a positional JSON array:
/// open time (ms), open, high, low, close, volume, close time (ms),
/// quote volume, trade count, taker buy base, taker buy quote, ignore.
#[derive(Deserialize, Debug, Clone)]
struct FetchedCandle(
    u64,
    #[serde(deserialize_with = "de_string_to_f64")] f64,
    #[serde(deserialize_with = "de_string_to_f64")] f64,
    #[serde(deserialize_with = "de_string_to_f64")] f64,
    #[serde(deserialize_with = "de_string_to_f64")] f64,
    String,
    u64,
    String,
    u32,
    String,
    String,
    String,
);

impl From<FetchedCandle> for Candle {
    fn from(row: FetchedCandle) -> Self {
        Candle {
            time: row.0 / 1_000,
            open: row.1,
            high: row.2,
            low: row.3,
            close: row.4,
        }
    }
}

fn klines_url(
    instrument: Instrument,
    interval: Interval,
    limit: usize,
    cursor_time: Option<u64>,
) -> String {
    let mut url =
        format!("{SPOT_DOMAIN}/api/v3/klines?symbol={instrument}&interval={interval}&limit={limit}");

    if let Some(cursor) = cursor_time {
        // provider expects milliseconds; inclusive upper bound
        url.push_str(&format!("&endTime={}", cursor * 1_000));
    }

    url
}

/// Binance spot kline endpoint as a `PriceHistorySource`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceSpot;

impl PriceHistorySource for BinanceSpot {
    async fn fetch_price_history(
        &self,
        instrument: Instrument,
        interval: Interval,
        limit: usize,
        cursor_time: Option<u64>,
    ) -> Result<Vec<Candle>, ProviderError> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ProviderError::InvalidRequest(format!(
                "limit {limit} outside 1..={MAX_PAGE_SIZE}"
            )));
        }

        let url = klines_url(instrument, interval, limit, cursor_time);

        let response = HTTP_CLIENT.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::InvalidRequest(format!(
                "HTTP {status} fetching {instrument} {interval} klines"
            )));
        }

        let rows: Vec<FetchedCandle> = response
            .json()
            .await
            .map_err(|err| ProviderError::Parse(err.to_string()))?;

        Ok(rows.into_iter().map(Candle::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_limit_and_optional_cursor() {
        let instrument = Instrument::new("btcusdt").unwrap();

        let url = klines_url(instrument, Interval::H1, 168, None);
        assert_eq!(
            url,
            "https://api.binance.com/api/v3/klines?symbol=BTCUSDT&interval=1h&limit=168"
        );

        let url = klines_url(instrument, Interval::M1, 1000, Some(1_700_000_000));
        assert!(url.ends_with("&limit=1000&endTime=1700000000000"));
    }

    #[test]
    fn parses_positional_kline_rows() {
        let payload = r#"[
            [1700000000000, "35000.1", "35100.0", "34900.5", "35050.2", "12.5",
             1700003599999, "437512.3", 4821, "6.2", "217000.0", "0"]
        ]"#;

        let rows: Vec<FetchedCandle> = serde_json::from_str(payload).unwrap();
        let candle = Candle::from(rows[0].clone());

        assert_eq!(candle.time, 1_700_000_000);
        assert_eq!(candle.open, 35_000.1);
        assert_eq!(candle.high, 35_100.0);
        assert_eq!(candle.low, 34_900.5);
        assert_eq!(candle.close, 35_050.2);
    }

    #[tokio::test]
    async fn rejects_out_of_range_limit() {
        let instrument = Instrument::new("BTCUSDT").unwrap();

        let err = BinanceSpot
            .fetch_price_history(instrument, Interval::D1, MAX_PAGE_SIZE + 1, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }
}
