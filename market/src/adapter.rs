use crate::{Candle, Instrument, Interval};

pub mod binance;

/// Hard ceiling on candles the upstream provider returns per call.
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("{0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Parsing: {0}")]
    Parse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    pub fn to_user_message(&self) -> &'static str {
        match self {
            ProviderError::Fetch(err) => {
                log::error!("Provider fetch error: {err}");
                "Network error while contacting the price history provider."
            }
            ProviderError::Parse(err) => {
                log::error!("Provider parse error: {err}");
                "Unexpected response from the price history provider. Check logs for details."
            }
            ProviderError::InvalidRequest(err) => {
                log::error!("Provider invalid request: {err}");
                "Invalid request made to the price history provider. Check logs for details."
            }
        }
    }
}

/// Boundary to the upstream price-history provider.
///
/// `cursor_time`, when present, asks for candles at or before that timestamp
/// (seconds); it is only used for older-data backfill. A returned batch may
/// arrive in any order and may overlap ranges the caller already holds, so
/// pages are always merged through the series store rather than consumed
/// directly.
pub trait PriceHistorySource {
    fn fetch_price_history(
        &self,
        instrument: Instrument,
        interval: Interval,
        limit: usize,
        cursor_time: Option<u64>,
    ) -> impl Future<Output = Result<Vec<Candle>, ProviderError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_never_leak_provider_internals() {
        let parse = ProviderError::Parse("expected array at row 3".to_string());
        assert_eq!(
            parse.to_user_message(),
            "Unexpected response from the price history provider. Check logs for details."
        );
        assert!(!parse.to_user_message().contains("row 3"));

        let invalid = ProviderError::InvalidRequest("limit 1001 outside 1..=1000".to_string());
        assert_eq!(
            invalid.to_user_message(),
            "Invalid request made to the price history provider. Check logs for details."
        );
        assert!(!invalid.to_user_message().contains("1001"));
    }
}
