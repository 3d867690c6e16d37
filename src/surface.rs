use crate::indicator::{IndicatorKind, IndicatorPoint};

use market::Candle;

/// Visible time range reported by the rendering surface, in series time
/// (seconds). Ephemeral, read-only input to the backfill trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportRange {
    pub from: u64,
    pub to: u64,
}

/// Contract exposed to the external rendering surface.
///
/// Called whenever the canonical series or an indicator overlay changes; the
/// surface owns all drawing, axis, and layout concerns. A disabled indicator
/// is pushed as an empty slice so the surface can clear its overlay.
pub trait ChartSurface {
    fn set_series(&mut self, candles: &[Candle]);

    fn set_indicator_overlay(&mut self, kind: IndicatorKind, points: &[IndicatorPoint]);
}
