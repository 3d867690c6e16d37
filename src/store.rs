use market::Candle;

use std::collections::{BTreeMap, btree_map::Entry};

/// Canonical candle series for one (instrument, interval, window) selection:
/// strictly ascending by time, no duplicate timestamps.
///
/// The ordered-map representation makes the invariant hold by construction,
/// so merges from any number of overlapping, out-of-order pages cannot
/// corrupt the series.
#[derive(Debug, Default)]
pub struct SeriesStore {
    candles: BTreeMap<u64, Candle>,
}

impl SeriesStore {
    pub fn new() -> Self {
        SeriesStore {
            candles: BTreeMap::new(),
        }
    }

    /// Merges a fetched page into the series. Only candles with novel
    /// timestamps are inserted; a re-delivered time never clobbers held
    /// data, which makes the merge an idempotent, commutative set union
    /// under the time key.
    ///
    /// Returns whether the observable series changed, so callers can skip
    /// redundant notifications.
    pub fn merge(&mut self, batch: &[Candle]) -> bool {
        let mut changed = false;

        for candle in batch {
            if let Entry::Vacant(slot) = self.candles.entry(candle.time) {
                slot.insert(*candle);
                changed = true;
            }
        }

        changed
    }

    /// Discards the series; used whenever the active selection changes.
    pub fn reset(&mut self) {
        self.candles.clear();
    }

    pub fn min_time(&self) -> Option<u64> {
        self.candles.keys().next().copied()
    }

    pub fn max_time(&self) -> Option<u64> {
        self.candles.keys().last().copied()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Ascending snapshot for render and indicator consumers.
    pub fn candles(&self) -> Vec<Candle> {
        self.candles.values().copied().collect()
    }
}
