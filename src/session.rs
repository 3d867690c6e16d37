use crate::{
    backfill::BackfillTrigger,
    indicator::{self, IndicatorConfig, IndicatorKind},
    lookback::{self, LookbackWindow},
    orchestrator,
    store::SeriesStore,
    surface::{ChartSurface, ViewportRange},
};

use market::{Candle, Instrument, Interval, PriceHistorySource, adapter::MAX_PAGE_SIZE};

use rustc_hash::FxHashMap;

/// The active (instrument, interval, lookback window) triple. Changing any
/// part of it discards the held series and all in-flight work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    pub instrument: Instrument,
    pub interval: Interval,
    pub window: LookbackWindow,
}

impl Selection {
    pub fn new(instrument: Instrument, interval: Interval, window: LookbackWindow) -> Self {
        Selection {
            instrument,
            interval,
            window,
        }
    }
}

/// Owns the acquisition pipeline for one chart: the canonical series, the
/// backfill trigger, and indicator settings, all scoped to the current
/// selection.
///
/// Every series change fans out to exactly two consumers, the render
/// contract and the indicator recompute; there is no implicit reactive
/// graph. In-flight pages carry the generation they were requested under and
/// are dropped at merge time if the selection has moved on.
pub struct ChartSession<S, C> {
    source: S,
    surface: C,
    selection: Selection,
    store: SeriesStore,
    backfill: BackfillTrigger,
    indicators: FxHashMap<IndicatorKind, IndicatorConfig>,
    generation: u64,
    pending_fetches: usize,
    now_ms: fn() -> u64,
}

fn wall_clock_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

impl<S, C> ChartSession<S, C>
where
    S: PriceHistorySource,
    C: ChartSurface,
{
    pub fn new(source: S, surface: C, selection: Selection) -> Self {
        let indicators = IndicatorKind::ALL
            .into_iter()
            .map(|kind| (kind, IndicatorConfig::new(kind)))
            .collect();

        ChartSession {
            source,
            surface,
            selection,
            store: SeriesStore::new(),
            backfill: BackfillTrigger::new(),
            indicators,
            generation: 0,
            pending_fetches: 0,
            now_ms: wall_clock_ms,
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    pub fn surface(&self) -> &C {
        &self.surface
    }

    pub fn indicator(&self, kind: IndicatorKind) -> Option<IndicatorConfig> {
        self.indicators.get(&kind).copied()
    }

    /// True while any fetch is outstanding; the chart shows a loading
    /// indicator for this, and an empty store once it turns false is the
    /// explicit no-data state.
    pub fn is_loading(&self) -> bool {
        self.pending_fetches > 0
    }

    /// Switches the active selection: bumps the generation so late pages get
    /// dropped, discards the series, and starts backfill gating fresh.
    pub fn select(&mut self, selection: Selection) {
        if selection == self.selection {
            return;
        }

        self.selection = selection;
        self.generation += 1;
        self.store.reset();
        self.backfill = BackfillTrigger::new();
        self.pending_fetches = 0;
        self.notify_series_changed();
    }

    /// Loads history for the current selection: the first page immediately,
    /// so the chart renders as soon as possible, then any remaining pages
    /// through the batch orchestrator, each merged and rendered as it lands.
    pub async fn load_initial(&mut self) {
        let generation = self.generation;
        let Selection {
            instrument,
            interval,
            window,
        } = self.selection;

        let required = lookback::required_candles(window, interval);
        let first_page = lookback::resolve(window, interval);

        self.pending_fetches += 1;
        let first = self
            .source
            .fetch_price_history(instrument, interval, first_page, None)
            .await;
        self.pending_fetches = self.pending_fetches.saturating_sub(1);

        match first {
            Ok(batch) => {
                self.merge_page(generation, &batch);
            }
            Err(err) => log::warn!("Initial {instrument} {interval} page failed: {err}"),
        }

        if required > MAX_PAGE_SIZE && self.backfill.take_initial_backfill() {
            let anchor = self
                .store
                .min_time()
                .unwrap_or_else(|| chrono::Utc::now().timestamp() as u64);
            let plan = orchestrator::plan_pages(required, anchor, interval);

            self.pending_fetches += 1;
            let Self {
                source,
                surface,
                store,
                indicators,
                ..
            } = self;
            orchestrator::run(source, instrument, interval, &plan, |batch| {
                if store.merge(&batch) {
                    Self::render(surface, store, indicators);
                }
            })
            .await;
            self.pending_fetches = self.pending_fetches.saturating_sub(1);
        }
    }

    /// Reacts to a pan/zoom reported by the rendering surface: when the
    /// backfill trigger fires, fetches exactly one page of older candles. A
    /// failed page is absorbed as an empty contribution and the trigger is
    /// re-armed after its cooldown.
    pub async fn on_visible_range(&mut self, range: ViewportRange) {
        let now_ms = (self.now_ms)();
        let Some(request) = self
            .backfill
            .on_visible_range(range, self.store.min_time(), now_ms)
        else {
            return;
        };

        let Selection {
            instrument,
            interval,
            window,
        } = self.selection;
        let limit = lookback::resolve(window, interval);
        let generation = self.generation;

        self.pending_fetches += 1;
        let result = self
            .source
            .fetch_price_history(instrument, interval, limit, Some(request.cursor_time))
            .await;
        self.pending_fetches = self.pending_fetches.saturating_sub(1);
        self.backfill.complete();

        match result {
            Ok(batch) => {
                self.merge_page(generation, &batch);
            }
            Err(err) => log::warn!(
                "Viewport backfill at cursor {} failed: {err}",
                request.cursor_time
            ),
        }
    }

    /// Merges a fetched page if it still belongs to the current selection;
    /// pages requested under a superseded generation are dropped. Returns
    /// whether the canonical series changed.
    pub fn merge_page(&mut self, generation: u64, batch: &[Candle]) -> bool {
        if generation != self.generation {
            log::debug!(
                "Dropping {} candles fetched for a superseded selection",
                batch.len()
            );
            return false;
        }

        if self.store.merge(batch) {
            self.notify_series_changed();
            true
        } else {
            false
        }
    }

    /// Updates one indicator's settings and re-renders its overlay from the
    /// held series, without refetching anything.
    pub fn set_indicator(&mut self, config: IndicatorConfig) {
        self.indicators.insert(config.kind, config);

        let points = if config.enabled {
            indicator::compute(config.kind, &self.store.candles(), config.period)
        } else {
            Vec::new()
        };
        self.surface.set_indicator_overlay(config.kind, &points);
    }

    fn notify_series_changed(&mut self) {
        let Self {
            surface,
            store,
            indicators,
            ..
        } = self;
        Self::render(surface, store, indicators);
    }

    fn render(
        surface: &mut C,
        store: &SeriesStore,
        indicators: &FxHashMap<IndicatorKind, IndicatorConfig>,
    ) {
        let candles = store.candles();
        surface.set_series(&candles);

        for config in indicators.values().filter(|config| config.enabled) {
            let points = indicator::compute(config.kind, &candles, config.period);
            surface.set_indicator_overlay(config.kind, &points);
        }
    }
}
