use market::{Candle, Instrument, Interval, PriceHistorySource, adapter::MAX_PAGE_SIZE};

use smallvec::SmallVec;

use std::time::Duration;

/// Max concurrent page requests per group.
pub const CONCURRENCY_LIMIT: usize = 5;

/// Pause between request groups, to stay under provider rate limits.
pub const GROUP_PACING: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub cursor_time: u64,
}

pub type PagePlan = SmallVec<[PageRequest; 8]>;

/// Plans the pages still needed to cover `required` candles, given that the
/// caller fetches the first page itself (so the chart renders as soon as
/// possible). `anchor` is the oldest timestamp already held, or "now" when
/// nothing is held yet.
///
/// Cursor timestamps assume uniform interval spacing, which real calendars
/// break for some instruments. The estimate only has to reach old enough to
/// get past already-held ranges; the series store's deduplication recovers
/// exactness.
pub fn plan_pages(required: usize, anchor: u64, interval: Interval) -> PagePlan {
    let mut plan = PagePlan::new();

    if required <= MAX_PAGE_SIZE {
        return plan;
    }

    let pages_needed = required.div_ceil(MAX_PAGE_SIZE);

    for page in 1..pages_needed {
        let span = (page * MAX_PAGE_SIZE) as u64 * interval.to_seconds();
        plan.push(PageRequest {
            limit: MAX_PAGE_SIZE,
            cursor_time: anchor.saturating_sub(span),
        });
    }

    plan
}

/// Executes a page plan in groups of at most [`CONCURRENCY_LIMIT`] concurrent
/// requests. Groups run strictly sequentially with [`GROUP_PACING`] between
/// them; within a group, requests run concurrently and may complete in any
/// order.
///
/// Each page is handed to `on_page` as soon as its group completes, so the
/// caller can merge and render progressively instead of waiting for the whole
/// plan. A failed page is logged and contributes nothing; it aborts neither
/// its siblings nor later groups, and no retry happens here.
pub async fn run<S, F>(
    source: &S,
    instrument: Instrument,
    interval: Interval,
    plan: &[PageRequest],
    mut on_page: F,
) where
    S: PriceHistorySource,
    F: FnMut(Vec<Candle>),
{
    for (group_idx, group) in plan.chunks(CONCURRENCY_LIMIT).enumerate() {
        if group_idx > 0 {
            tokio::time::sleep(GROUP_PACING).await;
        }

        let requests = group.iter().map(|page| {
            source.fetch_price_history(instrument, interval, page.limit, Some(page.cursor_time))
        });
        let results = futures::future::join_all(requests).await;

        for (page, result) in group.iter().zip(results) {
            match result {
                Ok(batch) => on_page(batch),
                Err(err) => {
                    log::warn!(
                        "History page at cursor {} failed, contributing nothing: {err}",
                        page.cursor_time
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market::ProviderError;

    use std::cell::RefCell;

    /// Generates `limit` candles ending at the cursor (or `now`), one per
    /// interval step. Cursors listed in `fail_at` error instead.
    struct ScriptedSource {
        now: u64,
        fail_at: Vec<u64>,
        calls: RefCell<Vec<(usize, Option<u64>)>>,
    }

    impl ScriptedSource {
        fn new(now: u64) -> Self {
            ScriptedSource {
                now,
                fail_at: Vec::new(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn candles_ending_at(end: u64, limit: usize, interval: Interval) -> Vec<Candle> {
            let step = interval.to_seconds();
            (0..limit as u64)
                .rev()
                .map(|i| {
                    let time = end - i * step;
                    Candle {
                        time,
                        open: 1.0,
                        high: 2.0,
                        low: 0.5,
                        close: 1.5,
                    }
                })
                .collect()
        }
    }

    impl PriceHistorySource for ScriptedSource {
        async fn fetch_price_history(
            &self,
            _instrument: Instrument,
            interval: Interval,
            limit: usize,
            cursor_time: Option<u64>,
        ) -> Result<Vec<Candle>, ProviderError> {
            self.calls.borrow_mut().push((limit, cursor_time));

            if let Some(cursor) = cursor_time
                && self.fail_at.contains(&cursor)
            {
                return Err(ProviderError::InvalidRequest("scripted failure".into()));
            }

            Ok(Self::candles_ending_at(
                cursor_time.unwrap_or(self.now),
                limit,
                interval,
            ))
        }
    }

    fn instrument() -> Instrument {
        Instrument::new("BTCUSDT").unwrap()
    }

    #[test]
    fn single_page_requirement_plans_nothing() {
        assert!(plan_pages(MAX_PAGE_SIZE, 1_700_000_000, Interval::H1).is_empty());
        assert!(plan_pages(30, 1_700_000_000, Interval::D1).is_empty());
    }

    #[test]
    fn oversized_requirement_plans_remaining_pages() {
        let anchor = 1_700_000_000;
        // a year of hourly candles: 8760 required, 9 pages, 8 beyond the first
        let plan = plan_pages(365 * 24, anchor, Interval::H1);

        assert_eq!(plan.len(), 8);
        for (i, page) in plan.iter().enumerate() {
            assert_eq!(page.limit, MAX_PAGE_SIZE);
            let expected = anchor - ((i + 1) * MAX_PAGE_SIZE) as u64 * 3_600;
            assert_eq!(page.cursor_time, expected);
        }
    }

    #[test]
    fn cursor_estimates_saturate_near_epoch() {
        let plan = plan_pages(2_500, 1_000, Interval::D1);
        assert!(plan.iter().all(|page| page.cursor_time == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn runs_all_pages_and_reports_each_batch() {
        let source = ScriptedSource::new(1_700_000_000);
        let plan = plan_pages(7 * 1_440, 1_700_000_000, Interval::M1);
        assert_eq!(plan.len(), 10);

        let mut batches = 0usize;
        let mut total = 0usize;
        run(&source, instrument(), Interval::M1, &plan, |batch| {
            batches += 1;
            total += batch.len();
        })
        .await;

        assert_eq!(batches, 10);
        assert_eq!(total, 10 * MAX_PAGE_SIZE);
        assert_eq!(source.calls.borrow().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_page_is_absorbed_without_aborting_siblings() {
        let anchor = 1_700_000_000;
        let plan = plan_pages(3 * MAX_PAGE_SIZE, anchor, Interval::H1);
        assert_eq!(plan.len(), 2);

        let mut source = ScriptedSource::new(anchor);
        source.fail_at.push(plan[0].cursor_time);

        let mut batches = 0usize;
        run(&source, instrument(), Interval::H1, &plan, |batch| {
            batches += 1;
            assert_eq!(batch.len(), MAX_PAGE_SIZE);
        })
        .await;

        // the failed page contributed nothing, the other still landed
        assert_eq!(batches, 1);
        assert_eq!(source.calls.borrow().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn groups_are_paced_sequentially() {
        let source = ScriptedSource::new(1_700_000_000);
        // 13 planned pages: groups of 5, 5, 3
        let plan = plan_pages(14 * MAX_PAGE_SIZE, 1_700_000_000, Interval::M5);
        assert_eq!(plan.len(), 13);

        let started = tokio::time::Instant::now();
        let mut batches = 0usize;
        run(&source, instrument(), Interval::M5, &plan, |_| batches += 1).await;

        // two inter-group pauses under paused time
        assert_eq!(started.elapsed(), GROUP_PACING * 2);
        assert_eq!(batches, 13);
    }
}
