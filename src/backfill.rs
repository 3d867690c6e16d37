use crate::surface::ViewportRange;

/// Fraction of the visible span used as the left-edge approach buffer, so the
/// fetch starts slightly before the user actually hits loaded minimum.
const BUFFER_RATIO: f64 = 0.1;

/// Minimum wall-clock gap between two triggered backfill requests.
const COOLDOWN_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerState {
    Idle,
    PendingRequest,
}

/// One page of older history to fetch, at or before `cursor_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillRequest {
    pub cursor_time: u64,
}

/// Decides when panning toward the left edge of loaded history warrants
/// fetching one more page of older candles.
///
/// One instance per active selection; cooldown and attempt state die with it,
/// so a new selection never inherits another session's rate gating. Unlike
/// the batch orchestrator this is reactive, not bulk: exactly one page per
/// trigger, rate-limited by time instead of concurrency grouping.
#[derive(Debug)]
pub struct BackfillTrigger {
    state: TriggerState,
    cooldown_until: u64,
    attempted_initial_backfill: bool,
}

impl BackfillTrigger {
    pub fn new() -> Self {
        BackfillTrigger {
            state: TriggerState::Idle,
            cooldown_until: 0,
            attempted_initial_backfill: false,
        }
    }

    /// One-shot gate for the initial bulk overflow fetch; true only the first
    /// time it is called for this selection, so re-renders never repeat the
    /// bulk fetch.
    pub fn take_initial_backfill(&mut self) -> bool {
        !std::mem::replace(&mut self.attempted_initial_backfill, true)
    }

    /// Called on every visible-range change reported by the rendering
    /// surface. Fires when the left edge moves within 10% of the loaded
    /// minimum, at most once per cooldown window, and never while a previous
    /// request is still pending.
    pub fn on_visible_range(
        &mut self,
        range: ViewportRange,
        min_time: Option<u64>,
        now_ms: u64,
    ) -> Option<BackfillRequest> {
        let min_time = min_time?;

        if self.state != TriggerState::Idle || now_ms <= self.cooldown_until {
            return None;
        }

        let span = range.to.saturating_sub(range.from);
        let buffer = (span as f64 * BUFFER_RATIO) as u64;
        let threshold = min_time + buffer;

        if range.from >= threshold {
            return None;
        }

        self.state = TriggerState::PendingRequest;
        self.cooldown_until = now_ms + COOLDOWN_MS;

        Some(BackfillRequest {
            cursor_time: min_time.saturating_sub(1),
        })
    }

    /// Returns the trigger to idle once the request resolves, successfully or
    /// not. A failed page only costs the cooldown window before the next
    /// attempt can fire.
    pub fn complete(&mut self) {
        self.state = TriggerState::Idle;
    }
}

impl Default for BackfillTrigger {
    fn default() -> Self {
        Self::new()
    }
}
