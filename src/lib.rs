pub mod backfill;
pub mod indicator;
pub mod lookback;
pub mod orchestrator;
pub mod session;
pub mod store;
pub mod surface;

pub use backfill::{BackfillRequest, BackfillTrigger};
pub use indicator::{IndicatorConfig, IndicatorKind, IndicatorPoint};
pub use lookback::LookbackWindow;
pub use session::{ChartSession, Selection};
pub use store::SeriesStore;
pub use surface::{ChartSurface, ViewportRange};
