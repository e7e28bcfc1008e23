//! Ad-performance reporting: one aggregation core shared by every
//! dashboard view: derived metrics, flat breakdowns, the campaign tree,
//! period comparison, ranking, and record loading.

pub mod aggregate;
pub mod dashboard;
pub mod filter;
pub mod hierarchy;
pub mod keys;
pub mod metrics;
pub mod period;
pub mod ranking;
pub mod session;

pub use aggregate::{aggregate, aggregate_by, AggregatedGroup};
pub use dashboard::{overview, period_report, KpiSummary, Overview, PeriodReport};
pub use filter::RecordFilter;
pub use hierarchy::{build_hierarchy, HierarchyNode};
pub use keys::{Dimension, GroupKey};
pub use metrics::{DerivedMetrics, MetricTotals};
pub use period::{resolve_range, DateMode, DateRange, PeriodPair};
pub use ranking::{Ranking, SortDirection, SortKey};
pub use session::{RecordLoader, SnapshotCache, ViewSession};
