//! Dashboard views built on the shared aggregation core: KPI cards with
//! period-over-period deltas, funnels, the daily series and the top
//! creatives table.

use adboard_core::types::NOT_AVAILABLE;
use adboard_core::{AdRecord, Creative};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::aggregate::{aggregate, AggregatedGroup, Categories};
use crate::filter::RecordFilter;
use crate::keys::Dimension;
use crate::metrics::{cpl, delta_pct, DerivedMetrics, MetricTotals};
use crate::period::{DateRange, PeriodPair};
use crate::ranking::{Rankable, Ranking};

/// Scalar totals for a record set, as shown on the KPI cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub totals: MetricTotals,
    pub metrics: DerivedMetrics,
    pub record_count: usize,
}

impl KpiSummary {
    pub fn from_records(records: &[AdRecord]) -> Self {
        let totals = MetricTotals::from_records(records);
        Self {
            metrics: totals.derived(),
            totals,
            record_count: records.len(),
        }
    }
}

/// Percentage change per KPI, current vs previous period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiDeltas {
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub leads: f64,
    pub purchases: f64,
    pub reach: f64,
    pub revenue: f64,
    pub cpl: f64,
    pub ctr: f64,
    pub cpm: f64,
    pub cpc: f64,
    pub frequency: f64,
    pub roas: f64,
}

impl KpiDeltas {
    pub fn between(current: &KpiSummary, previous: &KpiSummary) -> Self {
        let (c, p) = (&current.totals, &previous.totals);
        let (cm, pm) = (&current.metrics, &previous.metrics);
        Self {
            spend: delta_pct(c.spend, p.spend),
            impressions: delta_pct(c.impressions, p.impressions),
            clicks: delta_pct(c.clicks, p.clicks),
            leads: delta_pct(c.leads, p.leads),
            purchases: delta_pct(c.purchases, p.purchases),
            reach: delta_pct(c.reach, p.reach),
            revenue: delta_pct(c.revenue, p.revenue),
            cpl: delta_pct(cm.cpl, pm.cpl),
            ctr: delta_pct(cm.ctr, pm.ctr),
            cpm: delta_pct(cm.cpm, pm.cpm),
            cpc: delta_pct(cm.cpc, pm.cpc),
            frequency: delta_pct(cm.frequency, pm.frequency),
            roas: delta_pct(cm.roas, pm.roas),
        }
    }
}

/// KPI summary for the selected window plus, when the window is bounded,
/// the same summary one calendar month earlier.
///
/// `previous` and `deltas` are `None` when there is no bounded window; the
/// trend indicator must be hidden in that case rather than shown as 0%.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods: Option<PeriodPair>,
    pub current: KpiSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<KpiSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deltas: Option<KpiDeltas>,
    pub generated_at: DateTime<Utc>,
}

/// Run the KPI pipeline on the filter's window and on the previous-month
/// window. `records` must cover both windows.
pub fn period_report(records: &[AdRecord], filter: &RecordFilter) -> PeriodReport {
    let current_records = filter.apply(records);
    let current = KpiSummary::from_records(&current_records);

    let Some(range) = filter.range else {
        return PeriodReport {
            periods: None,
            current,
            previous: None,
            deltas: None,
            generated_at: Utc::now(),
        };
    };

    let periods = PeriodPair::from_current(range);
    let previous_records = filter.with_range(Some(periods.previous)).apply(records);
    let previous = KpiSummary::from_records(&previous_records);
    let deltas = KpiDeltas::between(&current, &previous);
    debug!(
        current = current.record_count,
        previous = previous.record_count,
        "Computed period comparison"
    );

    PeriodReport {
        periods: Some(periods),
        current,
        previous: Some(previous),
        deltas: Some(deltas),
        generated_at: Utc::now(),
    }
}

/// Date window that must be fetched to produce a [`PeriodReport`] for
/// `range`: from the previous period's start to the current end.
pub fn comparison_span(range: DateRange) -> DateRange {
    let periods = PeriodPair::from_current(range);
    DateRange {
        start: periods.previous.start.min(range.start),
        end: range.end,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub name: String,
    pub value: f64,
    /// Percent of the previous stage (100 for the first stage).
    pub step_rate: f64,
    /// Percent of the first stage.
    pub overall_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funnel {
    pub name: String,
    pub stages: Vec<FunnelStage>,
}

impl Funnel {
    fn from_stages(name: &str, stages: &[(&str, f64)]) -> Self {
        let first = stages.first().map_or(0.0, |(_, v)| *v);
        let mut previous: Option<f64> = None;
        let stages = stages
            .iter()
            .map(|(stage, value)| {
                let step_rate = match previous {
                    None => 100.0,
                    Some(prev) => percent(*value, prev),
                };
                previous = Some(*value);
                FunnelStage {
                    name: stage.to_string(),
                    value: *value,
                    step_rate,
                    overall_rate: percent(*value, first),
                }
            })
            .collect();
        Self {
            name: name.to_string(),
            stages,
        }
    }

    /// Impressions → clicks → leads → purchases.
    pub fn delivery(totals: &MetricTotals) -> Self {
        Self::from_stages(
            "delivery",
            &[
                ("impressions", totals.impressions),
                ("clicks", totals.clicks),
                ("leads", totals.leads),
                ("purchases", totals.purchases),
            ],
        )
    }

    /// Conversations started → connections → new contacts → depth-2
    /// conversations.
    pub fn messaging(totals: &MetricTotals) -> Self {
        Self::from_stages(
            "messaging",
            &[
                ("messages_started", totals.messages_started),
                ("connections", totals.messaging_connections),
                ("new_contacts", totals.new_contacts),
                ("depth_two", totals.depth_two_conversations),
            ],
        )
    }
}

fn percent(value: f64, base: f64) -> f64 {
    if base > 0.0 {
        value / base * 100.0
    } else {
        0.0
    }
}

/// KPI cards plus both funnels for the selected window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overview {
    pub report: PeriodReport,
    pub delivery_funnel: Funnel,
    pub messaging_funnel: Funnel,
}

pub fn overview(records: &[AdRecord], filter: &RecordFilter) -> Overview {
    let report = period_report(records, filter);
    Overview {
        delivery_funnel: Funnel::delivery(&report.current.totals),
        messaging_funnel: Funnel::messaging(&report.current.totals),
        report,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub leads: f64,
    pub cpl: f64,
}

/// Per-day totals in date order. Records without a date are left out.
pub fn daily_series(records: &[AdRecord]) -> Vec<DailyPoint> {
    let mut days: BTreeMap<NaiveDate, MetricTotals> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.date {
            days.entry(date).or_default().add_record(record);
        }
    }
    days.into_iter()
        .map(|(date, totals)| DailyPoint {
            date,
            spend: totals.spend,
            impressions: totals.impressions,
            clicks: totals.clicks,
            leads: totals.leads,
            cpl: cpl(totals.spend, totals.leads),
        })
        .collect()
}

/// One row of the top creatives table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeRow {
    #[serde(flatten)]
    pub group: AggregatedGroup,
    pub creative: Creative,
}

impl Rankable for CreativeRow {
    fn name(&self) -> &str {
        self.group.name()
    }
    fn totals(&self) -> &MetricTotals {
        self.group.totals()
    }
    fn metrics(&self) -> &DerivedMetrics {
        self.group.metrics()
    }
    fn categories(&self) -> &Categories {
        self.group.categories()
    }
    fn record_count(&self) -> usize {
        self.group.record_count
    }
}

/// Ad-level groups joined with their creative, ranked.
///
/// The creative is taken from the first record of the ad that has an
/// image, falling back to the ad's first record.
pub fn top_creatives(records: &[AdRecord], ranking: &Ranking) -> Vec<CreativeRow> {
    let mut creatives: HashMap<&str, &Creative> = HashMap::new();
    for record in records {
        let has_image = record.creative.image_url != NOT_AVAILABLE;
        creatives
            .entry(record.ad_identity())
            .and_modify(|current| {
                if current.image_url == NOT_AVAILABLE && has_image {
                    *current = &record.creative;
                }
            })
            .or_insert(&record.creative);
    }

    let rows = aggregate(records, Dimension::Ad)
        .into_iter()
        .map(|group| {
            let creative = creatives
                .get(group.key.id.as_str())
                .map(|c| (*c).clone())
                .unwrap_or_default();
            CreativeRow { group, creative }
        })
        .collect();
    ranking.apply(rows)
}

/// Ranked breakdown along one dimension.
pub fn breakdown(
    records: &[AdRecord],
    dimension: Dimension,
    ranking: &Ranking,
) -> Vec<AggregatedGroup> {
    ranking.apply(aggregate(records, dimension))
}
