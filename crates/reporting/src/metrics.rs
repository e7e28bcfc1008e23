//! Derived efficiency metrics and the summed totals they are computed from.
//!
//! Every ratio guards its denominator and returns `0.0` instead of NaN or
//! infinity, so downstream sorting and formatting never see non-finite
//! values.

use adboard_core::AdRecord;
use serde::{Deserialize, Serialize};

/// Cost per lead.
pub fn cpl(spend: f64, leads: f64) -> f64 {
    ratio(spend, leads)
}

/// Click-through rate, in percent.
pub fn ctr(clicks: f64, impressions: f64) -> f64 {
    ratio(clicks, impressions) * 100.0
}

/// Cost per thousand impressions.
pub fn cpm(spend: f64, impressions: f64) -> f64 {
    ratio(spend, impressions) * 1000.0
}

/// Cost per click.
pub fn cpc(spend: f64, clicks: f64) -> f64 {
    ratio(spend, clicks)
}

/// Average impressions per reached user.
pub fn frequency(impressions: f64, reach: f64) -> f64 {
    ratio(impressions, reach)
}

/// Return on ad spend.
pub fn roas(revenue: f64, spend: f64) -> f64 {
    ratio(revenue, spend)
}

/// Period-over-period change in percent; `0.0` when there is no previous
/// value to compare against.
pub fn delta_pct(current: f64, previous: f64) -> f64 {
    if previous == 0.0 || !previous.is_finite() {
        return 0.0;
    }
    let delta = (current - previous) / previous * 100.0;
    if delta.is_finite() {
        delta
    } else {
        0.0
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        let value = numerator / denominator;
        if value.is_finite() {
            value
        } else {
            0.0
        }
    } else {
        0.0
    }
}

/// Additive totals accumulated per group, node or period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub leads: f64,
    pub purchases: f64,
    pub reach: f64,
    pub revenue: f64,
    pub form_leads: f64,
    pub messages_started: f64,
    pub messaging_connections: f64,
    pub new_contacts: f64,
    pub depth_two_conversations: f64,
}

impl MetricTotals {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AdRecord>) -> Self {
        let mut totals = Self::default();
        for record in records {
            totals.add_record(record);
        }
        totals
    }

    pub fn add_record(&mut self, record: &AdRecord) {
        self.spend += record.spend;
        self.impressions += record.impressions;
        self.clicks += record.clicks;
        self.leads += record.leads;
        self.purchases += record.purchases;
        self.reach += record.reach;
        self.revenue += record.revenue;
        self.form_leads += record.form_leads;
        self.messages_started += record.messages_started;
        self.messaging_connections += record.messaging_connections;
        self.new_contacts += record.new_contacts;
        self.depth_two_conversations += record.depth_two_conversations;
    }

    pub fn merge(&mut self, other: &MetricTotals) {
        self.spend += other.spend;
        self.impressions += other.impressions;
        self.clicks += other.clicks;
        self.leads += other.leads;
        self.purchases += other.purchases;
        self.reach += other.reach;
        self.revenue += other.revenue;
        self.form_leads += other.form_leads;
        self.messages_started += other.messages_started;
        self.messaging_connections += other.messaging_connections;
        self.new_contacts += other.new_contacts;
        self.depth_two_conversations += other.depth_two_conversations;
    }

    /// Recompute every ratio from these totals.
    pub fn derived(&self) -> DerivedMetrics {
        DerivedMetrics {
            cpl: cpl(self.spend, self.leads),
            ctr: ctr(self.clicks, self.impressions),
            cpm: cpm(self.spend, self.impressions),
            cpc: cpc(self.spend, self.clicks),
            frequency: frequency(self.impressions, self.reach),
            roas: roas(self.revenue, self.spend),
        }
    }
}

/// Ratios derived from a [`MetricTotals`]. Never accumulated or averaged:
/// always rebuilt through [`MetricTotals::derived`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub cpl: f64,
    pub ctr: f64,
    pub cpm: f64,
    pub cpc: f64,
    pub frequency: f64,
    pub roas: f64,
}
