//! Sorting, secondary filtering and top-N truncation of aggregated rows.
//!
//! Sorting uses `slice::sort_by`, which is guaranteed stable: rows with
//! equal sort values keep their incoming order.

use adboard_core::AdboardError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::aggregate::{AggregatedGroup, Categories, CategoryField};
use crate::hierarchy::HierarchyNode;
use crate::metrics::{DerivedMetrics, MetricTotals};

/// Anything carrying totals, derived metrics and a display name.
pub trait Rankable {
    fn name(&self) -> &str;
    fn totals(&self) -> &MetricTotals;
    fn metrics(&self) -> &DerivedMetrics;
    fn categories(&self) -> &Categories;
    fn record_count(&self) -> usize;
}

impl Rankable for AggregatedGroup {
    fn name(&self) -> &str {
        &self.key.label
    }
    fn totals(&self) -> &MetricTotals {
        &self.totals
    }
    fn metrics(&self) -> &DerivedMetrics {
        &self.metrics
    }
    fn categories(&self) -> &Categories {
        &self.categories
    }
    fn record_count(&self) -> usize {
        self.record_count
    }
}

impl Rankable for HierarchyNode {
    fn name(&self) -> &str {
        &self.name
    }
    fn totals(&self) -> &MetricTotals {
        &self.totals
    }
    fn metrics(&self) -> &DerivedMetrics {
        &self.metrics
    }
    fn categories(&self) -> &Categories {
        &self.categories
    }
    fn record_count(&self) -> usize {
        self.record_count
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Spend,
    Impressions,
    Clicks,
    Leads,
    Purchases,
    Reach,
    Revenue,
    Records,
    Cpl,
    Ctr,
    Cpm,
    Cpc,
    Frequency,
    Roas,
}

impl SortKey {
    pub fn value<T: Rankable + ?Sized>(&self, item: &T) -> f64 {
        let totals = item.totals();
        let metrics = item.metrics();
        match self {
            Self::Spend => totals.spend,
            Self::Impressions => totals.impressions,
            Self::Clicks => totals.clicks,
            Self::Leads => totals.leads,
            Self::Purchases => totals.purchases,
            Self::Reach => totals.reach,
            Self::Revenue => totals.revenue,
            Self::Records => item.record_count() as f64,
            Self::Cpl => metrics.cpl,
            Self::Ctr => metrics.ctr,
            Self::Cpm => metrics.cpm,
            Self::Cpc => metrics.cpc,
            Self::Frequency => metrics.frequency,
            Self::Roas => metrics.roas,
        }
    }
}

impl FromStr for SortKey {
    type Err = AdboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spend" => Ok(Self::Spend),
            "impressions" => Ok(Self::Impressions),
            "clicks" => Ok(Self::Clicks),
            "leads" => Ok(Self::Leads),
            "purchases" => Ok(Self::Purchases),
            "reach" => Ok(Self::Reach),
            "revenue" => Ok(Self::Revenue),
            "records" => Ok(Self::Records),
            "cpl" => Ok(Self::Cpl),
            "ctr" => Ok(Self::Ctr),
            "cpm" => Ok(Self::Cpm),
            "cpc" => Ok(Self::Cpc),
            "frequency" => Ok(Self::Frequency),
            "roas" => Ok(Self::Roas),
            other => Err(AdboardError::InvalidArgument(format!(
                "unknown sort key {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Sort, filter and truncate settings for one view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub sort_key: SortKey,
    pub direction: SortDirection,
    pub limit: Option<usize>,
    /// Case-insensitive substring match on the row name.
    pub search: Option<String>,
    /// Equality match on a categorical field; rows whose records disagree
    /// on that field never match.
    pub category: Option<(CategoryField, String)>,
    pub non_zero_spend: bool,
}

impl Ranking {
    pub fn by(sort_key: SortKey, direction: SortDirection) -> Self {
        Self {
            sort_key,
            direction,
            ..Default::default()
        }
    }

    pub fn top(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    fn passes_row_filters<T: Rankable>(&self, item: &T) -> bool {
        if self.non_zero_spend && item.totals().spend <= 0.0 {
            return false;
        }
        if let Some((field, expected)) = &self.category {
            let matches = item
                .categories()
                .get(*field)
                .is_some_and(|v| v.trim().to_lowercase() == expected.trim().to_lowercase());
            if !matches {
                return false;
            }
        }
        true
    }

    fn compare<T: Rankable>(&self, a: &T, b: &T) -> Ordering {
        let ordering = self.sort_key.value(a).total_cmp(&self.sort_key.value(b));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    /// Filter, stable-sort and truncate a flat list.
    pub fn apply<T: Rankable>(&self, items: Vec<T>) -> Vec<T> {
        let needle = self.search_needle();
        let mut kept: Vec<T> = items
            .into_iter()
            .filter(|item| {
                self.passes_row_filters(item)
                    && needle
                        .as_deref()
                        .map_or(true, |n| item.name().to_lowercase().contains(n))
            })
            .collect();
        kept.sort_by(|a, b| self.compare(a, b));
        if let Some(limit) = self.limit {
            kept.truncate(limit);
        }
        kept
    }

    /// Rank a campaign tree. Every level is sorted with the same key; the
    /// search keeps a node when its own name or any descendant matches, and
    /// the limit applies to the top level only.
    pub fn apply_tree(&self, nodes: Vec<HierarchyNode>) -> Vec<HierarchyNode> {
        let needle = self.search_needle();
        let mut kept: Vec<HierarchyNode> = nodes
            .into_iter()
            .filter(|node| self.passes_row_filters(node))
            .filter_map(|node| self.prune(node, needle.as_deref()))
            .collect();
        kept.sort_by(|a, b| self.compare(a, b));
        if let Some(limit) = self.limit {
            kept.truncate(limit);
        }
        kept
    }

    fn prune(&self, mut node: HierarchyNode, needle: Option<&str>) -> Option<HierarchyNode> {
        let self_match = needle.map_or(true, |n| node.name.to_lowercase().contains(n));
        // once a node matches, its whole subtree stays visible
        let child_needle = if self_match { None } else { needle };
        let mut children: Vec<HierarchyNode> = node
            .children
            .into_iter()
            .filter(|child| !self.non_zero_spend || child.totals.spend > 0.0)
            .filter_map(|child| self.prune(child, child_needle))
            .collect();
        children.sort_by(|a, b| self.compare(a, b));
        node.children = children;

        if self_match || !node.children.is_empty() {
            Some(node)
        } else {
            None
        }
    }
}
