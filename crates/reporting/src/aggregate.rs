//! Flat aggregation: one pass over normalized records, summing totals per
//! group key.

use adboard_core::{AdRecord, AdboardError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::keys::{Dimension, GroupKey};
use crate::metrics::{DerivedMetrics, MetricTotals};

/// Value of a categorical field across the records of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    #[default]
    Unset,
    Single(String),
    /// Records of the group disagree on the value.
    Mixed,
}

impl Attribute {
    pub fn observe(&mut self, value: &str) {
        match self {
            Self::Unset => *self = Self::Single(value.to_string()),
            Self::Single(current) if current != value => *self = Self::Mixed,
            _ => {}
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            _ => None,
        }
    }

    fn merge(&mut self, other: &Attribute) {
        match other {
            Self::Unset => {}
            Self::Single(value) => self.observe(value),
            Self::Mixed => *self = Self::Mixed,
        }
    }
}

/// Categorical fields a ranked list can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryField {
    Objective,
    Franchise,
    Platform,
    Campaign,
}

impl FromStr for CategoryField {
    type Err = AdboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "objective" => Ok(Self::Objective),
            "franchise" => Ok(Self::Franchise),
            "platform" => Ok(Self::Platform),
            "campaign" => Ok(Self::Campaign),
            other => Err(AdboardError::InvalidArgument(format!(
                "unknown category field {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Categories {
    pub objective: Attribute,
    pub franchise: Attribute,
    pub platform: Attribute,
    pub campaign: Attribute,
}

impl Categories {
    pub fn observe(&mut self, record: &AdRecord) {
        self.objective.observe(&record.objective);
        self.franchise.observe(&record.franchise);
        self.platform.observe(&record.platform);
        self.campaign.observe(&record.campaign_name);
    }

    pub fn merge(&mut self, other: &Categories) {
        self.objective.merge(&other.objective);
        self.franchise.merge(&other.franchise);
        self.platform.merge(&other.platform);
        self.campaign.merge(&other.campaign);
    }

    pub fn get(&self, field: CategoryField) -> Option<&str> {
        match field {
            CategoryField::Objective => self.objective.value(),
            CategoryField::Franchise => self.franchise.value(),
            CategoryField::Platform => self.platform.value(),
            CategoryField::Campaign => self.campaign.value(),
        }
    }
}

/// Totals for one group key, with ratios derived from those totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedGroup {
    pub key: GroupKey,
    pub totals: MetricTotals,
    pub metrics: DerivedMetrics,
    pub record_count: usize,
    pub categories: Categories,
}

impl AggregatedGroup {
    fn finish(key: GroupKey, acc: Accumulator) -> Self {
        Self {
            key,
            metrics: acc.totals.derived(),
            totals: acc.totals,
            record_count: acc.record_count,
            categories: acc.categories,
        }
    }
}

#[derive(Default)]
struct Accumulator {
    totals: MetricTotals,
    record_count: usize,
    categories: Categories,
}

/// Group records by an arbitrary single-valued key function.
///
/// Groups come back in order of first occurrence; the spend of all groups
/// sums to the spend of all records.
pub fn aggregate_by<F>(records: &[AdRecord], key_fn: F) -> Vec<AggregatedGroup>
where
    F: Fn(&AdRecord) -> GroupKey,
{
    aggregate_multi(records, |record| vec![key_fn(record)])
}

/// Group records along a breakdown dimension.
pub fn aggregate(records: &[AdRecord], dimension: Dimension) -> Vec<AggregatedGroup> {
    aggregate_multi(records, |record| dimension.keys(record))
}

fn aggregate_multi<F>(records: &[AdRecord], keys_fn: F) -> Vec<AggregatedGroup>
where
    F: Fn(&AdRecord) -> Vec<GroupKey>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(GroupKey, Accumulator)> = Vec::new();

    for record in records {
        for key in keys_fn(record) {
            let slot = match index.get(&key.id) {
                Some(&slot) => slot,
                None => {
                    index.insert(key.id.clone(), groups.len());
                    groups.push((key, Accumulator::default()));
                    groups.len() - 1
                }
            };
            let acc = &mut groups[slot].1;
            acc.totals.add_record(record);
            acc.record_count += 1;
            acc.categories.observe(record);
        }
    }

    groups
        .into_iter()
        .map(|(key, acc)| AggregatedGroup::finish(key, acc))
        .collect()
}

/// Look up a group by key id.
pub fn find_group<'a>(groups: &'a [AggregatedGroup], id: &str) -> Option<&'a AggregatedGroup> {
    groups.iter().find(|g| g.key.id == id)
}
