//! Campaign → ad set → ad rollup.
//!
//! Every record is accumulated into its ad leaf and, in the same pass,
//! into the enclosing ad set and campaign, so parent totals always equal
//! the sum of their children. Ratios are derived once all records are in.

use adboard_core::{AdRecord, Creative};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::aggregate::Categories;
use crate::metrics::{DerivedMetrics, MetricTotals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeLevel {
    Campaign,
    AdSet,
    Ad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub level: NodeLevel,
    pub id: String,
    pub name: String,
    pub totals: MetricTotals,
    pub metrics: DerivedMetrics,
    pub record_count: usize,
    pub categories: Categories,
    /// Set on ad leaves only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creative: Option<Creative>,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    fn new(level: NodeLevel, id: &str, name: &str) -> Self {
        Self {
            level,
            id: id.to_string(),
            name: name.to_string(),
            totals: MetricTotals::default(),
            metrics: DerivedMetrics::default(),
            record_count: 0,
            categories: Categories::default(),
            creative: None,
            children: Vec::new(),
        }
    }

    fn add_record(&mut self, record: &AdRecord) {
        self.totals.add_record(record);
        self.record_count += 1;
        self.categories.observe(record);
    }

    fn derive_rates(&mut self) {
        for child in &mut self.children {
            child.derive_rates();
        }
        self.metrics = self.totals.derived();
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

struct AdSetSlot {
    node: HierarchyNode,
    ads: HashMap<String, usize>,
}

struct CampaignSlot {
    node: HierarchyNode,
    adsets: Vec<AdSetSlot>,
    adset_index: HashMap<String, usize>,
}

/// Build the campaign tree. Campaigns are keyed by name, ad sets by
/// (campaign, ad set name) and ads by ad identity within their ad set.
/// Nodes appear in order of first occurrence.
pub fn build_hierarchy(records: &[AdRecord]) -> Vec<HierarchyNode> {
    let mut campaigns: Vec<CampaignSlot> = Vec::new();
    let mut campaign_index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let c = *campaign_index
            .entry(record.campaign_name.clone())
            .or_insert_with(|| {
                campaigns.push(CampaignSlot {
                    node: HierarchyNode::new(
                        NodeLevel::Campaign,
                        &record.campaign_id,
                        &record.campaign_name,
                    ),
                    adsets: Vec::new(),
                    adset_index: HashMap::new(),
                });
                campaigns.len() - 1
            });
        let campaign = &mut campaigns[c];

        let s = *campaign
            .adset_index
            .entry(record.adset_name.clone())
            .or_insert_with(|| {
                campaign.adsets.push(AdSetSlot {
                    node: HierarchyNode::new(NodeLevel::AdSet, &record.adset_id, &record.adset_name),
                    ads: HashMap::new(),
                });
                campaign.adsets.len() - 1
            });
        let adset = &mut campaign.adsets[s];

        let a = *adset
            .ads
            .entry(record.ad_identity().to_string())
            .or_insert_with(|| {
                let mut leaf =
                    HierarchyNode::new(NodeLevel::Ad, record.ad_identity(), &record.ad_name);
                leaf.creative = Some(record.creative.clone());
                adset.node.children.push(leaf);
                adset.node.children.len() - 1
            });

        adset.node.children[a].add_record(record);
        adset.node.add_record(record);
        campaign.node.add_record(record);
    }

    campaigns
        .into_iter()
        .map(|slot| {
            let mut node = slot.node;
            node.children = slot.adsets.into_iter().map(|s| s.node).collect();
            node.derive_rates();
            node
        })
        .collect()
}

/// Sum of the top-level totals of a tree.
pub fn tree_totals(nodes: &[HierarchyNode]) -> MetricTotals {
    let mut totals = MetricTotals::default();
    for node in nodes {
        totals.merge(&node.totals);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record_in;

    fn sample() -> Vec<AdRecord> {
        vec![
            record_in("Campanha A", "Conjunto 1", "ad-1", 100.0, 10.0),
            record_in("Campanha A", "Conjunto 1", "ad-1", 20.0, 2.0),
            record_in("Campanha A", "Conjunto 1", "ad-2", 30.0, 0.0),
            record_in("Campanha A", "Conjunto 2", "ad-3", 40.0, 4.0),
            record_in("Campanha B", "Conjunto 1", "ad-4", 50.0, 5.0),
        ]
    }

    fn assert_children_sum(node: &HierarchyNode) {
        if node.children.is_empty() {
            return;
        }
        let spend: f64 = node.children.iter().map(|c| c.totals.spend).sum();
        let leads: f64 = node.children.iter().map(|c| c.totals.leads).sum();
        assert!((node.totals.spend - spend).abs() < 1e-9, "{}", node.name);
        assert!((node.totals.leads - leads).abs() < 1e-9, "{}", node.name);
        for child in &node.children {
            assert_children_sum(child);
        }
    }

    #[test]
    fn test_tree_shape() {
        let tree = build_hierarchy(&sample());
        assert_eq!(tree.len(), 2);

        let a = &tree[0];
        assert_eq!(a.name, "Campanha A");
        assert_eq!(a.level, NodeLevel::Campaign);
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.children[0].children.len(), 2);
        assert_eq!(a.children[1].children.len(), 1);
        assert_eq!(a.children[0].children[0].level, NodeLevel::Ad);
        assert_eq!(a.children[0].children[0].record_count, 2);
        assert!(a.children[0].children[0].creative.is_some());
        assert!(a.creative.is_none());

        // same ad set name under a different campaign is a different node
        let b = &tree[1];
        assert_eq!(b.children.len(), 1);
        assert_eq!(b.children[0].totals.spend, 50.0);
    }

    #[test]
    fn test_parents_equal_sum_of_children() {
        let tree = build_hierarchy(&sample());
        for campaign in &tree {
            assert_children_sum(campaign);
        }
        assert_eq!(tree_totals(&tree).spend, 240.0);
    }

    #[test]
    fn test_rates_derived_at_every_level() {
        let tree = build_hierarchy(&sample());
        let a = &tree[0];
        assert!((a.metrics.cpl - 190.0 / 16.0).abs() < 1e-9);
        let adset = &a.children[0];
        assert!((adset.metrics.cpl - 150.0 / 12.0).abs() < 1e-9);
        let leaf = &adset.children[1];
        assert_eq!(leaf.metrics.cpl, 0.0);
    }

    #[test]
    fn test_no_empty_nodes() {
        assert!(build_hierarchy(&[]).is_empty());
        let tree = build_hierarchy(&sample());
        assert_eq!(tree.iter().map(|n| n.node_count()).sum::<usize>(), 2 + 3 + 4);
    }
}
