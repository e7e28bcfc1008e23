//! Grouping keys: which bucket a record falls into for each breakdown
//! dimension, with categorical values normalized so that spelling
//! variants collapse into one group.

use adboard_core::types::{NOT_AVAILABLE, UNKNOWN};
use adboard_core::{AdRecord, AdboardError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Age bins reported by the ad platform.
pub const AGE_BINS: [&str; 7] = ["13-17", "18-24", "25-34", "35-44", "45-54", "55-64", "65+"];

/// A group identity plus the label shown for it. Records are grouped by
/// `id`; `label` comes from the first record seen for that id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub id: String,
    pub label: String,
}

impl GroupKey {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    fn same(value: &str) -> Self {
        Self::new(value, value)
    }
}

/// Breakdown dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Ad,
    AdSet,
    Campaign,
    Objective,
    City,
    AgeRange,
    Platform,
    Franchise,
    Account,
    Date,
    /// Multi-valued: a record counts toward each of its interest tags, so
    /// totals across interest groups can exceed the record totals.
    Interest,
}

impl Dimension {
    /// Keys for a record under this dimension. Exactly one key for every
    /// dimension except [`Dimension::Interest`].
    pub fn keys(&self, record: &AdRecord) -> Vec<GroupKey> {
        match self {
            Self::Interest => interest_tags(&record.interests),
            _ => vec![self.key(record)],
        }
    }

    fn key(&self, record: &AdRecord) -> GroupKey {
        match self {
            Self::Ad => GroupKey::new(record.ad_identity(), &record.ad_name),
            Self::AdSet => {
                let id = if record.adset_id != NOT_AVAILABLE {
                    &record.adset_id
                } else {
                    &record.adset_name
                };
                GroupKey::new(id, &record.adset_name)
            }
            Self::Campaign => GroupKey::same(&record.campaign_name),
            Self::Objective => objective_key(&record.objective),
            Self::City => city_key(&record.location),
            Self::AgeRange => GroupKey::same(age_bin(&record.age_range)),
            Self::Platform => GroupKey::new(record.platform.to_lowercase(), &record.platform),
            Self::Franchise => GroupKey::same(&record.franchise),
            Self::Account => GroupKey::new(&record.account_id, &record.account_name),
            Self::Date => match record.date {
                Some(date) => GroupKey::same(&date.format("%Y-%m-%d").to_string()),
                None => GroupKey::same(UNKNOWN),
            },
            Self::Interest => interest_tags(&record.interests)
                .into_iter()
                .next()
                .unwrap_or_else(|| GroupKey::same(UNKNOWN)),
        }
    }

    pub fn is_additive(&self) -> bool {
        !matches!(self, Self::Interest)
    }
}

impl FromStr for Dimension {
    type Err = AdboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ad" => Ok(Self::Ad),
            "adset" | "ad_set" => Ok(Self::AdSet),
            "campaign" => Ok(Self::Campaign),
            "objective" => Ok(Self::Objective),
            "city" => Ok(Self::City),
            "age" | "age_range" => Ok(Self::AgeRange),
            "platform" => Ok(Self::Platform),
            "franchise" => Ok(Self::Franchise),
            "account" => Ok(Self::Account),
            "date" => Ok(Self::Date),
            "interest" => Ok(Self::Interest),
            other => Err(AdboardError::InvalidArgument(format!(
                "unknown dimension {other:?}"
            ))),
        }
    }
}

/// Display form of a targeted location: radius annotations such as
/// `(+20km)` and everything after the first comma or ` - ` separator are
/// dropped. `"Patrocínio, Minas Gerais (+20km)"` becomes `"Patrocínio"`.
pub fn city_label(raw: &str) -> String {
    let mut without_annotations = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => without_annotations.push(c),
            _ => {}
        }
    }

    let head = without_annotations
        .split(',')
        .next()
        .unwrap_or_default()
        .split(" - ")
        .next()
        .unwrap_or_default();
    let collapsed = head.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        UNKNOWN.to_string()
    } else {
        collapsed
    }
}

/// Case-insensitive city group key; the label keeps the first spelling seen.
pub fn city_key(raw: &str) -> GroupKey {
    let label = city_label(raw);
    GroupKey::new(label.to_lowercase(), label)
}

fn objective_key(raw: &str) -> GroupKey {
    GroupKey::new(raw.trim().to_uppercase(), raw.trim())
}

/// Map a free-form age range ("18-24", "18 - 24", "65+", "65-") onto one of
/// [`AGE_BINS`], or the unknown placeholder.
pub fn age_bin(raw: &str) -> &'static str {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let Ok(lower) = digits.parse::<u32>() else {
        return UNKNOWN;
    };
    match lower {
        13..=17 => AGE_BINS[0],
        18..=24 => AGE_BINS[1],
        25..=34 => AGE_BINS[2],
        35..=44 => AGE_BINS[3],
        45..=54 => AGE_BINS[4],
        55..=64 => AGE_BINS[5],
        65.. => AGE_BINS[6],
        _ => UNKNOWN,
    }
}

/// Split an interest list ("Futebol, Esportes; Viagem") into distinct
/// case-insensitive tags.
pub fn interest_tags(raw: &str) -> Vec<GroupKey> {
    let mut tags: Vec<GroupKey> = Vec::new();
    for part in raw.split([',', ';', '|']) {
        let label = part.split_whitespace().collect::<Vec<_>>().join(" ");
        if label.is_empty() || label == NOT_AVAILABLE || label == UNKNOWN {
            continue;
        }
        let id = label.to_lowercase();
        if !tags.iter().any(|t| t.id == id) {
            tags.push(GroupKey::new(id, label));
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_annotations_collapse() {
        assert_eq!(city_label("Patrocínio, Minas Gerais (+20km)"), "Patrocínio");
        assert_eq!(city_label("Patrocínio, Minas Gerais"), "Patrocínio");
        assert_eq!(city_label("  Patrocínio (+ 15 km) "), "Patrocínio");
        assert_eq!(city_label("Uberlândia - MG, Brasil"), "Uberlândia");
        assert_eq!(city_label("São  José dos Campos"), "São José dos Campos");
        assert_eq!(city_label("(+20km)"), UNKNOWN);
    }

    #[test]
    fn test_city_key_is_case_insensitive() {
        let a = city_key("Patrocínio, Minas Gerais (+20km)");
        let b = city_key("Patrocínio");
        let c = city_key("PATROCÍNIO, MG");
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, c.id);
        assert_eq!(a.label, "Patrocínio");
    }

    #[test]
    fn test_age_bins() {
        assert_eq!(age_bin("18-24"), "18-24");
        assert_eq!(age_bin("18 - 24"), "18-24");
        assert_eq!(age_bin("65+"), "65+");
        assert_eq!(age_bin("70"), "65+");
        assert_eq!(age_bin("Desconhecido"), UNKNOWN);
        assert_eq!(age_bin("8-12"), UNKNOWN);
    }

    #[test]
    fn test_interest_tags_dedupe() {
        let tags = interest_tags("Futebol, esportes; ESPORTES | Viagem ,, -");
        let labels: Vec<_> = tags.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Futebol", "esportes", "Viagem"]);
        assert!(interest_tags(NOT_AVAILABLE).is_empty());
    }

    #[test]
    fn test_dimension_from_str() {
        assert_eq!("city".parse::<Dimension>().unwrap(), Dimension::City);
        assert_eq!("ad_set".parse::<Dimension>().unwrap(), Dimension::AdSet);
        assert!("galaxy".parse::<Dimension>().is_err());
        assert!(!Dimension::Interest.is_additive());
        assert!(Dimension::City.is_additive());
    }
}
