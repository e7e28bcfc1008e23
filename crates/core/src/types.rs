use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AdboardError;

/// Placeholder for categorical fields (names, cities, age ranges) the
/// backend left empty.
pub const UNKNOWN: &str = "Desconhecido";

/// Placeholder for identifiers and free-text creative fields.
pub const NOT_AVAILABLE: &str = "-";

/// One row per ad x day, exactly as delivered by the backend.
///
/// Every field is optional. Numeric fields tolerate JSON numbers, numeric
/// strings and `null`; identifiers tolerate numbers as well as strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient::text")]
    pub franqueado: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub account_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub account_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub campaign_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub campaign_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub adset_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub adset_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub ad_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub ad_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub objective: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub date_start: Option<String>,

    // Cost metrics
    #[serde(default, deserialize_with = "lenient::number")]
    pub spend: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub cpc: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub ctr: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub cpm: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub frequency: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub reach: Option<f64>,

    // Funnel volumes
    #[serde(default, deserialize_with = "lenient::number")]
    pub impressions: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub clicks: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub leads_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub purchases: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub revenue: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub msgs_iniciadas: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub msgs_conexoes: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub msgs_novos_contatos: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub msgs_profundidade_2: Option<f64>,

    // Targeting
    #[serde(default, deserialize_with = "lenient::text")]
    pub publisher_platform: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub interests: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub age_range: Option<String>,

    // Creative
    #[serde(default, deserialize_with = "lenient::text")]
    pub ad_image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub ad_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub ad_body: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub ad_post_link: Option<String>,
}

/// Creative metadata attached to an ad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creative {
    pub image_url: String,
    pub title: String,
    pub body: String,
    pub post_link: String,
}

impl Default for Creative {
    fn default() -> Self {
        Self {
            image_url: NOT_AVAILABLE.to_string(),
            title: NOT_AVAILABLE.to_string(),
            body: NOT_AVAILABLE.to_string(),
            post_link: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Canonical per-row record. Every metric is a finite number and every
/// string field holds either a value or a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdRecord {
    pub franchise: String,
    pub account_id: String,
    pub account_name: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub adset_id: String,
    pub adset_name: String,
    pub ad_id: String,
    pub ad_name: String,
    pub objective: String,
    /// Calendar day of the row; `None` when the backend date was unusable.
    pub date: Option<NaiveDate>,

    pub spend: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub reach: f64,
    pub purchases: f64,
    pub revenue: f64,
    /// Leads under the configured [`LeadDefinition`].
    pub leads: f64,
    pub form_leads: f64,
    pub messages_started: f64,
    pub messaging_connections: f64,
    pub new_contacts: f64,
    pub depth_two_conversations: f64,

    /// Ratios as reported by the backend. Display only: aggregated views
    /// always recompute ratios from summed totals.
    pub reported_cpc: f64,
    pub reported_ctr: f64,
    pub reported_cpm: f64,
    pub reported_frequency: f64,

    pub platform: String,
    pub interests: String,
    pub location: String,
    pub age_range: String,
    pub creative: Creative,
}

impl AdRecord {
    /// Identity of the ad leaf: the ad id, or the ad name when the id is
    /// missing.
    pub fn ad_identity(&self) -> &str {
        if self.ad_id != NOT_AVAILABLE {
            &self.ad_id
        } else {
            &self.ad_name
        }
    }
}

/// Which funnel volumes count as a "lead".
///
/// Views used to disagree on this; the dashboard now picks one definition
/// per session and applies it during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadDefinition {
    /// `msgs_iniciadas`
    MessagesStarted,
    /// `leads_total + msgs_novos_contatos`
    #[default]
    FormsAndNewContacts,
    /// `leads_total + msgs_novos_contatos + purchases`
    FormsContactsAndPurchases,
}

impl LeadDefinition {
    pub fn leads(
        &self,
        form_leads: f64,
        messages_started: f64,
        new_contacts: f64,
        purchases: f64,
    ) -> f64 {
        match self {
            Self::MessagesStarted => messages_started,
            Self::FormsAndNewContacts => form_leads + new_contacts,
            Self::FormsContactsAndPurchases => form_leads + new_contacts + purchases,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessagesStarted => "messages_started",
            Self::FormsAndNewContacts => "forms_and_new_contacts",
            Self::FormsContactsAndPurchases => "forms_contacts_and_purchases",
        }
    }
}

impl fmt::Display for LeadDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadDefinition {
    type Err = AdboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "messages_started" => Ok(Self::MessagesStarted),
            "forms_and_new_contacts" => Ok(Self::FormsAndNewContacts),
            "forms_contacts_and_purchases" => Ok(Self::FormsContactsAndPurchases),
            other => Err(AdboardError::InvalidArgument(format!(
                "lead definition must be one of: messages_started, forms_and_new_contacts, \
                 forms_contacts_and_purchases (got {other:?})"
            ))),
        }
    }
}

/// Parse a backend `date_start` into a calendar day.
///
/// Only the leading `YYYY-MM-DD` is read, so timestamps with a time or
/// offset suffix resolve to the day they were written for instead of
/// shifting across midnight. `DD/MM/YYYY` is accepted as well.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Some(head) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(date) = NaiveDate::parse_from_str(head, "%d/%m/%Y") {
            return Some(date);
        }
    }
    None
}

/// Tolerant deserializers for loosely typed backend columns.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(parse_number))
    }

    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
    }

    fn parse_number(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_localized(s.trim()),
            _ => None,
        }
    }

    /// Numeric strings from locale-formatted exports. The last separator
    /// present is the decimal mark; the other one groups thousands.
    fn parse_localized(raw: &str) -> Option<f64> {
        if raw.is_empty() {
            return None;
        }
        if let Ok(value) = raw.parse::<f64>() {
            return Some(value);
        }
        let commas = raw.matches(',').count();
        let dots = raw.matches('.').count();
        let normalized = match (raw.rfind(','), raw.rfind('.')) {
            // "1.234,56"
            (Some(comma), Some(dot)) if comma > dot => raw.replace('.', "").replace(',', "."),
            // "1,234.5"
            (Some(_), Some(_)) => raw.replace(',', ""),
            // "12,5"
            (Some(_), None) if commas == 1 => raw.replace(',', "."),
            // "1,234,567"
            (Some(_), None) => raw.replace(',', ""),
            // "1.234.567"
            (None, Some(_)) if dots > 1 => raw.replace('.', ""),
            _ => return None,
        };
        normalized.parse::<f64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_accepts_loose_numbers() {
        let raw: RawRecord = serde_json::from_str(
            r#"{
                "ad_id": 12345,
                "spend": "10.5",
                "impressions": 1000,
                "clicks": null,
                "reach": "",
                "cpm": "7,25"
            }"#,
        )
        .unwrap();
        assert_eq!(raw.ad_id.as_deref(), Some("12345"));
        assert_eq!(raw.spend, Some(10.5));
        assert_eq!(raw.impressions, Some(1000.0));
        assert_eq!(raw.clicks, None);
        assert_eq!(raw.reach, None);
        assert_eq!(raw.cpm, Some(7.25));
        assert_eq!(raw.leads_total, None);
    }

    #[test]
    fn test_raw_record_accepts_thousands_separators() {
        let raw: RawRecord = serde_json::from_str(
            r#"{
                "spend": "1.234,56",
                "impressions": "1,234.5",
                "clicks": "12,5",
                "reach": "1.234.567",
                "revenue": "2,500,000"
            }"#,
        )
        .unwrap();
        assert_eq!(raw.spend, Some(1234.56));
        assert_eq!(raw.impressions, Some(1234.5));
        assert_eq!(raw.clicks, Some(12.5));
        assert_eq!(raw.reach, Some(1234567.0));
        assert_eq!(raw.revenue, Some(2500000.0));
    }

    #[test]
    fn test_raw_record_rejects_garbage_numbers_as_absent() {
        let raw: RawRecord =
            serde_json::from_str(r#"{"spend": "abc", "clicks": [1], "reach": {"a": 1}}"#).unwrap();
        assert_eq!(raw.spend, None);
        assert_eq!(raw.clicks, None);
        assert_eq!(raw.reach, None);
    }

    #[test]
    fn test_parse_record_date_ignores_time_suffix() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 31);
        assert_eq!(parse_record_date("2024-03-31"), expected);
        assert_eq!(parse_record_date("2024-03-31T23:30:00-03:00"), expected);
        assert_eq!(parse_record_date("31/03/2024"), expected);
        assert_eq!(parse_record_date("2024-13-01"), None);
        assert_eq!(parse_record_date("yesterday"), None);
        assert_eq!(parse_record_date(""), None);
    }

    #[test]
    fn test_lead_definitions() {
        assert_eq!(LeadDefinition::MessagesStarted.leads(4.0, 7.0, 2.0, 1.0), 7.0);
        assert_eq!(LeadDefinition::FormsAndNewContacts.leads(4.0, 7.0, 2.0, 1.0), 6.0);
        assert_eq!(
            LeadDefinition::FormsContactsAndPurchases.leads(4.0, 7.0, 2.0, 1.0),
            7.0
        );
    }

    #[test]
    fn test_lead_definition_from_str() {
        assert_eq!(
            "messages_started".parse::<LeadDefinition>().unwrap(),
            LeadDefinition::MessagesStarted
        );
        assert!("everything".parse::<LeadDefinition>().is_err());
        assert_eq!(
            LeadDefinition::default().to_string(),
            "forms_and_new_contacts"
        );
    }
}
