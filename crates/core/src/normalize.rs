//! Record normalization: coerce loosely typed backend rows into [`AdRecord`]s.
//!
//! Normalization never fails. Missing, `null` or non-finite numbers become
//! zero and empty strings become placeholders. A row is dropped only when
//! it carries no identifying field at all.

use tracing::debug;

use crate::types::{
    parse_record_date, AdRecord, Creative, LeadDefinition, RawRecord, NOT_AVAILABLE, UNKNOWN,
};

/// Normalize a single row. Returns `None` only for rows with no
/// franchise, account, campaign, ad set or ad identification.
pub fn normalize(raw: &RawRecord, lead_definition: LeadDefinition) -> Option<AdRecord> {
    let identifying = [
        &raw.franqueado,
        &raw.account_id,
        &raw.account_name,
        &raw.campaign_id,
        &raw.campaign_name,
        &raw.adset_id,
        &raw.adset_name,
        &raw.ad_id,
        &raw.ad_name,
    ];
    if identifying.iter().all(|field| clean(field).is_none()) {
        return None;
    }

    let form_leads = finite(raw.leads_total);
    let messages_started = finite(raw.msgs_iniciadas);
    let new_contacts = finite(raw.msgs_novos_contatos);
    let purchases = finite(raw.purchases);

    Some(AdRecord {
        franchise: text(&raw.franqueado, UNKNOWN),
        account_id: text(&raw.account_id, NOT_AVAILABLE),
        account_name: text(&raw.account_name, UNKNOWN),
        campaign_id: text(&raw.campaign_id, NOT_AVAILABLE),
        campaign_name: text(&raw.campaign_name, UNKNOWN),
        adset_id: text(&raw.adset_id, NOT_AVAILABLE),
        adset_name: text(&raw.adset_name, UNKNOWN),
        ad_id: text(&raw.ad_id, NOT_AVAILABLE),
        ad_name: text(&raw.ad_name, UNKNOWN),
        objective: text(&raw.objective, UNKNOWN),
        date: clean(&raw.date_start).and_then(parse_record_date),

        spend: finite(raw.spend),
        impressions: finite(raw.impressions),
        clicks: finite(raw.clicks),
        reach: finite(raw.reach),
        purchases,
        revenue: finite(raw.revenue),
        leads: lead_definition.leads(form_leads, messages_started, new_contacts, purchases),
        form_leads,
        messages_started,
        messaging_connections: finite(raw.msgs_conexoes),
        new_contacts,
        depth_two_conversations: finite(raw.msgs_profundidade_2),

        reported_cpc: finite(raw.cpc),
        reported_ctr: finite(raw.ctr),
        reported_cpm: finite(raw.cpm),
        reported_frequency: finite(raw.frequency),

        platform: text(&raw.publisher_platform, UNKNOWN),
        interests: text(&raw.interests, NOT_AVAILABLE),
        location: text(&raw.location, UNKNOWN),
        age_range: text(&raw.age_range, UNKNOWN),
        creative: Creative {
            image_url: text(&raw.ad_image_url, NOT_AVAILABLE),
            title: text(&raw.ad_title, NOT_AVAILABLE),
            body: text(&raw.ad_body, NOT_AVAILABLE),
            post_link: text(&raw.ad_post_link, NOT_AVAILABLE),
        },
    })
}

/// Normalize a batch, silently dropping unidentifiable rows.
pub fn normalize_all(raws: &[RawRecord], lead_definition: LeadDefinition) -> Vec<AdRecord> {
    let mut records = Vec::with_capacity(raws.len());
    let mut skipped = 0u64;
    for (index, raw) in raws.iter().enumerate() {
        match normalize(raw, lead_definition) {
            Some(record) => records.push(record),
            None => {
                skipped += 1;
                debug!(row = index, "Skipping row without identifying fields");
            }
        }
    }
    metrics::counter!("normalize.rows_accepted").increment(records.len() as u64);
    metrics::counter!("normalize.rows_skipped").increment(skipped);
    debug!(
        accepted = records.len(),
        skipped,
        leads = %lead_definition,
        "Normalized backend rows"
    );
    records
}

fn finite(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn clean(value: &Option<String>) -> Option<&str> {
    let trimmed = value.as_deref()?.trim();
    if trimmed.is_empty() || trimmed == "null" || trimmed == "undefined" {
        None
    } else {
        Some(trimmed)
    }
}

fn text(value: &Option<String>, placeholder: &str) -> String {
    clean(value).unwrap_or(placeholder).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw(json: &str) -> RawRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_missing_numbers_default_to_zero() {
        let record = normalize(&raw(r#"{"ad_id": "A"}"#), LeadDefinition::default()).unwrap();
        assert_eq!(record.spend, 0.0);
        assert_eq!(record.impressions, 0.0);
        assert_eq!(record.leads, 0.0);
        assert_eq!(record.reported_ctr, 0.0);
    }

    #[test]
    fn test_non_finite_numbers_become_zero() {
        let record = normalize(
            &raw(r#"{"ad_id": "A", "spend": "NaN", "clicks": "inf", "impressions": "-inf"}"#),
            LeadDefinition::default(),
        )
        .unwrap();
        assert_eq!(record.spend, 0.0);
        assert_eq!(record.clicks, 0.0);
        assert_eq!(record.impressions, 0.0);
    }

    #[test]
    fn test_placeholders_for_empty_strings() {
        let record = normalize(
            &raw(r#"{"campaign_name": "Black Friday", "location": "  ", "ad_title": null}"#),
            LeadDefinition::default(),
        )
        .unwrap();
        assert_eq!(record.campaign_name, "Black Friday");
        assert_eq!(record.location, UNKNOWN);
        assert_eq!(record.age_range, UNKNOWN);
        assert_eq!(record.ad_id, NOT_AVAILABLE);
        assert_eq!(record.creative.title, NOT_AVAILABLE);
        assert_eq!(record.ad_identity(), UNKNOWN);
    }

    #[test]
    fn test_locale_formatted_spend_is_kept() {
        let rows = vec![
            raw(r#"{"ad_id": "A", "spend": "1.234,56"}"#),
            raw(r#"{"ad_id": "B", "spend": "1,000.44"}"#),
        ];
        let total: f64 = normalize_all(&rows, LeadDefinition::default())
            .iter()
            .map(|r| r.spend)
            .sum();
        assert!((total - 2235.0).abs() < 1e-9);
    }

    #[test]
    fn test_unidentifiable_rows_are_skipped() {
        let rows = vec![
            raw(r#"{"spend": 10, "impressions": 100}"#),
            raw(r#"{"ad_name": "undefined", "campaign_id": ""}"#),
            raw(r#"{"franqueado": "Loja Centro", "spend": 5}"#),
        ];
        let records = normalize_all(&rows, LeadDefinition::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].franchise, "Loja Centro");
        assert_eq!(records[0].spend, 5.0);
    }

    #[test]
    fn test_leads_follow_configured_definition() {
        let row = raw(
            r#"{"ad_id": "A", "leads_total": 3, "msgs_iniciadas": 10,
                "msgs_novos_contatos": 4, "purchases": 2}"#,
        );
        assert_eq!(normalize(&row, LeadDefinition::MessagesStarted).unwrap().leads, 10.0);
        assert_eq!(normalize(&row, LeadDefinition::FormsAndNewContacts).unwrap().leads, 7.0);
        assert_eq!(
            normalize(&row, LeadDefinition::FormsContactsAndPurchases).unwrap().leads,
            9.0
        );
    }

    #[test]
    fn test_date_is_parsed_to_calendar_day() {
        let record = normalize(
            &raw(r#"{"ad_id": "A", "date_start": "2024-02-29T00:00:00Z"}"#),
            LeadDefinition::default(),
        )
        .unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 2, 29));

        let undated = normalize(&raw(r#"{"ad_id": "A", "date_start": "soon"}"#), LeadDefinition::default())
            .unwrap();
        assert_eq!(undated.date, None);
    }
}
