//! End-to-end checks: raw backend rows through normalization, filtering,
//! aggregation, ranking and period comparison.

use adboard_core::{normalize_all, LeadDefinition, RawRecord};
use adboard_reporting::aggregate::find_group;
use adboard_reporting::dashboard::{overview, top_creatives};
use adboard_reporting::keys::city_key;
use adboard_reporting::metrics::delta_pct;
use adboard_reporting::{
    aggregate, build_hierarchy, period_report, resolve_range, DateMode, DateRange, Dimension,
    HierarchyNode, Ranking, RecordFilter, SortDirection, SortKey,
};
use chrono::{NaiveDate, Weekday};

fn rows(json: &str) -> Vec<RawRecord> {
    serde_json::from_str(json).unwrap()
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

const DATASET: &str = r#"[
    {"franqueado": "Loja Centro", "account_id": "act_1", "campaign_name": "Leads Março",
     "adset_name": "Público Frio", "ad_id": "A", "ad_name": "Vídeo 1", "objective": "OUTCOME_LEADS",
     "date_start": "2024-03-10", "spend": "100.00", "impressions": 10000, "clicks": 200,
     "reach": 5000, "leads_total": 8, "msgs_novos_contatos": 2,
     "location": "Patrocínio, Minas Gerais (+20km)", "age_range": "25-34",
     "ad_image_url": "https://cdn.example.com/a.jpg"},
    {"franqueado": "Loja Centro", "account_id": "act_1", "campaign_name": "Leads Março",
     "adset_name": "Público Frio", "ad_id": "A", "ad_name": "Vídeo 1", "objective": "OUTCOME_LEADS",
     "date_start": "2024-03-11", "spend": 50, "impressions": 4000, "clicks": null,
     "reach": 3000, "leads_total": 0, "location": "Patrocínio", "age_range": "25-34"},
    {"franqueado": "Loja Centro", "account_id": "act_1", "campaign_name": "Leads Março",
     "adset_name": "Lookalike", "ad_id": "B", "ad_name": "Carrossel", "objective": "OUTCOME_LEADS",
     "date_start": "2024-03-12", "spend": 30, "impressions": 3000, "clicks": 60,
     "reach": 2500, "leads_total": 3, "location": "Araxá, Minas Gerais", "age_range": "35-44"},
    {"franqueado": "Loja Centro", "account_id": "act_1", "campaign_name": "Mensagens",
     "adset_name": "Remarketing", "ad_id": "C", "ad_name": "Estático", "objective": "MESSAGES",
     "date_start": "2024-02-11", "spend": 100, "impressions": 8000, "clicks": 100,
     "reach": 4000, "msgs_iniciadas": 20, "msgs_novos_contatos": 5, "location": "Patrocínio"},
    {"franqueado": "Loja Norte", "account_id": "act_9", "campaign_name": "Outra Loja",
     "adset_name": "Geral", "ad_id": "Z", "ad_name": "Outro", "objective": "MESSAGES",
     "date_start": "2024-03-10", "spend": 999, "impressions": 1, "clicks": 1}
]"#;

#[test]
fn test_flat_aggregate_scenario() {
    let records = normalize_all(
        &rows(
            r#"[
                {"ad_id": "A", "spend": 100, "leads_total": 10},
                {"ad_id": "A", "spend": 50, "leads_total": 0},
                {"ad_id": "B", "spend": 30, "leads_total": 3}
            ]"#,
        ),
        LeadDefinition::FormsAndNewContacts,
    );

    let groups = aggregate(&records, Dimension::Ad);
    let a = find_group(&groups, "A").unwrap();
    assert_eq!((a.totals.spend, a.totals.leads, a.metrics.cpl), (150.0, 10.0, 15.0));
    let b = find_group(&groups, "B").unwrap();
    assert_eq!((b.totals.spend, b.totals.leads, b.metrics.cpl), (30.0, 3.0, 10.0));

    let ranked = Ranking::by(SortKey::Spend, SortDirection::Descending).apply(groups);
    let ids: Vec<_> = ranked.iter().map(|g| g.key.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
}

#[test]
fn test_delta_scenario() {
    assert_eq!(delta_pct(150.0, 100.0), 50.0);
    assert_eq!(delta_pct(150.0, 0.0), 0.0);
}

#[test]
fn test_city_grouping_scenario() {
    assert_eq!(
        city_key("Patrocínio, Minas Gerais (+20km)").id,
        city_key("Patrocínio").id
    );

    let records = normalize_all(&rows(DATASET), LeadDefinition::default());
    let cities = aggregate(&records, Dimension::City);
    let patrocinio = find_group(&cities, "patrocínio").unwrap();
    assert_eq!(patrocinio.key.label, "Patrocínio");
    assert_eq!(patrocinio.totals.spend, 250.0);
}

fn check_rollup(node: &HierarchyNode) {
    if node.children.is_empty() {
        return;
    }
    let spend: f64 = node.children.iter().map(|c| c.totals.spend).sum();
    assert!((node.totals.spend - spend).abs() < 1e-9);
    node.children.iter().for_each(check_rollup);
}

#[test]
fn test_hierarchy_rollup_from_raw_rows() {
    let records = normalize_all(&rows(DATASET), LeadDefinition::default());
    let tree = build_hierarchy(&records);
    assert_eq!(tree.len(), 3);
    tree.iter().for_each(check_rollup);

    let leads_campaign = &tree[0];
    assert_eq!(leads_campaign.name, "Leads Março");
    assert_eq!(leads_campaign.totals.spend, 180.0);
    assert_eq!(leads_campaign.totals.leads, 13.0);
    assert!((leads_campaign.metrics.cpl - 180.0 / 13.0).abs() < 1e-9);
}

#[test]
fn test_franchise_period_comparison() {
    let records = normalize_all(&rows(DATASET), LeadDefinition::default());
    let range = resolve_range(
        DateMode::Custom,
        d(2024, 3, 20),
        Some(d(2024, 3, 10)),
        Some(d(2024, 3, 14)),
        Weekday::Sun,
    )
    .unwrap();
    assert_eq!(range, Some(DateRange::new(d(2024, 3, 10), d(2024, 3, 14)).unwrap()));

    let filter = RecordFilter {
        franchise: Some("Loja Centro".into()),
        range,
        ..Default::default()
    };
    let report = period_report(&records, &filter);
    assert_eq!(report.current.totals.spend, 180.0);
    assert_eq!(report.previous.as_ref().unwrap().totals.spend, 100.0);
    assert_eq!(report.deltas.as_ref().unwrap().spend, 80.0);

    let all_time = period_report(&records, &RecordFilter::default());
    assert!(all_time.deltas.is_none());
    assert_eq!(all_time.current.record_count, 5);
}

#[test]
fn test_overview_and_creatives() {
    let records = normalize_all(&rows(DATASET), LeadDefinition::MessagesStarted);
    let filter = RecordFilter {
        franchise: Some("Loja Centro".into()),
        ..Default::default()
    };
    let view = overview(&records, &filter);
    assert_eq!(view.report.current.totals.leads, 20.0);
    assert_eq!(view.messaging_funnel.stages[0].value, 20.0);
    assert_eq!(view.delivery_funnel.stages[0].value, 25000.0);

    let scoped = filter.apply(&records);
    let top = top_creatives(&scoped, &Ranking::by(SortKey::Spend, SortDirection::Descending).top(2));
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].group.key.id, "A");
    assert_eq!(top[0].creative.image_url, "https://cdn.example.com/a.jpg");
    assert_eq!(top[1].group.key.id, "C");
}
