//! adboard: ad-performance dashboard reports from backend row exports.
//!
//! Loads raw rows, applies the dashboard filter and prints one view as JSON.

use adboard_core::config::{AppConfig, WeekStart};
use adboard_core::source::JsonFileSource;
use adboard_core::LeadDefinition;
use adboard_reporting::dashboard::{
    breakdown, comparison_span, daily_series, overview, top_creatives,
};
use adboard_reporting::{
    build_hierarchy, resolve_range, DateMode, Dimension, Ranking, RecordFilter, RecordLoader,
    SortDirection, SortKey, ViewSession,
};
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "adboard")]
#[command(about = "Ad-performance dashboard reports from backend row exports")]
#[command(version)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, env = "ADBOARD_CONFIG")]
    config: Option<String>,

    /// JSON array of backend rows (overrides config)
    #[arg(long)]
    input: Option<String>,

    /// Lead definition (overrides config)
    #[arg(long)]
    leads: Option<LeadDefinition>,

    /// Start weeks on Monday instead of the configured day
    #[arg(long, default_value_t = false)]
    monday_weeks: bool,

    #[arg(long)]
    franchise: Option<String>,

    #[arg(long)]
    account: Option<String>,

    #[arg(long)]
    objective: Option<String>,

    /// all, custom, last-7, last-30, this-week, last-week, this-month, last-month
    #[arg(long, default_value = "all")]
    mode: DateMode,

    /// Custom range start (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,

    /// Custom range end (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,

    /// Reference day for relative modes (defaults to the local date)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// KPI cards with previous-period deltas and funnels
    Summary,
    /// Campaign → ad set → ad tree
    Tree(RankArgs),
    /// Ranked breakdown along one dimension
    Breakdown {
        /// ad, adset, campaign, objective, city, age, platform, franchise,
        /// account, date, interest
        #[arg(long)]
        by: Dimension,
        /// Count only records with this objective (overrides --objective)
        #[arg(long)]
        only_objective: Option<String>,
        #[command(flatten)]
        rank: RankArgs,
    },
    /// Top creatives table
    Creatives(RankArgs),
    /// Per-day totals
    Daily,
}

#[derive(Args, Debug)]
struct RankArgs {
    #[arg(long, default_value = "spend")]
    sort: SortKey,
    /// Sort ascending instead of descending
    #[arg(long, default_value_t = false)]
    asc: bool,
    #[arg(long)]
    top: Option<usize>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value_t = false)]
    non_zero_spend: bool,
}

impl RankArgs {
    fn ranking(&self, default_top: Option<usize>) -> Ranking {
        let direction = if self.asc {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        Ranking {
            limit: self.top.or(default_top),
            search: self.search.clone(),
            non_zero_spend: self.non_zero_spend,
            ..Ranking::by(self.sort, direction)
        }
    }
}

/// Narrow a breakdown to one objective per record, so groups that mix
/// objectives keep their matching share instead of dropping out.
fn breakdown_filter(filter: &RecordFilter, only_objective: Option<&str>) -> RecordFilter {
    match only_objective {
        Some(objective) => RecordFilter {
            objective: Some(objective.to_string()),
            ..filter.clone()
        },
        None => filter.clone(),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got {raw:?}: {e}"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adboard=info,adboard_reporting=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(path) = &cli.input {
        config.source.path = path.clone();
    }
    if let Some(leads) = cli.leads {
        config.reporting.lead_definition = leads;
    }
    if cli.monday_weeks {
        config.reporting.week_start = WeekStart::Monday;
    }

    info!(
        source = %config.source.path,
        leads = %config.reporting.lead_definition,
        mode = ?cli.mode,
        "Configuration loaded"
    );

    let today = cli.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    let range = resolve_range(
        cli.mode,
        today,
        cli.start,
        cli.end,
        config.reporting.week_start.weekday(),
    )?;
    let filter = RecordFilter {
        franchise: cli.franchise.clone(),
        account_id: cli.account.clone(),
        objective: cli.objective.clone(),
        range,
    };

    // The summary compares against the previous month, so fetch both windows.
    let query = match (&cli.command, filter.range) {
        (Command::Summary, Some(range)) => filter
            .with_range(Some(comparison_span(range)))
            .fetch_query(),
        _ => filter.fetch_query(),
    };

    let loader = RecordLoader::new(
        JsonFileSource::new(&config.source.path),
        config.source.cache_capacity,
        config.reporting.lead_definition,
    );
    let session = ViewSession::new();
    let records = loader
        .load(&session, query)
        .await
        .context("record fetch was superseded")?;
    info!(records = records.len(), "Records loaded");

    let default_top = Some(config.reporting.top_n);
    match &cli.command {
        Command::Summary => print_json(&overview(&records, &filter))?,
        Command::Tree(rank) => {
            let scoped = filter.apply(&records);
            print_json(&rank.ranking(None).apply_tree(build_hierarchy(&scoped)))?
        }
        Command::Breakdown {
            by,
            only_objective,
            rank,
        } => {
            let scoped = breakdown_filter(&filter, only_objective.as_deref()).apply(&records);
            let ranking = rank.ranking(default_top);
            if !by.is_additive() {
                warn!(dimension = ?by, "Breakdown totals may exceed overall totals");
            }
            print_json(&breakdown(&scoped, *by, &ranking))?
        }
        Command::Creatives(rank) => {
            let scoped = filter.apply(&records);
            print_json(&top_creatives(&scoped, &rank.ranking(default_top)))?
        }
        Command::Daily => print_json(&daily_series(&filter.apply(&records)))?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_arguments() {
        let cli = Cli::try_parse_from([
            "adboard",
            "--franchise",
            "Loja Centro",
            "--mode",
            "last-30",
            "breakdown",
            "--by",
            "city",
            "--sort",
            "cpl",
            "--asc",
            "--top",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.mode, DateMode::Last30);
        assert_eq!(cli.franchise.as_deref(), Some("Loja Centro"));
        match cli.command {
            Command::Breakdown { by, rank, .. } => {
                assert_eq!(by, Dimension::City);
                let ranking = rank.ranking(Some(10));
                assert_eq!(ranking.sort_key, SortKey::Cpl);
                assert_eq!(ranking.direction, SortDirection::Ascending);
                assert_eq!(ranking.limit, Some(5));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_custom_dates_and_default_top() {
        let cli = Cli::try_parse_from([
            "adboard",
            "--mode",
            "custom",
            "--start",
            "2024-03-01",
            "--end",
            "2024-03-31",
            "creatives",
        ])
        .unwrap();
        assert_eq!(cli.start, NaiveDate::from_ymd_opt(2024, 3, 1));
        match cli.command {
            Command::Creatives(rank) => {
                let ranking = rank.ranking(Some(10));
                assert_eq!(ranking.sort_key, SortKey::Spend);
                assert_eq!(ranking.limit, Some(10));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_only_objective_keeps_mixed_groups() {
        let rows: Vec<adboard_core::RawRecord> = serde_json::from_str(
            r#"[
                {"ad_id": "A", "objective": "MESSAGES", "location": "Patrocínio", "spend": 40},
                {"ad_id": "B", "objective": "OUTCOME_LEADS", "location": "Patrocínio", "spend": 60},
                {"ad_id": "C", "objective": "OUTCOME_LEADS", "location": "Araxá", "spend": 10}
            ]"#,
        )
        .unwrap();
        let records = adboard_core::normalize_all(&rows, LeadDefinition::default());
        let filter = RecordFilter {
            objective: Some("OUTCOME_LEADS".into()),
            ..Default::default()
        };

        let scoped = breakdown_filter(&filter, Some("messages")).apply(&records);
        let groups = breakdown(&scoped, Dimension::City, &Ranking::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key.label, "Patrocínio");
        assert_eq!(groups[0].totals.spend, 40.0);

        let unchanged = breakdown_filter(&filter, None);
        assert_eq!(unchanged, filter);
    }

    #[test]
    fn test_rejects_bad_date() {
        assert!(Cli::try_parse_from(["adboard", "--start", "01/03/2024", "daily"]).is_err());
    }
}
