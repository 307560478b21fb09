use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use mbjs_pace::models::{DailyVitals, HealthEntry, MissionDay, PaceVerdict, Sprint, TrendRecord};
use mbjs_pace::readiness::{self, Readiness};
use mbjs_pace::{clock, db, logging, pace, report, trend, FileStore, TrendCache, TrendConfig};

const RECENT_DAYS: usize = 7;

#[derive(Parser)]
#[command(name = "mbjs-pace")]
#[command(about = "Weight trend and sprint pace tracker for Projekt MBJS", long_about = None)]
struct Cli {
    /// Directory holding the frozen per-day trend records
    #[arg(long, env = "MBJS_CACHE_DIR", default_value = ".mbjs-cache/trend", global = true)]
    cache_dir: PathBuf,
    #[arg(long, default_value_t = trend::DEFAULT_LOOKBACK_DAYS, global = true, hide = true)]
    lookback_days: i64,
    #[arg(long, default_value_t = trend::DEFAULT_ALPHA, global = true, hide = true)]
    alpha: f64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import health-log rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Start a new sprint, retiring the active one
    Sprint {
        #[arg(long)]
        name: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        start_weight: Option<f64>,
        #[arg(long)]
        target_weight: Option<f64>,
    },
    /// Print today's trend, pace verdict and readiness
    Status,
    /// Generate a markdown status report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Remove trend records older than the retention window
    PruneCache,
}

struct Snapshot {
    day: MissionDay,
    sprint: Option<Sprint>,
    verdict: Option<PaceVerdict>,
    trend: Option<TrendRecord>,
    readiness: Option<Readiness>,
    vitals: Vec<DailyVitals>,
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn snapshot(
    pool: &PgPool,
    cache: &TrendCache<FileStore>,
    now: NaiveDateTime,
) -> anyhow::Result<Snapshot> {
    let day = clock::mission_day(now);
    let since = trend::window_start(day, cache.config().lookback_days);
    let entries = db::fetch_health_entries(pool, since).await?;
    let sprint = db::fetch_active_sprint(pool).await?;

    let trend = cache.get_or_compute(day, || {
        entries.iter().map(HealthEntry::observation).collect()
    });
    let current_weight = entries.iter().rev().find_map(|entry| entry.weight);

    let verdict = match (&sprint, current_weight.or(trend.as_ref().map(|t| t.trend_weight))) {
        (Some(sprint), Some(current)) => pace::evaluate(
            sprint,
            now,
            current,
            trend.as_ref().map(|t| t.trend_weight),
        )?,
        _ => None,
    };

    let target_weight = sprint.as_ref().and_then(|s| s.target_weight);
    Ok(Snapshot {
        day,
        readiness: readiness::assess(&entries, target_weight),
        vitals: readiness::daily_vitals(&entries, RECENT_DAYS),
        sprint,
        verdict,
        trend,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging()?;
    let cli = Cli::parse();

    let config = TrendConfig {
        lookback_days: cli.lookback_days,
        alpha: cli.alpha,
        ..TrendConfig::default()
    };
    let cache = TrendCache::new(FileStore::new(&cli.cache_dir), config);

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} health-log rows from {}.", csv.display());
        }
        Commands::Sprint {
            name,
            start,
            end,
            start_weight,
            target_weight,
        } => {
            anyhow::ensure!(end > start, "sprint must end after it starts");
            let pool = connect().await?;
            let sprint =
                db::create_sprint(&pool, &name, start, end, start_weight, target_weight).await?;
            println!(
                "Sprint {} runs {} to {} ({} days).",
                sprint.name, sprint.start_date, sprint.end_date, sprint.duration_days
            );
        }
        Commands::Status => {
            let pool = connect().await?;
            let snap = snapshot(&pool, &cache, clock::now_local()).await?;

            println!("Mission day {}", snap.day);
            match &snap.trend {
                Some(trend) => println!(
                    "Trend weight {:.2} kg ({} samples)",
                    trend.trend_weight, trend.sample_count
                ),
                None => println!("Trend weight: not enough data yet."),
            }
            match (&snap.sprint, &snap.verdict) {
                (Some(sprint), Some(verdict)) => println!(
                    "{}: {} (delta {:+.2} kg, need {:.2} kg/day over {} days)",
                    sprint.name,
                    verdict.status,
                    verdict.delta,
                    verdict.required_daily_pace,
                    verdict.days_remaining
                ),
                (Some(sprint), None) => println!("{}: no pace verdict available.", sprint.name),
                (None, _) => println!("No active sprint."),
            }
            match snap.readiness.as_ref().and_then(|r| r.condition) {
                Some(condition) => println!("Condition: {condition}"),
                None => println!("Condition: not enough data yet."),
            }
        }
        Commands::Report { out } => {
            let pool = connect().await?;
            let snap = snapshot(&pool, &cache, clock::now_local()).await?;
            let report = report::build_report(
                snap.day,
                snap.sprint.as_ref(),
                snap.verdict.as_ref(),
                snap.trend.as_ref(),
                snap.readiness.as_ref(),
                &snap.vitals,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::PruneCache => {
            let removed = cache.prune();
            println!("Pruned {removed} trend records from {}.", cache.store().dir().display());
        }
    }

    Ok(())
}
