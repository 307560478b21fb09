use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{HealthEntry, Sprint};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let start = NaiveDate::from_ymd_opt(2026, 3, 1).context("invalid date")?;
    let end = NaiveDate::from_ymd_opt(2026, 3, 29).context("invalid date")?;
    create_sprint(pool, "Spring cut", start, end, Some(88.0), Some(83.0)).await?;

    let rows = vec![
        ("seed-001", 1, "06:40", Some(88.1), Some(42.0), Some(64.0)),
        ("seed-002", 2, "06:55", Some(87.8), Some(44.0), Some(63.0)),
        ("seed-003", 3, "07:10", Some(88.3), Some(36.0), Some(68.0)),
        ("seed-004", 3, "22:15", Some(88.6), None, None),
        ("seed-005", 4, "06:30", Some(87.6), Some(47.0), Some(61.0)),
        ("seed-006", 5, "06:45", None, Some(49.0), Some(60.0)),
        ("seed-007", 6, "07:05", Some(87.2), Some(51.0), Some(59.0)),
    ];

    for (source_key, day, time, weight, hrv, rhr) in rows {
        let entry = HealthEntry {
            date: NaiveDate::from_ymd_opt(2026, 3, day).context("invalid date")?,
            time: Some(NaiveTime::parse_from_str(time, "%H:%M")?),
            weight,
            hrv,
            rhr,
        };
        insert_entry(pool, &entry, source_key).await?;
    }

    Ok(())
}

async fn insert_entry(pool: &PgPool, entry: &HealthEntry, source_key: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO mbjs.health_log
        (id, entry_date, entry_time, weight, hrv, rhr, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.date)
    .bind(entry.time)
    .bind(entry.weight)
    .bind(entry.hrv)
    .bind(entry.rhr)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Health-log rows on or after `since_date`, in log order.
pub async fn fetch_health_entries(
    pool: &PgPool,
    since_date: NaiveDate,
) -> anyhow::Result<Vec<HealthEntry>> {
    let records = sqlx::query(
        "SELECT entry_date, entry_time, weight, hrv, rhr \
         FROM mbjs.health_log \
         WHERE entry_date >= $1 \
         ORDER BY entry_date, entry_time NULLS FIRST, inserted_at",
    )
    .bind(since_date)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::with_capacity(records.len());
    for row in records {
        entries.push(HealthEntry {
            date: row.get("entry_date"),
            time: row.get("entry_time"),
            weight: row.get("weight"),
            hrv: row.get("hrv"),
            rhr: row.get("rhr"),
        });
    }

    Ok(entries)
}

pub async fn fetch_active_sprint(pool: &PgPool) -> anyhow::Result<Option<Sprint>> {
    let row = sqlx::query(
        "SELECT id, name, start_date, end_date, duration_days, start_weight, target_weight \
         FROM mbjs.sprints \
         WHERE active \
         ORDER BY created_at DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Sprint {
        sprint_id: row.get("id"),
        name: row.get("name"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        duration_days: i64::from(row.get::<i32, _>("duration_days")),
        start_weight: row.get("start_weight"),
        target_weight: row.get("target_weight"),
    }))
}

/// Start a new sprint and retire any previously active one.
pub async fn create_sprint(
    pool: &PgPool,
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_weight: Option<f64>,
    target_weight: Option<f64>,
) -> anyhow::Result<Sprint> {
    let duration_days = (end_date - start_date).num_days();
    let stored_duration =
        i32::try_from(duration_days).context("sprint duration does not fit in a day count")?;
    let sprint_id = Uuid::new_v4();

    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE mbjs.sprints SET active = FALSE WHERE active")
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO mbjs.sprints
        (id, name, start_date, end_date, duration_days, start_weight, target_weight)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(sprint_id)
    .bind(name)
    .bind(start_date)
    .bind(end_date)
    .bind(stored_duration)
    .bind(start_weight)
    .bind(target_weight)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(%sprint_id, sprint = name, duration_days, "sprint created");
    Ok(Sprint {
        sprint_id,
        name: name.to_string(),
        start_date,
        end_date,
        duration_days,
        start_weight,
        target_weight,
    })
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    date: NaiveDate,
    #[serde(default)]
    time: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    weight: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    hrv: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    rhr: Option<f64>,
    #[serde(default)]
    source_key: Option<String>,
}

impl CsvRow {
    fn into_entry(self) -> anyhow::Result<(HealthEntry, Option<String>)> {
        let time = match self.time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                NaiveTime::parse_from_str(raw, "%H:%M")
                    .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
                    .with_context(|| format!("invalid time `{raw}` for {}", self.date))?,
            ),
        };
        let entry = HealthEntry {
            date: self.date,
            time,
            weight: self.weight,
            hrv: self.hrv,
            rhr: self.rhr,
        };
        let source_key = self.source_key.filter(|key| !key.trim().is_empty());
        Ok((entry, source_key))
    }
}

/// Parse a health-log export. Unparseable numeric cells become empty; rows
/// with a bad date or time abort the import.
pub fn read_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<(HealthEntry, Option<String>)>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid row {}", line + 1))?;
        rows.push(row.into_entry()?);
    }

    Ok(rows)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut inserted = 0usize;

    for (entry, source_key) in read_csv(csv_path)? {
        let source_key = source_key.unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        if insert_entry(pool, &entry, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}
