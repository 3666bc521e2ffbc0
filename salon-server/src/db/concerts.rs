//! Concert queries
//!
//! Dates are written as RFC 3339 UTC with millisecond precision. Concert
//! lists are sorted in Rust (date descending) so rows written with other
//! offsets or precisions still sort by instant.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use salon_common::db::{Concert, ConcertChanges, Performance, PerformanceDraft};
use salon_common::order_key::rebalance;
use salon_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::performances::{list_all_by_concert, list_performances};

const CONCERT_COLUMNS: &str = "id, date, passcode, frozen";

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored date: RFC 3339, or SQLite's `YYYY-MM-DD HH:MM:SS` (UTC)
fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Internal(format!("Unreadable concert date {:?}: {}", raw, e)))
}

fn concert_from_row(row: &SqliteRow, performances: Vec<Performance>) -> Result<Concert> {
    let raw_date: String = row.try_get("date")?;
    Ok(Concert {
        id: row.try_get("id")?,
        date: parse_date(&raw_date)?,
        passcode: row.try_get("passcode")?,
        frozen: row.try_get("frozen")?,
        performances,
    })
}

fn sort_concerts(concerts: &mut [Concert]) {
    concerts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
}

/// All concerts, newest first, each with its program
pub async fn list_concerts(pool: &SqlitePool) -> Result<Vec<Concert>> {
    let rows = sqlx::query(&format!("SELECT {} FROM concerts", CONCERT_COLUMNS))
        .fetch_all(pool)
        .await?;
    let mut programs = list_all_by_concert(pool).await?;

    let mut concerts = rows
        .iter()
        .map(|row| {
            let id: String = row.try_get("id")?;
            concert_from_row(row, programs.remove(&id).unwrap_or_default())
        })
        .collect::<Result<Vec<_>>>()?;
    sort_concerts(&mut concerts);
    Ok(concerts)
}

pub async fn get_concert(pool: &SqlitePool, id: &str) -> Result<Concert> {
    let row = sqlx::query(&format!("SELECT {} FROM concerts WHERE id = ?", CONCERT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Concert {}", id)))?;

    let performances = list_performances(pool, id).await?;
    concert_from_row(&row, performances)
}

/// The concert with the latest date, if any
pub async fn latest_concert(pool: &SqlitePool) -> Result<Option<Concert>> {
    let rows = sqlx::query(&format!("SELECT {} FROM concerts", CONCERT_COLUMNS))
        .fetch_all(pool)
        .await?;

    let mut concerts = rows
        .iter()
        .map(|row| concert_from_row(row, Vec::new()))
        .collect::<Result<Vec<_>>>()?;
    sort_concerts(&mut concerts);

    let Some(mut latest) = concerts.into_iter().next() else {
        return Ok(None);
    };
    latest.performances = list_performances(pool, &latest.id).await?;
    Ok(Some(latest))
}

/// Create a concert, optionally seeded with an initial program
///
/// Seeded performances get the default spacing in the order given.
pub async fn create_concert(
    pool: &SqlitePool,
    date: DateTime<Utc>,
    passcode: &str,
    seed: &[PerformanceDraft],
) -> Result<Concert> {
    let id = Uuid::new_v4().to_string();
    let keys = rebalance(seed.len())?;
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO concerts (id, date, passcode, frozen) VALUES (?, ?, ?, 0)")
        .bind(&id)
        .bind(format_date(&date))
        .bind(passcode)
        .execute(&mut *tx)
        .await?;

    for (draft, key) in seed.iter().zip(&keys) {
        sqlx::query(
            r#"
            INSERT INTO performances (id, concert_id, title, composer, performers, order_key)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&id)
        .bind(&draft.title)
        .bind(&draft.composer)
        .bind(&draft.performers)
        .bind(key.canonical())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!("Created concert {} with {} performances", id, seed.len());

    get_concert(pool, &id).await
}

/// Update date, passcode or frozen flag; unset fields are left alone
pub async fn update_concert(pool: &SqlitePool, id: &str, changes: &ConcertChanges) -> Result<Concert> {
    let updated = sqlx::query(
        r#"
        UPDATE concerts
        SET date = COALESCE(?, date),
            passcode = COALESCE(?, passcode),
            frozen = COALESCE(?, frozen)
        WHERE id = ?
        "#,
    )
    .bind(changes.date.as_ref().map(format_date))
    .bind(changes.passcode.as_deref())
    .bind(changes.frozen)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(Error::NotFound(format!("Concert {}", id)));
    }

    get_concert(pool, id).await
}

/// Delete a concert; its performances go with it
pub async fn delete_concert(pool: &SqlitePool, id: &str) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM concerts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::NotFound(format!("Concert {}", id)));
    }
    info!("Deleted concert {}", id);
    Ok(())
}

/// Respace every key of a concert's program evenly, in one transaction
///
/// Display order is preserved. Legacy keys are rewritten canonically.
pub async fn rebalance_concert(pool: &SqlitePool, id: &str) -> Result<Vec<Performance>> {
    let mut program = get_concert(pool, id).await?.performances;
    let keys = rebalance(program.len())?;

    let mut tx = pool.begin().await?;
    for (performance, key) in program.iter_mut().zip(keys) {
        sqlx::query("UPDATE performances SET order_key = ? WHERE id = ?")
            .bind(key.canonical())
            .bind(&performance.id)
            .execute(&mut *tx)
            .await?;
        performance.order_key = key;
    }
    tx.commit().await?;

    info!("Rebalanced {} order keys in concert {}", program.len(), id);
    Ok(program)
}
