//! Performance queries

use salon_common::db::{sort_program, Performance, PerformanceChanges, PerformanceDraft};
use salon_common::order_key::{key_after_last, OrderKey};
use salon_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

const PERFORMANCE_COLUMNS: &str = "id, concert_id, title, composer, performers, order_key";

pub(crate) fn performance_from_row(row: &SqliteRow) -> Result<Performance> {
    let raw_key: String = row.try_get("order_key")?;
    Ok(Performance {
        id: row.try_get("id")?,
        concert_id: row.try_get("concert_id")?,
        title: row.try_get("title")?,
        composer: row.try_get("composer")?,
        performers: row.try_get("performers")?,
        order_key: OrderKey::parse(&raw_key)?,
    })
}

/// Performances of one concert in display order
pub async fn list_performances(pool: &SqlitePool, concert_id: &str) -> Result<Vec<Performance>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM performances WHERE concert_id = ?",
        PERFORMANCE_COLUMNS
    ))
    .bind(concert_id)
    .fetch_all(pool)
    .await?;

    let mut performances = rows
        .iter()
        .map(performance_from_row)
        .collect::<Result<Vec<_>>>()?;
    sort_program(&mut performances);
    Ok(performances)
}

/// Every performance, grouped by concert and sorted within each group
pub(crate) async fn list_all_by_concert(
    pool: &SqlitePool,
) -> Result<HashMap<String, Vec<Performance>>> {
    let rows = sqlx::query(&format!("SELECT {} FROM performances", PERFORMANCE_COLUMNS))
        .fetch_all(pool)
        .await?;

    let mut grouped: HashMap<String, Vec<Performance>> = HashMap::new();
    for row in &rows {
        let performance = performance_from_row(row)?;
        grouped
            .entry(performance.concert_id.clone())
            .or_default()
            .push(performance);
    }
    for program in grouped.values_mut() {
        sort_program(program);
    }
    Ok(grouped)
}

pub async fn get_performance(pool: &SqlitePool, id: &str) -> Result<Performance> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM performances WHERE id = ?",
        PERFORMANCE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Performance {}", id)))?;

    performance_from_row(&row)
}

/// Append a performance to the end of a concert's program
///
/// The caller has already checked that the concert exists.
pub async fn create_performance(
    pool: &SqlitePool,
    concert_id: &str,
    draft: &PerformanceDraft,
) -> Result<Performance> {
    let program = list_performances(pool, concert_id).await?;
    let order_key = key_after_last(program.last().map(|p| &p.order_key))?;

    let performance = Performance {
        id: Uuid::new_v4().to_string(),
        concert_id: concert_id.to_string(),
        title: draft.title.clone(),
        composer: draft.composer.clone(),
        performers: draft.performers.clone(),
        order_key,
    };

    sqlx::query(
        r#"
        INSERT INTO performances (id, concert_id, title, composer, performers, order_key)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&performance.id)
    .bind(&performance.concert_id)
    .bind(&performance.title)
    .bind(&performance.composer)
    .bind(&performance.performers)
    .bind(performance.order_key.canonical())
    .execute(pool)
    .await?;

    debug!(
        "Created performance {} in concert {} at {}",
        performance.id, concert_id, performance.order_key
    );
    Ok(performance)
}

/// Update a performance's text fields; unset fields are left alone
pub async fn update_performance(
    pool: &SqlitePool,
    id: &str,
    changes: &PerformanceChanges,
) -> Result<Performance> {
    let updated = sqlx::query(
        r#"
        UPDATE performances
        SET title = COALESCE(?, title),
            composer = COALESCE(?, composer),
            performers = COALESCE(?, performers)
        WHERE id = ?
        "#,
    )
    .bind(changes.title.as_deref())
    .bind(changes.composer.as_deref())
    .bind(changes.performers.as_deref())
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(Error::NotFound(format!("Performance {}", id)));
    }

    get_performance(pool, id).await
}

/// Delete a performance that belongs to `concert_id`
pub async fn delete_performance(pool: &SqlitePool, id: &str, concert_id: &str) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM performances WHERE id = ? AND concert_id = ?")
        .bind(id)
        .bind(concert_id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::NotFound(format!("Performance {}", id)));
    }
    Ok(())
}

/// Write one performance's order key (always canonical)
pub async fn set_order_key(pool: &SqlitePool, id: &str, key: &OrderKey) -> Result<()> {
    let updated = sqlx::query("UPDATE performances SET order_key = ? WHERE id = ?")
        .bind(key.canonical())
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(Error::NotFound(format!("Performance {}", id)));
    }
    Ok(())
}
