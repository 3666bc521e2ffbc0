//! Integration tests for database initialization and migrations
//!
//! Each test works on its own temporary directory so runs never collide.

use salon_common::api::auth::{load_admin_secret, ADMIN_SECRET_SETTING};
use salon_common::db::{get_schema_version, get_setting, init_database, CURRENT_SCHEMA_VERSION};
use salon_common::OrderKey;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("salon.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");

    let pool = pool.unwrap();
    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("salon.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO concerts (id, date, passcode) VALUES ('c1', '2024-05-01T19:00:00+00:00', 'pw')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM concerts")
        .fetch_one(&pool2.unwrap())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_legacy_order_column_migrates_to_order_key() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("legacy.db");

    // Schema as written by the first revisions: integer order, no frozen flag
    {
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
        sqlx::query(
            "CREATE TABLE concerts (id TEXT PRIMARY KEY, date TEXT NOT NULL, passcode TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            r#"
            CREATE TABLE performances (
                id TEXT PRIMARY KEY,
                concert_id TEXT NOT NULL REFERENCES concerts(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                composer TEXT NOT NULL,
                performers TEXT NOT NULL,
                "order" INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO concerts VALUES ('c1', '2023-11-04T19:30:00+00:00', 'pw')")
            .execute(&pool)
            .await
            .unwrap();
        for (id, order) in [("p1", 1), ("p2", 2), ("p3", 3)] {
            sqlx::query(
                r#"INSERT INTO performances (id, concert_id, title, composer, performers, "order")
                   VALUES (?, 'c1', 'Title', 'Composer', 'Performers', ?)"#,
            )
            .bind(id)
            .bind(order)
            .execute(&pool)
            .await
            .unwrap();
        }
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);

    let rows = sqlx::query("SELECT id, order_key FROM performances")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);

    let mut keys: Vec<(String, OrderKey)> = rows
        .iter()
        .map(|row| {
            let id: String = row.get("id");
            let raw: String = row.get("order_key");
            (id, OrderKey::parse(&raw).unwrap())
        })
        .collect();
    keys.sort_by(|a, b| a.1.cmp(&b.1));
    let ids: Vec<&str> = keys.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);

    let frozen: i64 = sqlx::query_scalar("SELECT frozen FROM concerts WHERE id = 'c1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(frozen, 0);

    // Newly written rows use the migrated column
    sqlx::query(
        "INSERT INTO performances (id, concert_id, title, composer, performers, order_key)
         VALUES ('p4', 'c1', 'T', 'C', 'P', '0001500.000')",
    )
    .execute(&pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn test_admin_secret_generated_once() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("salon.db")).await.unwrap();

    assert!(get_setting(&pool, ADMIN_SECRET_SETTING).await.unwrap().is_none());

    let first = load_admin_secret(&pool).await.unwrap();
    let second = load_admin_secret(&pool).await.unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(
        get_setting(&pool, ADMIN_SECRET_SETTING).await.unwrap().as_deref(),
        Some(first.as_str())
    );
}

#[tokio::test]
async fn test_deleting_concert_cascades_to_performances() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("salon.db")).await.unwrap();

    sqlx::query("INSERT INTO concerts (id, date, passcode) VALUES ('c1', '2024-01-01T00:00:00+00:00', 'pw')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO performances (id, concert_id, title, composer, performers, order_key)
         VALUES ('p1', 'c1', 'T', 'C', 'P', '0001000.000')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await.unwrap();
    sqlx::query("DELETE FROM concerts WHERE id = 'c1'")
        .execute(&mut *conn)
        .await
        .unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM performances")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
