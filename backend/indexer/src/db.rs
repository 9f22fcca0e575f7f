//! Database layer — migrations, queries, and cursor management.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::events::{IndexedEvent, StoredEvent};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Each connection to an in-memory database is a separate database.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Cursor helpers
// ─────────────────────────────────────────────────────────

/// Next engine sequence number to fetch; `0` on a fresh database.
pub async fn get_cursor(pool: &SqlitePool) -> Result<u64> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT next_sequence FROM indexer_cursor WHERE id = 1")
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(v,)| v.max(0) as u64).unwrap_or(0))
}

/// Persist the next sequence number to fetch.
pub async fn save_cursor(pool: &SqlitePool, next_sequence: u64) -> Result<()> {
    sqlx::query("UPDATE indexer_cursor SET next_sequence = ?1 WHERE id = 1")
        .bind(next_sequence as i64)
        .execute(pool)
        .await?;
    Ok(())
}

/// Forget everything indexed so far and rewind the cursor to `0`.
///
/// The engine's event log starts empty in every process, so rows left by a
/// previous run describe a history the current engine never produced.
pub async fn reset_index(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM events").execute(&mut *tx).await?;
    sqlx::query("UPDATE indexer_cursor SET next_sequence = 0 WHERE id = 1")
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    info!("Index reset for a fresh engine run");
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of decoded events. Rows whose `sequence` is already
/// stored are ignored, so re-copying a page is harmless.
pub async fn insert_events(pool: &SqlitePool, events: &[IndexedEvent]) -> Result<usize> {
    let indexed_at = chrono::Utc::now().timestamp();
    let mut count = 0usize;
    for ev in events {
        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (sequence, event_type, proposal_id, actor, amount, payload, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(ev.sequence)
        .bind(&ev.event_type)
        .bind(ev.proposal_id)
        .bind(&ev.actor)
        .bind(&ev.amount)
        .bind(&ev.payload)
        .bind(indexed_at)
        .execute(pool)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    Ok(count)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Fetch all events for a given proposal, in engine order.
pub async fn get_events_for_proposal(
    pool: &SqlitePool,
    proposal_id: i64,
) -> Result<Vec<StoredEvent>> {
    let rows = sqlx::query_as::<_, StoredEvent>(
        r#"
        SELECT id, sequence, event_type, proposal_id, actor, amount, payload, indexed_at
        FROM   events
        WHERE  proposal_id = ?1
        ORDER  BY sequence ASC
        "#,
    )
    .bind(proposal_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all events, in engine order.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<StoredEvent>> {
    let rows = sqlx::query_as::<_, StoredEvent>(
        r#"
        SELECT id, sequence, event_type, proposal_id, actor, amount, payload, indexed_at
        FROM   events
        ORDER  BY sequence ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
