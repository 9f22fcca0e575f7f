//! Long-running background task that copies the engine's event log into
//! the database.

use std::sync::Arc;
use std::time::Duration;

use dao_engine::Engine;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::db;
use crate::events::IndexedEvent;

pub struct IndexerState {
    pub pool: SqlitePool,
    pub config: Config,
    pub engine: Arc<Engine>,
}

/// Poll the engine until `shutdown` is cancelled.
pub async fn run(state: Arc<IndexerState>, shutdown: CancellationToken) {
    let mut cursor = db::get_cursor(&state.pool).await.unwrap_or(0);
    info!("Indexer starting — resuming from sequence {cursor}");

    loop {
        match poll_once(&state.pool, &state.engine, cursor, state.config.events_per_page).await {
            Ok(next) => cursor = next,
            Err(e) => error!("Indexer poll error: {e}"),
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Indexer stopping at sequence {cursor}");
                return;
            }
            _ = tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)) => {}
        }
    }
}

/// Copy one page of events starting at `cursor`.
///
/// Returns the next cursor. Pages are drained back to back until the engine
/// has nothing newer, so a burst of mutations is not spread over many polls.
pub async fn poll_once(
    pool: &SqlitePool,
    engine: &Engine,
    mut cursor: u64,
    page_size: usize,
) -> crate::errors::Result<u64> {
    loop {
        let records = engine.events_since(cursor, page_size.max(1));
        let Some(last) = records.last() else {
            return Ok(cursor);
        };
        let next = last.sequence + 1;

        let decoded = records
            .iter()
            .map(IndexedEvent::from_record)
            .collect::<crate::errors::Result<Vec<_>>>()?;
        let inserted = db::insert_events(pool, &decoded).await?;
        info!(
            "Copied {} events → {} new records stored",
            records.len(),
            inserted
        );

        // Persist cursor so restarts are deterministic.
        db::save_cursor(pool, next).await?;
        debug!("Cursor advanced to {next}");
        cursor = next;
    }
}
