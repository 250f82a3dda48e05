//! Persistence over the synced record set and the sync audit trail.
//!
//! Records are opaque key/JSON-text/timestamp triples to this layer. The
//! only writer of `synced_records` is [`replace_all`], whose transaction
//! guarantees readers see a complete prior or complete new generation,
//! never a mix.

use sqlx::{Row, SqlitePool};

use crate::error::Result;
use crate::models::{NormalizedRecord, StoredRecord, SyncOutcome, SyncRunRow};

/// Atomically replaces the stored generation: delete everything, insert the
/// new records, commit. On error the transaction rolls back and the prior
/// generation stays intact.
pub async fn replace_all(pool: &SqlitePool, records: &[NormalizedRecord]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM synced_records")
        .execute(&mut *tx)
        .await?;

    for record in records {
        sqlx::query("INSERT INTO synced_records (source_key, payload, updated_at) VALUES (?, ?, ?)")
            .bind(&record.source_key)
            .bind(&record.payload)
            .bind(&record.updated_at)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Newest-first records, bounded by `limit`.
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<StoredRecord>> {
    let rows = sqlx::query(
        "SELECT id, source_key, payload, updated_at FROM synced_records ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| StoredRecord {
            id: row.get("id"),
            source_key: row.get("source_key"),
            payload: row.get("payload"),
            updated_at: row.get("updated_at"),
        })
        .collect())
}

pub async fn get_by_key(pool: &SqlitePool, source_key: &str) -> Result<Option<StoredRecord>> {
    let row = sqlx::query(
        "SELECT id, source_key, payload, updated_at FROM synced_records WHERE source_key = ?",
    )
    .bind(source_key)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| StoredRecord {
        id: row.get("id"),
        source_key: row.get("source_key"),
        payload: row.get("payload"),
        updated_at: row.get("updated_at"),
    }))
}

/// Appends one audit row. The trail is append-only; rows are never updated.
pub async fn append_run(pool: &SqlitePool, outcome: &SyncOutcome) -> Result<()> {
    sqlx::query("INSERT INTO sync_runs (ran_at, status, record_count, message) VALUES (?, ?, ?, ?)")
        .bind(&outcome.ran_at)
        .bind(outcome.status.as_str())
        .bind(outcome.record_count)
        .bind(&outcome.message)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn latest_run(pool: &SqlitePool) -> Result<Option<SyncRunRow>> {
    let row = sqlx::query(
        "SELECT id, ran_at, status, record_count, message FROM sync_runs ORDER BY id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| SyncRunRow {
        id: row.get("id"),
        ran_at: row.get("ran_at"),
        status: row.get("status"),
        record_count: row.get("record_count"),
        message: row.get("message"),
    }))
}
