//! Ingestion orchestration: resolve → normalize → atomic replace.
//!
//! A process-wide single-flight guard turns concurrent callers away instead
//! of queueing them; the guard is advisory and in-memory only, so crash
//! safety rests on the store's transaction, not on the flag.

use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::Result;
use crate::models::{SyncOutcome, SyncStatus};
use crate::source;
use crate::store;
use crate::transform;
use crate::value;

static SYNC_IN_PROGRESS: AtomicBool = AtomicBool::new(false);

/// Releases the single-flight flag on every exit path.
struct FlightGuard;

impl FlightGuard {
    fn try_acquire() -> Option<FlightGuard> {
        SYNC_IN_PROGRESS
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| FlightGuard)
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        SYNC_IN_PROGRESS.store(false, Ordering::SeqCst);
    }
}

/// Runs one ingestion: resolve the configured source, normalize, replace
/// the stored generation, append an audit row.
///
/// When a run is already in flight the call returns a `skipped` outcome
/// immediately, without touching the store or the audit log. A failed run
/// appends exactly one `error` audit row and re-raises; the store keeps its
/// prior generation.
pub async fn run_sync(config: &Config, pool: &SqlitePool) -> Result<SyncOutcome> {
    let guard = FlightGuard::try_acquire();
    if guard.is_none() {
        return Ok(SyncOutcome {
            status: SyncStatus::Skipped,
            record_count: 0,
            message: Some("sync already running".to_string()),
            ran_at: value::now_iso(),
        });
    }

    match execute(config, pool).await {
        Ok(outcome) => {
            store::append_run(pool, &outcome).await?;
            Ok(outcome)
        }
        Err(e) => {
            let failure = SyncOutcome {
                status: SyncStatus::Error,
                record_count: 0,
                message: Some(e.to_string()),
                ran_at: value::now_iso(),
            };
            store::append_run(pool, &failure).await?;
            Err(e)
        }
    }
}

async fn execute(config: &Config, pool: &SqlitePool) -> Result<SyncOutcome> {
    let client = source::build_client(config)?;
    let raw = source::resolve(config, &client, &config.source.descriptor).await?;

    let ran_at = value::now_iso();
    let records = transform::normalize(&raw, &ran_at);
    store::replace_all(pool, &records).await?;

    Ok(SyncOutcome {
        status: SyncStatus::Success,
        record_count: records.len() as i64,
        message: None,
        ran_at,
    })
}

/// Spawns the periodic sync loop used by the server. Failures are logged
/// and retried on the next tick; nothing retries within a single run.
pub fn start_scheduler(config: Arc<Config>, pool: SqlitePool) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.sync.interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; consume it so the loop waits a
        // full interval after the caller's initial sync.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match run_sync(&config, &pool).await {
                Ok(outcome) if outcome.status == SyncStatus::Success => {
                    info!(records = outcome.record_count, ran_at = %outcome.ran_at, "scheduled sync completed");
                }
                Ok(_) => debug!("scheduled sync skipped, previous run still in flight"),
                Err(e) => error!(error = %e, "scheduled sync failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CatalogConfig, DbConfig, SearchConfig, ServerConfig, SourceConfig, SyncConfig,
    };
    use crate::migrate;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::path::Path;
    use std::str::FromStr;
    use std::sync::Mutex;

    // run_sync shares one process-wide flag; serialize the tests that drive it.
    static FLIGHT_LOCK: Mutex<()> = Mutex::new(());

    fn test_config(base_dir: &Path, descriptor: &str) -> Config {
        Config {
            db: DbConfig {
                path: base_dir.join("unused.sqlite"),
            },
            source: SourceConfig {
                descriptor: descriptor.to_string(),
                base_dir: base_dir.to_path_buf(),
                fetch_timeout_secs: 5,
            },
            catalog: CatalogConfig::default(),
            sync: SyncConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
        }
    }

    async fn test_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_successful_run_persists_and_audits() {
        let _lock = FLIGHT_LOCK.lock().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("feed.json"),
            r#"[{"id": "t1", "route": "5"}, {"id": "t2", "route": "6"}]"#,
        )
        .unwrap();

        let config = test_config(tmp.path(), "feed.json");
        let pool = test_pool().await;

        let outcome = run_sync(&config, &pool).await.unwrap();
        assert_eq!(outcome.status, SyncStatus::Success);
        assert_eq!(outcome.record_count, 2);

        assert_eq!(store::list_recent(&pool, 10).await.unwrap().len(), 2);
        let run = store::latest_run(&pool).await.unwrap().unwrap();
        assert_eq!(run.status, "success");
        assert_eq!(run.record_count, 2);
    }

    #[tokio::test]
    async fn test_contended_run_is_skipped_without_audit() {
        let _lock = FLIGHT_LOCK.lock().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path(), "feed.json");
        let pool = test_pool().await;

        let held = FlightGuard::try_acquire().unwrap();
        let outcome = run_sync(&config, &pool).await.unwrap();
        assert_eq!(outcome.status, SyncStatus::Skipped);
        assert!(store::latest_run(&pool).await.unwrap().is_none());
        drop(held);

        // Guard released: the next acquisition succeeds again.
        assert!(FlightGuard::try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_failed_run_keeps_prior_generation() {
        let _lock = FLIGHT_LOCK.lock().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("feed.json"), r#"[{"id": "t1"}]"#).unwrap();
        let pool = test_pool().await;

        let good = test_config(tmp.path(), "feed.json");
        run_sync(&good, &pool).await.unwrap();

        let bad = test_config(tmp.path(), "missing.json");
        assert!(run_sync(&bad, &pool).await.is_err());

        // Prior generation intact, exactly one error audit row on top.
        let records = store::list_recent(&pool, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_key, "t1");
        let run = store::latest_run(&pool).await.unwrap().unwrap();
        assert_eq!(run.status, "error");
        assert!(run.message.is_some());

        // The guard was released by the failed run.
        assert!(FlightGuard::try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_invalid_json_aborts_run() {
        let _lock = FLIGHT_LOCK.lock().unwrap();
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("feed.json"), "{broken").unwrap();
        let pool = test_pool().await;

        let config = test_config(tmp.path(), "feed.json");
        let err = run_sync(&config, &pool).await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Parse { .. }));
        assert!(store::list_recent(&pool, 10).await.unwrap().is_empty());
    }
}
