//! Create/exists/drop against a scripted in-memory connection.
//!
//! The scripted connection fails `open()` with the queued server error
//! numbers, then hands out sessions. Tests run on a paused clock so the probe
//! delays and the one-minute budget elapse instantly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tdserver_provider::error::Result;
use tdserver_provider::{DatabaseConnection, DatabaseCreator, DatabaseSession, ProviderConfig, ProviderError};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Log {
    /// Attempted opens, failed or not.
    opens: usize,
    closes: usize,
    /// Sessions not yet dropped.
    live: usize,
    max_live: usize,
    pool_clears: usize,
    all_pool_clears: usize,
    executed: Vec<String>,
}

struct ScriptedSession {
    id: usize,
    log: Arc<Mutex<Log>>,
}

#[async_trait]
impl DatabaseSession for ScriptedSession {
    async fn execute_non_query(&mut self, sql: &str) -> Result<u64> {
        tokio::task::yield_now().await;
        self.log.lock().unwrap().executed.push(sql.to_string());
        Ok(0)
    }

    async fn execute_scalar(&mut self, _sql: &str) -> Result<Option<i64>> {
        tokio::task::yield_now().await;
        Ok(Some(self.id as i64))
    }

    fn close(self: Box<Self>) {
        self.log.lock().unwrap().closes += 1;
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.log.lock().unwrap().live -= 1;
    }
}

struct ScriptedConnection {
    database: String,
    failures: Mutex<VecDeque<i32>>,
    /// Error number returned by every open once the queue is empty.
    fail_forever: Option<i32>,
    log: Arc<Mutex<Log>>,
}

impl ScriptedConnection {
    fn new(database: &str, failures: &[i32]) -> Self {
        Self {
            database: database.to_string(),
            failures: Mutex::new(failures.iter().copied().collect()),
            fail_forever: None,
            log: Arc::new(Mutex::new(Log::default())),
        }
    }
}

#[async_trait]
impl DatabaseConnection for ScriptedConnection {
    fn database(&self) -> &str {
        &self.database
    }

    fn data_source(&self) -> &str {
        "td-test,1433"
    }

    fn command_timeout(&self) -> Option<Duration> {
        None
    }

    async fn open(&self) -> Result<Box<dyn DatabaseSession>> {
        let id = {
            let mut log = self.log.lock().unwrap();
            log.opens += 1;
            log.opens
        };
        let next = self.failures.lock().unwrap().pop_front().or(self.fail_forever);
        if let Some(number) = next {
            return Err(ProviderError::server(number, format!("scripted failure {}", number)));
        }
        {
            let mut log = self.log.lock().unwrap();
            log.live += 1;
            log.max_live = log.max_live.max(log.live);
        }
        // Let other tasks run while this session is open.
        tokio::task::yield_now().await;
        Ok(Box::new(ScriptedSession {
            id,
            log: Arc::clone(&self.log),
        }))
    }

    fn clear_pool(&self) {
        self.log.lock().unwrap().pool_clears += 1;
    }

    fn clear_all_pools(&self) {
        self.log.lock().unwrap().all_pool_clears += 1;
    }

    fn create_master_connection(&self) -> Arc<dyn DatabaseConnection> {
        Arc::new(ScriptedConnection {
            database: "DBC".to_string(),
            failures: Mutex::new(VecDeque::new()),
            fail_forever: None,
            log: Arc::clone(&self.log),
        })
    }
}

fn config() -> ProviderConfig {
    ProviderConfig::from_yaml("connection:\n  host: td-test\n  user: dbc\n  database: Sales\n").unwrap()
}

fn creator(connection: ScriptedConnection) -> (DatabaseCreator, Arc<Mutex<Log>>) {
    let log = Arc::clone(&connection.log);
    (DatabaseCreator::new(Arc::new(connection), &config()), log)
}

#[tokio::test(start_paused = true)]
async fn test_exists_false_when_database_missing() {
    let (creator, log) = creator(ScriptedConnection::new("Sales", &[4060]));

    assert!(!creator.exists_async(&CancellationToken::new()).await.unwrap());

    let log = log.lock().unwrap();
    assert_eq!(log.opens, 1);
    assert_eq!(log.closes, 0);
    assert_eq!(log.pool_clears, 0);
}

#[tokio::test(start_paused = true)]
async fn test_exists_retries_transient_failures() {
    let (creator, log) = creator(ScriptedConnection::new("Sales", &[233, -2]));

    assert!(creator.exists_async(&CancellationToken::new()).await.unwrap());

    let log = log.lock().unwrap();
    assert_eq!(log.opens, 3);
    assert_eq!(log.closes, 1);
    assert_eq!(log.live, 0);
    assert_eq!(log.pool_clears, 2);
}

#[tokio::test(start_paused = true)]
async fn test_exists_returns_unclassified_error_unchanged() {
    let (creator, log) = creator(ScriptedConnection::new("Sales", &[18456]));

    let err = creator.exists_async(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.error_number(), Some(18456));
    assert_eq!(err.to_string(), "Database error 18456: scripted failure 18456");
    assert_eq!(log.lock().unwrap().opens, 1);
}

#[tokio::test(start_paused = true)]
async fn test_exists_gives_up_after_budget() {
    let mut connection = ScriptedConnection::new("Sales", &[]);
    connection.fail_forever = Some(233);
    let (creator, log) = creator(connection);
    let started = tokio::time::Instant::now();

    let err = creator.exists_async(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.error_number(), Some(233));
    assert!(started.elapsed() >= Duration::from_secs(60));
    let log = log.lock().unwrap();
    assert!(log.opens > 100);
    assert_eq!(log.closes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_waits_for_new_database() {
    let (creator, log) = creator(ScriptedConnection::new("Sales", &[4060, 4060, 1832]));

    creator.create_async(&CancellationToken::new()).await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.executed, vec!["CREATE DATABASE [Sales];".to_string()]);
    // master open + three failed probes + the successful probe
    assert_eq!(log.opens, 5);
    assert_eq!(log.closes, 2);
    assert_eq!(log.live, 0);
    // once after CREATE DATABASE, then once per retried probe
    assert_eq!(log.pool_clears, 4);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_operations_use_separate_sessions() {
    let scripted = ScriptedConnection::new("Sales", &[]);
    let log = Arc::clone(&scripted.log);
    let connection: Arc<dyn DatabaseConnection> = Arc::new(scripted);
    let creator = Arc::new(DatabaseCreator::new(Arc::clone(&connection), &config()));
    let cancel = CancellationToken::new();

    let probes: Vec<_> = (0..4)
        .map(|_| {
            let creator = Arc::clone(&creator);
            let cancel = cancel.clone();
            tokio::spawn(async move { creator.exists_async(&cancel).await })
        })
        .collect();
    let scalars: Vec<_> = (0..4)
        .map(|_| {
            let connection = Arc::clone(&connection);
            tokio::spawn(async move { connection.execute_scalar("SELECT 1").await })
        })
        .collect();

    for probe in probes {
        assert!(probe.await.unwrap().unwrap());
    }
    let mut ids = Vec::new();
    for scalar in scalars {
        ids.push(scalar.await.unwrap().unwrap().unwrap());
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    let log = log.lock().unwrap();
    assert_eq!(log.opens, 8);
    assert!(log.max_live > 1);
    assert_eq!(log.live, 0);
    assert_eq!(log.closes, log.opens);
}

#[tokio::test(start_paused = true)]
async fn test_create_absorbs_single_missing_database_failure() {
    let (creator, _log) = creator(ScriptedConnection::new("Sales", &[4060]));
    let cancel = CancellationToken::new();

    creator.create_async(&cancel).await.unwrap();
    assert!(creator.exists_async(&cancel).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_create_stops_when_cancelled() {
    let mut connection = ScriptedConnection::new("Sales", &[]);
    connection.fail_forever = Some(4060);
    let (creator, _log) = creator(connection);
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            cancel.cancel();
        })
    };

    let err = creator.create_async(&cancel).await.unwrap_err();
    canceller.await.unwrap();
    assert!(matches!(err, ProviderError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_ensure_deleted_skips_missing_database() {
    let (creator, log) = creator(ScriptedConnection::new("Sales", &[4060]));

    assert!(!creator.ensure_deleted_async(&CancellationToken::new()).await.unwrap());
    assert!(log.lock().unwrap().executed.is_empty());
}

#[test]
fn test_blocking_create_and_delete() {
    let (creator, log) = creator(ScriptedConnection::new("Sales", &[]));
    let creator = creator.with_retry_timing(Duration::from_millis(1), Duration::from_secs(1));

    creator.create().unwrap();
    assert!(creator.has_tables().unwrap());
    creator.delete().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(
        log.executed,
        vec!["CREATE DATABASE [Sales];".to_string(), "DROP DATABASE [Sales];".to_string()]
    );
    assert_eq!(log.all_pool_clears, 1);
}
