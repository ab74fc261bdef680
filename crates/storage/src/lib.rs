use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use shared::{
    domain::CovidRecord,
    error::{LoadError, QueryErrorKind},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteConnection},
    ConnectOptions, Connection as _,
};
use tracing::{debug, warn};

pub mod boundaries;
pub mod demo;
pub mod queries;
mod query;

pub use boundaries::BoroughBoundaries;
pub use query::{QueryParam, QueryTask, ResultSet, Row, Value};

/// Connection factory. Holds no open connection itself.
#[derive(Clone)]
pub struct Database {
    options: SqliteConnectOptions,
    query_timeout: Option<Duration>,
    counters: Arc<ConnectionCounters>,
}

#[derive(Debug, Default)]
struct ConnectionCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub opened: usize,
    pub closed: usize,
}

impl ConnectionStats {
    pub fn open_now(&self) -> usize {
        self.opened.saturating_sub(self.closed)
    }
}

impl Database {
    /// Handle to an existing database. Nothing is created: a missing file
    /// surfaces as a connection error on first use.
    pub fn new(database_url: &str) -> Result<Self, LoadError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|err| LoadError::Connection(format!("bad database url '{database_url}': {err}")))?;
        Ok(Self::from_options(options))
    }

    /// Creates the database file (and parent directory) if needed and applies
    /// the schema migrations.
    pub async fn create(database_url: &str) -> Result<Self, LoadError> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|err| LoadError::Connection(format!("bad database url '{database_url}': {err}")))?
            .create_if_missing(true);
        let database = Self::from_options(options);

        let mut conn = database.connect().await?;
        let migrated = sqlx::migrate!("./migrations").run(conn.raw()?).await;
        conn.close().await?;
        migrated.map_err(|err| {
            LoadError::query(QueryErrorKind::Execution, format!("migration failed: {err}"))
        })?;

        Ok(database)
    }

    fn from_options(options: SqliteConnectOptions) -> Self {
        Self {
            options,
            query_timeout: None,
            counters: Arc::new(ConnectionCounters::default()),
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    pub async fn connect(&self) -> Result<Connection, LoadError> {
        let inner = self
            .options
            .connect()
            .await
            .map_err(|err| LoadError::Connection(err.to_string()))?;
        let opened = self.counters.opened.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(opened, "opened database connection");
        Ok(Connection {
            inner: Some(inner),
            counters: Arc::clone(&self.counters),
        })
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        ConnectionStats {
            opened: self.counters.opened.load(Ordering::SeqCst),
            closed: self.counters.closed.load(Ordering::SeqCst),
        }
    }

    pub async fn health_check(&self) -> Result<(), LoadError> {
        let rows = QueryTask::new(self, "SELECT 1")?.run().await?;
        rows.scalar_i64().map(|_| ())
    }

    pub async fn insert_records(&self, records: &[CovidRecord]) -> Result<u64, LoadError> {
        let mut conn = self.connect().await?;
        let inserted = insert_records_on(conn.raw()?, records).await;
        conn.close().await?;
        inserted
    }
}

async fn insert_records_on(
    conn: &mut SqliteConnection,
    records: &[CovidRecord],
) -> Result<u64, LoadError> {
    let mut tx = conn.begin().await.map_err(map_query_error)?;
    let mut inserted = 0;
    for record in records {
        let result = sqlx::query(
            "INSERT OR REPLACE INTO covid_london (
                date, borough, retail_and_recreation, grocery_and_pharmacy, parks,
                transit_stations, workplaces, residential, new_cases, total_cases,
                new_deaths, total_deaths
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.date)
        .bind(record.borough.as_str())
        .bind(record.retail_and_recreation)
        .bind(record.grocery_and_pharmacy)
        .bind(record.parks)
        .bind(record.transit_stations)
        .bind(record.workplaces)
        .bind(record.residential)
        .bind(record.new_cases)
        .bind(record.total_cases)
        .bind(record.new_deaths)
        .bind(record.total_deaths)
        .execute(&mut *tx)
        .await
        .map_err(map_query_error)?;
        inserted += result.rows_affected();
    }
    tx.commit().await.map_err(map_query_error)?;
    Ok(inserted)
}

/// One open database connection. Released exactly once: either by
/// [`Connection::close`] or, failing that, when dropped.
pub struct Connection {
    inner: Option<SqliteConnection>,
    counters: Arc<ConnectionCounters>,
}

impl Connection {
    pub(crate) fn raw(&mut self) -> Result<&mut SqliteConnection, LoadError> {
        self.inner
            .as_mut()
            .ok_or_else(|| LoadError::Connection("connection already closed".into()))
    }

    pub async fn close(mut self) -> Result<(), LoadError> {
        let Some(inner) = self.inner.take() else {
            return Ok(());
        };
        let closed = inner.close().await;
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        closed.map_err(|err| LoadError::Connection(format!("close failed: {err}")))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            warn!("database connection released without an explicit close");
        }
    }
}

pub(crate) fn map_query_error(err: sqlx::Error) -> LoadError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => LoadError::Connection(err.to_string()),
        sqlx::Error::Database(ref db_err) => {
            let message = db_err.message().to_string();
            let kind = if message.contains("syntax error")
                || message.contains("no such column")
                || message.contains("no such table")
                || message.contains("incomplete input")
            {
                QueryErrorKind::Malformed
            } else {
                QueryErrorKind::Execution
            };
            LoadError::query(kind, message)
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => LoadError::decode(err.to_string()),
        other => LoadError::query(QueryErrorKind::Execution, other.to_string()),
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<(), LoadError> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).map_err(|err| {
        LoadError::Connection(format!(
            "failed to create parent directory '{}' for database url '{database_url}': {err}",
            parent.display()
        ))
    })
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
