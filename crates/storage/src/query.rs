use chrono::NaiveDate;
use serde::Serialize;
use shared::error::{LoadError, QueryErrorKind};
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    Column, Row as _, Sqlite, TypeInfo, ValueRef,
};
use tracing::debug;

use crate::{map_query_error, Connection, Database};

#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
}

impl QueryParam {
    fn bind_to<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            QueryParam::Null => query.bind(None::<String>),
            QueryParam::Integer(value) => query.bind(*value),
            QueryParam::Real(value) => query.bind(*value),
            QueryParam::Text(value) => query.bind(value.as_str()),
            QueryParam::Date(value) => query.bind(*value),
        }
    }
}

impl From<i64> for QueryParam {
    fn from(value: i64) -> Self {
        QueryParam::Integer(value)
    }
}

impl From<f64> for QueryParam {
    fn from(value: f64) -> Self {
        QueryParam::Real(value)
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        QueryParam::Text(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        QueryParam::Text(value)
    }
}

impl From<NaiveDate> for QueryParam {
    fn from(value: NaiveDate) -> Self {
        QueryParam::Date(value)
    }
}

/// One parameterised query. [`QueryTask::run`] releases the connection on
/// every path; a task dropped while open releases it on drop.
pub struct QueryTask {
    database: Database,
    sql: String,
    params: Vec<QueryParam>,
    connection: Option<Connection>,
}

impl QueryTask {
    pub fn new(database: &Database, sql: impl Into<String>) -> Result<Self, LoadError> {
        let sql = sql.into();
        if sql.trim().is_empty() {
            return Err(LoadError::query(
                QueryErrorKind::Malformed,
                "query string is empty",
            ));
        }
        Ok(Self::prepared(database, sql))
    }

    pub(crate) fn prepared(database: &Database, sql: String) -> Self {
        Self {
            database: database.clone(),
            sql,
            params: Vec::new(),
            connection: None,
        }
    }

    pub fn bind(mut self, param: impl Into<QueryParam>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    pub async fn open(&mut self) -> Result<(), LoadError> {
        if self.connection.is_none() {
            self.connection = Some(self.database.connect().await?);
        }
        Ok(())
    }

    pub async fn execute(&mut self) -> Result<ResultSet, LoadError> {
        self.open().await?;
        let conn = match self.connection.as_mut() {
            Some(conn) => conn.raw()?,
            None => return Err(LoadError::Connection("connection not open".into())),
        };

        let mut query = sqlx::query(&self.sql);
        for param in &self.params {
            query = param.bind_to(query);
        }

        let fetch = query.fetch_all(conn);
        let rows = match self.database.query_timeout() {
            Some(limit) => tokio::time::timeout(limit, fetch).await.map_err(|_| {
                LoadError::query(
                    QueryErrorKind::Timeout,
                    format!("query exceeded {} ms", limit.as_millis()),
                )
            })?,
            None => fetch.await,
        }
        .map_err(map_query_error)?;

        debug!(rows = rows.len(), "query executed");
        ResultSet::from_rows(&rows)
    }

    /// Releases the connection. Calling it again, or on a task that never
    /// opened, does nothing.
    pub async fn close(&mut self) -> Result<(), LoadError> {
        match self.connection.take() {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }

    pub async fn run(mut self) -> Result<ResultSet, LoadError> {
        let executed = self.execute().await;
        let closed = self.close().await;
        let rows = executed?;
        closed?;
        Ok(rows)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Result<&Value, LoadError> {
        self.values
            .get(index)
            .ok_or_else(|| LoadError::decode(format!("no column at index {index}")))
    }

    pub fn opt_i64(&self, index: usize) -> Result<Option<i64>, LoadError> {
        match self.get(index)? {
            Value::Null => Ok(None),
            Value::Integer(value) => Ok(Some(*value)),
            Value::Real(value) if value.fract() == 0.0 => Ok(Some(*value as i64)),
            other => Err(LoadError::decode(format!(
                "column {index}: expected integer, found {other:?}"
            ))),
        }
    }

    pub fn i64(&self, index: usize) -> Result<i64, LoadError> {
        self.opt_i64(index)?
            .ok_or_else(|| LoadError::decode(format!("column {index}: unexpected NULL")))
    }

    pub fn opt_f64(&self, index: usize) -> Result<Option<f64>, LoadError> {
        match self.get(index)? {
            Value::Null => Ok(None),
            Value::Integer(value) => Ok(Some(*value as f64)),
            Value::Real(value) => Ok(Some(*value)),
            other => Err(LoadError::decode(format!(
                "column {index}: expected number, found {other:?}"
            ))),
        }
    }

    pub fn f64(&self, index: usize) -> Result<f64, LoadError> {
        self.opt_f64(index)?
            .ok_or_else(|| LoadError::decode(format!("column {index}: unexpected NULL")))
    }

    pub fn text(&self, index: usize) -> Result<&str, LoadError> {
        match self.get(index)? {
            Value::Text(value) => Ok(value),
            other => Err(LoadError::decode(format!(
                "column {index}: expected text, found {other:?}"
            ))),
        }
    }

    /// Accepts `YYYY-MM-DD`, optionally followed by a time component.
    pub fn date(&self, index: usize) -> Result<NaiveDate, LoadError> {
        let raw = self.text(index)?;
        let day = raw.split([' ', 'T']).next().unwrap_or_default();
        NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map_err(|err| LoadError::decode(format!("column {index}: bad date '{raw}': {err}")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    fn from_rows(rows: &[SqliteRow]) -> Result<Self, LoadError> {
        let columns = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_query_error)?;

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_row(&self, what: &str) -> Result<&Row, LoadError> {
        self.rows
            .first()
            .ok_or_else(|| LoadError::EmptyResult(what.to_string()))
    }

    pub fn scalar_i64(&self) -> Result<i64, LoadError> {
        self.first_row("scalar aggregate")?.i64(0)
    }

    pub fn scalar_f64(&self) -> Result<f64, LoadError> {
        self.first_row("scalar aggregate")?.f64(0)
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut values = Vec::with_capacity(row.len());
    for index in 0..row.len() {
        let storage_class = {
            let raw = row.try_get_raw(index)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_ascii_uppercase())
            }
        };

        let value = match storage_class.as_deref() {
            None | Some("NULL") => Value::Null,
            Some("INTEGER") | Some("BOOLEAN") => Value::Integer(row.try_get(index)?),
            Some("REAL") => Value::Real(row.try_get(index)?),
            Some("BLOB") => Value::Blob(row.try_get(index)?),
            Some(_) => Value::Text(row.try_get(index)?),
        };
        values.push(value);
    }
    Ok(Row::new(values))
}
