use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryErrorKind {
    Malformed,
    Execution,
    Timeout,
    Decode,
}

/// Variants carry owned data so errors can be cloned across threads.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("database unreachable: {0}")]
    Connection(String),
    #[error("query failed ({kind:?}): {message}")]
    Query {
        kind: QueryErrorKind,
        message: String,
    },
    #[error("expected at least one row: {0}")]
    EmptyResult(String),
    #[error("query queue is full ({capacity} pending); worker pool exhausted")]
    PoolExhausted { capacity: usize },
    #[error("query executor has shut down")]
    ExecutorShutdown,
    #[error("query worker dropped its result before completing")]
    WorkerLost,
    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("borough boundaries line {line}: {message}")]
    Boundaries { line: usize, message: String },
}

impl LoadError {
    pub fn query(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self::Query {
            kind,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::query(QueryErrorKind::Decode, message)
    }

    /// Only resource exhaustion is fatal; everything else is reported and the
    /// UI keeps its previous state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PoolExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pool_exhaustion_is_fatal() {
        assert!(LoadError::PoolExhausted { capacity: 4 }.is_fatal());
        assert!(!LoadError::Connection("refused".into()).is_fatal());
        assert!(!LoadError::query(QueryErrorKind::Timeout, "slow").is_fatal());
        assert!(!LoadError::WorkerLost.is_fatal());
    }

    #[test]
    fn query_error_message_names_kind() {
        let err = LoadError::query(QueryErrorKind::Malformed, "near \"SELEC\"");
        assert_eq!(err.to_string(), "query failed (Malformed): near \"SELEC\"");
    }
}
