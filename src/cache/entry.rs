//! Cache entry state and the errors stored in it

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::tags::Tag;

/// Lifecycle of one cached query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Uninitialized,
    Pending,
    Fulfilled,
    Rejected,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }
}

/// A failed fetch.
///
/// These are stored in cache entries as data and handed to every waiter of
/// a shared fetch, hence `Clone`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum QueryError {
    /// Network unreachable, timeout, connection reset
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response from the backend
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Response body was not the JSON we expected
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built from the given arguments
    #[error("Invalid request: {0}")]
    Request(String),
}

impl QueryError {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 404s are rendered as empty states rather than hard errors
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// A successful fetch: the payload plus the tags it provides
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub data: Value,
    pub tags: Vec<Tag>,
}

impl Fetched {
    pub fn new(data: Value, tags: Vec<Tag>) -> Self {
        Self { data, tags }
    }

    pub fn untagged(data: Value) -> Self {
        Self {
            data,
            tags: Vec::new(),
        }
    }
}

/// Outcome of one fetch attempt
pub type FetchResult = std::result::Result<Fetched, QueryError>;

/// Snapshot of an entry as seen by consumers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryState {
    pub status: EntryStatus,
    /// Last known good payload, kept across failures and refetches
    pub data: Option<Value>,
    pub error: Option<QueryError>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    /// Data may no longer reflect the backend.
    ///
    /// Evaluated when the snapshot is taken. States pushed through a watch
    /// channel do not age; read the entry again for a current answer.
    pub is_stale: bool,
}

impl QueryState {
    /// No data yet and a fetch is running
    pub fn is_loading(&self) -> bool {
        self.status == EntryStatus::Pending && self.data.is_none()
    }

    /// A fetch is running, with or without earlier data
    pub fn is_fetching(&self) -> bool {
        self.status == EntryStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == EntryStatus::Fulfilled
    }

    pub fn is_error(&self) -> bool {
        self.status == EntryStatus::Rejected
    }

    /// Settled means the entry is no longer waiting on a fetch
    pub fn is_settled(&self) -> bool {
        matches!(self.status, EntryStatus::Fulfilled | EntryStatus::Rejected)
    }

    /// Data if fulfilled, otherwise the error
    pub fn into_result(self) -> std::result::Result<Value, QueryError> {
        match (self.status, self.error, self.data) {
            (EntryStatus::Rejected, Some(error), _) => Err(error),
            (_, _, Some(data)) => Ok(data),
            (status, _, None) => Err(QueryError::Request(format!(
                "query has no data ({})",
                status.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loading_vs_fetching() {
        let mut state = QueryState {
            status: EntryStatus::Pending,
            ..Default::default()
        };
        assert!(state.is_loading());
        assert!(state.is_fetching());

        state.data = Some(json!({"host_uid": "h1"}));
        assert!(!state.is_loading());
        assert!(state.is_fetching());
    }

    #[test]
    fn test_into_result_prefers_error_when_rejected() {
        let state = QueryState {
            status: EntryStatus::Rejected,
            data: Some(json!(1)),
            error: Some(QueryError::http(500, "boom")),
            ..Default::default()
        };
        assert_eq!(state.into_result(), Err(QueryError::http(500, "boom")));
    }

    #[test]
    fn test_into_result_returns_data() {
        let state = QueryState {
            status: EntryStatus::Fulfilled,
            data: Some(json!([1, 2])),
            ..Default::default()
        };
        assert_eq!(state.into_result().unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_not_found() {
        assert!(QueryError::http(404, "").is_not_found());
        assert!(!QueryError::http(500, "").is_not_found());
        assert!(!QueryError::Transport("down".into()).is_not_found());
    }
}
