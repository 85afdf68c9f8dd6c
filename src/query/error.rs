//! Errors raised while translating a query string into a [`QuerySpec`](super::QuerySpec).

use serde::Serialize;
use thiserror::Error;

/// Input-validation failures of the query translator.
///
/// Every variant is deterministic and recoverable: the request is rejected
/// before anything reaches the database and the caller gets a machine-readable
/// [`kind`](QueryError::kind) alongside the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryError {
    /// A query key is not recognized, or its value cannot be used for the key.
    #[error("Invalid query parameter: {key} ({reason})")]
    InvalidParameter {
        /// The offending key exactly as it appeared in the request.
        key: String,
        /// Why the key was rejected.
        reason: String,
    },

    /// `page` or `limit` parsed to a non-positive number.
    #[error("Invalid pagination: {reason}")]
    InvalidPagination {
        /// Why the pagination window was rejected.
        reason: String,
    },

    /// The requested page starts past the end of a non-empty result set.
    #[error("This page does not exist: skipping {skip} of {total} matching documents")]
    PageOutOfRange {
        /// Number of documents the page would skip.
        skip: i64,
        /// Number of documents matching the filter.
        total: i64,
    },
}

impl QueryError {
    pub(crate) fn invalid_parameter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_pagination(reason: impl Into<String>) -> Self {
        Self::InvalidPagination {
            reason: reason.into(),
        }
    }

    /// Machine-readable error kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::InvalidPagination { .. } => "invalid_pagination",
            Self::PageOutOfRange { .. } => "page_out_of_range",
        }
    }

    /// The query key this error is about, when there is one.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::InvalidParameter { key, .. } => Some(key),
            Self::InvalidPagination { .. } | Self::PageOutOfRange { .. } => None,
        }
    }
}
