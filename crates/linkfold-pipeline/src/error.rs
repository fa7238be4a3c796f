use crate::config::ConfigError;
use linkfold_core::{CoreError, ShortCode, StorageError};
use linkfold_generator::UrlError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Why a lookup ended without a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// Wrong width or a symbol outside the alphabet.
    Malformed,
    /// The membership filter has never seen the code.
    FilterMiss,
    /// Passed the filter but the durable store has no row.
    Absent,
}

impl Display for MissReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MissReason::Malformed => f.write_str("malformed code"),
            MissReason::FilterMiss => f.write_str("filter miss"),
            MissReason::Absent => f.write_str("not in store"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Insert,
    Get,
    Count,
    ListCodes,
}

impl Display for StoreOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOperation::Insert => f.write_str("insert"),
            StoreOperation::Get => f.write_str("get"),
            StoreOperation::Count => f.write_str("count"),
            StoreOperation::ListCodes => f.write_str("list codes"),
        }
    }
}

/// Outcome of `create`, `resolve` and `stats` other than success.
///
/// Cache failures never appear here; they are logged and skipped.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] UrlError),
    #[error("short code not found: {code} ({reason})")]
    NotFound { code: String, reason: MissReason },
    #[error("durable store {operation} failed: {source}")]
    Store {
        operation: StoreOperation,
        code: Option<ShortCode>,
        #[source]
        source: StorageError,
    },
}

impl PipelineError {
    pub(crate) fn not_found(code: impl Into<String>, reason: MissReason) -> Self {
        Self::NotFound {
            code: code.into(),
            reason,
        }
    }

    pub(crate) fn store(
        operation: StoreOperation,
        code: Option<&ShortCode>,
        source: StorageError,
    ) -> Self {
        Self::Store {
            operation,
            code: code.cloned(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failure to repopulate the membership filter from the durable store.
#[derive(Debug, Clone, Error)]
pub enum RebuildError {
    #[error("failed to list stored codes: {0}")]
    Store(#[from] StorageError),
    #[error(transparent)]
    Filter(#[from] CoreError),
}

#[derive(Debug, Clone, Error)]
pub enum BootstrapError {
    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("initial filter population failed: {0}")]
    Rebuild(#[from] RebuildError),
}
