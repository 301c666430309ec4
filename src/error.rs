//! Unified error type for every subsystem.
//!
//! Each kind carries `{message, cause?, position?}`. `SourceError` additionally
//! carries the transience flag that the executor's retry logic reads.

use std::fmt;

use crate::ast::Position;

/// A single SQL source position, attached to most error kinds for diagnostics.
pub type ErrPosition = Position;

#[derive(Debug, thiserror::Error)]
pub enum FedError {
    /// Parse failure. Not retried; surfaced to the caller.
    #[error("syntax error at {position}: {message}")]
    Syntax {
        message: String,
        position: ErrPosition,
        expected: Vec<String>,
    },

    /// Unresolved identifier, type mismatch, ambiguous reference. Not retried.
    #[error("semantic error: {message}")]
    Semantic {
        message: String,
        position: Option<ErrPosition>,
    },

    /// A quoted or unquoted identifier resolves to more than one candidate.
    #[error("ambiguous reference to '{name}': matches {candidates:?}")]
    AmbiguousReference { name: String, candidates: Vec<String> },

    /// The dialect converter could not render a feature for the target dialect.
    #[error("cannot translate to target dialect: {unsupported:?}")]
    Translation {
        unsupported: Vec<UnsupportedFeature>,
    },

    /// Planner invariant violation (e.g. no candidate plan). Not retried; fatal.
    #[error("plan error: {message}")]
    Plan { message: String },

    /// Remote source failed. Retried by the executor when `transient` is true.
    #[error("source error ({}): {message}", if *.transient { "transient" } else { "permanent" })]
    Source {
        message: String,
        transient: bool,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Cooperative cancellation result.
    #[error("query cancelled")]
    Cancelled,

    /// The whole-query timeout (default 300s) elapsed.
    #[error("query timed out")]
    Timeout,

    /// Thread was interrupted while sleeping between retry attempts.
    #[error("retry interrupted")]
    RetryInterrupted,

    /// Catalog or registry produced an inconsistent state (duplicate
    /// registration, missing adapter, etc).
    #[error("registry error: {message}")]
    Registry { message: String },

    /// A `fmt::Write` failure while rendering SQL text (effectively
    /// infallible for the `String` writers used throughout, but kept so
    /// `DialectDisplay::fmt` can use `?` against `write!`).
    #[error("formatting error: {0}")]
    Fmt(#[from] fmt::Error),
}

impl FedError {
    pub fn syntax(message: impl Into<String>, position: ErrPosition, expected: Vec<String>) -> Self {
        FedError::Syntax {
            message: message.into(),
            position,
            expected,
        }
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        FedError::Semantic {
            message: message.into(),
            position: None,
        }
    }

    pub fn transient_source(message: impl Into<String>) -> Self {
        FedError::Source {
            message: message.into(),
            transient: true,
            cause: None,
        }
    }

    pub fn permanent_source(message: impl Into<String>) -> Self {
        FedError::Source {
            message: message.into(),
            transient: false,
            cause: None,
        }
    }

    /// Whether the executor's retry loop should retry this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, FedError::Source { transient: true, .. })
    }
}

/// A single unsupported-feature report from the syntax-feature detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedFeature {
    pub feature: String,
    pub position: ErrPosition,
    pub suggestion: Option<String>,
}

impl fmt::Display for UnsupportedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.feature, self.position)?;
        if let Some(s) = &self.suggestion {
            write!(f, " (suggestion: {s})")?;
        }
        Ok(())
    }
}

pub type FedResult<T> = Result<T, FedError>;
