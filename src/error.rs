use std::path::PathBuf;
use thiserror::Error;

use crate::view::LoadPhase;

/// Failure of an upstream collection fetch (invoices or market data).
///
/// Cloneable so the store can keep the last failure around for display
/// while the prior snapshot stays queryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("could not reach {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Failure while building or writing an export artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("spreadsheet encoding failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("export write failed at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    View(#[from] ViewError),
}

/// Failure while retrieving an invoice PDF.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentRetrievalError {
    #[error("could not reach document service: {0}")]
    Network(String),

    #[error("document service answered with HTTP {0}")]
    Status(u16),

    #[error("document for invoice {0} is empty")]
    Empty(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("{0}")]
    InvalidForm(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Could not connect to the login server: {0}")]
    Unreachable(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("view is not ready (state: {0})")]
    NotReady(LoadPhase),

    #[error("field '{0}' is not sortable")]
    UnknownSortField(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path:?}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid value for {key}: {reason}")]
    Env { key: String, reason: String },
}
