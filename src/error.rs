//! Error types for the query layer.
//!
//! Each failure class has its own type so callers can tell a fatal load
//! failure apart from a per-query column miss or a broken geometry asset.

use std::path::PathBuf;
use thiserror::Error;

/// The dataset could not be read. Fatal to the session, no partial table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),

    #[error("Missing header row")]
    MissingHeader,
}

/// A requested column is not part of the table schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Column not found: {column}")]
pub struct ColumnNotFoundError {
    pub column: String,
}

impl ColumnNotFoundError {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

/// The region-boundary file could not be used. Only the map view degrades.
#[derive(Debug, Error)]
pub enum GeometrySourceError {
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("GeoJSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Geometry source is not a FeatureCollection")]
    NotFeatureCollection,
}

/// Umbrella error for callers that do not care which stage failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    ColumnNotFound(#[from] ColumnNotFoundError),

    #[error(transparent)]
    GeometrySource(#[from] GeometrySourceError),

    #[error("Export IO error: {0}")]
    ExportIo(#[from] std::io::Error),

    #[error("Export CSV error: {0}")]
    ExportCsv(#[from] csv::Error),

    #[error("Export JSON error: {0}")]
    ExportJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
