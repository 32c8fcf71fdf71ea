//! Error types for the rowdelta engine.

use crate::{ColumnName, Mimetype, RawType, RowId};
use thiserror::Error;

/// All possible errors from the rowdelta engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Snapshot errors
    #[error("missing identity column: {0}")]
    MissingIdColumn(ColumnName),

    #[error("row {row} is missing required column '{column}'")]
    MissingColumn { row: RowId, column: ColumnName },

    #[error("duplicate row id in snapshot: {0}")]
    DuplicateRowId(RowId),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    // Schema errors
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("duplicate kind: {0}")]
    DuplicateKind(Mimetype),

    #[error("duplicate type {raw_value} in kind '{kind}'")]
    DuplicateType { kind: Mimetype, raw_value: RawType },

    // Configuration errors
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    // Diff errors
    #[error("persisted row {0} cannot belong to a record that does not exist yet")]
    PersistedRowOnNewRecord(RowId),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
