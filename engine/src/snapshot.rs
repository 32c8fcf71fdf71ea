//! Snapshot types for loading a record from the store.
//!
//! A snapshot is what the snapshot loader hands the engine: the record's own
//! key-values plus every child row, in the order the loader read them. Column
//! maps are `BTreeMap`s so snapshots serialize deterministically.

use crate::{error::Result, Error, Layout, RowId, Values};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

/// A record and its child rows as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSnapshot {
    /// Snapshot format version
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// The record's own key-values
    pub values: Values,
    /// Child rows in load order
    #[serde(default)]
    pub rows: Vec<Values>,
}

impl RecordSnapshot {
    /// Create a snapshot with no child rows.
    pub fn new(values: Values) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            values,
            rows: Vec::new(),
        }
    }

    /// Add a child row.
    pub fn add_row(&mut self, row: Values) {
        self.rows.push(row);
    }

    /// Builder-style method to add a child row.
    pub fn with_row(mut self, row: Values) -> Self {
        self.add_row(row);
        self
    }

    /// Count child rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check that the record and every row carry the columns the engine needs.
    pub fn validate(&self, layout: &Layout) -> Result<()> {
        if id_of(&self.values, &layout.record_id_column).is_none() {
            return Err(Error::MissingIdColumn(layout.record_id_column.clone()));
        }

        let mut seen = HashSet::new();
        for row in &self.rows {
            let id = id_of(row, &layout.row_id_column)
                .ok_or_else(|| Error::MissingIdColumn(layout.row_id_column.clone()))?;

            if !seen.insert(id) {
                return Err(Error::DuplicateRowId(id));
            }

            if row.get(&layout.mimetype_column).and_then(Value::as_str).is_none() {
                return Err(Error::MissingColumn {
                    row: id,
                    column: layout.mimetype_column.clone(),
                });
            }
        }

        Ok(())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        // Validate format version
        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

fn id_of(values: &Values, column: &str) -> Option<RowId> {
    values.get(column).and_then(Value::as_i64)
}
