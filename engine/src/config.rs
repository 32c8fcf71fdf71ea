//! Store layout configuration.
//!
//! The engine never talks to the store, but the operations it emits must name
//! the store's columns. [`Layout`] collects those names and constants. The
//! defaults match the contacts provider; hosts with a different store load
//! their own layout from JSON.

use crate::{error::Result, ColumnName, Error};
use serde::{Deserialize, Serialize};

/// Column names and constants of the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Layout {
    /// Identity column of the record's own row
    pub record_id_column: ColumnName,
    /// Identity column of each child row
    pub row_id_column: ColumnName,
    /// Column naming the kind a child row belongs to
    pub mimetype_column: ColumnName,
    /// Column flagging the primary row of a kind
    pub is_primary_column: ColumnName,
    /// Record column toggled around child changes
    pub aggregation_mode_column: ColumnName,
    /// Aggregation mode written before child changes
    pub aggregation_suspended: i64,
    /// Aggregation mode restored after child changes
    pub aggregation_default: i64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            record_id_column: "_id".into(),
            row_id_column: "_id".into(),
            mimetype_column: "mimetype".into(),
            is_primary_column: "is_primary".into(),
            aggregation_mode_column: "aggregation_mode".into(),
            aggregation_suspended: 2,
            aggregation_default: 0,
        }
    }
}

impl Layout {
    /// Load a layout from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidLayout(e.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Check that every column is named and the two aggregation modes differ.
    pub fn validate(&self) -> Result<()> {
        let columns = [
            ("recordIdColumn", &self.record_id_column),
            ("rowIdColumn", &self.row_id_column),
            ("mimetypeColumn", &self.mimetype_column),
            ("isPrimaryColumn", &self.is_primary_column),
            ("aggregationModeColumn", &self.aggregation_mode_column),
        ];
        for (name, column) in columns {
            if column.trim().is_empty() {
                return Err(Error::InvalidLayout(format!("{name} must not be empty")));
            }
        }

        if self.aggregation_suspended == self.aggregation_default {
            return Err(Error::InvalidLayout(format!(
                "suspended and default aggregation modes are both {}",
                self.aggregation_default
            )));
        }

        Ok(())
    }
}
