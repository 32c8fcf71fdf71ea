//! Row deltas: the before/after state of a single row.
//!
//! A [`ValuesDelta`] keeps the snapshot a row was loaded from (if any) next to
//! the working copy the editor mutates. The two slots never alias; changes are
//! found by comparing them column by column.

use crate::{
    error::Result, ColumnName, DataKind, DeleteOp, Error, InsertOp, Operation, RowId, Selector,
    Target, UpdateOp, Values,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity column used when none is given.
pub const DEFAULT_ID_COLUMN: &str = "_id";

/// Before/after state of one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesDelta {
    /// Column holding the row identity
    id_column: ColumnName,
    /// State in the store, absent if the row was never persisted
    before: Option<Values>,
    /// Working state
    after: Values,
    /// Marked for deletion
    deleted: bool,
}

impl ValuesDelta {
    /// Create a delta for a row loaded from the store.
    ///
    /// Fails if the snapshot has no integer value in the `_id` column.
    pub fn from_before(before: Values) -> Result<Self> {
        Self::from_before_with(DEFAULT_ID_COLUMN, before)
    }

    /// Create a delta for a stored row whose identity lives in `id_column`.
    pub fn from_before_with(id_column: impl Into<ColumnName>, before: Values) -> Result<Self> {
        let id_column = id_column.into();
        if before.get(&id_column).and_then(Value::as_i64).is_none() {
            return Err(Error::MissingIdColumn(id_column));
        }

        Ok(Self {
            id_column,
            after: before.clone(),
            before: Some(before),
            deleted: false,
        })
    }

    /// Create a delta for a row that does not exist in the store yet.
    pub fn from_after(after: Values) -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.into(),
            before: None,
            after,
            deleted: false,
        }
    }

    /// Column holding the row identity.
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub(crate) fn set_id_column(&mut self, id_column: impl Into<ColumnName>) {
        self.id_column = id_column.into();
    }

    /// State in the store.
    pub fn before(&self) -> Option<&Values> {
        self.before.as_ref()
    }

    /// Working state, `None` once marked for deletion.
    pub fn after(&self) -> Option<&Values> {
        (!self.deleted).then_some(&self.after)
    }

    /// Current value of a column. Null counts as unset.
    ///
    /// Deleted rows answer from their stored state, or from their working
    /// state if they were never stored.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let values = match &self.before {
            Some(before) if self.deleted => before,
            _ => &self.after,
        };
        values.get(column).filter(|v| !v.is_null())
    }

    /// Current value of a column as a string.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    /// Current value of a column as an integer.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    /// Row identity: the stored id, or the provisional id of a new row.
    pub fn id(&self) -> Option<RowId> {
        self.after
            .get(&self.id_column)
            .and_then(Value::as_i64)
            .or_else(|| self.before_id())
    }

    /// Identity of the row in the store.
    pub fn before_id(&self) -> Option<RowId> {
        self.before
            .as_ref()?
            .get(&self.id_column)
            .and_then(Value::as_i64)
    }

    /// Write a column.
    pub fn put(&mut self, column: impl Into<ColumnName>, value: impl Into<Value>) {
        self.after.insert(column.into(), value.into());
    }

    /// Clear a column.
    pub fn put_null(&mut self, column: impl Into<ColumnName>) {
        self.after.insert(column.into(), Value::Null);
    }

    /// Mark the row for deletion.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Whether the row exists in the store.
    pub fn before_exists(&self) -> bool {
        self.before.is_some()
    }

    /// Whether the row is still part of the working state.
    pub fn is_visible(&self) -> bool {
        !self.deleted
    }

    /// New row waiting to be inserted.
    pub fn is_insert(&self) -> bool {
        self.before.is_none() && !self.deleted
    }

    /// Stored row waiting to be deleted.
    pub fn is_delete(&self) -> bool {
        self.before.is_some() && self.deleted
    }

    /// New row deleted before it was ever stored.
    pub fn is_transient(&self) -> bool {
        self.before.is_none() && self.deleted
    }

    /// Stored row with at least one column changed.
    pub fn is_update(&self) -> bool {
        self.before.is_some() && !self.deleted && !self.changed_columns().is_empty()
    }

    /// Whether anything about this row differs from the store.
    pub fn is_changed(&self) -> bool {
        self.before.is_none() || self.deleted || !self.changed_columns().is_empty()
    }

    /// Columns whose working value differs from the stored one, in column order.
    ///
    /// Every set column counts as changed when the row was never stored.
    pub fn changed_columns(&self) -> Vec<&str> {
        let Some(before) = &self.before else {
            return self
                .after
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k.as_str())
                .collect();
        };

        let mut columns: Vec<&str> = before
            .keys()
            .chain(self.after.keys())
            .map(String::as_str)
            .filter(|column| {
                unset_if_null(before.get(*column)) != unset_if_null(self.after.get(*column))
            })
            .collect();
        columns.sort_unstable();
        columns.dedup();
        columns
    }

    /// Whether every plain field of `kind` is unset or blank.
    ///
    /// Values are read as [`ValuesDelta::get`] reads them. The type column and
    /// identity columns never count.
    pub fn is_empty_for(&self, kind: &DataKind) -> bool {
        !kind
            .fields
            .iter()
            .any(|field| self.get(&field.column).is_some_and(has_content))
    }

    /// Express this row as a store operation, or `None` if nothing changed.
    ///
    /// Inserts carry every set column except the identity; updates carry only
    /// the changed columns, with cleared columns sent as null.
    pub fn build_diff(&self, target: Target) -> Option<Operation> {
        if self.is_insert() {
            let values = self
                .after
                .iter()
                .filter(|(k, v)| **k != self.id_column && !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Some(Operation::Insert(InsertOp::new(target, values)))
        } else if self.is_delete() {
            let id = self.before_id()?;
            Some(Operation::Delete(DeleteOp::new(target, Selector::Id(id))))
        } else if self.is_update() {
            let id = self.before_id()?;
            let values = self
                .changed_columns()
                .into_iter()
                .map(|column| {
                    let value = self.after.get(column).cloned().unwrap_or(Value::Null);
                    (column.to_string(), value)
                })
                .collect();
            Some(Operation::Update(UpdateOp::new(
                target,
                Selector::Id(id),
                values,
            )))
        } else {
            None
        }
    }

    /// Re-apply the edits of `local` on top of this row.
    pub fn merge_after(&mut self, local: &ValuesDelta) {
        if local.deleted {
            self.mark_deleted();
            return;
        }

        for column in local.changed_columns() {
            if column == local.id_column {
                continue;
            }
            let value = local.after.get(column).cloned().unwrap_or(Value::Null);
            self.after.insert(column.to_string(), value);
        }
    }

    /// Working values without the identity column, for re-inserting a row.
    pub(crate) fn complete_values(&self) -> Values {
        let mut values = self.after.clone();
        values.remove(&self.id_column);
        values
    }
}

fn unset_if_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => s.chars().any(|c| !c.is_whitespace() && !c.is_control()),
        _ => true,
    }
}
