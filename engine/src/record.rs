//! Record deltas: one record's own values plus its child rows.

use crate::{error::Result, Layout, RecordSnapshot, RowId, Values, ValuesDelta};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Before/after state of a record and the rows it owns.
///
/// Rows keep the order they were added in; the diff engine emits their
/// operations in exactly that order. Rows are appended or removed, never
/// reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDelta {
    /// Store layout the record was loaded with
    layout: Layout,
    /// The record's own key-values
    values: ValuesDelta,
    /// Child rows in insertion order
    entries: Vec<ValuesDelta>,
    /// Next provisional id handed to a new row
    next_insert_id: RowId,
}

impl RecordDelta {
    /// Build a delta from a stored record and its rows.
    ///
    /// Fails fast if the snapshot lacks identity or kind columns.
    pub fn from_snapshot(snapshot: RecordSnapshot, layout: Layout) -> Result<Self> {
        snapshot.validate(&layout)?;

        let values =
            ValuesDelta::from_before_with(layout.record_id_column.clone(), snapshot.values)?;
        let entries = snapshot
            .rows
            .into_iter()
            .map(|row| ValuesDelta::from_before_with(layout.row_id_column.clone(), row))
            .collect::<Result<Vec<_>>>()?;
        debug!(record = ?values.before_id(), rows = entries.len(), "loaded record snapshot");

        Ok(Self {
            layout,
            values,
            entries,
            next_insert_id: -1,
        })
    }

    /// Build a delta for a record that does not exist in the store yet.
    pub fn fresh(values: Values, layout: Layout) -> Self {
        let mut values = ValuesDelta::from_after(values);
        values.set_id_column(layout.record_id_column.clone());
        Self {
            layout,
            values,
            entries: Vec::new(),
            next_insert_id: -1,
        }
    }

    /// Store layout of this record.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Whether the record itself has never been stored.
    pub fn is_new(&self) -> bool {
        !self.values.before_exists()
    }

    /// Stored identity of the record.
    pub fn record_id(&self) -> Option<RowId> {
        self.values.before_id()
    }

    /// The record's own values.
    pub fn values(&self) -> &ValuesDelta {
        &self.values
    }

    /// Mutable access to the record's own values.
    pub fn values_mut(&mut self) -> &mut ValuesDelta {
        &mut self.values
    }

    /// Mark the whole record for deletion.
    pub fn mark_deleted(&mut self) {
        self.values.mark_deleted();
    }

    /// Child rows in insertion order.
    pub fn entries(&self) -> &[ValuesDelta] {
        &self.entries
    }

    /// Append a row and return it for further edits.
    ///
    /// Rows that were never stored and carry no id get a provisional negative
    /// id so they can be found again with [`RecordDelta::entry`]. Provisional
    /// ids handed out later stay below any negative id a row arrives with.
    pub fn add_entry(&mut self, mut entry: ValuesDelta) -> &mut ValuesDelta {
        if !entry.before_exists() {
            entry.set_id_column(self.layout.row_id_column.clone());
            match entry.id() {
                None => {
                    entry.put(self.layout.row_id_column.clone(), self.next_insert_id);
                    self.next_insert_id -= 1;
                }
                Some(id) if id <= self.next_insert_id => self.next_insert_id = id - 1,
                Some(_) => {}
            }
        }

        let index = self.entries.len();
        self.entries.push(entry);
        &mut self.entries[index]
    }

    /// Find a row by id.
    pub fn entry(&self, id: RowId) -> Option<&ValuesDelta> {
        self.entries.iter().find(|e| e.id() == Some(id))
    }

    /// Find a row by id for editing.
    pub fn entry_mut(&mut self, id: RowId) -> Option<&mut ValuesDelta> {
        self.entries.iter_mut().find(|e| e.id() == Some(id))
    }

    /// Kind of a row, read from the layout's kind column.
    pub fn mimetype_of<'e>(&self, entry: &'e ValuesDelta) -> Option<&'e str> {
        entry.get_str(&self.layout.mimetype_column)
    }

    /// Rows of one kind, including ones marked for deletion.
    pub fn mime_entries<'a, 'm>(
        &'a self,
        mimetype: &'m str,
    ) -> impl Iterator<Item = &'a ValuesDelta> + 'm
    where
        'a: 'm,
    {
        self.entries
            .iter()
            .filter(move |e| self.mimetype_of(e) == Some(mimetype))
    }

    /// Count rows of one kind.
    pub fn mime_entries_count(&self, mimetype: &str, only_visible: bool) -> usize {
        self.mime_entries(mimetype)
            .filter(|e| !only_visible || e.is_visible())
            .count()
    }

    /// The primary row of a kind: the first visible row flagged primary,
    /// otherwise the first visible row.
    pub fn primary_entry(&self, mimetype: &str) -> Option<&ValuesDelta> {
        let primary_column = self.layout.is_primary_column.as_str();
        let mut visible = self.mime_entries(mimetype).filter(|e| e.is_visible());
        let first = visible.next()?;
        if first.get_i64(primary_column).is_some_and(|p| p != 0) {
            return Some(first);
        }
        Some(
            visible
                .find(|e| e.get_i64(primary_column).is_some_and(|p| p != 0))
                .unwrap_or(first),
        )
    }

    /// Keep only the rows matching `keep`, preserving order.
    pub(crate) fn retain_entries(&mut self, keep: impl FnMut(&ValuesDelta) -> bool) {
        self.entries.retain(keep);
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [ValuesDelta] {
        &mut self.entries
    }

    /// Re-apply the edits of an older delta onto this freshly loaded one.
    ///
    /// Changed columns and deletions carry over to rows that still exist.
    /// New rows from `local` are appended. Rows edited in `local` but since
    /// removed from the store come back as inserts; rows `local` never
    /// touched follow the store.
    pub fn merge_after(&mut self, local: &RecordDelta) {
        self.values.merge_after(&local.values);

        for local_entry in &local.entries {
            match local_entry.before_id() {
                Some(id) => {
                    if let Some(entry) = self.entry_mut(id) {
                        entry.merge_after(local_entry);
                    } else if local_entry.is_update() {
                        warn!(row = id, "edited row no longer stored, re-inserting");
                        self.add_entry(ValuesDelta::from_after(local_entry.complete_values()));
                    }
                }
                None if local_entry.is_insert() => {
                    self.add_entry(ValuesDelta::from_after(local_entry.complete_values()));
                }
                None => {}
            }
        }
    }
}
