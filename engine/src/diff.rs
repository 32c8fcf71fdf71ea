//! Diff and trim.
//!
//! [`build_diff`] turns a [`RecordDelta`] into the operations that bring the
//! store in line with it. The list has the shape
//!
//! ```text
//! [suspend aggregation, record update?, row op 1, ..., row op n, restore aggregation]
//! ```
//!
//! with row operations in row insertion order. When nothing changed the list
//! is empty. A record marked for deletion produces a single delete and its
//! rows are ignored. A new record is never created here: the executor creates
//! it first and resolves [`Selector::NewRecord`] to its id.
//!
//! [`trim_empty`] runs before a save and discards edits that net out to
//! nothing: new rows left blank are dropped, stored rows edited down to blank
//! are deleted.

use crate::{
    error::Result, DataKind, Error, Operation, RecordDelta, Schema, Selector, Target, UpdateOp,
    Values, ValuesDelta,
};
use tracing::{debug, trace};

/// Build the operations for one record.
pub fn build_diff(record: &RecordDelta) -> Result<Vec<Operation>> {
    let mut ops = Vec::new();
    build_diff_into(record, &mut ops)?;
    Ok(ops)
}

/// Build the operations for many records, one after another.
pub fn build_batch<'a>(
    records: impl IntoIterator<Item = &'a RecordDelta>,
) -> Result<Vec<Operation>> {
    let mut ops = Vec::new();
    for record in records {
        build_diff_into(record, &mut ops)?;
    }
    Ok(ops)
}

/// Append the operations for one record to `ops`.
///
/// On error `ops` is left as it was.
pub fn build_diff_into(record: &RecordDelta, ops: &mut Vec<Operation>) -> Result<()> {
    let values = record.values();
    if values.is_transient() {
        trace!("record never stored and deleted, nothing to emit");
        return Ok(());
    }

    let selector = match record.record_id() {
        Some(id) => Selector::Id(id),
        None => Selector::NewRecord,
    };

    if values.is_delete() {
        debug!(?selector, "record marked for deletion");
        ops.extend(values.build_diff(Target::Record));
        return Ok(());
    }

    if record.is_new() {
        if let Some(stored) = record.entries().iter().find(|e| e.before_exists()) {
            return Err(Error::PersistedRowOnNewRecord(
                stored.before_id().unwrap_or_default(),
            ));
        }
    }

    let first = ops.len();

    if !record.is_new() {
        if let Some(update) = values.build_diff(Target::Record) {
            ops.push(update);
        }
    }

    for entry in record.entries() {
        let op = match entry.build_diff(Target::Row) {
            Some(Operation::Insert(insert)) => Operation::Insert(insert.with_parent(selector)),
            Some(op) => op,
            None => continue,
        };
        ops.push(op);
    }

    if ops.len() > first {
        let layout = record.layout();
        ops.insert(first, aggregation_update(record, selector, layout.aggregation_suspended));
        ops.push(aggregation_update(record, selector, layout.aggregation_default));
    }

    debug!(?selector, operations = ops.len() - first, "built record diff");
    Ok(())
}

fn aggregation_update(record: &RecordDelta, selector: Selector, mode: i64) -> Operation {
    let mut values = Values::new();
    values.insert(record.layout().aggregation_mode_column.clone(), mode.into());
    Operation::Update(UpdateOp::new(Target::Record, selector, values))
}

/// Outcome of a trim pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimSummary {
    /// New rows dropped from the record
    pub removed: usize,
    /// Stored rows marked for deletion
    pub deleted: usize,
}

impl TrimSummary {
    /// Whether the pass changed anything.
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.deleted == 0
    }
}

impl std::ops::AddAssign for TrimSummary {
    fn add_assign(&mut self, other: Self) {
        self.removed += other.removed;
        self.deleted += other.deleted;
    }
}

/// Discard blank edits across every kind the schema knows.
///
/// Only touched rows are examined: a pending insert that is blank is
/// removed, a pending update that left the row blank becomes a delete.
/// Untouched rows stay as they are, even when blank, and so do rows whose
/// kind the schema does not declare. Running it twice changes nothing the
/// second time.
pub fn trim_empty(schema: &Schema, record: &mut RecordDelta) -> TrimSummary {
    let mut summary = TrimSummary::default();
    for kind in schema.kinds() {
        summary += trim_empty_kind(kind, record);
    }

    let unknown = record
        .entries()
        .iter()
        .filter(|e| {
            record
                .mimetype_of(e)
                .map_or(true, |mimetype| schema.kind(mimetype).is_none())
        })
        .count();
    if unknown > 0 {
        debug!(rows = unknown, "skipped rows of undeclared kinds");
    }

    debug!(
        removed = summary.removed,
        deleted = summary.deleted,
        "trimmed record"
    );
    summary
}

/// Discard blank edits among the rows of one kind.
pub fn trim_empty_kind(kind: &DataKind, record: &mut RecordDelta) -> TrimSummary {
    let mimetype_column = record.layout().mimetype_column.clone();
    let is_blank_insert = |e: &ValuesDelta| {
        e.get_str(&mimetype_column) == Some(kind.mimetype.as_str())
            && e.is_insert()
            && e.is_empty_for(kind)
    };

    let before = record.entries().len();
    record.retain_entries(|e| !is_blank_insert(e));
    let removed = before - record.entries().len();

    let mut deleted = 0;
    for entry in record.entries_mut() {
        if entry.get_str(&mimetype_column) == Some(kind.mimetype.as_str())
            && entry.is_update()
            && entry.is_empty_for(kind)
        {
            entry.mark_deleted();
            deleted += 1;
        }
    }

    if removed > 0 || deleted > 0 {
        trace!(kind = %kind.mimetype, removed, deleted, "trimmed kind");
    }
    TrimSummary { removed, deleted }
}

impl RecordDelta {
    /// Build the operations for this record. See [`build_diff`].
    pub fn build_diff(&self) -> Result<Vec<Operation>> {
        build_diff(self)
    }
}
