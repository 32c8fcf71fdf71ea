//! Constraint evaluation for typed rows.
//!
//! Every function here reads the current in-memory state of a record, so
//! rows added earlier in the same session count immediately. Limits are
//! reported, never enforced: [`insert_child`] appends rows regardless, and
//! callers that want enforcement check [`can_insert`] first.
//!
//! # Counting
//!
//! Only visible rows of the kind count. A row counts toward the overall
//! total whether or not its type column resolves to a declared type; it
//! counts toward a specific type only when it does.

use crate::{DataKind, EditType, RawType, RecordDelta, ValuesDelta};
use std::collections::BTreeMap;
use tracing::trace;

/// Row counts of one kind within a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeFrequencies {
    total: usize,
    per_type: BTreeMap<RawType, usize>,
}

impl TypeFrequencies {
    /// Visible rows of the kind.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Visible rows carrying the given type value.
    pub fn count(&self, raw_value: RawType) -> usize {
        self.per_type.get(&raw_value).copied().unwrap_or(0)
    }

    /// Counts as they would be if one row of `excluded` were gone.
    pub fn without(mut self, excluded: &EditType) -> Self {
        if let Some(count) = self.per_type.get_mut(&excluded.raw_value) {
            if *count > 0 {
                *count -= 1;
                self.total = self.total.saturating_sub(1);
            }
        }
        self
    }

    fn allows(&self, kind: &DataKind, edit_type: &EditType) -> bool {
        let valid_overall = kind.overall_max().map_or(true, |max| self.total < max);
        let valid_specific = edit_type
            .specific_max
            .map_or(true, |max| self.count(edit_type.raw_value) < max);
        valid_overall && valid_specific
    }
}

/// Look up a type of `kind` by raw value.
pub fn get_type(kind: &DataKind, raw_value: RawType) -> Option<&EditType> {
    kind.get_type(raw_value)
}

/// Resolve the declared type a row currently carries.
pub fn current_type<'k>(entry: &ValuesDelta, kind: &'k DataKind) -> Option<&'k EditType> {
    let column = kind.type_column()?;
    let raw_value = entry.get_i64(column)?;
    kind.get_type(raw_value)
}

/// Count the visible rows of `kind` in `record`, in total and per type.
pub fn type_frequencies(record: &RecordDelta, kind: &DataKind) -> TypeFrequencies {
    let mut frequencies = TypeFrequencies::default();
    for entry in record
        .mime_entries(&kind.mimetype)
        .filter(|e| e.is_visible())
    {
        frequencies.total += 1;
        if let Some(edit_type) = current_type(entry, kind) {
            *frequencies.per_type.entry(edit_type.raw_value).or_insert(0) += 1;
        }
    }
    frequencies
}

/// Types of `kind` that may still be added, in declaration order.
///
/// With `excluding` set, one row of that type is treated as absent, which
/// answers "what could this row become if it gave up its current type".
/// Untyped kinds return an empty list.
pub fn valid_types<'k>(
    record: &RecordDelta,
    kind: &'k DataKind,
    excluding: Option<&EditType>,
) -> Vec<&'k EditType> {
    valid_types_with(record, kind, excluding, true)
}

/// Like [`valid_types`], optionally leaving out secondary types.
pub fn valid_types_with<'k>(
    record: &RecordDelta,
    kind: &'k DataKind,
    excluding: Option<&EditType>,
    include_secondary: bool,
) -> Vec<&'k EditType> {
    if !kind.has_types() {
        return Vec::new();
    }

    let mut frequencies = type_frequencies(record, kind);
    if let Some(excluded) = excluding {
        frequencies = frequencies.without(excluded);
    }
    collect_valid(kind, &frequencies, include_secondary)
}

fn collect_valid<'k>(
    kind: &'k DataKind,
    frequencies: &TypeFrequencies,
    include_secondary: bool,
) -> Vec<&'k EditType> {
    kind.types()
        .iter()
        .filter(|t| include_secondary || !t.secondary)
        .filter(|t| frequencies.allows(kind, t))
        .collect()
}

/// Whether a typed kind still has a type to offer. Untyped kinds always do.
pub fn has_valid_types(record: &RecordDelta, kind: &DataKind) -> bool {
    !kind.has_types() || !valid_types(record, kind, None).is_empty()
}

/// Whether another row of `kind` may be added to `record`.
pub fn can_insert(record: &RecordDelta, kind: &DataKind) -> bool {
    let visible = record.mime_entries_count(&kind.mimetype, true);
    let valid_rows = kind.max_rows.map_or(true, |max| visible < max);
    valid_rows && has_valid_types(record, kind)
}

/// Suggest the type for the next row of `kind`.
///
/// Candidates are the valid types, with secondary ones only when
/// `include_secondary` is set. Walking them in declaration order, a type
/// whose current count equals `exact_count` wins outright; otherwise the
/// first type no visible row uses yet is chosen. When every candidate is
/// already in use the last candidate is returned. `None` means there is no
/// candidate at all, and the caller picks its own fallback.
pub fn best_valid_type<'k>(
    record: &RecordDelta,
    kind: &'k DataKind,
    include_secondary: bool,
    exact_count: Option<usize>,
) -> Option<&'k EditType> {
    kind.type_column()?;

    let frequencies = type_frequencies(record, kind);
    let candidates = collect_valid(kind, &frequencies, include_secondary);
    let last = *candidates.last()?;

    let mut unused = None;
    for candidate in candidates {
        let count = frequencies.count(candidate.raw_value);
        if Some(count) == exact_count {
            return Some(candidate);
        }
        if count == 0 && unused.is_none() {
            unused = Some(candidate);
        }
    }
    Some(unused.unwrap_or(last))
}

/// Append a new row of `kind` to `record` and return it for editing.
///
/// The row starts with the kind's default values, its kind column, and the
/// type column set to `edit_type` when the kind is typed. Limits are not
/// checked here.
pub fn insert_child<'r>(
    record: &'r mut RecordDelta,
    kind: &DataKind,
    edit_type: Option<&EditType>,
) -> &'r mut ValuesDelta {
    let mut after = kind.default_values.clone();
    after.insert(
        record.layout().mimetype_column.clone(),
        kind.mimetype.clone().into(),
    );
    if let (Some(column), Some(edit_type)) = (kind.type_column(), edit_type) {
        after.insert(column.to_string(), edit_type.raw_value.into());
    }
    trace!(
        kind = %kind.mimetype,
        edit_type = ?edit_type.map(|t| t.raw_value),
        "inserting child row"
    );
    record.add_entry(ValuesDelta::from_after(after))
}

/// Append a row typed with the best non-secondary suggestion.
pub fn insert_default_child<'r>(
    record: &'r mut RecordDelta,
    kind: &DataKind,
) -> &'r mut ValuesDelta {
    let best = best_valid_type(record, kind, false, None);
    insert_child(record, kind, best)
}

/// Make sure `record` shows at least one row of `kind`.
///
/// Returns `true` if a row had to be added.
pub fn ensure_kind_exists(record: &mut RecordDelta, kind: &DataKind) -> bool {
    if record.mime_entries_count(&kind.mimetype, true) > 0 {
        return false;
    }
    insert_default_child(record, kind);
    true
}
