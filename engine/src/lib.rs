//! # Rowdelta Engine
//!
//! A constraint-aware editing model for structured records made of typed,
//! repeatable sub-items (a contact's phone numbers, emails, addresses).
//!
//! The crate owns two tightly coupled jobs:
//!
//! - deciding which typed variants of a sub-item may still be added to a
//!   record, and which one to suggest next
//! - tracking the before/after state of a record's rows and turning it into
//!   a minimal, ordered list of insert/update/delete operations
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches the store, it only describes changes
//! - **Deterministic**: operations come out in row insertion order, every time
//! - **Permissive**: limits are reported, not enforced, so over-limit states
//!   stay representable for diagnostics
//!
//! ## Core Concepts
//!
//! ### Schema
//!
//! A [`Schema`] lists the [`DataKind`]s a record source supports. Each kind
//! may declare a [`TypeSpec`] with ordered [`EditType`] variants and their
//! limits, plus the plain [`EditField`] columns used for emptiness checks.
//!
//! ### Deltas
//!
//! - [`ValuesDelta`] - before/after state of a single row
//! - [`RecordDelta`] - the record's own values plus its ordered rows
//!
//! ### Constraints
//!
//! [`valid_types`], [`can_insert`] and [`best_valid_type`] evaluate limits
//! against the current in-memory state; [`insert_child`] appends new rows.
//!
//! ### Diff and Trim
//!
//! [`build_diff`] emits the [`Operation`] list for a record, bracketed by
//! aggregation-mode updates; [`trim_empty`] drops or deletes rows that were
//! edited down to nothing.
//!
//! ## Quick Start
//!
//! ```rust
//! use rowdelta_engine::{
//!     build_diff, insert_child, trim_empty, DataKind, EditType, Layout, OpType,
//!     RecordDelta, RecordSnapshot, Schema, TypeSpec,
//! };
//! use serde_json::json;
//!
//! // 1. Describe the kinds a record may hold
//! let phone = DataKind::new("phone")
//!     .with_typing(
//!         TypeSpec::new(
//!             "type",
//!             vec![EditType::new(1).with_specific_max(2), EditType::new(7)],
//!         )
//!         .with_overall_max(5),
//!     )
//!     .with_field("number");
//! let schema = Schema::new("local").with_kind(phone);
//!
//! // 2. Load a record from its store snapshot
//! let snapshot = RecordSnapshot::from_json(r#"{"values": {"_id": 4}}"#).unwrap();
//! let mut record = RecordDelta::from_snapshot(snapshot, Layout::default()).unwrap();
//!
//! // 3. Add a row and fill it in
//! let kind = schema.kind("phone").unwrap();
//! let home = kind.get_type(1);
//! insert_child(&mut record, kind, home).put("number", json!("218-555-1212"));
//!
//! // 4. Drop rows left blank and build the operations
//! trim_empty(&schema, &mut record);
//! let ops = build_diff(&record).unwrap();
//! assert_eq!(ops.len(), 3);
//! assert_eq!(ops[1].op_type(), OpType::Insert);
//! ```

pub mod config;
pub mod constraint;
pub mod diff;
pub mod error;
pub mod operation;
pub mod record;
pub mod schema;
pub mod snapshot;
pub mod values;

// Re-export main types at crate root
pub use config::Layout;
pub use constraint::{
    best_valid_type, can_insert, current_type, ensure_kind_exists, get_type, has_valid_types,
    insert_child, insert_default_child, type_frequencies, valid_types, valid_types_with,
    TypeFrequencies,
};
pub use diff::{build_batch, build_diff, build_diff_into, trim_empty, trim_empty_kind, TrimSummary};
pub use error::{Error, Result};
pub use operation::{DeleteOp, InsertOp, OpType, Operation, Selector, Target, UpdateOp};
pub use record::RecordDelta;
pub use schema::{DataKind, EditField, EditType, Schema, TypeSpec};
pub use snapshot::{RecordSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use values::{ValuesDelta, DEFAULT_ID_COLUMN};

/// Type aliases for clarity
pub type ColumnName = String;
pub type Mimetype = String;
pub type RowId = i64;
pub type RawType = i64;

/// Column-to-value map used for snapshots, after-states and operation payloads.
pub type Values = std::collections::BTreeMap<ColumnName, serde_json::Value>;
