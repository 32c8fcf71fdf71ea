//! Operation types emitted by the diff engine.
//!
//! The engine never writes to the store. It describes the writes needed to
//! bring the store in line with the edited state, and an external executor
//! applies them in order, usually inside one transaction.

use crate::{RowId, Values};
use serde::{Deserialize, Serialize};

/// Which store table an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// The record's own row
    Record,
    /// A child row of the record
    Row,
}

/// How an operation picks the row it acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selector {
    /// Row with this identity
    Id(RowId),
    /// The record being edited, which the executor creates before applying
    /// the operations
    NewRecord,
}

/// Kind of an operation, for callers that only care about the verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpType {
    Insert,
    Update,
    Delete,
}

/// An insert operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOp {
    /// Target table
    pub target: Target,
    /// Column values of the new row
    pub values: Values,
    /// Record the new row belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Selector>,
}

/// An update operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOp {
    /// Target table
    pub target: Target,
    /// Row to update
    pub selector: Selector,
    /// Columns to write
    pub values: Values,
}

/// A delete operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOp {
    /// Target table
    pub target: Target,
    /// Row to delete
    pub selector: Selector,
}

/// An operation against the external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    Insert(InsertOp),
    Update(UpdateOp),
    Delete(DeleteOp),
}

impl Operation {
    /// Get the operation verb.
    pub fn op_type(&self) -> OpType {
        match self {
            Operation::Insert(_) => OpType::Insert,
            Operation::Update(_) => OpType::Update,
            Operation::Delete(_) => OpType::Delete,
        }
    }

    /// Get the table this operation addresses.
    pub fn target(&self) -> Target {
        match self {
            Operation::Insert(op) => op.target,
            Operation::Update(op) => op.target,
            Operation::Delete(op) => op.target,
        }
    }

    /// Get the selector of an update or delete.
    pub fn selector(&self) -> Option<Selector> {
        match self {
            Operation::Insert(_) => None,
            Operation::Update(op) => Some(op.selector),
            Operation::Delete(op) => Some(op.selector),
        }
    }

    /// Get the written values of an insert or update.
    pub fn values(&self) -> Option<&Values> {
        match self {
            Operation::Insert(op) => Some(&op.values),
            Operation::Update(op) => Some(&op.values),
            Operation::Delete(_) => None,
        }
    }
}

impl InsertOp {
    /// Create a new insert operation with no parent.
    pub fn new(target: Target, values: Values) -> Self {
        Self {
            target,
            values,
            parent: None,
        }
    }

    /// Attach the record the new row belongs to.
    pub fn with_parent(mut self, parent: Selector) -> Self {
        self.parent = Some(parent);
        self
    }
}

impl UpdateOp {
    /// Create a new update operation.
    pub fn new(target: Target, selector: Selector, values: Values) -> Self {
        Self {
            target,
            selector,
            values,
        }
    }
}

impl DeleteOp {
    /// Create a new delete operation.
    pub fn new(target: Target, selector: Selector) -> Self {
        Self { target, selector }
    }
}
