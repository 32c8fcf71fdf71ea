//! Schema definition and validation.
//!
//! A schema describes, for one record source, which kinds of rows a record
//! may hold, which typed variants each kind allows and how many of them, and
//! which plain columns carry the row's data. Schemas are immutable once built
//! and shared by reference between editing sessions.

use crate::{error::Result, ColumnName, Error, Mimetype, RawType, Values};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One allowed value of a kind's type column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditType {
    /// Value stored in the type column
    pub raw_value: RawType,
    /// Maximum rows of this type, `None` for unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_max: Option<usize>,
    /// Excluded from default suggestions but still insertable
    #[serde(default)]
    pub secondary: bool,
}

impl EditType {
    /// Create an unbounded, non-secondary type.
    pub fn new(raw_value: RawType) -> Self {
        Self {
            raw_value,
            specific_max: None,
            secondary: false,
        }
    }

    /// Limit how many rows may carry this type.
    pub fn with_specific_max(mut self, max: usize) -> Self {
        self.specific_max = Some(max);
        self
    }

    /// Mark this type as secondary.
    pub fn with_secondary(mut self, secondary: bool) -> Self {
        self.secondary = secondary;
        self
    }
}

/// A plain data column of a kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditField {
    /// Column name
    pub column: ColumnName,
}

impl EditField {
    /// Create a field for the given column.
    pub fn new(column: impl Into<ColumnName>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

/// Typed-variant descriptor of a kind.
///
/// Types keep their declaration order: suggestions walk them front to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSpec {
    /// Column holding the row's type value
    pub column: ColumnName,
    /// Allowed types in declaration order
    pub types: Vec<EditType>,
    /// Maximum rows across all types combined, `None` for unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_max: Option<usize>,
}

impl TypeSpec {
    /// Create a descriptor with no overall limit.
    pub fn new(column: impl Into<ColumnName>, types: Vec<EditType>) -> Self {
        Self {
            column: column.into(),
            types,
            overall_max: None,
        }
    }

    /// Limit how many typed rows the kind may hold in total.
    pub fn with_overall_max(mut self, max: usize) -> Self {
        self.overall_max = Some(max);
        self
    }
}

/// A category of repeatable rows, such as phone numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataKind {
    /// Value of the layout's kind column for rows of this kind
    pub mimetype: Mimetype,
    /// Maximum rows of this kind per record, `None` for unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
    /// Typed-variant descriptor, absent for untyped kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typing: Option<TypeSpec>,
    /// Plain data columns
    #[serde(default)]
    pub fields: Vec<EditField>,
    /// Values copied into every new row of this kind
    #[serde(default, skip_serializing_if = "Values::is_empty")]
    pub default_values: Values,
}

impl DataKind {
    /// Create an untyped kind with no fields.
    pub fn new(mimetype: impl Into<Mimetype>) -> Self {
        Self {
            mimetype: mimetype.into(),
            max_rows: None,
            typing: None,
            fields: Vec::new(),
            default_values: Values::new(),
        }
    }

    /// Limit how many rows of this kind a record may hold.
    pub fn with_max_rows(mut self, max: usize) -> Self {
        self.max_rows = Some(max);
        self
    }

    /// Attach a typed-variant descriptor.
    pub fn with_typing(mut self, typing: TypeSpec) -> Self {
        self.typing = Some(typing);
        self
    }

    /// Append a plain data column.
    pub fn with_field(mut self, column: impl Into<ColumnName>) -> Self {
        self.fields.push(EditField::new(column));
        self
    }

    /// Set a value copied into new rows.
    pub fn with_default(
        mut self,
        column: impl Into<ColumnName>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.default_values.insert(column.into(), value.into());
        self
    }

    /// Column holding the row type, if the kind is typed.
    pub fn type_column(&self) -> Option<&str> {
        self.typing.as_ref().map(|t| t.column.as_str())
    }

    /// Allowed types in declaration order. Empty for untyped kinds.
    pub fn types(&self) -> &[EditType] {
        self.typing
            .as_ref()
            .map(|t| t.types.as_slice())
            .unwrap_or_default()
    }

    /// Whether the kind declares at least one type.
    pub fn has_types(&self) -> bool {
        !self.types().is_empty()
    }

    /// Overall limit across all types.
    pub fn overall_max(&self) -> Option<usize> {
        self.typing.as_ref().and_then(|t| t.overall_max)
    }

    /// Look up a type by its raw value.
    pub fn get_type(&self, raw_value: RawType) -> Option<&EditType> {
        self.types().iter().find(|t| t.raw_value == raw_value)
    }

    fn validate(&self) -> Result<()> {
        let Some(typing) = &self.typing else {
            return Ok(());
        };

        if typing.column.trim().is_empty() {
            return Err(Error::InvalidSchema(format!(
                "kind '{}' has an empty type column",
                self.mimetype
            )));
        }

        let mut seen = HashSet::new();
        for edit_type in &typing.types {
            if !seen.insert(edit_type.raw_value) {
                return Err(Error::DuplicateType {
                    kind: self.mimetype.clone(),
                    raw_value: edit_type.raw_value,
                });
            }
        }

        // Only one catch-all type may absorb rows once the capped ones fill up
        let fallbacks = typing
            .types
            .iter()
            .filter(|t| t.specific_max.is_none() && !t.secondary)
            .count();
        if fallbacks > 1 {
            return Err(Error::InvalidSchema(format!(
                "kind '{}' declares {} unbounded primary types",
                self.mimetype, fallbacks
            )));
        }

        Ok(())
    }
}

/// Schema for one record source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Record source this schema describes
    pub source: String,
    /// Kinds in declaration order
    pub kinds: Vec<DataKind>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kinds: Vec::new(),
        }
    }

    /// Add a kind to the schema.
    pub fn add_kind(&mut self, kind: DataKind) -> &mut Self {
        self.kinds.push(kind);
        self
    }

    /// Builder-style method to add a kind.
    pub fn with_kind(mut self, kind: DataKind) -> Self {
        self.add_kind(kind);
        self
    }

    /// Get a kind by mimetype.
    pub fn kind(&self, mimetype: &str) -> Option<&DataKind> {
        self.kinds.iter().find(|k| k.mimetype == mimetype)
    }

    /// All kinds in declaration order.
    pub fn kinds(&self) -> &[DataKind] {
        &self.kinds
    }

    /// Check the schema invariants.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for kind in &self.kinds {
            if !seen.insert(kind.mimetype.as_str()) {
                return Err(Error::DuplicateKind(kind.mimetype.clone()));
            }
            kind.validate()?;
        }
        Ok(())
    }

    /// Load and validate a schema from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSchema(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSchema(e.to_string()))
    }
}
