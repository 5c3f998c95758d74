// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Declarative field validation.
//!
//! Every index declaration names which fields of the backing record type are
//! searchable, filterable, and sortable. [`resolve_fields`] checks those
//! declarations against the fields the schema actually has, resolving the
//! [`FieldSpec::All`] sentinel to the schema's full field list.
//!
//! Validation is pure: no I/O, no shared state, order-preserving.

use thiserror::Error;

/// Which role a declared field list plays on the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Fields usable for full-text matching.
    Searchable,
    /// Fields usable for equality/range filtering.
    Filterable,
    /// Fields usable for result ordering.
    Sortable,
}

impl FieldKind {
    /// Attribute name as it appears in declarations and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Searchable => "searchable_fields",
            FieldKind::Filterable => "filterable_fields",
            FieldKind::Sortable => "sortable_fields",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared field list: either an explicit ordered set of field names or
/// the "all fields" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSpec {
    /// Resolve to every field the backing schema has, in schema order.
    #[default]
    All,
    /// An explicit ordered set of field names.
    Fields(Vec<String>),
}

impl FieldSpec {
    /// Convenience constructor from anything iterable over string-likes.
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSpec::Fields(names.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSpec {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        FieldSpec::fields(iter)
    }
}

/// Errors raised while validating an index declaration.
///
/// These are configuration errors: they indicate a broken contract between
/// the declaration and the backing schema, and always propagate to the
/// declarer rather than being swallowed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required declaration attribute is absent or empty.
    #[error("declaration is missing required field `{field}`")]
    MissingRequiredField { field: &'static str },

    /// The index name is not usable as a remote index uid.
    #[error("invalid index name {name:?}: {reason}")]
    InvalidIndexName { name: String, reason: &'static str },

    /// The backing schema reference is not a usable record schema.
    #[error("invalid schema reference {schema:?}: {reason}")]
    InvalidSchemaReference { schema: String, reason: &'static str },

    /// The primary key field is absent from the backing schema.
    #[error("schema {schema:?} has no primary key field named {field:?}")]
    InvalidPrimaryKey { schema: String, field: String },

    /// A declared searchable/filterable/sortable field is absent from the
    /// backing schema.
    #[error("{kind} names unknown field {field:?}")]
    InvalidFieldSet { kind: FieldKind, field: String },

    /// Two live definitions would share the same public index name.
    #[error("index name {name:?} is already registered under {existing_label:?}")]
    DuplicateIndexName { name: String, existing_label: String },
}

/// Resolve a declared field list against the fields available on the schema.
///
/// `FieldSpec::All` resolves to `available` verbatim. Explicit lists are
/// checked member-by-member; the first name absent from `available` fails
/// with [`ConfigError::InvalidFieldSet`] naming the offending field and the
/// kind that declared it. Order of the declared list is preserved.
pub fn resolve_fields(
    kind: FieldKind,
    spec: &FieldSpec,
    available: &[String],
) -> Result<Vec<String>, ConfigError> {
    match spec {
        FieldSpec::All => Ok(available.to_vec()),
        FieldSpec::Fields(names) => {
            for name in names {
                if !available.iter().any(|f| f == name) {
                    return Err(ConfigError::InvalidFieldSet {
                        kind,
                        field: name.clone(),
                    });
                }
            }
            Ok(names.clone())
        }
    }
}
