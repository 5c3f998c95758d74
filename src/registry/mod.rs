// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Schema registry.
//!
//! An [`IndexDeclaration`] is validated here, once, at registration time,
//! producing an immutable [`IndexDefinition`]. The [`IndexRegistry`] keeps
//! two lookup tables over live definitions: by qualified label (namespace +
//! declaration label) and by public index name. Re-registering the same
//! qualified label replaces the prior entry to support declaration reload in
//! long-running processes; two live labels may never share one public name.
//!
//! Definitions are removed explicitly via [`IndexRegistry::remove`] — there
//! is no garbage-collection magic keeping the tables honest.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::document::{DocumentMapper, TimestampMode};
use crate::metrics;
use crate::schema::{resolve_fields, ConfigError, FieldKind, FieldSpec};
use crate::source::DataSource;

/// Qualified key of a backing schema: owning namespace plus record type.
/// Change-sync subscriptions are keyed by this.
pub fn schema_key(source: &dyn DataSource) -> String {
    format!("{}.{}", source.namespace(), source.schema_name())
}

/// Characters allowed in a remote index uid.
fn valid_index_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// The declarative unit of configuration, authored by the application.
///
/// Only `name`, `label`, and `source` are required; field specs default to
/// the "all fields" sentinel and the batch size to the engine default.
pub struct IndexDeclaration {
    pub name: String,
    /// Local declaration label; combined with the source's namespace to form
    /// the qualified registry label.
    pub label: String,
    pub source: Arc<dyn DataSource>,
    pub primary_key_field: Option<String>,
    pub searchable_fields: FieldSpec,
    pub filterable_fields: FieldSpec,
    pub sortable_fields: FieldSpec,
    pub batch_size: Option<usize>,
    pub timestamp_mode: TimestampMode,
}

impl IndexDeclaration {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        source: Arc<dyn DataSource>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            source,
            primary_key_field: None,
            searchable_fields: FieldSpec::All,
            filterable_fields: FieldSpec::All,
            sortable_fields: FieldSpec::All,
            batch_size: None,
            timestamp_mode: TimestampMode::default(),
        }
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key_field = Some(field.into());
        self
    }

    pub fn searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable_fields = FieldSpec::fields(fields);
        self
    }

    pub fn filterable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filterable_fields = FieldSpec::fields(fields);
        self
    }

    pub fn sortable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sortable_fields = FieldSpec::fields(fields);
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn timestamps(mut self, mode: TimestampMode) -> Self {
        self.timestamp_mode = mode;
        self
    }
}

/// A validated, immutable index configuration.
///
/// Produced once per declaration; never mutated afterward. Shared by the
/// lifecycle manager, batch populator, change sync, and query normalizer.
pub struct IndexDefinition {
    pub name: String,
    pub qualified_label: String,
    pub source: Arc<dyn DataSource>,
    pub primary_key_field: String,
    pub searchable_fields: Vec<String>,
    pub filterable_fields: Vec<String>,
    pub sortable_fields: Vec<String>,
    pub batch_size: usize,
    pub timestamp_mode: TimestampMode,
    pub mapper: DocumentMapper,
}

impl std::fmt::Debug for IndexDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexDefinition")
            .field("name", &self.name)
            .field("qualified_label", &self.qualified_label)
            .field("primary_key_field", &self.primary_key_field)
            .field("searchable_fields", &self.searchable_fields)
            .field("filterable_fields", &self.filterable_fields)
            .field("sortable_fields", &self.sortable_fields)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Tables {
    by_label: HashMap<String, Arc<IndexDefinition>>,
    by_name: HashMap<String, String>,
}

/// Live definitions, keyed by qualified label and by public name.
///
/// Mutated during declaration loading and teardown; read everywhere else.
pub struct IndexRegistry {
    default_batch_size: usize,
    tables: RwLock<Tables>,
}

impl IndexRegistry {
    pub fn new(default_batch_size: usize) -> Self {
        Self {
            default_batch_size,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Validate a declaration and insert the resulting definition.
    ///
    /// Checks run in declaration order: required attributes, index name,
    /// schema reference, primary key, then the three field sets. The first
    /// failure propagates; nothing is inserted on error.
    pub fn register(&self, decl: IndexDeclaration) -> Result<Arc<IndexDefinition>, ConfigError> {
        let result = self.register_inner(decl);
        match &result {
            Ok(def) => {
                metrics::record_registration("success");
                info!(
                    index = %def.name,
                    label = %def.qualified_label,
                    "Index definition registered"
                );
            }
            Err(err) => {
                metrics::record_registration("error");
                debug!(error = %err, "Index registration rejected");
            }
        }
        result
    }

    fn register_inner(&self, decl: IndexDeclaration) -> Result<Arc<IndexDefinition>, ConfigError> {
        if decl.name.is_empty() {
            return Err(ConfigError::MissingRequiredField { field: "name" });
        }
        if decl.label.is_empty() {
            return Err(ConfigError::MissingRequiredField { field: "label" });
        }
        if !valid_index_name(&decl.name) {
            return Err(ConfigError::InvalidIndexName {
                name: decl.name,
                reason: "only alphanumerics, `-` and `_` are allowed",
            });
        }

        let source = decl.source;
        let field_names = source.field_names();
        if field_names.is_empty() {
            return Err(ConfigError::InvalidSchemaReference {
                schema: source.schema_name().to_string(),
                reason: "schema exposes no fields",
            });
        }

        let primary_key_field = decl
            .primary_key_field
            .unwrap_or_else(|| source.primary_key().to_string());
        if primary_key_field.is_empty() {
            return Err(ConfigError::InvalidSchemaReference {
                schema: source.schema_name().to_string(),
                reason: "schema declares no primary key",
            });
        }
        if !field_names.iter().any(|f| *f == primary_key_field) {
            return Err(ConfigError::InvalidPrimaryKey {
                schema: source.schema_name().to_string(),
                field: primary_key_field,
            });
        }

        let searchable_fields =
            resolve_fields(FieldKind::Searchable, &decl.searchable_fields, &field_names)?;
        let filterable_fields =
            resolve_fields(FieldKind::Filterable, &decl.filterable_fields, &field_names)?;
        let sortable_fields =
            resolve_fields(FieldKind::Sortable, &decl.sortable_fields, &field_names)?;

        let mapper = DocumentMapper::new(&field_names, &source.field_types(), decl.timestamp_mode);
        let qualified_label = format!("{}.{}", source.namespace(), decl.label);

        let def = Arc::new(IndexDefinition {
            name: decl.name,
            qualified_label: qualified_label.clone(),
            source,
            primary_key_field,
            searchable_fields,
            filterable_fields,
            sortable_fields,
            batch_size: decl.batch_size.unwrap_or(self.default_batch_size),
            timestamp_mode: decl.timestamp_mode,
            mapper,
        });

        let mut tables = self.tables.write();
        if let Some(existing_label) = tables.by_name.get(&def.name) {
            if *existing_label != qualified_label {
                return Err(ConfigError::DuplicateIndexName {
                    name: def.name.clone(),
                    existing_label: existing_label.clone(),
                });
            }
        }
        // Last-writer-wins on the same label: drop the replaced entry's name
        // mapping when the reloaded declaration renamed the index.
        if let Some(old) = tables.by_label.insert(qualified_label.clone(), def.clone()) {
            if old.name != def.name {
                tables.by_name.remove(&old.name);
            }
        }
        tables.by_name.insert(def.name.clone(), qualified_label);

        Ok(def)
    }

    /// Remove a definition by qualified label. First-class teardown: the
    /// public-name mapping goes with it.
    pub fn remove(&self, qualified_label: &str) -> Option<Arc<IndexDefinition>> {
        let mut tables = self.tables.write();
        let def = tables.by_label.remove(qualified_label)?;
        if tables.by_name.get(&def.name).map(String::as_str) == Some(qualified_label) {
            tables.by_name.remove(&def.name);
        }
        info!(label = %qualified_label, "Index definition removed");
        Some(def)
    }

    pub fn get(&self, qualified_label: &str) -> Option<Arc<IndexDefinition>> {
        self.tables.read().by_label.get(qualified_label).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<IndexDefinition>> {
        let tables = self.tables.read();
        let label = tables.by_name.get(name)?;
        tables.by_label.get(label).cloned()
    }

    /// Resolve a user-supplied identifier: qualified label first, then
    /// public index name.
    pub fn resolve(&self, name_or_label: &str) -> Option<Arc<IndexDefinition>> {
        self.get(name_or_label)
            .or_else(|| self.get_by_name(name_or_label))
    }

    /// All registered definitions backed by the given schema, identified by
    /// its qualified key (see [`schema_key`]).
    pub fn for_schema(&self, key: &str) -> Vec<Arc<IndexDefinition>> {
        self.tables
            .read()
            .by_label
            .values()
            .filter(|def| schema_key(&*def.source) == key)
            .cloned()
            .collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.tables.read().by_label.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.read().by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().by_label.is_empty()
    }
}
