//! Property-based tests for the pure layers: field resolution, query
//! normalization, and document serialization.
//!
//! Uses proptest to generate random field lists and records and verify the
//! invariants hold for all of them (order preservation, idempotence, schema
//! completeness), never panicking on odd input.
//!
//! Run with: `cargo test --test proptest_fuzz`

use proptest::prelude::*;

use searchsync::query::to_camel_case;
use searchsync::schema::{resolve_fields, FieldKind, FieldSpec};
use searchsync::source::{FieldType, FieldValue, Record};
use searchsync::{DocumentMapper, TimestampMode};

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Snake_case-ish identifiers, including leading/trailing underscores.
fn identifier_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{0,20}"
}

/// A schema as parallel field-name/field-type lists with unique names.
fn schema_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,8}", 1..8)
        .prop_map(|set| set.into_iter().collect())
}

fn field_kind_strategy() -> impl Strategy<Value = FieldKind> {
    prop_oneof![
        Just(FieldKind::Searchable),
        Just(FieldKind::Filterable),
        Just(FieldKind::Sortable),
    ]
}

// =============================================================================
// Query normalization
// =============================================================================

proptest! {
    /// Camelization never emits an underscore and never panics.
    #[test]
    fn camel_case_strips_underscores(name in identifier_strategy()) {
        let out = to_camel_case(&name);
        // A bare-underscore input has no segments and passes through.
        if name.chars().any(|c| c != '_') {
            prop_assert!(!out.contains('_'));
        }
    }

    /// Camelizing twice is the same as camelizing once.
    #[test]
    fn camel_case_is_idempotent(name in identifier_strategy()) {
        let once = to_camel_case(&name);
        prop_assert_eq!(to_camel_case(&once), once);
    }

    /// Keys without underscores are untouched.
    #[test]
    fn camel_case_passes_plain_keys_through(name in "[a-zA-Z]{1,20}") {
        prop_assert_eq!(to_camel_case(&name), name);
    }
}

// =============================================================================
// Field resolution
// =============================================================================

proptest! {
    /// The all-fields sentinel resolves to the schema verbatim.
    #[test]
    fn all_spec_resolves_to_schema_order(
        available in schema_strategy(),
        kind in field_kind_strategy(),
    ) {
        let resolved = resolve_fields(kind, &FieldSpec::All, &available).unwrap();
        prop_assert_eq!(resolved, available);
    }

    /// Any subset of the schema resolves successfully, in declared order.
    #[test]
    fn subset_spec_preserves_declared_order(
        available in schema_strategy(),
        kind in field_kind_strategy(),
        pick in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let declared: Vec<String> = pick
            .into_iter()
            .map(|idx| available[idx.index(available.len())].clone())
            .collect();
        let spec = FieldSpec::Fields(declared.clone());
        let resolved = resolve_fields(kind, &spec, &available).unwrap();
        prop_assert_eq!(resolved, declared);
    }

    /// A name outside the schema fails cleanly and names the field.
    #[test]
    fn unknown_field_is_a_clean_error(
        available in schema_strategy(),
        kind in field_kind_strategy(),
        unknown in "[A-Z]{1,8}",
    ) {
        // Uppercase names cannot collide with the lowercase schema.
        let spec = FieldSpec::fields([unknown.clone()]);
        let err = resolve_fields(kind, &spec, &available).unwrap_err();
        prop_assert!(err.to_string().contains(&unknown));
    }
}

// =============================================================================
// Document serialization
// =============================================================================

proptest! {
    /// Serialized documents always carry exactly the schema's keys, in
    /// schema order, regardless of which fields the record actually has.
    #[test]
    fn documents_follow_schema_shape(
        schema in schema_strategy(),
        present in prop::collection::vec(any::<bool>(), 8),
        values in prop::collection::vec(any::<i64>(), 8),
    ) {
        let types = vec![FieldType::Int; schema.len()];
        let mapper = DocumentMapper::new(&schema, &types, TimestampMode::EpochSeconds);

        let mut record = Record::new();
        for (i, field) in schema.iter().enumerate() {
            if present[i % present.len()] {
                record.set(field, FieldValue::Int(values[i % values.len()]));
            }
        }

        let document = mapper.serialize(&record);
        let keys: Vec<&String> = document.keys().collect();
        prop_assert_eq!(keys, schema.iter().collect::<Vec<_>>());
        for (i, field) in schema.iter().enumerate() {
            let value = document.get(field).unwrap();
            if present[i % present.len()] {
                prop_assert_eq!(value.as_i64(), Some(values[i % values.len()]));
            } else {
                prop_assert!(value.is_null());
            }
        }
    }

    /// Integer and string keys are always usable as document ids.
    #[test]
    fn int_and_str_values_are_always_keys(n in any::<i64>(), s in "[a-z0-9]{1,16}") {
        prop_assert_eq!(FieldValue::Int(n).as_key(), Some(n.to_string()));
        prop_assert_eq!(FieldValue::Str(s.clone()).as_key(), Some(s));
    }
}
