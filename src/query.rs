// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query normalization.
//!
//! Callers build [`SearchOptions`] with snake_case names; this module fills
//! definition-derived defaults, rewrites keys to the remote service's
//! camelCase convention, and folds remote failures into a uniform
//! [`SearchResults`] + [`SearchOutcome`] pair so callers never match on
//! transport errors.

use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::metrics;
use crate::registry::IndexDefinition;
use crate::remote::{RemoteError, SearchClient, SearchResults};

/// Outcome classification of a search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// At least one hit.
    Ok,
    /// The query ran but matched nothing.
    NotFound,
    /// The remote call failed; carries an HTTP-like status code.
    Remote(u16),
}

/// Snake_case-keyed search options, normalized to the remote convention at
/// call time.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    params: Map<String, Value>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(self, offset: u64) -> Self {
        self.raw("offset", offset)
    }

    pub fn limit(self, limit: u64) -> Self {
        self.raw("limit", limit)
    }

    /// Switch the remote into exhaustive paging.
    pub fn hits_per_page(self, hits: u64) -> Self {
        self.raw("hits_per_page", hits)
    }

    pub fn page(self, page: u64) -> Self {
        self.raw("page", page)
    }

    pub fn filter(self, expr: impl Into<String>) -> Self {
        self.raw("filter", expr.into())
    }

    pub fn facets<I, S>(self, facets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<Value> = facets.into_iter().map(|f| Value::String(f.into())).collect();
        self.raw("facets", list)
    }

    pub fn sort<I, S>(self, exprs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<Value> = exprs.into_iter().map(|e| Value::String(e.into())).collect();
        self.raw("sort", list)
    }

    pub fn attributes_to_retrieve<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<Value> = fields.into_iter().map(|f| Value::String(f.into())).collect();
        self.raw("attributes_to_retrieve", list)
    }

    pub fn attributes_to_search_on<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<Value> = fields.into_iter().map(|f| Value::String(f.into())).collect();
        self.raw("attributes_to_search_on", list)
    }

    pub fn matching_strategy(self, strategy: impl Into<String>) -> Self {
        self.raw("matching_strategy", strategy.into())
    }

    /// Insert an arbitrary snake_case option.
    pub fn raw(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Apply definition-derived defaults, then camelize every key.
    ///
    /// Callers may spell an option snake_case or already-camelized; both
    /// collapse to one key after camelization, so defaulting and injection
    /// have to honor either spelling.
    fn normalize(mut self, def: &IndexDefinition) -> Map<String, Value> {
        let has_search_attrs = self.params.contains_key("attributes_to_search_on")
            || self.params.contains_key("attributesToSearchOn");
        if !has_search_attrs {
            let fields: Vec<Value> = def
                .searchable_fields
                .iter()
                .map(|f| Value::String(f.clone()))
                .collect();
            self.params
                .insert("attributes_to_search_on".to_string(), Value::Array(fields));
        }
        // A trimmed retrieve list must still carry the primary key, or hits
        // cannot be correlated back to source records.
        for key in ["attributes_to_retrieve", "attributesToRetrieve"] {
            if let Some(Value::Array(fields)) = self.params.get_mut(key) {
                let pk = &def.primary_key_field;
                let has_pk = fields
                    .iter()
                    .any(|f| f.as_str() == Some(pk) || f.as_str() == Some("*"));
                if !has_pk {
                    fields.push(Value::String(pk.clone()));
                }
            }
        }
        camelize_keys(&self.params)
    }
}

/// Convert one snake_case identifier to camelCase. Keys without underscores
/// pass through untouched, which makes the transform idempotent.
pub fn to_camel_case(name: &str) -> String {
    let mut segments = name.split('_').filter(|s| !s.is_empty());
    let mut out = match segments.next() {
        Some(first) => first.to_string(),
        None => return name.to_string(),
    };
    for segment in segments {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Camelize the top-level keys of an options map. Values are not descended
/// into: filter expressions and sort clauses name document fields, which keep
/// their declared spelling.
pub fn camelize_keys(params: &Map<String, Value>) -> Map<String, Value> {
    params
        .iter()
        .map(|(k, v)| (to_camel_case(k), v.clone()))
        .collect()
}

/// Run a search against a registered definition.
///
/// Infallible by construction: a remote failure comes back as an empty
/// result set with the error detail attached, classified by the outcome.
pub async fn search(
    client: &dyn SearchClient,
    def: &IndexDefinition,
    term: &str,
    options: SearchOptions,
) -> (SearchResults, SearchOutcome) {
    let params = options.normalize(def);
    let started = Instant::now();
    let (results, outcome) = match client.search(&def.name, term, &params).await {
        Ok(results) => {
            let outcome = if results.hits.is_empty() {
                SearchOutcome::NotFound
            } else {
                SearchOutcome::Ok
            };
            debug!(index = %def.name, hits = results.hits.len(), "Search completed");
            (results, outcome)
        }
        Err(e) => {
            let status = e.status_code().unwrap_or(500);
            warn!(index = %def.name, status, error = %e, "Search failed");
            let results = SearchResults {
                query: term.to_string(),
                error: Some(error_detail(&e)),
                ..SearchResults::default()
            };
            (results, SearchOutcome::Remote(status))
        }
    };
    metrics::record_search(match outcome {
        SearchOutcome::Ok => "success",
        SearchOutcome::NotFound => "not_found",
        SearchOutcome::Remote(_) => "error",
    });
    metrics::record_search_latency(started.elapsed());
    (results, outcome)
}

fn error_detail(error: &RemoteError) -> String {
    match error {
        RemoteError::Api { code, message, .. } => format!("{code}: {message}"),
        other => other.to_string(),
    }
}
