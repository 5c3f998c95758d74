// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! End-to-end tests through the engine facade against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use searchsync::{
    EngineError, FieldType, IndexDeclaration, MemoryBackend, MemorySource, Record, RemoteError,
    SearchOptions, SearchOutcome, SearchSync, SearchSyncConfig,
};

/// Post ids whose body mentions "itaque". Exactly seven of fifty.
const ITAQUE_IDS: [i64; 7] = [3, 9, 17, 21, 30, 38, 44];

fn posts_source() -> Arc<MemorySource> {
    let source = Arc::new(MemorySource::new(
        "blog",
        "Post",
        vec![
            ("id".to_string(), FieldType::Int),
            ("title".to_string(), FieldType::Text),
            ("body".to_string(), FieldType::Text),
            ("created_at".to_string(), FieldType::DateTime),
        ],
        "id",
    ));
    let words = ["lorem", "dolor", "tempora", "quaerat", "nemo"];
    for i in 0..50i64 {
        let filler = words[(i % words.len() as i64) as usize];
        let body = if ITAQUE_IDS.contains(&i) {
            format!("{filler} itaque voluptatem {filler}")
        } else {
            format!("{filler} voluptatem {filler}")
        };
        source.insert(
            Record::new()
                .with("id", i)
                .with("title", format!("post number {i}"))
                .with("body", body)
                .with("created_at", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(i)),
        );
    }
    source
}

fn engine_with(source: Arc<MemorySource>) -> (SearchSync, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let config = SearchSyncConfig {
        poll_initial_interval_ms: 1,
        poll_max_interval_ms: 5,
        default_batch_size: 16,
        ..Default::default()
    };
    let engine = SearchSync::new(backend.clone(), config);
    engine
        .register(
            IndexDeclaration::new("posts", "PostIndex", source)
                .searchable(["title", "body"])
                .filterable(["id"])
                .sortable(["created_at", "id"]),
        )
        .unwrap();
    (engine, backend)
}

async fn wait_for_count(engine: &SearchSync, expected: u64) {
    for _ in 0..200 {
        if engine.document_count("posts").await.unwrap() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "index never reached {expected} documents (at {})",
        engine.document_count("posts").await.unwrap()
    );
}

#[tokio::test]
async fn test_full_population_indexes_every_record() {
    let (engine, _backend) = engine_with(posts_source());
    engine.create("posts").await.unwrap();

    let tasks = engine.populate("posts").await.unwrap();
    // 50 records in batches of 16.
    assert_eq!(tasks.len(), 4);
    assert_eq!(engine.document_count("posts").await.unwrap(), 50);
}

#[tokio::test]
async fn test_search_matches_and_respects_limit() {
    let (engine, _backend) = engine_with(posts_source());
    engine.create("posts").await.unwrap();
    engine.populate("posts").await.unwrap();

    // Default limit is 20, well above the seven matches.
    let (results, outcome) = engine
        .search("posts", "itaque", SearchOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::Ok);
    assert_eq!(results.hits.len(), 7);
    assert_eq!(results.estimated_total_hits, Some(7));

    let (results, outcome) = engine
        .search("posts", "itaque", SearchOptions::new().limit(5))
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::Ok);
    assert_eq!(results.hits.len(), 5);
    assert!(results.estimated_total_hits.unwrap() >= 5);

    let (results, outcome) = engine
        .search("posts", "no such phrase anywhere", SearchOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::NotFound);
    assert!(results.hits.is_empty());
}

#[tokio::test]
async fn test_search_exhaustive_paging_totals() {
    let (engine, _backend) = engine_with(posts_source());
    engine.create("posts").await.unwrap();
    engine.populate("posts").await.unwrap();

    let (results, _) = engine
        .search(
            "posts",
            "itaque",
            SearchOptions::new().hits_per_page(3).page(1),
        )
        .await
        .unwrap();
    assert_eq!(results.hits.len(), 3);
    assert_eq!(results.total_hits, Some(7));
    assert_eq!(results.total_pages, Some(3));

    let (results, _) = engine
        .search(
            "posts",
            "itaque",
            SearchOptions::new().hits_per_page(3).page(3),
        )
        .await
        .unwrap();
    assert_eq!(results.hits.len(), 1);
}

#[tokio::test]
async fn test_search_scoped_to_explicit_attributes() {
    let (engine, _backend) = engine_with(posts_source());
    engine.create("posts").await.unwrap();
    engine.populate("posts").await.unwrap();

    // "itaque" appears only in bodies; scoping the search to titles finds
    // nothing.
    let (results, outcome) = engine
        .search(
            "posts",
            "itaque",
            SearchOptions::new().attributes_to_search_on(["title"]),
        )
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::NotFound);
    assert!(results.hits.is_empty());

    // A trimmed retrieve list still carries the primary key.
    let (results, _) = engine
        .search(
            "posts",
            "itaque",
            SearchOptions::new().attributes_to_retrieve(["title"]).limit(1),
        )
        .await
        .unwrap();
    let hit = &results.hits[0];
    assert!(hit.contains_key("title"));
    assert!(hit.contains_key("id"));
    assert!(!hit.contains_key("body"));
}

#[tokio::test]
async fn test_live_changes_propagate_to_the_index() {
    let source = posts_source();
    let (engine, _backend) = engine_with(source.clone());
    engine.create("posts").await.unwrap();
    engine.populate("posts").await.unwrap();
    wait_for_count(&engine, 50).await;

    source.insert(
        Record::new()
            .with("id", 50i64)
            .with("title", "fresh post")
            .with("body", "just published")
            .with("created_at", Utc::now()),
    );
    wait_for_count(&engine, 51).await;

    source.delete("50");
    wait_for_count(&engine, 50).await;
}

#[tokio::test]
async fn test_remove_stops_live_propagation() {
    let source = posts_source();
    let (engine, backend) = engine_with(source.clone());
    engine.create("posts").await.unwrap();

    source.insert(
        Record::new()
            .with("id", 50i64)
            .with("title", "while watched")
            .with("body", "arrives")
            .with("created_at", Utc::now()),
    );
    wait_for_count(&engine, 1).await;

    let def = engine.remove("posts").unwrap();
    source.insert(
        Record::new()
            .with("id", 51i64)
            .with("title", "after removal")
            .with("body", "never arrives")
            .with("created_at", Utc::now()),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The registration is gone, so count via the raw definition's ops path.
    let ops = searchsync::IndexOps::new(backend.clone(), searchsync::PollConfig::fast());
    assert_eq!(ops.document_count(&def).await.unwrap(), 1);
}

#[tokio::test]
async fn test_rebuild_reflects_source_changes() {
    let source = posts_source();
    let (engine, _backend) = engine_with(source.clone());
    engine.create("posts").await.unwrap();
    engine.populate("posts").await.unwrap();

    // Grow the source past the populated snapshot, then rebuild. The change
    // listener also mirrors the insert, so wait for it to settle first.
    source.insert(
        Record::new()
            .with("id", 99i64)
            .with("title", "late arrival")
            .with("body", "itaque itaque")
            .with("created_at", Utc::now()),
    );
    wait_for_count(&engine, 51).await;

    engine.rebuild("posts").await.unwrap();
    assert_eq!(engine.document_count("posts").await.unwrap(), 51);

    let (results, _) = engine
        .search("posts", "itaque", SearchOptions::new())
        .await
        .unwrap();
    assert_eq!(results.hits.len(), 8);
}

#[tokio::test]
async fn test_destroy_then_search_reports_not_found() {
    let (engine, _backend) = engine_with(posts_source());
    engine.create("posts").await.unwrap();
    engine.populate("posts").await.unwrap();

    engine.destroy("posts").await.unwrap();

    let err = engine.document_count("posts").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Remote(RemoteError::IndexNotFound { .. })
    ));

    let (results, outcome) = engine
        .search("posts", "itaque", SearchOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::Remote(404));
    assert!(results.hits.is_empty());
    assert!(results.error.is_some());
}

#[tokio::test]
async fn test_clean_reports_count_and_empties_index() {
    let (engine, _backend) = engine_with(posts_source());
    engine.create("posts").await.unwrap();
    engine.populate("posts").await.unwrap();

    let report = engine.clean("posts").await.unwrap();
    assert_eq!(report.documents_cleaned, 50);
    assert_eq!(engine.document_count("posts").await.unwrap(), 0);
}

#[tokio::test]
async fn test_sorted_search_orders_hits() {
    let (engine, _backend) = engine_with(posts_source());
    engine.create("posts").await.unwrap();
    engine.populate("posts").await.unwrap();

    let (results, _) = engine
        .search(
            "posts",
            "itaque",
            SearchOptions::new().sort(["id:desc"]),
        )
        .await
        .unwrap();
    let ids: Vec<i64> = results
        .hits
        .iter()
        .map(|hit| hit.get("id").and_then(|v| v.as_i64()).unwrap())
        .collect();
    let mut expected = ITAQUE_IDS.to_vec();
    expected.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(ids, expected);
}
