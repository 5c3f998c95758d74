// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic searchsync usage example.
//!
//! Demonstrates:
//! 1. Declaring an index over an in-memory data source
//! 2. Creating and bulk-populating the remote index
//! 3. Searching with schema-derived defaults
//! 4. Live change propagation (insert and delete)
//! 5. Cleaning up
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use searchsync::{
    FieldType, IndexDeclaration, MemoryBackend, MemorySource, Record, SearchOptions, SearchSync,
    SearchSyncConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Simple logging (no filter for simplicity)
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    // ─────────────────────────────────────────────────────────────────────
    // 1. Declare an index over an in-memory source
    // ─────────────────────────────────────────────────────────────────────
    println!("📦 Declaring the posts index...");

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
    for (i, title) in ["first post", "second post", "about searchsync"]
        .iter()
        .enumerate()
    {
        source.insert(
            Record::new()
                .with("id", i as i64)
                .with("title", *title)
                .with("body", format!("body of {title}"))
                .with("created_at", Utc::now()),
        );
    }

    let engine = SearchSync::new(Arc::new(MemoryBackend::new()), SearchSyncConfig::default());
    engine.register(
        IndexDeclaration::new("posts", "PostIndex", source.clone())
            .searchable(["title", "body"])
            .sortable(["created_at"]),
    )?;

    // ─────────────────────────────────────────────────────────────────────
    // 2. Create and populate
    // ─────────────────────────────────────────────────────────────────────
    println!("🔨 Creating and populating...");
    engine.create("posts").await?;
    engine.populate("posts").await?;
    println!("   {} documents indexed", engine.document_count("posts").await?);

    // ─────────────────────────────────────────────────────────────────────
    // 3. Search
    // ─────────────────────────────────────────────────────────────────────
    let (results, outcome) = engine
        .search("posts", "searchsync", SearchOptions::new().limit(10))
        .await?;
    println!("🔎 Search for \"searchsync\": {outcome:?}, {} hit(s)", results.hits.len());
    for hit in &results.hits {
        println!("   - {}", hit.get("title").and_then(|v| v.as_str()).unwrap_or("?"));
    }

    // ─────────────────────────────────────────────────────────────────────
    // 4. Live change propagation
    // ─────────────────────────────────────────────────────────────────────
    println!("⚡ Inserting a record while the engine watches...");
    source.insert(
        Record::new()
            .with("id", 3i64)
            .with("title", "hot off the press")
            .with("body", "arrived via change sync")
            .with("created_at", Utc::now()),
    );
    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("   {} documents indexed", engine.document_count("posts").await?);

    // ─────────────────────────────────────────────────────────────────────
    // 5. Clean up
    // ─────────────────────────────────────────────────────────────────────
    let report = engine.clean("posts").await?;
    println!("🧹 Cleaned {} documents", report.documents_cleaned);
    engine.destroy("posts").await?;
    engine.shutdown();
    println!("✅ Done");

    Ok(())
}
