//! Fetch Pagination Tests
//!
//! Multi-page fetch accounting:
//! - count is the sum of page counts and equals items.len()
//! - the loop stops at the limit or when the cursor runs out
//! - empty pages with a cursor do not end the loop
//! - a failed page fails the whole fetch

use std::collections::BTreeMap;

use schemabase::schema::{FieldDef, Schema};
use schemabase::store::MemoryStore;
use schemabase::query::QueryError;
use schemabase::{BaseConfig, BaseError, FetchOptions, Query, QueryMap, SchemaBase};
use serde::{Deserialize, Serialize};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    n: i64,
    label: String,
}

fn items_schema() -> Schema {
    Schema::new("items", BTreeMap::new())
        .with_field("n", FieldDef::required_int())
        .with_field("label", FieldDef::required_string())
}

async fn seeded(page_size: usize, count: i64) -> SchemaBase<Item, MemoryStore> {
    let base = SchemaBase::new(
        MemoryStore::with_page_size(page_size),
        items_schema(),
        BaseConfig::default(),
    )
    .unwrap();

    // Zero-padded keys so key order follows n.
    for n in 0..count {
        let item = Item {
            n,
            label: if n % 2 == 0 { "even" } else { "odd" }.to_string(),
        };
        base.put(&item, Some(format!("item{:05}", n).as_str()))
            .await
            .unwrap();
    }
    base
}

fn fetch_calls(base: &SchemaBase<Item, MemoryStore>) -> usize {
    base.store().calls().fetch
}

// =============================================================================
// Accounting
// =============================================================================

/// N items over K pages: count == N == items.len() after exactly K calls.
#[tokio::test]
async fn test_auto_paginate_accounting() {
    let base = seeded(1000, 2500).await;

    let response = base
        .fetch(None, FetchOptions::new().auto_paginate())
        .await
        .unwrap();

    assert_eq!(response.count, 2500);
    assert_eq!(response.items.len(), 2500);
    assert_eq!(response.last, None);
    assert_eq!(fetch_calls(&base), 3);
}

/// Page boundaries that divide the collection exactly.
#[tokio::test]
async fn test_exact_page_multiple() {
    let base = seeded(10, 30).await;

    let response = base
        .fetch(None, FetchOptions::new().auto_paginate())
        .await
        .unwrap();

    assert_eq!(response.count, 30);
    assert_eq!(fetch_calls(&base), 3);
    assert_eq!(base.metrics().snapshot().pages_fetched, 3);
}

/// Without auto_paginate exactly one page comes back with its cursor.
#[tokio::test]
async fn test_single_page_surfaces_cursor() {
    let base = seeded(10, 25).await;

    let first = base.fetch(None, FetchOptions::new()).await.unwrap();
    assert_eq!(first.count, 10);
    assert!(first.last.is_some());
    assert_eq!(fetch_calls(&base), 1);

    // manual continuation from the surfaced cursor
    let cursor = first.last.unwrap();
    let second = base
        .fetch(None, FetchOptions::new().last(cursor).auto_paginate())
        .await
        .unwrap();
    assert_eq!(second.count, 15);
    assert_eq!(second.last, None);
}

// =============================================================================
// Limits
// =============================================================================

/// 5000 items with limit 100: exactly 100 items and a cursor.
#[tokio::test]
async fn test_limit_early_stop() {
    let base = seeded(1000, 5000).await;

    let response = base
        .fetch(None, FetchOptions::new().limit(100).auto_paginate())
        .await
        .unwrap();

    assert_eq!(response.count, 100);
    assert_eq!(response.items.len(), 100);
    assert!(response.last.is_some());
    assert_eq!(fetch_calls(&base), 1);
}

/// A limit spanning pages asks each follow-up for the remainder only.
#[tokio::test]
async fn test_limit_across_pages() {
    let base = seeded(10, 100).await;

    let response = base
        .fetch(None, FetchOptions::new().limit(25).auto_paginate())
        .await
        .unwrap();

    assert_eq!(response.count, 25);
    assert_eq!(fetch_calls(&base), 3);

    let continued = base
        .fetch(
            None,
            FetchOptions::new().limit(5).last(response.last.unwrap()),
        )
        .await
        .unwrap();
    assert_eq!(continued.items[0].n, 25);
}

/// Descending order is kept on continuation calls.
#[tokio::test]
async fn test_desc_across_pages() {
    let base = seeded(7, 20).await;

    let response = base
        .fetch(None, FetchOptions::new().desc().auto_paginate())
        .await
        .unwrap();

    let ns: Vec<i64> = response.items.iter().map(|i| i.n).collect();
    let expected: Vec<i64> = (0..20).rev().collect();
    assert_eq!(ns, expected);
}

// =============================================================================
// Queries
// =============================================================================

/// Pages with no matches but a cursor keep the loop going.
#[tokio::test]
async fn test_sparse_matches_span_empty_pages() {
    let base = seeded(10, 60).await;

    let query = Query::from(QueryMap::new().gte("n", 55));
    let response = base
        .fetch(Some(query), FetchOptions::new().auto_paginate())
        .await
        .unwrap();

    assert_eq!(response.count, 5);
    assert_eq!(fetch_calls(&base), 6);
    assert!(response.items.iter().all(|i| i.n >= 55));
}

/// OR'ed alternatives match either side.
#[tokio::test]
async fn test_or_query() {
    let base = seeded(1000, 50).await;

    let query = Query::from(QueryMap::new().lt("n", 3))
        .or(QueryMap::new().gte("n", 48).eq("label", "odd"));
    let response = base
        .fetch(Some(query), FetchOptions::new().auto_paginate())
        .await
        .unwrap();

    let ns: Vec<i64> = response.items.iter().map(|i| i.n).collect();
    assert_eq!(ns.len(), 4);
    assert!(ns.contains(&49));
}

/// Illegal operators are refused before any fetch.
#[tokio::test]
async fn test_invalid_query_rejected() {
    let base = seeded(10, 5).await;

    let query = Query::from(QueryMap::new().prefix("n", "1").gt("label", 3));
    let err = base
        .fetch(Some(query), FetchOptions::new())
        .await
        .unwrap_err();

    match err {
        BaseError::InvalidQuery(violations) => {
            let keys: Vec<_> = violations.iter().map(|v| v.key.as_str()).collect();
            assert_eq!(keys, vec!["n?pfx", "label?gt"]);
        }
        other => panic!("expected InvalidQuery, got {:?}", other),
    }
    assert_eq!(fetch_calls(&base), 0);
}

/// Wire-form queries run like built ones; malformed ones never reach the store.
#[tokio::test]
async fn test_wire_form_query() {
    let base = seeded(1000, 50).await;

    let response = base
        .fetch_json(
            &json!([{"n?lt": 3}, {"n?gte": 48, "label": "odd"}]),
            FetchOptions::new().auto_paginate(),
        )
        .await
        .unwrap();
    assert_eq!(response.count, 4);
    assert_eq!(fetch_calls(&base), 1);

    let err = base
        .fetch_json(&json!({"n?between": [1, 2]}), FetchOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BaseError::Query(QueryError::UnknownOperator { .. })
    ));

    let err = base
        .fetch_json(&json!("n"), FetchOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BaseError::Query(QueryError::NotAnObject(_))));
    assert_eq!(fetch_calls(&base), 1);
}

// =============================================================================
// Failures
// =============================================================================

/// A failing follow-up page fails the fetch instead of truncating it.
#[tokio::test]
async fn test_failed_page_is_not_a_silent_success() {
    let base = seeded(10, 50).await;
    base.store().fail_fetch_on_call(3);

    let err = base
        .fetch(None, FetchOptions::new().auto_paginate())
        .await
        .unwrap_err();

    assert!(err.is_remote());
    assert_eq!(fetch_calls(&base), 3);
    assert_eq!(base.metrics().snapshot().store_errors, 1);
}
