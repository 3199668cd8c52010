//! Concurrency tests for submissions sharing one rating file
//!
//! Submissions from different sessions inside one process are serialized by
//! the store, so no writer's update is lost.

mod fixtures;

use faction_poll::stats::StatsEngine;
use faction_poll::store::RatingStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use fixtures::{file_store, raw, running_state, test_catalog, ts, TEST_FACTIONS};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_users_are_all_persisted() {
    let dir = TempDir::new().unwrap();
    let store: Arc<RatingStore> = Arc::new(file_store(&dir.path().join("scores.json")));
    let user_count = 40;

    let start = Instant::now();
    let handles: Vec<_> = (0..user_count)
        .map(|i| {
            let store = store.clone();
            tokio::task::spawn_blocking(move || {
                let faction = TEST_FACTIONS[i % TEST_FACTIONS.len()];
                store.submit(
                    &format!("user{:02}", i),
                    &raw(&[(faction, (i % 5 + 1) as i64)]),
                    ts(i as i64),
                )
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let elapsed = start.elapsed();

    for result in results {
        assert!(result.unwrap().is_ok());
    }

    let document = store.load().unwrap();
    let totals = StatsEngine::new(test_catalog()).participation_totals(&document);
    assert_eq!(totals.user_count, user_count);
    assert_eq!(totals.total_ratings, user_count);

    println!("✅ {} concurrent submissions in {:?}", user_count, elapsed);
    assert!(elapsed < Duration::from_secs(30));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resubmissions_keep_history_bound() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(file_store(&dir.path().join("scores.json")));

    let handles: Vec<_> = (0..25)
        .map(|i| {
            let store = store.clone();
            tokio::task::spawn_blocking(move || {
                store.submit("same-user", &raw(&[("归元", (i % 5 + 1) as i64)]), ts(i))
            })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        assert!(result.unwrap().is_ok());
    }

    let document = store.load().unwrap();
    assert_eq!(document.user_count(), 1);
    assert_eq!(document.user_history("same-user").unwrap().len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_during_writes() {
    let state = running_state(Arc::new(
        faction_poll::store::InMemoryDocumentStorage::new(),
    ))
    .await;

    let writers: Vec<_> = (0..20)
        .map(|i| {
            let state = state.clone();
            tokio::task::spawn_blocking(move || {
                state
                    .submit(&format!("w{}", i), &raw(&[("节制", 3)]))
                    .map(|receipt| receipt.rated_count)
            })
        })
        .collect();

    let readers: Vec<_> = (0..20)
        .map(|_| {
            let state = state.clone();
            tokio::task::spawn_blocking(move || {
                let document = state.load_document()?;
                Ok::<_, anyhow::Error>(state.engine().per_faction_stats(&document).len())
            })
        })
        .collect();

    for result in futures::future::join_all(writers).await {
        assert_eq!(result.unwrap().unwrap(), 1);
    }
    for result in futures::future::join_all(readers).await {
        assert_eq!(result.unwrap().unwrap(), TEST_FACTIONS.len());
    }

    let document = state.load_document().unwrap();
    assert_eq!(document.user_count(), 20);
}
