use crate::{write_json_atomic, write_output, CheckpointStore};
use harvest_core::{CollectedItem, Comment};
use std::env;
use std::path::PathBuf;

fn setup_test_dir() -> PathBuf {
    let dir = env::temp_dir().join(format!("test_harvest_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("Failed to create test directory");
    dir
}

fn sample_items(count: usize) -> Vec<CollectedItem> {
    (0..count)
        .map(|i| CollectedItem {
            title: format!("Post {}", i),
            body: "ünïcode body".to_string(),
            comments: vec![Comment::new("top").with_replies(vec![Comment::new("reply")])],
            upvotes: i as u64,
            num_comments: 1,
            created_utc: 1_700_000_000.0 + i as f64,
            permalink: format!("/r/test/comments/{}/", i),
            id: Some(format!("id{}", i)),
        })
        .collect()
}

#[tokio::test]
async fn test_save_and_load_roundtrip() {
    let dir = setup_test_dir();
    let store = CheckpointStore::new(&dir);
    let items = sample_items(12);

    store.save("rust", &items).await.expect("Failed to save checkpoint");
    let loaded = store.load("rust").await;

    assert_eq!(loaded, items);
    assert!(dir.join("checkpoint_rust_posts_text.json").exists());
    assert!(!dir.join("checkpoint_rust_posts_text.json.tmp").exists());
}

#[tokio::test]
async fn test_save_overwrites_previous_checkpoint() {
    let dir = setup_test_dir();
    let store = CheckpointStore::new(&dir);

    store.save("rust", &sample_items(20)).await.unwrap();
    store.save("rust", &sample_items(3)).await.unwrap();

    assert_eq!(store.load("rust").await.len(), 3);
}

#[tokio::test]
async fn test_missing_checkpoint_is_empty() {
    let store = CheckpointStore::new(setup_test_dir());
    assert!(store.load("nothing_here").await.is_empty());
}

#[tokio::test]
async fn test_corrupt_checkpoint_starts_fresh() {
    let dir = setup_test_dir();
    let store = CheckpointStore::new(&dir);
    std::fs::write(store.checkpoint_path("rust"), "[{\"title\": \"trunc").unwrap();

    assert!(store.load("rust").await.is_empty());
}

#[tokio::test]
async fn test_clear_removes_checkpoint_and_tolerates_absence() {
    let dir = setup_test_dir();
    let store = CheckpointStore::new(&dir);

    store.save("rust", &sample_items(1)).await.unwrap();
    store.clear("rust").await.expect("Failed to clear checkpoint");
    assert!(!store.checkpoint_path("rust").exists());

    store.clear("rust").await.expect("Clearing twice should succeed");
}

#[tokio::test]
async fn test_write_output_creates_parent_directories() {
    let dir = setup_test_dir();
    let path = dir.join("nested").join("rust_posts_text.json");
    let items = sample_items(2);

    write_output(&path, &items).await.expect("Failed to write output");

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: Vec<CollectedItem> = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, items);
    assert!(raw.contains("ünïcode body"));
}

#[tokio::test]
async fn test_failed_rename_leaves_target_and_no_temp_file() {
    let dir = setup_test_dir();
    // A non-empty directory at the target path makes the rename fail.
    let target = dir.join("blocked.json");
    std::fs::create_dir_all(target.join("inner")).unwrap();

    let result = write_json_atomic(&target, &sample_items(2)).await;

    assert!(result.is_err());
    assert!(target.is_dir());
    assert!(!dir.join("blocked.json.tmp").exists());
}
