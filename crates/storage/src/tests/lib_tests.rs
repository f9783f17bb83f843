use super::*;

#[tokio::test]
async fn sqlite_store_sets_reads_and_removes_keys() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");

    assert_eq!(storage.get(LOGGED_IN_KEY).await.expect("get"), None);
    storage.set(LOGGED_IN_KEY, "true").await.expect("set");
    assert_eq!(
        storage.get(LOGGED_IN_KEY).await.expect("get"),
        Some("true".to_string())
    );

    storage.remove(LOGGED_IN_KEY).await.expect("remove");
    assert_eq!(storage.get(LOGGED_IN_KEY).await.expect("get"), None);
}

#[tokio::test]
async fn set_overwrites_existing_value_and_stamps_time() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let before = Utc::now() - chrono::Duration::seconds(1);

    storage.set("theme", "dark").await.expect("set");
    storage.set("theme", "light").await.expect("overwrite");

    assert_eq!(
        storage.get("theme").await.expect("get"),
        Some("light".to_string())
    );
    let stamped = storage
        .updated_at("theme")
        .await
        .expect("timestamp")
        .expect("row exists");
    assert!(stamped >= before);
}

#[tokio::test]
async fn removing_missing_key_is_not_an_error() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.remove("absent").await.expect("remove");
    assert!(storage.updated_at("absent").await.expect("timestamp").is_none());
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn flag_survives_reopening_database_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("wallet.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage.set(LOGGED_IN_KEY, "true").await.expect("set");
    storage.pool().close().await;
    drop(storage);

    assert!(db_path.exists(), "database file should exist: {}", db_path.display());

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(
        reopened.get(LOGGED_IN_KEY).await.expect("get"),
        Some("true".to_string())
    );
}

#[tokio::test]
async fn memory_store_behaves_like_sqlite_store() {
    let store = MemoryStore::with_entry(LOGGED_IN_KEY, "true");
    assert_eq!(
        store.get(LOGGED_IN_KEY).await.expect("get"),
        Some("true".to_string())
    );
    store.remove(LOGGED_IN_KEY).await.expect("remove");
    assert_eq!(store.get(LOGGED_IN_KEY).await.expect("get"), None);
    store.set("k", "v").await.expect("set");
    assert_eq!(store.get("k").await.expect("get"), Some("v".to_string()));
}

#[test]
fn sqlite_path_ignores_memory_and_non_sqlite_urls() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(sqlite_path("postgres://localhost/db"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/wallet.db?mode=rwc"),
        Some(PathBuf::from("./data/wallet.db"))
    );
}
