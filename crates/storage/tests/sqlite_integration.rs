use storage::LocalStore;
use storage::sqlite::SqliteLocalStore;

#[tokio::test]
async fn sqlite_roundtrip_set_get_remove() {
    let store = SqliteLocalStore::open("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("open");

    assert_eq!(store.get("aq_progress_cache").await.unwrap(), None);

    store.set("aq_progress_cache", r#"{"quiz":{}}"#).await.unwrap();
    assert_eq!(
        store.get("aq_progress_cache").await.unwrap().as_deref(),
        Some(r#"{"quiz":{}}"#)
    );

    store.set("aq_progress_cache", "{}").await.unwrap();
    assert_eq!(store.get("aq_progress_cache").await.unwrap().as_deref(), Some("{}"));

    store.remove("aq_progress_cache").await.unwrap();
    assert_eq!(store.get("aq_progress_cache").await.unwrap(), None);

    // Removing a missing key is not an error.
    store.remove("aq_progress_cache").await.unwrap();
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let store = SqliteLocalStore::open("sqlite:file:memdb_kv_migrate?mode=memory&cache=shared")
        .await
        .expect("open");
    store.set("k", "v").await.unwrap();

    store.migrate().await.expect("second migrate");
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(applied, 1);
}
