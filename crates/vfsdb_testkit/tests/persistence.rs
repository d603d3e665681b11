//! End-to-end persistence tests: restore on start, backup on save.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use vfsdb_cache::{BlobCache, CacheConfig, CacheResult, ExternalCache, MockCache, SyncStatus};
use vfsdb_core::table::{TableContext, TableEngine};
use vfsdb_core::{
    resolve, resolved_filename, CoreError, DbContext, FactoryConfig, PersistentContextFactory,
    SaveHooks, DEFAULT_FILENAME,
};
use vfsdb_storage::{CopySwap, InMemoryFs, StorageResult, Swap, VirtualFs};
use vfsdb_testkit::{
    durable_image, init_tracing, test_schema, FailingEngine, Schema, TableFactory, TestHarness,
};

fn mock_factory<S: Schema>(
    local: &Arc<InMemoryFs>,
    cache: &Arc<MockCache>,
    connection_string: &str,
    config: FactoryConfig,
) -> TableFactory<S> {
    PersistentContextFactory::with_config(
        TableEngine::new(local.clone(), connection_string),
        cache.clone(),
        Arc::new(CopySwap::new(local.clone())),
        config,
    )
}

fn mock_pair() -> (Arc<InMemoryFs>, Arc<MockCache>) {
    let local = Arc::new(InMemoryFs::new());
    let cache = Arc::new(MockCache::with_local(local.clone()));
    (local, cache)
}

struct PanickingHooks;

#[async_trait]
impl SaveHooks for PanickingHooks {
    fn saving_changes(&self, _ctx: &dyn DbContext) {
        panic!("before-save hook panicked");
    }

    async fn saved_changes(&self, _ctx: &dyn DbContext, _entities_saved: usize) {
        panic!("after-save hook panicked");
    }
}

struct PanickingCache;

#[async_trait]
impl ExternalCache for PanickingCache {
    async fn sync_into_local(&self, _name: &str) -> CacheResult<SyncStatus> {
        Ok(SyncStatus::MISSING)
    }

    async fn push_from_local(&self, _name: &str) -> CacheResult<SyncStatus> {
        panic!("cache push panicked");
    }
}

struct PanickingSwap;

impl Swap for PanickingSwap {
    fn swap(&self, _source: &str, _target: &str) -> StorageResult<()> {
        panic!("swap panicked");
    }
}

// ============================================================================
// Restore
// ============================================================================

#[tokio::test]
async fn concurrent_first_use_restores_once() {
    init_tracing();
    test_schema!(SingleFlight);
    let harness = TestHarness::new();
    {
        let factory = harness.factory::<SingleFlight>("Data Source=flight.db");
        let ctx = factory.create_context_async().await.unwrap();
        ctx.insert("items", "1", json!({ "v": 1 })).unwrap();
        ctx.save_changes_async().await.unwrap();
    }

    let durable = harness.durable().read("flight.db").unwrap();
    let (local, cache) = mock_pair();
    cache.set_restore_blob(durable);
    cache.set_delay(Duration::from_millis(50));
    let factory = mock_factory::<SingleFlight>(
        &local,
        &cache,
        "Data Source=flight.db",
        FactoryConfig::default(),
    );

    let contexts = join_all((0..8).map(|_| factory.create_context_async())).await;
    let statuses = join_all((0..8).map(|_| factory.wait_ready())).await;

    assert_eq!(cache.sync_calls(), vec!["flight.db_bak".to_string()]);
    assert!(statuses.iter().all(|s| *s == SyncStatus::SUCCESS));
    for ctx in contexts {
        let ctx = ctx.unwrap();
        assert_eq!(ctx.find("items", "1").unwrap(), Some(json!({ "v": 1 })));
    }
    assert!(factory.is_ready());
}

#[tokio::test]
async fn cached_backup_is_installed_before_first_context() {
    test_schema!(RoundTrip);
    let (local, cache) = mock_pair();
    cache.set_restore_blob(b"opaque database bytes".to_vec());
    let factory =
        mock_factory::<RoundTrip>(&local, &cache, "Data Source=round.db", FactoryConfig::default());

    assert_eq!(factory.wait_ready().await, SyncStatus::SUCCESS);
    assert_eq!(local.read("round.db").unwrap(), b"opaque database bytes");
}

#[tokio::test]
async fn missing_backup_starts_empty() {
    test_schema!(FreshStart);
    let harness = TestHarness::new();
    let factory = harness.factory::<FreshStart>("Data Source=fresh.db");

    let ctx = factory.create_context_async().await.unwrap();
    assert_eq!(factory.last_status(), SyncStatus::MISSING);
    assert!(ctx.rows("items").unwrap().is_empty());
}

#[tokio::test]
async fn failed_restore_is_recorded_not_raised() {
    test_schema!(BrokenRestore);
    let (local, cache) = mock_pair();
    cache.set_fail_sync(true);
    let factory = mock_factory::<BrokenRestore>(
        &local,
        &cache,
        "Data Source=broken.db",
        FactoryConfig::default(),
    );

    let ctx = factory.create_context_async().await.unwrap();
    assert_eq!(factory.last_status(), SyncStatus::FAILED);
    ctx.insert("items", "1", json!(1)).unwrap();
    assert_eq!(ctx.save_changes_async().await.unwrap(), 1);
}

#[tokio::test]
async fn stalled_cache_times_out() {
    test_schema!(Stalled);
    let (local, cache) = mock_pair();
    let factory = mock_factory::<Stalled>(
        &local,
        &cache,
        "Data Source=stalled.db",
        FactoryConfig::new().cache_timeout(Duration::from_millis(20)),
    );
    assert_eq!(factory.wait_ready().await, SyncStatus::MISSING);

    cache.set_delay(Duration::from_secs(5));
    let ctx = factory.create_context_async().await.unwrap();
    ctx.insert("items", "1", json!(1)).unwrap();
    assert_eq!(ctx.save_changes_async().await.unwrap(), 1);
    assert_eq!(factory.last_status(), SyncStatus::TIMED_OUT);
}

// ============================================================================
// Factory
// ============================================================================

#[test]
fn sequential_creates_never_fail() {
    test_schema!(Sequential);
    let harness = TestHarness::new();
    let factory = harness.factory::<Sequential>("Data Source=seq.db");

    let first = factory.create_context().unwrap();
    let second = factory.create_context().unwrap();
    assert!(factory.is_initialized());
    assert!(first.ensure_created().is_ok());
    assert!(second.ensure_created().is_ok());
}

#[test]
fn filename_is_parsed_from_connection_string() {
    test_schema!(Parsed);
    test_schema!(Unparsed);
    let harness = TestHarness::new();

    let parsed = harness.factory::<Parsed>("Data Source=mydb.sqlite;Cache=Shared");
    assert_eq!(parsed.filename(), "mydb.sqlite");

    let unparsed = harness.factory::<Unparsed>("Foo=bar");
    assert_eq!(unparsed.filename(), DEFAULT_FILENAME);
    assert_eq!(unparsed.backup_name(), "filenotfound.db_bak");
}

#[test]
fn filename_is_resolved_once_per_type() {
    test_schema!(Memoized);
    let harness = TestHarness::new();
    let engine = harness.engine::<Memoized>("Data Source=memo.db");

    assert_eq!(resolve(&engine, DEFAULT_FILENAME), "memo.db");
    assert_eq!(resolve(&engine, DEFAULT_FILENAME), "memo.db");
    assert_eq!(engine.contexts_created(), 1);

    // a later factory for the same type keeps the first name
    let factory = harness.factory::<Memoized>("Data Source=other.db");
    assert_eq!(factory.filename(), "memo.db");
    assert_eq!(factory.provider().contexts_created(), 0);
    assert_eq!(
        resolved_filename::<TableContext<Memoized>>().as_deref(),
        Some("memo.db")
    );
}

#[test]
fn engine_errors_propagate() {
    test_schema!(Unavailable);
    let harness = TestHarness::new();
    let factory = PersistentContextFactory::new(
        FailingEngine::<Unavailable>::new(),
        harness.cache().clone(),
        harness.swap(),
    );

    assert_eq!(factory.filename(), DEFAULT_FILENAME);
    assert!(matches!(factory.create_context(), Err(CoreError::Engine(_))));
    assert!(!factory.is_initialized());
    assert_eq!(factory.provider().attempts(), 2);
}

// ============================================================================
// Backup
// ============================================================================

#[tokio::test]
async fn empty_save_pushes_nothing() {
    test_schema!(EmptySave);
    let (local, cache) = mock_pair();
    let factory =
        mock_factory::<EmptySave>(&local, &cache, "Data Source=empty.db", FactoryConfig::default());

    let ctx = factory.create_context_async().await.unwrap();
    assert_eq!(ctx.save_changes_async().await.unwrap(), 0);
    ctx.insert("items", "1", json!(1)).unwrap();
    ctx.remove("items", "1").unwrap();
    assert_eq!(ctx.save_changes_async().await.unwrap(), 0);

    assert!(cache.push_calls().is_empty());
    assert_eq!(factory.last_status(), SyncStatus::MISSING);
}

#[tokio::test]
async fn every_committing_save_pushes_a_new_artifact() {
    test_schema!(Artifacts);
    let (local, cache) = mock_pair();
    let factory =
        mock_factory::<Artifacts>(&local, &cache, "Data Source=art.db", FactoryConfig::default());

    let first = factory.create_context_async().await.unwrap();
    let second = factory.create_context_async().await.unwrap();
    first.insert("items", "1", json!(1)).unwrap();
    second.insert("items", "2", json!(2)).unwrap();

    let (a, b) = futures::join!(first.save_changes_async(), second.save_changes_async());
    assert_eq!((a.unwrap(), b.unwrap()), (1, 1));

    let pushes = cache.push_calls();
    assert_eq!(pushes.len(), 2);
    assert_ne!(pushes[0], pushes[1]);
    for artifact in &pushes {
        assert!(artifact.starts_with("art.db_bak-"));
        assert!(local.exists(artifact).unwrap());
    }
}

#[tokio::test]
async fn failing_push_never_fails_the_save() {
    test_schema!(FailingPush);
    let (local, cache) = mock_pair();
    let factory = mock_factory::<FailingPush>(
        &local,
        &cache,
        "Data Source=fail.db",
        FactoryConfig::default(),
    );
    cache.set_fail_push(true);

    let ctx = factory.create_context_async().await.unwrap();
    ctx.insert("items", "1", json!(1)).unwrap();
    assert_eq!(ctx.save_changes_async().await.unwrap(), 1);
    assert_eq!(factory.last_status(), SyncStatus::FAILED);

    cache.set_fail_push(false);
    cache.set_push_status(SyncStatus::from_code(7));
    ctx.update("items", "1", json!(2)).unwrap();
    assert_eq!(ctx.save_changes_async().await.unwrap(), 1);
    assert_eq!(factory.last_status(), SyncStatus::from_code(7));

    // the save committed both times
    assert_eq!(ctx.rows("items").unwrap()["1"], json!(2));
}

#[tokio::test]
async fn panicking_hooks_do_not_break_backup() {
    test_schema!(PanickyHooks);
    let (local, cache) = mock_pair();
    let factory = mock_factory::<PanickyHooks>(
        &local,
        &cache,
        "Data Source=panic.db",
        FactoryConfig::default(),
    );

    let ctx = factory.create_context_async().await.unwrap();
    ctx.attach_hooks(Arc::new(PanickingHooks));
    ctx.insert("items", "1", json!(1)).unwrap();

    assert_eq!(ctx.save_changes_async().await.unwrap(), 1);
    assert_eq!(cache.push_calls().len(), 1);
    assert_eq!(factory.last_status(), SyncStatus::SUCCESS);
}

#[tokio::test]
async fn failed_save_pushes_nothing() {
    test_schema!(RejectedSave);
    let (local, cache) = mock_pair();
    let factory = mock_factory::<RejectedSave>(
        &local,
        &cache,
        "Data Source=rejected.db",
        FactoryConfig::default(),
    );

    let writer = factory.create_context_async().await.unwrap();
    let stale = factory.create_context_async().await.unwrap();
    writer.insert("items", "1", json!("first")).unwrap();
    stale.insert("items", "1", json!("second")).unwrap();
    writer.save_changes_async().await.unwrap();

    let result = stale.save_changes_async().await;
    assert!(matches!(result, Err(CoreError::DuplicateKey { .. })));
    assert_eq!(cache.push_calls().len(), 1);
}

#[test]
fn settle_delay_keeps_blocking_backups() {
    test_schema!(SettledSave);
    let local = Arc::new(InMemoryFs::new());
    let durable = Arc::new(InMemoryFs::new());
    let cache = BlobCache::new(durable.clone(), local.clone())
        .with_config(CacheConfig::default().with_settle_delay(Duration::from_millis(5)));
    let factory = PersistentContextFactory::new(
        TableEngine::<SettledSave>::new(local.clone(), "Data Source=settled.db"),
        Arc::new(cache),
        Arc::new(CopySwap::new(local.clone())),
    );

    let ctx = factory.create_context().unwrap();
    ctx.insert("items", "1", json!("kept")).unwrap();
    assert_eq!(ctx.save_changes().unwrap(), 1);

    assert_eq!(factory.last_status(), SyncStatus::SUCCESS);
    let stored = durable_image(durable.as_ref(), "settled.db").unwrap();
    assert_eq!(stored.get("items", "1").unwrap(), Some(&json!("kept")));
}

#[tokio::test]
async fn panicking_push_is_recorded_as_failed() {
    test_schema!(PanickyPush);
    let local = Arc::new(InMemoryFs::new());
    let factory = PersistentContextFactory::new(
        TableEngine::<PanickyPush>::new(local.clone(), "Data Source=panicky-push.db"),
        Arc::new(PanickingCache),
        Arc::new(CopySwap::new(local.clone())),
    );

    let ctx = factory.create_context_async().await.unwrap();
    ctx.insert("items", "1", json!(1)).unwrap();
    assert_eq!(ctx.save_changes_async().await.unwrap(), 1);

    assert_eq!(factory.last_status(), SyncStatus::FAILED);
    assert_eq!(ctx.find("items", "1").unwrap(), Some(json!(1)));
}

#[tokio::test]
async fn panicking_snapshot_is_recorded_as_failed() {
    test_schema!(PanickySnapshot);
    let (local, cache) = mock_pair();
    let factory = PersistentContextFactory::new(
        TableEngine::<PanickySnapshot>::new(local.clone(), "Data Source=panicky-swap.db"),
        cache.clone(),
        Arc::new(PanickingSwap),
    );

    let ctx = factory.create_context_async().await.unwrap();
    ctx.insert("items", "1", json!(1)).unwrap();
    assert_eq!(ctx.save_changes_async().await.unwrap(), 1);

    assert_eq!(factory.last_status(), SyncStatus::FAILED);
    assert!(cache.push_calls().is_empty());
}

// ============================================================================
// Restart
// ============================================================================

#[tokio::test]
async fn data_survives_restart() {
    init_tracing();
    test_schema!(Survivor, ["people", "pets"]);
    let first = TestHarness::new();
    {
        let factory = first.factory::<Survivor>("Data Source=survivor.db");
        let ctx = factory.create_context_async().await.unwrap();
        ctx.insert("people", "ada", json!({ "name": "Ada" })).unwrap();
        ctx.insert("pets", "rex", json!({ "kind": "dog" })).unwrap();
        assert_eq!(ctx.save_changes_async().await.unwrap(), 2);

        ctx.update("people", "ada", json!({ "name": "Ada Lovelace" })).unwrap();
        ctx.remove("pets", "rex").unwrap();
        assert_eq!(ctx.save_changes_async().await.unwrap(), 2);
        assert!(factory.last_status().is_success());
    }

    // artifacts are removed once the cache has them
    assert!(first
        .local()
        .list()
        .unwrap()
        .iter()
        .all(|name| !name.contains("_bak-")));
    let stored = durable_image(first.durable().as_ref(), "survivor.db").unwrap();
    assert!(stored.has_table("people"));

    let second = first.restart();
    assert!(!second.local().exists("survivor.db").unwrap());
    let factory = second.factory::<Survivor>("Data Source=survivor.db");
    let ctx = factory.create_context_async().await.unwrap();

    assert_eq!(factory.last_status(), SyncStatus::SUCCESS);
    assert_eq!(
        ctx.find("people", "ada").unwrap(),
        Some(json!({ "name": "Ada Lovelace" }))
    );
    assert_eq!(ctx.find("pets", "rex").unwrap(), None);
}

#[test]
fn data_survives_restart_without_runtime() {
    test_schema!(BlockingSurvivor);
    let first = TestHarness::new();
    let factory = first.factory::<BlockingSurvivor>("Data Source=blocking.db");
    let ctx = factory.create_context().unwrap();
    ctx.insert("items", "1", json!([1, 2, 3])).unwrap();
    assert_eq!(ctx.save_changes().unwrap(), 1);

    let second = first.restart();
    let factory = second.factory::<BlockingSurvivor>("Data Source=blocking.db");
    let ctx = factory.create_context().unwrap();
    assert_eq!(ctx.find("items", "1").unwrap(), Some(json!([1, 2, 3])));
}

#[tokio::test]
async fn later_saves_replace_the_durable_copy() {
    test_schema!(Replaced);
    let harness = TestHarness::new();
    let factory = harness.factory::<Replaced>("Data Source=replaced.db");

    for i in 0..3 {
        let ctx = factory.create_context_async().await.unwrap();
        ctx.insert("items", &i.to_string(), json!(i)).unwrap();
        ctx.save_changes_async().await.unwrap();
    }
    assert_eq!(harness.durable().list().unwrap(), vec!["replaced.db".to_string()]);

    let restarted = harness.restart();
    let status = restarted
        .cache()
        .sync_into_local("replaced.db_bak")
        .await
        .unwrap();
    assert!(status.is_success());
    let rows = durable_image(restarted.local().as_ref(), "replaced.db_bak")
        .unwrap()
        .rows("items")
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 3);
}
