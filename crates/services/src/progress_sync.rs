//! Local-first progress synchronizer.
//!
//! Every mutation lands in the in-memory cache first, is mirrored to the
//! local store, and is then pushed to the remote store when a remote write
//! is possible. Writes that cannot be confirmed are queued and flushed by
//! [`ProgressSync::resync`], which always sends the *current* cached value
//! of each queued key, never the value captured at queue time.
//!
//! State lives behind a std mutex that is never held across an await, so
//! concurrent callers observe each mutation in call order. Mirror writes go
//! through an async lock and re-serialize the cache while holding it, so the
//! last mirror write always carries the newest snapshot.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use progress_core::Clock;
use progress_core::model::{
    Achievement, ItemProgress, LEGACY_BOKFORING_KEY, LEGACY_QUIZ_KEY, Module, ModuleKey,
    OverallProgress, PendingUpdate, ProgressCache, ProgressData, ProgressRecord, UnlockOutcome,
    UserId, distinct_keys, legacy, validate_path_segment,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use storage::{IdentityProvider, LocalStore, RemotePath, RemoteStore, Storage, StorageError};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::connectivity::Connectivity;
use crate::error::SyncError;
use crate::events::{EventEmitter, ListenerHandle, ProgressEvent, SyncOperation};

/// Local-store key of the cache snapshot.
pub const CACHE_KEY: &str = "aq_progress_cache";
/// Local-store key of the pending-update queue.
pub const PENDING_KEY: &str = "aq_pending_updates";

/// What a successful [`ProgressSync::init`] ended up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    /// `None` when sign-in failed and the synchronizer runs on local data only.
    pub user_id: Option<UserId>,
}

impl InitOutcome {
    #[must_use]
    pub fn is_local_only(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Result of one [`ProgressSync::resync`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// Offline, signed out, remote missing or shut down; nothing attempted.
    Skipped,
    NothingPending,
    /// The batch was confirmed; carries the number of distinct keys sent.
    Flushed(usize),
    /// The remote write failed; the queue is untouched.
    Failed,
}

#[derive(Debug, Default)]
struct SyncState {
    cache: ProgressCache,
    pending: Vec<PendingUpdate>,
    user_id: Option<UserId>,
}

enum WriteKind {
    Update(Map<String, Value>),
    Set(Value),
}

/// Keeps one learner's progress in sync between the local and remote stores.
///
/// Build one per process, wrap it in an `Arc` and call
/// [`ProgressSync::init`] before anything else.
pub struct ProgressSync {
    clock: Clock,
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    connectivity: Connectivity,
    state: Mutex<SyncState>,
    mirror_lock: tokio::sync::Mutex<()>,
    resync_lock: tokio::sync::Mutex<()>,
    restored: OnceCell<()>,
    init_latch: OnceCell<Result<InitOutcome, SyncError>>,
    events: EventEmitter<ProgressEvent>,
    cancel: CancellationToken,
}

impl ProgressSync {
    #[must_use]
    pub fn new(clock: Clock, storage: Storage, connectivity: Connectivity) -> Self {
        Self {
            clock,
            local: storage.local,
            remote: storage.remote,
            identity: storage.identity,
            connectivity,
            state: Mutex::new(SyncState::default()),
            mirror_lock: tokio::sync::Mutex::new(()),
            resync_lock: tokio::sync::Mutex::new(()),
            restored: OnceCell::new(),
            init_latch: OnceCell::new(),
            events: EventEmitter::new(),
            cancel: CancellationToken::new(),
        }
    }

    //
    // ─── LIFECYCLE ─────────────────────────────────────────────────────────────
    //

    /// Signs in, loads and merges progress, and starts listening for
    /// connectivity changes.
    ///
    /// Runs once; later and concurrent calls wait for and return the first
    /// call's outcome. A failed sign-in is not an error: the synchronizer
    /// continues on local data and reports `user_id: None`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::RemoteUnavailable` if no remote store or identity
    /// provider is configured, and `SyncError::ShutDown` if shut down while
    /// signing in.
    pub async fn init(self: &Arc<Self>) -> Result<InitOutcome, SyncError> {
        self.init_latch.get_or_init(|| self.run_init()).await.clone()
    }

    async fn run_init(self: &Arc<Self>) -> Result<InitOutcome, SyncError> {
        let (Some(remote), Some(identity)) = (self.remote.clone(), self.identity.clone()) else {
            error!("progress sync cannot start: remote store client is not configured");
            return Err(SyncError::RemoteUnavailable);
        };

        self.ensure_restored().await;
        self.watch_connectivity();

        let user_id = match self.cancellable(identity.sign_in_anonymously()).await {
            Some(Ok(user_id)) => user_id,
            Some(Err(err)) => {
                warn!(error = %err, "anonymous sign-in failed; continuing with local progress only");
                self.emit_failure(SyncOperation::Load, &err);
                self.emit_loaded();
                return Ok(InitOutcome { user_id: None });
            }
            None => return Err(SyncError::ShutDown),
        };
        info!(user_id = %user_id, "signed in");
        self.lock_state().user_id = Some(user_id.clone());

        self.load_progress(remote.as_ref(), &user_id).await;

        if self.is_online() {
            self.resync().await;
        }

        Ok(InitOutcome {
            user_id: Some(user_id),
        })
    }

    /// Cancels in-flight remote calls and stops the connectivity listener.
    /// Later writes stay local and are queued.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            info!("progress sync shutting down");
        }
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn watch_connectivity(self: &Arc<Self>) {
        let mut rx = self.connectivity.subscribe();
        let cancel = self.cancel.clone();
        let sync = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let online = *rx.borrow_and_update();
                        let Some(sync) = sync.upgrade() else {
                            break;
                        };
                        sync.on_connectivity_change(online).await;
                    }
                }
            }
            debug!("connectivity listener stopped");
        });
    }

    async fn on_connectivity_change(&self, online: bool) {
        info!(online, "connectivity changed");
        self.events
            .emit(&ProgressEvent::ConnectivityChanged { online });
        if online {
            self.resync().await;
        }
    }

    //
    // ─── LOAD ──────────────────────────────────────────────────────────────────
    //

    async fn ensure_restored(&self) {
        self.restored.get_or_init(|| self.restore_local()).await;
    }

    /// Loads the mirrored cache and queue. Anything written to the cache
    /// before this point is laid over the restored snapshot.
    async fn restore_local(&self) {
        let cache = self.read_local::<ProgressCache>(CACHE_KEY).await;
        let pending = self.read_local::<Vec<PendingUpdate>>(PENDING_KEY).await;

        let mut state = self.lock_state();
        if let Some(mut restored) = cache {
            restored.overlay(std::mem::take(&mut state.cache));
            state.cache = restored;
        }
        if let Some(mut restored) = pending {
            debug!(queued = restored.len(), "restored pending updates");
            restored.append(&mut state.pending);
            state.pending = restored;
        }
    }

    async fn read_local<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.local.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key, error = %err, "discarding unreadable local snapshot");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "local store read failed");
                None
            }
        }
    }

    async fn load_progress(&self, remote: &dyn RemoteStore, user_id: &UserId) {
        let root = RemotePath::user_root(user_id);

        match self.cancellable(remote.read_once(&root)).await {
            Some(Ok(Some(Value::Object(record)))) => {
                let report = self.lock_state().cache.merge_remote(&record);
                for (key, reason) in &report.rejected {
                    warn!(module = %key, reason = %reason, "kept local value for undecodable remote entry");
                }
                info!(replaced = report.replaced.len(), "merged remote progress");
            }
            Some(Ok(Some(other))) => {
                warn!(kind = json_kind(&other), "remote progress is not an object; ignoring it");
            }
            Some(Ok(None)) => self.migrate_legacy(remote, &root).await,
            Some(Err(err)) => {
                warn!(error = %err, "remote progress read failed; using local data");
                self.emit_failure(SyncOperation::Load, &err);
            }
            None => debug!("progress load abandoned by shutdown"),
        }

        self.mirror_cache().await;
        self.emit_loaded();
    }

    /// First sign-in for this user: fold legacy local data into the cache and
    /// seed the remote record with it.
    async fn migrate_legacy(&self, remote: &dyn RemoteStore, root: &RemotePath) {
        let bokforing = self.read_local::<Value>(LEGACY_BOKFORING_KEY).await;
        let quiz = self.read_local::<Value>(LEGACY_QUIZ_KEY).await;
        let now = self.clock.now_millis();

        let seed = {
            let mut state = self.lock_state();
            let import =
                legacy::migrate_into(&mut state.cache, bokforing.as_ref(), quiz.as_ref(), now);
            if import.total() > 0 {
                info!(
                    bokforing = import.bokforing,
                    quiz = import.quiz,
                    "imported legacy progress"
                );
            }
            (!state.cache.is_empty()).then(|| state.cache.clone())
        };

        let Some(cache) = seed else {
            debug!("no remote progress and nothing local to seed it with");
            return;
        };
        let value = match serde_json::to_value(&cache) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "could not encode progress for the remote seed");
                return;
            }
        };
        match self.cancellable(remote.set(root, value)).await {
            Some(Ok(())) => info!("seeded remote progress from local data"),
            Some(Err(err)) => {
                warn!(error = %err, "remote seed failed; it will be retried on the next load");
                self.emit_failure(SyncOperation::Load, &err);
            }
            None => debug!("remote seed abandoned by shutdown"),
        }
    }

    //
    // ─── WRITES ────────────────────────────────────────────────────────────────
    //

    /// Records progress on one item and returns the merged record.
    ///
    /// The record is readable from the cache as soon as this call starts. The
    /// remote copy is updated right away when possible, otherwise the write
    /// is queued for the next resync.
    pub async fn save_progress(
        &self,
        module: Module,
        item_id: &str,
        data: ProgressData,
    ) -> ProgressRecord {
        let now = self.clock.now_millis();
        let record = self.lock_state().cache.apply(module, item_id, &data, now);
        self.mirror_cache().await;

        let key = ModuleKey::from(module);
        let fallback = PendingUpdate::new(key, item_id, Value::Object(data.fields().clone()));
        let confirmed = self
            .write_or_queue(
                SyncOperation::Save,
                &[key.as_str(), item_id],
                WriteKind::Update(data.to_update_fields(now)),
                vec![fallback.clone()],
            )
            .await;

        if confirmed {
            debug!(module = %module, item_id, "progress saved remotely");
            self.events.emit(&ProgressEvent::Saved {
                module,
                item_id: item_id.to_owned(),
                record: record.clone(),
            });
        }
        record
    }

    /// Unlocks an achievement once. Unlocking it again writes nothing and
    /// returns the original record.
    pub async fn unlock_achievement(&self, id: &str) -> UnlockOutcome {
        let now = self.clock.now_millis();
        let outcome = self.lock_state().cache.unlock(id, now);
        let UnlockOutcome::Unlocked(achievement) = outcome else {
            debug!(achievement = id, "achievement already unlocked");
            return outcome;
        };

        self.mirror_cache().await;
        info!(achievement = id, "achievement unlocked");
        self.events.emit(&ProgressEvent::Achievement {
            id: id.to_owned(),
            achievement,
        });

        let value = json!({ "unlockedAt": achievement.unlocked_at });
        self.write_or_queue(
            SyncOperation::Unlock,
            &[ModuleKey::Achievements.as_str(), id],
            WriteKind::Set(value.clone()),
            vec![PendingUpdate::new(ModuleKey::Achievements, id, value)],
        )
        .await;
        outcome
    }

    /// Shallow-merges `fields` into the stats and stamps `lastUpdated`.
    pub async fn update_stats(&self, fields: Map<String, Value>) {
        let now = self.clock.now_millis();
        let written = self.lock_state().cache.merge_stats(&fields, now);
        self.mirror_cache().await;

        let fallback = written
            .iter()
            .map(|(field, value)| PendingUpdate::new(ModuleKey::Stats, field, value.clone()))
            .collect();
        let confirmed = self
            .write_or_queue(
                SyncOperation::Stats,
                &[ModuleKey::Stats.as_str()],
                WriteKind::Update(written),
                fallback,
            )
            .await;

        if confirmed {
            let stats = self.get_stats();
            self.events.emit(&ProgressEvent::StatsUpdated(stats));
        }
    }

    /// Pushes one write to the remote store, queueing `fallback` when the
    /// write is not possible or not confirmed. Returns whether it was
    /// confirmed.
    ///
    /// Every entry of `segments` must be a single path segment; an item id
    /// such as `ch1/q2` is rejected instead of being nested.
    async fn write_or_queue(
        &self,
        operation: SyncOperation,
        segments: &[&str],
        write: WriteKind,
        fallback: Vec<PendingUpdate>,
    ) -> bool {
        let relative = segments.join("/");
        let Some((remote, root)) = self.remote_target() else {
            debug!(path = %relative, "remote not reachable; queueing update");
            self.enqueue(fallback).await;
            return false;
        };
        let path = match remote_target_path(root, segments, &write) {
            Ok(path) => path,
            Err(err) => {
                error!(
                    operation = operation.as_str(),
                    path = %relative,
                    error = %err,
                    "update cannot be addressed remotely"
                );
                self.emit_failure(operation, &err);
                self.enqueue(fallback).await;
                return false;
            }
        };

        let result = match write {
            WriteKind::Update(fields) => self.cancellable(remote.update(&path, fields)).await,
            WriteKind::Set(value) => self.cancellable(remote.set(&path, value)).await,
        };
        match result {
            Some(Ok(())) => true,
            Some(Err(err)) => {
                warn!(
                    operation = operation.as_str(),
                    %path,
                    error = %err,
                    "remote write failed; queueing update"
                );
                self.emit_failure(operation, &err);
                self.enqueue(fallback).await;
                false
            }
            None => {
                debug!(%path, "remote write abandoned by shutdown; queueing update");
                self.enqueue(fallback).await;
                false
            }
        }
    }

    //
    // ─── RESYNC ────────────────────────────────────────────────────────────────
    //

    /// Flushes the pending queue as one multi-path update of the user record.
    ///
    /// Each distinct queued key is sent once with its current cached value.
    /// On success only the entries that were part of the batch are removed;
    /// anything queued while the write was in flight stays for next time.
    pub async fn resync(&self) -> ResyncOutcome {
        let _serial = self.resync_lock.lock().await;

        let Some((remote, root)) = self.remote_target() else {
            return ResyncOutcome::Skipped;
        };

        let (batch_len, fields) = {
            let state = self.lock_state();
            if state.pending.is_empty() {
                return ResyncOutcome::NothingPending;
            }
            let mut fields = Map::new();
            for (key, item_id) in distinct_keys(&state.pending) {
                let relative = format!("{key}/{item_id}");
                if let Err(err) = validate_path_segment(&item_id) {
                    warn!(path = %relative, error = %err, "dropping queued update with an invalid path");
                    continue;
                }
                match state.cache.value_at(key, &item_id) {
                    Some(value) => {
                        fields.insert(relative, value);
                    }
                    None => debug!(path = %relative, "queued key no longer cached; skipping"),
                }
            }
            (state.pending.len(), fields)
        };

        let flushed = fields.len();
        if flushed > 0 {
            match self.cancellable(remote.update(&root, fields)).await {
                Some(Ok(())) => {}
                Some(Err(err)) => {
                    warn!(
                        operation = SyncOperation::Resync.as_str(),
                        queued = batch_len,
                        error = %err,
                        "resync failed; keeping queue"
                    );
                    self.emit_failure(SyncOperation::Resync, &err);
                    return ResyncOutcome::Failed;
                }
                None => {
                    debug!("resync abandoned by shutdown");
                    return ResyncOutcome::Skipped;
                }
            }
        }

        self.lock_state().pending.drain(..batch_len);
        self.mirror_queue().await;
        info!(flushed, "pending progress synced");
        self.events.emit(&ProgressEvent::Resynced { flushed });
        ResyncOutcome::Flushed(flushed)
    }

    async fn enqueue(&self, mut updates: Vec<PendingUpdate>) {
        if updates.is_empty() {
            return;
        }
        self.lock_state().pending.append(&mut updates);
        self.mirror_queue().await;
    }

    //
    // ─── MIRROR ────────────────────────────────────────────────────────────────
    //

    async fn mirror_cache(&self) {
        self.ensure_restored().await;
        let _guard = self.mirror_lock.lock().await;
        let encoded = serde_json::to_string(&self.lock_state().cache);
        match encoded {
            Ok(raw) => {
                if let Err(err) = self.local.set(CACHE_KEY, &raw).await {
                    warn!(error = %err, "could not mirror progress locally");
                }
            }
            Err(err) => warn!(error = %err, "could not encode progress cache"),
        }
    }

    async fn mirror_queue(&self) {
        self.ensure_restored().await;
        let _guard = self.mirror_lock.lock().await;
        let encoded = {
            let state = self.lock_state();
            if state.pending.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&state.pending))
            }
        };
        let result = match encoded {
            None => self.local.remove(PENDING_KEY).await,
            Some(Ok(raw)) => self.local.set(PENDING_KEY, &raw).await,
            Some(Err(err)) => {
                warn!(error = %err, "could not encode pending updates");
                return;
            }
        };
        if let Err(err) = result {
            warn!(error = %err, "could not mirror pending updates locally");
        }
    }

    //
    // ─── READS ─────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn get_progress(&self, module: Module) -> ItemProgress {
        self.lock_state().cache.module(module).clone()
    }

    #[must_use]
    pub fn get_item_progress(&self, module: Module, item_id: &str) -> Option<ProgressRecord> {
        self.lock_state().cache.record(module, item_id).cloned()
    }

    /// Snapshot of the whole cache.
    #[must_use]
    pub fn get_all_progress(&self) -> ProgressCache {
        self.lock_state().cache.clone()
    }

    #[must_use]
    pub fn get_achievements(&self) -> BTreeMap<String, Achievement> {
        self.lock_state().cache.achievements.clone()
    }

    #[must_use]
    pub fn get_stats(&self) -> Map<String, Value> {
        self.lock_state().cache.stats.clone()
    }

    #[must_use]
    pub fn pending_updates(&self) -> Vec<PendingUpdate> {
        self.lock_state().pending.clone()
    }

    #[must_use]
    pub fn calculate_overall_progress(&self) -> OverallProgress {
        OverallProgress::from_cache(&self.lock_state().cache)
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.lock_state().user_id.clone()
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    #[must_use]
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Registers an observer for every [`ProgressEvent`].
    pub fn add_listener(
        &self,
        listener: impl Fn(&ProgressEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.events.on(listener)
    }

    //
    // ─── HELPERS ───────────────────────────────────────────────────────────────
    //

    fn lock_state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Where remote writes go right now, if anywhere.
    fn remote_target(&self) -> Option<(Arc<dyn RemoteStore>, RemotePath)> {
        if !self.is_online() || self.cancel.is_cancelled() {
            return None;
        }
        let remote = Arc::clone(self.remote.as_ref()?);
        let user_id = self.lock_state().user_id.clone()?;
        Some((remote, RemotePath::user_root(&user_id)))
    }

    /// Runs `fut` unless shutdown wins first.
    async fn cancellable<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            () = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }

    fn emit_loaded(&self) {
        let cache = self.get_all_progress();
        self.events.emit(&ProgressEvent::Loaded(cache));
    }

    fn emit_failure(&self, operation: SyncOperation, err: &StorageError) {
        self.events.emit(&ProgressEvent::SyncFailed {
            operation,
            message: err.to_string(),
        });
    }
}

/// Resolves `segments` under `root` one segment at a time. Keys of a partial
/// update are paths on the remote side, so they are checked the same way.
fn remote_target_path(
    root: RemotePath,
    segments: &[&str],
    write: &WriteKind,
) -> Result<RemotePath, StorageError> {
    let path = segments
        .iter()
        .try_fold(root, |path, segment| path.child(segment))?;
    if let WriteKind::Update(fields) = write {
        for key in fields.keys() {
            validate_path_segment(key)?;
        }
    }
    Ok(path)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::time::fixed_clock;
    use storage::{InMemoryIdentity, InMemoryLocalStore, InMemoryRemoteStore};

    fn sync_with(local: Arc<InMemoryLocalStore>, online: bool) -> Arc<ProgressSync> {
        let storage = Storage {
            local,
            remote: Some(Arc::new(InMemoryRemoteStore::new())),
            identity: Some(Arc::new(InMemoryIdentity::new())),
        };
        Arc::new(ProgressSync::new(
            fixed_clock(),
            storage,
            Connectivity::new(online),
        ))
    }

    #[tokio::test]
    async fn save_before_init_is_laid_over_the_restored_snapshot() {
        let local = Arc::new(InMemoryLocalStore::new());
        let mut stored = ProgressCache::new();
        stored.apply(Module::Quiz, "q1", &ProgressData::new().attempts(3), 1);
        stored.apply(Module::Quiz, "q2", &ProgressData::new().completed(true), 1);
        local.insert_raw(CACHE_KEY, serde_json::to_string(&stored).unwrap());

        let sync = sync_with(Arc::clone(&local), false);
        sync.save_progress(Module::Quiz, "q1", ProgressData::new().correct(2))
            .await;

        let q1 = sync.get_item_progress(Module::Quiz, "q1").unwrap();
        assert_eq!(q1.attempts(), Some(3));
        assert_eq!(q1.correct(), Some(2));
        assert!(sync.get_item_progress(Module::Quiz, "q2").is_some());

        let mirrored: ProgressCache =
            serde_json::from_str(&local.raw(CACHE_KEY).unwrap()).unwrap();
        assert_eq!(mirrored, sync.get_all_progress());
    }

    #[tokio::test]
    async fn unreadable_snapshot_is_discarded() {
        let local = Arc::new(InMemoryLocalStore::new());
        local.insert_raw(CACHE_KEY, "not json");
        local.insert_raw(PENDING_KEY, "[1,2");

        let sync = sync_with(local, false);
        sync.init().await.unwrap();
        assert!(sync.get_all_progress().is_empty());
        assert!(sync.pending_updates().is_empty());
    }

    #[tokio::test]
    async fn mirror_failure_keeps_memory_state() {
        let local = Arc::new(InMemoryLocalStore::new());
        local.fail_writes(true);
        let sync = sync_with(local, false);

        let record = sync
            .save_progress(Module::Analyse, "a1", ProgressData::new().score(5.0))
            .await;
        assert_eq!(record.score(), Some(5.0));
        assert_eq!(sync.pending_updates().len(), 1);
    }

    #[test]
    fn json_kind_names_every_variant() {
        assert_eq!(json_kind(&json!([1])), "array");
        assert_eq!(json_kind(&json!(null)), "null");
    }
}
