use async_trait::async_trait;
use progress_core::model::{PathSegmentError, UserId, validate_path_segment};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    InvalidPath(#[from] PathSegmentError),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request was not authorized")]
    Unauthorized,

    #[error("remote store returned status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

//
// ─── REMOTE PATHS ──────────────────────────────────────────────────────────────
//

/// Root under which every user's progress record lives.
pub const USER_PROGRESS_ROOT: &str = "user_progress";

/// Slash-separated location in the remote document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath {
    segments: Vec<String>,
}

impl RemotePath {
    /// `user_progress/{user}`.
    #[must_use]
    pub fn user_root(user: &UserId) -> Self {
        Self {
            segments: vec![USER_PROGRESS_ROOT.to_owned(), user.as_str().to_owned()],
        }
    }

    /// Appends one segment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if the segment is empty or reserved.
    pub fn child(&self, segment: &str) -> Result<Self, StorageError> {
        validate_path_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_owned());
        Ok(Self { segments })
    }

    /// Appends a relative `a/b/c` path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if any segment is invalid.
    pub fn join(&self, relative: &str) -> Result<Self, StorageError> {
        relative
            .split('/')
            .try_fold(self.clone(), |path, segment| path.child(segment))
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

//
// ─── COLLABORATOR CONTRACTS ────────────────────────────────────────────────────
//

/// Device-local string store that survives restarts and needs no network.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored (quota, I/O).
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Keyed JSON document store addressed by [`RemotePath`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read the value at `path` once. `None` when nothing is stored there.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport or decoding failures.
    async fn read_once(&self, path: &RemotePath) -> Result<Option<Value>, StorageError>;

    /// Merge `fields` into the node at `path`; unspecified children are left
    /// untouched. Keys may be relative multi-segment paths (`quiz/q1`), in
    /// which case each named location is replaced as a unit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport failures or invalid keys.
    async fn update(&self, path: &RemotePath, fields: Map<String, Value>)
    -> Result<(), StorageError>;

    /// Replace the node at `path` with `value`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on transport failures.
    async fn set(&self, path: &RemotePath, value: Value) -> Result<(), StorageError>;
}

/// Issues a stable opaque identity without user interaction.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in anonymously and return the user id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the issuer cannot be reached or refuses.
    async fn sign_in_anonymously(&self) -> Result<UserId, StorageError>;
}

//
// ─── IN-MEMORY LOCAL STORE ─────────────────────────────────────────────────────
//

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simple in-memory local store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryLocalStore {
    values: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `set`/`remove` fail, as a full quota would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Direct read without going through the trait.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    /// Direct write without going through the trait.
    pub fn insert_raw(&self, key: &str, value: impl Into<String>) {
        lock(&self.values).insert(key.to_owned(), value.into());
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("local store quota exceeded".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.insert_raw(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        lock(&self.values).remove(key);
        Ok(())
    }
}

//
// ─── IN-MEMORY REMOTE STORE ────────────────────────────────────────────────────
//

/// A write accepted by [`InMemoryRemoteStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteWrite {
    Update { path: String, fields: Map<String, Value> },
    Set { path: String, value: Value },
}

/// JSON tree with the remote store's merge semantics, plus failure knobs.
#[derive(Clone, Default)]
pub struct InMemoryRemoteStore {
    root: Arc<Mutex<Map<String, Value>>>,
    writes: Arc<Mutex<Vec<RemoteWrite>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    stall_writes: Arc<AtomicBool>,
}

impl InMemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make writes never complete, as a hung connection would.
    pub fn stall_writes(&self, stall: bool) {
        self.stall_writes.store(stall, Ordering::SeqCst);
    }

    /// Store `value` at `path` without recording a write.
    pub fn seed(&self, path: &RemotePath, value: Value) {
        write_at(&mut lock(&self.root), path.segments(), value);
    }

    /// Current value at `path`.
    #[must_use]
    pub fn snapshot(&self, path: &RemotePath) -> Option<Value> {
        read_at(&lock(&self.root), path.segments())
    }

    /// Every accepted write, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<RemoteWrite> {
        lock(&self.writes).clone()
    }

    pub fn clear_writes(&self) {
        lock(&self.writes).clear();
    }

    async fn before_write(&self) -> Result<(), StorageError> {
        if self.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("remote store unreachable".into()));
        }
        Ok(())
    }
}

fn read_at(root: &Map<String, Value>, segments: &[String]) -> Option<Value> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(Value::Object(root.clone()));
    };
    let mut node = root.get(first)?;
    for segment in rest {
        node = node.as_object()?.get(segment)?;
    }
    (!node.is_null()).then(|| node.clone())
}

fn write_at(root: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        if let Value::Object(map) = value {
            *root = map;
        } else {
            root.clear();
        }
        return;
    };
    let mut node = root;
    for segment in parents {
        let entry = node
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(map) = entry else {
            return;
        };
        node = map;
    }
    if value.is_null() {
        node.remove(last);
    } else {
        node.insert(last.clone(), value);
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn read_once(&self, path: &RemotePath) -> Result<Option<Value>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("remote store unreachable".into()));
        }
        Ok(self.snapshot(path))
    }

    async fn update(
        &self,
        path: &RemotePath,
        fields: Map<String, Value>,
    ) -> Result<(), StorageError> {
        self.before_write().await?;
        let targets = fields
            .iter()
            .map(|(key, value)| Ok((path.join(key)?, value.clone())))
            .collect::<Result<Vec<_>, StorageError>>()?;
        {
            let mut root = lock(&self.root);
            for (target, value) in targets {
                write_at(&mut root, target.segments(), value);
            }
        }
        lock(&self.writes).push(RemoteWrite::Update {
            path: path.to_string(),
            fields,
        });
        Ok(())
    }

    async fn set(&self, path: &RemotePath, value: Value) -> Result<(), StorageError> {
        self.before_write().await?;
        write_at(&mut lock(&self.root), path.segments(), value.clone());
        lock(&self.writes).push(RemoteWrite::Set {
            path: path.to_string(),
            value,
        });
        Ok(())
    }
}

//
// ─── IN-MEMORY IDENTITY ────────────────────────────────────────────────────────
//

/// Issues one random anonymous id per instance, like a per-device session.
#[derive(Clone, Default)]
pub struct InMemoryIdentity {
    issued: Arc<Mutex<Option<UserId>>>,
    fail: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(id: UserId) -> Self {
        let identity = Self::default();
        *lock(&identity.issued) = Some(id);
        identity
    }

    #[must_use]
    pub fn failing() -> Self {
        let identity = Self::default();
        identity.fail.store(true, Ordering::SeqCst);
        identity
    }

    /// Number of sign-in attempts so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn sign_in_anonymously(&self) -> Result<UserId, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Unauthorized);
        }
        let mut issued = lock(&self.issued);
        if let Some(id) = issued.as_ref() {
            return Ok(id.clone());
        }
        let id = UserId::new(format!("anon-{}", uuid::Uuid::new_v4().simple()))?;
        *issued = Some(id.clone());
        Ok(id)
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the synchronizer's collaborators behind trait objects for easy
/// backend swapping. Remote and identity are optional: a missing one is a
/// fatal precondition reported at init, not at construction.
#[derive(Clone)]
pub struct Storage {
    pub local: Arc<dyn LocalStore>,
    pub remote: Option<Arc<dyn RemoteStore>>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            local: Arc::new(InMemoryLocalStore::new()),
            remote: Some(Arc::new(InMemoryRemoteStore::new())),
            identity: Some(Arc::new(InMemoryIdentity::new())),
        }
    }

    #[must_use]
    pub fn local_only(local: Arc<dyn LocalStore>) -> Self {
        Self {
            local,
            remote: None,
            identity: None,
        }
    }
}
