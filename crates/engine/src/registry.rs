//! Store registry
//!
//! Process-scoped owner of every open [`SmartStore`]. Opening the same
//! `(name, identity)` twice returns the same instance.
//!
//! On-disk layout under the registry root:
//!
//! ```text
//! <root>/
//!   smartstore.toml
//!   shared/
//!     defaultStore.db
//!     defaultStore.db.lock
//!   user_<id>/
//!     <name>.db
//!     <name>.db.lock
//! ```
//!
//! Each store file is guarded by an exclusive lock file so a second process
//! cannot open it while this registry holds it.

use crate::config::{StoreConfig, CONFIG_FILE_NAME};
use crate::protection::ProtectionSignal;
use crate::store::SmartStore;
use parking_lot::{Mutex, RwLock};
use smartstore_core::{StoreError, StoreIdentity, StoreKey, StoreResult, DEFAULT_STORE_NAME};
use smartstore_storage::{default_key_provider, KeyProvider};
use std::collections::{BTreeSet, HashMap};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

const STORE_EXTENSION: &str = "db";

/// Files that accompany a store file
const SIDECAR_SUFFIXES: [&str; 4] = ["-wal", "-shm", "-journal", ".lock"];

// =============================================================================
// Builder
// =============================================================================

/// Configures a [`StoreRegistry`]
pub struct StoreRegistryBuilder {
    root: PathBuf,
    config: Option<StoreConfig>,
    key_provider: Option<KeyProvider>,
    protection_available: bool,
}

impl StoreRegistryBuilder {
    /// Use `config` instead of reading `smartstore.toml`
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Key provider applied to every store opened afterwards
    pub fn key_provider(mut self, provider: KeyProvider) -> Self {
        self.key_provider = Some(provider);
        self
    }

    /// Initial state of the file-protection signal
    pub fn protection_available(mut self, available: bool) -> Self {
        self.protection_available = available;
        self
    }

    /// Create the root directory and the registry
    pub fn build(self) -> StoreResult<StoreRegistry> {
        std::fs::create_dir_all(&self.root)?;
        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => {
                let path = self.root.join(CONFIG_FILE_NAME);
                StoreConfig::write_default_if_missing(&path)?;
                StoreConfig::from_file(&path)?
            }
        };
        info!(target: "smartstore::registry", root = %self.root.display(), journal_mode = %config.journal_mode, "Store registry ready");
        Ok(StoreRegistry {
            root: self.root,
            config,
            key_provider: RwLock::new(self.key_provider.unwrap_or_else(default_key_provider)),
            protection: Arc::new(ProtectionSignal::new(self.protection_available)),
            stores: Mutex::new(HashMap::new()),
            opened_any: AtomicBool::new(false),
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Owner of all open stores under one root directory
pub struct StoreRegistry {
    root: PathBuf,
    config: StoreConfig,
    key_provider: RwLock<KeyProvider>,
    protection: Arc<ProtectionSignal>,
    stores: Mutex<HashMap<StoreKey, Arc<SmartStore>>>,
    opened_any: AtomicBool,
}

impl StoreRegistry {
    /// Registry over `root`, configured from `root/smartstore.toml`.
    ///
    /// The config file is written with defaults if missing.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::builder(root).build()
    }

    /// Builder over `root`
    pub fn builder(root: impl AsRef<Path>) -> StoreRegistryBuilder {
        StoreRegistryBuilder {
            root: root.as_ref().to_path_buf(),
            config: None,
            key_provider: None,
            protection_available: false,
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Active configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Replace the key provider.
    ///
    /// Stores already opened keep their key; a warning is logged because
    /// reopening them later with a different key will fail.
    pub fn set_key_provider(&self, provider: KeyProvider) {
        if self.opened_any.load(Ordering::Acquire) {
            warn!(target: "smartstore::registry", "Key provider replaced after stores were opened");
        }
        *self.key_provider.write() = provider;
    }

    /// Current key provider
    pub fn key_provider(&self) -> KeyProvider {
        self.key_provider.read().clone()
    }

    /// Shared file-protection signal; the platform side calls
    /// [`ProtectionSignal::set_available`] on it
    pub fn protection(&self) -> Arc<ProtectionSignal> {
        Arc::clone(&self.protection)
    }

    /// Path of the store file for `(name, identity)`
    pub fn store_path(&self, name: &str, identity: &StoreIdentity) -> StoreResult<PathBuf> {
        let key = StoreKey::new(name, identity.clone())?;
        Ok(self.identity_dir(&key.identity)?.join(store_file_name(&key.name)))
    }

    fn identity_dir(&self, identity: &StoreIdentity) -> StoreResult<PathBuf> {
        Ok(self.root.join(identity.dir_name()?))
    }

    /// The open store for `(name, identity)`, opening or creating it on first
    /// use
    pub fn shared_store(&self, name: &str, identity: &StoreIdentity) -> StoreResult<Arc<SmartStore>> {
        let key = StoreKey::new(name, identity.clone())?;

        // Held across open so two threads cannot both open the same file.
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(&key) {
            if !store.is_closed() {
                debug!(target: "smartstore::registry", store = %key, "Returning open store");
                return Ok(Arc::clone(store));
            }
        }

        let dir = self.identity_dir(&key.identity)?;
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(store_file_name(&key.name));
        let lock_file = acquire_lock(&sidecar(&path, ".lock"), &key)?;

        let key_material = {
            let provider = self.key_provider.read();
            (*provider)()
        };
        let store = Arc::new(SmartStore::open(
            key.clone(),
            path,
            &key_material,
            &self.config,
            Arc::clone(&self.protection),
            lock_file,
        )?);
        self.opened_any.store(true, Ordering::Release);
        stores.insert(key, Arc::clone(&store));
        Ok(store)
    }

    /// The store named [`DEFAULT_STORE_NAME`] for `identity`
    pub fn default_store(&self, identity: &StoreIdentity) -> StoreResult<Arc<SmartStore>> {
        self.shared_store(DEFAULT_STORE_NAME, identity)
    }

    /// Whether `(name, identity)` is currently open in this registry
    pub fn is_open(&self, name: &str, identity: &StoreIdentity) -> bool {
        let Ok(key) = StoreKey::new(name, identity.clone()) else {
            return false;
        };
        self.stores
            .lock()
            .get(&key)
            .is_some_and(|store| !store.is_closed())
    }

    /// Names of the stores on disk for `identity`, sorted
    pub fn all_store_names(&self, identity: &StoreIdentity) -> StoreResult<Vec<String>> {
        let dir = self.identity_dir(identity)?;
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = BTreeSet::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STORE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.insert(stem.to_string());
            }
        }
        Ok(names.into_iter().collect())
    }

    /// Close `(name, identity)` if open and delete its files.
    ///
    /// Handles held elsewhere fail with `StoreClosed` afterwards. Removing a
    /// store that does not exist is not an error.
    pub fn remove_shared_store(&self, name: &str, identity: &StoreIdentity) -> StoreResult<()> {
        let key = StoreKey::new(name, identity.clone())?;
        let path = self.identity_dir(&key.identity)?.join(store_file_name(&key.name));

        // held until the files are gone; opens of this key wait on it
        let mut stores = self.stores.lock();
        if let Some(store) = stores.remove(&key) {
            store.close();
        }

        remove_if_exists(&path)?;
        for suffix in SIDECAR_SUFFIXES {
            remove_if_exists(&sidecar(&path, suffix))?;
        }
        drop(stores);
        info!(target: "smartstore::registry", store = %key, "Store removed");
        Ok(())
    }

    /// Remove every store of `identity`, open or not
    pub fn remove_all_stores(&self, identity: &StoreIdentity) -> StoreResult<()> {
        let mut names: BTreeSet<String> = self.all_store_names(identity)?.into_iter().collect();
        names.extend(
            self.stores
                .lock()
                .keys()
                .filter(|k| &k.identity == identity)
                .map(|k| k.name.clone()),
        );
        for name in &names {
            self.remove_shared_store(name, identity)?;
        }

        let dir = self.identity_dir(identity)?;
        if let Err(e) = std::fs::remove_dir(&dir) {
            if e.kind() != IoErrorKind::NotFound {
                debug!(target: "smartstore::registry", dir = %dir.display(), error = %e, "Identity directory kept");
            }
        }
        info!(target: "smartstore::registry", identity = %identity, removed = names.len(), "All stores removed");
        Ok(())
    }

    /// Close every open store
    pub fn shutdown(&self) {
        let stores: Vec<_> = self.stores.lock().drain().collect();
        if stores.is_empty() {
            return;
        }
        for (_, store) in &stores {
            store.close();
        }
        info!(target: "smartstore::registry", closed = stores.len(), "Store registry shut down");
    }
}

impl Drop for StoreRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("open_stores", &self.stores.lock().len())
            .finish()
    }
}

fn store_file_name(name: &str) -> String {
    format!("{}.{}", name, STORE_EXTENSION)
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn acquire_lock(lock_path: &Path, key: &StoreKey) -> StoreResult<File> {
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)
        .map_err(|e| StoreError::Io {
            reason: format!("failed to open lock file '{}': {}", lock_path.display(), e),
        })?;
    fs2::FileExt::try_lock_exclusive(&lock_file).map_err(|_| StoreError::StoreLocked {
        store: key.to_string(),
    })?;
    Ok(lock_file)
}

fn remove_if_exists(path: &Path) -> StoreResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
