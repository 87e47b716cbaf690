//! Organization-scoped session slots.
//!
//! The contact session id survives a reload (file-backed); screen, loading
//! and error messages, the validated organization and the open conversation
//! live in memory and reset with the process.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::error::Result;
use crate::screen::Screen;

pub const CONTACT_SESSION_NAMESPACE: &str = "beacon_contact_session";

/// `<namespace>_<organizationId>`. An empty organization id yields the
/// trailing-underscore key, which no real organization can collide with.
pub fn storage_key(namespace: &str, organization_id: &str) -> String {
    format!("{}_{}", namespace, organization_id)
}

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// FileStorage
// ============================================================================

/// All keys in one JSON object on disk, rewritten via temp file + rename.
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = lock(&self.write_lock);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = lock(&self.write_lock);
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = lock(&self.write_lock);
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// ============================================================================
// MemoryStorage
// ============================================================================

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

// ============================================================================
// SessionStore
// ============================================================================

#[derive(Debug, Default)]
struct Transient {
    screen: Screen,
    loading_message: Option<String>,
    error_message: Option<String>,
    organization_id: Option<String>,
    conversation_id: Option<Uuid>,
}

/// Shared by the bootstrap controller and the screens.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    transient: RwLock<Transient>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            transient: RwLock::new(Transient::default()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Last persisted contact session id for `organization_id`. An
    /// unreadable value is treated as absent.
    pub fn get(&self, organization_id: &str) -> Result<Option<Uuid>> {
        let key = storage_key(CONTACT_SESSION_NAMESPACE, organization_id);
        let Some(raw) = self.storage.get(&key)? else {
            return Ok(None);
        };
        match raw.parse::<Uuid>() {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                tracing::warn!(%key, error = %e, "Discarding unreadable contact session id");
                Ok(None)
            }
        }
    }

    pub fn set(&self, organization_id: &str, contact_session_id: Uuid) -> Result<()> {
        let key = storage_key(CONTACT_SESSION_NAMESPACE, organization_id);
        self.storage.set(&key, &contact_session_id.to_string())
    }

    pub fn clear(&self, organization_id: &str) -> Result<()> {
        let key = storage_key(CONTACT_SESSION_NAMESPACE, organization_id);
        self.storage.remove(&key)
    }

    fn read(&self) -> RwLockReadGuard<'_, Transient> {
        self.transient.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Transient> {
        self.transient.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn screen(&self) -> Screen {
        self.read().screen
    }

    pub fn set_screen(&self, screen: Screen) {
        self.write().screen = screen;
    }

    pub fn loading_message(&self) -> Option<String> {
        self.read().loading_message.clone()
    }

    pub fn set_loading_message(&self, message: impl Into<String>) {
        self.write().loading_message = Some(message.into());
    }

    pub fn error_message(&self) -> Option<String> {
        self.read().error_message.clone()
    }

    pub fn set_error_message(&self, message: impl Into<String>) {
        self.write().error_message = Some(message.into());
    }

    pub fn organization_id(&self) -> Option<String> {
        self.read().organization_id.clone()
    }

    pub fn set_organization_id(&self, organization_id: impl Into<String>) {
        self.write().organization_id = Some(organization_id.into());
    }

    /// Drop the verified organization and anything opened under it.
    pub fn forget_organization(&self) {
        let mut slots = self.write();
        slots.organization_id = None;
        slots.conversation_id = None;
    }

    pub fn conversation_id(&self) -> Option<Uuid> {
        self.read().conversation_id
    }

    pub fn set_conversation_id(&self, conversation_id: Option<Uuid>) {
        self.write().conversation_id = conversation_id;
    }
}
