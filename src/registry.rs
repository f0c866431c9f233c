//! Durable set of cluster registrations.
//!
//! The polling service never touches this; the application loads it at
//! startup and writes it back after every add or remove.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clusterwatch_types::Registration;
use parking_lot::Mutex;
use tracing::debug;

/// Registrations keyed by name.
pub type Registrations = BTreeMap<String, Registration>;

/// Load/save of the full registration set.
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Result<Registrations>;
    fn save(&self, registrations: &Registrations) -> Result<()>;
}

/// Stores registrations as a JSON object keyed by cluster name.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for FileRegistry {
    /// A missing file is an empty registry.
    fn load(&self) -> Result<Registrations> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No registry file yet");
                return Ok(Registrations::new());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Write to a sibling temp file, then rename over the target.
    fn save(&self, registrations: &Registrations) -> Result<()> {
        let json = serde_json::to_string_pretty(registrations)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory registrations backed by a store.
///
/// Every mutation is persisted before it returns; if the save fails the
/// in-memory set is rolled back so memory and disk never disagree.
pub struct Registry {
    store: Box<dyn RegistryStore>,
    entries: Mutex<Registrations>,
}

impl Registry {
    /// Load the current set from `store`.
    pub fn open(store: impl RegistryStore + 'static) -> Result<Self> {
        let entries = store.load()?;
        Ok(Self {
            store: Box::new(store),
            entries: Mutex::new(entries),
        })
    }

    /// All registrations ordered by name.
    pub fn list(&self) -> Vec<Registration> {
        self.entries.lock().values().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Registration> {
        self.entries.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Insert or replace a registration and persist.
    ///
    /// Returns the registration it replaced, if any.
    pub fn insert(&self, registration: Registration) -> Result<Option<Registration>> {
        self.insert_with(registration, |_| {})
    }

    /// Like [`insert`](Self::insert), then hands the registration to `apply`
    /// while the registry lock is still held.
    ///
    /// `apply` only runs after a successful save, so whatever it updates
    /// follows the same order of writes as the registry.
    pub fn insert_with<F>(&self, registration: Registration, apply: F) -> Result<Option<Registration>>
    where
        F: FnOnce(Registration),
    {
        let mut entries = self.entries.lock();
        let name = registration.name.clone();
        let previous = entries.insert(name.clone(), registration.clone());

        if let Err(e) = self.store.save(&entries) {
            match &previous {
                Some(old) => entries.insert(name, old.clone()),
                None => entries.remove(&name),
            };
            return Err(e);
        }
        apply(registration);
        Ok(previous)
    }

    /// Remove a registration and persist. `Ok(None)` if it was not present.
    pub fn remove(&self, name: &str) -> Result<Option<Registration>> {
        self.remove_with(name, |_| {})
    }

    /// Like [`remove`](Self::remove), then calls `apply` under the registry
    /// lock. `apply` runs even when the name was not registered, but never
    /// after a failed save.
    pub fn remove_with<F>(&self, name: &str, apply: F) -> Result<Option<Registration>>
    where
        F: FnOnce(&str),
    {
        let mut entries = self.entries.lock();
        let Some(removed) = entries.remove(name) else {
            apply(name);
            return Ok(None);
        };

        if let Err(e) = self.store.save(&entries) {
            entries.insert(name.to_string(), removed);
            return Err(e);
        }
        apply(name);
        Ok(Some(removed))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("clusters", &self.len())
            .finish()
    }
}
