//! Named dependency lookup shared by all components (and requests).

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use kstring::KString;

use crate::trace;

pub type Entry = Arc<dyn Any + Send + Sync>;
pub type Constructor = Box<dyn Fn(&Registry) -> anyhow::Result<Entry> + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("registry has no entry \"{0}\"")]
    Missing(KString),
    #[error("registry entry \"{name}\" is not of type {expected}")]
    WrongType { name: KString, expected: &'static str },
    #[error("constructing registry entry \"{name}\"")]
    Constructor { name: KString, #[source] source: anyhow::Error },
}

#[derive(Default)]
pub struct Registry {
    constructors: HashMap<KString, Constructor>,
    // Constructed or directly registered values
    entries: Mutex<HashMap<KString, Entry>>,
    // Held while running the constructor of the given name
    constructing: Mutex<HashMap<KString, Arc<Mutex<()>>>>,
}

impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries: Vec<KString> = match self.entries.lock() {
            Ok(m) => m.keys().cloned().collect(),
            Err(_) => vec![],
        };
        f.debug_struct("Registry")
            .field("constructors", &self.constructors.keys().collect::<Vec<_>>())
            .field("entries", &entries)
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chaining. Replaces a previous entry of the same name.
    pub fn register<T: Any + Send + Sync>(&mut self, name: &str, value: T) -> &mut Self {
        self.entries.get_mut().unwrap_or_else(|e| e.into_inner())
            .insert(KString::from_ref(name), Arc::new(value));
        self
    }

    /// Chaining. `constructor` is run on first `get`, the result is
    /// kept for later calls.
    pub fn register_constructor<T, F>(&mut self, name: &str, constructor: F) -> &mut Self
    where T: Any + Send + Sync,
          F: Fn(&Registry) -> anyhow::Result<T> + Send + Sync + 'static
    {
        self.constructors.insert(
            KString::from_ref(name),
            Box::new(move |r: &Registry| -> anyhow::Result<Entry> {
                Ok(Arc::new(constructor(r)?))
            }));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name) || self.lock_entries().contains_key(name)
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<KString, Entry>> {
        // Entries are only ever inserted whole, a poisoned lock can't
        // hold a partial update.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn existing_entry(&self, name: &str) -> Option<Entry> {
        self.lock_entries().get(name).cloned()
    }

    fn get_entry(&self, name: &str) -> Result<Entry, RegistryError> {
        if let Some(entry) = self.existing_entry(name) {
            return Ok(entry)
        }
        let constructor = self.constructors.get(name).ok_or_else(
            || RegistryError::Missing(KString::from_ref(name)))?;

        // Only the per-name lock is held while constructing, so that
        // constructors can `get` their own dependencies. Others asking
        // for the same name wait here.
        let slot = self.constructing.lock().unwrap_or_else(|e| e.into_inner())
            .entry(KString::from_ref(name))
            .or_default()
            .clone();
        let _constructing = slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = self.existing_entry(name) {
            return Ok(entry)
        }
        trace!("registry: constructing {name:?}");
        let entry = constructor(self).map_err(
            |source| RegistryError::Constructor { name: KString::from_ref(name), source })?;
        self.lock_entries().insert(KString::from_ref(name), entry.clone());
        Ok(entry)
    }

    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        let entry = self.get_entry(name)?;
        entry.downcast::<T>().map_err(
            |_| RegistryError::WrongType {
                name: KString::from_ref(name),
                expected: type_name::<T>()
            })
    }
}
