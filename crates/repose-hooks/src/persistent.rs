//! # Persistent state
//!
//! [`use_persistent_state`] keeps a value in a [`Storage`] under a key, so it
//! survives the component (and, with [`JsonFileStorage`], the process):
//!
//! ```rust
//! use repose_core::Composition;
//! use repose_hooks::persistent::*;
//!
//! let storage = MemoryStorage::new();
//! let options = PersistentStateOptions::new().storage(storage.clone());
//!
//! let comp = Composition::new();
//! let (volume, set_volume) =
//!     comp.compose(|| use_persistent_state(|| 5u8, "volume", options.clone()));
//! assert_eq!(volume, 5);
//!
//! set_volume.set(7);
//! assert_eq!(storage.get_item("volume").as_deref(), Some(r#"{"value":7}"#));
//! ```
//!
//! Values are encoded by a [`Serializer`]; the default wraps them in a
//! `{"value": ...}` JSON envelope so any serde type (including bare strings
//! and numbers) is stored as an object.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use repose_core::{Latest, MutableState, remember_latest, remember_mutable_state};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{HookError, Result};
use crate::settings::settings;

/// String key/value store, shaped like the web storage API.
pub trait Storage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// In-memory storage. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryStorage(Rc<RefCell<BTreeMap<String, String>>>);

thread_local! {
    static SHARED: MemoryStorage = MemoryStorage::new();
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The thread's default storage, used when no other is configured.
    pub fn shared() -> Self {
        SHARED.with(|s| s.clone())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.borrow().iter()).finish()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.0.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.0.borrow_mut().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.0.borrow_mut().remove(key);
        Ok(())
    }
}

/// Storage backed by one JSON object file, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    entries: RefCell<BTreeMap<String, String>>,
}

impl JsonFileStorage {
    /// Load `path`, or start empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str::<BTreeMap<String, String>>(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(HookError::Io { path, source }),
        };
        log::debug!("json storage: opened {} ({} entries)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RefCell::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&*self.entries.borrow())?;
        std::fs::write(&self.path, text).map_err(|source| HookError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl Storage for JsonFileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        self.save()
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        if self.entries.borrow_mut().remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

/// Turns values into stored strings and back.
pub trait Serializer<S> {
    fn stringify(&self, value: &S) -> Result<String>;
    fn parse(&self, raw: &str) -> Result<S>;
}

/// `{"value": ...}` JSON, the default.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEnvelope;

#[derive(Serialize)]
struct EnvelopeRef<'a, S> {
    value: &'a S,
}

#[derive(Deserialize)]
struct EnvelopeOwned<S> {
    value: S,
}

impl<S: Serialize + DeserializeOwned> Serializer<S> for JsonEnvelope {
    fn stringify(&self, value: &S) -> Result<String> {
        Ok(serde_json::to_string(&EnvelopeRef { value })?)
    }

    fn parse(&self, raw: &str) -> Result<S> {
        let envelope: EnvelopeOwned<S> = serde_json::from_str(raw)?;
        Ok(envelope.value)
    }
}

/// The value's own JSON, without an envelope.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainJson;

impl<S: Serialize + DeserializeOwned> Serializer<S> for PlainJson {
    fn stringify(&self, value: &S) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn parse(&self, raw: &str) -> Result<S> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Unset fields fall back to [`MemoryStorage::shared`], [`JsonEnvelope`] and
/// [`HookSettings::persistent_state`](crate::settings::HookSettings).
pub struct PersistentStateOptions<S> {
    pub storage: Option<Rc<dyn Storage>>,
    pub serializer: Option<Rc<dyn Serializer<S>>>,
    pub clear_on_parsing_error: Option<bool>,
}

impl<S> Default for PersistentStateOptions<S> {
    fn default() -> Self {
        Self {
            storage: None,
            serializer: None,
            clear_on_parsing_error: None,
        }
    }
}

impl<S> Clone for PersistentStateOptions<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            serializer: self.serializer.clone(),
            clear_on_parsing_error: self.clear_on_parsing_error,
        }
    }
}

impl<S> PersistentStateOptions<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Some(Rc::new(storage));
        self
    }

    pub fn serializer(mut self, serializer: impl Serializer<S> + 'static) -> Self {
        self.serializer = Some(Rc::new(serializer));
        self
    }

    pub fn clear_on_parsing_error(mut self, yes: bool) -> Self {
        self.clear_on_parsing_error = Some(yes);
        self
    }
}

struct Target<S> {
    key: String,
    storage: Rc<dyn Storage>,
    serializer: Rc<dyn Serializer<S>>,
}

fn load<S>(target: &Target<S>, clear_on_parsing_error: bool) -> Option<S> {
    let raw = target.storage.get_item(&target.key)?;
    match target.serializer.parse(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("persistent state '{}': stored value unreadable: {e}", target.key);
            if clear_on_parsing_error
                && let Err(e) = target.storage.remove_item(&target.key)
            {
                log::error!("persistent state '{}': could not clear entry: {e}", target.key);
            }
            None
        }
    }
}

/// Setter returned by [`use_persistent_state`]. Writes to storage first,
/// then updates the state; a failed write is logged and the in-memory value
/// still changes.
pub struct PersistentSetter<S: 'static> {
    state: MutableState<S>,
    target: Latest<Target<S>>,
}

impl<S> Clone for PersistentSetter<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            target: self.target.clone(),
        }
    }
}

impl<S: 'static> PersistentSetter<S> {
    pub fn set(&self, value: S) {
        self.target.with(|t| {
            let written = t
                .serializer
                .stringify(&value)
                .and_then(|raw| t.storage.set_item(&t.key, &raw));
            if let Err(e) = written {
                log::error!("persistent state '{}': write failed: {e}", t.key);
            }
        });
        self.state.set(value);
    }

    pub fn update(&self, f: impl FnOnce(&S) -> S) {
        let next = self.state.with(f);
        self.set(next);
    }
}

/// State mirrored into a [`Storage`] entry.
///
/// The stored entry is read on the first pass only; if it is missing or
/// unreadable `init` is used instead.
pub fn use_persistent_state<S>(
    init: impl FnOnce() -> S,
    key: &str,
    options: PersistentStateOptions<S>,
) -> (S, PersistentSetter<S>)
where
    S: Serialize + DeserializeOwned + Clone + 'static,
{
    let clear = options
        .clear_on_parsing_error
        .unwrap_or(settings().persistent_state.clear_on_parsing_error);
    let target = Target {
        key: key.to_owned(),
        storage: options
            .storage
            .unwrap_or_else(|| Rc::new(MemoryStorage::shared())),
        serializer: options
            .serializer
            .unwrap_or_else(|| Rc::new(JsonEnvelope)),
    };

    let state = remember_mutable_state(|| load(&target, clear).unwrap_or_else(init));
    let target = remember_latest(target);
    (state.get(), PersistentSetter { state, target })
}
