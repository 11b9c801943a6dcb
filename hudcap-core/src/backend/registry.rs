//! Backend registry
//!
//! Maps backend display names to numeric IDs. The table is probed once,
//! off the async runtime, and published atomically; until that finishes
//! callers see an empty list.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{BackendId, CaptureBackend, DEFAULT_BACKEND};

/// Prefix some platform APIs put on backend names
const RAW_NAME_PREFIX: &str = "video-capture-";

/// Fallback display name for the default backend
const DEFAULT_BACKEND_NAME: &str = "Any";

#[derive(Debug, Default)]
struct BackendTable {
    /// Display names, default first, rest alphabetical
    names: Vec<String>,
    /// Display name -> ID
    ids: HashMap<String, BackendId>,
}

/// Lookup table of available capture backends
#[derive(Clone, Default)]
pub struct BackendRegistry {
    table: Arc<ArcSwap<BackendTable>>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `backend` synchronously and return a filled registry
    pub fn probe(backend: &dyn CaptureBackend, probe_limit: BackendId) -> Self {
        let registry = Self::new();
        registry.rebuild(backend, probe_limit);
        registry
    }

    /// Start probing `backend` on the blocking pool
    ///
    /// The registry is returned immediately and fills in when the task ends.
    pub fn spawn(
        backend: Arc<dyn CaptureBackend>,
        probe_limit: BackendId,
    ) -> (Self, JoinHandle<()>) {
        let registry = Self::new();
        let target = registry.clone();
        let handle = tokio::task::spawn_blocking(move || {
            target.rebuild(backend.as_ref(), probe_limit);
        });
        (registry, handle)
    }

    fn rebuild(&self, backend: &dyn CaptureBackend, probe_limit: BackendId) {
        let mut ids = HashMap::new();
        let mut names = Vec::new();

        for id in (DEFAULT_BACKEND + 1)..probe_limit {
            let Some(raw) = backend.backend_name(id) else {
                continue;
            };
            let name = display_name(&raw);
            if name.is_empty() || ids.contains_key(&name) {
                continue;
            }
            debug!("Backend {} = \"{}\"", id, name);
            ids.insert(name.clone(), id);
            names.push(name);
        }
        names.sort();

        let default_name = backend
            .backend_name(DEFAULT_BACKEND)
            .map(|raw| display_name(&raw))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_NAME.to_string());
        names.retain(|n| n != &default_name);
        names.insert(0, default_name.clone());
        ids.insert(default_name, DEFAULT_BACKEND);

        info!("Registered {} capture backends", names.len());
        self.table.store(Arc::new(BackendTable { names, ids }));
    }

    /// Backend names, default first
    pub fn backends(&self) -> Vec<String> {
        self.table.load().names.clone()
    }

    /// ID for a backend name
    ///
    /// An empty name selects the default backend; unknown names return None.
    pub fn backend_id(&self, name: &str) -> Option<BackendId> {
        if name.is_empty() {
            return Some(DEFAULT_BACKEND);
        }
        self.table.load().ids.get(name).copied()
    }

    /// Display name for an ID, empty if the ID is not registered
    pub fn backend_name(&self, id: BackendId) -> String {
        self.table
            .load()
            .ids
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    }

    /// Whether the probe has completed
    pub fn is_ready(&self) -> bool {
        !self.table.load().names.is_empty()
    }
}

/// Turn a raw backend name into its display form
///
/// `video-capture-v4l2` becomes `V4l2`, `dshow` becomes `Dshow`.
pub fn display_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix(RAW_NAME_PREFIX).unwrap_or(trimmed);

    let mut out = String::with_capacity(stripped.len());
    let mut at_word_start = true;
    for c in stripped.chars() {
        if at_word_start && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CaptureDevice;
    use crate::error::{CaptureError, Result};

    struct NamedBackends;

    impl CaptureBackend for NamedBackends {
        fn backend_name(&self, id: BackendId) -> Option<String> {
            match id {
                0 => Some("video-capture-any".into()),
                200 => Some("video-capture-v4l2".into()),
                700 => Some("video-capture-dshow".into()),
                1400 => Some("video-capture-msmf".into()),
                _ => None,
            }
        }

        fn open(&self, _index: u32, _backend: BackendId) -> Result<Box<dyn CaptureDevice>> {
            Err(CaptureError::device("not a real backend"))
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("video-capture-v4l2"), "V4l2");
        assert_eq!(display_name("video-capture-any"), "Any");
        assert_eq!(display_name("media foundation"), "Media Foundation");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_default_backend_is_first() {
        let registry = BackendRegistry::probe(&NamedBackends, 5000);
        assert_eq!(registry.backends(), vec!["Any", "Dshow", "Msmf", "V4l2"]);
    }

    #[test]
    fn test_lookup_by_name_and_id() {
        let registry = BackendRegistry::probe(&NamedBackends, 5000);
        assert_eq!(registry.backend_id(""), Some(DEFAULT_BACKEND));
        assert_eq!(registry.backend_id("Any"), Some(DEFAULT_BACKEND));
        assert_eq!(registry.backend_id("Msmf"), Some(1400));
        assert_eq!(registry.backend_id("Nope"), None);
        assert_eq!(registry.backend_name(200), "V4l2");
        assert_eq!(registry.backend_name(0), "Any");
    }

    #[test]
    fn test_unknown_id_fails_closed() {
        let registry = BackendRegistry::probe(&NamedBackends, 5000);
        assert_eq!(registry.backend_name(4242), "");
    }

    #[test]
    fn test_probe_limit_is_exclusive() {
        let registry = BackendRegistry::probe(&NamedBackends, 1400);
        assert_eq!(registry.backends(), vec!["Any", "Dshow", "V4l2"]);
    }

    #[test]
    fn test_empty_before_build() {
        let registry = BackendRegistry::new();
        assert!(registry.backends().is_empty());
        assert!(!registry.is_ready());
        assert_eq!(registry.backend_id(""), Some(DEFAULT_BACKEND));
        assert_eq!(registry.backend_name(DEFAULT_BACKEND), "");
    }
}
