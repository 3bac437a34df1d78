use super::module::{self, LoadOptions, ModuleSpec};
use super::snapshot::Snapshot;
use crate::error::{ExtensionError, Result};
use arc_swap::ArcSwapOption;
use mlua::{FromLuaMulti, Function, IntoLuaMulti, Lua};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Observable lifecycle of a loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Uninitialized,
    Loaded { generation: u64 },
}

/// Result of an explicit reload request
#[derive(Debug)]
pub enum ReloadOutcome {
    /// A new snapshot was published
    Reloaded {
        generation: u64,
        symbols: usize,
        missing: Vec<&'static str>,
    },
    /// The import failed and the previously published snapshot (if any) is
    /// still active
    Kept { error: ExtensionError },
}

impl ReloadOutcome {
    #[must_use]
    pub fn is_reloaded(&self) -> bool {
        matches!(self, Self::Reloaded { .. })
    }
}

/// Loader for one optional extension module.
///
/// Readers resolve symbols against the currently published [`Snapshot`]
/// without taking any lock. Writers load and validate a complete replacement
/// first and then publish it with a single pointer swap, so a forwarded call
/// observes either the old registry or the new one, never a mix.
pub struct ExtensionLoader {
    spec: ModuleSpec,
    path: PathBuf,
    options: LoadOptions,
    active: ArcSwapOption<Snapshot>,
    generation: AtomicU64,
    reload_lock: Mutex<()>,
}

impl ExtensionLoader {
    /// Create a loader in the uninitialized state. Nothing is read until the
    /// first forwarded call or reload.
    #[must_use]
    pub fn new(spec: ModuleSpec, path: impl Into<PathBuf>, options: LoadOptions) -> Self {
        Self {
            spec,
            path: path.into(),
            options,
            active: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            reload_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn state(&self) -> LoaderState {
        match self.active.load_full() {
            Some(snapshot) => LoaderState::Loaded {
                generation: snapshot.generation(),
            },
            None => LoaderState::Uninitialized,
        }
    }

    /// Currently published snapshot, without attempting an import
    #[must_use]
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.active.load_full()
    }

    /// Names in the published registry; empty while uninitialized
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.current()
            .map(|snapshot| snapshot.symbols())
            .unwrap_or_default()
    }

    /// Published snapshot, importing the module first if nothing has been
    /// published yet
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        if let Some(snapshot) = self.active.load_full() {
            return Ok(snapshot);
        }

        let _guard = self.lock_writers()?;
        // Another caller may have finished the import while we waited
        if let Some(snapshot) = self.active.load_full() {
            return Ok(snapshot);
        }
        self.publish_locked()
    }

    /// Forward a call to `symbol` in the extension module
    pub fn call<A, R>(&self, symbol: &str, args: A) -> Result<R>
    where
        A: for<'lua> IntoLuaMulti<'lua>,
        R: for<'lua> FromLuaMulti<'lua>,
    {
        self.snapshot()?.call(symbol, args)
    }

    /// Forward a call with JSON-encoded arguments and results
    pub fn call_json(
        &self,
        symbol: &str,
        args: &[serde_json::Value],
    ) -> Result<Vec<serde_json::Value>> {
        self.snapshot()?.call_json(symbol, args)
    }

    pub(crate) fn with_function<T, F>(&self, symbol: &str, f: F) -> Result<T>
    where
        F: for<'lua> FnOnce(&'lua Lua, Function<'lua>) -> mlua::Result<T>,
    {
        self.snapshot()?.with_function(symbol, f)
    }

    /// Re-import the module and publish it, returning the error instead of
    /// logging it
    pub fn try_reload(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.lock_writers()?;
        self.publish_locked()
    }

    /// Re-import the module from source in a fresh VM.
    ///
    /// On failure the previously published registry stays active and a
    /// warning is logged.
    pub fn reload(&self) -> ReloadOutcome {
        match self.try_reload() {
            Ok(snapshot) => {
                info!(
                    "Extension module {} reloaded (generation {}, {} symbols)",
                    self.spec.name,
                    snapshot.generation(),
                    snapshot.symbols().len()
                );
                ReloadOutcome::Reloaded {
                    generation: snapshot.generation(),
                    symbols: snapshot.symbols().len(),
                    missing: snapshot.missing_slots().to_vec(),
                }
            }
            Err(error) => {
                match self.state() {
                    LoaderState::Loaded { generation } => warn!(
                        "Failed to import extension module {}: {}; keeping generation {}",
                        self.spec.name, error, generation
                    ),
                    LoaderState::Uninitialized => warn!(
                        "Failed to import extension module {}: {}; no reload possible",
                        self.spec.name, error
                    ),
                }
                ReloadOutcome::Kept { error }
            }
        }
    }

    fn lock_writers(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.reload_lock.lock().map_err(|_| ExtensionError::Poisoned {
            module: self.spec.name.to_string(),
        })
    }

    // Caller must hold `reload_lock`
    fn publish_locked(&self) -> Result<Arc<Snapshot>> {
        let next = self.generation.load(Ordering::Acquire) + 1;
        let snapshot = Arc::new(module::load(&self.spec, &self.path, self.options, next)?);
        self.generation.store(next, Ordering::Release);
        self.active.store(Some(Arc::clone(&snapshot)));
        Ok(snapshot)
    }
}

impl std::fmt::Debug for ExtensionLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionLoader")
            .field("module", &self.spec.name)
            .field("path", &self.path)
            .field("options", &self.options)
            .field("state", &self.state())
            .finish()
    }
}
