//! Immutable extension registry published by a loader

use crate::error::{ExtensionError, Result};
use chrono::{DateTime, Utc};
use mlua::{
    Function, FromLuaMulti, IntoLuaMulti, Lua, LuaSerdeExt, MultiValue, RegistryKey,
    SerializeOptions, Value,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One loaded version of an extension module.
///
/// A snapshot is never mutated after construction. Reloading builds a new
/// one and the loader swaps it in, so a caller holding an `Arc<Snapshot>`
/// keeps resolving against the version it started with.
pub struct Snapshot {
    module: &'static str,
    generation: u64,
    source_path: PathBuf,
    loaded_at: DateTime<Utc>,
    symbols: BTreeMap<String, RegistryKey>,
    missing: Vec<&'static str>,
    lua: Mutex<Lua>,
}

impl Snapshot {
    pub(crate) fn new(
        module: &'static str,
        generation: u64,
        source_path: PathBuf,
        symbols: BTreeMap<String, RegistryKey>,
        missing: Vec<&'static str>,
        lua: Lua,
    ) -> Self {
        Self {
            module,
            generation,
            source_path,
            loaded_at: Utc::now(),
            symbols,
            missing,
            lua: Mutex::new(lua),
        }
    }

    #[must_use]
    pub fn module(&self) -> &'static str {
        self.module
    }

    /// Monotonic publish counter of the owning loader
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    #[must_use]
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Exported symbol names in sorted order
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.symbols.keys().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    /// Capability slots this version does not provide
    #[must_use]
    pub fn missing_slots(&self) -> &[&'static str] {
        &self.missing
    }

    /// Invoke an exported function with native arguments
    pub fn call<A, R>(&self, symbol: &str, args: A) -> Result<R>
    where
        A: for<'lua> IntoLuaMulti<'lua>,
        R: for<'lua> FromLuaMulti<'lua>,
    {
        self.with_function(symbol, |_, func| func.call::<A, R>(args))
    }

    /// Invoke an exported function with JSON arguments, returning every
    /// result value as JSON
    pub fn call_json(
        &self,
        symbol: &str,
        args: &[serde_json::Value],
    ) -> Result<Vec<serde_json::Value>> {
        self.with_function(symbol, |lua, func| {
            let values = args
                .iter()
                .map(|arg| to_lua(lua, arg))
                .collect::<mlua::Result<Vec<_>>>()?;
            let results: MultiValue = func.call(MultiValue::from_vec(values))?;
            results
                .into_vec()
                .into_iter()
                .map(|value| lua.from_value(value))
                .collect()
        })
    }

    /// Resolve `symbol` and run `f` with the VM locked
    ///
    /// Conversion errors raised inside `f` are reported as call failures of
    /// `symbol`.
    pub(crate) fn with_function<T, F>(&self, symbol: &str, f: F) -> Result<T>
    where
        F: for<'lua> FnOnce(&'lua Lua, Function<'lua>) -> mlua::Result<T>,
    {
        let key = self
            .symbols
            .get(symbol)
            .ok_or_else(|| ExtensionError::MissingSymbol {
                module: self.module.to_string(),
                symbol: symbol.to_string(),
            })?;

        let lua = self.lua.lock().map_err(|_| ExtensionError::Poisoned {
            module: self.module.to_string(),
        })?;

        let call_error = |source: mlua::Error| ExtensionError::Call {
            module: self.module.to_string(),
            symbol: symbol.to_string(),
            source,
        };

        let func: Function = lua.registry_value(key).map_err(call_error)?;
        let result = f(&*lua, func);
        result.map_err(call_error)
    }
}

/// Convert a host value into a Lua value.
///
/// `None` and JSON `null` become `nil`, never mlua's `NULL` sentinel, so
/// extension code can test arguments and table fields with `~= nil`.
pub(crate) fn to_lua<'lua, T>(lua: &'lua Lua, value: &T) -> mlua::Result<Value<'lua>>
where
    T: Serialize + ?Sized,
{
    let options = SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    lua.to_value_with(value, options)
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("module", &self.module)
            .field("generation", &self.generation)
            .field("source_path", &self.source_path)
            .field("loaded_at", &self.loaded_at)
            .field("symbols", &self.symbols.keys().collect::<Vec<_>>())
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}
