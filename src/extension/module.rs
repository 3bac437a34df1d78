//! Evaluating an extension source file into a [`Snapshot`]

use super::sandbox;
use super::snapshot::Snapshot;
use crate::error::{ExtensionError, Result};
use mlua::{Lua, RegistryKey, Table, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Table key holding an explicit export list
pub const EXPORTS_KEY: &str = "_EXPORTS";

/// Names starting with this prefix are module-private
pub const PRIVATE_PREFIX: char = '_';

/// Fixed capability interface of one extension module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleSpec {
    pub name: &'static str,
    /// Formula slots the host forwards to
    pub slots: &'static [&'static str],
}

/// How a module is evaluated and validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Reject modules that leave any capability slot empty
    pub strict: bool,
    pub sandboxed: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict: false,
            sandboxed: true,
        }
    }
}

/// Read, evaluate and bind one module version
pub(crate) fn load(
    spec: &ModuleSpec,
    path: &Path,
    options: LoadOptions,
    generation: u64,
) -> Result<Snapshot> {
    let source = fs::read_to_string(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ExtensionError::NotInstalled {
                module: spec.name.to_string(),
                path: path.to_path_buf(),
            }
        } else {
            ExtensionError::Io {
                module: spec.name.to_string(),
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let script_error = |source: mlua::Error| ExtensionError::Script {
        module: spec.name.to_string(),
        source,
    };

    let lua = sandbox::new_vm(options.sandboxed).map_err(script_error)?;
    let symbols = bind_exports(spec, &lua, &source, path)?;

    let missing: Vec<&'static str> = spec
        .slots
        .iter()
        .copied()
        .filter(|slot| !symbols.contains_key(*slot))
        .collect();

    if !missing.is_empty() {
        if options.strict {
            return Err(ExtensionError::MissingSlots {
                module: spec.name.to_string(),
                slots: missing.iter().map(ToString::to_string).collect(),
            });
        }
        warn!(
            "Extension module {} provides {} of {} formulas, missing: {}",
            spec.name,
            spec.slots.len() - missing.len(),
            spec.slots.len(),
            missing.join(", ")
        );
    }

    Ok(Snapshot::new(
        spec.name,
        generation,
        path.to_path_buf(),
        symbols,
        missing,
        lua,
    ))
}

/// Evaluate the chunk and pin every selected export in the VM registry
fn bind_exports(
    spec: &ModuleSpec,
    lua: &Lua,
    source: &str,
    path: &Path,
) -> Result<BTreeMap<String, RegistryKey>> {
    let invalid = |reason: String| ExtensionError::InvalidModule {
        module: spec.name.to_string(),
        reason,
    };
    let script_error = |source: mlua::Error| ExtensionError::Script {
        module: spec.name.to_string(),
        source,
    };

    let returned: Value = lua
        .load(source)
        .set_name(format!("@{}", path.display()))
        .eval()
        .map_err(script_error)?;

    let namespace = match returned {
        Value::Table(table) => table,
        other => {
            return Err(invalid(format!(
                "module must return a table, got {}",
                other.type_name()
            )))
        }
    };

    let explicit: Option<Table> = namespace.get(EXPORTS_KEY).map_err(|_| {
        invalid(format!("`{EXPORTS_KEY}` must be an array of names"))
    })?;

    let mut symbols = BTreeMap::new();

    if let Some(exports) = explicit {
        for name in exports.sequence_values::<String>() {
            let name = name.map_err(|_| invalid(format!("`{EXPORTS_KEY}` entries must be strings")))?;
            let value: Value = namespace.get(name.as_str()).map_err(script_error)?;
            let func = match value {
                Value::Function(func) => func,
                other => {
                    return Err(invalid(format!(
                        "`{name}` is listed in `{EXPORTS_KEY}` but is {}",
                        other.type_name()
                    )))
                }
            };
            let key = lua.create_registry_value(func).map_err(script_error)?;
            symbols.insert(name, key);
        }
    } else {
        for pair in namespace.pairs::<Value, Value>() {
            let (name, value) = pair.map_err(script_error)?;
            let Value::String(name) = name else {
                continue;
            };
            let Ok(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(PRIVATE_PREFIX) {
                continue;
            }
            let Value::Function(func) = value else {
                debug!("Skipping non-function export {}.{}", spec.name, name);
                continue;
            };
            let key = lua.create_registry_value(func).map_err(script_error)?;
            symbols.insert(name.to_string(), key);
        }
    }

    debug!(
        "Bound {} symbols from extension module {}",
        symbols.len(),
        spec.name
    );
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SPEC: ModuleSpec = ModuleSpec {
        name: "test",
        slots: &["alpha", "beta"],
    };

    fn write_module(source: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.lua");
        std::fs::write(&path, source).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_file_is_not_installed() {
        let dir = tempdir().unwrap();
        let err = load(&SPEC, &dir.path().join("absent.lua"), LoadOptions::default(), 1)
            .unwrap_err();
        assert!(matches!(err, ExtensionError::NotInstalled { .. }));
    }

    #[test]
    fn test_public_functions_are_bound() {
        let (_dir, path) = write_module(
            r#"
            local M = {}
            function M.alpha(x) return x + 1 end
            function M.beta(x) return x - 1 end
            function M._private(x) return x end
            M.VERSION = "1.0"
            return M
            "#,
        );
        let snapshot = load(&SPEC, &path, LoadOptions::default(), 1).unwrap();
        assert_eq!(snapshot.symbols(), vec!["alpha", "beta"]);
        assert!(snapshot.missing_slots().is_empty());
    }

    #[test]
    fn test_export_list_restricts_symbols() {
        let (_dir, path) = write_module(
            r#"
            local M = { _EXPORTS = { "alpha" } }
            function M.alpha(x) return x end
            function M.helper(x) return x end
            return M
            "#,
        );
        let snapshot = load(&SPEC, &path, LoadOptions::default(), 1).unwrap();
        assert_eq!(snapshot.symbols(), vec!["alpha"]);
        assert_eq!(snapshot.missing_slots(), &["beta"]);
        assert!(snapshot.contains("alpha"));
        assert!(!snapshot.contains("helper"));
        assert_eq!(snapshot.source_path(), path.as_path());
    }

    #[test]
    fn test_export_list_naming_absent_function_is_invalid() {
        let (_dir, path) = write_module(r#"return { _EXPORTS = { "ghost" } }"#);
        let err = load(&SPEC, &path, LoadOptions::default(), 1).unwrap_err();
        assert!(matches!(err, ExtensionError::InvalidModule { .. }));
    }

    #[test]
    fn test_strict_rejects_partial_module() {
        let (_dir, path) = write_module("return { alpha = function() return 1 end }");
        let options = LoadOptions {
            strict: true,
            sandboxed: true,
        };
        match load(&SPEC, &path, options, 1).unwrap_err() {
            ExtensionError::MissingSlots { slots, .. } => assert_eq!(slots, vec!["beta"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_table_module_is_invalid() {
        let (_dir, path) = write_module("return 42");
        let err = load(&SPEC, &path, LoadOptions::default(), 1).unwrap_err();
        assert!(matches!(err, ExtensionError::InvalidModule { .. }));
    }

    #[test]
    fn test_syntax_error_is_script_error() {
        let (_dir, path) = write_module("this is not lua!!!");
        let err = load(&SPEC, &path, LoadOptions::default(), 1).unwrap_err();
        assert!(matches!(err, ExtensionError::Script { .. }));
    }
}
