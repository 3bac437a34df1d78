//! Lua VM construction for extension modules
//!
//! Every load gets a brand-new VM, so nothing a previous version of a module
//! left in globals survives a reload.

use mlua::Lua;
use tracing::debug;

/// Globals removed before any extension code runs
pub const DISABLED_GLOBALS: &[&str] = &[
    "os.execute",
    "os.exit",
    "io.popen",
    "loadfile",
    "dofile",
    "package.loadlib",
];

/// Create a fresh VM for one extension load
///
/// With `sandboxed` set, process-control and file-loading entry points are
/// disabled.
pub fn new_vm(sandboxed: bool) -> mlua::Result<Lua> {
    let lua = Lua::new();

    if sandboxed {
        lua.load(
            r#"
            os.execute = nil
            os.exit = nil
            io.popen = nil
            loadfile = nil
            dofile = nil
            if package ~= nil then
                package.loadlib = nil
            end
        "#,
        )
        .set_name("=sandbox")
        .exec()?;
        debug!("Sandboxed extension VM ({} globals disabled)", DISABLED_GLOBALS.len());
    }

    Ok(lua)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_creation() {
        assert!(new_vm(true).is_ok());
        assert!(new_vm(false).is_ok());
    }

    #[test]
    fn test_dangerous_functions_disabled() {
        let lua = new_vm(true).unwrap();
        // os.execute is nil, so calling it raises
        let result = lua.load("os.execute('ls')").exec();
        assert!(result.is_err());
        let result = lua.load("return dofile('/etc/passwd')").exec();
        assert!(result.is_err());
    }

    #[test]
    fn test_unsandboxed_keeps_os_execute() {
        let lua = new_vm(false).unwrap();
        let present: bool = lua.load("return os.execute ~= nil").eval().unwrap();
        assert!(present);
    }

    #[test]
    fn test_string_library_available() {
        let lua = new_vm(true).unwrap();
        let upper: String = lua.load("return string.upper('waves')").eval().unwrap();
        assert_eq!(upper, "WAVES");
    }
}
