//! Optional extension loading
//!
//! Formula extensions are Lua modules distributed separately from the host.
//! A module returns a table of functions; the loader binds them into an
//! immutable [`Snapshot`] and publishes it atomically.
//!
//! - Missing modules are a supported state: forwarded calls fail with
//!   [`ExtensionError::NotInstalled`](crate::ExtensionError::NotInstalled)
//!   and reloads degrade to a logged no-op.
//! - An `_EXPORTS` array in the module table restricts what is bound.
//!   Without one, every function whose name does not start with `_` is bound.
//! - New functions added to a module become callable after a reload with no
//!   host changes.

pub mod loader;
pub mod module;
pub mod sandbox;
pub mod snapshot;

pub use loader::{ExtensionLoader, LoaderState, ReloadOutcome};
pub use module::{LoadOptions, ModuleSpec};
pub use snapshot::Snapshot;
