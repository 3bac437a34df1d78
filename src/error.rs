//! Error types for extension loading and formula forwarding

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single load, reload or forwarded call.
///
/// Every variant is local to the call that produced it; nothing here is
/// fatal to the host process.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// The module file does not exist at its configured location.
    #[error("extension module `{module}` is not installed (expected at {})", path.display())]
    NotInstalled { module: String, path: PathBuf },

    #[error("failed to read extension module `{module}` from {}", path.display())]
    Io {
        module: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The module source failed to compile or raised while being evaluated.
    #[error("extension module `{module}` failed to evaluate: {source}")]
    Script {
        module: String,
        #[source]
        source: mlua::Error,
    },

    #[error("extension module `{module}` is malformed: {reason}")]
    InvalidModule { module: String, reason: String },

    /// Strict loading rejected a module that leaves capability slots empty.
    #[error("extension module `{module}` does not provide: {}", slots.join(", "))]
    MissingSlots { module: String, slots: Vec<String> },

    #[error("`{symbol}` is not exported by extension module `{module}`")]
    MissingSymbol { module: String, symbol: String },

    /// The formula itself raised, or its result had the wrong shape.
    #[error("`{module}.{symbol}` failed: {source}")]
    Call {
        module: String,
        symbol: String,
        #[source]
        source: mlua::Error,
    },

    #[error("extension module `{module}` VM lock was poisoned")]
    Poisoned { module: String },
}

impl ExtensionError {
    /// Whether the requested formula is currently unavailable, as opposed to
    /// available but failing.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NotInstalled { .. } | Self::MissingSymbol { .. } | Self::MissingSlots { .. }
        )
    }

    /// Name of the module the error concerns
    #[must_use]
    pub fn module(&self) -> &str {
        match self {
            Self::NotInstalled { module, .. }
            | Self::Io { module, .. }
            | Self::Script { module, .. }
            | Self::InvalidModule { module, .. }
            | Self::MissingSlots { module, .. }
            | Self::MissingSymbol { module, .. }
            | Self::Call { module, .. }
            | Self::Poisoned { module } => module,
        }
    }
}

pub type Result<T, E = ExtensionError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        let missing = ExtensionError::MissingSymbol {
            module: "calculate".to_string(),
            symbol: "get_max_score".to_string(),
        };
        assert!(missing.is_unavailable());
        assert_eq!(missing.module(), "calculate");

        let failed = ExtensionError::Call {
            module: "damage".to_string(),
            symbol: "check_if_ph_3".to_string(),
            source: mlua::Error::RuntimeError("boom".to_string()),
        };
        assert!(!failed.is_unavailable());
    }

    #[test]
    fn test_missing_slots_message() {
        let err = ExtensionError::MissingSlots {
            module: "damage".to_string(),
            slots: vec!["check_if_ph_3".to_string(), "check_if_ph_5".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "extension module `damage` does not provide: check_if_ph_3, check_if_ph_5"
        );
    }
}
