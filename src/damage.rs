//! Damage-tier predicates for phantom set bonuses

use crate::error::Result;
use crate::extension::{ExtensionLoader, ModuleSpec};
use std::sync::Arc;

pub const CHECK_IF_PH_3: &str = "check_if_ph_3";
pub const CHECK_IF_PH_5: &str = "check_if_ph_5";

/// Capability interface of the `damage` module
pub const DAMAGE_MODULE: ModuleSpec = ModuleSpec {
    name: "damage",
    slots: &[CHECK_IF_PH_3, CHECK_IF_PH_5],
};

pub trait DamageTiers {
    /// Whether `ph_num` pieces of set `ph_name` activate the 3-piece tier
    /// named `check_name`
    fn check_if_ph_3(&self, ph_name: &str, ph_num: u32, check_name: &str) -> Result<bool>;

    /// Same as [`DamageTiers::check_if_ph_3`] for the 5-piece tier
    fn check_if_ph_5(&self, ph_name: &str, ph_num: u32, check_name: &str) -> Result<bool>;
}

/// Forwards [`DamageTiers`] to the `damage` extension module
#[derive(Debug, Clone)]
pub struct DamageClassifier {
    loader: Arc<ExtensionLoader>,
}

impl DamageClassifier {
    #[must_use]
    pub fn new(loader: Arc<ExtensionLoader>) -> Self {
        Self { loader }
    }
}

impl DamageTiers for DamageClassifier {
    fn check_if_ph_3(&self, ph_name: &str, ph_num: u32, check_name: &str) -> Result<bool> {
        self.loader.call(CHECK_IF_PH_3, (ph_name, ph_num, check_name))
    }

    fn check_if_ph_5(&self, ph_name: &str, ph_num: u32, check_name: &str) -> Result<bool> {
        self.loader.call(CHECK_IF_PH_5, (ph_name, ph_num, check_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::LoadOptions;
    use tempfile::tempdir;

    fn classifier(source: &str) -> (tempfile::TempDir, DamageClassifier) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("damage.lua");
        std::fs::write(&path, source).unwrap();
        let loader = ExtensionLoader::new(DAMAGE_MODULE, path, LoadOptions::default());
        (dir, DamageClassifier::new(Arc::new(loader)))
    }

    #[test]
    fn test_predicates_forward() {
        let (_dir, damage) = classifier(
            r#"
            local M = {}
            function M.check_if_ph_3(name, num, check) return name == check and num >= 3 end
            function M.check_if_ph_5(name, num, check) return name == check and num >= 5 end
            return M
            "#,
        );
        assert!(damage.check_if_ph_3("沉日劫明", 3, "沉日劫明").unwrap());
        assert!(!damage.check_if_ph_5("沉日劫明", 3, "沉日劫明").unwrap());
        assert!(!damage.check_if_ph_3("轻云出月", 5, "沉日劫明").unwrap());
    }

    #[test]
    fn test_missing_predicate_fails_independently() {
        let (_dir, damage) =
            classifier("return { check_if_ph_3 = function() return true end }");
        assert!(damage.check_if_ph_3("a", 3, "a").unwrap());
        let err = damage.check_if_ph_5("a", 5, "a").unwrap_err();
        assert!(err.is_unavailable());
    }
}
