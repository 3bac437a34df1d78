//! Scoring formulas for phantom (echo) builds
//!
//! The formulas themselves live in the separately distributed `calculate`
//! extension module. [`Calculator`] forwards each [`ScoringFormulas`] slot
//! to the module that is currently published.

use crate::error::Result;
use crate::extension::snapshot::to_lua;
use crate::extension::{ExtensionLoader, ModuleSpec};
use mlua::{Lua, LuaSerdeExt, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const CALC_PHANTOM_ENTRY: &str = "calc_phantom_entry";
pub const CALC_PHANTOM_SCORE: &str = "calc_phantom_score";
pub const GET_CALC_MAP: &str = "get_calc_map";
pub const GET_MAX_SCORE: &str = "get_max_score";
pub const GET_TOTAL_SCORE_BG: &str = "get_total_score_bg";
pub const GET_VALID_COLOR: &str = "get_valid_color";

/// Capability interface of the `calculate` module
pub const CALCULATE_MODULE: ModuleSpec = ModuleSpec {
    name: "calculate",
    slots: &[
        CALC_PHANTOM_ENTRY,
        CALC_PHANTOM_SCORE,
        GET_CALC_MAP,
        GET_MAX_SCORE,
        GET_TOTAL_SCORE_BG,
        GET_VALID_COLOR,
    ],
};

/// Name to info table; also the shape of a scoring template
pub type CalcMap = serde_json::Map<String, serde_json::Value>;

/// One stat line on an equipped phantom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhantomProp {
    pub attribute_name: String,
    pub attribute_value: String,
}

impl PhantomProp {
    pub fn new(attribute_name: impl Into<String>, attribute_value: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            attribute_value: attribute_value.into(),
        }
    }
}

/// Value passed to [`ScoringFormulas::get_valid_color`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Number(f64),
    Text(String),
}

impl From<f64> for ScoreValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ScoreValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// The six scoring formulas a `calculate` extension provides
pub trait ScoringFormulas {
    /// Score a single stat line, returning `(score, flag)`
    fn calc_phantom_entry(
        &self,
        index: usize,
        prop: &PhantomProp,
        cost: u32,
        calc_temp: Option<&CalcMap>,
        attribute_name: &str,
    ) -> Result<(f64, f64)>;

    /// Score a full phantom, returning `(score, rank_label)`
    fn calc_phantom_score(
        &self,
        role_id: &str,
        props: &[PhantomProp],
        cost: u32,
        calc_temp: Option<&CalcMap>,
    ) -> Result<(f64, String)>;

    fn get_calc_map(
        &self,
        phantom_card: &serde_json::Value,
        role_name: &str,
        role_id: &str,
    ) -> Result<CalcMap>;

    /// Highest achievable score for a cost tier plus the reference data it
    /// was derived from
    fn get_max_score(&self, cost: u32, calc_temp: Option<&CalcMap>)
        -> Result<(f64, serde_json::Value)>;

    fn get_total_score_bg(
        &self,
        char_name: &str,
        score: f64,
        calc_temp: Option<&CalcMap>,
    ) -> Result<String>;

    /// Text colors for a value, as `(name_color, value_color)`
    fn get_valid_color(
        &self,
        name: &str,
        value: &ScoreValue,
        calc_temp: Option<&CalcMap>,
    ) -> Result<(String, String)>;
}

/// Forwards [`ScoringFormulas`] to the `calculate` extension module
#[derive(Debug, Clone)]
pub struct Calculator {
    loader: Arc<ExtensionLoader>,
}

impl Calculator {
    #[must_use]
    pub fn new(loader: Arc<ExtensionLoader>) -> Self {
        Self { loader }
    }

    #[must_use]
    pub fn loader(&self) -> &Arc<ExtensionLoader> {
        &self.loader
    }
}

fn optional_table<'lua>(lua: &'lua Lua, calc_temp: Option<&CalcMap>) -> mlua::Result<Value<'lua>> {
    match calc_temp {
        Some(table) => to_lua(lua, table),
        None => Ok(Value::Nil),
    }
}

impl ScoringFormulas for Calculator {
    fn calc_phantom_entry(
        &self,
        index: usize,
        prop: &PhantomProp,
        cost: u32,
        calc_temp: Option<&CalcMap>,
        attribute_name: &str,
    ) -> Result<(f64, f64)> {
        self.loader.with_function(CALC_PHANTOM_ENTRY, |lua, func| {
            let prop = to_lua(lua, prop)?;
            let calc_temp = optional_table(lua, calc_temp)?;
            func.call((index, prop, cost, calc_temp, attribute_name))
        })
    }

    fn calc_phantom_score(
        &self,
        role_id: &str,
        props: &[PhantomProp],
        cost: u32,
        calc_temp: Option<&CalcMap>,
    ) -> Result<(f64, String)> {
        self.loader.with_function(CALC_PHANTOM_SCORE, |lua, func| {
            let props = to_lua(lua, props)?;
            let calc_temp = optional_table(lua, calc_temp)?;
            func.call((role_id, props, cost, calc_temp))
        })
    }

    fn get_calc_map(
        &self,
        phantom_card: &serde_json::Value,
        role_name: &str,
        role_id: &str,
    ) -> Result<CalcMap> {
        self.loader.with_function(GET_CALC_MAP, |lua, func| {
            let card = to_lua(lua, phantom_card)?;
            let map: Value = func.call((card, role_name, role_id))?;
            lua.from_value(map)
        })
    }

    fn get_max_score(
        &self,
        cost: u32,
        calc_temp: Option<&CalcMap>,
    ) -> Result<(f64, serde_json::Value)> {
        self.loader.with_function(GET_MAX_SCORE, |lua, func| {
            let calc_temp = optional_table(lua, calc_temp)?;
            let (max_score, reference): (f64, Value) = func.call((cost, calc_temp))?;
            Ok((max_score, lua.from_value(reference)?))
        })
    }

    fn get_total_score_bg(
        &self,
        char_name: &str,
        score: f64,
        calc_temp: Option<&CalcMap>,
    ) -> Result<String> {
        self.loader.with_function(GET_TOTAL_SCORE_BG, |lua, func| {
            let calc_temp = optional_table(lua, calc_temp)?;
            func.call((char_name, score, calc_temp))
        })
    }

    fn get_valid_color(
        &self,
        name: &str,
        value: &ScoreValue,
        calc_temp: Option<&CalcMap>,
    ) -> Result<(String, String)> {
        self.loader.with_function(GET_VALID_COLOR, |lua, func| {
            let value = match value {
                ScoreValue::Number(number) => Value::Number(*number),
                ScoreValue::Text(text) => Value::String(lua.create_string(text)?),
            };
            let calc_temp = optional_table(lua, calc_temp)?;
            func.call((name, value, calc_temp))
        })
    }
}

/// A stat line with the colors the extension picked for it
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLine {
    pub prop: PhantomProp,
    pub name_color: String,
    pub value_color: String,
}

/// Everything a build panel shows for one phantom
#[derive(Debug, Clone, PartialEq)]
pub struct BuildScore {
    pub score: f64,
    pub rank: String,
    pub badge: String,
    pub lines: Vec<ScoredLine>,
}

/// Score a phantom and pick its badge and per-line colors.
///
/// The first failing formula aborts the whole build score; there is no
/// fabricated fallback.
pub fn score_build(
    formulas: &dyn ScoringFormulas,
    char_name: &str,
    role_id: &str,
    props: &[PhantomProp],
    cost: u32,
    calc_temp: Option<&CalcMap>,
) -> Result<BuildScore> {
    let (score, rank) = formulas.calc_phantom_score(role_id, props, cost, calc_temp)?;
    let badge = formulas.get_total_score_bg(char_name, score, calc_temp)?;

    let lines = props
        .iter()
        .map(|prop| {
            let value = ScoreValue::Text(prop.attribute_value.clone());
            let (name_color, value_color) =
                formulas.get_valid_color(&prop.attribute_name, &value, calc_temp)?;
            Ok(ScoredLine {
                prop: prop.clone(),
                name_color,
                value_color,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BuildScore {
        score,
        rank,
        badge,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtensionError;

    /// In-process formulas used to exercise `score_build` without Lua
    struct FixedFormulas {
        fail_colors: bool,
    }

    impl ScoringFormulas for FixedFormulas {
        fn calc_phantom_entry(
            &self,
            _index: usize,
            _prop: &PhantomProp,
            _cost: u32,
            _calc_temp: Option<&CalcMap>,
            _attribute_name: &str,
        ) -> Result<(f64, f64)> {
            Ok((1.0, 0.0))
        }

        fn calc_phantom_score(
            &self,
            _role_id: &str,
            props: &[PhantomProp],
            cost: u32,
            _calc_temp: Option<&CalcMap>,
        ) -> Result<(f64, String)> {
            Ok((props.len() as f64 * f64::from(cost), "S".to_string()))
        }

        fn get_calc_map(
            &self,
            _phantom_card: &serde_json::Value,
            _role_name: &str,
            _role_id: &str,
        ) -> Result<CalcMap> {
            Ok(CalcMap::new())
        }

        fn get_max_score(
            &self,
            cost: u32,
            _calc_temp: Option<&CalcMap>,
        ) -> Result<(f64, serde_json::Value)> {
            Ok((f64::from(cost) * 10.0, serde_json::Value::Null))
        }

        fn get_total_score_bg(
            &self,
            _char_name: &str,
            score: f64,
            _calc_temp: Option<&CalcMap>,
        ) -> Result<String> {
            Ok(if score >= 10.0 { "gold" } else { "grey" }.to_string())
        }

        fn get_valid_color(
            &self,
            name: &str,
            _value: &ScoreValue,
            _calc_temp: Option<&CalcMap>,
        ) -> Result<(String, String)> {
            if self.fail_colors {
                return Err(ExtensionError::MissingSymbol {
                    module: "calculate".to_string(),
                    symbol: GET_VALID_COLOR.to_string(),
                });
            }
            let color = if name.contains("暴击") { "#FFD700" } else { "#FFFFFF" };
            Ok((color.to_string(), color.to_string()))
        }
    }

    #[test]
    fn test_score_build_combines_slots() {
        let props = vec![
            PhantomProp::new("暴击", "10.5%"),
            PhantomProp::new("攻击", "30"),
        ];
        let build = score_build(
            &FixedFormulas { fail_colors: false },
            "今汐",
            "1304",
            &props,
            4,
            None,
        )
        .unwrap();

        assert_eq!(build.score, 8.0);
        assert_eq!(build.rank, "S");
        assert_eq!(build.badge, "grey");
        assert_eq!(build.lines.len(), 2);
        assert_eq!(build.lines[0].name_color, "#FFD700");
        assert_eq!(build.lines[1].name_color, "#FFFFFF");
    }

    #[test]
    fn test_score_build_propagates_missing_formula() {
        let props = vec![PhantomProp::new("攻击", "30")];
        let err = score_build(
            &FixedFormulas { fail_colors: true },
            "今汐",
            "1304",
            &props,
            3,
            None,
        )
        .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_score_value_deserializes_untagged() {
        let number: ScoreValue = serde_json::from_str("12.5").unwrap();
        let text: ScoreValue = serde_json::from_str("\"12.5%\"").unwrap();
        assert_eq!(number, ScoreValue::Number(12.5));
        assert_eq!(text, ScoreValue::Text("12.5%".to_string()));
    }

    #[test]
    fn test_prop_uses_api_field_names() {
        let prop: PhantomProp =
            serde_json::from_str(r#"{"attributeName":"暴击","attributeValue":"8.1%"}"#).unwrap();
        assert_eq!(prop, PhantomProp::new("暴击", "8.1%"));
    }
}
