//! Game API payloads consumed by the stamina card

use serde::{Deserialize, Deserializer, Serialize};

/// Daily note for one bound account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyData {
    #[serde(deserialize_with = "string_or_number")]
    pub role_id: String,
    pub role_name: String,
    #[serde(default)]
    pub has_sign_in: bool,
    pub energy_data: EnergyData,
    pub liveness_data: ProgressData,
    #[serde(default)]
    pub battle_pass_data: Vec<ProgressData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyData {
    pub cur: i64,
    pub total: i64,
    /// Unix seconds at which energy is full again
    #[serde(default)]
    pub refresh_time_stamp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressData {
    pub cur: i64,
    pub total: i64,
}

/// Weekly and stored-resource counters; any of them may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountBaseInfo {
    pub weekly_inst_count: Option<i64>,
    pub weekly_inst_count_limit: Option<i64>,
    pub rouge_score: Option<i64>,
    pub rouge_score_limit: Option<i64>,
    pub store_energy: Option<i64>,
    pub store_energy_limit: Option<i64>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_data_from_api_json() {
        let json = r#"{
            "roleId": 100123456,
            "roleName": "漂泊者",
            "hasSignIn": true,
            "energyData": {"cur": 180, "total": 240, "refreshTimeStamp": 1760000000},
            "livenessData": {"cur": 100, "total": 100},
            "battlePassData": [{"cur": 42, "total": 70}]
        }"#;
        let daily: DailyData = serde_json::from_str(json).unwrap();
        assert_eq!(daily.role_id, "100123456");
        assert_eq!(daily.energy_data.refresh_time_stamp, Some(1_760_000_000));
        assert_eq!(daily.battle_pass_data[0].cur, 42);
    }

    #[test]
    fn test_account_info_tolerates_missing_fields() {
        let account: AccountBaseInfo = serde_json::from_str(r#"{"storeEnergy": 12}"#).unwrap();
        assert_eq!(account.store_energy, Some(12));
        assert_eq!(account.store_energy_limit, None);
    }
}
