//! User-related models

use serde::{Deserialize, Serialize};

/// Profile from `GET /users/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    /// The API returns the balance as a string ("0") on some deployments
    #[serde(default, deserialize_with = "deserialize_balance")]
    pub balance: f64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub won_auctions: Vec<serde_json::Value>,
}

/// Outcome of `POST /users/me/deduct` (winner settlement)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDeductResponse {
    pub success: bool,
    #[serde(default)]
    pub new_balance: Option<f64>,
    #[serde(default)]
    pub message: String,
}

/// Deserialize a balance that may arrive as a number or string
fn deserialize_balance<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BalanceValue {
        Number(f64),
        String(String),
    }

    match BalanceValue::deserialize(deserializer)? {
        BalanceValue::Number(n) => Ok(n),
        BalanceValue::String(s) => s.parse::<f64>().map_err(D::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parses_string_balance() {
        let json = r#"{"id": 1, "email": "bob@example.com", "balance": "1500.75", "createdAt": "2026-01-01", "wonAuctions": []}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.balance, 1500.75);
    }
}
