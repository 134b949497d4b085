//! Auction-related models

use crate::types::{AuctionId, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an auction
///
/// The wire is case-insensitive ("sold", "SOLD", "Sold" all occur);
/// the normalized form is uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuctionStatus {
    #[default]
    Active,
    Sold,
    Expired,
}

impl AuctionStatus {
    /// Parse a wire status string, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(AuctionStatus::Active),
            "SOLD" => Some(AuctionStatus::Sold),
            "EXPIRED" => Some(AuctionStatus::Expired),
            _ => None,
        }
    }

    /// Normalized uppercase form
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Active => "ACTIVE",
            AuctionStatus::Sold => "SOLD",
            AuctionStatus::Expired => "EXPIRED",
        }
    }

    /// Whether the auction has reached a terminal state
    pub fn is_closed(&self) -> bool {
        !matches!(self, AuctionStatus::Active)
    }
}

impl std::fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuctionStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::Error::InvalidData(format!("unknown auction status: {s}")))
    }
}

impl Serialize for AuctionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuctionStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AuctionStatus::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown auction status: {s}")))
    }
}

/// A single bid on an auction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    #[serde(default)]
    pub id: i64,
    #[serde(alias = "user", alias = "bidderName")]
    pub bidder: String,
    #[serde(deserialize_with = "deserialize_money_lenient")]
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
}

/// Catalog row from `GET /auctions` and `GET /auctions/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSummary {
    pub id: AuctionId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "deserialize_money_lenient")]
    pub starting_price: Money,
    #[serde(deserialize_with = "deserialize_money_lenient")]
    pub current_price: Money,
    pub status: AuctionStatus,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub creator: Option<Creator>,
    #[serde(default)]
    pub winner_id: Option<i64>,
}

/// Seller info embedded in a catalog row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub id: i64,
    pub email: String,
}

/// Response from `GET /auctions`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionsResponse {
    pub auctions: Vec<AuctionSummary>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Pagination block on list responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u32,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

/// Full-state seed for a room: the REST view of one auction at join time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionSnapshot {
    #[serde(deserialize_with = "deserialize_money_lenient")]
    pub current_price: Money,
    #[serde(default, deserialize_with = "deserialize_money_lenient_opt")]
    pub starting_price: Option<Money>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub status: AuctionStatus,
    #[serde(default)]
    pub bid_history: Vec<Bid>,
}

impl AuctionSnapshot {
    /// Build a snapshot from a catalog row (the API has no bid history yet)
    pub fn from_summary(summary: &AuctionSummary) -> Self {
        AuctionSnapshot {
            current_price: summary.current_price,
            starting_price: Some(summary.starting_price),
            ends_at: Some(summary.ends_at),
            status: summary.status,
            bid_history: Vec::new(),
        }
    }
}

/// Request body for `POST /auctions/{id}/bid`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidRequest {
    pub amount: f64,
}

/// Outcome of a bid submission
///
/// Rejections are data, not errors: a failed bid comes back as
/// `{success: false, message}` so it never crosses the reconciliation
/// boundary as a panic or an `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Deserialize a money amount that may arrive as a number, string, or null
pub(crate) fn deserialize_money_lenient<'de, D>(deserializer: D) -> std::result::Result<Money, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct MoneyLenient;

    impl<'de> de::Visitor<'de> for MoneyLenient {
        type Value = Money;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number, string, or null")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Money, E> {
            Ok(Money(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Money, E> {
            Ok(Money(v as f64))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Money, E> {
            Ok(Money(v as f64))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Money, E> {
            v.parse::<f64>().map(Money).map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<Money, E> {
            Ok(Money(0.0))
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Money, E> {
            Ok(Money(0.0))
        }
    }

    deserializer.deserialize_any(MoneyLenient)
}

/// Optional variant of [`deserialize_money_lenient`]
pub(crate) fn deserialize_money_lenient_opt<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Money>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserialize_money_lenient(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(AuctionStatus::parse("sold"), Some(AuctionStatus::Sold));
        assert_eq!(AuctionStatus::parse("Active"), Some(AuctionStatus::Active));
        assert_eq!(AuctionStatus::parse("EXPIRED"), Some(AuctionStatus::Expired));
        assert_eq!(AuctionStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_auction_summary_parses_string_prices() {
        // The catalog API sends prices as strings
        let json = r#"{
            "id": 7,
            "title": "Vintage clock",
            "description": "Brass, working",
            "startingPrice": "50.00",
            "currentPrice": "120.50",
            "status": "active",
            "creatorId": 3,
            "winnerId": null,
            "endsAt": "2026-08-10T12:00:00Z",
            "createdAt": "2026-08-01T09:00:00Z",
            "creator": {"id": 3, "email": "seller@example.com"}
        }"#;

        let summary: AuctionSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.id.as_str(), "7");
        assert_eq!(summary.current_price, Money(120.50));
        assert_eq!(summary.status, AuctionStatus::Active);
        assert!(summary.winner_id.is_none());
    }

    #[test]
    fn test_snapshot_defaults_empty_history() {
        let json = r#"{"currentPrice": 100, "status": "ACTIVE"}"#;
        let snapshot: AuctionSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.current_price, Money(100.0));
        assert!(snapshot.bid_history.is_empty());
        assert!(snapshot.ends_at.is_none());
    }
}
