//! Shared type definitions and newtypes

use serde::{Deserialize, Serialize};

/// Auction identifier (for clarity in function signatures)
///
/// The API sends ids as numbers in some responses and strings in others,
/// so the canonical form is a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AuctionId(pub String);

impl AuctionId {
    pub fn new(id: impl Into<String>) -> Self {
        AuctionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AuctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AuctionId {
    fn from(id: &str) -> Self {
        AuctionId(id.to_string())
    }
}

impl<'de> Deserialize<'de> for AuctionId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IdValue {
            String(String),
            Number(i64),
        }

        Ok(match IdValue::deserialize(deserializer)? {
            IdValue::String(s) => AuctionId(s),
            IdValue::Number(n) => AuctionId(n.to_string()),
        })
    }
}

/// Currency amount (for clarity in function signatures)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(pub f64);

impl Money {
    pub fn new(amount: f64) -> Self {
        Money(amount)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
