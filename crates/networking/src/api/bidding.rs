//! Bidding and settlement operations with validation

use crate::ApiClient;
use bidhall_core::{AuctionId, BalanceDeductResponse, BidResponse, Money};
use tracing::{info, warn};

/// Place a bid after client-side validation
///
/// # Arguments
/// * `client` - The authenticated API client
/// * `id` - Auction to bid on
/// * `amount` - Bid amount
/// * `current_price` - Latest known price, if any; bids at or below it are
///   rejected locally before hitting the network
///
/// A successful call does NOT update any local price; the projection
/// waits for the `NEW_BID` room event.
pub async fn submit_bid(
    client: &ApiClient,
    id: &AuctionId,
    amount: f64,
    current_price: Option<Money>,
) -> BidResponse {
    if amount <= 0.0 {
        return BidResponse {
            success: false,
            message: "Bid amount must be positive".to_string(),
        };
    }

    if let Some(price) = current_price {
        if amount <= price.as_f64() {
            return BidResponse {
                success: false,
                message: format!("Bid must exceed the current price of {price}"),
            };
        }
    }

    info!("Submitting bid of {} on auction {}", amount, id);

    match client.place_bid(id, amount).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Bid submission failed for {}: {}", id, e);
            BidResponse {
                success: false,
                message: e.to_string(),
            }
        }
    }
}

/// Settle a won auction by deducting the final price from the balance
///
/// Used as the winner-detection callback target; the reconciler guarantees
/// it runs at most once per auction.
pub async fn settle_purchase(client: &ApiClient, final_price: f64) -> BalanceDeductResponse {
    info!("Settling won auction for {}", final_price);

    match client.deduct_balance(final_price).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Balance deduction failed: {}", e);
            BalanceDeductResponse {
                success: false,
                new_balance: None,
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_bid_rejects_non_positive_amount() {
        let client = ApiClient::new(Some("credential"));
        let response = submit_bid(&client, &AuctionId::from("1"), 0.0, None).await;
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_submit_bid_rejects_amount_below_current_price() {
        let client = ApiClient::new(Some("credential"));
        let response = submit_bid(&client, &AuctionId::from("1"), 100.0, Some(Money(150.0))).await;
        assert!(!response.success);
        assert!(response.message.contains("exceed"));
    }
}
