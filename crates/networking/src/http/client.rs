//! Auction API HTTP client with Bearer-token authentication

use bidhall_core::{
    AuctionId, AuctionSnapshot, AuctionSummary, AuctionsResponse, BalanceDeductResponse,
    BidRequest, BidResponse, Error, Result, UserProfile,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Client, Response,
};
use tracing::{debug, error, instrument};

const API_BASE: &str = "https://krystal-solutional-cherish.ngrok-free.dev";
// The hosted API sits behind a tunnel that interposes a browser warning
// page unless this header is present
const TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

/// HTTP client for the auction REST API
///
/// Sends the credential as a Bearer token on authenticated requests.
/// The reconciler never calls this directly; the surrounding UI and the
/// winner-settlement callback do.
pub struct ApiClient {
    http: Client,
    base_url: String,
    credential: Option<String>,
}

impl ApiClient {
    /// Create a client against the default API host
    pub fn new(credential: Option<&str>) -> Self {
        Self::with_base_url(API_BASE, credential)
    }

    /// Create a client against a specific API host (tests, staging)
    pub fn with_base_url(base_url: &str, credential: Option<&str>) -> Self {
        let http = Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: credential.map(|c| c.to_string()),
        }
    }

    /// Default headers for requests
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(TUNNEL_BYPASS_HEADER, HeaderValue::from_static("true"));

        if let Some(ref credential) = self.credential {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {credential}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    /// Check if response indicates authentication failure
    fn check_auth_error(response: &Response) -> Option<Error> {
        match response.status().as_u16() {
            401 => Some(Error::CredentialExpired),
            403 => Some(Error::AuthenticationError("Access forbidden".to_string())),
            _ => None,
        }
    }

    /// List auctions for the catalog
    #[instrument(skip(self))]
    pub async fn get_auctions(&self, page: u32, limit: u32, search: Option<&str>) -> Result<AuctionsResponse> {
        let mut url = format!("{}/auctions?page={}&limit={}", self.base_url, page, limit);
        if let Some(q) = search {
            if !q.is_empty() {
                url.push_str(&format!("&search={q}"));
            }
        }

        debug!("Fetching auctions from: {}", url);

        let response = self
            .http
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let response = response.error_for_status().map_err(|e| {
            error!("Auctions request failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        let data: AuctionsResponse = response.json().await.map_err(|e| {
            error!("Failed to parse auctions response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!("Fetched {} auctions", data.auctions.len());
        Ok(data)
    }

    /// Get a single auction's detail row
    #[instrument(skip(self))]
    pub async fn get_auction(&self, id: &AuctionId) -> Result<AuctionSummary> {
        let url = format!("{}/auctions/{}", self.base_url, id);

        let response = self
            .http
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let response = response.error_for_status().map_err(|e| {
            error!("Auction request failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        let auction: AuctionSummary = response.json().await.map_err(|e| {
            error!("Failed to parse auction response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!("Auction fetched: {} @ {}", auction.id, auction.current_price);
        Ok(auction)
    }

    /// Fetch the full-state seed for a room: price, status, deadline, and
    /// whatever bid history the detail endpoint carries
    #[instrument(skip(self))]
    pub async fn get_snapshot(&self, id: &AuctionId) -> Result<AuctionSnapshot> {
        let url = format!("{}/auctions/{}", self.base_url, id);

        let response = self
            .http
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let response = response.error_for_status().map_err(|e| {
            error!("Snapshot request failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        let snapshot: AuctionSnapshot = response.json().await.map_err(|e| {
            error!("Failed to parse snapshot response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!(
            "Snapshot fetched: {} @ {} ({} bids)",
            id,
            snapshot.current_price,
            snapshot.bid_history.len()
        );
        Ok(snapshot)
    }

    /// Submit a bid on an auction
    ///
    /// Rejections (outbid, auction closed, insufficient balance) come back
    /// as `{success: false, message}`; only transport-level failures are
    /// an `Err`.
    #[instrument(skip(self))]
    pub async fn place_bid(&self, id: &AuctionId, amount: f64) -> Result<BidResponse> {
        let url = format!("{}/auctions/{}/bid", self.base_url, id);

        debug!("Placing bid of {} on auction {}", amount, id);

        let response = self
            .http
            .post(&url)
            .headers(self.default_headers())
            .json(&BidRequest { amount })
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| format!("Failed to place bid: HTTP {status}"));
            error!("Bid rejected: HTTP {} — {}", status, message);
            return Ok(BidResponse { success: false, message });
        }

        let bid_response: BidResponse = response.json().await.unwrap_or(BidResponse {
            success: true,
            message: "Bid placed successfully".to_string(),
        });

        debug!("Bid placed on {}: {}", id, bid_response.message);
        Ok(bid_response)
    }

    /// Get the current user's profile and balance
    #[instrument(skip(self))]
    pub async fn get_me(&self) -> Result<UserProfile> {
        let url = format!("{}/users/me", self.base_url);

        debug!("Fetching profile from: {}", url);

        let response = self
            .http
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let response = response.error_for_status().map_err(|e| {
            error!("Profile request failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        let profile: UserProfile = response.json().await.map_err(|e| {
            error!("Failed to parse profile response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!("Profile fetched for {}", profile.email);
        Ok(profile)
    }

    /// Deduct the winning amount from the current user's balance
    ///
    /// Same structured-failure rule as [`place_bid`](Self::place_bid).
    #[instrument(skip(self))]
    pub async fn deduct_balance(&self, amount: f64) -> Result<BalanceDeductResponse> {
        let url = format!("{}/users/me/deduct", self.base_url);

        debug!("Deducting {} from balance", amount);

        let response = self
            .http
            .post(&url)
            .headers(self.default_headers())
            .json(&serde_json::json!({ "amount": amount }))
            .send()
            .await?;

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            error!("Deduct request failed: HTTP {} — {}", status, body);
            return Ok(BalanceDeductResponse {
                success: false,
                new_balance: None,
                message: format!("HTTP {status}: {body}"),
            });
        }

        let deduct: BalanceDeductResponse = response.json().await.map_err(|e| {
            error!("Failed to parse deduct response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!("Balance deducted: new balance {:?}", deduct.new_balance);
        Ok(deduct)
    }

    /// Get the credential (for re-authentication checks)
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}
