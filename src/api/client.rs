use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::models::{
    extract_list, extract_matches, unwrap_data, Bank, BetRecord, League, MatchRecord, Sport,
    TransactionRecord, WalletBalance,
};
use crate::bets::submit::BetRequest;
use crate::error::ClientError;
use crate::wallet::payments::{BankTransferRequest, MobileMoneyRequest};

const PREFIX: &str = "/api";

/// Filters for `GET /games/matches`.
#[derive(Debug, Clone)]
pub struct MatchQuery {
    pub league_id: Option<String>,
    pub sport_id: Option<String>,
    /// `"all"` is treated as no filter.
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub limit: u32,
    pub skip: u32,
}

impl Default for MatchQuery {
    fn default() -> Self {
        MatchQuery {
            league_id: None,
            sport_id: None,
            status: None,
            start_date: None,
            end_date: None,
            search: None,
            limit: 10,
            skip: 0,
        }
    }
}

impl MatchQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string()), ("skip", self.skip.to_string())];
        let optional = [
            ("leagueId", &self.league_id),
            ("sportId", &self.sport_id),
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
            ("search", &self.search),
        ];
        for (key, value) in optional {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((key, v.to_string()));
            }
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty() && *s != "all") {
            params.push(("status", status.to_string()));
        }
        params
    }
}

/// Response of `POST /auth/login` and `/auth/register`.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub token: Option<String>,
    pub user: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    pub password: String,
}

/// REST client for the sportsbook backend.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Decode(format!("invalid API URL '{}': {}", base_url, e)))?;
        Ok(BackendClient {
            http,
            base_url,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap() = token;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().unwrap().is_some()
    }

    /// Fails without a round trip when no token is set.
    fn require_token(&self) -> Result<(), ClientError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ClientError::Unauthenticated)
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            PREFIX,
            path
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);
        let builder = self.http.request(method, url);
        match self.token.read().unwrap().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, ClientError> {
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        let parsed: Option<Value> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: parsed.as_ref().and_then(backend_message),
            });
        }

        let value = parsed.ok_or_else(|| {
            ClientError::Decode(format!("non-JSON body ({} bytes)", body.len()))
        })?;

        if value.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: backend_message(&value),
            });
        }
        Ok(value)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ClientError> {
        self.send(self.request(Method::GET, path).query(query)).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ClientError> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    fn page(limit: u32, skip: u32) -> Vec<(&'static str, String)> {
        vec![("limit", limit.to_string()), ("skip", skip.to_string())]
    }

    // ── Auth ─────────────────────────────────────────────────────────────────

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let raw = self.post("/auth/register", req).await?;
        Ok(parse_auth(&raw))
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let raw = self
            .post(
                "/auth/login",
                &json!({ "identifier": identifier, "password": password }),
            )
            .await?;
        let auth = parse_auth(&raw);
        info!("Signed in as {}", identifier);
        Ok(auth)
    }

    /// Current user, as returned by `GET /auth/me`.
    pub async fn me(&self) -> Result<Option<Value>, ClientError> {
        self.require_token()?;
        let raw = self.get("/auth/me", &[]).await?;
        Ok(raw
            .get("user")
            .or_else(|| raw.get("data"))
            .filter(|u| u.is_object())
            .cloned())
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.send(self.request(Method::POST, "/auth/logout")).await?;
        Ok(())
    }

    // ── Catalog ──────────────────────────────────────────────────────────────

    pub async fn sports(&self) -> Result<Vec<Sport>, ClientError> {
        let raw = self.get("/games/sports", &[]).await?;
        Ok(extract_list(&raw))
    }

    pub async fn leagues(
        &self,
        sport_id: Option<&str>,
        limit: u32,
        skip: u32,
    ) -> Result<Vec<League>, ClientError> {
        let mut query = Self::page(limit, skip);
        if let Some(id) = sport_id {
            query.push(("sportId", id.to_string()));
        }
        let raw = self.get("/games/leagues", &query).await?;
        Ok(extract_list(&raw))
    }

    pub async fn matches(&self, query: &MatchQuery) -> Result<Vec<MatchRecord>, ClientError> {
        let raw = self.get("/games/matches", &query.params()).await?;
        Ok(extract_matches(&raw))
    }

    pub async fn league_matches(&self, league_id: &str) -> Result<Vec<MatchRecord>, ClientError> {
        let raw = self
            .get(&format!("/games/leagues/{}/matches", league_id), &[])
            .await?;
        Ok(extract_matches(&raw))
    }

    pub async fn live_matches(&self, limit: u32, skip: u32) -> Result<Vec<MatchRecord>, ClientError> {
        let raw = self.get("/games/live", &Self::page(limit, skip)).await?;
        Ok(extract_matches(&raw))
    }

    pub async fn match_details(&self, match_id: &str) -> Result<MatchRecord, ClientError> {
        let raw = self.get(&format!("/games/matches/{}", match_id), &[]).await?;
        let data = unwrap_data(raw);
        if !data.is_object() {
            return Err(ClientError::Decode("match details missing".into()));
        }
        Ok(MatchRecord::new(data))
    }

    // ── Bets ─────────────────────────────────────────────────────────────────

    pub async fn place_bet(&self, bet: &BetRequest) -> Result<Value, ClientError> {
        self.require_token()?;
        info!(
            "Placing bet: stake={:.2}, selections={}",
            bet.stake,
            bet.selections.len()
        );
        let raw = self.post("/bets", bet).await?;
        Ok(unwrap_data(raw))
    }

    pub async fn my_bets(&self, limit: u32, skip: u32) -> Result<Vec<BetRecord>, ClientError> {
        self.require_token()?;
        let raw = self.get("/bets", &Self::page(limit, skip)).await?;
        Ok(extract_list(&raw))
    }

    pub async fn bet_details(&self, bet_id: &str) -> Result<BetRecord, ClientError> {
        self.require_token()?;
        let raw = self.get(&format!("/bets/{}", bet_id), &[]).await?;
        serde_json::from_value(unwrap_data(raw)).map_err(|e| ClientError::Decode(e.to_string()))
    }

    // ── Wallet ───────────────────────────────────────────────────────────────

    pub async fn balance(&self) -> Result<WalletBalance, ClientError> {
        self.require_token()?;
        let raw = self.get("/wallet/balance", &[]).await?;
        serde_json::from_value(unwrap_data(raw)).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn transactions(
        &self,
        limit: u32,
        skip: u32,
    ) -> Result<Vec<TransactionRecord>, ClientError> {
        self.require_token()?;
        let raw = self.get("/wallet/transactions", &Self::page(limit, skip)).await?;
        Ok(extract_list(&raw))
    }

    // ── Payments ─────────────────────────────────────────────────────────────

    pub async fn deposit_mobile_money(&self, req: &MobileMoneyRequest) -> Result<Value, ClientError> {
        self.require_token()?;
        self.post("/payments/deposit/mobile-money", req).await
    }

    pub async fn withdraw_mobile_money(&self, req: &MobileMoneyRequest) -> Result<Value, ClientError> {
        self.require_token()?;
        self.post("/payments/withdraw/mobile-money", req).await
    }

    pub async fn withdraw_bank_transfer(
        &self,
        req: &BankTransferRequest,
    ) -> Result<Value, ClientError> {
        self.require_token()?;
        self.post("/payments/withdraw/bank-transfer", req).await
    }

    pub async fn transaction_status(&self, transaction_id: &str) -> Result<Value, ClientError> {
        self.require_token()?;
        let raw = self
            .get(&format!("/payments/transactions/{}/status", transaction_id), &[])
            .await?;
        Ok(unwrap_data(raw))
    }

    pub async fn verify_wallet(
        &self,
        phone_number: &str,
        wallet_provider: &str,
    ) -> Result<Value, ClientError> {
        self.require_token()?;
        self.post(
            "/payments/verify/wallet",
            &json!({ "phoneNumber": phone_number, "walletProvider": wallet_provider }),
        )
        .await
    }

    pub async fn verify_bank_account(
        &self,
        account_number: &str,
        sort_code: &str,
    ) -> Result<Value, ClientError> {
        self.require_token()?;
        self.post(
            "/payments/verify/bank-account",
            &json!({ "accountNumber": account_number, "sortCode": sort_code }),
        )
        .await
    }

    pub async fn banks(&self) -> Result<Vec<Bank>, ClientError> {
        let raw = self.get("/payments/banks", &[]).await?;
        Ok(extract_list(&raw))
    }
}

/// Source of the live-match list, so the live view can be driven without a
/// network in tests.
#[async_trait]
pub trait LiveFeed: Send + Sync {
    async fn fetch_live(&self) -> Result<Vec<MatchRecord>, ClientError>;
}

#[async_trait]
impl LiveFeed for BackendClient {
    async fn fetch_live(&self) -> Result<Vec<MatchRecord>, ClientError> {
        self.live_matches(50, 0).await
    }
}

/// Source of the authoritative wallet balance.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch_balance(&self) -> Result<WalletBalance, ClientError>;
}

#[async_trait]
impl BalanceSource for BackendClient {
    async fn fetch_balance(&self) -> Result<WalletBalance, ClientError> {
        self.balance().await
    }
}

fn backend_message(body: &Value) -> Option<String> {
    body.get("message")
        .or_else(|| body.get("error").filter(|e| e.is_string()))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_auth(raw: &Value) -> AuthResponse {
    let data = raw.get("data").filter(|d| d.is_object()).unwrap_or(raw);
    let token = raw
        .get("token")
        .or_else(|| data.get("token"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let user = raw
        .get("user")
        .or_else(|| data.get("user"))
        .filter(|u| u.is_object())
        .cloned();
    AuthResponse { token, user }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_query_omits_all_status_and_empty_filters() {
        let q = MatchQuery {
            status: Some("all".into()),
            search: Some(String::new()),
            league_id: Some("l1".into()),
            ..Default::default()
        };
        let params = q.params();
        assert!(params.contains(&("leagueId", "l1".to_string())));
        assert!(params.contains(&("limit", "10".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "status" || *k == "search"));

        let live = MatchQuery {
            status: Some("in_play".into()),
            ..Default::default()
        };
        assert!(live.params().contains(&("status", "in_play".to_string())));
    }

    #[test]
    fn test_match_query_sends_date_window() {
        let q = MatchQuery {
            start_date: Some("2024-05-10T22:00:00.000Z".into()),
            end_date: Some("2024-05-11T22:00:00.000Z".into()),
            ..Default::default()
        };
        let params = q.params();
        assert!(params.contains(&("startDate", "2024-05-10T22:00:00.000Z".to_string())));
        assert!(params.contains(&("endDate", "2024-05-11T22:00:00.000Z".to_string())));
    }

    #[tokio::test]
    async fn test_signed_out_calls_fail_before_sending() {
        // Nothing listens on this port; reaching the network would be a Http error.
        let client = BackendClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert!(matches!(client.balance().await, Err(ClientError::Unauthenticated)));
        assert!(matches!(client.my_bets(10, 0).await, Err(ClientError::Unauthenticated)));
        assert_eq!(
            ClientError::Unauthenticated.user_message("Failed to load balance"),
            "Please sign in to place bets."
        );
    }

    #[test]
    fn test_url_carries_api_prefix() {
        let client =
            BackendClient::new("https://bets.example.com/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.url("/wallet/balance"),
            "https://bets.example.com/api/wallet/balance"
        );
    }

    #[test]
    fn test_token_toggles_authentication() {
        let client = BackendClient::new("http://localhost:4000", Duration::from_secs(5)).unwrap();
        assert!(!client.is_authenticated());
        client.set_token(Some("tok".into()));
        assert!(client.is_authenticated());
        client.set_token(None);
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_parse_auth_top_level_and_nested() {
        let top = parse_auth(&json!({"token": "t1", "user": {"_id": "u1"}}));
        assert_eq!(top.token.as_deref(), Some("t1"));
        assert!(top.user.is_some());

        let nested = parse_auth(&json!({"success": true, "data": {"token": "t2"}}));
        assert_eq!(nested.token.as_deref(), Some("t2"));
        assert!(nested.user.is_none());
    }

    #[test]
    fn test_backend_message_extraction() {
        assert_eq!(
            backend_message(&json!({"message": "Invalid credentials"})).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(backend_message(&json!({"error": {"code": 1}})), None);
    }
}
