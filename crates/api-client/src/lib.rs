use crate::auth::TokenCache;
use crate::responses::{
    BalanceBody, BarsBody, Envelope, OpenOrdersBody, OrderBody, QuoteBody, TokenBody,
};
use async_trait::async_trait;
use configuration::MarketConfig;
use core_types::{BalanceSnapshot, Bar, Market, OrderRequest, OrderSide};
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::sync::RwLock;

pub mod auth;
pub mod error;
pub mod responses;

// --- Public API ---
pub use error::ApiError;

/// Broker message codes meaning the access token is stale. These force a
/// token reissue on the next cycle instead of surfacing as a plain rejection.
const AUTH_EXPIRED_CODES: &[&str] = &["EGW00121", "EGW00123"];

/// Bounded retry for transient server errors only.
const MAX_ATTEMPTS: u32 = 3;

// Per-call timeouts. A hang on one symbol must never stall the whole cycle,
// so every outbound request carries one of these.
const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);
const BALANCE_TIMEOUT: Duration = Duration::from_secs(5);
const BARS_TIMEOUT: Duration = Duration::from_secs(5);
const QUOTE_TIMEOUT: Duration = Duration::from_secs(3);
const ORDER_TIMEOUT: Duration = Duration::from_secs(10);

/// The generic, abstract interface to the brokerage's trading API.
/// This trait is the contract the engine uses, allowing the underlying
/// implementation (live or mock) to be swapped out in tests.
#[async_trait]
pub trait BrokerApi: Send + Sync {
    /// Ensures a valid access token is available, reissuing if needed.
    async fn authenticate(&self) -> Result<(), ApiError>;

    /// Fetches the authoritative account state: positions, cash, P&L.
    async fn get_balance(&self) -> Result<BalanceSnapshot, ApiError>;

    /// Fetches the recent daily bar series for a symbol, oldest first.
    async fn get_daily_bars(
        &self,
        symbol: &str,
        exchange: Option<&str>,
    ) -> Result<Vec<Bar>, ApiError>;

    /// Fetches the latest traded price for a symbol.
    async fn get_quote(&self, symbol: &str, exchange: Option<&str>) -> Result<Decimal, ApiError>;

    /// Submits an order and returns the broker's order identifier.
    async fn submit_order(&self, order: &OrderRequest) -> Result<String, ApiError>;

    /// Returns the identifiers of all orders still open at the broker.
    async fn get_open_orders(&self) -> Result<Vec<String>, ApiError>;

    /// Cancels an open order.
    async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<(), ApiError>;
}

/// A concrete `BrokerApi` over the brokerage's REST endpoints for one market.
///
/// Each market gets its own client: separate credentials, separate token
/// cache file, separate paper/live transaction codes.
pub struct BrokerClient {
    http: reqwest::Client,
    market: Market,
    config: MarketConfig,
    token_cache: TokenCache,
    token: RwLock<Option<String>>,
}

impl BrokerClient {
    pub fn new(market: Market, config: MarketConfig, data_dir: &Path) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            "appkey",
            HeaderValue::from_str(&config.app_key).expect("Invalid app key"),
        );
        headers.insert(
            "appsecret",
            HeaderValue::from_str(&config.app_secret).expect("Invalid app secret"),
        );

        Self {
            http: reqwest::Client::builder()
                .default_headers(headers)
                .build()
                .expect("Failed to build reqwest client"),
            market,
            token_cache: TokenCache::new(data_dir, market),
            config,
            token: RwLock::new(None),
        }
    }

    /// Transaction code for the balance query, split by venue and paper/live.
    fn balance_tx_code(&self) -> &'static str {
        match (self.market, self.config.paper) {
            (Market::Domestic, true) => "VTTC8434R",
            (Market::Domestic, false) => "TTTC8434R",
            (Market::Overseas, true) => "VTTS3012R",
            (Market::Overseas, false) => "TTTS3012R",
        }
    }

    /// Transaction code for order submission.
    fn order_tx_code(&self, side: OrderSide) -> &'static str {
        match (self.market, self.config.paper, side) {
            (Market::Domestic, true, OrderSide::Buy) => "VTTC0012U",
            (Market::Domestic, true, OrderSide::Sell) => "VTTC0011U",
            (Market::Domestic, false, OrderSide::Buy) => "TTTC0012U",
            (Market::Domestic, false, OrderSide::Sell) => "TTTC0011U",
            (Market::Overseas, true, OrderSide::Buy) => "VTTT1002U",
            (Market::Overseas, true, OrderSide::Sell) => "VTTT1006U",
            (Market::Overseas, false, OrderSide::Buy) => "TTTT1002U",
            (Market::Overseas, false, OrderSide::Sell) => "TTTT1006U",
        }
    }

    async fn bearer(&self) -> Result<String, ApiError> {
        let token = self.token.read().await;
        token
            .as_deref()
            .map(|t| format!("Bearer {t}"))
            .ok_or_else(|| ApiError::Auth("no access token; authenticate() first".into()))
    }

    /// Sends a request with bounded retry and exponential backoff, strictly
    /// for transport failures and 5xx-class responses. Business rejections
    /// come back as 200s with a non-zero `rt_cd` and are never retried.
    async fn send_retrying(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let mut backoff = Duration::from_millis(500);
        let mut attempt = 1u32;
        loop {
            let Some(this_try) = req.try_clone() else {
                return Ok(req.send().await?);
            };
            match this_try.send().await {
                Ok(resp) if resp.status().is_server_error() => {
                    let status = resp.status().as_u16();
                    if attempt >= MAX_ATTEMPTS {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(ApiError::Server { status, body });
                    }
                    tracing::warn!(status, attempt, "Server error; retrying after backoff.");
                }
                Ok(resp) => return Ok(resp),
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(error = %e, attempt, "Transport error; retrying after backoff.");
                }
                Err(e) => return Err(e.into()),
            }
            tokio::time::sleep(backoff).await;
            backoff *= 2;
            attempt += 1;
        }
    }

    /// Unwraps the broker envelope, classifying failures. An expired-token
    /// code drops the cached token so the next cycle re-authenticates.
    async fn parse<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, ApiError> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            if status.as_u16() == 401 {
                self.token_cache.invalidate();
                *self.token.write().await = None;
                return Err(ApiError::Auth(text));
            }
            return Err(ApiError::Server {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&text)
            .map_err(|e| ApiError::Deserialization(format!("{e}; original text: {text}")))?;

        if envelope.return_code == "0" {
            envelope
                .body
                .ok_or_else(|| ApiError::Deserialization("success envelope without body".into()))
        } else if AUTH_EXPIRED_CODES.contains(&envelope.message_code.as_str()) {
            self.token_cache.invalidate();
            *self.token.write().await = None;
            Err(ApiError::Auth(envelope.message))
        } else {
            Err(ApiError::from_rejection(
                envelope.message_code,
                envelope.message,
            ))
        }
    }

    async fn issue_token(&self) -> Result<String, ApiError> {
        let url = format!("{}/oauth2/token", self.config.base_url);
        let body = json!({
            "grant_type": "client_credentials",
            "appkey": self.config.app_key,
            "appsecret": self.config.app_secret,
        });

        // The credential endpoint is deliberately not retried: a failure here
        // is fatal to the cycle and the caller's own loop governs the retry.
        let resp = self
            .http
            .post(&url)
            .timeout(TOKEN_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| ApiError::Auth(e.to_string()))?;
        if !status.is_success() {
            return Err(ApiError::Auth(format!("HTTP {status}: {text}")));
        }

        let token: TokenBody = serde_json::from_str(&text)
            .map_err(|e| ApiError::Auth(format!("bad token response: {e}")))?;
        Ok(token.access_token)
    }

    /// Overseas limit orders are biased 1% in the aggressive direction so
    /// they fill immediately; actual execution happens at the market price.
    fn biased_price(side: OrderSide, price: Decimal) -> Decimal {
        let adjusted = match side {
            OrderSide::Buy => price * dec!(1.01),
            OrderSide::Sell => price * dec!(0.99),
        };
        adjusted.round_dp(2)
    }
}

#[async_trait]
impl BrokerApi for BrokerClient {
    async fn authenticate(&self) -> Result<(), ApiError> {
        // The cache file decides freshness; the in-memory copy is only a
        // convenience for request building.
        if let Some(cached) = self.token_cache.load_valid() {
            *self.token.write().await = Some(cached);
            return Ok(());
        }

        let fresh = self.issue_token().await?;
        self.token_cache.store(&fresh)?;
        *self.token.write().await = Some(fresh);
        tracing::info!(market = self.market.tag(), "Issued a new access token.");
        Ok(())
    }

    async fn get_balance(&self) -> Result<BalanceSnapshot, ApiError> {
        let url = format!("{}/v1/trading/balance", self.config.base_url);
        let req = self
            .http
            .get(&url)
            .timeout(BALANCE_TIMEOUT)
            .header("authorization", self.bearer().await?)
            .header("tr_id", self.balance_tx_code())
            .query(&[("account_no", self.config.account_no.as_str())]);

        let resp = self.send_retrying(req).await?;
        let body: BalanceBody = self.parse(resp).await?;
        Ok(body.into_snapshot())
    }

    async fn get_daily_bars(
        &self,
        symbol: &str,
        exchange: Option<&str>,
    ) -> Result<Vec<Bar>, ApiError> {
        let url = format!("{}/v1/quotations/daily-bars", self.config.base_url);
        let req = self
            .http
            .get(&url)
            .timeout(BARS_TIMEOUT)
            .header("authorization", self.bearer().await?)
            .query(&[
                ("symbol", symbol),
                ("exchange", exchange.unwrap_or("")),
                ("count", "100"),
            ]);

        let resp = self.send_retrying(req).await?;
        let body: BarsBody = self.parse(resp).await?;

        let mut bars: Vec<Bar> = body.bars.into_iter().filter_map(|r| r.into_bar()).collect();
        // The broker sends newest-first; indicators want oldest-first.
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    async fn get_quote(&self, symbol: &str, exchange: Option<&str>) -> Result<Decimal, ApiError> {
        let url = format!("{}/v1/quotations/quote", self.config.base_url);
        let req = self
            .http
            .get(&url)
            .timeout(QUOTE_TIMEOUT)
            .header("authorization", self.bearer().await?)
            .query(&[("symbol", symbol), ("exchange", exchange.unwrap_or(""))]);

        let resp = self.send_retrying(req).await?;
        let body: QuoteBody = self.parse(resp).await?;
        Ok(body.price)
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<String, ApiError> {
        let url = format!("{}/v1/trading/order", self.config.base_url);

        // Domestic orders go out as market orders (price "0"); overseas
        // venues require a limit price, so the hint is biased for priority.
        let price = match (self.market, order.price_hint) {
            (Market::Overseas, Some(hint)) => Self::biased_price(order.side, hint),
            _ => Decimal::ZERO,
        };

        let body = json!({
            "account_no": self.config.account_no,
            "symbol": order.symbol,
            "side": match order.side { OrderSide::Buy => "BUY", OrderSide::Sell => "SELL" },
            "quantity": order.quantity.to_string(),
            "price": price.to_string(),
            "exchange": order.exchange.as_deref().unwrap_or(""),
        });

        let req = self
            .http
            .post(&url)
            .timeout(ORDER_TIMEOUT)
            .header("authorization", self.bearer().await?)
            .header("tr_id", self.order_tx_code(order.side))
            .json(&body);

        let resp = self.send_retrying(req).await?;
        let accepted: OrderBody = self.parse(resp).await?;
        Ok(accepted.order_id)
    }

    async fn get_open_orders(&self) -> Result<Vec<String>, ApiError> {
        let url = format!("{}/v1/trading/open-orders", self.config.base_url);
        let req = self
            .http
            .get(&url)
            .timeout(BALANCE_TIMEOUT)
            .header("authorization", self.bearer().await?)
            .query(&[("account_no", self.config.account_no.as_str())]);

        let resp = self.send_retrying(req).await?;
        let body: OpenOrdersBody = self.parse(resp).await?;
        Ok(body.orders.into_iter().map(|o| o.order_id).collect())
    }

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<(), ApiError> {
        let url = format!("{}/v1/trading/cancel", self.config.base_url);
        let body = json!({
            "account_no": self.config.account_no,
            "order_id": order_id,
            "symbol": symbol,
        });

        let req = self
            .http
            .post(&url)
            .timeout(ORDER_TIMEOUT)
            .header("authorization", self.bearer().await?)
            .json(&body);

        let resp = self.send_retrying(req).await?;
        let _: responses::EmptyBody = self.parse(resp).await?;
        Ok(())
    }
}
