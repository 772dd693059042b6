//! RIT client REST API connection.
//!
//! Implements the [`Exchange`](crate::Exchange) trait against the RIT desktop
//! client's local REST server. Every request carries the static API key in the
//! `X-API-Key` header, set once as a default header on the shared client.
//!
//! # REST endpoints
//!
//! | Operation        | Method | Path                  |
//! |------------------|--------|-----------------------|
//! | Session status   | GET    | `/case`               |
//! | Order book       | GET    | `/securities/book`    |
//! | Position, volume | GET    | `/securities`         |
//! | Place order      | POST   | `/orders`             |
//! | Cancel all       | POST   | `/commands/cancel`    |

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use rit_core::config::ExchangeConfig;
use rit_core::error::RitError;
use rit_core::market_data::{Case, OrderBook, Security};
use rit_core::trading::OrderIntent;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "X-API-Key";

/// RIT REST connection.
pub struct RitTd {
    /// Shared HTTP client with the API key preset.
    http: reqwest::Client,
    /// REST base URL (e.g. `http://localhost:9999/v1`).
    base_url: String,
}

impl RitTd {
    /// Build the HTTP client. No request is sent yet.
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| RitError::Config(format!("api_key is not a valid header value: {e}")))?;
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` and decode the JSON body; a non-success status is a [`RitError::Http`].
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let resp = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {path} request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RitError::Http { endpoint: path.to_string(), status: status.as_u16() }.into());
        }

        let body = resp
            .json::<T>()
            .await
            .map_err(|e| RitError::Parse(format!("{path}: {e}")))?;
        Ok(body)
    }

    /// POST `path` with query parameters; a rejection becomes a [`RitError::Trading`].
    async fn post(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let resp = self
            .http
            .post(self.url(path))
            .query(query)
            .send()
            .await
            .with_context(|| format!("POST {path} request failed"))?;

        let status = resp.status();
        let body = resp.text().await;
        if !status.is_success() {
            let text = body.unwrap_or_else(|e| {
                warn!("[rit] POST {path} rejection body unreadable: {e}");
                String::new()
            });
            return Err(RitError::Trading(format!("{path} rejected with {status}: {text}")).into());
        }
        let text = body.map_err(|e| RitError::Parse(format!("{path}: body read failed: {e}")))?;
        debug!("[rit] POST {path} → {text}");

        // Some commands answer with an empty body.
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RitError::Parse(format!("{path}: {e}")).into())
    }
}

#[async_trait]
impl crate::Exchange for RitTd {
    fn name(&self) -> &str {
        "rit"
    }

    async fn get_case(&self) -> Result<Case> {
        self.get_json("/case", &[]).await
    }

    async fn get_book(&self, ticker: &str) -> Result<OrderBook> {
        self.get_json("/securities/book", &[("ticker", ticker)]).await
    }

    async fn get_securities(&self, ticker: &str) -> Result<Vec<Security>> {
        self.get_json("/securities", &[("ticker", ticker)]).await
    }

    async fn insert_order(&self, order: &OrderIntent) -> Result<u64> {
        let qty_str = order.quantity.to_string();
        let price_str = format!("{:.2}", order.price);
        let resp = self
            .post(
                "/orders",
                &[
                    ("ticker", order.ticker.as_str()),
                    ("type", "LIMIT"),
                    ("quantity", qty_str.as_str()),
                    ("price", price_str.as_str()),
                    ("action", order.side.as_str()),
                ],
            )
            .await?;

        let order_id = resp
            .get("order_id")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| RitError::Parse(format!("/orders accepted without an order_id: {resp}")))?;
        info!("[rit] order placed: {order} → id={order_id}");
        Ok(order_id)
    }

    async fn cancel_all_orders(&self, ticker: &str) -> Result<()> {
        self.post("/commands/cancel", &[("ticker", ticker)]).await?;
        debug!("[rit] all orders cancelled: {ticker}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rit_core::enums::{SessionState, Side, Urgency};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use super::*;
    use crate::Exchange;

    fn config(base_url: &str, api_key: &str) -> ExchangeConfig {
        ExchangeConfig { base_url: base_url.into(), api_key: api_key.into(), request_timeout_ms: 2_000 }
    }

    /// Serve one canned HTTP response on a local port.
    ///
    /// Returns the base URL and a receiver for the raw request head.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());

            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(response.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });

        (format!("http://{addr}/v1"), rx)
    }

    fn buy(quantity: u64, price: f64) -> OrderIntent {
        OrderIntent { ticker: "MC".into(), quantity, side: Side::Buy, price, urgency: Urgency::Active }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let td = RitTd::new(&config("http://localhost:9999/v1/", "38M64LST")).unwrap();
        assert_eq!(td.url("/case"), "http://localhost:9999/v1/case");
    }

    #[test]
    fn invalid_api_key_is_a_config_error() {
        let err = RitTd::new(&config("http://localhost:9999/v1", "bad\nkey")).err().unwrap();
        assert!(matches!(err.downcast_ref::<RitError>(), Some(RitError::Config(_))));
    }

    #[tokio::test]
    async fn case_body_with_extra_fields_decodes() {
        let (url, request) = serve_once(
            "200 OK",
            r#"{"name":"Liquidity Risk","period":1,"tick":12,"ticks_per_period":300,"total_periods":1,"status":"ACTIVE","is_enforce_trading_limits":false}"#,
        )
        .await;
        let td = RitTd::new(&config(&url, "38M64LST")).unwrap();

        let case = td.get_case().await.unwrap();
        assert_eq!(case, Case { tick: 12, ticks_per_period: 300, status: SessionState::Active });

        let head = request.await.unwrap();
        assert!(head.starts_with("GET /v1/case "));
        assert!(head.to_ascii_lowercase().contains("x-api-key: 38m64lst"));
    }

    #[tokio::test]
    async fn book_body_decodes_levels() {
        let (url, request) = serve_once(
            "200 OK",
            r#"{"bids":[{"order_id":7,"period":1,"tick":10,"trader_id":"ANON","ticker":"MC","type":"LIMIT","quantity":5000,"action":"BUY","price":9.99,"quantity_filled":1000,"vwap":null,"status":"OPEN"}],"asks":[]}"#,
        )
        .await;
        let td = RitTd::new(&config(&url, "38M64LST")).unwrap();

        let book = td.get_book("MC").await.unwrap();
        assert_eq!(book.bids.len(), 1);
        assert_eq!(book.bids[0].order_id, 7);
        assert_eq!(book.bids[0].open_quantity(), 4_000.0);
        assert!(book.asks.is_empty());
        assert!(request.await.unwrap().starts_with("GET /v1/securities/book?ticker=MC "));
    }

    #[tokio::test]
    async fn server_error_is_an_http_error() {
        let (url, _request) = serve_once("500 Internal Server Error", "").await;
        let td = RitTd::new(&config(&url, "38M64LST")).unwrap();

        let err = td.get_case().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RitError>(),
            Some(RitError::Http { status: 500, endpoint }) if endpoint == "/case"
        ));
    }

    #[tokio::test]
    async fn undecodable_body_is_a_parse_error() {
        let (url, _request) = serve_once("200 OK", r#"{"unexpected":true}"#).await;
        let td = RitTd::new(&config(&url, "38M64LST")).unwrap();

        let err = td.get_securities("MC").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<RitError>(), Some(RitError::Parse(_))));
    }

    #[tokio::test]
    async fn accepted_order_returns_its_id() {
        let (url, request) = serve_once("200 OK", r#"{"order_id":1234,"ticker":"MC","status":"OPEN"}"#).await;
        let td = RitTd::new(&config(&url, "38M64LST")).unwrap();

        assert_eq!(td.insert_order(&buy(100, 10.01)).await.unwrap(), 1234);

        let head = request.await.unwrap();
        let line = head.lines().next().unwrap();
        assert!(line.starts_with("POST /v1/orders?"));
        for param in ["ticker=MC", "type=LIMIT", "quantity=100", "price=10.01", "action=BUY"] {
            assert!(line.contains(param), "{param} missing from {line}");
        }
    }

    #[tokio::test]
    async fn rejected_order_is_a_trading_error() {
        let (url, _request) =
            serve_once("429 Too Many Requests", r#"{"code":"TOO_MANY_REQUESTS","message":"slow down"}"#).await;
        let td = RitTd::new(&config(&url, "38M64LST")).unwrap();

        let err = td.insert_order(&buy(100, 10.01)).await.unwrap_err();
        match err.downcast_ref::<RitError>() {
            Some(RitError::Trading(msg)) => assert!(msg.contains("slow down")),
            other => panic!("expected a trading error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn accepted_order_without_id_is_a_parse_error() {
        let (url, _request) = serve_once("200 OK", r#"{"ticker":"MC"}"#).await;
        let td = RitTd::new(&config(&url, "38M64LST")).unwrap();

        let err = td.insert_order(&buy(100, 10.01)).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<RitError>(), Some(RitError::Parse(_))));
    }

    #[tokio::test]
    async fn cancel_accepts_an_empty_body() {
        let (url, request) = serve_once("200 OK", "").await;
        let td = RitTd::new(&config(&url, "38M64LST")).unwrap();

        td.cancel_all_orders("MC").await.unwrap();
        assert!(request.await.unwrap().starts_with("POST /v1/commands/cancel?ticker=MC "));
    }
}
