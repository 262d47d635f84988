// src/connectors/binance.rs
use crate::config::AppConfig;
use crate::connectors::messages::{
    BinanceErrorBody, BinanceOrder, ExchangeInfo, SymbolFilterEntry, SymbolInfo, Ticker24hr,
};
use crate::connectors::traits::{GatewayResult, MarketGateway};
use crate::error::GatewayError;
use crate::types::{MarketSnapshot, OrderAck, OrderStatus, Side, SymbolFilters};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// Which family of endpoint a request hit; decides how a 4xx is reported.
#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Market,
    Order,
}

pub struct BinanceClient {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_rest_url: String,
    recv_window_ms: u64,
    // Exchange filters rarely change mid-session, so they are cached for the
    // lifetime of the process.
    filters_cache: RwLock<HashMap<String, SymbolFilters>>,
}

impl BinanceClient {
    pub fn new(config: &AppConfig) -> GatewayResult<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            http_client,
            base_rest_url: config.base_url.trim_end_matches('/').to_string(),
            recv_window_ms: config.recv_window_ms,
            filters_cache: RwLock::new(HashMap::new()),
        })
    }

    fn sign(&self, query_string: &str) -> GatewayResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| GatewayError::DataInconsistency(format!("invalid secret key: {}", e)))?;
        mac.update(query_string.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn sign_and_build_query(&self, params: Vec<(&str, String)>) -> GatewayResult<String> {
        let mut params = params;
        params.push(("recvWindow", self.recv_window_ms.to_string()));
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let query_string = serde_urlencoded::to_string(&params)
            .map_err(|e| GatewayError::DataInconsistency(e.to_string()))?;
        let signature = self.sign(&query_string)?;

        Ok(format!("{}&signature={}", query_string, signature))
    }

    async fn send_public_request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_rest_url, endpoint);
        let response = self.http_client.get(&url).query(params).send().await?;
        decode(response, Endpoint::Market).await
    }

    async fn send_signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> GatewayResult<T> {
        let full_query = self.sign_and_build_query(params)?;
        let url = format!("{}{}?{}", self.base_rest_url, endpoint, full_query);

        let response = self
            .http_client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        decode(response, Endpoint::Order).await
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        price: Decimal,
        quantity: Decimal,
    ) -> GatewayResult<OrderAck> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("side", side.as_str().to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("quantity", quantity.to_string()),
            ("price", price.to_string()),
            ("newClientOrderId", uuid::Uuid::new_v4().simple().to_string()),
        ];

        info!(%symbol, %side, %price, %quantity, "Sending limit order");

        let resp: BinanceOrder = self
            .send_signed_request(Method::POST, "/api/v3/order", params)
            .await?;

        ack_from(resp)
    }

    async fn fetch_symbol_info(&self, symbol: &str) -> GatewayResult<SymbolInfo> {
        let info: ExchangeInfo = self
            .send_public_request("/api/v3/exchangeInfo", &[("symbol", symbol)])
            .await?;

        info.symbols
            .into_iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| {
                GatewayError::DataInconsistency(format!("{} missing from exchangeInfo", symbol))
            })
    }
}

#[async_trait]
impl MarketGateway for BinanceClient {
    async fn ping(&self) -> GatewayResult<()> {
        let _: serde_json::Value = self.send_public_request("/api/v3/ping", &[]).await?;
        Ok(())
    }

    async fn trading_symbols(&self, quote_asset: &str) -> GatewayResult<Vec<String>> {
        let info: ExchangeInfo = self.send_public_request("/api/v3/exchangeInfo", &[]).await?;

        Ok(info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING" && s.quote_asset == quote_asset)
            .map(|s| s.symbol)
            .collect())
    }

    async fn get_price_snapshot(&self, symbol: &str) -> GatewayResult<MarketSnapshot> {
        let ticker: Ticker24hr = self
            .send_public_request("/api/v3/ticker/24hr", &[("symbol", symbol)])
            .await?;

        Ok(MarketSnapshot {
            symbol: ticker.symbol,
            last_price: ticker.last_price,
            percent_change_24h: ticker.price_change_percent,
        })
    }

    async fn get_symbol_filters(&self, symbol: &str) -> GatewayResult<SymbolFilters> {
        if let Some(filters) = self.filters_cache.read().await.get(symbol) {
            return Ok(filters.clone());
        }

        let info = self.fetch_symbol_info(symbol).await?;
        let filters = filters_from_entries(symbol, &info.filters)?;
        debug!(%symbol, ?filters, "Cached symbol filters");

        self.filters_cache
            .write()
            .await
            .insert(symbol.to_string(), filters.clone());
        Ok(filters)
    }

    async fn place_limit_buy(
        &self,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
    ) -> GatewayResult<OrderAck> {
        self.place_limit_order(symbol, Side::Buy, price, quantity).await
    }

    async fn place_limit_sell(
        &self,
        symbol: &str,
        price: Decimal,
        quantity: Decimal,
    ) -> GatewayResult<OrderAck> {
        self.place_limit_order(symbol, Side::Sell, price, quantity).await
    }

    async fn get_order_status(&self, symbol: &str, order_id: &str) -> GatewayResult<OrderStatus> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        let resp: BinanceOrder = self
            .send_signed_request(Method::GET, "/api/v3/order", params)
            .await?;

        parse_status(&resp.status)
    }

    async fn get_open_orders(&self, symbol: &str) -> GatewayResult<Vec<OrderAck>> {
        let params = vec![("symbol", symbol.to_string())];
        let resp: Vec<BinanceOrder> = self
            .send_signed_request(Method::GET, "/api/v3/openOrders", params)
            .await?;

        resp.into_iter().map(ack_from).collect()
    }
}

/// Turns an HTTP response into `T` or a classified gateway error.
async fn decode<T: DeserializeOwned>(response: Response, endpoint: Endpoint) -> GatewayResult<T> {
    let status = response.status();

    // 418 is Binance's escalation after ignoring repeated 429s.
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(GatewayError::RateLimited { retry_after });
    }

    let body = response.text().await?;

    if status.is_server_error() {
        return Err(GatewayError::Network(format!("HTTP {}: {}", status, body)));
    }

    if status.is_client_error() {
        let (code, msg) = match serde_json::from_str::<BinanceErrorBody>(&body) {
            Ok(err) => (err.code, err.msg),
            Err(_) => (-(status.as_u16() as i64), body),
        };
        return Err(match endpoint {
            Endpoint::Order => GatewayError::OrderRejected { code, msg },
            Endpoint::Market => {
                GatewayError::DataInconsistency(format!("exchange error {}: {}", code, msg))
            }
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| GatewayError::DataInconsistency(format!("unexpected payload: {}", e)))
}

fn parse_status(status: &str) -> GatewayResult<OrderStatus> {
    OrderStatus::from_exchange(status)
        .ok_or_else(|| GatewayError::DataInconsistency(format!("unknown order status {}", status)))
}

fn ack_from(order: BinanceOrder) -> GatewayResult<OrderAck> {
    Ok(OrderAck {
        order_id: order.order_id.to_string(),
        status: parse_status(&order.status)?,
    })
}

fn filters_from_entries(symbol: &str, entries: &[SymbolFilterEntry]) -> GatewayResult<SymbolFilters> {
    let mut tick_size = None;
    let mut lot = None;
    let mut min_notional = Decimal::ZERO;

    for entry in entries {
        match entry {
            SymbolFilterEntry::Price { tick_size: t } => tick_size = Some(*t),
            SymbolFilterEntry::LotSize { step_size, min_qty } => lot = Some((*step_size, *min_qty)),
            SymbolFilterEntry::MinNotional { min_notional: n } => min_notional = *n,
            SymbolFilterEntry::Other => {}
        }
    }

    match (tick_size, lot) {
        (Some(tick_size), Some((step_size, min_qty))) => Ok(SymbolFilters {
            tick_size,
            step_size,
            min_qty,
            min_notional,
        }),
        _ => Err(GatewayError::DataInconsistency(format!(
            "{} lacks PRICE_FILTER or LOT_SIZE",
            symbol
        ))),
    }
}
