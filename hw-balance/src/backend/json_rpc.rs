//! Ethereum-style JSON-RPC balance backend
//!
//! Native balances come from `eth_getBalance`, governance token balances from an
//! `eth_call` of ERC-20 `balanceOf(address)`.

use super::BalanceBackend;
use crate::config::BalanceConfig;
use crate::error::{BalanceError, BalanceResult};
use crate::summary::BalanceSummary;
use async_trait::async_trait;
use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// `balanceOf(address)` function selector
pub const ERC20_BALANCE_OF_SELECTOR: &str = "70a08231";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Balance backend talking to a node over JSON-RPC
pub struct JsonRpcBalanceBackend {
    base_address: Url,
    http_client: Client,
    governance_token: String,
    native_decimals: u32,
    governance_decimals: u32,
    next_id: AtomicU64,
}

impl JsonRpcBalanceBackend {
    /// Creates a backend from validated settings
    pub fn new(config: &BalanceConfig) -> BalanceResult<Self> {
        config.validate()?;

        let base_address = Url::parse(&config.endpoint)
            .map_err(|e| BalanceError::Config(format!("invalid endpoint: {}", e)))?;
        let http_client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| BalanceError::Http(format!("failed to build client: {}", e)))?;
        let governance_token = normalize_address(&config.governance_token)?;

        Ok(Self {
            base_address,
            http_client,
            governance_token,
            native_decimals: config.native_decimals,
            governance_decimals: config.governance_decimals,
            next_id: AtomicU64::new(1),
        })
    }

    /// Sends a request and returns its `result` member
    async fn rpc_send(&self, method: &str, params: Value) -> BalanceResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(self.base_address.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| BalanceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BalanceError::Http(format!("{} returned {}", method, status)));
        }

        let content = response
            .text()
            .await
            .map_err(|e| BalanceError::Http(format!("failed to read response: {}", e)))?;
        let parsed: RpcResponse = serde_json::from_str(&content)
            .map_err(|e| BalanceError::InvalidResponse(format!("parse error: {}", e)))?;

        if let Some(error) = parsed.error {
            return Err(BalanceError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        parsed
            .result
            .ok_or_else(|| BalanceError::InvalidResponse(format!("{} returned no result", method)))
    }

    /// Native token balance of `address`
    pub async fn native_balance(&self, address: &str) -> BalanceResult<Decimal> {
        let address = normalize_address(address)?;
        let result = self
            .rpc_send("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity(as_str(&result, "eth_getBalance")?, self.native_decimals)
    }

    /// Governance token balance of `address`
    pub async fn governance_balance(&self, address: &str) -> BalanceResult<Decimal> {
        let address = normalize_address(address)?;
        let data = format!(
            "0x{}{:0>64}",
            ERC20_BALANCE_OF_SELECTOR,
            address.trim_start_matches("0x")
        );
        let call = json!({ "to": self.governance_token, "data": data });
        let result = self.rpc_send("eth_call", json!([call, "latest"])).await?;
        parse_quantity(as_str(&result, "eth_call")?, self.governance_decimals)
    }
}

#[async_trait]
impl BalanceBackend for JsonRpcBalanceBackend {
    async fn balance_of(&self, address: &str) -> BalanceResult<BalanceSummary> {
        let (native, governance) = tokio::try_join!(
            self.native_balance(address),
            self.governance_balance(address)
        )?;
        Ok(BalanceSummary::new(native, governance))
    }
}

fn as_str<'a>(value: &'a Value, method: &str) -> BalanceResult<&'a str> {
    value.as_str().ok_or_else(|| {
        BalanceError::InvalidResponse(format!("{} result is not a string: {}", method, value))
    })
}

/// Lower-cased `0x`-prefixed 20-byte address
fn normalize_address(address: &str) -> BalanceResult<String> {
    let body = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BalanceError::InvalidAddress(address.to_string()));
    }
    Ok(format!("0x{}", body.to_ascii_lowercase()))
}

/// Convert a hex quantity in base units to a whole-token decimal
///
/// `"0x"` (empty return data) is read as zero. The raw amount must fit the
/// 96-bit mantissa of [`Decimal`]: anything above `2^96 - 1` base units (about
/// 7.9e10 whole tokens at 18 decimals) is [`BalanceError::Overflow`], and the
/// enricher then fails the whole page.
pub fn parse_quantity(hex: &str, decimals: u32) -> BalanceResult<Decimal> {
    let body = hex
        .strip_prefix("0x")
        .ok_or_else(|| BalanceError::InvalidResponse(format!("missing 0x prefix: {}", hex)))?;
    let digits = body.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(Decimal::ZERO);
    }
    if digits.len() > 32 {
        return Err(BalanceError::Overflow(hex.to_string()));
    }

    let raw = u128::from_str_radix(digits, 16)
        .map_err(|e| BalanceError::InvalidResponse(format!("bad quantity {}: {}", hex, e)))?;
    let raw = i128::try_from(raw).map_err(|_| BalanceError::Overflow(hex.to_string()))?;

    Decimal::try_from_i128_with_scale(raw, decimals)
        .map(|d| d.normalize())
        .map_err(|_| BalanceError::Overflow(hex.to_string()))
}
