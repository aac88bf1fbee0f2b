//! # HTTP Node
//!
//! [`Node`] over Ethereum JSON-RPC.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use super::{Node, SignedPayload};
use crate::abi::revert_reason;
use crate::error::Err;
use crate::tracerr;
use crate::types::{Address, EventLog, LogFilter, Receipt, TxId};

/// JSON-RPC node client.
#[derive(Clone, Debug)]
pub struct HttpNode {
    url: Url,
    http_client: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

#[derive(Deserialize)]
struct RpcResponse {
    // `"result": null` is a result (a pending receipt); only absence is not
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<String>,
    data: String,
    block_number: String,
    transaction_index: String,
    log_index: String,
    #[serde(default)]
    transaction_hash: Option<TxId>,
    #[serde(default)]
    block_timestamp: Option<String>,
}

#[derive(Deserialize)]
struct RpcBlock {
    timestamp: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxId,
    block_number: String,
    status: String,
    #[serde(default)]
    revert_reason: Option<String>,
}

impl HttpNode {
    /// A client for the node at `node_address`.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the address is not a valid URL.
    pub fn new(node_address: &str) -> crate::Result<Self> {
        let url = Url::parse(node_address)?;
        Ok(Self {
            url,
            http_client: reqwest::Client::new(),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// The node's URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> crate::Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("json-rpc request {id}: {method}");

        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        let response = match self.http_client.post(self.url.clone()).json(&body).send().await {
            Ok(res) => res,
            Err(e) => tracerr!(Err::NetworkError, "{method} request failed: {e}"),
        };
        if !response.status().is_success() {
            tracerr!(Err::NetworkError, "{method} returned HTTP {}", response.status());
        }
        let response: RpcResponse = match response.json().await {
            Ok(res) => res,
            Err(e) => tracerr!(Err::InternalError, "{method} returned a malformed response: {e}"),
        };

        if let Some(error) = response.error {
            let reason = error.reason();
            tracerr!(Err::ContractError, "{method} failed ({}): {reason}", error.code);
        }
        let Some(result) = response.result else {
            tracerr!(Err::InternalError, "{method} returned no result");
        };
        match serde_json::from_value(result) {
            Ok(value) => Ok(value),
            Err(e) => tracerr!(Err::InternalError, "{method} returned an unexpected result: {e}"),
        }
    }
}

impl RpcError {
    // prefer the decoded revert message when the node returns revert data
    fn reason(&self) -> String {
        let decoded = self
            .data
            .as_ref()
            .and_then(Value::as_str)
            .and_then(try_hex)
            .and_then(|data| revert_reason(&data));
        decoded.unwrap_or_else(|| self.message.clone())
    }
}

impl Node for HttpNode {
    async fn call(&self, to: &Address, data: &[u8]) -> crate::Result<Vec<u8>> {
        let params = json!([{"to": to, "data": format!("0x{}", hex::encode(data))}, "latest"]);
        let result: String = self.request("eth_call", params).await?;
        hex_data(&result)
    }

    async fn get_logs(&self, filter: &LogFilter) -> crate::Result<Vec<EventLog>> {
        let topics = filter
            .topics
            .iter()
            .map(|allowed| {
                allowed.as_ref().map_or(Value::Null, |values| {
                    values.iter().map(|t| Value::String(format!("0x{}", hex::encode(t)))).collect()
                })
            })
            .collect::<Vec<_>>();
        let params = json!([{
            "address": filter.address,
            "topics": topics,
            "fromBlock": format!("{:#x}", filter.from_block),
            "toBlock": format!("{:#x}", filter.to_block),
        }]);

        let logs: Vec<RpcLog> = self.request("eth_getLogs", params).await?;
        logs.into_iter().map(RpcLog::into_event_log).collect()
    }

    async fn send_transaction(&self, payload: &SignedPayload) -> crate::Result<TxId> {
        let params = json!([format!("0x{}", hex::encode(&payload.raw))]);
        self.request("eth_sendRawTransaction", params).await
    }

    async fn get_receipt(&self, tx_id: &TxId) -> crate::Result<Option<Receipt>> {
        let receipt: Option<RpcReceipt> =
            self.request("eth_getTransactionReceipt", json!([tx_id])).await?;
        receipt.map(RpcReceipt::into_receipt).transpose()
    }

    async fn block_number(&self) -> crate::Result<u64> {
        let result: String = self.request("eth_blockNumber", json!([])).await?;
        quantity(&result)
    }

    async fn block_timestamp(&self, block: u64) -> crate::Result<u64> {
        let params = json!([format!("{block:#x}"), false]);
        let result: Option<RpcBlock> = self.request("eth_getBlockByNumber", params).await?;
        let Some(result) = result else {
            tracerr!(Err::InvalidStructure, "block {block} has not been produced");
        };
        quantity(&result.timestamp)
    }

    async fn transaction_count(&self, account: &Address) -> crate::Result<u64> {
        let result: String =
            self.request("eth_getTransactionCount", json!([account, "pending"])).await?;
        quantity(&result)
    }

    async fn chain_id(&self) -> crate::Result<u64> {
        let result: String = self.request("eth_chainId", json!([])).await?;
        quantity(&result)
    }
}

impl RpcLog {
    fn into_event_log(self) -> crate::Result<EventLog> {
        let topics = self
            .topics
            .iter()
            .map(|t| {
                let bytes = hex_data(t)?;
                let Ok(topic) = <[u8; 32]>::try_from(bytes.as_slice()) else {
                    tracerr!(Err::InternalError, "log topic is not 32 bytes: {t}");
                };
                Ok(topic)
            })
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(EventLog {
            address: self.address,
            topics,
            data: hex_data(&self.data)?,
            block_number: quantity(&self.block_number)?,
            transaction_index: quantity(&self.transaction_index)?,
            log_index: quantity(&self.log_index)?,
            transaction_hash: self.transaction_hash,
            block_timestamp: self.block_timestamp.as_deref().map(quantity).transpose()?,
        })
    }
}

impl RpcReceipt {
    fn into_receipt(self) -> crate::Result<Receipt> {
        let status = quantity(&self.status)? == 1;
        let reason = self.revert_reason.map(|raw| {
            try_hex(&raw).and_then(|data| revert_reason(&data)).unwrap_or(raw)
        });
        Ok(Receipt {
            tx_id: self.transaction_hash,
            block_number: quantity(&self.block_number)?,
            status,
            revert_reason: reason,
        })
    }
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn quantity(value: &str) -> crate::Result<u64> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    match u64::from_str_radix(digits, 16) {
        Ok(n) => Ok(n),
        Err(e) => tracerr!(Err::InternalError, "invalid quantity {value}: {e}"),
    }
}

fn try_hex(value: &str) -> Option<Vec<u8>> {
    hex::decode(value.strip_prefix("0x")?).ok()
}

fn hex_data(value: &str) -> crate::Result<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    match hex::decode(digits) {
        Ok(data) => Ok(data),
        Err(e) => tracerr!(Err::InternalError, "invalid hex data {value}: {e}"),
    }
}
