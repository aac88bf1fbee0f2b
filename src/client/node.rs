//! # Node
//!
//! The boundary between the client and a ledger node. Implementations own the
//! transport; the client owns everything above it.

use std::future::Future;

use crate::error::Err;
use crate::tracerr;
use crate::types::{Address, EventLog, LogFilter, Receipt, Transaction, TxId};

/// A ledger node.
///
/// Implementers map transport failures to `NetworkError`, execution failures
/// (reverts, rejected nonces) to `ContractError` and malformed responses to
/// `InternalError`.
pub trait Node: Send + Sync + Clone {
    /// Execute a read-only call against the latest block.
    fn call(&self, to: &Address, data: &[u8]) -> impl Future<Output = crate::Result<Vec<u8>>> + Send;

    /// Logs matching `filter`, in any order.
    fn get_logs(
        &self, filter: &LogFilter,
    ) -> impl Future<Output = crate::Result<Vec<EventLog>>> + Send;

    /// Submit a signed transaction, returning its id.
    fn send_transaction(
        &self, payload: &SignedPayload,
    ) -> impl Future<Output = crate::Result<TxId>> + Send;

    /// The receipt of a mined transaction, `None` while it is pending or
    /// unknown.
    fn get_receipt(
        &self, tx_id: &TxId,
    ) -> impl Future<Output = crate::Result<Option<Receipt>>> + Send;

    /// Latest block number.
    fn block_number(&self) -> impl Future<Output = crate::Result<u64>> + Send;

    /// Timestamp of `block`, in seconds. Blocks beyond the chain head are
    /// `InvalidStructure`.
    fn block_timestamp(&self, block: u64) -> impl Future<Output = crate::Result<u64>> + Send;

    /// Account nonce: the number of transactions sent from `account`.
    fn transaction_count(
        &self, account: &Address,
    ) -> impl Future<Output = crate::Result<u64>> + Send;

    /// The node's chain id.
    fn chain_id(&self) -> impl Future<Output = crate::Result<u64>> + Send;
}

/// A complete transaction ready for the node.
///
/// Nodes that speak JSON-RPC only need `raw`; the decoded fields are carried
/// alongside so in-process nodes need not parse the envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedPayload {
    /// Sender account.
    pub from: Address,

    /// Target contract.
    pub to: Address,

    /// Sender account nonce.
    pub nonce: u64,

    /// Call data.
    pub data: Vec<u8>,

    /// Signed RLP envelope.
    pub raw: Vec<u8>,

    /// Transaction id.
    pub tx_id: TxId,
}

impl TryFrom<&Transaction> for SignedPayload {
    type Error = crate::Error;

    fn try_from(tx: &Transaction) -> crate::Result<Self> {
        let (Some(from), Some(nonce)) = (tx.from(), tx.nonce()) else {
            tracerr!(Err::InvalidState, "transaction has no sender or nonce");
        };
        let raw = tx.raw()?;
        Ok(Self {
            from: *from,
            to: *tx.to(),
            nonce,
            data: tx.data().to_vec(),
            tx_id: tx.tx_id()?,
            raw,
        })
    }
}
