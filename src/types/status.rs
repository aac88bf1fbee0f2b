//! # Status
//!
//! Transaction lifecycle states, receipts and node health.

use serde::{Deserialize, Serialize};

use super::TxId;

/// Lifecycle state of a transaction.
///
/// `Built`, `Endorsing` and `Signed` describe a transaction before it reaches
/// the node; the remaining states are reported by
/// [`LedgerClient::status`](crate::LedgerClient::status).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum TransactionState {
    /// Built, nonce unset.
    Built,

    /// Waiting on the identity's endorsement.
    Endorsing,

    /// All required signatures attached.
    Signed,

    /// Handed to the node.
    Submitted,

    /// Known to the node but not yet mined.
    Pending,

    /// Mined successfully.
    Confirmed {
        /// Block the transaction was mined in.
        block: u64,
    },

    /// Mined but reverted.
    Reverted {
        /// Block the transaction was mined in.
        block: u64,

        /// Revert reason, when the node supplies it.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Still pending when the caller stopped waiting. Client-side only: the
    /// transaction may yet be mined.
    Expired,
}

impl TransactionState {
    /// Whether the state can no longer change on-chain.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::Reverted { .. })
    }
}

/// Receipt of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Transaction identifier.
    pub tx_id: TxId,

    /// Block the transaction was mined in.
    pub block_number: u64,

    /// `true` when execution succeeded.
    pub status: bool,

    /// Revert reason, when the node supplies it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
}

impl From<&Receipt> for TransactionState {
    fn from(receipt: &Receipt) -> Self {
        if receipt.status {
            Self::Confirmed {
                block: receipt.block_number,
            }
        } else {
            Self::Reverted {
                block: receipt.block_number,
                reason: receipt.revert_reason.clone(),
            }
        }
    }
}

/// Node health reported by [`LedgerClient::ping`](crate::LedgerClient::ping).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingStatus {
    /// Whether the node is usable.
    pub status: Status,

    /// Latest block, when the node answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// Health of the node.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    /// The node answered and is on the expected chain.
    Ok,

    /// The node is unreachable or misconfigured.
    Err {
        /// What went wrong.
        message: String,
    },
}

impl PingStatus {
    pub(crate) const fn ok(block_number: u64) -> Self {
        Self {
            status: Status::Ok,
            block_number: Some(block_number),
        }
    }

    pub(crate) fn err(message: impl Into<String>, block_number: Option<u64>) -> Self {
        Self {
            status: Status::Err {
                message: message.into(),
            },
            block_number,
        }
    }

    /// Whether the node is usable.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, Status::Ok)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn receipt_state() {
        let receipt = Receipt {
            tx_id: TxId::default(),
            block_number: 7,
            status: false,
            revert_reason: Some("not owner".into()),
        };
        let state = TransactionState::from(&receipt);
        assert!(state.is_final());
        assert_eq!(
            serde_json::to_value(&state).expect("should serialize"),
            serde_json::json!({"state": "reverted", "block": 7, "reason": "not owner"})
        );
    }

    #[test]
    fn ping_shape() {
        let ping = PingStatus::err("chain id mismatch", Some(3));
        assert!(!ping.is_ok());
        assert_eq!(
            serde_json::to_value(&ping).expect("should serialize"),
            serde_json::json!({"status": {"err": {"message": "chain id mismatch"}}, "blockNumber": 3})
        );
    }
}
