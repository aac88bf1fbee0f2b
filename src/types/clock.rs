//! # Validity Clock
//!
//! What a registry measures delegate and attribute validity against.

use serde::{Deserialize, Serialize};

/// The unit of a registry's validity windows.
///
/// A window of `validity` set in block `b` ends at `b + validity` on
/// block-numbered registries, and at `timestamp(b) + validity` on registries
/// that count in seconds, like the reference `EthereumDIDRegistry`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidityClock {
    /// Validity is counted in blocks.
    #[default]
    BlockNumber,

    /// Validity is counted in seconds of block time.
    Timestamp,
}
