//! # Client Configuration
//!
//! JSON configuration describing the node, the chain and where each registry
//! is deployed.
//!
//! ```json
//! {
//!   "chainId": 1337,
//!   "nodeAddress": "http://127.0.0.1:8545",
//!   "contracts": [
//!     { "registry": "DidRegistry", "address": "0x0000000000000000000000000000000000003333" },
//!     { "registry": "SchemaRegistry", "address": "0x0000000000000000000000000000000000005555", "specPath": "SchemaRegistry.json" }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::{HttpNode, LedgerClient, DEFAULT_BLOCK_WINDOW, DEFAULT_POLL_INTERVAL};
use crate::contract::{Contract, ContractSpec, Registries, Registry};
use crate::error::Err;
use crate::tracerr;
use crate::types::{Address, ValidityClock};

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Chain the registries are deployed on.
    pub chain_id: u64,

    /// JSON-RPC endpoint of the node.
    pub node_address: String,

    /// Registry deployments.
    pub contracts: Vec<ContractConfig>,

    /// Maximum number of blocks per `get_logs` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_window: Option<u64>,

    /// Interval between status polls, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    /// What the DID registry counts validity in: `blockNumber` (default) or
    /// `timestamp`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity_clock: Option<ValidityClock>,
}

/// Where a registry is deployed and, optionally, the compiled artifact
/// describing it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractConfig {
    /// Which registry.
    pub registry: Registry,

    /// Deployed address.
    pub address: Address,

    /// Path to a compiled artifact (`{"contractName", "abi"}`). The built-in
    /// spec is used when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_path: Option<PathBuf>,

    /// Inline compiled artifact, used in preference to `specPath`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<serde_json::Value>,
}

impl ClientConfig {
    /// Parse configuration from JSON.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the JSON is malformed or the node
    /// address is not a URL.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: Self = match serde_json::from_str(json) {
            Ok(config) => config,
            Err(e) => tracerr!(Err::InvalidStructure, "invalid client configuration: {e}"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the file cannot be read or is
    /// invalid.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => tracerr!(Err::InvalidStructure, "cannot read {}: {e}", path.display()),
        };
        Self::from_json(&json)
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the node address is not a URL, no
    /// contracts are configured, or the block window is zero.
    pub fn validate(&self) -> crate::Result<()> {
        Url::parse(&self.node_address)?;
        if self.contracts.is_empty() {
            tracerr!(Err::InvalidStructure, "no registry contracts configured");
        }
        if self.block_window == Some(0) {
            tracerr!(Err::InvalidStructure, "block window must be positive");
        }
        Ok(())
    }

    /// Load every contract spec and build the registries.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if an artifact cannot be loaded or a
    /// registry is configured twice.
    pub fn registries(&self) -> crate::Result<Registries> {
        let contracts = self
            .contracts
            .iter()
            .map(ContractConfig::contract)
            .collect::<crate::Result<Vec<_>>>()?;
        Registries::new(self.chain_id, contracts)
    }

    /// Interval between status polls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_ms.map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis)
    }
}

impl ContractConfig {
    /// Load the contract's spec.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the artifact cannot be loaded.
    pub fn contract(&self) -> crate::Result<Contract> {
        let spec = if let Some(spec) = &self.spec {
            ContractSpec::from_artifact(&spec.to_string())?
        } else if let Some(path) = &self.spec_path {
            ContractSpec::from_file(path)?
        } else {
            self.registry.canonical_spec()?
        };
        tracing::debug!("loaded {} spec for {} at {}", spec.name, self.registry, self.address);
        Ok(Contract {
            registry: self.registry,
            address: self.address,
            spec,
        })
    }
}

impl LedgerClient<HttpNode> {
    /// Create a JSON-RPC client from configuration.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the configuration is invalid.
    pub fn from_config(config: &ClientConfig) -> crate::Result<Self> {
        config.validate()?;
        let node = HttpNode::new(&config.node_address)?;
        Ok(Self::new(node, config.registries()?)
            .block_window(config.block_window.unwrap_or(DEFAULT_BLOCK_WINDOW))
            .poll_interval(config.poll_interval())
            .validity_clock(config.validity_clock.unwrap_or_default()))
    }
}
