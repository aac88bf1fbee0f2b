//! # Registries
//!
//! The closed set of registry contracts and the immutable, shared description
//! of where they live and what they expose.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::ContractSpec;
use crate::abi::{Event, Function, Output, Token};
use crate::error::Err;
use crate::tracerr;
use crate::types::{Address, EventLog, TransactionKind};

const DID_REGISTRY: &[&str] = &[
    "function identityOwner(address identity) view returns (address)",
    "function changed(address identity) view returns (uint256)",
    "function nonce(address owner) view returns (uint256)",
    "function changeOwner(address identity, address newOwner)",
    "function changeOwnerSigned(address identity, uint8 sigV, bytes32 sigR, bytes32 sigS, address newOwner)",
    "function addDelegate(address identity, bytes32 delegateType, address delegate, uint256 validity)",
    "function addDelegateSigned(address identity, uint8 sigV, bytes32 sigR, bytes32 sigS, bytes32 delegateType, address delegate, uint256 validity)",
    "function revokeDelegate(address identity, bytes32 delegateType, address delegate)",
    "function revokeDelegateSigned(address identity, uint8 sigV, bytes32 sigR, bytes32 sigS, bytes32 delegateType, address delegate)",
    "function setAttribute(address identity, bytes32 name, bytes value, uint256 validity)",
    "function setAttributeSigned(address identity, uint8 sigV, bytes32 sigR, bytes32 sigS, bytes32 name, bytes value, uint256 validity)",
    "function revokeAttribute(address identity, bytes32 name, bytes value)",
    "function revokeAttributeSigned(address identity, uint8 sigV, bytes32 sigR, bytes32 sigS, bytes32 name, bytes value)",
    "event DIDOwnerChanged(address indexed identity, address owner, uint256 previousChange)",
    "event DIDDelegateChanged(address indexed identity, bytes32 delegateType, address delegate, uint256 validTo, uint256 previousChange)",
    "event DIDAttributeChanged(address indexed identity, bytes32 name, bytes value, uint256 validTo, uint256 previousChange)",
];

const SCHEMA_REGISTRY: &[&str] = &[
    "function createSchema(address identity, bytes32 id, string schema)",
    "function createSchemaSigned(address identity, uint8 sigV, bytes32 sigR, bytes32 sigS, bytes32 id, string schema)",
    "function created(bytes32 id) view returns (uint256)",
    "function nonce(address identity) view returns (uint256)",
    "event SchemaCreated(bytes32 indexed id, address identity, string schema)",
];

const CREDENTIAL_DEFINITION_REGISTRY: &[&str] = &[
    "function createCredentialDefinition(address identity, bytes32 id, bytes32 schemaId, string credDef)",
    "function createCredentialDefinitionSigned(address identity, uint8 sigV, bytes32 sigR, bytes32 sigS, bytes32 id, bytes32 schemaId, string credDef)",
    "function created(bytes32 id) view returns (uint256)",
    "function nonce(address identity) view returns (uint256)",
    "event CredentialDefinitionCreated(bytes32 indexed id, address identity, string credDef)",
];

const ROLE_CONTROL: &[&str] = &[
    "function assignRole(uint8 role, address account)",
    "function revokeRole(uint8 role, address account) returns (bool)",
    "function hasRole(uint8 role, address account) view returns (bool)",
    "function getRole(address account) view returns (uint8)",
];

const VALIDATOR_CONTROL: &[&str] = &[
    "function addValidator(address newValidator)",
    "function removeValidator(address validator)",
    "function getValidators() view returns (address[])",
];

/// Registry contracts exposed by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Registry {
    /// DID ownership, delegates and attributes.
    DidRegistry,

    /// Anoncreds schemas.
    SchemaRegistry,

    /// Anoncreds credential definitions.
    CredentialDefinitionRegistry,

    /// Account roles.
    RoleControl,

    /// Validator set.
    ValidatorControl,
}

impl Registry {
    /// Every registry.
    pub const ALL: [Self; 5] = [
        Self::DidRegistry,
        Self::SchemaRegistry,
        Self::CredentialDefinitionRegistry,
        Self::RoleControl,
        Self::ValidatorControl,
    ];

    /// Contract name of the canonical deployment.
    #[must_use]
    pub const fn contract_name(&self) -> &'static str {
        match self {
            Self::DidRegistry => "EthereumExtDidRegistry",
            Self::SchemaRegistry => "SchemaRegistry",
            Self::CredentialDefinitionRegistry => "CredentialDefinitionRegistry",
            Self::RoleControl => "RoleControl",
            Self::ValidatorControl => "ValidatorControl",
        }
    }

    /// The kind of transaction operations on this registry produce.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        match self {
            Self::DidRegistry => TransactionKind::Did,
            Self::SchemaRegistry => TransactionKind::Schema,
            Self::CredentialDefinitionRegistry => TransactionKind::CredentialDefinition,
            Self::RoleControl | Self::ValidatorControl => TransactionKind::Network,
        }
    }

    /// The built-in canonical spec.
    ///
    /// # Errors
    ///
    /// Will fail only if a built-in signature is malformed.
    pub fn canonical_spec(&self) -> crate::Result<ContractSpec> {
        let signatures = match self {
            Self::DidRegistry => DID_REGISTRY,
            Self::SchemaRegistry => SCHEMA_REGISTRY,
            Self::CredentialDefinitionRegistry => CREDENTIAL_DEFINITION_REGISTRY,
            Self::RoleControl => ROLE_CONTROL,
            Self::ValidatorControl => VALIDATOR_CONTROL,
        };
        ContractSpec::from_signatures(self.contract_name(), signatures)
    }
}

impl Display for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.contract_name())
    }
}

/// A deployed registry contract.
#[derive(Clone, Debug, PartialEq)]
pub struct Contract {
    /// Which registry.
    pub registry: Registry,

    /// Deployed address.
    pub address: Address,

    /// Methods and events.
    pub spec: ContractSpec,
}

impl Contract {
    /// A contract at `address` using the registry's built-in spec.
    ///
    /// # Errors
    ///
    /// Will fail only if a built-in signature is malformed.
    pub fn canonical(registry: Registry, address: Address) -> crate::Result<Self> {
        Ok(Self {
            registry,
            address,
            spec: registry.canonical_spec()?,
        })
    }

    /// Look up a method.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the contract has no such method.
    pub fn function(&self, name: &str) -> crate::Result<&Function> {
        self.spec.function(name)
    }

    /// Look up an event.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the contract has no such event.
    pub fn event(&self, name: &str) -> crate::Result<&Event> {
        self.spec.event(name)
    }

    /// Encode a call to `method`.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the method is unknown and
    /// `InvalidStructure` if the arguments do not match it.
    pub fn encode_call(&self, method: &str, args: &[Token]) -> crate::Result<Vec<u8>> {
        self.function(method)?.encode_input(args)
    }

    /// Decode the return data of a call to `method`.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the method is unknown and
    /// `InvalidStructure` if the data does not match its outputs.
    pub fn decode_output(&self, method: &str, data: &[u8]) -> crate::Result<Output> {
        Ok(self.function(method)?.decode_output(data)?.into())
    }

    /// Decode a log emitted by this contract as `event`.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the event is unknown or the log was
    /// emitted by another contract, and `InvalidStructure` if the log does
    /// not match the event.
    pub fn decode_log(&self, event: &str, log: &EventLog) -> crate::Result<Output> {
        if log.address != self.address {
            tracerr!(Err::InternalError, "log from {} is not from {}", log.address, self.registry);
        }
        Ok(self.event(event)?.decode_log(&log.topics, &log.data)?.into())
    }
}

/// The registry contracts of one ledger.
///
/// Constructed once and shared read-only by every builder and client.
#[derive(Clone, Debug, PartialEq)]
pub struct Registries {
    chain_id: u64,
    contracts: HashMap<Registry, Contract>,
}

impl Registries {
    /// Create a set of registries for the given chain.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if a registry is configured twice.
    pub fn new(chain_id: u64, contracts: Vec<Contract>) -> crate::Result<Self> {
        let mut map = HashMap::new();
        for contract in contracts {
            let registry = contract.registry;
            if map.insert(registry, contract).is_some() {
                tracerr!(Err::InvalidStructure, "{registry} is configured more than once");
            }
        }
        Ok(Self {
            chain_id,
            contracts: map,
        })
    }

    /// Create registries using the built-in specs at the given addresses.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if a registry is listed twice.
    pub fn canonical(
        chain_id: u64, addresses: impl IntoIterator<Item = (Registry, Address)>,
    ) -> crate::Result<Self> {
        let contracts = addresses
            .into_iter()
            .map(|(registry, address)| Contract::canonical(registry, address))
            .collect::<crate::Result<Vec<_>>>()?;
        Self::new(chain_id, contracts)
    }

    /// Chain the registries are deployed on.
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Look up a registry.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidState` if the registry is not configured.
    pub fn contract(&self, registry: Registry) -> crate::Result<&Contract> {
        let Some(contract) = self.contracts.get(&registry) else {
            tracerr!(Err::InvalidState, "{registry} is not configured");
        };
        Ok(contract)
    }

    /// Find the registry deployed at `address`.
    #[must_use]
    pub fn by_address(&self, address: &Address) -> Option<&Contract> {
        self.contracts.values().find(|c| &c.address == address)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::abi::ParamType;

    #[test]
    fn canonical_specs_parse() {
        for registry in Registry::ALL {
            let spec = registry.canonical_spec().expect("should parse");
            assert_eq!(spec.name, registry.contract_name());
        }
    }

    #[test]
    fn did_registry_surface() {
        let spec = Registry::DidRegistry.canonical_spec().expect("should parse");
        assert_eq!(
            spec.function("setAttribute").expect("should exist").signature(),
            "setAttribute(address,bytes32,bytes,uint256)"
        );
        assert_eq!(
            spec.function("setAttributeSigned").expect("should exist").signature(),
            "setAttributeSigned(address,uint8,bytes32,bytes32,bytes32,bytes,uint256)"
        );
        assert_eq!(
            spec.function("identityOwner").expect("should exist").outputs,
            vec![ParamType::Address]
        );
        assert_eq!(
            spec.event("DIDOwnerChanged").expect("should exist").signature(),
            "DIDOwnerChanged(address,address,uint256)"
        );
    }

    #[test]
    fn lookups() {
        let did = Address::new([0x33; 20]);
        let registries =
            Registries::canonical(1337, [(Registry::DidRegistry, did)]).expect("should build");
        assert_eq!(registries.chain_id(), 1337);
        assert_eq!(registries.by_address(&did).map(|c| c.registry), Some(Registry::DidRegistry));

        let err = registries.contract(Registry::SchemaRegistry).expect_err("not configured");
        assert!(err.is(Err::InvalidState));

        let err = Registries::canonical(1, [(Registry::RoleControl, did), (Registry::RoleControl, did)])
            .expect_err("duplicate");
        assert!(err.is(Err::InvalidStructure));
    }
}
