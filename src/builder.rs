//! # Transaction Builder
//!
//! Domain operations and read-only queries as closed enumerations, and the
//! builder that turns them into unsigned [`Transaction`]s. Building is pure:
//! nothing here touches the network.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::abi::Token;
use crate::anoncreds::{CredentialDefinition, Schema};
use crate::contract::{Registries, Registry};
use crate::did::{DelegateType, DidAttribute};
use crate::error::Err;
use crate::network::Role;
use crate::tracerr;
use crate::types::{
    Address, Authorization, DEFAULT_GAS, Endorsement, Signatures, Transaction,
    TransactionEndorsingData, TransactionType,
};

/// A state-changing registry operation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum Operation {
    /// Transfer control of an identity.
    #[serde(rename_all = "camelCase")]
    ChangeOwner {
        /// Identity whose owner changes.
        identity: Address,

        /// The new owner. The null address deactivates the DID.
        new_owner: Address,
    },

    /// Add a delegate for `validity` blocks.
    #[serde(rename_all = "camelCase")]
    AddDelegate {
        /// Identity the delegate acts for.
        identity: Address,

        /// What the delegate may do.
        delegate_type: DelegateType,

        /// Delegate account.
        delegate: Address,

        /// Number of blocks the delegate remains valid for.
        validity: u64,
    },

    /// Revoke a delegate.
    #[serde(rename_all = "camelCase")]
    RevokeDelegate {
        /// Identity the delegate acts for.
        identity: Address,

        /// What the delegate may do.
        delegate_type: DelegateType,

        /// Delegate account.
        delegate: Address,
    },

    /// Set an attribute for `validity` blocks.
    SetAttribute {
        /// Identity the attribute belongs to.
        identity: Address,

        /// Attribute name and value.
        attribute: DidAttribute,

        /// Number of blocks the attribute remains valid for.
        validity: u64,
    },

    /// Revoke an attribute.
    RevokeAttribute {
        /// Identity the attribute belongs to.
        identity: Address,

        /// Attribute name and value.
        attribute: DidAttribute,
    },

    /// Create a schema. The identity is the schema's issuer.
    CreateSchema {
        /// The schema.
        schema: Schema,
    },

    /// Create a credential definition. The identity is the definition's
    /// issuer.
    #[serde(rename_all = "camelCase")]
    CreateCredentialDefinition {
        /// The credential definition.
        credential_definition: CredentialDefinition,
    },

    /// Assign a role to an account.
    AssignRole {
        /// Role to assign.
        role: Role,

        /// Account receiving the role.
        account: Address,
    },

    /// Revoke a role from an account.
    RevokeRole {
        /// Role to revoke.
        role: Role,

        /// Account losing the role.
        account: Address,
    },

    /// Add a validator node.
    AddValidator {
        /// Validator account.
        validator: Address,
    },

    /// Remove a validator node.
    RemoveValidator {
        /// Validator account.
        validator: Address,
    },
}

impl Operation {
    /// Registry the operation targets.
    #[must_use]
    pub const fn registry(&self) -> Registry {
        match self {
            Self::ChangeOwner { .. }
            | Self::AddDelegate { .. }
            | Self::RevokeDelegate { .. }
            | Self::SetAttribute { .. }
            | Self::RevokeAttribute { .. } => Registry::DidRegistry,
            Self::CreateSchema { .. } => Registry::SchemaRegistry,
            Self::CreateCredentialDefinition { .. } => Registry::CredentialDefinitionRegistry,
            Self::AssignRole { .. } | Self::RevokeRole { .. } => Registry::RoleControl,
            Self::AddValidator { .. } | Self::RemoveValidator { .. } => Registry::ValidatorControl,
        }
    }

    /// Contract method the operation calls.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::ChangeOwner { .. } => "changeOwner",
            Self::AddDelegate { .. } => "addDelegate",
            Self::RevokeDelegate { .. } => "revokeDelegate",
            Self::SetAttribute { .. } => "setAttribute",
            Self::RevokeAttribute { .. } => "revokeAttribute",
            Self::CreateSchema { .. } => "createSchema",
            Self::CreateCredentialDefinition { .. } => "createCredentialDefinition",
            Self::AssignRole { .. } => "assignRole",
            Self::RevokeRole { .. } => "revokeRole",
            Self::AddValidator { .. } => "addValidator",
            Self::RemoveValidator { .. } => "removeValidator",
        }
    }

    /// The identity the operation acts for. Role and validator operations act
    /// for no identity and cannot be endorsed.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if an issuer id is not a valid DID.
    pub fn identity(&self) -> crate::Result<Option<Address>> {
        let identity = match self {
            Self::ChangeOwner { identity, .. }
            | Self::AddDelegate { identity, .. }
            | Self::RevokeDelegate { identity, .. }
            | Self::SetAttribute { identity, .. }
            | Self::RevokeAttribute { identity, .. } => Some(*identity),
            Self::CreateSchema { schema } => Some(schema.issuer()?.identity),
            Self::CreateCredentialDefinition {
                credential_definition,
            } => Some(credential_definition.issuer()?.identity),
            Self::AssignRole { .. }
            | Self::RevokeRole { .. }
            | Self::AddValidator { .. }
            | Self::RemoveValidator { .. } => None,
        };
        Ok(identity)
    }

    /// Method arguments following the identity (all arguments for operations
    /// without an identity).
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if an attribute name does not fit in
    /// 32 bytes, or with `InternalError` if an anoncreds object cannot be
    /// serialized.
    pub fn arguments(&self) -> crate::Result<Vec<Token>> {
        let args = match self {
            Self::ChangeOwner { new_owner, .. } => vec![Token::Address(*new_owner)],
            Self::AddDelegate {
                delegate_type,
                delegate,
                validity,
                ..
            } => vec![
                Token::FixedBytes(delegate_type.bytes32().to_vec()),
                Token::Address(*delegate),
                Token::uint(*validity),
            ],
            Self::RevokeDelegate {
                delegate_type,
                delegate,
                ..
            } => vec![Token::FixedBytes(delegate_type.bytes32().to_vec()), Token::Address(*delegate)],
            Self::SetAttribute {
                attribute,
                validity,
                ..
            } => vec![
                Token::FixedBytes(attribute.name_bytes32()?.to_vec()),
                Token::Bytes(attribute.value().to_vec()),
                Token::uint(*validity),
            ],
            Self::RevokeAttribute { attribute, .. } => vec![
                Token::FixedBytes(attribute.name_bytes32()?.to_vec()),
                Token::Bytes(attribute.value().to_vec()),
            ],
            Self::CreateSchema { schema } => vec![
                Token::FixedBytes(schema.id().hash().to_vec()),
                Token::String(schema.to_json()?),
            ],
            Self::CreateCredentialDefinition {
                credential_definition,
            } => vec![
                Token::FixedBytes(credential_definition.id().hash().to_vec()),
                Token::FixedBytes(credential_definition.schema_id.hash().to_vec()),
                Token::String(credential_definition.to_json()?),
            ],
            Self::AssignRole { role, account } | Self::RevokeRole { role, account } => {
                vec![Token::uint(u64::from(role.as_u8())), Token::Address(*account)]
            }
            Self::AddValidator { validator } | Self::RemoveValidator { validator } => {
                vec![Token::Address(*validator)]
            }
        };
        Ok(args)
    }

    /// The full argument list of the unsigned method.
    ///
    /// # Errors
    ///
    /// Will fail as [`Operation::arguments`] does.
    pub fn call_arguments(&self) -> crate::Result<Vec<Token>> {
        let mut args = Vec::new();
        if let Some(identity) = self.identity()? {
            args.push(Token::Address(identity));
        }
        args.extend(self.arguments()?);
        Ok(args)
    }

    /// Check structural preconditions.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if a validity is zero, a role is
    /// `Empty`, a required account is the null address, or an anoncreds
    /// object is malformed.
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            Self::ChangeOwner { identity, .. }
            | Self::RevokeDelegate { identity, .. }
            | Self::RevokeAttribute { identity, .. } => non_null(identity, "identity"),
            Self::AddDelegate {
                identity,
                delegate,
                validity,
                ..
            } => {
                non_null(identity, "identity")?;
                non_null(delegate, "delegate")?;
                positive(*validity)
            }
            Self::SetAttribute {
                identity,
                attribute,
                validity,
            } => {
                non_null(identity, "identity")?;
                attribute.name_bytes32()?;
                positive(*validity)
            }
            Self::CreateSchema { schema } => schema.validate(),
            Self::CreateCredentialDefinition {
                credential_definition,
            } => credential_definition.validate(),
            Self::AssignRole { role, account } | Self::RevokeRole { role, account } => {
                if *role == Role::Empty {
                    tracerr!(Err::InvalidStructure, "cannot assign or revoke the empty role");
                }
                non_null(account, "account")
            }
            Self::AddValidator { validator } | Self::RemoveValidator { validator } => {
                non_null(validator, "validator")
            }
        }
    }
}

fn non_null(address: &Address, what: &str) -> crate::Result<()> {
    if address.is_null() {
        tracerr!(Err::InvalidStructure, "{what} must not be the null address");
    }
    Ok(())
}

fn positive(validity: u64) -> crate::Result<()> {
    if validity == 0 {
        tracerr!(Err::InvalidStructure, "validity must be greater than zero");
    }
    Ok(())
}

/// A read-only registry query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    /// Registry nonce of an account, consumed by endorsed operations.
    Nonce {
        /// Registry keeping the nonce.
        registry: Registry,

        /// Account the nonce is keyed by.
        account: Address,
    },

    /// Current owner of an identity.
    IdentityOwner {
        /// The identity.
        identity: Address,
    },

    /// Block of the identity's last change; zero if never changed.
    Changed {
        /// The identity.
        identity: Address,
    },

    /// Block a schema was created in; zero if it does not exist.
    SchemaCreated {
        /// Schema id hash.
        id: [u8; 32],
    },

    /// Block a credential definition was created in; zero if it does not
    /// exist.
    CredentialDefinitionCreated {
        /// Credential definition id hash.
        id: [u8; 32],
    },

    /// An account's role.
    GetRole {
        /// The account.
        account: Address,
    },

    /// Whether an account has a role.
    HasRole {
        /// The role.
        role: Role,

        /// The account.
        account: Address,
    },

    /// The validator set.
    GetValidators,
}

impl Query {
    /// Registry the query reads.
    #[must_use]
    pub const fn registry(&self) -> Registry {
        match self {
            Self::Nonce { registry, .. } => *registry,
            Self::IdentityOwner { .. } | Self::Changed { .. } => Registry::DidRegistry,
            Self::SchemaCreated { .. } => Registry::SchemaRegistry,
            Self::CredentialDefinitionCreated { .. } => Registry::CredentialDefinitionRegistry,
            Self::GetRole { .. } | Self::HasRole { .. } => Registry::RoleControl,
            Self::GetValidators => Registry::ValidatorControl,
        }
    }

    /// Contract method the query calls.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Nonce { .. } => "nonce",
            Self::IdentityOwner { .. } => "identityOwner",
            Self::Changed { .. } => "changed",
            Self::SchemaCreated { .. } | Self::CredentialDefinitionCreated { .. } => "created",
            Self::GetRole { .. } => "getRole",
            Self::HasRole { .. } => "hasRole",
            Self::GetValidators => "getValidators",
        }
    }

    /// Method arguments.
    #[must_use]
    pub fn arguments(&self) -> Vec<Token> {
        match self {
            Self::Nonce { account, .. } | Self::GetRole { account } => {
                vec![Token::Address(*account)]
            }
            Self::IdentityOwner { identity } | Self::Changed { identity } => {
                vec![Token::Address(*identity)]
            }
            Self::SchemaCreated { id } | Self::CredentialDefinitionCreated { id } => {
                vec![Token::FixedBytes(id.to_vec())]
            }
            Self::HasRole { role, account } => {
                vec![Token::uint(u64::from(role.as_u8())), Token::Address(*account)]
            }
            Self::GetValidators => vec![],
        }
    }

    /// Decode the return data of the query.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the data does not match the
    /// method's outputs and `InternalError` if the values are not what the
    /// query returns.
    pub fn parse(&self, registries: &Registries, data: &[u8]) -> crate::Result<QueryOutput> {
        tracing::debug!("Query::parse: {}.{}", self.registry(), self.method());

        let output = registries.contract(self.registry())?.decode_output(self.method(), data)?;
        let parsed = match self {
            Self::Nonce { .. } => QueryOutput::Nonce(output.uint(0)?),
            Self::IdentityOwner { .. } => QueryOutput::Owner(output.address(0)?),
            Self::Changed { .. }
            | Self::SchemaCreated { .. }
            | Self::CredentialDefinitionCreated { .. } => QueryOutput::Block(output.u64(0)?),
            Self::GetRole { .. } => QueryOutput::Role(Role::try_from(output.u8(0)?)?),
            Self::HasRole { .. } => QueryOutput::HasRole(output.bool(0)?),
            Self::GetValidators => QueryOutput::Validators(output.address_array(0)?),
        };
        Ok(parsed)
    }
}

/// Typed result of a [`Query`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryOutput {
    /// Registry nonce.
    Nonce(U256),

    /// Identity owner.
    Owner(Address),

    /// Block number marker.
    Block(u64),

    /// Account role.
    Role(Role),

    /// Role membership.
    HasRole(bool),

    /// Validator set.
    Validators(Vec<Address>),
}

impl QueryOutput {
    /// Registry nonce.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the output is not a nonce.
    pub fn nonce(&self) -> crate::Result<U256> {
        let Self::Nonce(nonce) = self else {
            tracerr!(Err::InternalError, "expected a nonce, got {self:?}");
        };
        Ok(*nonce)
    }

    /// Identity owner.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the output is not an owner.
    pub fn owner(&self) -> crate::Result<Address> {
        let Self::Owner(owner) = self else {
            tracerr!(Err::InternalError, "expected an owner, got {self:?}");
        };
        Ok(*owner)
    }

    /// Block number marker.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the output is not a block number.
    pub fn block(&self) -> crate::Result<u64> {
        let Self::Block(block) = self else {
            tracerr!(Err::InternalError, "expected a block number, got {self:?}");
        };
        Ok(*block)
    }

    /// Account role.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the output is not a role.
    pub fn role(&self) -> crate::Result<Role> {
        let Self::Role(role) = self else {
            tracerr!(Err::InternalError, "expected a role, got {self:?}");
        };
        Ok(*role)
    }

    /// Role membership.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the output is not a membership flag.
    pub fn has_role(&self) -> crate::Result<bool> {
        let Self::HasRole(has_role) = self else {
            tracerr!(Err::InternalError, "expected a role membership, got {self:?}");
        };
        Ok(*has_role)
    }

    /// Validator set.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if the output is not a validator set.
    pub fn validators(self) -> crate::Result<Vec<Address>> {
        let Self::Validators(validators) = self else {
            tracerr!(Err::InternalError, "expected a validator set, got {self:?}");
        };
        Ok(validators)
    }
}

/// Builds unsigned transactions against a set of registries.
#[derive(Clone, Debug)]
pub struct TransactionBuilder<'a> {
    registries: &'a Registries,
    sender: Option<Address>,
    nonce: Option<u64>,
    gas: u64,
    gas_price: u64,
}

impl<'a> TransactionBuilder<'a> {
    /// A builder with default gas settings and no sender.
    #[must_use]
    pub const fn new(registries: &'a Registries) -> Self {
        Self {
            registries,
            sender: None,
            nonce: None,
            gas: DEFAULT_GAS,
            gas_price: 0,
        }
    }

    /// Account sending (and signing) the transaction. Defaults to the
    /// operation's identity.
    #[must_use]
    pub const fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Pre-fill the sender's account nonce.
    #[must_use]
    pub const fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Gas limit.
    #[must_use]
    pub const fn gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    /// Gas price.
    #[must_use]
    pub const fn gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Build a direct (self-signed) transaction for `operation`.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the operation is malformed or has
    /// no sender, and with `InvalidState` if its registry is not configured.
    pub fn build(&self, operation: &Operation) -> crate::Result<Transaction> {
        tracing::debug!("TransactionBuilder::build: {}", operation.method());

        operation.validate()?;
        let contract = self.registries.contract(operation.registry())?;
        let data = contract.encode_call(operation.method(), &operation.call_arguments()?)?;

        let Some(from) = self.sender.or(operation.identity()?) else {
            tracerr!(Err::InvalidStructure, "{} requires a sender", operation.method());
        };

        Ok(Transaction {
            type_: TransactionType::Write,
            kind: operation.registry().kind(),
            from: Some(from),
            to: contract.address,
            nonce: self.nonce,
            chain_id: self.registries.chain_id(),
            data,
            gas: self.gas,
            gas_price: self.gas_price,
            authorization: Authorization::Direct,
            signatures: Signatures::default(),
            endorsement: None,
        })
    }

    /// Build a read-only call for `query`.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidState` if the query's registry is not configured.
    pub fn build_query(&self, query: &Query) -> crate::Result<Transaction> {
        tracing::debug!("TransactionBuilder::build_query: {}", query.method());

        let contract = self.registries.contract(query.registry())?;
        let data = contract.encode_call(query.method(), &query.arguments())?;

        Ok(Transaction {
            type_: TransactionType::Read,
            kind: query.registry().kind(),
            from: self.sender,
            to: contract.address,
            nonce: None,
            chain_id: self.registries.chain_id(),
            data,
            gas: self.gas,
            gas_price: self.gas_price,
            authorization: Authorization::Direct,
            signatures: Signatures::default(),
            endorsement: None,
        })
    }

    /// Build a sponsored transaction from signed endorsing data. The sender is
    /// the endorser, who signs the envelope once the nonce is filled.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidState` if the endorsing data is not signed, and
    /// with `InvalidStructure` if it was tampered with, targets another chain
    /// or contract, or no sender is set.
    pub fn build_endorsed(&self, endorsing: &TransactionEndorsingData) -> crate::Result<Transaction> {
        tracing::debug!("TransactionBuilder::build_endorsed: {}", endorsing.method);

        let Some(signature) = &endorsing.signature else {
            tracerr!(Err::InvalidState, "endorsing data has not been signed");
        };
        signature.validate()?;
        endorsing.verify_hash()?;
        let Some(from) = self.sender else {
            tracerr!(Err::InvalidStructure, "sponsored transactions require an endorser");
        };

        let contract = self.registries.contract(endorsing.registry)?;
        if endorsing.chain_id != self.registries.chain_id() {
            tracerr!(
                Err::InvalidStructure,
                "endorsement for chain {} used on chain {}",
                endorsing.chain_id,
                self.registries.chain_id()
            );
        }
        if endorsing.to != contract.address {
            tracerr!(Err::InvalidStructure, "endorsement targets {} not {}", endorsing.to, contract.address);
        }

        let mut args = vec![
            Token::Address(endorsing.identity),
            Token::uint(u64::from(signature.v())),
            Token::FixedBytes(signature.r().to_vec()),
            Token::FixedBytes(signature.s().to_vec()),
        ];
        args.extend(endorsing.params.iter().cloned());
        let data = contract.encode_call(&format!("{}Signed", endorsing.method), &args)?;

        Ok(Transaction {
            type_: TransactionType::Write,
            kind: endorsing.registry.kind(),
            from: Some(from),
            to: contract.address,
            nonce: self.nonce,
            chain_id: self.registries.chain_id(),
            data,
            gas: self.gas,
            gas_price: self.gas_price,
            authorization: Authorization::Sponsored,
            signatures: Signatures {
                identity: Some(signature.clone()),
                endorser: None,
            },
            endorsement: Some(Endorsement {
                registry: endorsing.registry,
                identity: endorsing.identity,
                nonce_key: endorsing.nonce_key,
                nonce: endorsing.nonce,
            }),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::abi::encode;
    use crate::endorsing::build_endorsing_data;
    use crate::types::SignatureData;

    const DID: Address = Address::new([0x10; 20]);

    fn registries() -> Registries {
        Registries::canonical(
            1337,
            [
                (Registry::DidRegistry, DID),
                (Registry::RoleControl, Address::new([0x20; 20])),
                (Registry::ValidatorControl, Address::new([0x30; 20])),
            ],
        )
        .expect("should build")
    }

    fn set_attribute() -> Operation {
        Operation::SetAttribute {
            identity: Address::new([0xaa; 20]),
            attribute: DidAttribute::service("LinkedDomains", "https://example.com")
                .expect("should build"),
            validity: 100,
        }
    }

    #[test]
    fn build_defaults_sender_to_identity() {
        let registries = registries();
        let tx = TransactionBuilder::new(&registries).build(&set_attribute()).expect("should build");
        assert_eq!(tx.from(), Some(&Address::new([0xaa; 20])));
        assert_eq!(tx.to(), &DID);
        assert_eq!(tx.chain_id(), 1337);
        assert_eq!(tx.nonce(), None);
        assert_eq!(tx.gas(), DEFAULT_GAS);
        assert_eq!(tx.type_(), TransactionType::Write);
        assert_eq!(tx.authorization(), Authorization::Direct);
        assert!(!tx.is_complete());
    }

    #[test]
    fn build_round_trip() {
        let registries = registries();
        let operation = set_attribute();
        let tx = TransactionBuilder::new(&registries).build(&operation).expect("should build");

        let contract = registries.contract(Registry::DidRegistry).expect("configured");
        let args = contract.function("setAttribute").expect("exists").decode_input(tx.data()).expect("should decode");
        assert_eq!(args, operation.call_arguments().expect("should encode"));
        assert_eq!(&tx.data()[..4], &crate::abi::selector("setAttribute(address,bytes32,bytes,uint256)"));
    }

    #[test]
    fn zero_validity_is_rejected() {
        let registries = registries();
        let operation = Operation::AddDelegate {
            identity: Address::new([0xaa; 20]),
            delegate_type: DelegateType::VeriKey,
            delegate: Address::new([0xbb; 20]),
            validity: 0,
        };
        let err = TransactionBuilder::new(&registries).build(&operation).expect_err("should fail");
        assert!(err.is(Err::InvalidStructure));
    }

    #[test]
    fn unconfigured_registry() {
        let registries = registries();
        let operation = Operation::CreateSchema {
            schema: Schema {
                issuer_id: "did:ethr:0xf0e2db6c8dc6c681bb5d6ad121a107f300e9b2b5".into(),
                name: "Name".into(),
                version: "1.0".into(),
                attr_names: vec!["first".into()],
            },
        };
        let err = TransactionBuilder::new(&registries).build(&operation).expect_err("should fail");
        assert!(err.is(Err::InvalidState));
    }

    #[test]
    fn network_operations_need_a_sender() {
        let registries = registries();
        let operation = Operation::AddValidator {
            validator: Address::new([0xcc; 20]),
        };
        let err = TransactionBuilder::new(&registries).build(&operation).expect_err("no sender");
        assert!(err.is(Err::InvalidStructure));
    }

    #[test]
    fn query_parse() {
        let registries = registries();
        let query = Query::IdentityOwner {
            identity: Address::new([0xaa; 20]),
        };
        let tx = TransactionBuilder::new(&registries).build_query(&query).expect("should build");
        assert_eq!(tx.type_(), TransactionType::Read);
        assert_eq!(tx.nonce(), None);

        let data = encode(&[Token::Address(Address::new([0xbb; 20]))]);
        let output = query.parse(&registries, &data).expect("should parse");
        assert_eq!(output.owner().expect("is owner"), Address::new([0xbb; 20]));
        assert!(output.block().expect_err("not a block").is(Err::InternalError));
    }

    #[test]
    fn endorsed_transaction() {
        let registries = registries();
        let operation = set_attribute();
        let identity = Address::new([0xaa; 20]);
        let mut endorsing = build_endorsing_data(&registries, &operation, identity, U256::from(4))
            .expect("should build");

        let endorser = Address::new([0xee; 20]);
        let builder = TransactionBuilder::new(&registries).sender(endorser);
        let err = builder.build_endorsed(&endorsing).expect_err("unsigned");
        assert!(err.is(Err::InvalidState));

        let mut sig = vec![0x11; 32];
        sig.extend([0x22; 32]);
        endorsing.set_signature(SignatureData::new(1, &sig).expect("valid")).expect("should sign");

        let tx = builder.build_endorsed(&endorsing).expect("should build");
        assert_eq!(tx.authorization(), Authorization::Sponsored);
        assert_eq!(tx.from(), Some(&endorser));
        assert!(tx.signatures().identity.is_some());
        assert_eq!(tx.endorsement().map(|e| e.nonce), Some(U256::from(4)));

        let contract = registries.contract(Registry::DidRegistry).expect("configured");
        let args = contract
            .function("setAttributeSigned")
            .expect("exists")
            .decode_input(tx.data())
            .expect("should decode");
        assert_eq!(args[0], Token::Address(identity));
        assert_eq!(args[1], Token::uint(28));
        assert_eq!(args[2], Token::FixedBytes(vec![0x11; 32]));
        assert_eq!(args[3], Token::FixedBytes(vec![0x22; 32]));
        assert_eq!(args[4..], operation.arguments().expect("should encode")[..]);
    }

    #[test]
    fn endorsement_is_bound_to_chain() {
        let registries = registries();
        let mut endorsing = build_endorsing_data(&registries, &set_attribute(), Address::new([0xaa; 20]), U256::zero())
            .expect("should build");
        endorsing.set_signature(SignatureData::new(0, &[3; 64]).expect("valid")).expect("should sign");

        let other = Registries::canonical(1, [(Registry::DidRegistry, DID)]).expect("should build");
        let err = TransactionBuilder::new(&other)
            .sender(Address::new([0xee; 20]))
            .build_endorsed(&endorsing)
            .expect_err("wrong chain");
        assert!(err.is(Err::InvalidStructure));
    }

    #[test]
    fn malformed_endorsement_signature() {
        let registries = registries();
        let mut endorsing = build_endorsing_data(&registries, &set_attribute(), Address::new([0xaa; 20]), U256::zero())
            .expect("should build");
        endorsing.set_signature(SignatureData::new(0, &[3; 64]).expect("valid")).expect("should sign");
        let builder = TransactionBuilder::new(&registries).sender(Address::new([0xee; 20]));

        // a truncated signature never makes it out of deserialization
        let mut json = serde_json::to_value(&endorsing).expect("should serialize");
        json["signature"] = serde_json::json!({"recoveryId": 0, "signature": [1, 2, 3]});
        serde_json::from_value::<TransactionEndorsingData>(json.clone()).expect_err("short signature");

        // an out of range recovery id is rejected when building
        json["signature"] = serde_json::json!({"recoveryId": 9, "signature": vec![1u8; 64]});
        let tampered: TransactionEndorsingData = serde_json::from_value(json).expect("should deserialize");
        let err = builder.build_endorsed(&tampered).expect_err("bad recovery id");
        assert!(err.is(Err::InvalidStructure));
    }

    #[test]
    fn operation_wire_shape() {
        let operation = Operation::AssignRole {
            role: Role::Trustee,
            account: Address::new([0x01; 20]),
        };
        let json = serde_json::to_value(&operation).expect("should serialize");
        assert_eq!(json["operation"], "assignRole");
        assert_eq!(json["role"], "Trustee");
        let back: Operation = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(back, operation);
    }
}
