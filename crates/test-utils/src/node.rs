//! # Fake Node
//!
//! An in-memory ledger implementing [`Node`]. Every accepted transaction is
//! mined into its own block and executed against simulated registries. A
//! reverted transaction still consumes its account nonce but leaves registry
//! state untouched.
//!
//! The sender of a transaction is the account recovered from its signed
//! envelope, never the payload's `from` field.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_rlp::{Decodable, Encodable, Header};
use anyhow::{anyhow, bail};
use credibil_vdr::abi::{address_topic, encode, keccak256, Output, Token};
use credibil_vdr::error::{Context, Err};
use credibil_vdr::{
    endorsement_hash, Address, Contract, EventLog, LedgerClient, LogFilter, Node, Receipt,
    Registries, Registry, SignedPayload, TxId, ValidityClock,
};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use primitive_types::U256;
use tokio::sync::Mutex;

/// Chain id of the default ledger.
pub const CHAIN_ID: u64 = 1337;

/// Default DID registry address.
pub const DID_REGISTRY: Address = contract_address(0x3333);

/// Default schema registry address.
pub const SCHEMA_REGISTRY: Address = contract_address(0x5555);

/// Default credential definition registry address.
pub const CREDENTIAL_DEFINITION_REGISTRY: Address = contract_address(0x4444);

/// Default role control address.
pub const ROLE_CONTROL: Address = contract_address(0x6666);

/// Default validator control address.
pub const VALIDATOR_CONTROL: Address = contract_address(0x7777);

const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
const BLOCK_TIME: u64 = 2;

const fn contract_address(tag: u16) -> Address {
    let [hi, lo] = tag.to_be_bytes();
    let mut bytes = [0u8; 20];
    bytes[18] = hi;
    bytes[19] = lo;
    Address::new(bytes)
}

/// Registries deployed at the default addresses on [`CHAIN_ID`].
#[must_use]
pub fn registries() -> Registries {
    Registries::canonical(
        CHAIN_ID,
        [
            (Registry::DidRegistry, DID_REGISTRY),
            (Registry::SchemaRegistry, SCHEMA_REGISTRY),
            (Registry::CredentialDefinitionRegistry, CREDENTIAL_DEFINITION_REGISTRY),
            (Registry::RoleControl, ROLE_CONTROL),
            (Registry::ValidatorControl, VALIDATOR_CONTROL),
        ],
    )
    .expect("should build canonical registries")
}

/// In-memory ledger node.
#[derive(Clone, Debug)]
pub struct FakeNode {
    registries: Arc<Registries>,
    validity_clock: ValidityClock,
    ledger: Arc<Mutex<Ledger>>,
}

/// Timestamp of `block`: blocks are produced every two seconds from genesis.
#[must_use]
pub const fn block_timestamp(block: u64) -> u64 {
    GENESIS_TIMESTAMP.saturating_add(block.saturating_mul(BLOCK_TIME))
}

impl Default for FakeNode {
    fn default() -> Self {
        Self::new(registries())
    }
}

impl FakeNode {
    /// A node with the given registries deployed.
    #[must_use]
    pub fn new(registries: Registries) -> Self {
        let ledger = Ledger {
            chain_id: registries.chain_id(),
            ..Ledger::default()
        };
        Self {
            registries: Arc::new(registries),
            validity_clock: ValidityClock::default(),
            ledger: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Count DID validity windows in seconds of block time instead of blocks.
    #[must_use]
    pub const fn with_validity_clock(mut self, validity_clock: ValidityClock) -> Self {
        self.validity_clock = validity_clock;
        self
    }

    /// The registries deployed on this node.
    #[must_use]
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// A client talking to this node, using the node's validity clock.
    #[must_use]
    pub fn client(&self) -> LedgerClient<Self> {
        LedgerClient::new(self.clone(), (*self.registries).clone()).validity_clock(self.validity_clock)
    }

    /// Mine `count` empty blocks.
    pub async fn advance_blocks(&self, count: u64) {
        let mut ledger = self.ledger.lock().await;
        ledger.block_number = ledger.block_number.saturating_add(count);
    }

    /// Revert the next accepted transaction with `reason`.
    pub async fn revert_next(&self, reason: impl Into<String>) {
        self.ledger.lock().await.revert_next = Some(reason.into());
    }

    /// Fail every request with `NetworkError` while offline.
    pub async fn set_offline(&self, offline: bool) {
        self.ledger.lock().await.offline = offline;
    }

    /// Report a different chain id.
    pub async fn set_chain_id(&self, chain_id: u64) {
        self.ledger.lock().await.chain_id = chain_id;
    }

    /// Keep transactions pending: receipts are withheld while hidden.
    pub async fn hide_receipts(&self, hidden: bool) {
        self.ledger.lock().await.hide_receipts = hidden;
    }

    /// Answer calls of `data` to `to` with `response` instead of executing
    /// them.
    pub async fn script_call(&self, to: Address, data: Vec<u8>, response: Vec<u8>) {
        self.ledger.lock().await.scripted.insert((to, data), response);
    }

    /// Append a raw log, advancing the chain head to its block if needed.
    pub async fn push_log(&self, log: EventLog) {
        let mut ledger = self.ledger.lock().await;
        ledger.block_number = ledger.block_number.max(log.block_number);
        ledger.logs.push(log);
    }

    /// Number of `get_logs` requests served.
    pub async fn log_requests(&self) -> usize {
        self.ledger.lock().await.log_requests
    }
}

impl Node for FakeNode {
    async fn call(&self, to: &Address, data: &[u8]) -> credibil_vdr::Result<Vec<u8>> {
        let ledger = self.ledger.lock().await;
        ledger.online()?;

        if let Some(response) = ledger.scripted.get(&(*to, data.to_vec())) {
            return Ok(response.clone());
        }
        let Some(contract) = self.registries.by_address(to) else {
            return Err(Err::ContractError).context(format!("no contract at {to}"));
        };
        match ledger.state.read(contract, data) {
            Ok(output) => Ok(output),
            Err(e) => Err(Err::ContractError).context(format!("execution reverted: {e}")),
        }
    }

    async fn get_logs(&self, filter: &LogFilter) -> credibil_vdr::Result<Vec<EventLog>> {
        let mut ledger = self.ledger.lock().await;
        ledger.online()?;
        ledger.log_requests += 1;

        // newest first: callers must not rely on node ordering
        Ok(ledger.logs.iter().rev().filter(|log| filter.matches(log)).cloned().collect())
    }

    async fn send_transaction(&self, payload: &SignedPayload) -> credibil_vdr::Result<TxId> {
        let mut ledger = self.ledger.lock().await;
        ledger.online()?;

        if ledger.receipts.contains_key(&payload.tx_id) {
            return Err(Err::ContractError).context(format!("transaction {} already known", payload.tx_id));
        }
        let envelope = match Envelope::decode(&payload.raw, ledger.chain_id) {
            Ok(envelope) => envelope,
            Err(e) => return Err(Err::ContractError).context(format!("invalid transaction: {e}")),
        };
        if envelope.sender != payload.from {
            return Err(Err::ContractError).context(format!(
                "invalid sender: envelope signed by {}, not {}",
                envelope.sender, payload.from
            ));
        }
        if envelope.nonce != payload.nonce || envelope.to != payload.to || envelope.data != payload.data {
            return Err(Err::ContractError).context("invalid transaction: payload does not match its envelope");
        }

        let expected = ledger.account_nonces.get(&payload.from).copied().unwrap_or_default();
        if payload.nonce != expected {
            return Err(Err::ContractError).context(format!(
                "nonce {} for {} rejected, expected {expected}",
                payload.nonce, payload.from
            ));
        }

        ledger.account_nonces.insert(payload.from, expected + 1);
        ledger.block_number += 1;
        let receipt = ledger.mine(&self.registries, self.validity_clock, payload);
        tracing::debug!("mined {} in block {}: {}", payload.tx_id, receipt.block_number, receipt.status);
        ledger.receipts.insert(payload.tx_id, receipt);

        Ok(payload.tx_id)
    }

    async fn get_receipt(&self, tx_id: &TxId) -> credibil_vdr::Result<Option<Receipt>> {
        let ledger = self.ledger.lock().await;
        ledger.online()?;
        if ledger.hide_receipts {
            return Ok(None);
        }
        Ok(ledger.receipts.get(tx_id).cloned())
    }

    async fn block_number(&self) -> credibil_vdr::Result<u64> {
        let ledger = self.ledger.lock().await;
        ledger.online()?;
        Ok(ledger.block_number)
    }

    async fn block_timestamp(&self, block: u64) -> credibil_vdr::Result<u64> {
        let ledger = self.ledger.lock().await;
        ledger.online()?;
        if block > ledger.block_number {
            return Err(Err::InvalidStructure).context(format!("block {block} has not been produced"));
        }
        Ok(block_timestamp(block))
    }

    async fn transaction_count(&self, account: &Address) -> credibil_vdr::Result<u64> {
        let ledger = self.ledger.lock().await;
        ledger.online()?;
        Ok(ledger.account_nonces.get(account).copied().unwrap_or_default())
    }

    async fn chain_id(&self) -> credibil_vdr::Result<u64> {
        let ledger = self.ledger.lock().await;
        ledger.online()?;
        Ok(ledger.chain_id)
    }
}

#[derive(Debug, Default)]
struct Ledger {
    chain_id: u64,
    block_number: u64,
    account_nonces: HashMap<Address, u64>,
    receipts: HashMap<TxId, Receipt>,
    logs: Vec<EventLog>,
    state: State,
    scripted: HashMap<(Address, Vec<u8>), Vec<u8>>,
    revert_next: Option<String>,
    hide_receipts: bool,
    offline: bool,
    log_requests: usize,
}

impl Ledger {
    fn online(&self) -> credibil_vdr::Result<()> {
        if self.offline {
            return Err(Err::NetworkError).context("node unreachable");
        }
        Ok(())
    }

    // Executes the payload in the current block, rolling registry state back
    // on revert.
    fn mine(&mut self, registries: &Registries, clock: ValidityClock, payload: &SignedPayload) -> Receipt {
        let block_number = self.block_number;
        let snapshot = self.state.clone();

        let outcome = match self.revert_next.take() {
            Some(reason) => Err(anyhow!(reason)),
            None => self.execute(registries, clock, payload),
        };
        let events = match outcome {
            Ok(events) => events,
            Err(e) => {
                self.state = snapshot;
                return Receipt {
                    tx_id: payload.tx_id,
                    block_number,
                    status: false,
                    revert_reason: Some(e.to_string()),
                };
            }
        };

        let block_timestamp = block_timestamp(block_number);
        for (event, log_index) in events.into_iter().zip(0u64..) {
            self.logs.push(EventLog {
                block_number,
                transaction_index: 0,
                log_index,
                transaction_hash: Some(payload.tx_id),
                block_timestamp: Some(block_timestamp),
                ..event
            });
        }
        Receipt {
            tx_id: payload.tx_id,
            block_number,
            status: true,
            revert_reason: None,
        }
    }

    fn execute(
        &mut self, registries: &Registries, clock: ValidityClock, payload: &SignedPayload,
    ) -> anyhow::Result<Vec<EventLog>> {
        let Some(contract) = registries.by_address(&payload.to) else {
            bail!("no contract at {}", payload.to);
        };
        let Some(function) = contract.spec.function_by_selector(&payload.data) else {
            bail!("unknown method");
        };
        let mut args = function.decode_input(&payload.data)?;

        // signed variants carry (identity, v, r, s) ahead of the arguments
        let (method, sender) = match function.name.strip_suffix("Signed") {
            Some(method) => {
                let signer = self.state.recover_signer(contract, self.chain_id, method, &args)?;
                args.drain(1..4);
                (method, signer)
            }
            None => (function.name.as_str(), payload.from),
        };
        let args = Output::from(args);

        let block = self.block_number;
        let now = match clock {
            ValidityClock::BlockNumber => block,
            ValidityClock::Timestamp => block_timestamp(block),
        };
        match contract.registry {
            Registry::DidRegistry => self.state.did_registry(contract, block, now, method, &sender, &args),
            Registry::SchemaRegistry | Registry::CredentialDefinitionRegistry => {
                self.state.anoncreds_registry(contract, block, method, &sender, &args)
            }
            Registry::RoleControl => self.state.role_control(method, &args),
            Registry::ValidatorControl => self.state.validator_control(method, &args),
        }
    }
}

// Registry contract storage.
#[derive(Clone, Debug, Default)]
struct State {
    owners: HashMap<Address, Address>,
    changed: HashMap<Address, u64>,
    nonces: HashMap<(Registry, Address), U256>,
    created: HashMap<(Registry, [u8; 32]), u64>,
    roles: HashMap<Address, u8>,
    validators: Vec<Address>,
}

impl State {
    fn owner(&self, identity: &Address) -> Address {
        self.owners.get(identity).copied().unwrap_or(*identity)
    }

    fn nonce(&self, registry: Registry, account: &Address) -> U256 {
        self.nonces.get(&(registry, *account)).copied().unwrap_or_default()
    }

    fn read(&self, contract: &Contract, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let Some(function) = contract.spec.function_by_selector(data) else {
            bail!("unknown method");
        };
        let args = Output::from(function.decode_input(data)?);

        let token = match function.name.as_str() {
            "identityOwner" => Token::Address(self.owner(&args.address(0)?)),
            "changed" => Token::uint(self.changed.get(&args.address(0)?).copied().unwrap_or_default()),
            "nonce" => Token::Uint(self.nonce(contract.registry, &args.address(0)?)),
            "created" => {
                let id = args.bytes32(0)?;
                Token::uint(self.created.get(&(contract.registry, id)).copied().unwrap_or_default())
            }
            "hasRole" => {
                let role = args.u8(0)?;
                Token::Bool(self.roles.get(&args.address(1)?) == Some(&role))
            }
            "getRole" => {
                let role = self.roles.get(&args.address(0)?).copied().unwrap_or_default();
                Token::uint(u64::from(role))
            }
            "getValidators" => Token::Array(self.validators.iter().copied().map(Token::Address).collect()),
            name => bail!("{name} is not a read-only method"),
        };
        Ok(encode(&[token]))
    }

    // Recovers the identity's signature over the endorsement hash and
    // consumes the registry nonce it was made against.
    fn recover_signer(
        &mut self, contract: &Contract, chain_id: u64, method: &str, args: &[Token],
    ) -> anyhow::Result<Address> {
        let header = Output::from(args.iter().take(4).cloned().collect::<Vec<_>>());
        let identity = header.address(0)?;
        let v = header.u8(1)?;
        let (r, s) = (header.bytes32(2)?, header.bytes32(3)?);

        let nonce_key = match contract.registry {
            Registry::DidRegistry => self.owner(&identity),
            _ => identity,
        };
        let nonce = self.nonce(contract.registry, &nonce_key);
        let params = args.get(4..).unwrap_or_default();
        let hash = endorsement_hash(&contract.address, chain_id, nonce, &identity, method, params);

        let signer = recover(&hash, v, &r, &s)?;
        if signer != nonce_key {
            bail!("bad_signature: signed by {signer}, expected {nonce_key}");
        }
        self.nonces.insert((contract.registry, nonce_key), nonce + 1);
        Ok(signer)
    }

    // Validity windows start at `now`, the block number or timestamp.
    fn did_registry(
        &mut self, contract: &Contract, block: u64, now: u64, method: &str, sender: &Address,
        args: &Output,
    ) -> anyhow::Result<Vec<EventLog>> {
        let identity = args.address(0)?;
        if *sender != self.owner(&identity) {
            bail!("not_owner: {sender} does not own {identity}");
        }
        let previous = Token::uint(self.changed.get(&identity).copied().unwrap_or_default());

        let (event, data) = match method {
            "changeOwner" => {
                let new_owner = args.address(1)?;
                self.owners.insert(identity, new_owner);
                ("DIDOwnerChanged", encode(&[Token::Address(new_owner), previous]))
            }
            "addDelegate" => {
                let valid_to = U256::from(now).saturating_add(args.uint(3)?);
                let tokens = [
                    Token::FixedBytes(args.bytes32(1)?.to_vec()),
                    Token::Address(args.address(2)?),
                    Token::Uint(valid_to),
                    previous,
                ];
                ("DIDDelegateChanged", encode(&tokens))
            }
            "revokeDelegate" => {
                let tokens = [
                    Token::FixedBytes(args.bytes32(1)?.to_vec()),
                    Token::Address(args.address(2)?),
                    Token::uint(now),
                    previous,
                ];
                ("DIDDelegateChanged", encode(&tokens))
            }
            "setAttribute" => {
                let valid_to = U256::from(now).saturating_add(args.uint(3)?);
                let tokens = [
                    Token::FixedBytes(args.bytes32(1)?.to_vec()),
                    Token::Bytes(args.bytes(2)?),
                    Token::Uint(valid_to),
                    previous,
                ];
                ("DIDAttributeChanged", encode(&tokens))
            }
            "revokeAttribute" => {
                let tokens = [
                    Token::FixedBytes(args.bytes32(1)?.to_vec()),
                    Token::Bytes(args.bytes(2)?),
                    Token::uint(0),
                    previous,
                ];
                ("DIDAttributeChanged", encode(&tokens))
            }
            _ => bail!("unsupported method {method}"),
        };

        self.changed.insert(identity, block);
        Ok(vec![event_log(contract, event, vec![address_topic(&identity)], data)?])
    }

    fn anoncreds_registry(
        &mut self, contract: &Contract, block: u64, method: &str, sender: &Address, args: &Output,
    ) -> anyhow::Result<Vec<EventLog>> {
        let identity = args.address(0)?;
        if *sender != self.owner(&identity) {
            bail!("not_owner: {sender} does not own {identity}");
        }
        let id = args.bytes32(1)?;

        let (event, json) = match (contract.registry, method) {
            (Registry::SchemaRegistry, "createSchema") => ("SchemaCreated", args.string(2)?),
            (Registry::CredentialDefinitionRegistry, "createCredentialDefinition") => {
                if !self.created.contains_key(&(Registry::SchemaRegistry, args.bytes32(2)?)) {
                    bail!("SchemaNotFound");
                }
                ("CredentialDefinitionCreated", args.string(3)?)
            }
            _ => bail!("unsupported method {method}"),
        };
        if self.created.contains_key(&(contract.registry, id)) {
            bail!("{event}: id already exists");
        }

        self.created.insert((contract.registry, id), block);
        let data = encode(&[Token::Address(identity), Token::String(json)]);
        Ok(vec![event_log(contract, event, vec![id], data)?])
    }

    fn role_control(&mut self, method: &str, args: &Output) -> anyhow::Result<Vec<EventLog>> {
        let role = args.u8(0)?;
        let account = args.address(1)?;
        match method {
            "assignRole" => {
                self.roles.insert(account, role);
            }
            "revokeRole" => {
                if self.roles.get(&account) != Some(&role) {
                    bail!("{account} does not have role {role}");
                }
                self.roles.remove(&account);
            }
            _ => bail!("unsupported method {method}"),
        }
        Ok(vec![])
    }

    fn validator_control(&mut self, method: &str, args: &Output) -> anyhow::Result<Vec<EventLog>> {
        let validator = args.address(0)?;
        let position = self.validators.iter().position(|v| v == &validator);
        match (method, position) {
            ("addValidator", None) => self.validators.push(validator),
            ("addValidator", Some(_)) => bail!("validator {validator} already exists"),
            ("removeValidator", Some(index)) => {
                self.validators.remove(index);
            }
            ("removeValidator", None) => bail!("validator {validator} not found"),
            _ => bail!("unsupported method {method}"),
        }
        Ok(vec![])
    }
}

fn event_log(
    contract: &Contract, name: &str, indexed: Vec<[u8; 32]>, data: Vec<u8>,
) -> anyhow::Result<EventLog> {
    let mut topics = vec![contract.event(name)?.topic()];
    topics.extend(indexed);
    Ok(EventLog {
        address: contract.address,
        topics,
        data,
        ..EventLog::default()
    })
}

// A signed legacy (EIP-155) transaction envelope.
struct Envelope {
    nonce: u64,
    to: Address,
    data: Vec<u8>,
    sender: Address,
}

impl Envelope {
    // Decodes `[nonce, gas_price, gas, to, value, data, v, r, s]` and recovers
    // the account that signed it for `chain_id`.
    fn decode(raw: &[u8], chain_id: u64) -> anyhow::Result<Self> {
        let buf = &mut &raw[..];
        let header = Header::decode(buf)?;
        if !header.list || header.payload_length != buf.len() {
            bail!("envelope is not a single RLP list");
        }

        let fields = *buf;
        let nonce = u64::decode(buf)?;
        let (_gas_price, _gas) = (u64::decode(buf)?, u64::decode(buf)?);
        let to = Address::new(<[u8; 20]>::decode(buf)?);
        if u64::decode(buf)? != 0 {
            bail!("value transfers are not supported");
        }
        let data = alloy_rlp::Bytes::decode(buf)?.to_vec();
        let unsigned = &fields[..fields.len() - buf.len()];

        let v = u64::decode(buf)?;
        let r = word(&alloy_rlp::Bytes::decode(buf)?)?;
        let s = word(&alloy_rlp::Bytes::decode(buf)?)?;
        if !buf.is_empty() {
            bail!("trailing data after signature");
        }

        let recovery_id = chain_id
            .checked_mul(2)
            .and_then(|base| base.checked_add(35))
            .and_then(|base| v.checked_sub(base))
            .and_then(|id| u8::try_from(id).ok())
            .filter(|id| *id <= 1);
        let Some(recovery_id) = recovery_id else {
            bail!("v {v} does not sign for chain {chain_id}");
        };

        // signing preimage: the unsigned fields followed by chain_id, 0, 0
        let mut payload = unsigned.to_vec();
        chain_id.encode(&mut payload);
        0u64.encode(&mut payload);
        0u64.encode(&mut payload);
        let mut preimage = Vec::with_capacity(payload.len() + 9);
        Header {
            list: true,
            payload_length: payload.len(),
        }
        .encode(&mut preimage);
        preimage.extend(payload);

        let sender = recover(&keccak256(&preimage), 27 + recovery_id, &r, &s)?;
        Ok(Self { nonce, to, data, sender })
    }
}

// Left-pads a minimal big-endian integer to 32 bytes.
fn word(bytes: &[u8]) -> anyhow::Result<[u8; 32]> {
    if bytes.len() > 32 {
        bail!("signature value is wider than 32 bytes");
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(word)
}

fn recover(hash: &[u8; 32], v: u8, r: &[u8; 32], s: &[u8; 32]) -> anyhow::Result<Address> {
    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(r);
    compact[32..].copy_from_slice(s);
    let signature = Signature::from_slice(&compact)?;

    let Some(recovery_id) = v.checked_sub(27).and_then(RecoveryId::from_byte) else {
        bail!("bad_signature: invalid v {v}");
    };
    let key = VerifyingKey::recover_from_prehash(hash, &signature, recovery_id)?;
    Ok(Address::from_public_key(key.to_encoded_point(false).as_bytes())?)
}
