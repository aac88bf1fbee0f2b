//! # DID Events
//!
//! Changes to an identity as recorded by the DID registry's event log.

use primitive_types::U256;

use super::attribute::from_bytes32;
use crate::contract::Contract;
use crate::types::{Address, EventLog, EventPosition};

/// DID registry event names.
pub const DID_EVENTS: [&str; 3] = ["DIDOwnerChanged", "DIDDelegateChanged", "DIDAttributeChanged"];

/// A decoded change to an identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DidChange {
    /// Identity that changed.
    pub identity: Address,

    /// Where the change sits in the ledger's log order.
    pub position: EventPosition,

    /// Block timestamp, when the node reports it.
    pub timestamp: Option<u64>,

    /// What changed.
    pub event: DidEvent,
}

/// The change payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DidEvent {
    /// Control of the identity passed to `owner`.
    OwnerChanged {
        /// New owner; the null address deactivates the DID.
        owner: Address,
    },

    /// A delegate was added (or revoked, with `valid_to` in the past).
    DelegateChanged {
        /// Delegate type name.
        delegate_type: String,

        /// Delegate account.
        delegate: Address,

        /// Last block (exclusive) the delegate is valid for.
        valid_to: u64,
    },

    /// An attribute was set (or revoked, with `valid_to` in the past).
    AttributeChanged {
        /// Attribute name.
        name: String,

        /// Attribute value.
        value: Vec<u8>,

        /// Last block (exclusive) the attribute is valid for.
        valid_to: u64,
    },
}

impl DidChange {
    /// Decode a DID registry log. Logs of other events, or with names that
    /// are not valid UTF-8, yield `None`.
    ///
    /// # Errors
    ///
    /// Will fail if a DID event log does not match its declared shape.
    pub fn from_log(contract: &Contract, log: &EventLog) -> crate::Result<Option<Self>> {
        let Some(topic) = log.topics.first() else {
            tracing::warn!("skipping log without topics at {:?}", log.position());
            return Ok(None);
        };
        let Some(event) = contract.spec.event_by_topic(topic) else {
            tracing::warn!("skipping unknown event at {:?}", log.position());
            return Ok(None);
        };

        let output = contract.decode_log(&event.name, log)?;
        let event = match event.name.as_str() {
            "DIDOwnerChanged" => DidEvent::OwnerChanged {
                owner: output.address(1)?,
            },
            "DIDDelegateChanged" => {
                let Some(delegate_type) = from_bytes32(&output.bytes32(1)?) else {
                    tracing::warn!("skipping delegate with invalid type at {:?}", log.position());
                    return Ok(None);
                };
                DidEvent::DelegateChanged {
                    delegate_type,
                    delegate: output.address(2)?,
                    valid_to: saturate(output.uint(3)?),
                }
            }
            "DIDAttributeChanged" => {
                let Some(name) = from_bytes32(&output.bytes32(1)?) else {
                    tracing::warn!("skipping attribute with invalid name at {:?}", log.position());
                    return Ok(None);
                };
                DidEvent::AttributeChanged {
                    name,
                    value: output.bytes(2)?,
                    valid_to: saturate(output.uint(3)?),
                }
            }
            other => {
                tracing::warn!("skipping {other} event at {:?}", log.position());
                return Ok(None);
            }
        };

        Ok(Some(Self {
            identity: output.address(0)?,
            position: log.position(),
            timestamp: log.block_timestamp,
            event,
        }))
    }
}

// validity windows beyond u64 never expire
fn saturate(value: U256) -> u64 {
    if value > U256::from(u64::MAX) { u64::MAX } else { value.low_u64() }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::abi::{address_topic, encode, Token};
    use crate::contract::Registry;

    fn contract() -> Contract {
        Contract::canonical(Registry::DidRegistry, Address::new([0x33; 20])).expect("should build")
    }

    #[test]
    fn decode_attribute_changed() {
        let contract = contract();
        let identity = Address::new([0xaa; 20]);
        let event = contract.event("DIDAttributeChanged").expect("exists");
        let log = EventLog {
            address: contract.address,
            topics: vec![event.topic(), address_topic(&identity)],
            data: encode(&[
                Token::bytes32(b"did/svc/LinkedDomains").expect("fits"),
                Token::Bytes(b"https://example.com".to_vec()),
                Token::Uint(U256::MAX),
                Token::uint(0),
            ]),
            block_number: 6,
            ..EventLog::default()
        };

        let change = DidChange::from_log(&contract, &log).expect("should decode").expect("is a change");
        assert_eq!(change.identity, identity);
        assert_eq!(change.position.block_number, 6);
        assert_eq!(
            change.event,
            DidEvent::AttributeChanged {
                name: "did/svc/LinkedDomains".into(),
                value: b"https://example.com".to_vec(),
                valid_to: u64::MAX,
            }
        );
    }

    #[test]
    fn unknown_topic_is_skipped() {
        let contract = contract();
        let log = EventLog {
            address: contract.address,
            topics: vec![[9u8; 32]],
            ..EventLog::default()
        };
        assert_eq!(DidChange::from_log(&contract, &log).expect("should not fail"), None);
    }
}
