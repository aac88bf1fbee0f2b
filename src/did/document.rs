//! # DID Document
//!
//! A DID Document is a JSON-LD document that contains information related to a
//! DID. Registry DIDs have no stored document: it is assembled from the
//! identity's current owner, delegates and attributes.

use base64ct::{Base64, Encoding};
use multibase::Base;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::attribute::{AttributeKind, DelegateType, KeyAlgorithm, KeyEncoding, KeyPurpose};
use super::state::{AttributeEntry, DidState};
use super::url::Did;
use crate::core::Kind;
use crate::types::Address;

/// Base DID context.
pub const BASE_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Context defining `EcdsaSecp256k1RecoveryMethod2020`.
pub const SECP256K1_RECOVERY_CONTEXT: &str =
    "https://w3id.org/security/suites/secp256k1recovery-2020/v2";

/// Verification method type for ledger accounts.
pub const RECOVERY_METHOD_TYPE: &str = "EcdsaSecp256k1RecoveryMethod2020";

/// DID Document
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// The context of the DID document.
    #[serde(rename = "@context")]
    pub context: Vec<Kind<Value>>,

    /// The DID for a particular DID subject.
    pub id: String,

    /// A set of services, that express ways of communicating with the DID
    /// subject or related entities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<Service>>,

    /// If set, MUST be a set of verification methods for the DID subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<Vec<VerificationMethod>>,

    /// The `authentication` verification relationship is used to specify how
    /// the DID subject is expected to be authenticated.
    ///
    /// <https://www.w3.org/TR/did-core/#authentication>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Vec<Kind<VerificationMethod>>>,

    /// The `assertion_method` verification relationship is used to specify how
    /// the DID subject is expected to express claims, such as for the
    /// purposes of issuing a Verifiable Credential.
    ///
    /// <https://www.w3.org/TR/did-core/#assertion>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_method: Option<Vec<Kind<VerificationMethod>>>,

    /// The `key_agreement` verification relationship is used to specify how an
    /// entity can generate encryption material in order to transmit
    /// confidential information intended for the DID subject.
    ///
    /// <https://www.w3.org/TR/did-core/#key-agreement>
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_agreement: Option<Vec<Kind<VerificationMethod>>>,
}

impl Document {
    /// Retrieve a service by its ID.
    #[must_use]
    pub fn service(&self, id: &str) -> Option<&Service> {
        self.service.as_ref()?.iter().find(|s| s.id == id)
    }

    /// Retrieve a verification method by its ID.
    #[must_use]
    pub fn verification_method(&self, id: &str) -> Option<&VerificationMethod> {
        self.verification_method.as_ref()?.iter().find(|vm| vm.id == id)
    }
}

/// A verification method: a ledger account or a public key.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// A DID URL that identifies the verification method.
    pub id: String,

    /// Verification method type.
    #[serde(rename = "type")]
    pub type_: String,

    /// The DID of the controller of the verification method.
    pub controller: String,

    /// The key material.
    #[serde(flatten)]
    pub key: KeyFormat,
}

/// The format of the key material.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum KeyFormat {
    /// A CAIP-10 account: `eip155:<chainId>:<address>`.
    BlockchainAccountId {
        /// The account.
        blockchain_account_id: String,
    },

    /// Hex encoded public key.
    PublicKeyHex {
        /// The key.
        public_key_hex: String,
    },

    /// Base64 encoded public key.
    PublicKeyBase64 {
        /// The key.
        public_key_base64: String,
    },

    /// Base58 encoded public key.
    PublicKeyBase58 {
        /// The key.
        public_key_base58: String,
    },
}

/// A way of communicating with the DID subject.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// A URI unique to the service.
    pub id: String,

    /// The service type.
    #[serde(rename = "type")]
    pub type_: String,

    /// The endpoint: a URL or a JSON value.
    #[allow(clippy::struct_field_names)]
    pub service_endpoint: Kind<Value>,
}

/// DID document metadata.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::module_name_repetitions)]
pub struct DocumentMetadata {
    /// The identity's current owner.
    pub owner: Address,

    /// Set when the owner is the null address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,

    /// Block of the last change applied. Omitted for identities that never
    /// changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,

    /// Version of the document: the block of the last change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl DocumentMetadata {
    /// Metadata describing a folded identity state.
    #[must_use]
    pub fn from_state(state: &DidState) -> Self {
        Self {
            owner: state.owner,
            deactivated: state.is_deactivated().then_some(true),
            updated: state.updated,
            version_id: state.updated.map(|block| block.to_string()),
        }
    }
}

/// Assemble the DID document for an identity state. Expired entries must
/// already have been removed (see [`DidState::at`]).
#[must_use]
pub fn assemble(did: &Did, chain_id: u64, state: &DidState) -> Document {
    let id = did.to_string();
    let mut document = Document {
        context: vec![
            Kind::String(BASE_CONTEXT.to_string()),
            Kind::String(SECP256K1_RECOVERY_CONTEXT.to_string()),
        ],
        id: id.clone(),
        ..Document::default()
    };
    if state.is_deactivated() {
        return document;
    }

    let controller = format!("{id}#controller");
    let mut methods = vec![account_method(&controller, &id, chain_id, &state.owner)];
    let mut authentication = vec![Kind::String(controller.clone())];
    let mut assertion_method = vec![Kind::String(controller)];
    let mut key_agreement = vec![];
    let mut services = vec![];
    let mut delegate_count = 0;

    for delegate in &state.delegates {
        let Ok(delegate_type) = delegate.delegate_type.parse::<DelegateType>() else {
            tracing::warn!("skipping delegate with unknown type {}", delegate.delegate_type);
            continue;
        };
        delegate_count += 1;
        let method_id = format!("{id}#delegate-{delegate_count}");
        methods.push(account_method(&method_id, &id, chain_id, &delegate.delegate));
        assertion_method.push(Kind::String(method_id.clone()));
        if delegate_type == DelegateType::SigAuth {
            authentication.push(Kind::String(method_id));
        }
    }

    for attribute in &state.attributes {
        let Ok(kind) = attribute.name.parse::<AttributeKind>() else {
            tracing::warn!("skipping unrecognised attribute {}", attribute.name);
            continue;
        };
        match kind {
            AttributeKind::PublicKey {
                algorithm,
                purpose,
                encoding,
            } => {
                delegate_count += 1;
                let method_id = format!("{id}#delegate-{delegate_count}");
                methods.push(VerificationMethod {
                    id: method_id.clone(),
                    type_: key_type(algorithm).to_string(),
                    controller: id.clone(),
                    key: key_format(encoding, &attribute.value),
                });
                match purpose {
                    KeyPurpose::VeriKey => assertion_method.push(Kind::String(method_id)),
                    KeyPurpose::SigAuth => {
                        assertion_method.push(Kind::String(method_id.clone()));
                        authentication.push(Kind::String(method_id));
                    }
                    KeyPurpose::Enc => key_agreement.push(Kind::String(method_id)),
                }
            }
            AttributeKind::Service { service_type } => {
                services.push(Service {
                    id: format!("{id}#service-{}", services.len() + 1),
                    type_: service_type,
                    service_endpoint: endpoint(attribute),
                });
            }
        }
    }

    document.verification_method = Some(methods);
    document.authentication = Some(authentication);
    document.assertion_method = Some(assertion_method);
    document.key_agreement = (!key_agreement.is_empty()).then_some(key_agreement);
    document.service = (!services.is_empty()).then_some(services);
    document
}

fn account_method(id: &str, controller: &str, chain_id: u64, account: &Address) -> VerificationMethod {
    VerificationMethod {
        id: id.to_string(),
        type_: RECOVERY_METHOD_TYPE.to_string(),
        controller: controller.to_string(),
        key: KeyFormat::BlockchainAccountId {
            blockchain_account_id: format!("eip155:{chain_id}:{account}"),
        },
    }
}

const fn key_type(algorithm: KeyAlgorithm) -> &'static str {
    match algorithm {
        KeyAlgorithm::Secp256k1 => "EcdsaSecp256k1VerificationKey2019",
        KeyAlgorithm::Ed25519 => "Ed25519VerificationKey2018",
        KeyAlgorithm::X25519 => "X25519KeyAgreementKey2019",
        KeyAlgorithm::Rsa => "RsaVerificationKey2018",
    }
}

fn key_format(encoding: KeyEncoding, key: &[u8]) -> KeyFormat {
    match encoding {
        KeyEncoding::Hex => KeyFormat::PublicKeyHex {
            public_key_hex: hex::encode(key),
        },
        KeyEncoding::Base64 => KeyFormat::PublicKeyBase64 {
            public_key_base64: Base64::encode_string(key),
        },
        KeyEncoding::Base58 => KeyFormat::PublicKeyBase58 {
            public_key_base58: Base::Base58Btc.encode(key),
        },
    }
}

// JSON objects and arrays are embedded, anything else is a string
fn endpoint(attribute: &AttributeEntry) -> Kind<Value> {
    let text = String::from_utf8_lossy(&attribute.value).into_owned();
    match serde_json::from_str::<Value>(&text) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Kind::Object(value),
        _ => Kind::String(text),
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::did::state::DelegateEntry;

    const IDENTITY: Address = Address::new([0xaa; 20]);

    fn did() -> Did {
        Did::new(Some("testnet".into()), IDENTITY)
    }

    fn attribute(name: &str, value: &[u8]) -> AttributeEntry {
        AttributeEntry {
            name: name.into(),
            value: value.to_vec(),
            valid_to: u64::MAX,
        }
    }

    #[test]
    fn default_document() {
        let document = assemble(&did(), 1337, &DidState::new(IDENTITY));
        let id = did().to_string();

        assert_eq!(
            serde_json::to_value(&document).expect("should serialize"),
            json!({
                "@context": [BASE_CONTEXT, SECP256K1_RECOVERY_CONTEXT],
                "id": id,
                "verificationMethod": [{
                    "id": format!("{id}#controller"),
                    "type": "EcdsaSecp256k1RecoveryMethod2020",
                    "controller": id,
                    "blockchainAccountId": format!("eip155:1337:{IDENTITY}")
                }],
                "authentication": [format!("{id}#controller")],
                "assertionMethod": [format!("{id}#controller")]
            })
        );
    }

    #[test]
    fn keys_delegates_and_services() {
        let mut state = DidState::new(IDENTITY);
        state.delegates.push(DelegateEntry {
            delegate_type: "sigAuth".into(),
            delegate: Address::new([0xcc; 20]),
            valid_to: u64::MAX,
        });
        state.attributes = vec![
            attribute("did/pub/Secp256k1/veriKey/hex", &[0x02, 0xab]),
            attribute("did/pub/X25519/enc/base64", b"key"),
            attribute("did/pub/Ed25519/sigAuth/base58", &[0, 1]),
            attribute("did/svc/LinkedDomains", b"https://example.com"),
            attribute("did/svc/Messaging", br#"{"uri":"https://m.example"}"#),
            attribute("unknown", b"ignored"),
        ];

        let document = assemble(&did(), 1337, &state);
        let id = did().to_string();

        let methods = document.verification_method.as_ref().expect("has methods");
        assert_eq!(methods.len(), 5);
        assert_eq!(methods[1].key, KeyFormat::BlockchainAccountId {
            blockchain_account_id: format!("eip155:1337:{}", Address::new([0xcc; 20])),
        });

        let key = document.verification_method(&format!("{id}#delegate-2")).expect("hex key");
        assert_eq!(key.type_, "EcdsaSecp256k1VerificationKey2019");
        assert_eq!(key.key, KeyFormat::PublicKeyHex {
            public_key_hex: "02ab".into()
        });
        let key = document.verification_method(&format!("{id}#delegate-3")).expect("x25519 key");
        assert_eq!(key.key, KeyFormat::PublicKeyBase64 {
            public_key_base64: "a2V5".into()
        });
        let key = document.verification_method(&format!("{id}#delegate-4")).expect("ed25519 key");
        assert_eq!(key.key, KeyFormat::PublicKeyBase58 {
            public_key_base58: "12".into()
        });

        let authentication = document.authentication.as_ref().expect("has authentication");
        assert_eq!(authentication, &vec![
            Kind::String(format!("{id}#controller")),
            Kind::String(format!("{id}#delegate-1")),
            Kind::String(format!("{id}#delegate-4")),
        ]);
        assert_eq!(document.key_agreement, Some(vec![Kind::String(format!("{id}#delegate-3"))]));

        let service = document.service(&format!("{id}#service-1")).expect("linked domains");
        assert_eq!(service.service_endpoint, Kind::String("https://example.com".into()));
        let service = document.service(&format!("{id}#service-2")).expect("messaging");
        assert_eq!(service.service_endpoint, Kind::Object(json!({"uri": "https://m.example"})));
    }

    #[test]
    fn deactivated_document() {
        let mut state = DidState::new(IDENTITY);
        state.owner = Address::NULL;
        state.updated = Some(9);
        state.attributes.push(attribute("did/svc/LinkedDomains", b"https://example.com"));

        let document = assemble(&did(), 1337, &state);
        assert_eq!(
            serde_json::to_value(&document).expect("should serialize"),
            json!({
                "@context": [BASE_CONTEXT, SECP256K1_RECOVERY_CONTEXT],
                "id": did().to_string()
            })
        );

        let metadata = DocumentMetadata::from_state(&state);
        assert_eq!(metadata.deactivated, Some(true));
        assert_eq!(metadata.version_id.as_deref(), Some("9"));
    }
}
