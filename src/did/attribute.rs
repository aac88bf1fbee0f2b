//! # DID Attributes and Delegates
//!
//! Attributes are `(name, value)` pairs stored against an identity. Names
//! follow the `did/pub/<algorithm>/<purpose>/<encoding>` convention for public
//! keys and `did/svc/<type>` for services; both are carried on-chain as
//! `bytes32`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Err, Error};
use crate::tracerr;

/// A DID attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct DidAttribute {
    name: String,
    #[serde(with = "crate::core::hex_bytes")]
    value: Vec<u8>,
}

impl DidAttribute {
    /// Create an attribute with an arbitrary name.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the name is empty or longer than
    /// 32 bytes.
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> crate::Result<Self> {
        let name = name.into();
        to_bytes32(&name)?;
        Ok(Self {
            name,
            value: value.into(),
        })
    }

    /// A public key attribute.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the key is empty.
    pub fn public_key(
        algorithm: KeyAlgorithm, purpose: KeyPurpose, encoding: KeyEncoding, key: &[u8],
    ) -> crate::Result<Self> {
        if key.is_empty() {
            tracerr!(Err::InvalidStructure, "public key must not be empty");
        }
        let kind = AttributeKind::PublicKey {
            algorithm,
            purpose,
            encoding,
        };
        Self::new(kind.to_string(), key)
    }

    /// A service endpoint attribute. The endpoint may be a URL or a JSON
    /// value.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the service type or endpoint is
    /// empty, or the name does not fit in 32 bytes.
    pub fn service(service_type: &str, endpoint: &str) -> crate::Result<Self> {
        if service_type.is_empty() || service_type.contains('/') || endpoint.is_empty() {
            tracerr!(Err::InvalidStructure, "service type and endpoint must not be empty");
        }
        let kind = AttributeKind::Service {
            service_type: service_type.to_string(),
        };
        Self::new(kind.to_string(), endpoint.as_bytes())
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The name as the `bytes32` the registry stores.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the name does not fit.
    pub fn name_bytes32(&self) -> crate::Result<[u8; 32]> {
        to_bytes32(&self.name)
    }
}

/// Delegate types recognised in DID documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DelegateType {
    /// May sign assertions.
    VeriKey,

    /// May sign assertions and authenticate.
    SigAuth,
}

impl DelegateType {
    /// The type as the `bytes32` the registry stores.
    #[must_use]
    pub fn bytes32(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        let name = self.to_string();
        out[..name.len()].copy_from_slice(name.as_bytes());
        out
    }
}

impl Display for DelegateType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VeriKey => write!(f, "veriKey"),
            Self::SigAuth => write!(f, "sigAuth"),
        }
    }
}

impl FromStr for DelegateType {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "veriKey" => Ok(Self::VeriKey),
            "sigAuth" => Ok(Self::SigAuth),
            _ => tracerr!(Err::InvalidStructure, "unknown delegate type {s}"),
        }
    }
}

/// Public key algorithm named in a key attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum KeyAlgorithm {
    /// secp256k1
    Secp256k1,

    /// Ed25519
    Ed25519,

    /// X25519
    X25519,

    /// RSA
    Rsa,
}

/// What a key attribute may be used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyPurpose {
    /// Assertions.
    VeriKey,

    /// Assertions and authentication.
    SigAuth,

    /// Key agreement.
    Enc,
}

/// How a key attribute's value is rendered in the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyEncoding {
    /// `publicKeyHex`
    Hex,

    /// `publicKeyBase64`
    Base64,

    /// `publicKeyBase58`
    Base58,
}

/// A parsed attribute name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    /// `did/pub/<algorithm>/<purpose>/<encoding>`
    PublicKey {
        /// Key algorithm.
        algorithm: KeyAlgorithm,

        /// Key purpose.
        purpose: KeyPurpose,

        /// Value encoding.
        encoding: KeyEncoding,
    },

    /// `did/svc/<type>`
    Service {
        /// Service type.
        service_type: String,
    },
}

impl Display for AttributeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PublicKey {
                algorithm,
                purpose,
                encoding,
            } => {
                let purpose = match purpose {
                    KeyPurpose::VeriKey => "veriKey",
                    KeyPurpose::SigAuth => "sigAuth",
                    KeyPurpose::Enc => "enc",
                };
                let encoding = match encoding {
                    KeyEncoding::Hex => "hex",
                    KeyEncoding::Base64 => "base64",
                    KeyEncoding::Base58 => "base58",
                };
                write!(f, "did/pub/{algorithm:?}/{purpose}/{encoding}")
            }
            Self::Service { service_type } => write!(f, "did/svc/{service_type}"),
        }
    }
}

impl FromStr for AttributeKind {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let parts = s.split('/').collect::<Vec<_>>();
        match parts.as_slice() {
            ["did", "pub", algorithm, purpose, encoding] => {
                let algorithm = match *algorithm {
                    "Secp256k1" => KeyAlgorithm::Secp256k1,
                    "Ed25519" => KeyAlgorithm::Ed25519,
                    "X25519" => KeyAlgorithm::X25519,
                    "Rsa" => KeyAlgorithm::Rsa,
                    _ => tracerr!(Err::InvalidStructure, "unknown key algorithm in {s}"),
                };
                let purpose = match *purpose {
                    "veriKey" => KeyPurpose::VeriKey,
                    "sigAuth" => KeyPurpose::SigAuth,
                    "enc" => KeyPurpose::Enc,
                    _ => tracerr!(Err::InvalidStructure, "unknown key purpose in {s}"),
                };
                let encoding = match *encoding {
                    "hex" => KeyEncoding::Hex,
                    "base64" => KeyEncoding::Base64,
                    "base58" => KeyEncoding::Base58,
                    _ => tracerr!(Err::InvalidStructure, "unknown key encoding in {s}"),
                };
                Ok(Self::PublicKey {
                    algorithm,
                    purpose,
                    encoding,
                })
            }
            ["did", "svc", service_type] if !service_type.is_empty() => Ok(Self::Service {
                service_type: (*service_type).to_string(),
            }),
            _ => tracerr!(Err::InvalidStructure, "unrecognised attribute name {s}"),
        }
    }
}

/// Left-align a name into a zero-padded `bytes32`.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the name is empty or longer than 32
/// bytes.
pub fn to_bytes32(name: &str) -> crate::Result<[u8; 32]> {
    if name.is_empty() || name.len() > 32 {
        tracerr!(Err::InvalidStructure, "name must be 1 to 32 bytes: {name}");
    }
    let mut out = [0u8; 32];
    out[..name.len()].copy_from_slice(name.as_bytes());
    Ok(out)
}

/// Read a zero-padded `bytes32` back into a name.
#[must_use]
pub fn from_bytes32(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8(bytes[..end].to_vec()).ok()
}
