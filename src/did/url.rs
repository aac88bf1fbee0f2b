//! # DID
//!
//! `did:ethr[:<network>]:<address>` identifiers. The identifier is the 20-byte
//! account address the DID registry keys state by.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Err, Error};
use crate::tracerr;
use crate::types::Address;

/// DID method name.
pub const METHOD: &str = "ethr";

static DID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^did:ethr:(?:(?<network>[a-zA-Z0-9_.-]+):)?(?<identity>0x[0-9a-fA-F]{40})$")
        .expect("should compile")
});

/// A parsed DID.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Did {
    /// Network name, if present.
    pub network: Option<String>,

    /// Account address identifying the DID subject.
    pub identity: Address,
}

impl Did {
    /// A DID for the identity, optionally qualified by network.
    #[must_use]
    pub const fn new(network: Option<String>, identity: Address) -> Self {
        Self { network, identity }
    }
}

impl Display for Did {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.network {
            Some(network) => write!(f, "did:{METHOD}:{network}:{}", self.identity),
            None => write!(f, "did:{METHOD}:{}", self.identity),
        }
    }
}

impl FromStr for Did {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let Some(caps) = DID_REGEX.captures(s) else {
            tracerr!(Err::InvalidStructure, "invalid DID: {s}");
        };
        let network = caps.name("network").map(|m| m.as_str().to_string());
        let Some(identity) = caps.name("identity") else {
            tracerr!(Err::InvalidStructure, "DID has no identifier: {s}");
        };
        Ok(Self {
            network,
            identity: identity.as_str().parse()?,
        })
    }
}

impl Serialize for Did {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
