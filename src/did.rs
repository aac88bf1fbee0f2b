//! # DID Registry
//!
//! Builders, queries and the resolver for `did:ethr` identities held in the
//! DID registry.
//!
//! Registry DIDs have no stored document. The registry records ownership,
//! delegate and attribute changes as events; a document is resolved by
//! replaying those events, in log order, up to a target block.
//!
//! See [DID resolution](https://www.w3.org/TR/did-core/#did-resolution) for more.

mod attribute;
mod document;
mod event;
mod registry;
mod resolve;
mod state;
mod url;

pub use self::attribute::{
    from_bytes32, to_bytes32, AttributeKind, DelegateType, DidAttribute, KeyAlgorithm,
    KeyEncoding, KeyPurpose,
};
pub use self::document::{
    assemble, Document, DocumentMetadata, KeyFormat, Service, VerificationMethod, BASE_CONTEXT,
    RECOVERY_METHOD_TYPE, SECP256K1_RECOVERY_CONTEXT,
};
pub use self::event::{DidChange, DidEvent, DID_EVENTS};
pub use self::registry::*;
pub use self::resolve::{
    resolve_did, DidResolution, DidResolutionOptions, ResolutionMetadata, DID_LD_JSON,
};
pub use self::state::{AttributeEntry, DelegateEntry, DidState};
pub use self::url::{Did, METHOD};
