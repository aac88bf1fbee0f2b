//! # DID Resolver
//!
//! Resolves registry DIDs by replaying the identity's change events, in log
//! order, up to a target block.
//!
//! See [DID resolution](https://www.w3.org/TR/did-core/#did-resolution) for more.

use serde::{Deserialize, Serialize};

use super::document::{assemble, Document, DocumentMetadata};
use super::event::{DidChange, DID_EVENTS};
use super::state::DidState;
use super::url::Did;
use crate::abi::address_topic;
use crate::builder::Query;
use crate::client::{LedgerClient, Node};
use crate::contract::Registry;
use crate::error::Err;
use crate::tracerr;
use crate::types::EventQuery;

/// Media type of resolved documents.
pub const DID_LD_JSON: &str = "application/did+ld+json";

/// Options controlling which version of a DID document is resolved.
///
/// ```json
/// { "blockHeight": 20, "latestOnly": false }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DidResolutionOptions {
    /// Resolve the document as it was at this block. Defaults to the chain
    /// head.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,

    /// Resolve at the chain head, taking the owner from the registry's
    /// current state rather than from replayed events.
    #[serde(default)]
    pub latest_only: bool,
}

impl DidResolutionOptions {
    /// Resolve at `block_height`.
    #[must_use]
    pub const fn at(block_height: u64) -> Self {
        Self {
            block_height: Some(block_height),
            latest_only: false,
        }
    }

    /// Check the options are consistent.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if both a block height and
    /// `latestOnly` are set.
    pub fn validate(&self) -> crate::Result<()> {
        if self.latest_only && self.block_height.is_some() {
            tracerr!(Err::InvalidStructure, "latestOnly cannot be combined with blockHeight");
        }
        Ok(())
    }
}

/// The result of resolving a DID.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DidResolution {
    /// The DID document.
    pub did_document: Document,

    /// Metadata about the document.
    pub did_document_metadata: DocumentMetadata,

    /// Metadata about the resolution.
    pub did_resolution_metadata: ResolutionMetadata,
}

/// Metadata about a DID resolution.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionMetadata {
    /// The media type of the returned document.
    pub content_type: String,

    /// Block the document was resolved at.
    pub block_height: u64,
}

/// Resolve a DID document.
///
/// Delegates and attributes whose validity ended at or before the target
/// block are dropped. Validity is compared with the target's block number, or
/// with its timestamp when the client's [`ValidityClock`] is `Timestamp`.
///
/// [`ValidityClock`]: crate::types::ValidityClock
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the options are inconsistent, with
/// `NotFound` if the identity has never changed, and with `InternalError`
/// if an event cannot be decoded.
pub async fn resolve_did<N: Node>(
    client: &LedgerClient<N>, did: &Did, options: &DidResolutionOptions,
) -> crate::Result<DidResolution> {
    tracing::debug!("resolve_did: {did}");

    options.validate()?;
    let identity = did.identity;

    let changed = client.query(&Query::Changed { identity }).await?.block()?;
    if changed == 0 {
        tracerr!(Err::NotFound, "{did} has no changes recorded");
    }
    let target = match options.block_height {
        Some(block_height) => block_height,
        None => client.node().block_number().await?,
    };

    let contract = client.registries().contract(Registry::DidRegistry)?;
    let topics = DID_EVENTS
        .iter()
        .map(|name| contract.event(name).map(|event| event.topic()))
        .collect::<crate::Result<Vec<_>>>()?;
    let query = EventQuery::new(contract.address)
        .topic(0, topics)
        .topic(1, vec![address_topic(&identity)])
        .blocks(0, Some(target));

    let logs = client.query_all_events(&query).await?;
    let mut state = DidState::new(identity);
    for log in &logs {
        if let Some(change) = DidChange::from_log(contract, log)? {
            state.apply(&change);
        }
    }

    if options.latest_only {
        let owner = client.query(&Query::IdentityOwner { identity }).await?.owner()?;
        if owner != state.owner {
            tracing::warn!("{did}: registry owner {owner} differs from replayed {}", state.owner);
            state.owner = owner;
        }
    }

    let state = state.at(client.validity_horizon(target).await?);
    tracing::info!(
        "resolved {did} at block {target}: {} changes, {} attributes, {} delegates",
        logs.len(),
        state.attributes.len(),
        state.delegates.len()
    );

    Ok(DidResolution {
        did_document: assemble(did, client.registries().chain_id(), &state),
        did_document_metadata: DocumentMetadata::from_state(&state),
        did_resolution_metadata: ResolutionMetadata {
            content_type: DID_LD_JSON.to_string(),
            block_height: target,
        },
    })
}

#[cfg(test)]
mod test {
    use insta::assert_json_snapshot as assert_snapshot;

    use super::*;

    #[test]
    fn options_wire_shape() {
        let options: DidResolutionOptions =
            serde_json::from_str(r#"{"blockHeight": 20}"#).expect("should deserialize");
        assert_eq!(options, DidResolutionOptions::at(20));

        assert_snapshot!(DidResolutionOptions::at(20), @r###"
        {
          "blockHeight": 20,
          "latestOnly": false
        }
        "###);
    }

    #[test]
    fn conflicting_options() {
        let options = DidResolutionOptions {
            block_height: Some(10),
            latest_only: true,
        };
        assert!(options.validate().expect_err("should fail").is(Err::InvalidStructure));
        DidResolutionOptions::default().validate().expect("default is valid");
    }
}
