//! # DID State
//!
//! The current state of an identity, folded from its ordered change history.

use super::event::{DidChange, DidEvent};
use crate::types::Address;

/// An attribute and the point it stops being valid at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeEntry {
    /// Attribute name.
    pub name: String,

    /// Attribute value.
    pub value: Vec<u8>,

    /// First block (or timestamp, see [`ValidityClock`]) the attribute is no
    /// longer valid at.
    ///
    /// [`ValidityClock`]: crate::types::ValidityClock
    pub valid_to: u64,
}

/// A delegate and the point it stops being valid at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegateEntry {
    /// Delegate type name.
    pub delegate_type: String,

    /// Delegate account.
    pub delegate: Address,

    /// First block (or timestamp) the delegate is no longer valid at.
    pub valid_to: u64,
}

/// Identity state accumulated from DID registry events.
///
/// Attributes are keyed by name and value, delegates by type and account.
/// Entries keep the order they were first seen in so documents are stable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DidState {
    /// The identity.
    pub identity: Address,

    /// Current owner. Starts as the identity itself.
    pub owner: Address,

    /// Attributes, including expired ones until [`DidState::at`] is applied.
    pub attributes: Vec<AttributeEntry>,

    /// Delegates, including expired ones until [`DidState::at`] is applied.
    pub delegates: Vec<DelegateEntry>,

    /// Block of the last applied change.
    pub updated: Option<u64>,

    /// Timestamp of the last applied change, when known.
    pub updated_at: Option<u64>,
}

impl DidState {
    /// The state of an identity that never changed.
    #[must_use]
    pub const fn new(identity: Address) -> Self {
        Self {
            identity,
            owner: identity,
            attributes: Vec::new(),
            delegates: Vec::new(),
            updated: None,
            updated_at: None,
        }
    }

    /// Apply one change. Changes must be applied in ascending log order;
    /// changes to other identities are ignored.
    pub fn apply(&mut self, change: &DidChange) {
        if change.identity != self.identity {
            tracing::warn!("ignoring change to {} while resolving {}", change.identity, self.identity);
            return;
        }

        match &change.event {
            DidEvent::OwnerChanged { owner } => self.owner = *owner,
            DidEvent::DelegateChanged {
                delegate_type,
                delegate,
                valid_to,
            } => {
                let existing = self
                    .delegates
                    .iter_mut()
                    .find(|d| &d.delegate_type == delegate_type && &d.delegate == delegate);
                match existing {
                    Some(entry) => entry.valid_to = *valid_to,
                    None => self.delegates.push(DelegateEntry {
                        delegate_type: delegate_type.clone(),
                        delegate: *delegate,
                        valid_to: *valid_to,
                    }),
                }
            }
            DidEvent::AttributeChanged {
                name,
                value,
                valid_to,
            } => {
                let existing =
                    self.attributes.iter_mut().find(|a| &a.name == name && &a.value == value);
                match existing {
                    Some(entry) => entry.valid_to = *valid_to,
                    None => self.attributes.push(AttributeEntry {
                        name: name.clone(),
                        value: value.clone(),
                        valid_to: *valid_to,
                    }),
                }
            }
        }

        self.updated = Some(change.position.block_number);
        self.updated_at = change.timestamp;
    }

    /// Fold an ordered history into a state.
    #[must_use]
    pub fn replay<'a>(identity: Address, changes: impl IntoIterator<Item = &'a DidChange>) -> Self {
        let mut state = Self::new(identity);
        for change in changes {
            state.apply(change);
        }
        state
    }

    /// The state as seen at `horizon`, a block number or timestamp matching
    /// the registry's validity clock: entries whose validity ended at or
    /// before `horizon` are dropped.
    #[must_use]
    pub fn at(mut self, horizon: u64) -> Self {
        self.attributes.retain(|a| a.valid_to > horizon);
        self.delegates.retain(|d| d.valid_to > horizon);
        self
    }

    /// Whether the DID has been deactivated.
    #[must_use]
    pub fn is_deactivated(&self) -> bool {
        self.owner.is_null()
    }
}
