//! # Types
//!
//! Values passed between the builders, the signer and the ledger client.

mod address;
mod clock;
mod endorsing;
mod event;
mod signature;
mod status;
mod transaction;

pub use self::address::Address;
pub use self::clock::ValidityClock;
pub use self::endorsing::{endorsement_hash, TransactionEndorsingData};
pub use self::event::{EventCursor, EventLog, EventPage, EventPosition, EventQuery, LogFilter};
pub use self::signature::{Authorization, SignatureData, Signatures};
pub use self::status::{PingStatus, Receipt, Status, TransactionState};
pub use self::transaction::{
    Endorsement, Transaction, TransactionKind, TransactionType, TxId, DEFAULT_GAS,
};
