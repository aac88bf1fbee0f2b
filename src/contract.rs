//! # Contracts
//!
//! Static descriptions of the registry contracts: where each is deployed and
//! the methods and events it exposes.

mod registry;
mod spec;

pub use self::registry::{Contract, Registries, Registry};
pub use self::spec::ContractSpec;
