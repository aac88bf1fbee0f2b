//! # Test Utilities
//!
//! An in-memory ledger node, a signing wallet and tracing setup shared by the
//! client's tests.

mod node;
mod wallet;

use std::sync::Once;

use tracing_subscriber::EnvFilter;

pub use crate::node::{
    block_timestamp, registries, FakeNode, CHAIN_ID, CREDENTIAL_DEFINITION_REGISTRY, DID_REGISTRY, ROLE_CONTROL,
    SCHEMA_REGISTRY, VALIDATOR_CONTROL,
};
pub use crate::wallet::Wallet;

static INIT: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process. Filtering
/// follows `RUST_LOG`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("tracing subscriber already set: {e}");
        }
    });
}
