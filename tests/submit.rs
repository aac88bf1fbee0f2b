//! Tests for submitting transactions and tracking their status.

use std::time::Duration;

use credibil_vdr::did::{build_changed, build_set_attribute, parse_changed, DidAttribute};
use credibil_vdr::error::Err;
use credibil_vdr::{LedgerClient, Node, Transaction, TransactionState};
use test_utils::{FakeNode, Wallet};

fn set_attribute(client: &LedgerClient<FakeNode>, wallet: &Wallet, endpoint: &str) -> Transaction {
    let address = wallet.address();
    let attribute = DidAttribute::service("LinkedDomains", endpoint).expect("valid");
    build_set_attribute(client.registries(), &address, &address, &attribute, 100).expect("should build")
}

// A signed transaction moves from submitted to confirmed.
#[tokio::test]
async fn confirmed() {
    test_utils::init_tracing();
    let node = FakeNode::default();
    let client = node.client().poll_interval(Duration::from_millis(5));
    let wallet = Wallet::new();

    let mut tx = set_attribute(&client, &wallet, "https://example.com");

    // unsigned transactions are not submitted
    let err = client.submit(&tx).await.expect_err("should reject unsigned");
    assert!(err.is(Err::InvalidState));

    client.prepare_transaction(&mut tx).await.expect("should prepare");
    assert_eq!(tx.nonce(), Some(0));
    wallet.sign_transaction(&mut tx).expect("should sign");

    let tx_id = client.submit(&tx).await.expect("should submit");
    assert_eq!(tx_id, tx.tx_id().expect("should have id"));

    let state = client.wait_for_confirmation(&tx_id, Duration::from_secs(1)).await.expect("should confirm");
    assert_eq!(state, TransactionState::Confirmed { block: 1 });

    // the change is visible to read-only calls
    let query = build_changed(client.registries(), &wallet.address()).expect("should build");
    let data = client.call(&query).await.expect("should call");
    assert_eq!(parse_changed(client.registries(), &data).expect("should parse"), 1);

    // state-changing transactions cannot be called
    let err = client.call(&tx).await.expect_err("should reject write");
    assert!(err.is(Err::InvalidState));
}

// A nonce ahead of the account's is rejected by the node.
#[tokio::test]
async fn nonce_gap() {
    let node = FakeNode::default();
    let client = node.client();
    let wallet = Wallet::new();

    let mut tx = set_attribute(&client, &wallet, "https://example.com");
    tx.set_nonce(1);
    wallet.sign_transaction(&mut tx).expect("should sign");

    let err = client.submit(&tx).await.expect_err("should reject nonce");
    assert!(err.is(Err::ContractError));
    assert!(!err.is_retryable());
}

// A direct transaction signed by anyone but its sender is rejected.
#[tokio::test]
async fn wrong_signer() {
    let node = FakeNode::default();
    let client = node.client();
    let owner = Wallet::new();
    let intruder = Wallet::new();

    let mut tx = set_attribute(&client, &owner, "https://example.com");
    client.prepare_transaction(&mut tx).await.expect("should prepare");
    intruder.sign_transaction(&mut tx).expect("should sign");

    let err = client.submit(&tx).await.expect_err("should reject signer");
    assert!(err.is(Err::ContractError));
    assert!(err.to_string().contains("invalid sender"));

    // nothing was mined and neither account's nonce moved
    assert_eq!(client.node().block_number().await.expect("should get head"), 0);
    for wallet in [&owner, &intruder] {
        let mut tx = set_attribute(&client, wallet, "https://example.com");
        client.prepare_transaction(&mut tx).await.expect("should prepare");
        assert_eq!(tx.nonce(), Some(0));
    }

    // the owner's own signature is accepted
    owner.sign_transaction(&mut tx).expect("should sign");
    client.submit(&tx).await.expect("should submit");
}

// Of two transactions racing for one nonce, exactly one is accepted.
#[tokio::test]
async fn concurrent_nonce() {
    let node = FakeNode::default();
    let client = node.client();
    let wallet = Wallet::new();

    let mut first = set_attribute(&client, &wallet, "https://one.example.com");
    let mut second = set_attribute(&client, &wallet, "https://two.example.com");
    for tx in [&mut first, &mut second] {
        client.prepare_transaction(tx).await.expect("should prepare");
        wallet.sign_transaction(tx).expect("should sign");
    }
    assert_eq!(first.nonce(), second.nonce());

    let (a, b) = tokio::join!(client.submit(&first), client.submit(&second));
    let (accepted, rejected) = match (a, b) {
        (Ok(tx_id), Err(e)) | (Err(e), Ok(tx_id)) => (tx_id, e),
        other => panic!("expected exactly one acceptance: {other:?}"),
    };
    assert!(rejected.is(Err::ContractError));
    assert!(matches!(
        client.status(&accepted).await.expect("should get status"),
        TransactionState::Confirmed { .. }
    ));
}

// A reverted transaction reports its reason and block.
#[tokio::test]
async fn reverted() {
    let node = FakeNode::default();
    let client = node.client();
    let wallet = Wallet::new();

    node.revert_next("out of gas").await;
    let mut tx = set_attribute(&client, &wallet, "https://example.com");
    client.prepare_transaction(&mut tx).await.expect("should prepare");
    wallet.sign_transaction(&mut tx).expect("should sign");
    let tx_id = client.submit(&tx).await.expect("should submit");

    assert_eq!(
        client.status(&tx_id).await.expect("should get status"),
        TransactionState::Reverted {
            block: 1,
            reason: Some("out of gas".into())
        }
    );

    // the reverted transaction still consumed its nonce
    let mut tx = set_attribute(&client, &wallet, "https://example.com");
    client.prepare_transaction(&mut tx).await.expect("should prepare");
    assert_eq!(tx.nonce(), Some(1));
}

// Waiting gives up without cancelling a transaction that stays pending.
#[tokio::test]
async fn pending_then_expired() {
    let node = FakeNode::default();
    let client = node.client().poll_interval(Duration::from_millis(5));
    let wallet = Wallet::new();

    node.hide_receipts(true).await;
    let mut tx = set_attribute(&client, &wallet, "https://example.com");
    client.prepare_transaction(&mut tx).await.expect("should prepare");
    wallet.sign_transaction(&mut tx).expect("should sign");
    let tx_id = client.submit(&tx).await.expect("should submit");

    assert_eq!(client.status(&tx_id).await.expect("should get status"), TransactionState::Pending);
    let state = client.wait_for_confirmation(&tx_id, Duration::from_millis(20)).await.expect("should wait");
    assert_eq!(state, TransactionState::Expired);

    node.hide_receipts(false).await;
    assert!(client.status(&tx_id).await.expect("should get status").is_final());
}

// Transport failures surface as retryable network errors.
#[tokio::test]
async fn offline() {
    let node = FakeNode::default();
    let client = node.client();
    let wallet = Wallet::new();

    node.set_offline(true).await;
    let mut tx = set_attribute(&client, &wallet, "https://example.com");
    let err = client.prepare_transaction(&mut tx).await.expect_err("should fail");
    assert!(err.is(Err::NetworkError));
    assert!(err.is_retryable());
}

// Ping reports reachability and chain mismatches without failing.
#[tokio::test]
async fn ping() {
    let node = FakeNode::default();
    let client = node.client();

    node.advance_blocks(3).await;
    let status = client.ping().await;
    assert!(status.is_ok());
    assert_eq!(status.block_number, Some(3));

    node.set_chain_id(1).await;
    let status = client.ping().await;
    assert!(!status.is_ok());
    assert_eq!(status.block_number, Some(3));

    node.set_offline(true).await;
    let status = client.ping().await;
    assert!(!status.is_ok());
    assert_eq!(status.block_number, None);
}
