//! Tests for sponsored transactions: the identity signs endorsing data and an
//! endorser submits and pays for the transaction.

use credibil_vdr::did::{
    build_set_attribute_endorsing_data, resolve_did, Did, DidAttribute, DidResolutionOptions,
};
use credibil_vdr::error::Err;
use credibil_vdr::{
    Authorization, LedgerClient, Node, Registry, Transaction, TransactionEndorsingData,
    TransactionState,
};
use primitive_types::U256;
use test_utils::{FakeNode, Wallet};

async fn submit(client: &LedgerClient<FakeNode>, endorser: &Wallet, data: &TransactionEndorsingData) -> TransactionState {
    let tx = sponsored(client, endorser, data).await;
    let tx_id = client.submit(&tx).await.expect("should submit");
    client.status(&tx_id).await.expect("should get status")
}

async fn sponsored(client: &LedgerClient<FakeNode>, endorser: &Wallet, data: &TransactionEndorsingData) -> Transaction {
    let mut tx = client.builder().sender(endorser.address()).build_endorsed(data).expect("should build");
    client.prepare_transaction(&mut tx).await.expect("should prepare");
    endorser.sign_transaction(&mut tx).expect("should sign");
    tx
}

// An endorser submits an attribute change signed by the identity.
#[tokio::test]
async fn sponsored_attribute() {
    test_utils::init_tracing();
    let node = FakeNode::default();
    let client = node.client();
    let identity = Wallet::new();
    let endorser = Wallet::new();
    let address = identity.address();

    let attribute = DidAttribute::service("LinkedDomains", "https://example.com").expect("valid");
    let mut data = build_set_attribute_endorsing_data(&client, &address, &attribute, 100)
        .await
        .expect("should build endorsing data");
    assert_eq!(data.nonce, U256::zero());
    assert_eq!(data.method, "setAttribute");
    identity.endorse(&mut data).expect("should endorse");

    // the signed data travels to the endorser as JSON
    let json = serde_json::to_string(&data).expect("should serialize");
    let data: TransactionEndorsingData = serde_json::from_str(&json).expect("should deserialize");

    let tx = sponsored(&client, &endorser, &data).await;
    assert_eq!(tx.authorization(), Authorization::Sponsored);
    let tx_id = client.submit(&tx).await.expect("should submit");
    assert_eq!(client.status(&tx_id).await.expect("should get status"), TransactionState::Confirmed { block: 1 });

    // the endorser sent the transaction; the identity's registry nonce moved on
    assert_eq!(node.transaction_count(&endorser.address()).await.expect("should get count"), 1);
    assert_eq!(node.transaction_count(&address).await.expect("should get count"), 0);
    let nonce = client.registry_nonce(Registry::DidRegistry, &address).await.expect("should get nonce");
    assert_eq!(nonce, U256::one());

    let did = Did::new(None, address);
    let resolution =
        resolve_did(&client, &did, &DidResolutionOptions::default()).await.expect("should resolve");
    assert!(resolution.did_document.service(&format!("{did}#service-1")).is_some());

    // replaying the endorsement is caught before it reaches the node
    let replay = sponsored(&client, &endorser, &data).await;
    let err = client.submit(&replay).await.expect_err("should reject replay");
    assert!(err.is(Err::InvalidState));
}

// The registry rejects endorsements not signed by the identity's owner and
// leaves its nonce untouched.
#[tokio::test]
async fn wrong_signer() {
    let node = FakeNode::default();
    let client = node.client();
    let identity = Wallet::new();
    let impostor = Wallet::new();
    let endorser = Wallet::new();
    let address = identity.address();

    let attribute = DidAttribute::service("LinkedDomains", "https://example.com").expect("valid");
    let mut data = build_set_attribute_endorsing_data(&client, &address, &attribute, 100)
        .await
        .expect("should build endorsing data");
    impostor.endorse(&mut data).expect("should sign");

    let TransactionState::Reverted { reason, .. } = submit(&client, &endorser, &data).await else {
        panic!("should revert");
    };
    assert!(reason.expect("should have reason").starts_with("bad_signature"));

    let nonce = client.registry_nonce(Registry::DidRegistry, &address).await.expect("should get nonce");
    assert_eq!(nonce, U256::zero());
}

// Endorsing data altered after signing no longer matches its hash.
#[tokio::test]
async fn tampered_endorsement() {
    let node = FakeNode::default();
    let client = node.client();
    let identity = Wallet::new();
    let address = identity.address();

    let attribute = DidAttribute::service("LinkedDomains", "https://example.com").expect("valid");
    let mut data = build_set_attribute_endorsing_data(&client, &address, &attribute, 100)
        .await
        .expect("should build endorsing data");
    identity.endorse(&mut data).expect("should endorse");
    data.nonce = U256::from(5);

    let err = client
        .builder()
        .sender(Wallet::new().address())
        .build_endorsed(&data)
        .expect_err("should reject tampered data");
    assert!(err.is(Err::InvalidStructure));

    // unsigned data cannot be submitted either
    let unsigned = build_set_attribute_endorsing_data(&client, &address, &attribute, 100)
        .await
        .expect("should build endorsing data");
    let err = client
        .builder()
        .sender(Wallet::new().address())
        .build_endorsed(&unsigned)
        .expect_err("should reject unsigned data");
    assert!(err.is(Err::InvalidState));
}
