//! Tests for creating and resolving schemas and credential definitions.

use credibil_vdr::anoncreds::{
    build_create_credential_definition, build_create_schema, build_create_schema_endorsing_data,
    resolve_credential_definition, resolve_schema, CredentialDefinition, Schema, SchemaId,
    CL_SIGNATURE_TYPE,
};
use credibil_vdr::error::Err;
use credibil_vdr::{LedgerClient, Transaction, TransactionState};
use serde_json::json;
use test_utils::{FakeNode, Wallet};

async fn submit(client: &LedgerClient<FakeNode>, wallet: &Wallet, mut tx: Transaction) -> TransactionState {
    client.prepare_transaction(&mut tx).await.expect("should prepare");
    wallet.sign_transaction(&mut tx).expect("should sign");
    let tx_id = client.submit(&tx).await.expect("should submit");
    client.status(&tx_id).await.expect("should get status")
}

fn schema(issuer: &Wallet) -> Schema {
    Schema {
        issuer_id: issuer.did("testnet"),
        name: "F1DClaim".into(),
        version: "1.0".into(),
        attr_names: vec!["First Name".into(), "Last Name".into()],
    }
}

fn credential_definition(issuer: &Wallet, schema_id: SchemaId) -> CredentialDefinition {
    CredentialDefinition {
        issuer_id: issuer.did("testnet"),
        schema_id,
        cred_def_type: CL_SIGNATURE_TYPE.into(),
        tag: "default".into(),
        value: json!({
            "primary": {"n": "779...397", "r": {"first_name": "169...937"}, "s": "649...091"}
        }),
    }
}

// A created schema resolves to the same schema; it cannot be created twice.
#[tokio::test]
async fn create_schema() {
    test_utils::init_tracing();
    let node = FakeNode::default();
    let client = node.client();
    let issuer = Wallet::new();
    let schema = schema(&issuer);

    let tx = build_create_schema(client.registries(), &issuer.address(), &schema).expect("should build");
    assert_eq!(submit(&client, &issuer, tx).await, TransactionState::Confirmed { block: 1 });

    let resolved = resolve_schema(&client, &schema.id()).await.expect("should resolve");
    assert_eq!(resolved, schema);

    let tx = build_create_schema(client.registries(), &issuer.address(), &schema).expect("should build");
    let TransactionState::Reverted { reason, .. } = submit(&client, &issuer, tx).await else {
        panic!("should revert");
    };
    assert!(reason.expect("should have reason").contains("already exists"));
}

// Only the issuer's account may create its schemas.
#[tokio::test]
async fn schema_not_owner() {
    let node = FakeNode::default();
    let client = node.client();
    let issuer = Wallet::new();
    let other = Wallet::new();

    let tx = build_create_schema(client.registries(), &other.address(), &schema(&issuer)).expect("should build");
    assert!(matches!(submit(&client, &other, tx).await, TransactionState::Reverted { .. }));

    let err = resolve_schema(&client, &schema(&issuer).id()).await.expect_err("should not resolve");
    assert!(err.is(Err::NotFound));
}

// An unknown schema is not found.
#[tokio::test]
async fn schema_not_found() {
    let node = FakeNode::default();
    let client = node.client();

    let id = SchemaId::new(&Wallet::new().did("testnet"), "Missing", "1.0");
    let err = resolve_schema(&client, &id).await.expect_err("should not resolve");
    assert!(err.is(Err::NotFound));
}

// An endorser creates a schema on the issuer's behalf.
#[tokio::test]
async fn endorsed_schema() {
    let node = FakeNode::default();
    let client = node.client();
    let issuer = Wallet::new();
    let endorser = Wallet::new();
    let schema = schema(&issuer);

    let mut data = build_create_schema_endorsing_data(&client, &schema).await.expect("should build");
    assert_eq!(data.nonce_key, issuer.address());
    issuer.endorse(&mut data).expect("should endorse");

    let tx = client.builder().sender(endorser.address()).build_endorsed(&data).expect("should build");
    assert!(matches!(submit(&client, &endorser, tx).await, TransactionState::Confirmed { .. }));

    let resolved = resolve_schema(&client, &schema.id()).await.expect("should resolve");
    assert_eq!(resolved.attr_names, schema.attr_names);
}

// A credential definition requires its schema and resolves once created.
#[tokio::test]
async fn create_credential_definition() {
    let node = FakeNode::default();
    let client = node.client();
    let issuer = Wallet::new();
    let schema = schema(&issuer);
    let credential_definition = credential_definition(&issuer, schema.id());

    // the schema does not exist yet
    let tx = build_create_credential_definition(client.registries(), &issuer.address(), &credential_definition)
        .expect("should build");
    let TransactionState::Reverted { reason, .. } = submit(&client, &issuer, tx).await else {
        panic!("should revert");
    };
    assert_eq!(reason.as_deref(), Some("SchemaNotFound"));

    let err = resolve_credential_definition(&client, &credential_definition.id())
        .await
        .expect_err("should not resolve");
    assert!(err.is(Err::NotFound));

    let tx = build_create_schema(client.registries(), &issuer.address(), &schema).expect("should build");
    submit(&client, &issuer, tx).await;
    let tx = build_create_credential_definition(client.registries(), &issuer.address(), &credential_definition)
        .expect("should build");
    assert_eq!(submit(&client, &issuer, tx).await, TransactionState::Confirmed { block: 3 });

    let resolved =
        resolve_credential_definition(&client, &credential_definition.id()).await.expect("should resolve");
    assert_eq!(resolved, credential_definition);
}
