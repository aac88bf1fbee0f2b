//! Tests for windowed and paginated event queries.

use credibil_vdr::error::Err;
use credibil_vdr::{EventLog, EventQuery};
use test_utils::{FakeNode, DID_REGISTRY, SCHEMA_REGISTRY};

const TOPIC: [u8; 32] = [0x11; 32];
const OTHER_TOPIC: [u8; 32] = [0x22; 32];

fn log(block_number: u64, transaction_index: u64, log_index: u64) -> EventLog {
    EventLog {
        address: DID_REGISTRY,
        topics: vec![TOPIC],
        block_number,
        transaction_index,
        log_index,
        ..EventLog::default()
    }
}

// Blocks 1 to 10, three logs each, pushed newest first, plus logs the filter
// excludes.
async fn seeded_node() -> FakeNode {
    let node = FakeNode::default();
    for block in (1..=10).rev() {
        node.push_log(log(block, 1, 2)).await;
        node.push_log(log(block, 0, 0)).await;
        node.push_log(log(block, 0, 1)).await;
    }
    node.push_log(EventLog {
        topics: vec![OTHER_TOPIC],
        ..log(5, 2, 3)
    })
    .await;
    node.push_log(EventLog {
        address: SCHEMA_REGISTRY,
        ..log(5, 2, 4)
    })
    .await;
    node
}

// Logs come back in ledger order, fetched in block windows.
#[tokio::test]
async fn ordered_and_windowed() {
    test_utils::init_tracing();
    let node = seeded_node().await;
    let client = node.client().block_window(3);

    let query = EventQuery::new(DID_REGISTRY).topic(0, vec![TOPIC]);
    let logs = client.query_all_events(&query).await.expect("should query");
    assert_eq!(logs.len(), 30);
    assert!(logs.windows(2).all(|pair| pair[0].position() < pair[1].position()));

    // blocks 0..=10 in windows of 3
    assert_eq!(node.log_requests().await, 4);
}

// Following cursors page by page yields exactly the unpaginated result.
#[tokio::test]
async fn pagination() {
    let node = seeded_node().await;
    let client = node.client().block_window(4);

    let query = EventQuery::new(DID_REGISTRY).topic(0, vec![TOPIC]).blocks(0, Some(10));
    let all = client.query_events(&query).await.expect("should query");
    assert!(all.next.is_none());

    let mut query = query.limit(4);
    let mut paged = Vec::new();
    loop {
        let page = client.query_events(&query).await.expect("should query page");
        assert!(page.logs.len() <= 4);
        paged.extend(page.logs);
        let Some(next) = page.next else {
            break;
        };
        query = query.cursor(Some(next));
    }
    assert_eq!(paged, all.logs);

    // a range restricted to one block
    let query = EventQuery::new(DID_REGISTRY).topic(0, vec![TOPIC]).blocks(7, Some(7));
    let page = client.query_events(&query).await.expect("should query");
    assert_eq!(page.logs.iter().map(|log| (log.transaction_index, log.log_index)).collect::<Vec<_>>(), [
        (0, 0),
        (0, 1),
        (1, 2)
    ]);
}

// Malformed queries are rejected before reaching the node.
#[tokio::test]
async fn invalid_queries() {
    let node = seeded_node().await;
    let client = node.client();

    let query = EventQuery::new(DID_REGISTRY).limit(0);
    let err = client.query_events(&query).await.expect_err("should reject limit");
    assert!(err.is(Err::InvalidStructure));

    let query = EventQuery::new(DID_REGISTRY).blocks(8, Some(3));
    let err = client.query_events(&query).await.expect_err("should reject range");
    assert!(err.is(Err::InvalidStructure));
    assert_eq!(node.log_requests().await, 0);
}
