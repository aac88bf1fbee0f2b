//! # Ledger Client
//!
//! A session against one ledger: submits signed transactions, tracks their
//! status, runs read-only queries and paginated event queries, and checks node
//! health.
//!
//! The client holds no per-identity state. Nonce acquisition and submission
//! for one identity are not atomic: concurrent callers either serialize per
//! identity or see the losing transaction rejected with `ContractError`.

mod http;
mod node;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

pub use self::http::HttpNode;
pub use self::node::{Node, SignedPayload};
use crate::builder::{Query, QueryOutput, TransactionBuilder};
use crate::contract::Registries;
use crate::error::Err;
use crate::tracerr;
use crate::types::{
    EventCursor, EventLog, EventPage, EventQuery, LogFilter, PingStatus, Receipt, Transaction,
    TransactionState, TransactionType, TxId, ValidityClock,
};

/// Default maximum number of blocks per `get_logs` request.
pub const DEFAULT_BLOCK_WINDOW: u64 = 10_000;

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Client for one ledger.
#[derive(Clone, Debug)]
pub struct LedgerClient<N: Node> {
    node: N,
    registries: Arc<Registries>,
    block_window: u64,
    poll_interval: Duration,
    validity_clock: ValidityClock,
}

impl<N: Node> LedgerClient<N> {
    /// Create a client over `node` for the given registries.
    #[must_use]
    pub fn new(node: N, registries: Registries) -> Self {
        Self {
            node,
            registries: Arc::new(registries),
            block_window: DEFAULT_BLOCK_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            validity_clock: ValidityClock::default(),
        }
    }

    /// Maximum number of blocks requested from the node at once.
    #[must_use]
    pub fn block_window(mut self, block_window: u64) -> Self {
        self.block_window = block_window.max(1);
        self
    }

    /// Interval between status polls in [`LedgerClient::wait_for_confirmation`].
    #[must_use]
    pub const fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// What the DID registry measures delegate and attribute validity
    /// against. Block numbers by default.
    #[must_use]
    pub const fn validity_clock(mut self, validity_clock: ValidityClock) -> Self {
        self.validity_clock = validity_clock;
        self
    }

    /// The point validity windows are compared with at `block`: the block
    /// number itself, or the block's timestamp for registries that count in
    /// seconds.
    ///
    /// # Errors
    ///
    /// Will fail with the node's error when the timestamp cannot be read.
    pub async fn validity_horizon(&self, block: u64) -> crate::Result<u64> {
        match self.validity_clock {
            ValidityClock::BlockNumber => Ok(block),
            ValidityClock::Timestamp => self.node.block_timestamp(block).await,
        }
    }

    /// The registries this client talks to.
    #[must_use]
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// The underlying node.
    #[must_use]
    pub const fn node(&self) -> &N {
        &self.node
    }

    /// A transaction builder over this client's registries.
    #[must_use]
    pub fn builder(&self) -> TransactionBuilder<'_> {
        TransactionBuilder::new(&self.registries)
    }

    /// Fill the sender's account nonce if it is not already set.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidState` for read-only transactions, with
    /// `InvalidStructure` if the transaction has no sender, or with the
    /// node's error.
    pub async fn prepare_transaction(&self, tx: &mut Transaction) -> crate::Result<()> {
        if tx.type_() == TransactionType::Read {
            tracerr!(Err::InvalidState, "read-only transactions are not submitted");
        }
        let Some(from) = tx.from().copied() else {
            tracerr!(Err::InvalidStructure, "transaction has no sender");
        };
        if tx.nonce().is_none() {
            let nonce = self.node.transaction_count(&from).await?;
            tracing::trace!("prepare_transaction: {from} nonce {nonce}");
            tx.set_nonce(nonce);
        }
        Ok(())
    }

    /// Submit a signed transaction, returning its id as soon as the node
    /// accepts it.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidState` if a required signature is missing or the
    /// embedded endorsement's nonce was already consumed, and with
    /// `ContractError` if the node rejects the transaction (including nonce
    /// collisions).
    pub async fn submit(&self, tx: &Transaction) -> crate::Result<TxId> {
        tracing::debug!("LedgerClient::submit");

        if !tx.is_complete() {
            tracerr!(Err::InvalidState, "transaction is not fully signed");
        }
        self.check_endorsement(tx).await?;

        let payload = SignedPayload::try_from(tx)?;
        let tx_id = match self.node.send_transaction(&payload).await {
            Ok(tx_id) => tx_id,
            Err(e) => {
                tracing::error!(
                    "submit to {} from {} at nonce {} failed: {e}",
                    payload.to,
                    payload.from,
                    payload.nonce
                );
                return Err(e);
            }
        };

        tracing::info!("submitted {tx_id} from {} at nonce {}", payload.from, payload.nonce);
        Ok(tx_id)
    }

    // Rejects stale endorsements. Skipped when the node cannot be reached.
    async fn check_endorsement(&self, tx: &Transaction) -> crate::Result<()> {
        let Some(endorsement) = tx.endorsement() else {
            return Ok(());
        };
        let query = Query::Nonce {
            registry: endorsement.registry,
            account: endorsement.nonce_key,
        };
        match self.query(&query).await.and_then(|output| output.nonce()) {
            Ok(current) if current != endorsement.nonce => tracerr!(
                Err::InvalidState,
                "endorsement nonce {} for {} is stale, registry nonce is {current}",
                endorsement.nonce,
                endorsement.identity
            ),
            Ok(_) => Ok(()),
            Err(e) if e.is_retryable() => {
                tracing::warn!("skipping endorsement nonce check: {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// The receipt of a mined transaction.
    ///
    /// # Errors
    ///
    /// Will fail with the node's error.
    pub async fn get_receipt(&self, tx_id: &TxId) -> crate::Result<Option<Receipt>> {
        self.node.get_receipt(tx_id).await
    }

    /// Current lifecycle state of a submitted transaction.
    ///
    /// # Errors
    ///
    /// Will fail with the node's error.
    pub async fn status(&self, tx_id: &TxId) -> crate::Result<TransactionState> {
        let state = match self.node.get_receipt(tx_id).await? {
            Some(receipt) => TransactionState::from(&receipt),
            None => TransactionState::Pending,
        };
        tracing::trace!("status {tx_id}: {state:?}");
        Ok(state)
    }

    /// Poll until the transaction is confirmed or reverted, or `timeout`
    /// elapses. Timing out does not cancel the transaction.
    ///
    /// # Errors
    ///
    /// Will fail with the node's error.
    pub async fn wait_for_confirmation(
        &self, tx_id: &TxId, timeout: Duration,
    ) -> crate::Result<TransactionState> {
        let started = Instant::now();
        loop {
            let state = self.status(tx_id).await?;
            if state.is_final() {
                return Ok(state);
            }
            if started.elapsed() >= timeout {
                tracing::warn!("{tx_id} still pending after {timeout:?}");
                return Ok(TransactionState::Expired);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Execute a read-only transaction, returning the raw return data.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidState` for state-changing transactions, or with
    /// the node's error.
    pub async fn call(&self, tx: &Transaction) -> crate::Result<Vec<u8>> {
        if tx.type_() != TransactionType::Read {
            tracerr!(Err::InvalidState, "state-changing transactions must be submitted");
        }
        self.node.call(tx.to(), tx.data()).await
    }

    /// Run a query and decode its result.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidState` if the query's registry is not configured,
    /// with the node's error, or with a decoding error.
    pub async fn query(&self, query: &Query) -> crate::Result<QueryOutput> {
        tracing::debug!("LedgerClient::query: {}.{}", query.registry(), query.method());

        let tx = self.builder().build_query(query)?;
        let data = self.call(&tx).await?;
        query.parse(&self.registries, &data)
    }

    /// Fetch one page of logs in ascending (block, transaction, log) order.
    ///
    /// The range is requested from the node in windows of at most
    /// `block_window` blocks. A page is cut at `limit` logs; its cursor
    /// restarts the query immediately after the last log returned.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the limit is zero or the range is
    /// inverted, or with the node's error.
    pub async fn query_events(&self, query: &EventQuery) -> crate::Result<EventPage> {
        tracing::debug!("LedgerClient::query_events: {}", query.address);

        if query.limit == Some(0) {
            tracerr!(Err::InvalidStructure, "event query limit must be positive");
        }
        let to_block = match query.to_block {
            Some(to_block) => to_block,
            None => self.node.block_number().await?,
        };
        let after = query.cursor.map(|c| c.after);
        let mut from_block = after.map_or(query.from_block, |a| a.block_number.max(query.from_block));
        if query.to_block.is_some() && query.from_block > to_block {
            tracerr!(Err::InvalidStructure, "event query range {}..={to_block} is inverted", query.from_block);
        }

        let mut logs = Vec::new();
        while from_block <= to_block {
            let window_end = from_block.saturating_add(self.block_window - 1).min(to_block);
            let filter = LogFilter {
                address: query.address,
                topics: query.topics.clone(),
                from_block,
                to_block: window_end,
            };

            let mut batch = self.node.get_logs(&filter).await?;
            batch.sort_by_key(EventLog::position);
            logs.extend(batch.into_iter().filter(|log| !after.is_some_and(|a| log.position() <= a)));

            if let Some(limit) = query.limit {
                if logs.len() >= limit {
                    logs.truncate(limit);
                    let next = logs.last().map(|log| EventCursor {
                        after: log.position(),
                    });
                    return Ok(EventPage { logs, next });
                }
            }
            if window_end == u64::MAX {
                break;
            }
            from_block = window_end + 1;
        }

        tracing::trace!("query_events: {} logs up to block {to_block}", logs.len());
        Ok(EventPage { logs, next: None })
    }

    /// Fetch every log the query matches, following cursors until the range
    /// is exhausted.
    ///
    /// # Errors
    ///
    /// Will fail as [`LedgerClient::query_events`] does.
    pub async fn query_all_events(&self, query: &EventQuery) -> crate::Result<Vec<EventLog>> {
        let mut query = query.clone();
        if query.to_block.is_none() {
            // pin the range so later pages see the same chain head
            query.to_block = Some(self.node.block_number().await?);
        }

        let mut logs = Vec::new();
        loop {
            let page = self.query_events(&query).await?;
            logs.extend(page.logs);
            let Some(next) = page.next else {
                return Ok(logs);
            };
            query.cursor = Some(next);
        }
    }

    /// Check the node is reachable and on the configured chain. Never fails:
    /// problems are reported in the status.
    pub async fn ping(&self) -> PingStatus {
        tracing::debug!("LedgerClient::ping");

        let block_number = match self.node.block_number().await {
            Ok(block_number) => block_number,
            Err(e) => {
                tracing::warn!("ping failed: {e}");
                return PingStatus::err(format!("node unreachable: {e}"), None);
            }
        };
        match self.node.chain_id().await {
            Ok(chain_id) if chain_id == self.registries.chain_id() => PingStatus::ok(block_number),
            Ok(chain_id) => PingStatus::err(
                format!("node is on chain {chain_id}, expected {}", self.registries.chain_id()),
                Some(block_number),
            ),
            Err(e) => {
                tracing::warn!("ping failed: {e}");
                PingStatus::err(format!("node unreachable: {e}"), Some(block_number))
            }
        }
    }
}
