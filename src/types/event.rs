//! # Event Logs
//!
//! Raw logs returned by the node, their total order, and the query/page types
//! used to fetch them.

use serde::{Deserialize, Serialize};

use super::{Address, TxId};

/// A raw log emitted by a registry contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLog {
    /// Contract that emitted the log.
    pub address: Address,

    /// `topics[0]` is the event signature hash; further topics are indexed
    /// parameters.
    pub topics: Vec<[u8; 32]>,

    /// ABI-encoded non-indexed parameters.
    pub data: Vec<u8>,

    /// Block the log was emitted in.
    pub block_number: u64,

    /// Index of the emitting transaction within its block.
    pub transaction_index: u64,

    /// Index of the log within its block.
    pub log_index: u64,

    /// Emitting transaction, when the node reports it.
    pub transaction_hash: Option<TxId>,

    /// Block timestamp (seconds), when the node reports it.
    pub block_timestamp: Option<u64>,
}

impl EventLog {
    /// The log's position in the ledger's total order of logs.
    #[must_use]
    pub const fn position(&self) -> EventPosition {
        EventPosition {
            block_number: self.block_number,
            transaction_index: self.transaction_index,
            log_index: self.log_index,
        }
    }
}

/// Position of a log: ordered by block number, then transaction index, then
/// log index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPosition {
    /// Block number.
    pub block_number: u64,

    /// Transaction index within the block.
    pub transaction_index: u64,

    /// Log index within the block.
    pub log_index: u64,
}

/// Filter passed to the node's `get_logs`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Contract address.
    pub address: Address,

    /// Topic filter by position. `None` matches anything; `Some` matches any
    /// of the listed values.
    pub topics: Vec<Option<Vec<[u8; 32]>>>,

    /// First block (inclusive).
    pub from_block: u64,

    /// Last block (inclusive).
    pub to_block: u64,
}

impl LogFilter {
    /// Whether a log satisfies the filter.
    #[must_use]
    pub fn matches(&self, log: &EventLog) -> bool {
        if log.address != self.address
            || log.block_number < self.from_block
            || log.block_number > self.to_block
        {
            return false;
        }
        self.topics.iter().enumerate().all(|(i, allowed)| match allowed {
            None => true,
            Some(values) => log.topics.get(i).is_some_and(|t| values.contains(t)),
        })
    }
}

/// Restart point for a paginated event query: the position of the last log
/// already returned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCursor {
    /// Only logs strictly after this position are returned.
    pub after: EventPosition,
}

/// An event query against one contract.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// Contract address.
    pub address: Address,

    /// Topic filter by position.
    pub topics: Vec<Option<Vec<[u8; 32]>>>,

    /// First block (inclusive).
    pub from_block: u64,

    /// Last block (inclusive). `None` means the node's latest block.
    pub to_block: Option<u64>,

    /// Maximum number of logs per page. `None` returns the whole range.
    pub limit: Option<usize>,

    /// Continue after a previous page.
    pub cursor: Option<EventCursor>,
}

impl EventQuery {
    /// Query all logs of a contract.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Match any of the given values at topic position `index`.
    #[must_use]
    pub fn topic(mut self, index: usize, values: Vec<[u8; 32]>) -> Self {
        if self.topics.len() <= index {
            self.topics.resize(index + 1, None);
        }
        self.topics[index] = Some(values);
        self
    }

    /// Restrict the inclusive block range.
    #[must_use]
    pub const fn blocks(mut self, from_block: u64, to_block: Option<u64>) -> Self {
        self.from_block = from_block;
        self.to_block = to_block;
        self
    }

    /// Limit the page size.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Continue after a previous page.
    #[must_use]
    pub const fn cursor(mut self, cursor: Option<EventCursor>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// One page of logs, in ascending position order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventPage {
    /// Logs in this page.
    pub logs: Vec<EventLog>,

    /// Cursor for the next page, `None` when the range is exhausted.
    pub next: Option<EventCursor>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn log(block_number: u64, transaction_index: u64, log_index: u64) -> EventLog {
        EventLog {
            block_number,
            transaction_index,
            log_index,
            ..EventLog::default()
        }
    }

    #[test]
    fn total_order() {
        let mut logs = vec![log(5, 1, 3), log(2, 0, 9), log(5, 0, 4), log(5, 1, 2)];
        logs.sort_by_key(EventLog::position);
        let order: Vec<_> = logs.iter().map(|l| (l.block_number, l.transaction_index, l.log_index)).collect();
        assert_eq!(order, vec![(2, 0, 9), (5, 0, 4), (5, 1, 2), (5, 1, 3)]);
    }

    #[test]
    fn filter_topics() {
        let mut entry = log(3, 0, 0);
        entry.topics = vec![[1u8; 32], [2u8; 32]];
        let filter = LogFilter {
            topics: vec![Some(vec![[9u8; 32], [1u8; 32]]), None],
            from_block: 0,
            to_block: 10,
            ..LogFilter::default()
        };
        assert!(filter.matches(&entry));

        let filter = LogFilter {
            topics: vec![None, Some(vec![[3u8; 32]])],
            to_block: 10,
            ..LogFilter::default()
        };
        assert!(!filter.matches(&entry));
    }
}
