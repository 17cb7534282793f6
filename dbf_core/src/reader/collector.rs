use std::collections::VecDeque;

use dbf_filter::Record;

use super::ReadOrder;

/// Accumulates matching records for one read.
pub(crate) enum Collector {
    /// First `limit` matches in physical order.
    Forward {
        records: Vec<Record>,
        limit: Option<usize>,
    },
    /// Sliding window over the last `limit` matches.
    NewestFirst {
        window: VecDeque<Record>,
        limit: Option<usize>,
    },
}

impl Collector {
    pub(crate) fn new(order: ReadOrder, limit: Option<usize>) -> Self {
        match order {
            ReadOrder::Forward => Collector::Forward {
                records: Vec::with_capacity(limit.unwrap_or(0).min(1024)),
                limit,
            },
            ReadOrder::NewestFirst => Collector::NewestFirst {
                window: VecDeque::with_capacity(limit.unwrap_or(0).min(1024)),
                limit,
            },
        }
    }

    pub(crate) fn push(&mut self, record: Record) {
        match self {
            Collector::Forward { records, limit } => {
                if limit.map_or(true, |limit| records.len() < limit) {
                    records.push(record);
                }
            }
            Collector::NewestFirst { window, limit } => {
                if *limit == Some(0) {
                    return;
                }
                if limit.is_some_and(|limit| window.len() == limit) {
                    window.pop_front();
                }
                window.push_back(record);
            }
        }
    }

    /// True once further rows cannot change the result. Only a forward read
    /// can stop early; newest-first has to see the last row.
    pub(crate) fn is_full(&self) -> bool {
        match self {
            Collector::Forward { records, limit } => limit.is_some_and(|l| records.len() >= l),
            Collector::NewestFirst { .. } => false,
        }
    }

    pub(crate) fn finish(self) -> Vec<Record> {
        match self {
            Collector::Forward { records, .. } => records,
            Collector::NewestFirst { window, .. } => window.into_iter().rev().collect(),
        }
    }
}
