use crate::model::*;
use crate::portfolio::SortDirection;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub asset: Option<String>,
    /// Substring over asset symbol and chain hash.
    pub query: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionSortKey {
    Timestamp,
    Value,
    Amount,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionSummary {
    pub count: usize,
    pub by_kind: HashMap<TransactionKind, usize>,
    pub completed_volume: Decimal,
    pub pending: usize,
    pub failed: usize,
    pub total_gas: Decimal,
}

pub fn filter_transactions(transactions: &[Transaction], filter: &TransactionFilter) -> Vec<Transaction> {
    let needle = filter
        .query
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let asset = filter.asset.as_deref().map(str::trim).filter(|a| !a.is_empty());

    transactions
        .iter()
        .filter(|tx| filter.kind.map_or(true, |k| tx.kind == k))
        .filter(|tx| filter.status.map_or(true, |s| tx.status == s))
        .filter(|tx| asset.map_or(true, |a| tx.asset.eq_ignore_ascii_case(a)))
        .filter(|tx| filter.since.map_or(true, |since| tx.timestamp >= since))
        .filter(|tx| filter.until.map_or(true, |until| tx.timestamp <= until))
        .filter(|tx| {
            needle.as_deref().map_or(true, |n| {
                tx.asset.to_lowercase().contains(n)
                    || tx.chain.as_ref().map_or(false, |c| c.hash.to_lowercase().contains(n))
            })
        })
        .cloned()
        .collect()
}

pub fn sort_transactions(
    transactions: &[Transaction],
    key: TransactionSortKey,
    direction: SortDirection,
) -> Vec<Transaction> {
    let mut sorted = transactions.to_vec();
    sorted.sort_by(|a, b| {
        let ordering = match key {
            TransactionSortKey::Timestamp => a.timestamp.cmp(&b.timestamp),
            TransactionSortKey::Value => a.value_usd.cmp(&b.value_usd),
            TransactionSortKey::Amount => a.amount.cmp(&b.amount),
        };
        direction.apply(ordering)
    });
    sorted
}

pub fn summarize_transactions(transactions: &[Transaction]) -> TransactionSummary {
    let mut summary = TransactionSummary {
        count: transactions.len(),
        ..TransactionSummary::default()
    };

    for tx in transactions {
        *summary.by_kind.entry(tx.kind).or_insert(0) += 1;
        match tx.status {
            TransactionStatus::Completed => summary.completed_volume += tx.value_usd,
            TransactionStatus::Pending => summary.pending += 1,
            TransactionStatus::Failed => summary.failed += 1,
        }
        if let Some(chain) = &tx.chain {
            summary.total_gas += chain.gas_fee;
        }
    }

    summary
}
