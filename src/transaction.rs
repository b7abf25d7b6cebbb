//! Normalized transaction records and match groups.

use crate::decimal::Amount;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// Stable identifier of a transaction within one side of a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TxId(pub u32);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which input list a transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Side A: bank postings.
    Bank,
    /// Side B: expense-report entries.
    Certify,
}

impl Side {
    /// Lowercase name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bank => "bank",
            Side::Certify => "certify",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized transaction, immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// Unique within its side.
    pub id: TxId,

    /// Uppercased surname. Empty when the source name was blank.
    pub person_key: String,

    pub amount: Amount,

    pub date: Option<NaiveDate>,

    pub description: Option<String>,

    pub category: Option<String>,
}

impl Transaction {
    /// Creates a transaction with only the fields matching depends on.
    pub fn new(id: u32, person_key: impl Into<String>, amount: Amount) -> Self {
        Transaction {
            id: TxId(id),
            person_key: person_key.into(),
            amount,
            date: None,
            description: None,
            category: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A set of bank transactions matched against a set of expense-report
/// transactions for one person.
///
/// At least one side always holds exactly one id except for exact-amount
/// groups, where both sides hold the same number of ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedGroup {
    pub person_key: String,

    /// Bank ids, in the order they were selected.
    pub side_a_ids: Vec<TxId>,

    /// Expense-report ids, in the order they were selected.
    pub side_b_ids: Vec<TxId>,

    /// The amount the group was matched on.
    pub representative_amount: Amount,

    /// Absolute sum of the bank side, rounded to cents. Filled in by the
    /// orchestrator once the group is accepted.
    pub group_total: Amount,
}

impl MatchedGroup {
    /// Pairs ids across the sides positionally. The shorter side bounds the
    /// number of pairs; surplus ids stay in the group but get no row.
    pub fn pairs(&self) -> impl Iterator<Item = (TxId, TxId)> + '_ {
        self.side_a_ids
            .iter()
            .copied()
            .zip(self.side_b_ids.iter().copied())
    }
}

/// Ids that have been assigned to a match, per side.
///
/// Updated strictly in phase order; a later phase only ever sees what the
/// earlier ones left open.
#[derive(Debug, Clone, Default)]
pub struct ConsumedSet {
    bank: HashSet<TxId>,
    certify: HashSet<TxId>,
}

impl ConsumedSet {
    fn side(&self, side: Side) -> &HashSet<TxId> {
        match side {
            Side::Bank => &self.bank,
            Side::Certify => &self.certify,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut HashSet<TxId> {
        match side {
            Side::Bank => &mut self.bank,
            Side::Certify => &mut self.certify,
        }
    }

    pub fn contains(&self, side: Side, id: TxId) -> bool {
        self.side(side).contains(&id)
    }

    /// Marks `id` consumed. Returns `false` if it already was.
    pub fn consume(&mut self, side: Side, id: TxId) -> bool {
        self.side_mut(side).insert(id)
    }

    /// Returns `id` to the open pool.
    pub fn release(&mut self, side: Side, id: TxId) -> bool {
        self.side_mut(side).remove(&id)
    }

    pub fn len(&self, side: Side) -> usize {
        self.side(side).len()
    }

    pub fn is_empty(&self) -> bool {
        self.bank.is_empty() && self.certify.is_empty()
    }
}

/// Groups positions of `items` by `key`, keeping groups and their members in
/// first-appearance order.
pub(crate) fn partition_by<'a, K, F>(
    items: &'a [Transaction],
    key: F,
) -> Vec<(K, Vec<&'a Transaction>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&Transaction) -> K,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&Transaction>)> = Vec::new();

    for item in items {
        let k = key(item);
        match slots.get(&k) {
            Some(&slot) => groups[slot].1.push(item),
            None => {
                slots.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }

    groups
}
