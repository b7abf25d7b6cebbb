//! Removal of self-cancelling transactions.
//!
//! Charges that were reversed or refunded within one person's own records
//! (e.g. `+50.00` then `-50.00`) are noise for cross-side matching. This pass
//! finds them per person, and per date when configured, and takes them out.

use crate::combo::Combinations;
use crate::config::ZeroSumConfig;
use crate::decimal::Amount;
use crate::transaction::{partition_by, Transaction, TxId};
use log::{debug, info};
use std::collections::HashSet;

/// One transaction taken out as part of a zero-sum group.
#[derive(Debug, Clone, PartialEq)]
pub struct ZeroSumRemoval {
    pub id: TxId,
    pub person_key: String,
    pub amount: Amount,
}

/// Result of a zero-sum pass over one side.
#[derive(Debug, Clone, Default)]
pub struct ZeroSumOutcome {
    /// Input transactions that were not removed, in input order.
    pub kept: Vec<Transaction>,

    /// Removed ids.
    pub removed: HashSet<TxId>,

    /// Removed transactions in input order, for the audit trail.
    pub removals: Vec<ZeroSumRemoval>,
}

/// Removes subsets of each person's transactions that sum to zero.
///
/// Within a partition, exact `+x`/`-x` pairs go first. The remaining
/// transactions are then searched for zero-sum subsets of every size from 2
/// up to `max_group_size`; unlike the cross-side combination search, this
/// does not stop at the first size with a hit. Every zero-sum subset is
/// removed, so two subsets sharing a transaction are both taken out.
///
/// With `partition_by_date`, transactions without a date are never searched.
pub fn remove_zero_sum(transactions: &[Transaction], config: &ZeroSumConfig) -> ZeroSumOutcome {
    let mut removed: HashSet<TxId> = HashSet::new();

    if config.partition_by_date {
        for ((person_key, date), members) in
            partition_by(transactions, |t| (t.person_key.clone(), t.date))
        {
            if date.is_none() {
                debug!(
                    "{}: {} undated transaction(s) left for matching",
                    person_key,
                    members.len()
                );
                continue;
            }
            find_zero_sum_groups(&members, config, &mut removed);
        }
    } else {
        for (_, members) in partition_by(transactions, |t| t.person_key.clone()) {
            find_zero_sum_groups(&members, config, &mut removed);
        }
    }

    let mut outcome = ZeroSumOutcome::default();
    for tx in transactions {
        if removed.contains(&tx.id) {
            info!("Removing zero-sum transaction: {}: {}", tx.person_key, tx.amount);
            outcome.removals.push(ZeroSumRemoval {
                id: tx.id,
                person_key: tx.person_key.clone(),
                amount: tx.amount,
            });
        } else {
            outcome.kept.push(tx.clone());
        }
    }
    outcome.removed = removed;
    outcome
}

/// Marks zero-sum groups among one partition's transactions as removed.
fn find_zero_sum_groups(
    members: &[&Transaction],
    config: &ZeroSumConfig,
    removed: &mut HashSet<TxId>,
) {
    let places = config.decimal_places;
    let candidates: Vec<(&Transaction, Amount)> = members
        .iter()
        .map(|tx| (*tx, tx.amount.rounded(places)))
        .filter(|(_, amount)| !amount.is_noise(config.epsilon))
        .collect();

    if candidates.is_empty() {
        return;
    }

    // Opposite pairs.
    let mut by_amount: Vec<(Amount, Vec<TxId>)> = Vec::new();
    for (tx, amount) in &candidates {
        match by_amount.iter_mut().find(|(a, _)| a == amount) {
            Some((_, ids)) => ids.push(tx.id),
            None => by_amount.push((*amount, vec![tx.id])),
        }
    }
    for (amount, positives) in by_amount.iter().filter(|(a, _)| !a.is_negative()) {
        let Some((_, negatives)) = by_amount.iter().find(|(a, _)| *a == -*amount) else {
            continue;
        };
        let pairs = positives.len().min(negatives.len());
        debug!(
            "{}: {} opposite pair(s) of {}",
            members[0].person_key, pairs, amount
        );
        removed.extend(positives.iter().take(pairs).copied());
        removed.extend(negatives.iter().take(pairs).copied());
    }

    // Larger groups among what is left.
    let remaining: Vec<(TxId, Amount)> = candidates
        .iter()
        .filter(|(tx, _)| !removed.contains(&tx.id))
        .map(|(tx, amount)| (tx.id, *amount))
        .collect();

    for size in 2..=config.max_group_size.min(remaining.len()) {
        for combo in Combinations::new(remaining.len(), size) {
            let sum: Amount = combo.iter().map(|&i| remaining[i].1).sum();
            if sum.rounded(places).abs().value() <= config.epsilon {
                debug!(
                    "{}: zero-sum group of {} transaction(s)",
                    members[0].person_key, size
                );
                removed.extend(combo.iter().map(|&i| remaining[i].0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn tx(id: u32, person: &str, amount: &str) -> Transaction {
        Transaction::new(id, person, Amount::from_str(amount).unwrap())
    }

    fn ids(outcome: &ZeroSumOutcome) -> Vec<u32> {
        let mut ids: Vec<u32> = outcome.removed.iter().map(|id| id.0).collect();
        ids.sort_unstable();
        ids
    }

    fn undated() -> ZeroSumConfig {
        ZeroSumConfig {
            partition_by_date: false,
            ..ZeroSumConfig::default()
        }
    }

    #[test]
    fn test_opposite_pair_removed() {
        let txs = [tx(1, "LEE", "50.00"), tx(2, "LEE", "-50.00"), tx(3, "LEE", "30.00")];
        let outcome = remove_zero_sum(&txs, &undated());

        assert_eq!(ids(&outcome), vec![1, 2]);
        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.kept[0].id, TxId(3));
        assert_eq!(outcome.removals.len(), 2);
        assert_eq!(outcome.removals[0].person_key, "LEE");
    }

    #[test]
    fn test_pairs_limited_by_smaller_count() {
        let txs = [
            tx(1, "LEE", "20"),
            tx(2, "LEE", "20"),
            tx(3, "LEE", "20"),
            tx(4, "LEE", "-20"),
        ];
        let outcome = remove_zero_sum(&txs, &undated());

        assert_eq!(ids(&outcome), vec![1, 4]);
    }

    #[test]
    fn test_other_people_are_not_netted() {
        let txs = [tx(1, "LEE", "50"), tx(2, "KIM", "-50")];
        let outcome = remove_zero_sum(&txs, &undated());

        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.kept.len(), 2);
    }

    #[test]
    fn test_three_way_group_removed() {
        let txs = [
            tx(1, "LEE", "10.00"),
            tx(2, "LEE", "15.25"),
            tx(3, "LEE", "-25.25"),
            tx(4, "LEE", "99.00"),
        ];
        let outcome = remove_zero_sum(&txs, &undated());

        assert_eq!(ids(&outcome), vec![1, 2, 3]);
    }

    #[test]
    fn test_accumulates_across_sizes() {
        // 10.00 - 10.01 is a size-2 hit, 5 - 3 - 2 a size-3 hit.
        let txs = [
            tx(1, "LEE", "5"),
            tx(2, "LEE", "-3"),
            tx(3, "LEE", "-2"),
            tx(4, "LEE", "10.00"),
            tx(5, "LEE", "-10.01"),
        ];
        let outcome = remove_zero_sum(&txs, &undated());

        assert_eq!(ids(&outcome), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_overlapping_groups_both_removed() {
        // {1,2,3} and {1,4,5} both sum to zero and share 1.
        let txs = [
            tx(1, "LEE", "1"),
            tx(2, "LEE", "2"),
            tx(3, "LEE", "-3"),
            tx(4, "LEE", "-5"),
            tx(5, "LEE", "4"),
        ];
        let outcome = remove_zero_sum(&txs, &undated());

        assert_eq!(ids(&outcome), vec![1, 2, 3, 4, 5]);
        assert!(outcome.kept.is_empty());
    }

    #[test]
    fn test_group_size_cap() {
        let txs = [
            tx(1, "LEE", "1"),
            tx(2, "LEE", "2"),
            tx(3, "LEE", "3"),
            tx(4, "LEE", "4"),
            tx(5, "LEE", "-10"),
        ];
        let outcome = remove_zero_sum(&txs, &undated());
        assert!(outcome.removed.is_empty());

        let config = ZeroSumConfig {
            max_group_size: 5,
            ..undated()
        };
        let outcome = remove_zero_sum(&txs, &config);
        assert_eq!(ids(&outcome), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_noise_amounts_ignored() {
        let txs = [tx(1, "LEE", "0.004"), tx(2, "LEE", "-0.004")];
        let outcome = remove_zero_sum(&txs, &undated());

        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn test_rounding_tolerance() {
        let txs = [tx(1, "LEE", "10.004"), tx(2, "LEE", "-10.006")];
        let outcome = remove_zero_sum(&txs, &undated());

        // 10.00 + -10.01 rounds to -0.01, within tolerance.
        assert_eq!(ids(&outcome), vec![1, 2]);
    }

    #[test]
    fn test_date_partition_keeps_cross_day_reversals() {
        let monday = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        let txs = [
            tx(1, "LEE", "50").with_date(monday),
            tx(2, "LEE", "-50").with_date(tuesday),
            tx(3, "LEE", "20").with_date(tuesday),
            tx(4, "LEE", "-20").with_date(tuesday),
        ];

        let outcome = remove_zero_sum(&txs, &ZeroSumConfig::default());
        assert_eq!(ids(&outcome), vec![3, 4]);

        let outcome = remove_zero_sum(&txs, &undated());
        assert_eq!(ids(&outcome), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_undated_transactions_skipped_when_partitioned_by_date() {
        let monday = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let txs = [
            tx(1, "LEE", "50"),
            tx(2, "LEE", "-50"),
            tx(3, "LEE", "20").with_date(monday),
            tx(4, "LEE", "-20").with_date(monday),
        ];

        let outcome = remove_zero_sum(&txs, &ZeroSumConfig::default());
        assert_eq!(ids(&outcome), vec![3, 4]);
        let kept: Vec<_> = outcome.kept.iter().map(|t| t.id.0).collect();
        assert_eq!(kept, vec![1, 2]);

        let outcome = remove_zero_sum(&txs, &undated());
        assert_eq!(ids(&outcome), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_input() {
        let outcome = remove_zero_sum(&[], &ZeroSumConfig::default());
        assert!(outcome.kept.is_empty());
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn test_second_pass_removes_nothing() {
        let txs = [
            tx(1, "LEE", "12.50"),
            tx(2, "LEE", "-12.50"),
            tx(3, "LEE", "4"),
            tx(4, "LEE", "6"),
            tx(5, "LEE", "-10"),
            tx(6, "LEE", "8"),
            tx(7, "KIM", "3"),
        ];
        let first = remove_zero_sum(&txs, &undated());
        let second = remove_zero_sum(&first.kept, &undated());

        assert!(second.removed.is_empty());
        assert_eq!(second.kept, first.kept);
    }
}
