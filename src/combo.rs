//! Split-transaction matching.
//!
//! Finds a small subset of one side's open transactions whose total equals a
//! single transaction on the other side, e.g. three bank postings that were
//! filed as one expense line.

use crate::config::MatchingConfig;
use crate::decimal::Amount;
use crate::transaction::{ConsumedSet, MatchedGroup, Side, Transaction};
use log::debug;
use rust_decimal::Decimal;

/// Lexicographic k-combinations of the indices `0..n`.
///
/// Yields `[0, 1]`, `[0, 2]`, ..., `[n-2, n-1]` for `k = 2`. Yields nothing
/// when `k > n`.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Combinations {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }

        let k = self.indices.len();
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                return None;
            }
            i -= 1;
            if self.indices[i] != i + self.n - k {
                break;
            }
        }

        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.indices.clone())
    }
}

/// Returns every combination of `amounts` whose absolute total equals the
/// absolute `target` within `epsilon`, at the smallest size that has any.
///
/// Sizes are tried from 1 up to `max_size`; the search stops at the first
/// size with a hit. Indices refer to `amounts`. A target within `epsilon` of
/// zero never matches.
pub fn find_sum_combinations(
    amounts: &[Amount],
    target: Amount,
    epsilon: Decimal,
    max_size: usize,
) -> Vec<Vec<usize>> {
    if target.abs().value() <= epsilon {
        return Vec::new();
    }

    let target_abs = target.abs().value();
    let mut results = Vec::new();

    for size in 1..=max_size.min(amounts.len()) {
        for combo in Combinations::new(amounts.len(), size) {
            let sum: Amount = combo.iter().map(|&i| amounts[i]).sum();
            if (sum.abs().value() - target_abs).abs() < epsilon {
                results.push(combo);
            }
        }
        if !results.is_empty() {
            break;
        }
    }

    results
}

/// Matches combinations of `source` transactions against single `target`
/// transactions for one person.
///
/// Distinct open target amounts are visited in first-appearance order. Each
/// visit applies at most one combination, pairing it with the first open
/// target transaction of that amount, then searches again over what is left
/// until every target transaction of that amount has been tried.
pub fn match_combinatorial(
    target: &[&Transaction],
    target_side: Side,
    source: &[&Transaction],
    person_key: &str,
    consumed: &mut ConsumedSet,
    config: &MatchingConfig,
) -> Vec<MatchedGroup> {
    let source_side = match target_side {
        Side::Bank => Side::Certify,
        Side::Certify => Side::Bank,
    };
    let places = config.decimal_places;
    let key = |tx: &Transaction| tx.amount.rounded(places);

    let mut target_amounts: Vec<Amount> = Vec::new();
    for tx in target {
        let amount = key(tx);
        if consumed.contains(target_side, tx.id)
            || amount.is_noise(config.epsilon)
            || target_amounts.contains(&amount)
        {
            continue;
        }
        target_amounts.push(amount);
    }

    let mut groups = Vec::new();

    for amount in target_amounts {
        let mut remaining = target
            .iter()
            .filter(|tx| !consumed.contains(target_side, tx.id) && key(tx) == amount)
            .count();

        while remaining > 0 {
            let mut residual: Vec<&Transaction> = source
                .iter()
                .copied()
                .filter(|tx| {
                    !consumed.contains(source_side, tx.id) && !key(tx).is_noise(config.epsilon)
                })
                .collect();
            residual.sort_by_key(|tx| key(tx).abs());

            let amounts: Vec<Amount> = residual.iter().map(|tx| key(tx)).collect();
            let combos =
                find_sum_combinations(&amounts, amount, config.epsilon, config.max_combo_size);
            let Some(combo) = combos.into_iter().next() else {
                break;
            };

            let Some(single) = target
                .iter()
                .find(|tx| !consumed.contains(target_side, tx.id) && key(tx) == amount)
            else {
                break;
            };

            let combo_ids: Vec<_> = combo.iter().map(|&i| residual[i].id).collect();
            for id in &combo_ids {
                consumed.consume(source_side, *id);
            }
            consumed.consume(target_side, single.id);
            remaining -= 1;

            debug!(
                "{}: {} {} transaction(s) sum to {} {} transaction {}",
                person_key,
                combo_ids.len(),
                source_side,
                amount,
                target_side,
                single.id
            );

            let (side_a_ids, side_b_ids) = match target_side {
                Side::Certify => (combo_ids, vec![single.id]),
                Side::Bank => (vec![single.id], combo_ids),
            };
            groups.push(MatchedGroup {
                person_key: person_key.to_string(),
                side_a_ids,
                side_b_ids,
                representative_amount: amount,
                group_total: Amount::ZERO,
            });
        }
    }

    groups
}
