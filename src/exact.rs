//! One-to-one matching of identical amounts.

use crate::config::MatchConfig;
use crate::decimal::Amount;
use crate::transaction::{ConsumedSet, MatchedGroup, Side, Transaction};
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Pairs a person's open bank and expense-report transactions that carry
/// the same amount.
///
/// For each amount, in the order it first appears among the open bank
/// transactions, `min(bank count, certify count)` transactions are taken
/// from each side in input order and emitted as one group. Amounts are
/// compared at the matching precision; amounts below the zero-sum tolerance
/// are ignored. Each amount is visited once.
pub fn match_exact(
    side_a: &[&Transaction],
    side_b: &[&Transaction],
    person_key: &str,
    consumed: &mut ConsumedSet,
    config: &MatchConfig,
) -> Vec<MatchedGroup> {
    let places = config.matching.decimal_places;
    let noise = config.zero_sum.epsilon;
    let key = |tx: &Transaction| tx.amount.rounded(places);

    let open_a = open_transactions(side_a, Side::Bank, consumed, places, noise);
    let open_b = open_transactions(side_b, Side::Certify, consumed, places, noise);

    let mut amounts_a: Vec<Amount> = Vec::new();
    let mut counts_a: HashMap<Amount, usize> = HashMap::new();
    for tx in &open_a {
        let amount = key(tx);
        let count = counts_a.entry(amount).or_insert(0);
        if *count == 0 {
            amounts_a.push(amount);
        }
        *count += 1;
    }

    let mut counts_b: HashMap<Amount, usize> = HashMap::new();
    for tx in &open_b {
        *counts_b.entry(key(tx)).or_insert(0) += 1;
    }

    let mut groups = Vec::new();

    for amount in amounts_a {
        let Some(&count_b) = counts_b.get(&amount) else {
            continue;
        };
        let matches_possible = counts_a[&amount].min(count_b);
        if matches_possible == 0 {
            continue;
        }

        let take = |txs: &[&Transaction]| {
            txs.iter()
                .filter(|tx| key(tx) == amount)
                .take(matches_possible)
                .map(|tx| tx.id)
                .collect::<Vec<_>>()
        };
        let side_a_ids = take(&open_a);
        let side_b_ids = take(&open_b);

        for id in &side_a_ids {
            consumed.consume(Side::Bank, *id);
        }
        for id in &side_b_ids {
            consumed.consume(Side::Certify, *id);
        }

        debug!(
            "{}: {} exact match(es) at {}",
            person_key, matches_possible, amount
        );

        groups.push(MatchedGroup {
            person_key: person_key.to_string(),
            side_a_ids,
            side_b_ids,
            representative_amount: amount,
            group_total: Amount::ZERO,
        });
    }

    groups
}

fn open_transactions<'a>(
    txs: &[&'a Transaction],
    side: Side,
    consumed: &ConsumedSet,
    places: u32,
    noise: Decimal,
) -> Vec<&'a Transaction> {
    txs.iter()
        .copied()
        .filter(|tx| {
            !consumed.contains(side, tx.id) && !tx.amount.rounded(places).is_noise(noise)
        })
        .collect()
}
