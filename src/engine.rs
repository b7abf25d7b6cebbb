//! Reconciliation orchestrator.
//!
//! Runs the phases in a fixed order over one complete batch:
//!
//! 1. zero-sum removal on both sides
//! 2. exact-amount matching, per person
//! 3. combinations of bank postings against single expense entries
//! 4. combinations of expense entries against single bank postings
//! 5. acceptance of groups, then a final zero-sum pass over what is left
//!
//! Each phase only sees what earlier phases left open. Persons never match
//! across each other.

use crate::combo::match_combinatorial;
use crate::config::MatchConfig;
use crate::decimal::Amount;
use crate::error::{ReconError, Result};
use crate::exact::match_exact;
use crate::transaction::{partition_by, ConsumedSet, MatchedGroup, Side, Transaction, TxId};
use crate::zero_sum::{remove_zero_sum, ZeroSumOutcome};
use log::{debug, info};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// When a zero-sum removal happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalStage {
    /// Before any matching.
    Initial,
    /// On the unmatched remainder after matching.
    Residual,
}

/// Audit trail entry produced during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReconEvent {
    ZeroSumRemoved {
        side: Side,
        person_key: String,
        amount: Amount,
        id: TxId,
        stage: RemovalStage,
    },
    /// A match whose bank side nets to zero was discarded and its
    /// transactions returned to the unmatched pool.
    DegenerateGroupDropped { person_key: String, total: Amount },
}

/// Output of one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub matches: Vec<MatchedGroup>,

    /// Bank transactions left over, in input order.
    pub unmatched_bank: Vec<Transaction>,

    /// Expense-report transactions left over, in input order.
    pub unmatched_certify: Vec<Transaction>,

    /// Bank ids removed as zero-sum noise, in either stage.
    pub removed_bank: Vec<TxId>,

    /// Expense-report ids removed as zero-sum noise, in either stage.
    pub removed_certify: Vec<TxId>,

    pub events: Vec<ReconEvent>,
}

impl Reconciliation {
    /// Number of ids on `side` that ended up in an accepted match.
    pub fn matched_count(&self, side: Side) -> usize {
        self.matches
            .iter()
            .map(|g| match side {
                Side::Bank => g.side_a_ids.len(),
                Side::Certify => g.side_b_ids.len(),
            })
            .sum()
    }
}

/// Reconciles bank postings against expense-report entries.
///
/// # Example
///
/// ```
/// use std::str::FromStr;
/// use expense_recon::{Amount, MatchConfig, Reconciler, Transaction};
///
/// let bank = vec![Transaction::new(1, "SMITH", Amount::from_str("100.00").unwrap())];
/// let certify = vec![Transaction::new(1, "SMITH", Amount::from_str("100.00").unwrap())];
///
/// let reconciler = Reconciler::new(MatchConfig::default()).unwrap();
/// let result = reconciler.reconcile(&bank, &certify).unwrap();
/// assert_eq!(result.matches.len(), 1);
/// assert!(result.unmatched_bank.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: MatchConfig,
}

impl Reconciler {
    /// Creates a reconciler, rejecting out-of-range tolerances up front.
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Reconciler { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Runs all phases over one batch.
    ///
    /// Selection among equal candidates is stable with respect to input
    /// order. Fails only when an id repeats within one side.
    pub fn reconcile(
        &self,
        bank: &[Transaction],
        certify: &[Transaction],
    ) -> Result<Reconciliation> {
        ensure_unique_ids(bank, Side::Bank)?;
        ensure_unique_ids(certify, Side::Certify)?;

        let mut result = Reconciliation::default();

        info!("Checking for zero-sum transaction groups...");
        let bank_clean = remove_zero_sum(bank, &self.config.zero_sum);
        let certify_clean = remove_zero_sum(certify, &self.config.zero_sum);
        record_removals(&mut result, &bank_clean, Side::Bank, RemovalStage::Initial);
        record_removals(&mut result, &certify_clean, Side::Certify, RemovalStage::Initial);

        info!(
            "Starting reconciliation: {} bank and {} certify transactions",
            bank_clean.kept.len(),
            certify_clean.kept.len()
        );

        let mut consumed = ConsumedSet::default();
        let groups = self.match_all(&bank_clean.kept, &certify_clean.kept, &mut consumed);
        result.matches = accept_groups(
            groups,
            &bank_clean.kept,
            &mut consumed,
            &self.config,
            &mut result.events,
        );

        let open_bank = open_transactions(&bank_clean.kept, Side::Bank, &consumed);
        let open_certify = open_transactions(&certify_clean.kept, Side::Certify, &consumed);

        info!("Checking for zero-sum groups in unmatched entries...");
        let bank_rest = remove_zero_sum(&open_bank, &self.config.zero_sum);
        let certify_rest = remove_zero_sum(&open_certify, &self.config.zero_sum);
        if !bank_rest.removed.is_empty() {
            info!(
                "Removed {} bank transactions that formed zero-sum groups",
                bank_rest.removed.len()
            );
        }
        if !certify_rest.removed.is_empty() {
            info!(
                "Removed {} certify transactions that formed zero-sum groups",
                certify_rest.removed.len()
            );
        }
        record_removals(&mut result, &bank_rest, Side::Bank, RemovalStage::Residual);
        record_removals(&mut result, &certify_rest, Side::Certify, RemovalStage::Residual);

        result.unmatched_bank = bank_rest.kept;
        result.unmatched_certify = certify_rest.kept;

        info!("Found {} matching groups", result.matches.len());
        info!("Matched bank transactions: {}", result.matched_count(Side::Bank));
        info!(
            "Matched certify transactions: {}",
            result.matched_count(Side::Certify)
        );
        info!("Final unmatched bank transactions: {}", result.unmatched_bank.len());
        info!(
            "Final unmatched certify transactions: {}",
            result.unmatched_certify.len()
        );

        Ok(result)
    }

    /// Runs the exact and combinatorial phases for every person present on
    /// both sides.
    fn match_all(
        &self,
        bank: &[Transaction],
        certify: &[Transaction],
        consumed: &mut ConsumedSet,
    ) -> Vec<MatchedGroup> {
        let certify_by_person: HashMap<String, Vec<&Transaction>> =
            partition_by(certify, |t| t.person_key.clone())
                .into_iter()
                .collect();

        let mut groups = Vec::new();

        for (person_key, bank_group) in partition_by(bank, |t| t.person_key.clone()) {
            let Some(certify_group) = certify_by_person.get(&person_key) else {
                continue;
            };

            groups.extend(match_exact(
                &bank_group,
                certify_group,
                &person_key,
                consumed,
                &self.config,
            ));
            groups.extend(match_combinatorial(
                certify_group,
                Side::Certify,
                &bank_group,
                &person_key,
                consumed,
                &self.config.matching,
            ));
            groups.extend(match_combinatorial(
                &bank_group,
                Side::Bank,
                certify_group,
                &person_key,
                consumed,
                &self.config.matching,
            ));
        }

        groups
    }
}

fn ensure_unique_ids(transactions: &[Transaction], side: Side) -> Result<()> {
    let mut seen = HashSet::with_capacity(transactions.len());
    for tx in transactions {
        if !seen.insert(tx.id) {
            return Err(ReconError::DuplicateTxId {
                side: side.as_str(),
                id: tx.id.0,
            });
        }
    }
    Ok(())
}

fn record_removals(
    result: &mut Reconciliation,
    outcome: &ZeroSumOutcome,
    side: Side,
    stage: RemovalStage,
) {
    let removed = match side {
        Side::Bank => &mut result.removed_bank,
        Side::Certify => &mut result.removed_certify,
    };
    for removal in &outcome.removals {
        removed.push(removal.id);
        result.events.push(ReconEvent::ZeroSumRemoved {
            side,
            person_key: removal.person_key.clone(),
            amount: removal.amount,
            id: removal.id,
            stage,
        });
    }
}

/// Fills in group totals and drops groups whose bank side nets to zero,
/// releasing their ids.
fn accept_groups(
    groups: Vec<MatchedGroup>,
    bank: &[Transaction],
    consumed: &mut ConsumedSet,
    config: &MatchConfig,
    events: &mut Vec<ReconEvent>,
) -> Vec<MatchedGroup> {
    let amounts: HashMap<TxId, Amount> = bank.iter().map(|t| (t.id, t.amount)).collect();
    let places = config.zero_sum.decimal_places;

    let mut accepted = Vec::with_capacity(groups.len());
    for mut group in groups {
        let total: Amount = group
            .side_a_ids
            .iter()
            .filter_map(|id| amounts.get(id))
            .sum();
        let total = total.rounded(places);

        if total.abs().value() <= config.zero_sum.epsilon {
            info!(
                "Skipping zero-sum group for {} with bank total: {}",
                group.person_key, total
            );
            for id in &group.side_a_ids {
                consumed.release(Side::Bank, *id);
            }
            for id in &group.side_b_ids {
                consumed.release(Side::Certify, *id);
            }
            events.push(ReconEvent::DegenerateGroupDropped {
                person_key: group.person_key,
                total,
            });
            continue;
        }

        group.group_total = total.abs();
        debug!(
            "{}: accepted group of {} bank / {} certify, total {}",
            group.person_key,
            group.side_a_ids.len(),
            group.side_b_ids.len(),
            group.group_total
        );
        accepted.push(group);
    }

    accepted
}

fn open_transactions(
    transactions: &[Transaction],
    side: Side,
    consumed: &ConsumedSet,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| !consumed.contains(side, t.id))
        .cloned()
        .collect()
}
