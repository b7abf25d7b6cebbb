//! # Expense Reconciler
//!
//! Matches bank postings against expense-report entries for the same set of
//! people, and reports what is left over on each side.
//!
//! ## Phases
//!
//! - **Zero-sum removal**: a person's own reversals and refunds are netted
//!   out before matching
//! - **Exact matching**: identical amounts pair one-to-one, in input order
//! - **Combinatorial matching**: a few split transactions on one side can
//!   match one transaction on the other
//!
//! Matching never crosses person boundaries. Every input transaction ends up
//! in exactly one of: a matched group, the zero-sum removals, or the
//! unmatched remainder.
//!
//! ## Example
//!
//! ```
//! use std::str::FromStr;
//! use expense_recon::{Amount, MatchConfig, Reconciler, Transaction};
//!
//! let amount = |s: &str| Amount::from_str(s).unwrap();
//! let bank = vec![
//!     Transaction::new(1, "JONES", amount("40.00")),
//!     Transaction::new(2, "JONES", amount("60.00")),
//! ];
//! let certify = vec![Transaction::new(1, "JONES", amount("100.00"))];
//!
//! let reconciler = Reconciler::new(MatchConfig::default()).unwrap();
//! let result = reconciler.reconcile(&bank, &certify).unwrap();
//! assert_eq!(result.matches[0].side_a_ids.len(), 2);
//! ```

pub mod combo;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod exact;
pub mod ingest;
pub mod report;
pub mod transaction;
pub mod zero_sum;

pub use config::{MatchConfig, MatchingConfig, ZeroSumConfig};
pub use decimal::Amount;
pub use engine::{ReconEvent, Reconciler, Reconciliation, RemovalStage};
pub use error::{ReconError, Result};
pub use ingest::SourceFile;
pub use transaction::{ConsumedSet, MatchedGroup, Side, Transaction, TxId};
pub use zero_sum::{remove_zero_sum, ZeroSumOutcome};
