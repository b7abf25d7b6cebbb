//! Matching tolerances and search bounds.
//!
//! Zero-sum removal and cross-side matching each carry their own tolerance
//! and rounding precision.

use crate::error::{ReconError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::Path;

const MAX_DECIMAL_PLACES: u32 = 10;

/// Full configuration for one reconciliation run.
///
/// Every key is optional in the TOML form:
///
/// ```toml
/// [zero_sum]
/// epsilon = "0.01"
/// decimal_places = 2
/// max_group_size = 4
/// partition_by_date = true
///
/// [matching]
/// epsilon = "0.001"
/// decimal_places = 3
/// max_combo_size = 5
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    pub zero_sum: ZeroSumConfig,
    pub matching: MatchingConfig,
}

/// Settings for removing a person's self-cancelling transactions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZeroSumConfig {
    /// A group whose rounded sum is within this of zero is removed.
    #[serde(with = "rust_decimal::serde::str")]
    pub epsilon: Decimal,
    pub decimal_places: u32,
    /// Largest subset size tried by the combination search.
    pub max_group_size: usize,
    /// Only look for cancelling groups among transactions on the same date.
    pub partition_by_date: bool,
}

impl Default for ZeroSumConfig {
    fn default() -> Self {
        ZeroSumConfig {
            epsilon: Decimal::new(1, 2),
            decimal_places: 2,
            max_group_size: 4,
            partition_by_date: true,
        }
    }
}

/// Settings for exact and combinatorial cross-side matching.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    #[serde(with = "rust_decimal::serde::str")]
    pub epsilon: Decimal,
    pub decimal_places: u32,
    /// Largest number of split transactions combined into one match.
    pub max_combo_size: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            epsilon: Decimal::new(1, 3),
            decimal_places: 3,
            max_combo_size: 5,
        }
    }
}

impl MatchConfig {
    /// Parses a config from TOML text and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: MatchConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks that tolerances are positive and search bounds are usable.
    pub fn validate(&self) -> Result<()> {
        check_epsilon("zero_sum.epsilon", self.zero_sum.epsilon)?;
        check_places("zero_sum.decimal_places", self.zero_sum.decimal_places)?;
        if self.zero_sum.max_group_size < 2 {
            return Err(ReconError::InvalidConfig {
                field: "zero_sum.max_group_size",
                reason: format!("must be at least 2, got {}", self.zero_sum.max_group_size),
            });
        }

        check_epsilon("matching.epsilon", self.matching.epsilon)?;
        check_places("matching.decimal_places", self.matching.decimal_places)?;
        if self.matching.max_combo_size < 1 {
            return Err(ReconError::InvalidConfig {
                field: "matching.max_combo_size",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn check_epsilon(field: &'static str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(ReconError::InvalidConfig {
            field,
            reason: format!("tolerance must be greater than zero, got {}", value),
        });
    }
    Ok(())
}

fn check_places(field: &'static str, value: u32) -> Result<()> {
    if value > MAX_DECIMAL_PLACES {
        return Err(ReconError::InvalidConfig {
            field,
            reason: format!("at most {} decimal places, got {}", MAX_DECIMAL_PLACES, value),
        });
    }
    Ok(())
}
