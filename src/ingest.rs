//! CSV ingestion and normalization.
//!
//! Turns bank and expense-report exports into [`Transaction`]s. This is the
//! only place raw columns are looked at; the matching engine sees typed
//! records only.
//!
//! Each transaction's id is its spreadsheet row number (the header is row 1),
//! so audit output can be traced back to the source file. The raw rows are
//! kept alongside the transactions so reports can reproduce every original
//! column.

use crate::decimal::Amount;
use crate::error::{ReconError, Result};
use crate::transaction::{Transaction, TxId};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, warn};
use regex::Regex;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Account name used for the card program's own billing postings.
const BILLING_ACCOUNT: &str = "BILLING ACCOUNT";

// Two-digit years first: `%Y` would read "24" as year 24.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%d-%b-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];

/// Extracts the uppercased surname from a person's name.
///
/// `"Smith, John"` and `"John Smith"` both give `"SMITH"`. A blank name
/// gives an empty key.
pub fn last_name(name: &str) -> String {
    match name.split_once(',') {
        Some((last, _)) => last.trim().to_uppercase(),
        None => name
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_uppercase(),
    }
}

/// Parses the date formats seen in bank and expense exports.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Returns `true` for rebate descriptions: `RBT` alone, as the first word,
/// or as the last word.
pub fn is_rebate(description: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^RBT\s|^RBT$|\sRBT\s*$").expect("valid rebate pattern"))
        .is_match(description)
}

/// A CSV row shape that can be normalized into a [`Transaction`].
pub trait SourceRecord: DeserializeOwned {
    /// Human-readable side name for log messages.
    const SOURCE: &'static str;

    /// Columns that must be present in the header.
    const REQUIRED_COLUMNS: &'static [&'static str];

    /// Normalizes the row. `Ok(None)` means the row is valid but filtered
    /// out.
    fn normalize(self, row: usize) -> Result<Option<Transaction>>;
}

/// One row of the bank export.
#[derive(Debug, Deserialize)]
pub struct BankRecord {
    #[serde(rename = "ACC.ACCOUNT NAME")]
    pub account_name: Option<String>,

    #[serde(rename = "FIN.TRANSACTION AMOUNT")]
    pub amount: Option<String>,

    #[serde(rename = "FIN.POSTING DATE")]
    pub posting_date: Option<String>,

    #[serde(rename = "FIN.TRANSACTION DESCRIPTION")]
    pub description: Option<String>,
}

impl SourceRecord for BankRecord {
    const SOURCE: &'static str = "bank";
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &["ACC.ACCOUNT NAME", "FIN.TRANSACTION AMOUNT"];

    fn normalize(self, row: usize) -> Result<Option<Transaction>> {
        let name = self.account_name.unwrap_or_default();
        if name.trim() == BILLING_ACCOUNT {
            debug!("bank row {}: skipping billing account posting", row);
            return Ok(None);
        }

        let amount = parse_amount(self.amount.as_deref(), row)?;
        let description = self.description.filter(|d| !d.is_empty());
        if amount.is_negative() && description.as_deref().is_some_and(is_rebate) {
            debug!("bank row {}: skipping rebate {}", row, amount);
            return Ok(None);
        }

        Ok(build(row, &name, amount, self.posting_date, description, None))
    }
}

/// One row of the expense-report export.
#[derive(Debug, Deserialize)]
pub struct CertifyRecord {
    #[serde(rename = "Employee")]
    pub employee: Option<String>,

    #[serde(rename = "USD Amt")]
    pub amount: Option<String>,

    #[serde(rename = "Processed Date")]
    pub processed_date: Option<String>,

    #[serde(rename = "Vendor")]
    pub vendor: Option<String>,

    #[serde(rename = "Expense Category")]
    pub category: Option<String>,
}

impl SourceRecord for CertifyRecord {
    const SOURCE: &'static str = "certify";
    const REQUIRED_COLUMNS: &'static [&'static str] = &["Employee", "USD Amt"];

    fn normalize(self, row: usize) -> Result<Option<Transaction>> {
        let name = self.employee.unwrap_or_default();
        let amount = parse_amount(self.amount.as_deref(), row)?;
        let vendor = self.vendor.filter(|v| !v.is_empty());
        let category = self.category.filter(|c| !c.is_empty());

        Ok(build(row, &name, amount, self.processed_date, vendor, category))
    }
}

fn parse_amount(value: Option<&str>, row: usize) -> Result<Amount> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(ReconError::InvalidRecord {
            row,
            message: "missing amount".to_string(),
        });
    }
    Amount::from_str(value).map_err(|e| ReconError::InvalidRecord {
        row,
        message: format!("invalid amount '{}': {}", value, e),
    })
}

/// Drops amounts under a cent; otherwise builds the transaction.
fn build(
    row: usize,
    name: &str,
    amount: Amount,
    date: Option<String>,
    description: Option<String>,
    category: Option<String>,
) -> Option<Transaction> {
    if amount.is_noise(Decimal::new(1, 2)) {
        debug!("row {}: skipping zero amount", row);
        return None;
    }

    Some(Transaction {
        id: TxId(row as u32),
        person_key: last_name(name),
        amount,
        date: date.as_deref().and_then(parse_date),
        description,
        category,
    })
}

/// One loaded export: its header, the normalized transactions and the raw
/// row behind each of them.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub source_name: &'static str,
    pub headers: StringRecord,
    pub transactions: Vec<Transaction>,
    records: HashMap<TxId, StringRecord>,
}

impl SourceFile {
    /// The original row a transaction was normalized from.
    pub fn record(&self, id: TxId) -> Option<&StringRecord> {
        self.records.get(&id)
    }
}

/// Reads and normalizes all rows of one export.
///
/// Rows that cannot be parsed are logged at warn level and skipped. A header
/// missing a required column is an error.
pub fn read_transactions<S: SourceRecord, R: Read>(reader: R) -> Result<SourceFile> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for column in S::REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(ReconError::MissingColumn {
                source_name: S::SOURCE,
                column: column.to_string(),
            });
        }
    }

    let mut transactions = Vec::new();
    let mut records = HashMap::new();

    for (row_idx, result) in csv_reader.records().enumerate() {
        let row_num = row_idx + 2; // 1-indexed, accounting for header row

        let parsed = result.and_then(|raw| {
            let record: S = raw.deserialize(Some(&headers))?;
            Ok((raw, record))
        });
        match parsed {
            Ok((raw, record)) => match record.normalize(row_num) {
                Ok(Some(tx)) => {
                    records.insert(tx.id, raw);
                    transactions.push(tx);
                }
                Ok(None) => {}
                Err(e) => warn!("{}: {}", S::SOURCE, e),
            },
            Err(e) => {
                warn!("{} row {}: CSV parse error: {}", S::SOURCE, row_num, e);
            }
        }
    }

    debug!("{}: loaded {} transactions", S::SOURCE, transactions.len());
    Ok(SourceFile {
        source_name: S::SOURCE,
        headers,
        transactions,
        records,
    })
}

/// Loads a bank export from disk.
pub fn load_bank(path: impl AsRef<Path>) -> Result<SourceFile> {
    let file = File::open(path)?;
    read_transactions::<BankRecord, _>(BufReader::new(file))
}

/// Loads an expense-report export from disk.
pub fn load_certify(path: impl AsRef<Path>) -> Result<SourceFile> {
    let file = File::open(path)?;
    read_transactions::<CertifyRecord, _>(BufReader::new(file))
}
