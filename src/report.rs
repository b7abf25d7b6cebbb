//! Report files written after a reconciliation.

use crate::decimal::Amount;
use crate::engine::Reconciliation;
use crate::error::{ReconError, Result};
use crate::ingest::SourceFile;
use crate::transaction::{Transaction, TxId};
use chrono::NaiveDate;
use csv::WriterBuilder;
use log::info;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub const MATCHED_FILE: &str = "matched_transactions.csv";
pub const UNMATCHED_BANK_FILE: &str = "unmatched_bank.csv";
pub const UNMATCHED_CERTIFY_FILE: &str = "unmatched_certify.csv";

/// One matched bank/expense pair as shown in the matched report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRow {
    #[serde(rename = "Last Name")]
    pub last_name: String,

    /// The expense entry's own amount.
    #[serde(rename = "Amount", serialize_with = "cents")]
    pub amount: Amount,

    #[serde(rename = "Bank Date")]
    pub bank_date: Option<NaiveDate>,

    #[serde(rename = "Certify Date")]
    pub certify_date: Option<NaiveDate>,

    #[serde(rename = "Bank Description")]
    pub bank_description: Option<String>,

    #[serde(rename = "Certify Description")]
    pub certify_description: Option<String>,

    #[serde(rename = "Expense Category")]
    pub expense_category: Option<String>,

    #[serde(rename = "Group Total", serialize_with = "cents")]
    pub group_total: Amount,
}

fn cents<S: Serializer>(amount: &Amount, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&amount.fixed(2))
}

/// Expands matched groups into report rows, one per positional pair.
///
/// Rows are sorted by last name, then group total, then amount.
pub fn match_rows(
    result: &Reconciliation,
    bank: &[Transaction],
    certify: &[Transaction],
) -> Vec<MatchRow> {
    let bank_by_id: HashMap<TxId, &Transaction> = bank.iter().map(|t| (t.id, t)).collect();
    let certify_by_id: HashMap<TxId, &Transaction> = certify.iter().map(|t| (t.id, t)).collect();

    let mut rows: Vec<MatchRow> = result
        .matches
        .iter()
        .flat_map(|group| group.pairs().map(move |pair| (group, pair)))
        .filter_map(|(group, (bank_id, certify_id))| {
            let b = bank_by_id.get(&bank_id)?;
            let c = certify_by_id.get(&certify_id)?;
            Some(MatchRow {
                last_name: group.person_key.clone(),
                amount: c.amount,
                bank_date: b.date,
                certify_date: c.date,
                bank_description: b.description.clone(),
                certify_description: c.description.clone(),
                expense_category: c.category.clone(),
                group_total: group.group_total,
            })
        })
        .collect();

    rows.sort_by(|x, y| {
        x.last_name
            .cmp(&y.last_name)
            .then(x.group_total.cmp(&y.group_total))
            .then(x.amount.cmp(&y.amount))
    });
    rows
}

/// Writes matched rows as CSV.
pub fn write_matches<W: Write>(rows: &[MatchRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    if rows.is_empty() {
        csv_writer.write_record([
            "Last Name",
            "Amount",
            "Bank Date",
            "Certify Date",
            "Bank Description",
            "Certify Description",
            "Expense Category",
            "Group Total",
        ])?;
    }
    for row in rows {
        csv_writer.serialize(row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes unmatched transactions as CSV, in the order given, using the
/// source file's header and each transaction's original row.
pub fn write_unmatched<W: Write>(
    transactions: &[Transaction],
    source: &SourceFile,
    writer: W,
) -> Result<()> {
    // Source rows may be ragged.
    let mut csv_writer = WriterBuilder::new().flexible(true).from_writer(writer);

    csv_writer.write_record(&source.headers)?;
    for tx in transactions {
        let record = source.record(tx.id).ok_or(ReconError::MissingSourceRow {
            source_name: source.source_name,
            id: tx.id.0,
        })?;
        csv_writer.write_record(record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Summary counts printed after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub matched_rows: usize,
    pub unmatched_bank: usize,
    pub unmatched_certify: usize,
}

/// Writes the three report files into `output_dir`, creating it if needed.
pub fn save_results(
    result: &Reconciliation,
    bank: &SourceFile,
    certify: &SourceFile,
    output_dir: &Path,
) -> Result<Summary> {
    fs::create_dir_all(output_dir)?;

    let rows = match_rows(result, &bank.transactions, &certify.transactions);
    write_matches(&rows, File::create(output_dir.join(MATCHED_FILE))?)?;
    write_unmatched(
        &result.unmatched_bank,
        bank,
        File::create(output_dir.join(UNMATCHED_BANK_FILE))?,
    )?;
    write_unmatched(
        &result.unmatched_certify,
        certify,
        File::create(output_dir.join(UNMATCHED_CERTIFY_FILE))?,
    )?;

    info!("Reports written to {}", output_dir.display());

    Ok(Summary {
        matched_rows: rows.len(),
        unmatched_bank: result.unmatched_bank.len(),
        unmatched_certify: result.unmatched_certify.len(),
    })
}
