//! CSV trade import reader.
//!
//! Expected header: `symbol,side,entryPrice,exitPrice,quantity,date,strategyTag,notes`.
//! Column order is free and unknown columns are ignored; empty cells read
//! as absent values.

use crate::domain::error::JournalError;
use crate::domain::trade::CreateTrade;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One parsed row and the 1-based source line it came from.
pub type ImportRow = (u64, CreateTrade);

pub struct CsvTradeReader;

impl CsvTradeReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ImportRow>, JournalError> {
        let file = File::open(path.as_ref())?;
        Self::read(file)
    }

    pub fn read<R: Read>(source: R) -> Result<Vec<ImportRow>, JournalError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);

        let headers = rdr
            .headers()
            .map_err(|e| JournalError::Import {
                line: 1,
                reason: format!("unreadable header: {e}"),
            })?
            .clone();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| JournalError::Import {
                line: e.position().map_or(0, |p| p.line()),
                reason: e.to_string(),
            })?;
            let line = record.position().map_or(0, |p| p.line());
            let trade: CreateTrade =
                record
                    .deserialize(Some(&headers))
                    .map_err(|e| JournalError::Import {
                        line,
                        reason: e.to_string(),
                    })?;
            rows.push((line, trade));
        }

        tracing::debug!(rows = rows.len(), "parsed trade csv");
        Ok(rows)
    }
}
