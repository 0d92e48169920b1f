use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::{ScienceEvent, Treasury};

/// Errors that can occur when reading the events csv
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: science must be a finite number, got {science}")]
    InvalidScience { line: usize, science: f64 },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    delay_ms: u64,
    science: f64,
    subject: String,
}

#[derive(Debug, Serialize)]
struct TreasuryRow {
    funds: String,
    reputation: String,
    credits: u64,
}

/// A science event to publish `delay` after the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub delay: Duration,
    pub event: ScienceEvent,
}

/// Read timed science events (`delay_ms,science,subject`) from a csv file
pub fn read_events(
    path: &Path,
) -> Result<impl Iterator<Item = Result<TimedEvent, CsvError>> + use<>, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            if !row.science.is_finite() {
                return Err(CsvError::InvalidScience {
                    line,
                    science: row.science,
                });
            }
            Ok(TimedEvent {
                delay: Duration::from_millis(row.delay_ms),
                event: ScienceEvent::new(row.science, row.subject),
            })
        }))
}

/// Write the treasury totals as a single csv row
pub fn write_treasury(writer: impl io::Write, treasury: &Treasury) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.serialize(TreasuryRow {
        funds: treasury.funds().to_string(),
        reputation: treasury.reputation().to_string(),
        credits: treasury.credits(),
    })?;
    writer.flush()?;
    Ok(())
}
