use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::models::{WatchEntry, WatchRow};
use crate::utils::error::{AppError, Result};

const REQUIRED_COLUMNS: [&str; 3] = ["product_url", "target_price", "phone_number"];

/// A row that was read but could not become a [`WatchEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Watchlist {
    pub entries: Vec<WatchEntry>,
    pub rejected: Vec<RejectedRow>,
}

/// Reads a watch list CSV. Failing to open the file or a header without the
/// required columns is fatal; bad rows are collected in `rejected`.
pub fn load_watchlist(path: &Path) -> Result<Watchlist> {
    let file = File::open(path)?;
    let watchlist = read_watchlist(file)?;

    tracing::info!(
        "Loaded {} watch entries from {} ({} rejected)",
        watchlist.entries.len(),
        path.display(),
        watchlist.rejected.len()
    );
    for row in &watchlist.rejected {
        tracing::warn!("Skipping {} line {}: {}", path.display(), row.line, row.reason);
    }

    Ok(watchlist)
}

pub fn read_watchlist<R: Read>(reader: R) -> Result<Watchlist> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h.eq_ignore_ascii_case(column)))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "watch list is missing column(s): {}",
            missing.join(", ")
        )));
    }
    let headers = csv::StringRecord::from(
        headers.iter().map(|h| h.to_ascii_lowercase()).collect::<Vec<_>>(),
    );

    let mut watchlist = Watchlist::default();
    for record in rdr.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                watchlist.rejected.push(RejectedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let row: WatchRow = match record.deserialize(Some(&headers)) {
            Ok(row) => row,
            Err(e) => {
                watchlist.rejected.push(RejectedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match WatchEntry::try_from(row) {
            Ok(entry) => watchlist.entries.push(entry),
            Err(errors) => watchlist.rejected.push(RejectedRow {
                line,
                reason: AppError::from(errors).to_string(),
            }),
        }
    }

    Ok(watchlist)
}
