//! CSV source: streams raw tabular rows as untyped records.
//!
//! The reader is tolerant: malformed rows are logged (`warn!`) and skipped,
//! never fatal. Ragged rows are accepted; cells beyond the header are
//! ignored and missing trailing cells are treated as absent.

use crate::errors::Error;
use crate::product::RawRecord;
use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// A bounded stream of raw records read from a CSV file.
pub struct CsvSource {
    headers: Vec<String>,
    iter: StringRecordsIntoIter<File>,
    rows_read: u64,
    /// Remaining row budget when `max_rows` was set.
    remaining: Option<u64>,
}

impl CsvSource {
    /// Opens `path`, reads the header row, skips the first `skip` data rows
    /// and caps the total rows read at `max_rows` if set.
    pub fn open(
        path: impl AsRef<Path>,
        skip: u64,
        max_rows: Option<u64>,
    ) -> Result<Self, Error> {
        info!("Opening CSV source {:?} (skip={skip})", path.as_ref());

        let file = File::open(path.as_ref())?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if !headers.iter().any(|h| h == "id") {
            return Err(Error::Config(format!(
                "CSV {:?} has no 'id' column",
                path.as_ref()
            )));
        }
        debug!("CSV columns: {:?}", headers);

        let mut iter = reader.into_records();
        for _ in 0..skip {
            if iter.next().is_none() {
                break;
            }
        }

        Ok(Self {
            headers,
            iter,
            rows_read: 0,
            remaining: max_rows,
        })
    }

    /// Total data rows consumed so far (malformed rows included).
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Reads up to `batch_size` raw records, each paired with its 1-based
    /// row number within the (post-skip) stream. An empty batch means the
    /// stream is exhausted.
    ///
    /// Malformed rows advance the row counter but yield nothing, so the
    /// numbers attached to surviving records stay accurate.
    pub fn next_batch(&mut self, batch_size: usize) -> Vec<(u64, RawRecord)> {
        let mut out = Vec::with_capacity(batch_size);
        while out.len() < batch_size {
            if self.remaining == Some(0) {
                break;
            }
            let Some(rec) = self.iter.next() else { break };
            self.rows_read += 1;
            if let Some(left) = self.remaining.as_mut() {
                *left -= 1;
            }
            match rec {
                Ok(record) => {
                    let mut raw = RawRecord::new();
                    for (i, header) in self.headers.iter().enumerate() {
                        if let Some(cellv) = record.get(i) {
                            raw.insert(header.clone(), cellv.to_string());
                        }
                    }
                    out.push((self.rows_read, raw));
                }
                Err(e) => {
                    warn!("Skipping malformed CSV row {}: {e}", self.rows_read);
                }
            }
        }
        out
    }
}
