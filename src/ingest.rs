//! Batch ingestion pipeline: read CSV → validate → embed → upsert.
//!
//! Each batch is fully processed before the next one starts, so peak
//! memory is bounded by the batch size rather than the input size.
//! Per-record rejects and per-item upsert failures never stop the run;
//! a model or schema failure aborts it, keeping the batches already
//! committed (upserts are overwrite-idempotent by id).

use crate::config::AppConfig;
use crate::embed::EmbeddingsProvider;
use crate::errors::Error;
use crate::io_csv::CsvSource;
use crate::store::{CollectionSchema, ProductPoint, VectorStore};
use crate::validate::{RejectReason, validate_record};

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Tuning knobs for one ingestion run.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    /// Records per batch (default 100).
    pub batch_size: usize,
    /// Data rows to skip at the start of the stream.
    pub skip: u64,
    /// Cap on total rows read; `None` = unbounded.
    pub max_rows: Option<u64>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            skip: 0,
            max_rows: None,
        }
    }
}

/// A rejected input row.
#[derive(Clone, Debug)]
pub struct RejectedRow {
    /// 1-based data row number within the (post-skip) stream.
    pub row: u64,
    pub reason: RejectReason,
}

/// Final tally of a run. The three headline counts may legitimately
/// differ: `rows_read >= valid_products >= points_upserted`.
#[derive(Clone, Debug, Default)]
pub struct IngestReport {
    pub rows_read: u64,
    pub valid_products: u64,
    pub points_upserted: u64,
    pub rejected: Vec<RejectedRow>,
    pub upsert_failures: Vec<(u64, String)>,
}

/// Runs the full pipeline against `collection`, creating it first if
/// absent (idempotent; a schema mismatch aborts with `SchemaConflict`).
pub async fn ingest_csv(
    cfg: &AppConfig,
    store: &dyn VectorStore,
    provider: &dyn EmbeddingsProvider,
    path: impl AsRef<Path>,
    collection: &str,
    opts: &IngestOptions,
) -> Result<IngestReport, Error> {
    if opts.batch_size == 0 {
        return Err(Error::InvalidArgument("batch_size must be > 0".into()));
    }

    info!(
        "Ingesting {:?} into '{collection}' (batch_size={}, skip={}, max_rows={:?})",
        path.as_ref(),
        opts.batch_size,
        opts.skip,
        opts.max_rows
    );

    store
        .create_collection(
            collection,
            CollectionSchema {
                dimension: provider.dim(),
                distance: cfg.distance,
            },
        )
        .await?;

    let mut source = CsvSource::open(path, opts.skip, opts.max_rows)?;
    let mut report = IngestReport::default();
    let mut seen_ids: HashSet<u64> = HashSet::new();

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}").unwrap(),
    );

    loop {
        let batch = source.next_batch(opts.batch_size);
        if batch.is_empty() {
            // A trailing window of malformed rows still counts as read.
            report.rows_read = source.rows_read();
            break;
        }
        report.rows_read = source.rows_read();

        // Validate. Rejects are tallied, never fatal. Each record carries
        // its own source row number so malformed rows skipped by the
        // reader do not shift the numbering.
        let mut products = Vec::with_capacity(batch.len());
        for (row, raw) in &batch {
            let row = *row;
            match validate_record(raw) {
                Ok(product) => {
                    if seen_ids.insert(product.id) {
                        products.push(product);
                    } else {
                        report.rejected.push(RejectedRow {
                            row,
                            reason: RejectReason::DuplicateId(product.id),
                        });
                    }
                }
                Err(reason) => {
                    debug!("row {row} rejected: {reason}");
                    report.rejected.push(RejectedRow { row, reason });
                }
            }
        }
        report.valid_products += products.len() as u64;

        // Nothing valid in this batch: no embedding/upsert call with zero items.
        if products.is_empty() {
            continue;
        }

        // Embed. A model failure is fatal for the run, not per record.
        let texts: Vec<String> = products
            .iter()
            .map(|p| p.embedding_text().to_string())
            .collect();
        let vectors = provider.embed_many(&texts).await?;
        if vectors.len() != products.len() {
            return Err(Error::Internal(anyhow::anyhow!(
                "embedder returned {} vectors for {} products",
                vectors.len(),
                products.len()
            )));
        }

        let points: Vec<ProductPoint> = products
            .into_iter()
            .zip(vectors)
            .map(|(product, vector)| ProductPoint { product, vector })
            .collect();

        // Upsert. Per-item failures are tracked, the run continues.
        let outcome = store.upsert(collection, points).await?;
        report.points_upserted += outcome.upserted.len() as u64;
        for (id, err) in outcome.failed {
            warn!("upsert failed for id {id}: {err}");
            report.upsert_failures.push((id, err));
        }

        pb.set_message(format!(
            "rows {} / valid {} / upserted {}",
            report.rows_read, report.valid_products, report.points_upserted
        ));
        pb.tick();
    }

    pb.finish_with_message(format!(
        "done: rows {} / valid {} / upserted {}",
        report.rows_read, report.valid_products, report.points_upserted
    ));
    info!(
        "Ingestion complete: rows_read={} valid_products={} points_upserted={} rejected={} upsert_failures={}",
        report.rows_read,
        report.valid_products,
        report.points_upserted,
        report.rejected.len(),
        report.upsert_failures.len()
    );
    Ok(report)
}
