//! Thin CLI over the ingestion-and-search pipeline.

use anyhow::Context;
use clap::{Parser, Subcommand};
use product_search::{
    AppConfig, EmbeddingsProvider, FastembedProvider, IngestOptions, ProductStore, SearchRequest,
};
use std::io::Write;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "product-search", about = "Manage and search product data in Qdrant")]
struct Cli {
    /// Qdrant endpoint; falls back to QDRANT_URL, then localhost.
    #[arg(long, global = true, env = "QDRANT_URL")]
    qdrant_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a collection sized for the embedding model
    CreateCollection {
        /// Name of the collection to create
        collection: String,
        /// Embedding model identifier
        #[arg(long, env = "EMBEDDING_MODEL")]
        model: Option<String>,
    },
    /// Delete a collection and all its data
    DeleteCollection {
        /// Name of the collection to delete
        collection: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
    /// Show collection schema and point count
    Info {
        /// Name of the collection
        collection: String,
    },
    /// Load products from a CSV file into a collection
    Load {
        /// Path to the CSV file with product data
        data_path: String,
        /// Target collection; falls back to COLLECTION_NAME, then "products"
        collection: Option<String>,
        /// Records per batch; falls back to BATCH_SIZE, then 100
        #[arg(long)]
        batch_size: Option<usize>,
        /// Rows to skip at the start of the file
        #[arg(long, default_value_t = 0)]
        skip: u64,
        /// Cap on rows read
        #[arg(long)]
        max_rows: Option<u64>,
        /// Embedding model identifier
        #[arg(long, env = "EMBEDDING_MODEL")]
        model: Option<String>,
    },
    /// Search for products by semantic similarity
    Search {
        /// Search query text
        query: String,
        /// Collection to search; falls back to COLLECTION_NAME, then "products"
        collection: Option<String>,
        /// Filter by main category (exact match)
        #[arg(long)]
        main_category: Option<String>,
        /// Filter by sub category (exact match)
        #[arg(long)]
        sub_category: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Embedding model identifier
        #[arg(long, env = "EMBEDDING_MODEL")]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut cfg = AppConfig::from_env();
    if let Some(url) = cli.qdrant_url {
        cfg.qdrant_url = url;
    }

    match cli.command {
        Command::CreateCollection { collection, model } => {
            let provider = load_model(&cfg, model)?;
            let store = ProductStore::connect(cfg)?;
            store
                .create_collection(&collection, provider.dim())
                .await
                .context("creating collection")?;
            info!("Collection '{collection}' is ready");
        }
        Command::DeleteCollection { collection, force } => {
            if !force && !confirm(&format!("Delete collection '{collection}' and all its data?"))? {
                info!("Deletion cancelled");
                return Ok(());
            }
            let store = ProductStore::connect(cfg)?;
            if store.delete_collection(&collection).await? {
                info!("Collection '{collection}' deleted");
            } else {
                warn!("Collection '{collection}' did not exist");
            }
        }
        Command::Info { collection } => {
            let store = ProductStore::connect(cfg)?;
            let desc = store.describe(&collection).await?;
            println!(
                "collection: {}\nschema: {}\npoints: {}",
                desc.name, desc.schema, desc.points
            );
        }
        Command::Load {
            data_path,
            collection,
            batch_size,
            skip,
            max_rows,
            model,
        } => {
            let provider = load_model(&cfg, model)?;
            let collection = collection.unwrap_or_else(|| cfg.collection.clone());
            let opts = IngestOptions {
                batch_size: batch_size.unwrap_or(cfg.batch_size),
                skip,
                max_rows,
            };
            let store = ProductStore::connect(cfg)?;
            let report = match store
                .ingest_csv(&provider, &data_path, &collection, &opts)
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    error!("Ingestion aborted: {e}");
                    return Err(e.into());
                }
            };
            println!(
                "rows read:       {}\nvalid products:  {}\npoints upserted: {}",
                report.rows_read, report.valid_products, report.points_upserted
            );
            if !report.rejected.is_empty() {
                warn!("{} rows rejected", report.rejected.len());
            }
            if !report.upsert_failures.is_empty() {
                warn!("{} points failed to upsert", report.upsert_failures.len());
            }
        }
        Command::Search {
            query,
            collection,
            main_category,
            sub_category,
            limit,
            offset,
            model,
        } => {
            let provider = load_model(&cfg, model)?;
            let collection = collection.unwrap_or_else(|| cfg.collection.clone());
            let store = ProductStore::connect(cfg)?;
            let mut request = SearchRequest::new(query, collection);
            request.main_category = main_category;
            request.sub_category = sub_category;
            request.limit = limit;
            request.offset = offset;

            let page = store.search(&provider, &request).await?;
            if page.results.is_empty() {
                println!("No products found");
                return Ok(());
            }
            println!(
                "{:>10}  {:>6}  {:<50}  {:<30}  {:>10}",
                "id", "score", "name", "category", "price"
            );
            for hit in &page.results {
                let p = &hit.product;
                let category = match (&p.main_category, &p.sub_category) {
                    (Some(m), Some(s)) => format!("{m} > {s}"),
                    (Some(m), None) => m.clone(),
                    (None, Some(s)) => s.clone(),
                    (None, None) => String::new(),
                };
                let price = p
                    .discount_price
                    .or(p.actual_price)
                    .map(|v| format!("{v:.2}"))
                    .unwrap_or_else(|| "N/A".into());
                println!(
                    "{:>10}  {:>6.3}  {:<50}  {:<30}  {:>10}",
                    p.id,
                    hit.score,
                    truncate(&p.name, 50),
                    truncate(&category, 30),
                    price
                );
            }
            println!(
                "showing {} results (limit={}, offset={})",
                page.total, page.limit, page.offset
            );
        }
    }

    Ok(())
}

fn load_model(cfg: &AppConfig, flag: Option<String>) -> anyhow::Result<FastembedProvider> {
    let model_id = flag.unwrap_or_else(|| cfg.embedding_model.clone());
    Ok(FastembedProvider::load(&model_id)?)
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
