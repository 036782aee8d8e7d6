//! End-to-end pipeline tests: CSV → validate → embed → upsert → search,
//! running against the in-memory backend and the deterministic stub
//! embedder so no Qdrant server or model download is needed.

use product_search::{
    AppConfig, IngestOptions, MemoryStore, ProductStore, SearchRequest, StubEmbedder,
};
use std::io::Write;
use std::sync::Arc;

const DIM: usize = 64;

fn store() -> ProductStore {
    ProductStore::with_backend(
        AppConfig::new_default("http://localhost:6334", "products"),
        Arc::new(MemoryStore::new()),
    )
}

fn write_csv(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

#[tokio::test]
async fn ingest_reports_all_three_counts() {
    // Scenario A: 3 rows, one with an empty name.
    let csv = write_csv(
        "id,name,main_category\n\
         1,Wireless Mouse,Electronics\n\
         2,,Electronics\n\
         3,Office Chair,Furniture\n",
    );
    let store = store();
    let provider = StubEmbedder::new(DIM);
    let report = store
        .ingest_csv(&provider, csv.path(), "products", &IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(report.rows_read, 3);
    assert_eq!(report.valid_products, 2);
    assert_eq!(report.points_upserted, 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].row, 2);
}

#[tokio::test]
async fn search_finds_the_ingested_product() {
    // Scenario B: exact-name query scores near 1.
    let csv = write_csv("id,name\n5,Wireless Mouse\n");
    let store = store();
    let provider = StubEmbedder::new(DIM);
    store
        .ingest_csv(&provider, csv.path(), "products", &IngestOptions::default())
        .await
        .unwrap();

    let mut req = SearchRequest::new("wireless mouse", "products");
    req.limit = 1;
    let page = store.search(&provider, &req).await.unwrap();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].product.id, 5);
    assert!(page.results[0].score > 0.9, "score {}", page.results[0].score);
}

#[tokio::test]
async fn category_filter_mismatch_yields_empty_page() {
    // Scenario C: only stored product is in Books, filter asks Electronics.
    let csv = write_csv("id,name,main_category\n1,Cookbook,Books\n");
    let store = store();
    let provider = StubEmbedder::new(DIM);
    store
        .ingest_csv(&provider, csv.path(), "products", &IngestOptions::default())
        .await
        .unwrap();

    let mut req = SearchRequest::new("cookbook", "products");
    req.main_category = Some("Electronics".into());
    let page = store.search(&provider, &req).await.unwrap();
    assert!(page.results.is_empty());
}

#[tokio::test]
async fn reingesting_the_same_csv_overwrites_instead_of_duplicating() {
    // Scenario D: second run leaves the point count unchanged.
    let csv = write_csv(
        "id,name\n\
         1,Wireless Mouse\n\
         2,Office Chair\n",
    );
    let store = store();
    let provider = StubEmbedder::new(DIM);
    store
        .ingest_csv(&provider, csv.path(), "products", &IngestOptions::default())
        .await
        .unwrap();
    let first = store.describe("products").await.unwrap().points;

    store
        .ingest_csv(&provider, csv.path(), "products", &IngestOptions::default())
        .await
        .unwrap();
    let second = store.describe("products").await.unwrap().points;

    assert_eq!(first, 2);
    assert_eq!(second, first);
}

#[tokio::test]
async fn pagination_pages_are_disjoint_and_union_in_order() {
    let csv = write_csv(
        "id,name\n\
         1,red mouse\n\
         2,blue mouse\n\
         3,mouse pad\n\
         4,wireless mouse mouse\n\
         5,office chair\n\
         6,desk lamp\n",
    );
    let store = store();
    let provider = StubEmbedder::new(DIM);
    store
        .ingest_csv(&provider, csv.path(), "products", &IngestOptions::default())
        .await
        .unwrap();

    let ids = |page: &product_search::SearchPage| -> Vec<u64> {
        page.results.iter().map(|h| h.product.id).collect()
    };

    let mut req = SearchRequest::new("mouse", "products");
    req.limit = 2;
    let first = store.search(&provider, &req).await.unwrap();
    req.offset = 2;
    let second = store.search(&provider, &req).await.unwrap();
    req.offset = 0;
    req.limit = 4;
    let both = store.search(&provider, &req).await.unwrap();

    let first_ids = ids(&first);
    let second_ids = ids(&second);
    assert_eq!(first_ids.len(), 2);
    assert_eq!(second_ids.len(), 2);
    assert!(first_ids.iter().all(|id| !second_ids.contains(id)));

    let mut union = first_ids;
    union.extend(second_ids);
    assert_eq!(union, ids(&both));
}

#[tokio::test]
async fn filters_are_conjunctive_and_exact() {
    let csv = write_csv(
        "id,name,main_category,sub_category\n\
         1,Gaming Mouse,Electronics,Accessories\n\
         2,Gaming Keyboard,Electronics,Keyboards\n\
         3,Mouse Trap,Home,Accessories\n",
    );
    let store = store();
    let provider = StubEmbedder::new(DIM);
    store
        .ingest_csv(&provider, csv.path(), "products", &IngestOptions::default())
        .await
        .unwrap();

    let mut req = SearchRequest::new("gaming mouse", "products");
    req.main_category = Some("Electronics".into());
    req.sub_category = Some("Accessories".into());
    let page = store.search(&provider, &req).await.unwrap();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].product.id, 1);
    for hit in &page.results {
        assert_eq!(hit.product.main_category.as_deref(), Some("Electronics"));
        assert_eq!(hit.product.sub_category.as_deref(), Some("Accessories"));
    }
}

#[tokio::test]
async fn reject_row_numbers_survive_malformed_rows() {
    // Row 2 is invalid UTF-8 and dropped by the reader; the reject on
    // the last row must still be reported as row 4.
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(b"id,name\n1,Mouse\n2,\xff\xfe\n3,Desk\n4,\n")
        .unwrap();

    let store = store();
    let provider = StubEmbedder::new(DIM);
    let report = store
        .ingest_csv(&provider, f.path(), "products", &IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(report.rows_read, 4);
    assert_eq!(report.valid_products, 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].row, 4);
}

#[tokio::test]
async fn duplicate_ids_within_a_run_are_rejected() {
    let csv = write_csv(
        "id,name\n\
         1,Wireless Mouse\n\
         1,Wireless Mouse (reposted)\n",
    );
    let store = store();
    let provider = StubEmbedder::new(DIM);
    let report = store
        .ingest_csv(&provider, csv.path(), "products", &IngestOptions::default())
        .await
        .unwrap();

    assert_eq!(report.rows_read, 2);
    assert_eq!(report.valid_products, 1);
    assert_eq!(report.points_upserted, 1);
    assert_eq!(report.rejected.len(), 1);
}

#[tokio::test]
async fn skip_and_max_rows_bound_the_run() {
    let csv = write_csv(
        "id,name\n\
         1,a\n\
         2,b\n\
         3,c\n\
         4,d\n",
    );
    let store = store();
    let provider = StubEmbedder::new(DIM);
    let opts = IngestOptions {
        batch_size: 100,
        skip: 1,
        max_rows: Some(2),
    };
    let report = store
        .ingest_csv(&provider, csv.path(), "products", &opts)
        .await
        .unwrap();

    assert_eq!(report.rows_read, 2);
    assert_eq!(report.points_upserted, 2);
    // Only ids 2 and 3 made it in.
    let mut req = SearchRequest::new("a b c d", "products");
    req.limit = 10;
    let page = store.search(&provider, &req).await.unwrap();
    let mut ids: Vec<u64> = page.results.iter().map(|h| h.product.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![2, 3]);
}

#[tokio::test]
async fn schema_conflict_aborts_the_run() {
    let csv = write_csv("id,name\n1,Mouse\n");
    let store = store();
    store.create_collection("products", DIM + 1).await.unwrap();

    let provider = StubEmbedder::new(DIM);
    let res = store
        .ingest_csv(&provider, csv.path(), "products", &IngestOptions::default())
        .await;
    assert!(matches!(res, Err(product_search::Error::SchemaConflict { .. })));
}

#[tokio::test]
async fn all_rejected_batch_skips_embedding_and_upsert() {
    let csv = write_csv("id,name\nx,\ny,\n");
    let store = store();
    let provider = StubEmbedder::new(DIM);
    let report = store
        .ingest_csv(&provider, csv.path(), "products", &IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(report.rows_read, 2);
    assert_eq!(report.valid_products, 0);
    assert_eq!(report.points_upserted, 0);
    assert_eq!(store.describe("products").await.unwrap().points, 0);
}
