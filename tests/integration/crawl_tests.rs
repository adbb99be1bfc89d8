//! Integration tests for the crawler
//!
//! These tests serve a simulated tender portal from the in-memory gateway and
//! run the full crawl cycle end-to-end: search walk, detail extraction and
//! persistence.

use chrono::NaiveDate;
use licitacoes_crawler::config::{parse_config, Config, SelectorConfig, TableSelectors};
use licitacoes_crawler::crawler::{run_pool, CrawlOrchestrator, TenderStep};
use licitacoes_crawler::gateway::{MemoryGateway, MemoryNode, MemoryPage, MemoryTable};
use licitacoes_crawler::model::{not_found_sentinel, HeaderField};
use licitacoes_crawler::storage::{open_store, SqliteTenderStore, TenderStore};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const ENTRY: &str = "https://pncp.gov.br/app/editais?q=&status=recebendo_proposta&pagina=1";

/// Creates a test configuration with a short retry delay
fn create_test_config(workers: u32, db_path: &str) -> Config {
    parse_config(&format!(
        r#"
[crawler]
search-entry-url = "{}"
workers = {}

[retry]
attempts = 3
delay-ms = 1

[webdriver]
server-url = "http://localhost:9515"

[output]
database-path = "{}"

[search]
terms = ["Pulverizador", "Trator"]
"#,
        ENTRY, workers, db_path
    ))
    .expect("test config is valid")
}

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 17).unwrap()
}

fn detail_url(n: u32) -> String {
    format!("https://pncp.gov.br/app/editais/00000000000100/2025/{}", n)
}

fn external_id(n: u32) -> String {
    format!("00000000000100-1-{:06}/2025", n)
}

/// Search results, each listing a detail page and its publication date
fn search_page(listings: &[(u32, &str)]) -> MemoryPage {
    let search = SelectorConfig::default().search;
    let mut table = MemoryTable::new(search.result_row.clone(), search.page_size)
        .page_buttons(search.page_button.clone());
    for (n, date) in listings {
        table = table.row(
            MemoryNode::new()
                .attr("href", format!("/app/editais/00000000000100/2025/{}", n))
                .child(
                    &search.result_date,
                    MemoryNode::with_text(format!("Data de divulgação no PNCP: {}", date)),
                ),
        );
    }
    let mut page = MemoryPage::new();
    page.insert(&search.input, MemoryNode::new());
    page.add_table(table);
    page
}

fn tab() -> MemoryNode {
    MemoryNode::new()
        .attr("class", "tab")
        .on_click_set("class", "tab is-active")
}

fn value_cell(table: &TableSelectors, text: &str) -> MemoryNode {
    MemoryNode::new().child(&table.value, MemoryNode::with_text(text))
}

fn grid_row(table: &TableSelectors, cells: Vec<MemoryNode>) -> MemoryNode {
    cells
        .into_iter()
        .fold(MemoryNode::new(), |row, cell| row.child(&table.cell, cell))
}

/// Builder for a tender detail page
struct DetailPage {
    fields: Vec<HeaderField>,
    external_id: String,
    items: usize,
    documents: Vec<(&'static str, String)>,
}

impl DetailPage {
    fn new(n: u32) -> Self {
        Self {
            fields: HeaderField::ALL.to_vec(),
            external_id: external_id(n),
            items: 2,
            documents: Vec::new(),
        }
    }

    fn only_fields(mut self, fields: &[HeaderField]) -> Self {
        self.fields = fields.to_vec();
        self
    }

    fn items(mut self, count: usize) -> Self {
        self.items = count;
        self
    }

    fn document(mut self, category: &'static str, href: &str) -> Self {
        self.documents.push((category, href.to_string()));
        self
    }

    fn build(self) -> MemoryPage {
        let selectors = SelectorConfig::default();
        let mut page = MemoryPage::new();
        page.insert(&selectors.detail.container, MemoryNode::new());

        for field in &self.fields {
            let value = match field {
                HeaderField::ExternalId => self.external_id.clone(),
                other => format!("{} (teste)", other.label().trim_end_matches(':')),
            };
            page.insert(
                &selectors.detail.field.fill("label", field.label()),
                MemoryNode::with_text(value),
            );
        }
        page.insert(
            &selectors.detail.object,
            MemoryNode::with_text("Aquisição de implementos agrícolas"),
        );

        let items = &selectors.items;
        page.insert(&items.tab, tab());
        page.insert(&items.grid, MemoryNode::new());
        let mut table =
            MemoryTable::new(items.row.clone(), items.page_size).next_button(items.next_page.clone());
        for i in 1..=self.items {
            table = table.row(grid_row(
                items,
                vec![
                    value_cell(items, &i.to_string()),
                    value_cell(items, &format!("Item {}", i)),
                    value_cell(items, "1"),
                    value_cell(items, "R$ 100,00"),
                    value_cell(items, "R$ 100,00"),
                ],
            ));
        }
        page.add_table(table);

        let documents = &selectors.documents;
        let grid = &documents.table;
        page.insert(&grid.tab, tab());
        page.insert(&grid.grid, MemoryNode::new());
        let mut table =
            MemoryTable::new(grid.row.clone(), grid.page_size).next_button(grid.next_page.clone());
        for (category, href) in &self.documents {
            table = table.row(grid_row(
                grid,
                vec![
                    value_cell(grid, "1"),
                    value_cell(grid, "arquivo.pdf"),
                    MemoryNode::new().child(
                        &grid.value,
                        MemoryNode::with_text(*category).attr("title", *category),
                    ),
                    MemoryNode::new().child(&documents.link, MemoryNode::new().attr("href", href)),
                    value_cell(grid, "17/10/2025"),
                ],
            ));
        }
        page.add_table(table);
        page
    }
}

fn orchestrator(
    gateway: MemoryGateway,
    store: &Arc<SqliteTenderStore>,
) -> CrawlOrchestrator<MemoryGateway, SqliteTenderStore> {
    CrawlOrchestrator::from_config(
        &create_test_config(1, "unused.db"),
        gateway,
        Arc::clone(store),
    )
    .unwrap()
}

#[tokio::test]
async fn test_full_crawl_stores_tender_items_and_documents() {
    let gateway = MemoryGateway::new();
    gateway.add_page(ENTRY, search_page(&[(1, "17/10/2025")]));
    gateway.add_page(
        detail_url(1),
        DetailPage::new(1)
            .items(3)
            .document("Edital", "https://pncp.gov.br/pncp-api/v1/arquivos/1")
            .build(),
    );
    let store = Arc::new(SqliteTenderStore::open_in_memory().unwrap());

    let summary = orchestrator(gateway, &store)
        .run("Pulverizador", reference(), &CancellationToken::new())
        .await;

    assert!(summary.is_clean());
    assert_eq!(summary.succeeded, 1);

    let record = store.get_by_external_id(&external_id(1)).unwrap().unwrap();
    assert_eq!(record.tender.url, detail_url(1));
    assert_eq!(record.tender.header.issuing_body, "Órgão (teste)");
    assert_eq!(record.tender.object_text, "Aquisição de implementos agrícolas");

    let items = store.items_for(record.id).unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[2].number, "3");
    assert_eq!(items[2].description, "Item 3");

    let documents = store.documents_for(record.id).unwrap();
    assert_eq!(documents.len(), 1);
}

#[tokio::test]
async fn test_item_table_pages_through_every_row() {
    let gateway = MemoryGateway::new();
    gateway.add_page(ENTRY, search_page(&[(1, "17/10/2025")]));
    gateway.add_page(detail_url(1), DetailPage::new(1).items(12).build());
    let store = Arc::new(SqliteTenderStore::open_in_memory().unwrap());

    let orchestrator = orchestrator(gateway, &store);
    let summary = orchestrator
        .run("Trator", reference(), &CancellationToken::new())
        .await;

    assert_eq!(summary.succeeded, 1);
    let record = store.get_by_external_id(&external_id(1)).unwrap().unwrap();
    let items = store.items_for(record.id).unwrap();
    assert_eq!(items.len(), 12);
    assert_eq!(items[11].description, "Item 12");
    // Five rows per page: two advances, none on the search results
    assert_eq!(orchestrator.gateway().advance_clicks(), 2);
}

#[tokio::test]
async fn test_item_paging_failure_keeps_items_already_read() {
    let gateway = MemoryGateway::new();
    gateway.add_page(ENTRY, search_page(&[(1, "17/10/2025")]));
    gateway.add_page(detail_url(1), DetailPage::new(1).items(7).build());
    gateway.fail_advance_clicks(1);
    let store = Arc::new(SqliteTenderStore::open_in_memory().unwrap());

    let summary = orchestrator(gateway, &store)
        .run("Trator", reference(), &CancellationToken::new())
        .await;

    assert_eq!(summary.succeeded, 1);
    let record = store.get_by_external_id(&external_id(1)).unwrap().unwrap();
    let items = store.items_for(record.id).unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[4].description, "Item 5");
}

#[tokio::test]
async fn test_search_stops_at_first_listing_of_another_date() {
    let gateway = MemoryGateway::new();
    gateway.add_page(
        ENTRY,
        search_page(&[
            (1, "17/10/2025"),
            (2, "17/10/2025"),
            (3, "16/10/2025"),
            (4, "17/10/2025"),
        ]),
    );
    for n in 1..=4 {
        gateway.add_page(detail_url(n), DetailPage::new(n).build());
    }
    let store = Arc::new(SqliteTenderStore::open_in_memory().unwrap());

    let orchestrator = orchestrator(gateway, &store);
    let summary = orchestrator
        .run("Pulverizador", reference(), &CancellationToken::new())
        .await;

    assert_eq!(summary.candidates, 2);
    assert_eq!(store.stats().unwrap().tenders, 2);
    assert!(store.get_by_external_id(&external_id(4)).unwrap().is_none());

    let fourth = SelectorConfig::default().search.result_row.fill("row", 4);
    assert!(!orchestrator.gateway().waited_for(&fourth));
    assert!(!orchestrator.gateway().navigations().contains(&detail_url(4)));
}

#[tokio::test]
async fn test_missing_header_fields_are_stored_as_not_found() {
    let gateway = MemoryGateway::new();
    gateway.add_page(ENTRY, search_page(&[(1, "17/10/2025")]));
    gateway.add_page(
        detail_url(1),
        DetailPage::new(1)
            .only_fields(&[HeaderField::Location, HeaderField::ExternalId])
            .build(),
    );
    let store = Arc::new(SqliteTenderStore::open_in_memory().unwrap());

    let summary = orchestrator(gateway, &store)
        .run("Trator", reference(), &CancellationToken::new())
        .await;
    assert_eq!(summary.succeeded, 1);

    let header = store
        .get_by_external_id(&external_id(1))
        .unwrap()
        .unwrap()
        .tender
        .header;
    assert_eq!(header.location, "Local (teste)");
    assert_eq!(header.issuing_body, not_found_sentinel("Órgão:"));
    assert_eq!(header.issuing_body, "Órgão Não encontrado");
    assert_eq!(header.status, "Situação Não encontrado");
    assert_eq!(header.source, "Fonte Não encontrado");
}

#[tokio::test]
async fn test_only_notice_documents_are_kept() {
    let gateway = MemoryGateway::new();
    gateway.add_page(ENTRY, search_page(&[(1, "17/10/2025")]));
    gateway.add_page(
        detail_url(1),
        DetailPage::new(1)
            .document("Edital", "https://pncp.gov.br/pncp-api/v1/arquivos/1")
            .document("Termo de Referência", "https://pncp.gov.br/pncp-api/v1/arquivos/2")
            .document("Edital", "https://pncp.gov.br/pncp-api/v1/arquivos/3")
            .document("Anexo", "https://pncp.gov.br/pncp-api/v1/arquivos/4")
            .document("Ata", "https://pncp.gov.br/pncp-api/v1/arquivos/5")
            .build(),
    );
    let store = Arc::new(SqliteTenderStore::open_in_memory().unwrap());

    orchestrator(gateway, &store)
        .run("Trator", reference(), &CancellationToken::new())
        .await;

    let record = store.get_by_external_id(&external_id(1)).unwrap().unwrap();
    let urls: Vec<_> = store
        .documents_for(record.id)
        .unwrap()
        .into_iter()
        .map(|document| document.url)
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://pncp.gov.br/pncp-api/v1/arquivos/1",
            "https://pncp.gov.br/pncp-api/v1/arquivos/3",
        ]
    );
}

#[tokio::test]
async fn test_failing_tender_does_not_abort_the_batch() {
    let gateway = MemoryGateway::new();
    gateway.add_page(
        ENTRY,
        search_page(&[(1, "17/10/2025"), (2, "17/10/2025"), (3, "17/10/2025")]),
    );
    for n in 1..=3 {
        gateway.add_page(detail_url(n), DetailPage::new(n).build());
    }
    // More failures than retry attempts
    gateway.fail_navigation(detail_url(2), 10);
    let store = Arc::new(SqliteTenderStore::open_in_memory().unwrap());

    let summary = orchestrator(gateway, &store)
        .run("Pulverizador", reference(), &CancellationToken::new())
        .await;

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].url, detail_url(2));
    assert_eq!(summary.failures[0].step, TenderStep::Load);

    assert!(store.get_by_external_id(&external_id(1)).unwrap().is_some());
    assert!(store.get_by_external_id(&external_id(2)).unwrap().is_none());
    assert!(store.get_by_external_id(&external_id(3)).unwrap().is_some());
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let store = Arc::new(SqliteTenderStore::open_in_memory().unwrap());

    let mut ids = Vec::new();
    for _ in 0..2 {
        let gateway = MemoryGateway::new();
        gateway.add_page(ENTRY, search_page(&[(1, "17/10/2025")]));
        gateway.add_page(
            detail_url(1),
            DetailPage::new(1)
                .items(4)
                .document("Edital", "https://pncp.gov.br/pncp-api/v1/arquivos/1")
                .build(),
        );
        orchestrator(gateway, &store)
            .run("Trator", reference(), &CancellationToken::new())
            .await;
        ids.push(store.get_by_external_id(&external_id(1)).unwrap().unwrap().id);
    }

    assert_eq!(ids[0], ids[1]);
    let stats = store.stats().unwrap();
    assert_eq!(stats.tenders, 1);
    assert_eq!(stats.items, 4);
    assert_eq!(stats.documents, 1);
}

#[tokio::test]
async fn test_worker_pool_writes_to_one_database() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("database").join("licitacoes.db");
    let config = create_test_config(2, &db_path.to_string_lossy());
    let store = Arc::new(open_store(&db_path).unwrap());

    let terms = config.search.terms.clone();
    let summaries = run_pool(
        &config,
        &terms,
        reference(),
        Arc::clone(&store),
        |worker| async move {
            let gateway = MemoryGateway::new();
            let first = worker as u32 * 10 + 1;
            gateway.add_page(
                ENTRY,
                search_page(&[(first, "17/10/2025"), (first + 1, "17/10/2025")]),
            );
            for n in first..=first + 1 {
                gateway.add_page(detail_url(n), DetailPage::new(n).build());
            }
            Ok(gateway)
        },
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].search_term, "Pulverizador");
    assert_eq!(summaries[1].search_term, "Trator");
    assert!(summaries.iter().all(|summary| summary.succeeded == 2));

    drop(store);
    let reopened = open_store(&db_path).unwrap();
    assert_eq!(reopened.stats().unwrap().tenders, 4);
    assert_eq!(reopened.list_all().unwrap().len(), 4);
}
