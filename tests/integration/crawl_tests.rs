//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing pages and run the full
//! fetch / extract / persist cycle against an on-disk document store.

use comics_crawler::config::{
    Config, ContractConfig, CrawlerConfig, SpiderConfig, StoreConfig, UserAgentConfig,
};
use comics_crawler::crawler::{build_http_client, check_contracts, ContractViolation, Coordinator};
use comics_crawler::pipeline::{Persister, COLLECTION_NAME};
use comics_crawler::storage::{
    DocumentStore, PersistedDocument, SqliteDocumentStore, StoreError, StoreResult, UpsertOutcome,
};
use comics_crawler::{compute_identifier, CrawlError};
use serde_json::{Map, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling from the given start URLs
fn create_test_config(start_urls: Vec<String>, store_uri: &str) -> Config {
    Config {
        spider: SpiderConfig {
            name: "comic".to_string(),
            allowed_domains: vec!["127.0.0.1".to_string()],
            start_urls,
        },
        crawler: CrawlerConfig {
            download_delay: 0,
            request_timeout: 5,
            max_pages: None,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        store: StoreConfig {
            uri: store_uri.to_string(),
            database: "comics".to_string(),
        },
        contract: ContractConfig::default(),
    }
}

fn store_uri(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("comics.db").display())
}

fn open_store(uri: &str) -> SqliteDocumentStore {
    SqliteDocumentStore::connect(uri, "comics").expect("Failed to open store")
}

fn find(store: &SqliteDocumentStore, url: &str) -> PersistedDocument {
    store
        .find_by_id(COLLECTION_NAME, &compute_identifier(url))
        .expect("Store lookup failed")
        .unwrap_or_else(|| panic!("No document for {}", url))
}

/// Renders one product card the way the storefront theme does
fn product(href: &str, title: Option<&str>, price: &str) -> String {
    let title = title
        .map(|t| format!(r#"<h4 class="product-item__title">{}</h4>"#, t))
        .unwrap_or_default();
    format!(
        r#"<article class="product product-item text-center">
             <a href="{}"><img src="/cover.jpg"></a>
             {}
             <span class="product-item__price">{}</span>
           </article>"#,
        href, title, price
    )
}

fn listing(products: &[String], next: Option<&str>) -> String {
    let pagination = next
        .map(|href| format!(r#"<span class="next"><a href="{}">Next</a></span>"#, href))
        .unwrap_or_default();
    format!(
        "<html><head><title>Comics</title></head><body>{}<nav>{}</nav></body></html>",
        products.join("\n"),
        pagination
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_page_listing_is_persisted() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(
        &server,
        "/collections/comics",
        listing(
            &[
                product("/a", Some("Comic A"), "$5.00"),
                product("/b", None, "$7.50"),
            ],
            Some("/page2"),
        ),
    )
    .await;
    mount_page(
        &server,
        "/page2",
        listing(&[product("/c", Some("Comic C"), "$9.99")], None),
    )
    .await;

    let config = create_test_config(
        vec![format!("{}/collections/comics", server.uri())],
        &store_uri(&dir),
    );
    let stats = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.items_scraped, 3);
    assert_eq!(stats.items_inserted, 3);
    assert_eq!(stats.next_pages_followed, 1);
    assert_eq!(stats.fetch_failures, 0);

    let store = open_store(&store_uri(&dir));
    assert_eq!(store.count(COLLECTION_NAME).unwrap(), 3);

    let a = find(&store, "/a");
    assert_eq!(a.id, compute_identifier("/a"));
    assert_eq!(a.get_str("title"), Some("Comic A"));
    assert_eq!(a.get_str("price"), Some("$5.00"));

    let b = find(&store, "/b");
    assert!(b.is_null("title"));
    assert_eq!(b.get_str("price"), Some("$7.50"));
    assert_eq!(b.get_str("url"), Some("/b"));
}

#[tokio::test]
async fn test_recrawl_updates_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let uri = store_uri(&dir);

    for (round, price) in [(1, "$5.00"), (2, "$4.00")] {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/collections/comics",
            listing(
                &[
                    product("/a", Some("Comic A"), price),
                    product("/b", Some("Comic B"), "$7.50"),
                ],
                None,
            ),
        )
        .await;

        let config = create_test_config(vec![format!("{}/collections/comics", server.uri())], &uri);
        let stats = Coordinator::new(config).unwrap().run().await.unwrap();

        if round == 1 {
            assert_eq!((stats.items_inserted, stats.items_updated), (2, 0));
        } else {
            assert_eq!((stats.items_inserted, stats.items_updated), (0, 2));
        }
    }

    let store = open_store(&uri);
    assert_eq!(store.count(COLLECTION_NAME).unwrap(), 2);
    assert_eq!(find(&store, "/a").get_str("price"), Some("$4.00"));
}

#[tokio::test]
async fn test_fetch_failure_keeps_earlier_pages() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_page(
        &server,
        "/collections/comics",
        listing(&[product("/a", Some("Comic A"), "$5.00")], Some("/page2")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(
        vec![format!("{}/collections/comics", server.uri())],
        &store_uri(&dir),
    );
    let stats = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(stats.pages_requested, 2);
    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.fetch_failures, 1);

    let store = open_store(&store_uri(&dir));
    assert_eq!(store.count(COLLECTION_NAME).unwrap(), 1);
    find(&store, "/a");
}

#[tokio::test]
async fn test_failed_chain_does_not_stop_other_start_urls() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/collections/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/collections/comics",
        listing(&[product("/a", Some("Comic A"), "$5.00")], None),
    )
    .await;

    let config = create_test_config(
        vec![
            format!("{}/collections/missing", server.uri()),
            format!("{}/collections/comics", server.uri()),
        ],
        &store_uri(&dir),
    );
    let stats = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.items_inserted, 1);
}

#[tokio::test]
async fn test_pagination_cycle_fetches_each_page_once() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/collections/comics"))
        .respond_with(html(listing(
            &[product("/a", Some("Comic A"), "$5.00")],
            Some("/page2"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html(listing(
            &[product("/b", Some("Comic B"), "$6.00")],
            Some("/collections/comics"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(
        vec![format!("{}/collections/comics", server.uri())],
        &store_uri(&dir),
    );
    let stats = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.duplicates_filtered, 1);
    assert_eq!(stats.next_pages_followed, 1);
}

#[tokio::test]
async fn test_offsite_next_page_is_not_followed() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let port = server.address().port();

    // Same server reached through another host name is offsite
    mount_page(
        &server,
        "/collections/comics",
        listing(
            &[product("/a", Some("Comic A"), "$5.00")],
            Some(&format!("http://localhost:{}/page2", port)),
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html(listing(&[], None)))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(
        vec![format!("{}/collections/comics", server.uri())],
        &store_uri(&dir),
    );
    let stats = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.offsite_filtered, 1);
    assert_eq!(stats.next_pages_followed, 0);
}

#[tokio::test]
async fn test_max_pages_stops_the_run() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    for n in 1..=3 {
        mount_page(
            &server,
            &format!("/page{}", n),
            listing(
                &[product(&format!("/p{}", n), Some("Comic"), "$1.00")],
                Some(&format!("/page{}", n + 1)),
            ),
        )
        .await;
    }

    let mut config = create_test_config(vec![format!("{}/page1", server.uri())], &store_uri(&dir));
    config.crawler.max_pages = Some(2);
    let stats = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(stats.pages_requested, 2);
    assert_eq!(stats.items_inserted, 2);
}

#[tokio::test]
async fn test_redirected_page_resolves_against_final_url() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/comics"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/collections/comics/"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/collections/comics/",
        listing(&[product("/a", Some("Comic A"), "$5.00")], Some("page2")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/collections/comics/page2"))
        .respond_with(html(listing(&[product("/b", None, "$2.00")], None)))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(vec![format!("{}/comics", server.uri())], &store_uri(&dir));
    let stats = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.items_inserted, 2);
}

#[tokio::test]
async fn test_link_to_redirect_target_is_not_refetched() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/comics"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/collections/comics/"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/comics/"))
        .respond_with(html(listing(
            &[product("/a", Some("Comic A"), "$5.00")],
            Some("page2"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/comics/page2"))
        .respond_with(html(listing(
            &[product("/b", Some("Comic B"), "$2.00")],
            Some("/collections/comics/"),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(vec![format!("{}/comics", server.uri())], &store_uri(&dir));
    let stats = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.next_pages_followed, 1);
    assert_eq!(stats.duplicates_filtered, 1);
}

/// Store whose writes always fail
struct UnavailableStore;

impl DocumentStore for UnavailableStore {
    fn upsert(
        &mut self,
        _collection: &str,
        _id: &str,
        _fields: &Map<String, Value>,
    ) -> StoreResult<UpsertOutcome> {
        Err(StoreError::InvalidUri {
            uri: "sqlite://gone.db".to_string(),
            reason: "connection lost".to_string(),
        })
    }

    fn find_by_id(&self, _collection: &str, _id: &str) -> StoreResult<Option<PersistedDocument>> {
        Ok(None)
    }

    fn count(&self, _collection: &str) -> StoreResult<u64> {
        Ok(0)
    }

    fn close(self) -> StoreResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_store_failure_aborts_crawl() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/collections/comics",
        listing(&[product("/a", Some("Comic A"), "$5.00")], Some("/page2")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html(listing(&[], None)))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(
        vec![format!("{}/collections/comics", server.uri())],
        "sqlite::memory:",
    );
    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
    let coordinator =
        Coordinator::with_persister(config, client, Persister::with_store(UnavailableStore));

    let result = coordinator.run().await;
    assert!(matches!(result, Err(CrawlError::Store(_))));
}

#[tokio::test]
async fn test_unreachable_store_fails_before_crawling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(listing(&[], None)))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(
        vec![format!("{}/collections/comics", server.uri())],
        "sqlite:///nonexistent/dir/comics.db",
    );

    assert!(matches!(
        Coordinator::new(config),
        Err(CrawlError::Store(_))
    ));
}

#[tokio::test]
async fn test_contract_check_against_listing() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/collections/comics",
        listing(
            &[
                product("/a", Some("Comic A"), "$5.00"),
                product("/b", None, "$7.50"),
            ],
            Some("/page2"),
        ),
    )
    .await;

    let mut config = create_test_config(
        vec![format!("{}/collections/comics", server.uri())],
        "sqlite::memory:",
    );
    config.contract = ContractConfig {
        url: None,
        items: [2, 2],
        requests: [1, 1],
        scrapes: vec!["url".to_string(), "title".to_string(), "price".to_string()],
        require_values: false,
    };
    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();

    // The untitled product still carries a (null) title field
    let report = check_contracts(&client, &config).await.unwrap();
    assert!(report.passed(), "{:?}", report.violations);
    assert_eq!(report.items, 2);
    assert_eq!(report.requests, 1);

    config.contract.require_values = true;
    let report = check_contracts(&client, &config).await.unwrap();
    assert_eq!(
        report.violations,
        vec![ContractViolation::MissingField {
            item: 1,
            field: "title".to_string()
        }]
    );
}

#[tokio::test]
async fn test_contract_check_reports_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = create_test_config(
        vec![format!("{}/collections/comics", server.uri())],
        "sqlite::memory:",
    );
    let client = build_http_client(&config.user_agent, &config.crawler).unwrap();

    let result = check_contracts(&client, &config).await;
    assert!(matches!(result, Err(CrawlError::Fetch(_))));
}
