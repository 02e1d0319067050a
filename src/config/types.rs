use serde::Deserialize;

/// Main configuration structure for the comics crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub spider: SpiderConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub contract: ContractConfig,
}

/// Which site to crawl and where to start
#[derive(Debug, Clone, Deserialize)]
pub struct SpiderConfig {
    /// Spider name, used in log output
    #[serde(default = "default_spider_name")]
    pub name: String,

    /// Domains the crawl may follow pagination into (e.g. "www.example.com")
    ///
    /// Subdomains of an entry are allowed too. An empty list allows any host.
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Listing pages to start pagination from
    #[serde(rename = "start-urls")]
    pub start_urls: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Delay between consecutive page fetches (milliseconds)
    #[serde(rename = "download-delay", default = "default_download_delay")]
    pub download_delay: u64,

    /// Total request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Stop the run after this many page fetches
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            download_delay: default_download_delay(),
            request_timeout: default_request_timeout(),
            max_pages: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Document store connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store location: `sqlite://<path>`, `sqlite::memory:` or a bare path
    pub uri: String,

    /// Database name that namespaces the collections inside the store
    pub database: String,
}

/// Self-check expectations for a single listing page
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// Page to check; defaults to the first start URL
    #[serde(default)]
    pub url: Option<String>,

    /// Inclusive bounds on the number of items the page yields
    #[serde(default = "default_item_bounds")]
    pub items: [u32; 2],

    /// Inclusive bounds on the number of follow-up requests the page yields
    #[serde(default = "default_request_bounds")]
    pub requests: [u32; 2],

    /// Fields every item must carry
    #[serde(default = "default_scraped_fields")]
    pub scrapes: Vec<String>,

    /// Also fail items whose required field is present but null
    #[serde(rename = "require-values", default)]
    pub require_values: bool,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            url: None,
            items: default_item_bounds(),
            requests: default_request_bounds(),
            scrapes: default_scraped_fields(),
            require_values: false,
        }
    }
}

fn default_spider_name() -> String {
    "comic".to_string()
}

fn default_download_delay() -> u64 {
    500
}

fn default_request_timeout() -> u64 {
    30
}

fn default_item_bounds() -> [u32; 2] {
    [20, 40]
}

fn default_request_bounds() -> [u32; 2] {
    [1, 50]
}

fn default_scraped_fields() -> Vec<String> {
    vec!["url".to_string(), "title".to_string(), "price".to_string()]
}
