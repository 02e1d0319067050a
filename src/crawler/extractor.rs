//! Listing page extraction
//!
//! Turns one fetched listing page into the product records it shows and the
//! reference to the next page, if any. The selectors are fixed to the
//! storefront's theme:
//!
//! | What | Selector |
//! |------|----------|
//! | product | `article.product.product-item.text-center` |
//! | url | first `a[href]` in the product, `href` attribute |
//! | title | first text node directly inside `h4.product-item__title` |
//! | price | first text node directly inside `span.product-item__price` |
//! | next page | `span.next > a[href]`, `href` attribute |
//!
//! Field values are copied verbatim, whitespace included. A selector that
//! matches nothing leaves the field `None`; it never discards the record.

use crate::crawler::fetcher::FetchedPage;
use crate::item::RawItem;
use crate::{UrlError, UrlResult};
use scraper::html::Select;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

const PRODUCT_SELECTOR: &str = "article.product.product-item.text-center";
const LINK_SELECTOR: &str = "a[href]";
const TITLE_SELECTOR: &str = "h4.product-item__title";
const PRICE_SELECTOR: &str = "span.product-item__price";
const NEXT_PAGE_SELECTOR: &str = "span.next > a[href]";
const BASE_SELECTOR: &str = "base[href]";

struct Selectors {
    product: Selector,
    link: Selector,
    title: Selector,
    price: Selector,
    next_page: Selector,
    base: Selector,
}

impl Selectors {
    fn compile() -> Option<Self> {
        Some(Self {
            product: Selector::parse(PRODUCT_SELECTOR).ok()?,
            link: Selector::parse(LINK_SELECTOR).ok()?,
            title: Selector::parse(TITLE_SELECTOR).ok()?,
            price: Selector::parse(PRICE_SELECTOR).ok()?,
            next_page: Selector::parse(NEXT_PAGE_SELECTOR).ok()?,
            base: Selector::parse(BASE_SELECTOR).ok()?,
        })
    }
}

/// The compiled selectors, or `None` if any of them failed to parse
fn selectors() -> Option<&'static Selectors> {
    static SELECTORS: OnceLock<Option<Selectors>> = OnceLock::new();
    let compiled = SELECTORS.get_or_init(|| {
        let compiled = Selectors::compile();
        if compiled.is_none() {
            tracing::error!("Listing selectors failed to compile, pages will yield nothing");
        }
        compiled
    });
    compiled.as_ref()
}

/// A parsed listing page
///
/// Wraps the HTML document together with the URL it was served from and
/// the base URL relative links resolve against. The base URL is the page
/// URL unless the document declares `<base href>`.
pub struct Page {
    url: Url,
    base_url: Url,
    document: Html,
}

impl Page {
    /// Parses a page body served from `url`
    pub fn parse(url: Url, body: &str) -> Self {
        let document = Html::parse_document(body);

        let base_url = selectors()
            .and_then(|selectors| document.select(&selectors.base).next())
            .and_then(|base| base.value().attr("href"))
            .and_then(|href| url.join(href.trim()).ok())
            .unwrap_or_else(|| url.clone());

        Self {
            url,
            base_url,
            document,
        }
    }

    /// Parses a page from a fetch result, using its final URL
    pub fn from_fetched(fetched: &FetchedPage) -> Self {
        Self::parse(fetched.url.clone(), &fetched.body)
    }

    /// The URL the page was served from
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL relative references resolve against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Runs a selector over the whole document
    pub fn select<'a>(&'a self, selector: &'a Selector) -> Select<'a, 'a> {
        self.document.select(selector)
    }

    /// Resolves a possibly relative reference to an absolute URL
    pub fn resolve(&self, href: &str) -> UrlResult<Url> {
        self.base_url
            .join(href.trim())
            .map_err(|_| UrlError::Resolve {
                href: href.to_string(),
                base: self.base_url.to_string(),
            })
    }
}

/// Everything extracted from one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtraction {
    /// Product records in document order
    pub items: Vec<RawItem>,

    /// Absolute URL of the next listing page; `None` ends pagination
    pub next_page: Option<Url>,
}

/// Extracts all product records and the next-page reference from a page
///
/// # Example
///
/// ```
/// use comics_crawler::crawler::{extract, Page};
/// use url::Url;
///
/// let html = r#"
///     <article class="product product-item text-center">
///       <a href="/products/a">A</a>
///       <h4 class="product-item__title">Comic A</h4>
///       <span class="product-item__price">$5.00</span>
///     </article>
///     <span class="next"><a href="?page=2">Next</a></span>
/// "#;
/// let page = Page::parse(Url::parse("https://shop.example.com/comics").unwrap(), html);
/// let extraction = extract(&page);
///
/// assert_eq!(extraction.items.len(), 1);
/// assert_eq!(extraction.items[0].title.as_deref(), Some("Comic A"));
/// assert_eq!(
///     extraction.next_page.unwrap().as_str(),
///     "https://shop.example.com/comics?page=2"
/// );
/// ```
pub fn extract(page: &Page) -> PageExtraction {
    PageExtraction {
        items: extract_items(page).collect(),
        next_page: find_next_page(page),
    }
}

/// Lazily yields one record per product element
pub fn extract_items(page: &Page) -> impl Iterator<Item = RawItem> + '_ {
    selectors().into_iter().flat_map(move |selectors| {
        page.select(&selectors.product).map(move |product| RawItem {
            url: first_attr(&product, &selectors.link, "href"),
            title: first_text(&product, &selectors.title),
            price: first_text(&product, &selectors.price),
        })
    })
}

/// Finds and resolves the next-page link
///
/// Logs the resolved URL at info level when one is found.
pub fn find_next_page(page: &Page) -> Option<Url> {
    let href = page
        .select(&selectors()?.next_page)
        .next()
        .and_then(|link| link.value().attr("href"))?;

    match page.resolve(href) {
        Ok(next_page_url) => {
            tracing::info!("Scraping next page: {}", next_page_url);
            Some(next_page_url)
        }
        Err(e) => {
            tracing::warn!("Ignoring next-page link on {}: {}", page.url(), e);
            None
        }
    }
}

/// Returns an attribute of the first descendant matching the selector
fn first_attr(scope: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .find_map(|element| element.value().attr(attr))
        .map(str::to_owned)
}

/// Returns the first text node sitting directly inside any matching element
///
/// Text nested deeper (e.g. inside a link within the heading) does not count.
fn first_text(scope: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .flat_map(|element| element.children())
        .find_map(|node| node.value().as_text().map(|text| (**text).to_owned()))
}
