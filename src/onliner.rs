//! Crawler for the HTML marketplace: discover the search form on the landing
//! page, then walk listing pages by their "next" links.

use tracing::{debug, warn};
use url::Url;

use crate::config::CrawlConfig;
use crate::crawl::{screen, CrawlState, Skip, SourceResult, StopReason};
use crate::document::{DocumentView, ElementView, HtmlDocument};
use crate::fetcher::Fetcher;
use crate::types::{SearchRequest, Source};

const SEARCH_FORM: &str = "form.b-searchsubj";
const SEARCH_INPUT: &str = "input#fleaMarketSearchInput";
const LISTING_TABLE: &str = "table.ba-tbl-list__table";
const LISTING_MARKER: &str = "td.frst.ph.colspan";
const PROMOTED_CLASS: &str = "m-imp";
const NAME_CELL: &str = "td.txt";
const NAME: &str = "h2.wraptxt";
const PRICE_CELL: &str = "td.cost";
const PRICE: &str = "div.price-primary";
const PAGE_NAV: &str = "ul.pages-fastnav li";

pub async fn crawl(fetcher: &Fetcher, config: &CrawlConfig, request: &SearchRequest) -> SourceResult {
    let mut state = CrawlState::new(Source::Onliner);
    let base = &config.onliner_url;

    let landing = match fetcher.fetch(Source::Onliner, base).await {
        Ok(page) => page,
        Err(_) => return state.finish(StopReason::FetchFailed),
    };
    let Some(mut current) = discover_search_url(&landing.body, base, &request.term) else {
        warn!(url = %base, "search form not found on landing page");
        return state.finish(StopReason::EndpointMissing);
    };

    loop {
        if state.pages() >= config.max_pages {
            return state.finish(StopReason::PageCap);
        }
        if !state.visit(current.as_str()) {
            debug!(url = %current, "page already visited");
            return state.finish(StopReason::Cycle);
        }

        let page = match fetcher.fetch(Source::Onliner, &current).await {
            Ok(page) => page,
            Err(_) => return state.finish(StopReason::FetchFailed),
        };
        state.page_fetched();

        match scan_page(&page.body, base, &current, request, &mut state) {
            Some(next) => current = next,
            None => return state.finish(StopReason::Exhausted),
        }
    }
}

/// First results URL: the search form's action with the term in its input
/// field. `None` if the form, the input, or the input's name is missing.
pub fn discover_search_url(landing: &str, base: &Url, term: &str) -> Option<Url> {
    let doc = HtmlDocument::parse(landing);
    let form = doc.find(SEARCH_FORM)?;
    let field = form.find(SEARCH_INPUT)?.attr("name")?.to_string();
    if field.is_empty() {
        return None;
    }

    let mut url = base.join(form.attr("action").unwrap_or("")).ok()?;
    url.set_query(None);
    url.query_pairs_mut().append_pair(&field, term);
    Some(url)
}

/// Collects qualifying rows into `state` and returns the next page, if any.
fn scan_page(
    body: &str,
    base: &Url,
    current: &Url,
    request: &SearchRequest,
    state: &mut CrawlState,
) -> Option<Url> {
    let doc = HtmlDocument::parse(body);

    let tables = doc.find_all(LISTING_TABLE);
    if tables.is_empty() {
        debug!(url = %current, "no listing table on page");
    }
    for table in tables {
        for marker in table.find_all(LISTING_MARKER) {
            let Some(row) = marker.closest("tr") else {
                continue;
            };
            if row.has_class(PROMOTED_CLASS) {
                state.skip(Skip::Promoted);
                continue;
            }
            scan_row(&row, base, request, state);
        }
    }

    next_page(&doc, current)
}

fn scan_row<E: ElementView>(row: &E, base: &Url, request: &SearchRequest, state: &mut CrawlState) {
    let name_cell = row.find(NAME_CELL);
    let name = name_cell
        .as_ref()
        .and_then(|cell| cell.find(NAME))
        .map(|el| el.text())
        .unwrap_or_default();
    let price = row
        .find(PRICE_CELL)
        .and_then(|cell| cell.find(PRICE))
        .map(|el| el.text())
        .unwrap_or_default();

    if name.is_empty() || price.is_empty() || price == "0" {
        state.skip(Skip::Malformed);
        return;
    }
    if let Some(reason) = screen(request, &name, &price) {
        state.skip(reason);
        return;
    }

    let item_url = name_cell
        .as_ref()
        .and_then(|cell| cell.find("a"))
        .and_then(|a| a.attr("href").and_then(|href| base.join(href).ok()))
        .map(|url| url.to_string())
        .unwrap_or_default();
    state.push(name, price, item_url);
}

/// The navigation list is scanned from the end; the first entry with a link
/// is taken as "next".
fn next_page<D: DocumentView>(doc: &D, current: &Url) -> Option<Url> {
    doc.find_all(PAGE_NAV).iter().rev().find_map(|li| {
        let href = li.find("a")?.attr("href")?.to_string();
        if href.is_empty() {
            return None;
        }
        current.join(&href).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use std::sync::Arc;

    const FIRST_PAGE: &str = "http://onliner.test/search.php?q=laptop";

    fn fetcher(stub: Arc<StubTransport>) -> Fetcher {
        Fetcher::new(stub, &fast_fetch_config())
    }

    fn base() -> Url {
        Url::parse(ONLINER_BASE).unwrap()
    }

    #[test]
    fn test_discover_search_url() {
        let url = discover_search_url(&landing_page("/search.php"), &base(), "ноутбук lenovo").unwrap();
        assert_eq!(
            url.as_str(),
            "http://onliner.test/search.php?q=%D0%BD%D0%BE%D1%83%D1%82%D0%B1%D1%83%D0%BA+lenovo"
        );
    }

    #[test]
    fn test_discover_requires_form_input_and_name() {
        assert!(discover_search_url("<html><body></body></html>", &base(), "x").is_none());

        let no_input = r#"<form class="b-searchsubj" action="/search.php"></form>"#;
        assert!(discover_search_url(no_input, &base(), "x").is_none());

        let no_name = r#"<form class="b-searchsubj" action="/search.php">
                           <input id="fleaMarketSearchInput"></form>"#;
        assert!(discover_search_url(no_name, &base(), "x").is_none());
    }

    #[test]
    fn test_scan_page_skips_promoted_and_malformed_rows() {
        let body = onliner_page(
            &[
                onliner_row("Promoted laptop", "100,00 р.", "/t/0", true),
                onliner_row("Lenovo laptop", "850,00 р.", "/t/1", false),
                onliner_row("", "500,00 р.", "/t/2", false),
                onliner_row("Free laptop", "0", "/t/3", false),
                onliner_row("Laptop, negotiable", "Договорная", "/t/4", false),
            ],
            &[],
        );
        let current = Url::parse(FIRST_PAGE).unwrap();
        let mut state = CrawlState::new(Source::Onliner);
        let next = scan_page(&body, &base(), &current, &SearchRequest::new("laptop"), &mut state);
        let result = state.finish(StopReason::Exhausted);

        assert!(next.is_none());
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.listings[0].name, "Lenovo laptop");
        assert_eq!(result.listings[0].price, "850,00 р.");
        assert_eq!(result.listings[0].item_url, "http://onliner.test/t/1");
        assert_eq!(result.stats.skipped.promoted, 1);
        assert_eq!(result.stats.skipped.malformed, 2);
        assert_eq!(result.stats.skipped.out_of_range, 1);
    }

    #[test]
    fn test_next_page_prefers_last_linked_entry() {
        let body = onliner_page(&[], &["search.php?q=laptop&page=1", "search.php?q=laptop&page=2", ""]);
        let doc = HtmlDocument::parse(&body);
        let current = Url::parse(FIRST_PAGE).unwrap();
        assert_eq!(
            next_page(&doc, &current).unwrap().as_str(),
            "http://onliner.test/search.php?q=laptop&page=2"
        );
    }

    #[tokio::test]
    async fn test_crawl_follows_pages_until_exhausted() {
        let stub = Arc::new(
            StubTransport::new()
                .page(ONLINER_BASE, 200, landing_page("/search.php"))
                .page(
                    FIRST_PAGE,
                    200,
                    onliner_page(
                        &[onliner_row("Lenovo laptop", "850,00 р.", "/t/1", false)],
                        &["search.php?q=laptop&page=2"],
                    ),
                )
                .page(
                    "http://onliner.test/search.php?q=laptop&page=2",
                    200,
                    onliner_page(&[onliner_row("HP laptop", "900,00 р.", "/t/2", false)], &[]),
                ),
        );
        let result = crawl(&fetcher(stub.clone()), &stub_crawl_config(), &SearchRequest::new("laptop")).await;

        let names: Vec<&str> = result.listings.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Lenovo laptop", "HP laptop"]);
        assert_eq!(result.stats.pages, 2);
        assert_eq!(result.stats.stop, StopReason::Exhausted);
        assert_eq!(stub.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_crawl_stops_on_repeating_next_link() {
        let stub = Arc::new(
            StubTransport::new()
                .page(ONLINER_BASE, 200, landing_page("/search.php"))
                .page(
                    FIRST_PAGE,
                    200,
                    onliner_page(
                        &[onliner_row("Lenovo laptop", "850,00 р.", "/t/1", false)],
                        &["search.php?q=laptop"],
                    ),
                ),
        );
        let result = crawl(&fetcher(stub.clone()), &stub_crawl_config(), &SearchRequest::new("laptop")).await;

        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.stats.pages, 1);
        assert_eq!(result.stats.stop, StopReason::Cycle);
        assert_eq!(stub.requests(), vec![ONLINER_BASE.to_string(), FIRST_PAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_crawl_respects_page_cap() {
        let mut stub = StubTransport::new().page(ONLINER_BASE, 200, landing_page("/search.php"));
        stub = stub.page(
            FIRST_PAGE,
            200,
            onliner_page(&[], &["search.php?q=laptop&page=2"]),
        );
        for n in 2..=15 {
            let next = format!("search.php?q=laptop&page={}", n + 1);
            stub = stub.page(
                format!("http://onliner.test/search.php?q=laptop&page={}", n),
                200,
                onliner_page(&[], &[next.as_str()]),
            );
        }
        let stub = Arc::new(stub);
        let mut config = stub_crawl_config();
        config.max_pages = 3;

        let result = crawl(&fetcher(stub.clone()), &config, &SearchRequest::new("laptop")).await;
        assert_eq!(result.stats.pages, 3);
        assert_eq!(result.stats.stop, StopReason::PageCap);
        assert_eq!(stub.requests().len(), 4);
    }

    #[tokio::test]
    async fn test_crawl_without_search_form_returns_nothing() {
        let stub = Arc::new(StubTransport::new().page(ONLINER_BASE, 200, "<html><body>maintenance</body></html>"));
        let result = crawl(&fetcher(stub.clone()), &stub_crawl_config(), &SearchRequest::new("laptop")).await;

        assert!(result.listings.is_empty());
        assert_eq!(result.stats.stop, StopReason::EndpointMissing);
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_crawl_keeps_partial_results_when_a_page_fails() {
        let stub = Arc::new(
            StubTransport::new()
                .page(ONLINER_BASE, 200, landing_page("/search.php"))
                .page(
                    FIRST_PAGE,
                    200,
                    onliner_page(
                        &[onliner_row("Lenovo laptop", "850,00 р.", "/t/1", false)],
                        &["search.php?q=laptop&page=2"],
                    ),
                ),
        );
        let result = crawl(&fetcher(stub), &stub_crawl_config(), &SearchRequest::new("laptop")).await;

        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.stats.stop, StopReason::FetchFailed);
    }
}
