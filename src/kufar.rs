//! Crawler for the JSON search API, paginated by cursor tokens.

use tracing::{debug, warn};
use url::Url;

use crate::config::CrawlConfig;
use crate::crawl::{screen, CrawlState, Skip, SourceResult, StopReason};
use crate::fetcher::Fetcher;
use crate::normalize::normalize_price;
use crate::types::{KufarResponse, SearchRequest, Source};

const LANG: &str = "ru";
const PAGE_SIZE: &str = "50";
/// Newest first.
const SORT: &str = "lst.d";

pub async fn crawl(fetcher: &Fetcher, config: &CrawlConfig, request: &SearchRequest) -> SourceResult {
    let mut state = CrawlState::new(Source::Kufar);
    let mut cursor: Option<String> = None;

    loop {
        if state.pages() >= config.max_pages {
            return state.finish(StopReason::PageCap);
        }

        let url = page_url(&config.kufar_api_url, &request.term, cursor.as_deref());
        let page = match fetcher.fetch(Source::Kufar, &url).await {
            Ok(page) => page,
            Err(_) => return state.finish(StopReason::FetchFailed),
        };
        state.page_fetched();

        let data: KufarResponse = match serde_json::from_str(&page.body) {
            Ok(data) => data,
            Err(e) => {
                warn!(url = %url, status = page.status, error = %e, "search API returned a non-JSON body");
                return state.finish(StopReason::FetchFailed);
            }
        };
        scan_ads(&data, request, &mut state);

        let Some(token) = data.pagination.as_ref().and_then(|p| p.next_token()) else {
            return state.finish(StopReason::Exhausted);
        };
        if !state.visit(token) {
            debug!(token, "cursor token already visited");
            return state.finish(StopReason::Cycle);
        }
        cursor = Some(token.to_string());
    }
}

/// Search API URL for one page; `cursor` is absent on the first page.
pub fn page_url(api: &Url, term: &str, cursor: Option<&str>) -> Url {
    let mut url = api.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("lang", LANG)
            .append_pair("size", PAGE_SIZE)
            .append_pair("sort", SORT)
            .append_pair("query", term);
        if let Some(cursor) = cursor {
            query.append_pair("cursor", cursor);
        }
    }
    url
}

fn scan_ads(data: &KufarResponse, request: &SearchRequest, state: &mut CrawlState) {
    for ad in &data.ads {
        let name = ad.subject.as_deref().unwrap_or("").trim();
        if name.is_empty() {
            state.skip(Skip::Malformed);
            continue;
        }
        let Some(raw_price) = ad.price_minor_units().filter(|p| *p != 0) else {
            state.skip(Skip::Malformed);
            continue;
        };

        let price = normalize_price(raw_price);
        if let Some(reason) = screen(request, name, &price) {
            state.skip(reason);
            continue;
        }

        state.push(name.to_string(), price, ad.ad_link.clone().unwrap_or_default());
    }
}
