//! Shared fixtures for unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::config::{CrawlConfig, FetchConfig};
use crate::error::FetchError;
use crate::transport::{FetchedPage, Transport};

pub const ONLINER_BASE: &str = "http://onliner.test/";
pub const KUFAR_API: &str = "http://kufar.test/search-api/v2/search/rendered-paginated";

/// Serves canned bodies keyed by full URL and records every request.
/// Unknown URLs fail like an unreachable host; `panicking` URLs panic.
#[derive(Default)]
pub struct StubTransport {
    pages: HashMap<String, FetchedPage>,
    panics: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.pages.insert(
            url.into(),
            FetchedPage {
                status,
                body: body.into(),
            },
        );
        self
    }

    pub fn panicking(mut self, url: impl Into<String>) -> Self {
        self.panics.insert(url.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.panics.contains(url.as_str()) {
            panic!("stub transport fault for {}", url);
        }
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Unavailable(url.to_string()))
    }
}

pub fn fast_fetch_config() -> FetchConfig {
    FetchConfig {
        concurrency: 2,
        acquire_timeout: Duration::from_millis(200),
        pacing_min: Duration::ZERO,
        pacing_max: Duration::ZERO,
    }
}

pub fn stub_crawl_config() -> CrawlConfig {
    CrawlConfig {
        onliner_url: Url::parse(ONLINER_BASE).unwrap(),
        kufar_api_url: Url::parse(KUFAR_API).unwrap(),
        max_pages: 10,
    }
}

pub fn landing_page(action: &str) -> String {
    format!(
        r#"<html><body>
            <form class="b-searchsubj" action="{}">
              <input id="fleaMarketSearchInput" name="q" type="text">
            </form>
        </body></html>"#,
        action
    )
}

/// One listing row as the HTML marketplace renders it.
pub fn onliner_row(name: &str, price: &str, href: &str, promoted: bool) -> String {
    format!(
        r#"<tr{}>
             <td class="frst ph colspan"><img src="/img.png"></td>
             <td class="txt"><h2 class="wraptxt"><a href="{}">{}</a></h2></td>
             <td class="cost"><div class="price-primary">{}</div></td>
           </tr>"#,
        if promoted { r#" class="m-imp""# } else { "" },
        href,
        name,
        price
    )
}

pub fn onliner_page(rows: &[String], nav: &[&str]) -> String {
    let nav: String = nav
        .iter()
        .map(|href| {
            if href.is_empty() {
                "<li><span>…</span></li>".to_string()
            } else {
                format!(r#"<li><a href="{}">{}</a></li>"#, href, href)
            }
        })
        .collect();
    format!(
        r#"<html><body>
             <table class="ba-tbl-list__table">{}</table>
             <ul class="pages-fastnav">{}</ul>
           </body></html>"#,
        rows.concat(),
        nav
    )
}

pub fn kufar_page(ads: &[(&str, &str, &str)], next_token: Option<&str>) -> String {
    let ads: Vec<serde_json::Value> = ads
        .iter()
        .map(|(subject, price, link)| {
            serde_json::json!({ "subject": subject, "price_byn": price, "ad_link": link })
        })
        .collect();
    let mut pages = vec![serde_json::json!({ "label": "self", "num": 1, "token": null })];
    if let Some(token) = next_token {
        pages.push(serde_json::json!({ "label": "next", "num": 2, "token": token }));
    }
    serde_json::json!({ "ads": ads, "pagination": { "pages": pages } }).to_string()
}
