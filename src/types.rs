use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One marketplace integrated by the crawler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// HTML listing pages, paginated by "next page" links.
    Onliner,
    /// JSON search API, paginated by cursor tokens.
    Kufar,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Onliner => "onliner",
            Self::Kufar => "kufar",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated search, built from the inbound query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub term: String,
    /// Lowercased words; a listing whose name contains any of them is dropped.
    pub excluded_words: BTreeSet<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

impl SearchRequest {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            excluded_words: BTreeSet::new(),
            min_price: None,
            max_price: None,
        }
    }

    pub fn excluding<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded_words
            .extend(words.into_iter().map(|w| w.as_ref().to_lowercase()));
        self
    }

    pub fn price_range(mut self, min_price: Option<i64>, max_price: Option<i64>) -> Self {
        self.min_price = min_price;
        self.max_price = max_price;
        self
    }
}

/// A normalized classified ad.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Listing {
    pub name: String,
    pub price: String,
    pub item_url: String,
    pub source: Source,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// Kufar search API types
#[derive(Debug, Deserialize)]
pub struct KufarResponse {
    #[serde(default)]
    pub ads: Vec<KufarAd>,
    #[serde(default)]
    pub pagination: Option<KufarPagination>,
}

#[derive(Debug, Deserialize)]
pub struct KufarAd {
    #[serde(default)]
    pub subject: Option<String>,
    /// Minor units; the API sends it as a string but numbers are accepted too.
    #[serde(default)]
    pub price_byn: Option<serde_json::Value>,
    #[serde(default)]
    pub ad_link: Option<String>,
}

impl KufarAd {
    pub fn price_minor_units(&self) -> Option<i64> {
        match self.price_byn.as_ref()? {
            serde_json::Value::String(s) => s.trim().parse().ok(),
            serde_json::Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct KufarPagination {
    #[serde(default)]
    pub pages: Vec<KufarPage>,
}

#[derive(Debug, Deserialize)]
pub struct KufarPage {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl KufarPagination {
    /// Token of the first "next" entry that carries one.
    pub fn next_token(&self) -> Option<&str> {
        self.pages
            .iter()
            .filter(|p| p.label.as_deref() == Some("next"))
            .find_map(|p| p.token.as_deref().filter(|t| !t.is_empty()))
    }
}
