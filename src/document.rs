//! Selector-based markup traversal.
//!
//! Crawlers only see [`DocumentView`] and [`ElementView`]; the `scraper`
//! implementation lives here. Invalid selectors match nothing.

use scraper::{ElementRef, Html, Selector};

pub trait ElementView: Sized {
    fn find_all(&self, selector: &str) -> Vec<Self>;

    fn find(&self, selector: &str) -> Option<Self> {
        self.find_all(selector).into_iter().next()
    }

    /// Concatenated descendant text, trimmed.
    fn text(&self) -> String;

    fn attr(&self, name: &str) -> Option<&str>;

    fn has_class(&self, class: &str) -> bool;

    /// Nearest ancestor with the given tag name.
    fn closest(&self, tag: &str) -> Option<Self>;
}

pub trait DocumentView {
    type Element<'a>: ElementView
    where
        Self: 'a;

    fn find_all(&self, selector: &str) -> Vec<Self::Element<'_>>;

    fn find(&self, selector: &str) -> Option<Self::Element<'_>> {
        self.find_all(selector).into_iter().next()
    }
}

/// A parsed HTML page.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }
}

impl DocumentView for HtmlDocument {
    type Element<'a> = ElementRef<'a>;

    fn find_all(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(selector) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl<'a> ElementView for ElementRef<'a> {
    fn find_all(&self, selector: &str) -> Vec<Self> {
        match Selector::parse(selector) {
            Ok(selector) => self.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn text(&self) -> String {
        ElementRef::text(self).collect::<String>().trim().to_string()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }

    fn has_class(&self, class: &str) -> bool {
        self.value().classes().any(|c| c == class)
    }

    fn closest(&self, tag: &str) -> Option<Self> {
        self.ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == tag)
    }
}
