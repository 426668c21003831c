//! Fetching and querying HTML pages.
//!
//! Scrapers only depend on [`PageSource`], so they can be fed canned pages in
//! tests. [`client::PageClient`] is the real thing.

pub mod client;
pub mod error;

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use url::Url;

pub use client::{FetchSettings, PageClient};
pub use error::{Error, PageResult};

/// Values of an HTML form, posted url-encoded
pub type FormValues = BTreeMap<String, String>;

/// Anything that can turn a URL (and optionally a form to post) into a page
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch_page(&self, url: &Url, form: Option<&FormValues>) -> PageResult<Page>;

    /// Raw resources such as images
    async fn fetch_bytes(&self, url: &Url) -> PageResult<Vec<u8>>;
}

/// A parsed HTML document
pub struct Page {
    html: Html,
}

impl Page {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    pub fn select(&self, css: &str) -> PageResult<Vec<ElementRef<'_>>> {
        select(self.root(), css)
    }

    pub fn first(&self, css: &str) -> PageResult<ElementRef<'_>> {
        first(self.root(), css)
    }
}

fn selector(css: &str) -> PageResult<Selector> {
    Selector::parse(css).map_err(|e| Error::Selector(format!("{}: {}", css, e)))
}

/// All descendants of `node` matching `css`, in document order
pub fn select<'a>(node: ElementRef<'a>, css: &str) -> PageResult<Vec<ElementRef<'a>>> {
    let selector = selector(css)?;
    let nodes = node.select(&selector).collect();
    Ok(nodes)
}

/// The first descendant of `node` matching `css`
pub fn first<'a>(node: ElementRef<'a>, css: &str) -> PageResult<ElementRef<'a>> {
    let selector = selector(css)?;
    let found = node.select(&selector).next();
    found.ok_or_else(|| Error::NotFound(css.to_string()))
}

pub fn text(node: ElementRef<'_>) -> String {
    node.text().collect()
}

pub fn attr<'a>(node: ElementRef<'a>, name: &str) -> PageResult<&'a str> {
    node.value()
        .attr(name)
        .ok_or_else(|| Error::MissingAttribute(name.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <ul class="list first"><li><a href="a">A</a></li><li><a href="b"> B </a></li></ul>
            <ul class="list"><li><a>C</a></li></ul>
        </body></html>
    "#;

    #[test]
    fn test_select_and_first() {
        let page = Page::parse(PAGE);

        let links = page.select("ul > li > a").unwrap();
        assert_eq!(links.len(), 3);
        assert_eq!(text(links[1]).trim(), "B");
        assert_eq!(attr(links[0], "href").unwrap(), "a");
        assert!(matches!(attr(links[2], "href"), Err(Error::MissingAttribute(_))));

        let first_list = page.first(r#"ul[class*="first"]"#).unwrap();
        assert_eq!(select(first_list, "a").unwrap().len(), 2);

        assert!(matches!(page.first("table"), Err(Error::NotFound(_))));
        assert!(matches!(page.select("ul[["), Err(Error::Selector(_))));
    }
}
