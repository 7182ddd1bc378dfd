// Site-specific HTML extraction
pub mod amazon;
pub mod phoneclick;
pub mod teknozone;

pub use amazon::AmazonParser;
pub use phoneclick::PhoneclickParser;
pub use teknozone::TeknozoneParser;

use crate::config::SelectorConfig;
use crate::model::ExtractError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::LazyLock;

/// An amount with its currency symbol on either side, e.g. `€ 480,00` or `480,00€`.
static PRICE_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[€$£¥]\s*\d+(?:[.,]\d+)*|\d+(?:[.,]\d+)*\s*[€$£¥]").expect("fragment regex")
});

static DECIMAL_NUMERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[.,]\d+").expect("decimal regex"));

/// Closed set of supported shop layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    Amazon,
    Phoneclick,
    Teknozone,
}

impl SiteKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "amazon" => Some(SiteKind::Amazon),
            "phoneclick" => Some(SiteKind::Phoneclick),
            "teknozone" => Some(SiteKind::Teknozone),
            _ => None,
        }
    }

    pub fn parser(self) -> &'static dyn SiteParser {
        match self {
            SiteKind::Amazon => &AmazonParser,
            SiteKind::Phoneclick => &PhoneclickParser,
            SiteKind::Teknozone => &TeknozoneParser,
        }
    }
}

pub trait SiteParser: Send + Sync {
    fn extract_title(&self, document: &Html, selectors: &SelectorConfig) -> Result<String, ExtractError> {
        first_text(document, &selectors.title)?.ok_or_else(|| ExtractError::TitleNotFound {
            selector: selectors.title.clone(),
        })
    }

    /// Returns the price text exactly as the page shows it; normalization happens later.
    fn extract_price(&self, document: &Html, selectors: &SelectorConfig) -> Result<String, ExtractError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub title: String,
    pub price_text: String,
}

pub fn extract(html: &str, kind: SiteKind, selectors: &SelectorConfig) -> Result<Extracted, ExtractError> {
    let document = Html::parse_document(html);
    let parser = kind.parser();
    let title = parser.extract_title(&document, selectors)?;
    let price_text = parser.extract_price(&document, selectors)?;
    Ok(Extracted { title, price_text })
}

/// Outcome of matching one selector against a page.
#[derive(Debug, Clone)]
pub struct SelectorProbe {
    pub selector: String,
    pub found: bool,
    pub text: String,
}

/// Diagnostic view of how the configured title and price selectors match a page.
pub fn probe(html: &str, selectors: &SelectorConfig) -> Result<(SelectorProbe, SelectorProbe), ExtractError> {
    let document = Html::parse_document(html);
    let check = |css: &str| -> Result<SelectorProbe, ExtractError> {
        let text = first_text(&document, css)?;
        Ok(SelectorProbe {
            selector: css.to_string(),
            found: text.is_some(),
            text: text.unwrap_or_default(),
        })
    };
    Ok((check(&selectors.title)?, check(&selectors.price)?))
}

pub(crate) fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::InvalidSelector(css.to_string()))
}

pub(crate) fn node_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub(crate) fn first_element<'a>(document: &'a Html, css: &str) -> Result<Option<ElementRef<'a>>, ExtractError> {
    let selector = selector(css)?;
    Ok(document.select(&selector).next())
}

/// Trimmed text of the first node matching `css`, if it has any.
pub(crate) fn first_text(document: &Html, css: &str) -> Result<Option<String>, ExtractError> {
    Ok(first_element(document, css)?
        .map(node_text)
        .filter(|text| !text.is_empty()))
}

/// The final amount shown in a text; earlier ones are struck-through reference prices.
pub fn last_price_fragment(text: &str) -> Option<&str> {
    PRICE_FRAGMENT.find_iter(text).last().map(|m| m.as_str())
}

/// Price text of a container: its last amount when one is marked, else the whole text.
pub(crate) fn container_price(text: String) -> String {
    match last_price_fragment(&text) {
        Some(fragment) => fragment.trim().to_string(),
        None => text,
    }
}

pub(crate) fn looks_like_price(text: &str) -> bool {
    text.contains(['€', '$', '£', '¥']) && DECIMAL_NUMERAL.is_match(text)
}
