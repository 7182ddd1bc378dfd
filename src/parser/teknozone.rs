// Teknozone: <p class="product-cost"><strong>€486,00</strong></p>, or any priced <strong>
use super::{container_price, first_element, looks_like_price, node_text, selector, SiteParser};
use crate::config::SelectorConfig;
use crate::model::ExtractError;
use scraper::Html;

const DEFAULT_SCAN_TAG: &str = "strong";

pub struct TeknozoneParser;

impl SiteParser for TeknozoneParser {
    fn extract_price(&self, document: &Html, selectors: &SelectorConfig) -> Result<String, ExtractError> {
        if let Some(container) = first_element(document, &selectors.price)? {
            let strong = selector("strong")?;
            let text = container
                .select(&strong)
                .next()
                .map(node_text)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| node_text(container));
            if !text.is_empty() {
                return Ok(container_price(text));
            }
        }

        let scan_tag = selectors
            .price_fallbacks
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_SCAN_TAG);
        let scan = selector(scan_tag)?;
        document
            .select(&scan)
            .map(node_text)
            .find(|text| looks_like_price(text))
            .map(container_price)
            .ok_or_else(|| ExtractError::PriceNotFound {
                selector: format!("{} | {}", selectors.price, scan_tag),
            })
    }
}
