// Amazon product pages: offscreen price, or split whole/fraction nodes
use super::{container_price, first_text, SiteParser};
use crate::config::SelectorConfig;
use crate::model::ExtractError;
use scraper::Html;

const DEFAULT_WHOLE: &str = "span.a-price-whole";
const DEFAULT_FRACTION: &str = "span.a-price-fraction";

pub struct AmazonParser;

impl SiteParser for AmazonParser {
    /// Fallbacks are `[whole, fraction]`; a missing fraction node reads as `00`.
    fn extract_price(&self, document: &Html, selectors: &SelectorConfig) -> Result<String, ExtractError> {
        if let Some(text) = first_text(document, &selectors.price)? {
            return Ok(container_price(text));
        }

        let whole_css = selectors
            .price_fallbacks
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_WHOLE);
        let fraction_css = selectors
            .price_fallbacks
            .get(1)
            .map(String::as_str)
            .unwrap_or(DEFAULT_FRACTION);

        let whole = first_text(document, whole_css)?.ok_or_else(|| ExtractError::PriceNotFound {
            selector: format!("{} | {}", selectors.price, whole_css),
        })?;
        let fraction = first_text(document, fraction_css)?.unwrap_or_else(|| "00".to_string());

        Ok(format!("{},{}€", whole.trim_end_matches([',', '.']), fraction))
    }
}
