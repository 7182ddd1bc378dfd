// Phoneclick: the final price sits last inside an <ins> container
use super::{container_price, first_text, SiteParser};
use crate::config::SelectorConfig;
use crate::model::ExtractError;
use scraper::Html;
use std::iter;

pub struct PhoneclickParser;

impl SiteParser for PhoneclickParser {
    fn extract_price(&self, document: &Html, selectors: &SelectorConfig) -> Result<String, ExtractError> {
        for css in iter::once(&selectors.price).chain(selectors.price_fallbacks.iter()) {
            if let Some(text) = first_text(document, css)? {
                return Ok(container_price(text));
            }
        }

        Err(ExtractError::PriceNotFound {
            selector: selectors.price.clone(),
        })
    }
}
