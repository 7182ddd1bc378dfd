use crate::config::SiteConfig;
use crate::model::FetchError;

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the page body of a site; anything but HTTP 200 is an error.
    async fn fetch(&self, site: &SiteConfig) -> Result<String, FetchError>;
}
