use crate::config::SiteConfig;
use crate::model::FetchError;
use crate::scraper::traits::Fetcher;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) PriceSniper/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, timeout_secs })
    }

    fn build_headers(site: &SiteConfig) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &site.headers {
            let invalid = |message: String| FetchError::InvalidHeader {
                name: name.clone(),
                message,
            };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, site: &SiteConfig) -> Result<String, FetchError> {
        let headers = Self::build_headers(site)?;
        debug!("GET {}", site.url);

        let request = async {
            let response = self.client.get(&site.url).headers(headers).send().await?;
            if response.status() != StatusCode::OK {
                return Err(FetchError::Status(response.status().as_u16()));
            }
            Ok::<_, FetchError>(response.text().await?)
        };

        let body = timeout(Duration::from_secs(self.timeout_secs), request)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout_secs))??;

        debug!("Received {} bytes from {}", body.len(), site.name);
        Ok(body)
    }
}
