//! Competitor page fetching
//!
//! The scraping capability is an external collaborator: a service that takes
//! a product URL and returns the structured fields of the page. This module
//! owns the allow-list check and the HTTP client for that service.

use crate::config::ScrapeConfig;
use crate::content::CompetitorSnapshot;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Scraped feature lists are truncated to this many entries
const MAX_FEATURES: usize = 10;

/// True iff the URL matches one of the allow-listed domain fragments
pub fn is_supported_url(url: &str, allowed_domains: &[String]) -> bool {
    allowed_domains.iter().any(|domain| url.contains(domain.as_str()))
}

/// Trait for the page-fetch capability
#[async_trait]
pub trait ProductPageFetcher: Send + Sync {
    /// Fetch the structured fields of a product page
    async fn fetch(&self, url: &str) -> Result<CompetitorSnapshot>;
}

/// HTTP client for the external page-fetch service
pub struct HttpPageFetcher {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct FetchRequest<'a> {
    url: &'a str,
}

impl HttpPageFetcher {
    /// Create a new fetcher from configuration
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let base_url = config
            .api_base
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "scrape.api_base is not set".to_string(),
            })?;

        // The page fetch is bounded; a slow competitor page is a per-item
        // failure, never a stuck worker.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ProductPageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<CompetitorSnapshot> {
        let endpoint = format!("{}/extract", self.base_url);

        let response = self
            .client
            .post(&endpoint)
            .json(&FetchRequest { url })
            .send()
            .await
            .map_err(|_| AppError::Fetch {
                message: "Failed to scrape URL. Please check if the URL is accessible."
                    .to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Fetch {
                message: "Failed to scrape URL. Please check if the URL is accessible."
                    .to_string(),
            });
        }

        let mut snapshot: CompetitorSnapshot =
            response.json().await.map_err(|_| AppError::Fetch {
                message: "Failed to scrape URL. Please check if the URL is accessible."
                    .to_string(),
            })?;

        snapshot.features.truncate(MAX_FEATURES);

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist() -> Vec<String> {
        vec![
            "amazon.".to_string(),
            "ebay.".to_string(),
            "aliexpress.".to_string(),
            "rozetka.".to_string(),
            "prom.ua".to_string(),
        ]
    }

    #[test]
    fn test_supported_urls() {
        let allowed = allowlist();
        assert!(is_supported_url("https://www.amazon.com/dp/B0", &allowed));
        assert!(is_supported_url("https://www.ebay.de/itm/1", &allowed));
        assert!(is_supported_url("https://prom.ua/p123", &allowed));
    }

    #[test]
    fn test_unsupported_urls() {
        let allowed = allowlist();
        assert!(!is_supported_url("https://example.com/item", &allowed));
        assert!(!is_supported_url("https://shopify.dev/x", &allowed));
    }

    #[test]
    fn test_fetcher_requires_base_url() {
        let config = ScrapeConfig {
            api_base: None,
            timeout_secs: 30,
            allowed_domains: allowlist(),
        };
        assert!(HttpPageFetcher::new(&config).is_err());
    }
}
