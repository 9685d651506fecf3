use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BaseWebSearch, WebSearchResult};

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Tavily API client for web search
pub struct TavilyClient {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
}

/// Map a `lang-region` style hint ("br-pt") onto Tavily's country filter.
fn country_for_region(region: &str) -> Option<&'static str> {
    let code = region.split(['-', '_']).next().unwrap_or_default();
    match code.to_ascii_lowercase().as_str() {
        "br" => Some("brazil"),
        "pt" => Some("portugal"),
        "us" => Some("united states"),
        _ => None,
    }
}

impl TavilyClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { api_key, client })
    }
}

#[async_trait]
impl BaseWebSearch for TavilyClient {
    async fn search(
        &self,
        query: &str,
        region: &str,
        max_results: usize,
    ) -> Result<Vec<WebSearchResult>> {
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: "basic",
            max_results,
            country: country_for_region(region),
        };

        let response = self
            .client
            .post(TAVILY_SEARCH_URL)
            .json(&request)
            .send()
            .await
            .context("Failed to send Tavily search request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Tavily API error {}: {}", status, body);
        }

        let tavily_response: TavilyResponse = response
            .json()
            .await
            .context("Failed to parse Tavily response")?;

        Ok(tavily_response
            .results
            .into_iter()
            .take(max_results)
            .map(|r| WebSearchResult {
                title: r.title,
                link: r.url,
                snippet: r.content,
            })
            .collect())
    }
}

/// Used when no Tavily key is configured.
pub struct NoopWebSearch;

#[async_trait]
impl BaseWebSearch for NoopWebSearch {
    async fn search(
        &self,
        _query: &str,
        _region: &str,
        _max_results: usize,
    ) -> Result<Vec<WebSearchResult>> {
        tracing::warn!("NoopWebSearch: search called but no Tavily API key configured");
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_mapping() {
        assert_eq!(country_for_region("br-pt"), Some("brazil"));
        assert_eq!(country_for_region("BR"), Some("brazil"));
        assert_eq!(country_for_region("wt-wt"), None);
    }

    #[test]
    fn test_request_omits_unknown_country() {
        let request = TavilyRequest {
            api_key: "k",
            query: "q",
            search_depth: "basic",
            max_results: 5,
            country: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("country").is_none());
        assert_eq!(value["max_results"], 5);
    }
}
