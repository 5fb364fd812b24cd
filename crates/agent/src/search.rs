use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use aerodesk_core::config::SearchConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub content: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

pub struct TavilySearch {
    http: Client,
    base_url: String,
    api_key: SecretString,
    max_results: u32,
}

impl TavilySearch {
    pub fn from_config(config: &SearchConfig, timeout_secs: u64) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("web search requires search.api_key (TAVILY_API_KEY)"))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        #[derive(Serialize)]
        struct Request<'a> {
            api_key: &'a str,
            query: &'a str,
            max_results: u32,
        }

        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            results: Vec<SearchHit>,
        }

        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(&Request {
                api_key: self.api_key.expose_secret(),
                query,
                max_results: self.max_results,
            })
            .send()
            .await
            .context("tavily request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("tavily returned {status}: {body}");
        }

        let parsed: Response = response.json().await.context("invalid tavily body")?;
        Ok(parsed.results)
    }
}

/// Stand-in when no search key is configured; the tool then reports the
/// failure to the model instead of aborting the turn.
pub struct DisabledSearch;

#[async_trait]
impl WebSearch for DisabledSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>> {
        bail!("web search is not configured")
    }
}

#[cfg(test)]
mod tests {
    use aerodesk_core::config::SearchConfig;

    use super::{DisabledSearch, TavilySearch, WebSearch};

    #[test]
    fn tavily_requires_api_key() {
        let config = SearchConfig {
            api_key: None,
            base_url: "https://api.tavily.com".to_string(),
            max_results: 5,
        };
        let error = TavilySearch::from_config(&config, 10).err().expect("missing key must fail");
        assert!(error.to_string().contains("TAVILY_API_KEY"));
    }

    #[tokio::test]
    async fn disabled_search_reports_failure() {
        let error = DisabledSearch.search("weather in Basel").await.expect_err("disabled");
        assert_eq!(error.to_string(), "web search is not configured");
    }
}
