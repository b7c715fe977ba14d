//! Claims from the npm package registry.
//!
//! One search request lists packages, then each package's latest manifest
//! becomes a claim set signed by `localhost/npm`.

use async_trait::async_trait;
use claimfeed_core::{escape_subject, Claims, Issuer};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use super::ClaimSource;
use crate::config::{RegistryConfig, MAX_PAGE_SIZE};
use crate::error::{FeedError, Result};

/// Short name of the registry feed's issuer.
pub const NPM_ISSUER: &str = "npm";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    objects: Vec<SearchObject>,
}

#[derive(Debug, Deserialize)]
struct SearchObject {
    package: SearchPackage,
}

#[derive(Debug, Deserialize)]
struct SearchPackage {
    name: String,
}

/// Registry-backed claim source.
#[derive(Debug, Clone)]
pub struct NpmRegistrySource {
    base_url: Url,
    search_text: String,
    page_size: u32,
    issuer: Issuer,
    http: Client,
}

impl NpmRegistrySource {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| FeedError::Config(format!("registry url {base:?}: {e}")))?;

        let page_size = if config.page_size > MAX_PAGE_SIZE {
            warn!(
                requested = config.page_size,
                max = MAX_PAGE_SIZE,
                "page size above registry maximum, clamping"
            );
            MAX_PAGE_SIZE
        } else {
            config.page_size
        };

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FeedError::Config(format!("http client: {e}")))?;

        Ok(Self {
            base_url,
            search_text: config.search_text.clone(),
            page_size,
            issuer: Issuer::from_name(NPM_ISSUER)?,
            http,
        })
    }

    fn search_url(&self) -> Result<Url> {
        let mut url = self
            .base_url
            .join("-/v1/search")
            .map_err(|e| FeedError::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("text", &self.search_text)
            .append_pair("size", &self.page_size.to_string());
        Ok(url)
    }

    fn latest_url(&self, package: &str) -> Result<Url> {
        self.base_url
            .join(&format!("{package}/latest"))
            .map_err(|e| FeedError::registry(package, e))
    }

    async fn fetch(&self, url: Url) -> Result<Value> {
        info!(%url, "fetching");
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FeedError::registry(&url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::registry(&url, format!("status {status}")));
        }
        resp.json().await.map_err(|e| FeedError::registry(&url, e))
    }

    /// Names of the packages the search returns.
    pub async fn search(&self) -> Result<Vec<String>> {
        let url = self.search_url()?;
        let body = self.fetch(url.clone()).await?;
        let response: SearchResponse =
            serde_json::from_value(body).map_err(|e| FeedError::registry(&url, e))?;
        Ok(response
            .objects
            .into_iter()
            .map(|object| object.package.name)
            .collect())
    }

    /// Latest manifest of `package`, stamped with issuer and subject.
    pub async fn package_claims(&self, package: &str) -> Result<Claims> {
        let url = self.latest_url(package)?;
        let manifest = self.fetch(url.clone()).await?;
        let mut claims = Claims::from_value(manifest).map_err(|e| FeedError::registry(&url, e))?;
        claims.set_issuer(&self.issuer);
        claims.set_subject(escape_subject(package));
        Ok(claims)
    }
}

#[async_trait]
impl ClaimSource for NpmRegistrySource {
    fn name(&self) -> &str {
        NPM_ISSUER
    }

    async fn claims(&self) -> Result<Vec<Claims>> {
        let mut batch = Vec::new();
        for package in self.search().await? {
            batch.push(self.package_claims(&package).await?);
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base_url: &str) -> NpmRegistrySource {
        NpmRegistrySource::new(&RegistryConfig {
            base_url: base_url.to_string(),
            ..RegistryConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_search_url_matches_registry_api() {
        let url = source("https://registry.npmjs.org").search_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://registry.npmjs.org/-/v1/search?text=%22js%22&size=5"
        );
    }

    #[test]
    fn test_latest_url_keeps_scope() {
        let url = source("https://registry.npmjs.org/").latest_url("@types/node").unwrap();
        assert_eq!(url.as_str(), "https://registry.npmjs.org/@types/node/latest");
    }

    #[test]
    fn test_page_size_clamped() {
        let source = NpmRegistrySource::new(&RegistryConfig {
            page_size: 1000,
            ..RegistryConfig::default()
        })
        .unwrap();
        assert_eq!(source.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_bad_registry_url() {
        let err = NpmRegistrySource::new(&RegistryConfig {
            base_url: "not a url".into(),
            ..RegistryConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, FeedError::Config(_)));
    }
}
