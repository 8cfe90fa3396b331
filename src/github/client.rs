// GitHub API client facade.
// Owns the configuration, request builder, and cache-aware executor for one repository.

use serde::de::DeserializeOwned;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::{HubError, Result};

use super::executor::{CachePolicy, ConditionalExecutor, Outcome};
use super::request::{PreparedRequest, RequestBuilder};
use super::transport::{ReqwestTransport, Transport};
use super::types::RateLimit;

/// Client for the contents of a single GitHub repository.
///
/// Every call goes through a [`ConditionalExecutor`], so repeated reads are
/// revalidated with entity tags instead of re-downloaded. The client is
/// `&self`-callable and can be shared between tasks.
pub struct GitHubClient {
    config: Config,
    requests: RequestBuilder,
    executor: ConditionalExecutor,
}

impl GitHubClient {
    /// Create a client talking to the configured API over HTTPS.
    pub fn new(config: Config) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Box::new(transport))
    }

    /// Create a client from layered configuration (file and `HUBFILE_*` env).
    pub fn from_env() -> Result<Self> {
        Self::new(Config::load()?)
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(config: Config, transport: Box<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let requests = RequestBuilder::new(&config)?;
        let executor = ConditionalExecutor::new(transport, CachePolicy::from_config(&config));

        tracing::debug!(
            repository = %config.full_name(),
            api_base = %config.api_base,
            "created GitHub client"
        );

        Ok(Self {
            config,
            requests,
            executor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn requests(&self) -> &RequestBuilder {
        &self.requests
    }

    pub fn cache(&self) -> &ResponseCache {
        self.executor.cache()
    }

    /// Rate limit values seen on the most recent response.
    pub fn rate_limit(&self) -> RateLimit {
        self.executor.rate_limit()
    }

    /// Run a prepared request through the response cache.
    pub async fn execute(&self, request: PreparedRequest) -> Result<Outcome> {
        self.executor.execute(request).await
    }

    /// Execute and return the body, `None` on 404.
    pub(crate) async fn fetch_text(&self, request: PreparedRequest) -> Result<Option<String>> {
        Ok(self.execute(request).await?.into_body())
    }

    /// Execute and deserialize the body, `None` on 404.
    pub(crate) async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: PreparedRequest,
    ) -> Result<Option<T>> {
        match self.fetch_text(request).await? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    /// Like [`fetch_json`](Self::fetch_json), treating 404 as an error.
    pub(crate) async fn require_json<T: DeserializeOwned>(
        &self,
        request: PreparedRequest,
    ) -> Result<T> {
        let url = request.url.clone();
        self.fetch_json(request).await?.ok_or_else(|| HubError::Status {
            status: 404,
            message: format!("{} not found", url),
        })
    }
}
