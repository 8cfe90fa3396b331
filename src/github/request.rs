// Request construction for the GitHub REST API.
// Assembles method, URL, headers and JSON body for each supported operation.

use reqwest::{Method, Url};
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};

use crate::config::Config;
use crate::error::{HubError, Result};

use super::types::{Content, FileCommit, Signature};

const GITHUB_API_VERSION: &str = "2022-11-28";

/// A fully assembled request, built fresh for every call.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
    /// Other cached URLs a successful write makes stale.
    pub invalidates: Vec<String>,
}

impl PreparedRequest {
    /// GET and HEAD responses may be stored and revalidated; nothing else may.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }
}

/// Builds [`PreparedRequest`]s for one repository and identity.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    api_base: Url,
    owner: String,
    repo: String,
    base_headers: HeaderMap,
    commit_message: String,
    author: Signature,
    committer: Signature,
}

impl RequestBuilder {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.auth_token))
            .map_err(|e| HubError::invalid(format!("auth token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.auth_username)
                .map_err(|e| HubError::invalid(format!("user agent: {}", e)))?,
        );
        if let Some(zone) = &config.time_zone {
            headers.insert(
                HeaderName::from_static("time-zone"),
                HeaderValue::from_str(zone)
                    .map_err(|e| HubError::invalid(format!("time zone: {}", e)))?,
            );
        }

        let api_base = Url::parse(config.api_base.trim_end_matches('/'))
            .map_err(|e| HubError::invalid(format!("api_base: {}", e)))?;
        if api_base.cannot_be_a_base() {
            return Err(HubError::invalid(format!("api_base is not a base URL: {}", api_base)));
        }

        Ok(Self {
            api_base,
            owner: config.repository_owner.clone(),
            repo: config.repository_name.clone(),
            base_headers: headers,
            commit_message: config.commit_message.clone(),
            author: Signature::new(config.author_name(), config.author_email()),
            committer: Signature::new(&config.committer_name, &config.committer_email),
        })
    }

    /// GET /user
    pub fn user(&self) -> Result<PreparedRequest> {
        let url = self.endpoint(["user"])?;
        Ok(self.request(Method::GET, url, None))
    }

    /// GET /rate_limit
    pub fn rate_limit(&self) -> Result<PreparedRequest> {
        let url = self.endpoint(["rate_limit"])?;
        Ok(self.request(Method::GET, url, None))
    }

    /// GET /repos/:owner/:repo/readme
    pub fn readme(&self) -> Result<PreparedRequest> {
        Ok(self.request(Method::GET, self.readme_url()?, None))
    }

    /// GET /repos/:owner/:repo/contents/:path
    pub fn content(&self, path: &str) -> Result<PreparedRequest> {
        let url = self.contents_url(validate_path(path)?)?;
        Ok(self.request(Method::GET, url, None))
    }

    /// GET /repos/:owner/:repo/contents, or a directory below it.
    pub fn contents(&self, path: Option<&str>) -> Result<PreparedRequest> {
        let url = self.contents_url(path.unwrap_or_default())?;
        Ok(self.request(Method::GET, url, None))
    }

    /// PUT /repos/:owner/:repo/contents/:path without a sha.
    pub fn create_file(&self, path: &str, encoded: String) -> Result<PreparedRequest> {
        let path = validate_path(path)?;
        let body = FileCommit::create(
            &self.commit_message,
            self.author.clone(),
            self.committer.clone(),
            encoded,
        );
        self.write_request(Method::PUT, path, &body)
    }

    /// PUT /repos/:owner/:repo/contents/:path carrying the current sha.
    pub fn update_file(&self, current: &Content, encoded: String) -> Result<PreparedRequest> {
        let path = validate_path(&current.path)?;
        let body = FileCommit::update(
            &self.commit_message,
            self.author.clone(),
            self.committer.clone(),
            encoded,
            validate_sha(&current.sha)?,
        );
        self.write_request(Method::PUT, path, &body)
    }

    /// DELETE /repos/:owner/:repo/contents/:path carrying the current sha.
    pub fn delete_file(&self, current: &Content) -> Result<PreparedRequest> {
        let path = validate_path(&current.path)?;
        let body = FileCommit::delete(
            &self.commit_message,
            self.author.clone(),
            self.committer.clone(),
            validate_sha(&current.sha)?,
        );
        self.write_request(Method::DELETE, path, &body)
    }

    /// Canonical URL of a content entry; also its cache key.
    /// An empty path names the repository root listing.
    pub fn contents_url(&self, path: &str) -> Result<String> {
        let segments = normalize_path(path).split('/').filter(|s| !s.is_empty());
        self.endpoint(
            ["repos", self.owner.as_str(), self.repo.as_str(), "contents"]
                .into_iter()
                .chain(segments),
        )
    }

    fn readme_url(&self) -> Result<String> {
        self.endpoint(["repos", self.owner.as_str(), self.repo.as_str(), "readme"])
    }

    /// Cached reads made stale by writing `path`: every listing from the
    /// root down to the file's directory, plus the README for README files.
    fn stale_after_write(&self, path: &str) -> Result<Vec<String>> {
        let mut urls = vec![self.contents_url("")?];
        let mut dir = String::new();
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let file_name = segments.pop().unwrap_or_default();
        for segment in segments {
            if !dir.is_empty() {
                dir.push('/');
            }
            dir.push_str(segment);
            urls.push(self.contents_url(&dir)?);
        }
        if file_name.to_ascii_lowercase().starts_with("readme") {
            urls.push(self.readme_url()?);
        }
        Ok(urls)
    }

    /// Append percent-encoded path segments to the API base.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<String> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| HubError::invalid(format!("api_base is not a base URL: {}", self.api_base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    fn request(&self, method: Method, url: String, body: Option<String>) -> PreparedRequest {
        let mut headers = self.base_headers.clone();
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        PreparedRequest {
            method,
            url,
            headers,
            body,
            invalidates: Vec::new(),
        }
    }

    fn write_request(
        &self,
        method: Method,
        path: &str,
        body: &FileCommit,
    ) -> Result<PreparedRequest> {
        let json = serde_json::to_string(body)?;
        let mut request = self.request(method, self.contents_url(path)?, Some(json));
        request.invalidates = self.stale_after_write(path)?;
        Ok(request)
    }
}

fn normalize_path(path: &str) -> &str {
    path.trim().trim_matches('/')
}

/// Reject empty repository paths before anything touches the network.
pub fn validate_path(path: &str) -> Result<&str> {
    let path = normalize_path(path);
    if path.is_empty() {
        return Err(HubError::invalid("content path is required"));
    }
    Ok(path)
}

fn validate_sha(sha: &str) -> Result<&str> {
    if sha.trim().is_empty() {
        return Err(HubError::invalid("content sha is required for update and delete"));
    }
    Ok(sha)
}
