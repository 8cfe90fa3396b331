// GitHub API payload types.
// Defines structs for the user, contents, rate limit, and commit endpoints.

use serde::{Deserialize, Serialize};

use crate::encoding;
use crate::error::Result;

/// Authenticated GitHub user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

/// Kind of entry in a repository tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Unknown,
}

/// A file or directory entry from the contents API.
/// The README endpoint returns the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub name: String,
    pub path: String,
    /// Blob hash; required to update or delete the file.
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    /// Base64 body, only present on single-file responses.
    pub content: Option<String>,
    pub encoding: Option<String>,
    pub download_url: Option<String>,
    pub html_url: Option<String>,
}

impl Content {
    /// Decode the base64 body. Empty when the API omitted it (directory listings).
    pub fn decoded(&self) -> Result<String> {
        match &self.content {
            Some(content) => encoding::decode(content),
            None => Ok(String::new()),
        }
    }

    pub fn is_file(&self) -> bool {
        self.content_type == ContentType::File
    }
}

pub type Readme = Content;

/// Parse a contents response that may hold one object or an array of them.
pub fn parse_content_list(json: &str) -> Result<Vec<Content>> {
    if json.trim_start().starts_with('[') {
        Ok(serde_json::from_str(json)?)
    } else {
        let content: Content = serde_json::from_str(json)?;
        Ok(vec![content])
    }
}

/// Commit identity used for author and committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Body of a create, update, or delete request on the contents API.
#[derive(Debug, Clone, Serialize)]
pub struct FileCommit {
    pub message: String,
    pub author: Signature,
    pub committer: Signature,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl FileCommit {
    pub fn create(message: &str, author: Signature, committer: Signature, content: String) -> Self {
        Self {
            message: message.to_string(),
            author,
            committer,
            content: Some(content),
            sha: None,
        }
    }

    pub fn update(
        message: &str,
        author: Signature,
        committer: Signature,
        content: String,
        sha: &str,
    ) -> Self {
        Self {
            sha: Some(sha.to_string()),
            ..Self::create(message, author, committer, content)
        }
    }

    pub fn delete(message: &str, author: Signature, committer: Signature, sha: &str) -> Self {
        Self {
            message: message.to_string(),
            author,
            committer,
            content: None,
            sha: Some(sha.to_string()),
        }
    }
}

/// Commit created by a contents write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: Option<String>,
    pub html_url: Option<String>,
}

/// Response to a create, update, or delete. `content` is null after a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentCommit {
    pub content: Option<Content>,
    pub commit: Commit,
}

/// Rate limit window, from either `/rate_limit` or response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
    #[serde(default)]
    pub used: u64,
}

impl RateLimit {
    pub fn is_exceeded(&self) -> bool {
        self.remaining < 1
    }
}

/// Response from `/rate_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub rate: RateLimit,
}
