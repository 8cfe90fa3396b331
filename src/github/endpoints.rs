// GitHub API endpoint functions.
// Typed operations for the user, README, rate limit, and repository contents.

use std::path::Path;

use crate::encoding;
use crate::error::{HubError, Result};

use super::client::GitHubClient;
use super::executor::Outcome;
use super::request::{PreparedRequest, validate_path};
use super::types::{
    Content, ContentCommit, RateLimit, RateLimitStatus, Readme, User, parse_content_list,
};

impl GitHubClient {
    /// Get the authenticated user.
    pub async fn get_user(&self) -> Result<Option<User>> {
        self.fetch_json(self.requests().user()?).await
    }

    /// Get the repository's default README.
    pub async fn get_readme(&self) -> Result<Option<Readme>> {
        self.fetch_json(self.requests().readme()?).await
    }

    /// Get the decoded text of the default README.
    pub async fn get_readme_content(&self) -> Result<Option<String>> {
        match self.get_readme().await? {
            Some(readme) => Ok(Some(readme.decoded()?)),
            None => Ok(None),
        }
    }

    /// Query `/rate_limit`. This call does not count against the quota.
    pub async fn get_rate_limit(&self) -> Result<RateLimit> {
        let status: RateLimitStatus = self.require_json(self.requests().rate_limit()?).await?;
        Ok(status.rate)
    }

    /// Whether the core quota is used up.
    pub async fn rate_limit_exceeded(&self) -> Result<bool> {
        Ok(self.get_rate_limit().await?.is_exceeded())
    }

    /// Get one content entry (e.g. `hello.txt` or `docs/hello.txt`).
    pub async fn get_content(&self, path: &str) -> Result<Option<Content>> {
        let request = self.requests().content(path)?;
        self.fetch_json(request).await
    }

    /// List the entries at the repository root.
    pub async fn get_contents(&self) -> Result<Option<Vec<Content>>> {
        self.list(None).await
    }

    /// List the entries of a directory. A file path yields a one-element list.
    pub async fn get_contents_at(&self, path: &str) -> Result<Option<Vec<Content>>> {
        self.list(Some(path)).await
    }

    async fn list(&self, path: Option<&str>) -> Result<Option<Vec<Content>>> {
        match self.fetch_text(self.requests().contents(path)?).await? {
            Some(body) => Ok(Some(parse_content_list(&body)?)),
            None => Ok(None),
        }
    }

    /// Get the decoded text of a file.
    pub async fn get_file_contents(&self, path: &str) -> Result<Option<String>> {
        match self.get_content(path).await? {
            Some(content) => Ok(Some(content.decoded()?)),
            None => Ok(None),
        }
    }

    /// Upload a local file, creating or updating it as needed.
    /// Without a repository path, the file lands at the root under its own name.
    pub async fn upload_content(
        &self,
        source_file: &Path,
        content_path: Option<&str>,
    ) -> Result<ContentCommit> {
        validate_source(source_file)?;
        let path = match content_path.filter(|p| !p.trim().is_empty()) {
            Some(path) => path.to_string(),
            None => source_file
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .ok_or_else(|| HubError::invalid("source file has no usable file name"))?,
        };

        match self.get_content(&path).await? {
            Some(existing) => {
                tracing::debug!("{} exists, updating", existing.path);
                self.update_file_with(source_file, &existing).await
            }
            None => {
                tracing::debug!("{} not found, creating", path);
                self.create_file(source_file, &path).await
            }
        }
    }

    /// Create a new file from a local source file.
    pub async fn create_file(&self, source_file: &Path, content_path: &str) -> Result<ContentCommit> {
        validate_source(source_file)?;
        validate_path(content_path)?;
        let encoded = encoding::encode_file(source_file)?;

        let request = self.requests().create_file(content_path, encoded)?;
        let commit = self.write(request).await?;
        tracing::info!("created {} in {}", content_path, self.config().full_name());
        Ok(commit)
    }

    /// Update an existing file. Returns `None` when the path does not exist.
    pub async fn update_file(
        &self,
        source_file: &Path,
        content_path: &str,
    ) -> Result<Option<ContentCommit>> {
        validate_source(source_file)?;
        validate_path(content_path)?;

        match self.get_content(content_path).await? {
            Some(existing) => Ok(Some(self.update_file_with(source_file, &existing).await?)),
            None => {
                tracing::debug!("unable to locate {}", content_path);
                Ok(None)
            }
        }
    }

    /// Update a file whose current state (and sha) the caller already holds.
    pub async fn update_file_with(
        &self,
        source_file: &Path,
        current: &Content,
    ) -> Result<ContentCommit> {
        validate_source(source_file)?;
        let encoded = encoding::encode_file(source_file)?;

        let request = self.requests().update_file(current, encoded)?;
        let commit = self.write(request).await?;
        tracing::info!("updated {} in {}", current.path, self.config().full_name());
        Ok(commit)
    }

    /// Delete a file. Returns `false` when it does not exist.
    pub async fn delete_content(&self, content_path: &str) -> Result<bool> {
        validate_path(content_path)?;

        let Some(existing) = self.get_content(content_path).await? else {
            tracing::debug!("file not found: {}", content_path);
            return Ok(false);
        };

        let request = self.requests().delete_file(&existing)?;
        match self.execute(request).await? {
            Outcome::NotFound => Ok(false),
            _ => {
                tracing::info!("deleted {} from {}", existing.path, self.config().full_name());
                Ok(true)
            }
        }
    }

    async fn write(&self, request: PreparedRequest) -> Result<ContentCommit> {
        let url = request.url.clone();
        match self.execute(request).await? {
            Outcome::NotFound => Err(HubError::Status {
                status: 404,
                message: format!("{} not found", url),
            }),
            Outcome::Fresh(body) | Outcome::Cached(body) => Ok(serde_json::from_str(&body)?),
        }
    }
}

fn validate_source(source_file: &Path) -> Result<()> {
    if source_file.as_os_str().is_empty() {
        return Err(HubError::invalid("source file is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use reqwest::Method;
    use reqwest::header::IF_NONE_MATCH;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::cache::CacheKey;
    use crate::config::{Config, test_config};
    use crate::github::transport::scripted::ScriptedTransport;

    const CONTENT_URL: &str = "https://api.github.com/repos/octo/notes/contents/hello.txt";

    const HELLO: &str = r#"{"name":"hello.txt","path":"hello.txt","sha":"abc123","size":5,"type":"file","content":"aGVsbG8=\n","encoding":"base64"}"#;

    const COMMIT: &str = r#"{"content":{"name":"hello.txt","path":"hello.txt","sha":"def456"},"commit":{"sha":"c0ffee","message":"Updated via hubfile"}}"#;

    fn client(transport: &ScriptedTransport) -> GitHubClient {
        GitHubClient::with_transport(test_config(), Box::new(transport.clone())).unwrap()
    }

    fn source_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", text).unwrap();
        file
    }

    #[tokio::test]
    async fn test_get_user() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            &[("etag", "\"u1\"")],
            r#"{"id":1,"login":"octo","name":"Octo Cat","email":null}"#,
        );

        let user = client(&transport).get_user().await.unwrap().unwrap();
        assert_eq!(user.login, "octo");
        assert_eq!(user.name.as_deref(), Some("Octo Cat"));
    }

    #[tokio::test]
    async fn test_readme_content_revalidated() {
        let transport = ScriptedTransport::new();
        transport
            .respond(
                200,
                &[("etag", "\"r1\"")],
                r#"{"name":"README.md","path":"README.md","sha":"1","content":"IyBOb3Rlcwo=\n"}"#,
            )
            .respond(304, &[], "");
        let client = client(&transport);

        assert_eq!(client.get_readme_content().await.unwrap().as_deref(), Some("# Notes\n"));
        assert_eq!(client.get_readme_content().await.unwrap().as_deref(), Some("# Notes\n"));
        assert_eq!(transport.requests()[1].headers[IF_NONE_MATCH], "\"r1\"");
    }

    #[tokio::test]
    async fn test_missing_readme_is_none() {
        let transport = ScriptedTransport::new();
        transport.respond(404, &[], r#"{"message":"Not Found"}"#);

        assert!(client(&transport).get_readme_content().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_exceeded() {
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            &[],
            r#"{"resources":{},"rate":{"limit":60,"remaining":0,"reset":1700000000,"used":60}}"#,
        );

        assert!(client(&transport).rate_limit_exceeded().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_content_is_none() {
        let transport = ScriptedTransport::new();
        transport.respond(404, &[], r#"{"message":"Not Found"}"#);

        let content = client(&transport).get_content("missing.txt").await.unwrap();
        assert!(content.is_none());
    }

    #[tokio::test]
    async fn test_get_file_contents() {
        let transport = ScriptedTransport::new();
        transport.respond(200, &[("etag", "\"h1\"")], HELLO);

        let text = client(&transport).get_file_contents("hello.txt").await.unwrap();
        assert_eq!(text.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_list_contents_accepts_array_and_object() {
        let transport = ScriptedTransport::new();
        transport
            .respond(200, &[], r#"[{"name":"a","path":"a","sha":"1"}]"#)
            .respond(200, &[], r#"{"name":"a","path":"a","sha":"1"}"#);
        let client = client(&transport);

        let root = client.get_contents().await.unwrap().unwrap();
        assert_eq!(root.len(), 1);
        let single = client.get_contents_at("a").await.unwrap().unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].name, "a");
    }

    #[tokio::test]
    async fn test_update_with_empty_path_makes_no_calls() {
        let transport = ScriptedTransport::new();
        let client = client(&transport);
        let file = source_file("hello");

        let result = client.update_file(file.path(), "").await;

        assert!(matches!(result, Err(HubError::InvalidInput(_))));
        assert_eq!(transport.call_count(), 0);
        assert!(client.cache().get(&CacheKey::get(CONTENT_URL)).is_none());
    }

    #[tokio::test]
    async fn test_update_with_empty_source_makes_no_calls() {
        let transport = ScriptedTransport::new();
        let client = client(&transport);

        let result = client.update_file(Path::new(""), "hello.txt").await;

        assert!(matches!(result, Err(HubError::InvalidInput(_))));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_sends_current_sha_and_invalidates() {
        let transport = ScriptedTransport::new();
        transport
            .respond(200, &[("etag", "\"h1\"")], HELLO)
            .respond(200, &[], COMMIT);
        let client = client(&transport);
        let file = source_file("hello again");

        let commit = client.update_file(file.path(), "hello.txt").await.unwrap().unwrap();

        assert_eq!(commit.commit.sha, "c0ffee");
        let requests = transport.requests();
        assert_eq!(requests[1].method, Method::PUT);
        assert!(requests[1].headers.get(IF_NONE_MATCH).is_none());
        let body: serde_json::Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["sha"], "abc123");
        assert_eq!(body["content"], encoding::encode("hello again"));
        assert!(client.cache().get(&CacheKey::get(CONTENT_URL)).is_none());
    }

    #[tokio::test]
    async fn test_update_missing_file_is_none() {
        let transport = ScriptedTransport::new();
        transport.respond(404, &[], "");
        let file = source_file("hello");

        let result = client(&transport).update_file(file.path(), "hello.txt").await.unwrap();
        assert!(result.is_none());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_creates_when_absent() {
        let transport = ScriptedTransport::new();
        transport.respond(404, &[], "").respond(201, &[], COMMIT);
        let file = source_file("hello");

        client(&transport)
            .upload_content(file.path(), Some("hello.txt"))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::PUT);
        let body: serde_json::Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert!(body.get("sha").is_none());
    }

    #[tokio::test]
    async fn test_upload_defaults_to_file_name() {
        let transport = ScriptedTransport::new();
        transport.respond(200, &[], HELLO).respond(200, &[], COMMIT);
        let file = source_file("hello");
        let name = file.path().file_name().unwrap().to_str().unwrap().to_string();

        client(&transport).upload_content(file.path(), None).await.unwrap();

        let requests = transport.requests();
        assert!(requests[0].url.ends_with(&format!("/contents/{}", name)));
        // Updates go to the path the server reported for the existing entry.
        assert_eq!(requests[1].url, CONTENT_URL);
    }

    #[tokio::test]
    async fn test_delete_content() {
        let transport = ScriptedTransport::new();
        transport
            .respond(200, &[("etag", "\"h1\"")], HELLO)
            .respond(200, &[], r#"{"content":null,"commit":{"sha":"c0ffee"}}"#);
        let client = client(&transport);

        assert!(client.delete_content("hello.txt").await.unwrap());

        let requests = transport.requests();
        assert_eq!(requests[1].method, Method::DELETE);
        let body: serde_json::Value = serde_json::from_str(requests[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["sha"], "abc123");
        assert!(client.cache().get(&CacheKey::get(CONTENT_URL)).is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_false() {
        let transport = ScriptedTransport::new();
        transport.respond(404, &[], "");

        assert!(!client(&transport).delete_content("hello.txt").await.unwrap());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_content_with_reserved_characters() {
        let transport = ScriptedTransport::new();
        transport
            .respond(
                200,
                &[("etag", "\"b1\"")],
                r#"{"name":"notes.txt#backup","path":"notes.txt#backup","sha":"abc123"}"#,
            )
            .respond(200, &[], r#"{"content":null,"commit":{"sha":"c0ffee"}}"#);
        let client = client(&transport);

        assert!(client.delete_content("notes.txt#backup").await.unwrap());

        let expected = "https://api.github.com/repos/octo/notes/contents/notes.txt%23backup";
        let requests = transport.requests();
        assert_eq!(requests[0].url, expected);
        assert_eq!(requests[1].method, Method::DELETE);
        assert_eq!(requests[1].url, expected);
    }

    #[tokio::test]
    async fn test_get_content_with_query_and_space() {
        let transport = ScriptedTransport::new();
        transport.respond(404, &[], "");

        let content = client(&transport).get_content("drafts/what now?.md").await.unwrap();

        assert!(content.is_none());
        assert_eq!(
            transport.requests()[0].url,
            "https://api.github.com/repos/octo/notes/contents/drafts/what%20now%3F.md"
        );
    }

    #[tokio::test]
    async fn test_create_refreshes_cached_listing() {
        let transport = ScriptedTransport::new();
        transport
            .respond(200, &[("etag", "\"l1\"")], r#"[{"name":"a","path":"a","sha":"1"}]"#)
            .respond(201, &[], COMMIT)
            .respond(
                200,
                &[("etag", "\"l2\"")],
                r#"[{"name":"a","path":"a","sha":"1"},{"name":"b","path":"b","sha":"2"}]"#,
            );
        let config = Config {
            revalidate_fresh: false,
            ..test_config()
        };
        let client = GitHubClient::with_transport(config, Box::new(transport.clone())).unwrap();
        let file = source_file("b");

        let before = client.get_contents().await.unwrap().unwrap();
        assert_eq!(before.len(), 1);

        client.create_file(file.path(), "b").await.unwrap();
        let after = client.get_contents().await.unwrap().unwrap();

        assert_eq!(transport.call_count(), 3);
        let names: Vec<_> = after.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        // The listing was dropped, so the third call is unconditional.
        assert!(transport.requests()[2].headers.get(IF_NONE_MATCH).is_none());
    }

    #[tokio::test]
    async fn test_readme_write_refreshes_cached_readme() {
        let transport = ScriptedTransport::new();
        transport
            .respond(
                200,
                &[("etag", "\"r1\"")],
                r#"{"name":"README.md","path":"README.md","sha":"1","content":"IyBOb3Rlcwo="}"#,
            )
            .respond(200, &[], COMMIT);
        let config = Config {
            revalidate_fresh: false,
            ..test_config()
        };
        let client = GitHubClient::with_transport(config, Box::new(transport.clone())).unwrap();
        let readme_url = "https://api.github.com/repos/octo/notes/readme";
        let file = source_file("# Notes, revised");

        client.get_readme().await.unwrap().unwrap();
        assert!(client.cache().get(&CacheKey::get(readme_url)).is_some());

        let current: Content = serde_json::from_str(
            r#"{"name":"README.md","path":"README.md","sha":"1"}"#,
        )
        .unwrap();
        client.update_file_with(file.path(), &current).await.unwrap();

        assert!(client.cache().get(&CacheKey::get(readme_url)).is_none());
    }

    #[tokio::test]
    async fn test_write_conflict_surfaces() {
        let transport = ScriptedTransport::new();
        transport
            .respond(200, &[("etag", "\"h1\"")], HELLO)
            .respond(409, &[], r#"{"message":"hello.txt does not match abc123"}"#);
        let file = source_file("hello");

        let result = client(&transport).update_file(file.path(), "hello.txt").await;
        assert!(matches!(result, Err(HubError::Status { status: 409, .. })));
    }
}
