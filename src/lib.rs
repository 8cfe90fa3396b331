//! Client for the contents of a GitHub repository.
//!
//! Reads go through an in-memory response cache that revalidates with
//! entity tags (`If-None-Match`), so unchanged resources cost a 304 instead
//! of a full download. Writes bypass the cache and invalidate what they touch.

pub mod cache;
pub mod config;
pub mod encoding;
pub mod error;
pub mod github;

pub use cache::{CacheEntry, CacheKey, CacheLookup, ResponseCache};
pub use config::{Config, ConfigError};
pub use error::{HubError, Result};
pub use github::{GitHubClient, Outcome};
