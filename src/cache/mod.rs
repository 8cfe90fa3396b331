// Response cache module.
// Keeps API responses in memory with their entity tags for conditional requests.

pub mod store;

pub use store::{CacheEntry, CacheKey, CacheLookup, DEFAULT_TTL, ResponseCache};
