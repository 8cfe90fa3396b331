// GitHub API module.
// Request building, transport, conditional execution, and typed endpoints.

pub mod client;
pub mod endpoints;
pub mod executor;
pub mod request;
pub mod transport;
pub mod types;

pub use client::GitHubClient;
pub use executor::{CachePolicy, ConditionalExecutor, Outcome};
pub use request::{PreparedRequest, RequestBuilder};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
pub use types::*;
