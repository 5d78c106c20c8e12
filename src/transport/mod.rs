//! HTTP transport and read-through cached fetching.

mod fetch;
mod http;

pub use fetch::{CachedFetcher, FetchOptions, FetchResponse};
pub use http::{HttpTransport, TransportError};
