pub mod client;
pub mod errors;
pub mod pipeline;
pub mod retry;
pub mod types;

pub use client::{Fetcher, build_client, fetch, get_client};
pub use errors::FetchError;
pub use retry::RetryPolicy;
pub use types::{Charset, PageResponse};
