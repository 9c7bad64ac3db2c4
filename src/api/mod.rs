pub mod client;
pub mod endpoint;
pub mod query;
pub mod response;

pub use client::{Client, ClientConfig, RateLimiter, RatePolicy};
pub use endpoint::{Endpoint, PATH_PREFIX, service_path};
pub use query::{
    AddressSpec, QueryOptions, QueryParams, build_query, build_query_for_alias, update_query,
};
pub use response::{ApiResponse, PropertyTable, extract_properties};
