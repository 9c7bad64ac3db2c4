//! propfetch - Fetch property records from the ATTOM Data property API

pub mod api;
pub mod config;
pub mod error;

pub use api::{AddressSpec, ApiResponse, Client, ClientConfig, Endpoint, PropertyTable};
pub use error::ApiError;
