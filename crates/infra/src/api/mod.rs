//! GraphQL gateway for the LiefClock server
//!
//! Sends the `clockIn`/`clockOut` mutations and the `shifts` query over the
//! shared [`HttpClient`](crate::http::HttpClient). Transport failures and
//! refusals are classified by [`ApiError`] before they cross into the
//! domain error type.

pub mod auth;
pub mod client;
pub mod errors;
pub mod operations;

pub use auth::{AccessTokenProvider, StaticTokenProvider};
pub use client::{ApiClient, ApiClientBuilder, ApiClientConfig};
pub use errors::{ApiError, ApiErrorCategory};
