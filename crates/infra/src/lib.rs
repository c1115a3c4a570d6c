//! # LiefClock Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Durable SQLite store for pending actions and cached server data
//! - GraphQL gateway and HTTP reachability probe
//! - Configuration loading and tracing setup
//! - Channel-backed host capabilities for headless runs
//!
//! ## Architecture
//! - Implements traits defined in `liefclock-core`
//! - Depends on `liefclock-domain` and `liefclock-core`
//! - Contains all "impure" code (I/O, platform APIs)

pub mod api;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod network;
pub mod observability;
pub mod platform;

// Re-export commonly used items
pub use api::{AccessTokenProvider, ApiClient, ApiClientConfig, ApiError, StaticTokenProvider};
pub use database::*;
pub use errors::InfraError;
pub use http::*;
pub use network::*;
pub use observability::init_tracing;
pub use platform::*;
