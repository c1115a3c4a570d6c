//! HTTP transport shared by the GraphQL gateway and the reachability probe

pub mod client;

pub use client::{Delivery, HttpClient, HttpClientBuilder};
