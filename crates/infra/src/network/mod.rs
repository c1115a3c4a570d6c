//! Connectivity adapters

pub mod probe;

pub use probe::HttpReachabilityProbe;
