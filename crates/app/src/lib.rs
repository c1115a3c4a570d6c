//! # LiefClock App
//!
//! Application layer - wiring and the headless entry point.
//!
//! This crate contains:
//! - Application context (dependency injection, lifecycle)
//! - Line commands understood by the `liefclock` binary
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod commands;
pub mod context;

pub use commands::Command;
pub use context::AppContext;
