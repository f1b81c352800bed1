//! `aistudio` crate (library surface).
//!
//! The primary entrypoint for end users is the `aistudio` binary (CLI + MCP stdio).
//! This library exists so the binary, the tests and embedders share one wiring of
//! configuration, envelopes and the stdio server.

pub use aistudio_client as client;
pub use aistudio_core as core;

pub mod config;
pub mod envelope;
#[cfg(feature = "stdio")]
pub mod server;
pub mod telemetry;
