//! stalefile library
//!
//! Exposes the cache and CLI modules for the binary and integration tests.

pub mod cache;
pub mod cli;
