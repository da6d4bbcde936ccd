//! Access-control decision core
//!
//! - [`policy`] - compiled ACLs, expressions, resource patterns, bound models
//! - [`las`] - attribute evaluators, their registry and call-time capabilities
//! - [`engine`] - first-match decision walk
//! - [`cache`] - per-generation decision cache
//! - [`generation`] - versioned policy + cache, atomically replaced on reload
//! - [`request`] - subject and auth context inputs
//! - [`config`] - TOML configuration
//! - [`error`] - error types

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod las;
pub mod policy;
pub mod request;

#[cfg(test)]
mod integration_tests;
