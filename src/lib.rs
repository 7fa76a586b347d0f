//! Hashgate - Privacy-Preserving Shared Rate Limiting
//!
//! This crate implements a rate limiting service shared by many callers.
//! Callers send a quota, a window and a batch of pre-hashed entity ids; the
//! service counts one hit per entity in an expiring window held in a shared
//! counting store and reports whether every entity is still within quota.

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod privacy;
pub mod ratelimit;
pub mod store;
