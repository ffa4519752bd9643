//! Cache-related MCP tools.
//!
//! This module provides read access to the partition store.

pub mod lookup;

pub use lookup::{CacheMatchParams, match_impl};
