//! Common test utilities for the integration tests
//!
//! Seeds an in-memory server with a small notebook and provides checks
//! that compare an incrementally edited workspace with a fresh build.

#![allow(dead_code)]

pub mod checks;
pub mod fixture;

pub use checks::{assert_consistent, instance_paths, node};
pub use fixture::{notebook, Notebook};
