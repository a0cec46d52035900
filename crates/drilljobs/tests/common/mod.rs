//! Shared test utilities for drilljobs integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a dispatcher to an in-memory store
//! - Builders for object references and job payloads

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{sequential_config, TestHarness};
