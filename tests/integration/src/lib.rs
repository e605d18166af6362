//! Integration test utilities for the relay
//!
//! This crate provides helpers for running end-to-end tests against the
//! WebSocket endpoint and the presence query.

pub mod helpers;

pub use helpers::*;
