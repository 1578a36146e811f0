//! Integration tests for Leaf-Ledger
//!
//! These tests use wiremock to stand in for the retail site and drive the
//! full discovery, loading, extraction and persistence cycle over HTTP.

mod common;
mod pipeline_tests;
mod resilience_tests;
mod sink_tests;
