//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock origins and drive complete
//! crawl jobs end-to-end against an in-memory or on-disk job store.

mod common;
mod crawl_tests;
mod job_tests;
