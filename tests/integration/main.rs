//! Integration test suite entry point.

mod fixture;
mod import_tests;
mod pipeline_tests;
