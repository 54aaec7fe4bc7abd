//! Property-based tests for naming, the fetch guard and similarity scoring.

mod guard_tests;
mod naming_tests;
mod similarity_tests;
