//! Unit test target for the public API
//!
//! Exercises the `QueryMapper` facade end to end against in-memory result sets.

mod fixtures;
mod mapping_tests;
mod parameter_tests;
