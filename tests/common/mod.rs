//! Common test infrastructure
//!
//! End-to-end tests write a corpus of export files into a temporary directory
//! with [`TestCorpus`] and run the loader against a temporary database.

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::{playlist, track, TestCorpus};
