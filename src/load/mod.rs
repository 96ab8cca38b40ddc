//! Parse a directory of playlist exports and load it into the store.

mod aggregate;
mod parallel;
mod pipeline;

pub use aggregate::Aggregate;
pub use parallel::{list_source_files, parse_all};
pub use pipeline::{run, LoadReport, LoadState};
