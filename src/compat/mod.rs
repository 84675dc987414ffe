//! Compatibility analysis over resolved versions
//!
//! - [`input`]: parsing of user-supplied project identifiers
//! - [`project`]: project records and their validation
//! - [`matrix`]: loader / game-version matrix build and quorum pruning
//! - [`analyzer`]: the pipeline tying projects, versions and the matrix together
//! - [`error`]: error types for input and analysis

pub mod analyzer;
pub mod error;
pub mod input;
pub mod matrix;
pub mod project;
