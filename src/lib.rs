//! Library entry for npmscout exposing the search core for the binary and integration tests.

pub mod args;
pub mod logic;
pub mod settings;
pub mod sources;
pub mod state;
pub mod util;

#[cfg(test)]
mod test_utils;
