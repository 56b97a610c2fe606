//! Screenshot difference engine for spotting background tabs that swap
//! their content while unfocused.
//!
//! [`imgcomparator::compare`] takes two decoded screenshots and returns a
//! mismatch percentage plus the changed regions, each graded by severity.
//! All thresholds live in [`config::DiffConfig`].

pub mod config;
pub mod imgcomparator;

pub use config::DiffConfig;
pub use imgcomparator::{compare, compare_with, DiffError, DiffResult, Image};
