#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Heuristics that turn an extracted bulletin into price items.
//!
//! Everything here is pure: functions take the document representation
//! and an immutable [`config::ExtractConfig`] and return values. Fetching
//! and file I/O live in other crates.

pub mod config;
pub mod fold;
pub mod labels;
pub mod matcher;
pub mod numbers;
pub mod section;
pub mod strategy;
pub mod week;

/// A value together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagged<S, T> {
    pub strategy: S,
    pub value: T,
}

/// Evaluates `strategies` in order and returns the first success.
pub fn first_success<S: Copy, T>(
    strategies: &[S],
    mut attempt: impl FnMut(S) -> Option<T>,
) -> Option<Tagged<S, T>> {
    strategies.iter().find_map(|&strategy| {
        attempt(strategy).map(|value| Tagged { strategy, value })
    })
}
