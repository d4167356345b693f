//! Horse-racing odds and race simulation.
//!
//! Builds a rectangular odds grid from a race's probable-odds pools, runs a tick-driven race
//! simulation over a field of runners, and fetches programs, odds and results from the racing
//! authority's JSON feed.

pub mod data;
pub mod decode;
pub mod feed;
pub mod file;
pub mod generation;
pub mod grid;
pub mod orientation;
pub mod print;
pub mod sim;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
