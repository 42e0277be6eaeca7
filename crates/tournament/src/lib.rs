//! Headless match and tournament orchestration for card game simulations
//!
//! This crate provides infrastructure for:
//! - Resolving deck references and assigning controllers to seats
//! - Running single games under a time limit with crash isolation
//! - Playing best-of-N or fixed-count matches
//! - Bracket, round-robin and Swiss tournaments with a retry policy for
//!   games that throw
//!
//! # Usage
//!
//! ```bash
//! # Best of three between two local decks
//! cargo run -p tournament -- -d burn.dck elves.dck -m 3
//!
//! # Swiss tournament over every deck in a directory, remote controller in seat 1
//! cargo run -p tournament -- -D decks/constructed -t swiss -c llm,ai -q
//! ```

mod config;
mod controllers;
mod deck_resolver;
mod error;
mod lineup;
mod match_runner;
mod orchestrator;
mod pairing;
mod results;
mod scheduler;
mod tournament;

#[cfg(test)]
mod test_support;

pub use config::*;
pub use controllers::*;
pub use deck_resolver::*;
pub use error::*;
pub use lineup::*;
pub use match_runner::*;
pub use orchestrator::*;
pub use pairing::*;
pub use results::*;
pub use scheduler::*;
pub use tournament::*;
