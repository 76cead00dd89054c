//! # symgraph
//!
//! Library side of the symgraph binary: command-line parsing, command
//! implementations and configuration. Split out of `main.rs` so the
//! commands can be driven from integration tests.

pub mod cli;
pub mod config;
