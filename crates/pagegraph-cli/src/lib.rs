//! pagegraph-cli: Command-line front end for the pagegraph mirror.

pub mod config;
