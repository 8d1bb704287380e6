//! storyline library
//!
//! This module exports the CLI configuration and command runner for use in
//! integration tests and as a library.

pub mod commands;
pub mod config;
