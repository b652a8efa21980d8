//! # perfplan
//!
//! Library target of the perfplan binary: the HTTP API, the CLI and the
//! configuration layer. Exposed as a library so integration tests can
//! build the router directly.

pub mod api;
pub mod cli;
pub mod config;
