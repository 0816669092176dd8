//! HTTP and WebSocket front end for the poker room betting engine.
//!
//! The binary in `main.rs` wires these modules to either PostgreSQL or the
//! in-memory stores; the router is exposed here so it can be driven in tests.

pub mod api;
pub mod config;
pub mod logging;
