//! Driven adapters implementing the domain ports.
//!
//! - `memory`: process-local backend for tests, demos and offline runs.
//! - `rest`: PostgREST and GoTrue over HTTP.

pub mod memory;
pub mod rest;
