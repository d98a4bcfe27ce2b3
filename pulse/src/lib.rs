//! Pulse social feed client core.
//!
//! `domain` holds the model and services, `outbound` the backend adapters,
//! `inbound` terminal presentation. `client` wires them together.

pub mod client;
pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

pub use client::{ClientMount, ClientOptions, PulseClient, PulsePorts};
pub use config::PulseSettings;
