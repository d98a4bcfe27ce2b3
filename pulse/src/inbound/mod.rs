//! Driving adapters presenting domain state to a user.

pub mod terminal;
