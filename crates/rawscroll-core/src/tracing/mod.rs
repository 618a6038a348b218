//! Logging setup. Library code only emits `tracing` events; installing a
//! subscriber is left to whoever embeds the crate.

pub mod setup;

pub use setup::{env_filter, init_tracing};
