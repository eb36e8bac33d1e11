//! Language-model port and provider-agnostic request types.

pub mod client;
pub mod types;
