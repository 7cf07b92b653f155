//! Request extractors and response layers

pub mod client;
pub mod headers;
