//! HTTP request handlers.

pub mod object;
pub mod sync;
