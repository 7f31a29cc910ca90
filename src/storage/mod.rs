//! Storage backends.

pub mod backend;
pub mod cloudflare;
pub mod local;
pub mod memory;
pub mod r2;
