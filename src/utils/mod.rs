//! Shared helpers: hashing, the request-scoped key cache and log output.

mod cache;
pub mod crypto;
pub mod logging;

pub use cache::KeyCache;
pub use crypto::*;
