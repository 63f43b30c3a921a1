//! Wallet Module
//!
//! BIP32 path helpers, per-coin account path planning and path
//! classification.

mod account_paths;
mod describe;
mod derivation_path;

pub use account_paths::*;
pub use derivation_path::*;
pub use describe::*;
