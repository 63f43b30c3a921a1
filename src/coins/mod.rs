//! Coin Registry
//!
//! Per-coin network parameters: slip44 index, address version bytes,
//! bech32/CashAddr prefixes, fork-id sighash and supported script types.
//! The table is configuration, not code: rows can be added from JSON
//! without touching the engine.

mod registry;

pub use registry::*;
