//! Transaction Module
//!
//! Wire-format model, script builders and previous-transaction parsing used
//! by the sighash engine and the assembler.

mod encode;
mod prev_tx;
pub mod script;

pub use encode::*;
pub use prev_tx::*;
