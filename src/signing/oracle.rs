//! Signing Oracle contract
//!
//! The oracle holds the keys (a hardware device, a remote signer, or the
//! in-process [`NativeOracle`](super::native::NativeOracle)). The engine
//! asks it for public keys and for one signature per input, and never
//! retries a failed call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{ErrorCode, SignerError};
use crate::signing::der::Signature;

/// Hash the oracle applies to the payload before signing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// Payload is the final 32-byte digest
    None,
    /// Oracle signs `sha256(payload)`
    Sha256,
}

/// Signature as returned by an oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleSignature {
    Raw(Signature),
    /// DER bytes, optionally followed by a sighash byte
    Der(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("Request rejected on device")]
    Rejected,

    #[error("Oracle did not respond in time")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Device error: {0}")]
    Device(String),
}

impl From<OracleError> for SignerError {
    fn from(e: OracleError) -> Self {
        let code = match e {
            OracleError::Rejected => ErrorCode::OracleRejected,
            OracleError::Timeout => ErrorCode::OracleTimeout,
            OracleError::Cancelled => ErrorCode::Cancelled,
            OracleError::Device(_) => ErrorCode::OracleError,
        };
        SignerError::new(code, e.to_string())
    }
}

/// Key holder that signs on behalf of the engine.
#[async_trait]
pub trait SigningOracle: Send + Sync {
    /// Public key (33 or 65 bytes) at `address_n`
    async fn get_public_key(&self, address_n: &[u32]) -> Result<Vec<u8>, OracleError>;

    /// Sign `payload` with the key at `address_n`
    async fn sign(
        &self,
        address_n: &[u32],
        payload: &[u8],
        hash_algorithm: HashAlgorithm,
    ) -> Result<OracleSignature, OracleError>;
}

/// Create a linked cancel handle and signal
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Caller side: cancels the signing request it was paired with
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Engine side: resolves once the paired handle cancels
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for cancellation; pends forever if the handle was dropped uncancelled
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
