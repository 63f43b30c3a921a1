//! Transaction Assembler
//!
//! Drives one signing request from a structured [`UnsignedTransaction`] to a
//! serialized, signed transaction:
//!
//! 1. Validate the whole request (coin, script types, addresses, amounts,
//!    previous transactions, fee) before the oracle is contacted
//! 2. Resolve change outputs to scripts
//! 3. For each input in order: build the pre-image, obtain a signature
//!    from the oracle, decode and check it, build scriptSig/witness
//! 4. Serialize and report txid and fee
//!
//! Every state the session passes through is recorded in its history.
//! Failures are terminal; the caller owns any retry policy.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;

use secp256k1::{ecdsa, Message, PublicKey, Secp256k1, VerifyOnly};

use crate::address::classify_for;
use crate::coins::{CoinParams, CoinRegistry};
use crate::config::SigningConfig;
use crate::error::{ErrorCode, SignerError, SignerResult};
use crate::signing::der::{self, Signature};
use crate::signing::oracle::{CancelSignal, HashAlgorithm, OracleError, OracleSignature, SigningOracle};
use crate::signing::sighash::{SighashEngine, SighashKind, SpentOutput};
use crate::tx::script::{self, script_pubkey_for_key};
use crate::tx::{spent_output, Transaction, TxIn, TxOut};
use crate::types::{ScriptType, SignedTransaction, UnsignedInput, UnsignedOutput, UnsignedTransaction};
use crate::utils::{compress_pubkey, hash160, reversed, sha256, sha256d, KeyCache};
use crate::{log_debug, log_error, log_info, log_warn};

const MODULE: &str = "assembler";

/// Where a signing request currently is.
///
/// `Building` covers validation, change resolution and fetching the public
/// key of every input, so oracle key lookups never fail inside `Hashing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningState {
    Building,
    Hashing(usize),
    AwaitingSignature(usize),
    Assembling(usize),
    Finalizing,
    Done,
    Failed(ErrorCode),
}

impl SigningState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SigningState::Done | SigningState::Failed(_))
    }
}

impl fmt::Display for SigningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningState::Building => write!(f, "Building"),
            SigningState::Hashing(i) => write!(f, "Hashing({})", i),
            SigningState::AwaitingSignature(i) => write!(f, "AwaitingSignature({})", i),
            SigningState::Assembling(i) => write!(f, "Assembling({})", i),
            SigningState::Finalizing => write!(f, "Finalizing"),
            SigningState::Done => write!(f, "Done"),
            SigningState::Failed(code) => write!(f, "Failed({:?})", code),
        }
    }
}

/// An input after validation
#[derive(Debug, Clone)]
struct PreparedInput {
    address_n: Vec<u32>,
    script_type: ScriptType,
    kind: SighashKind,
    amount: u64,
    /// scriptPubKey of the spent output, when the raw previous tx was supplied
    prev_script: Option<Vec<u8>>,
}

/// How an output's script is obtained
#[derive(Debug, Clone)]
enum OutputScript {
    Resolved(Vec<u8>),
    Change { address_n: Vec<u32>, script_type: ScriptType },
}

#[derive(Debug, Clone)]
struct ValidatedRequest {
    unsigned: Transaction,
    inputs: Vec<PreparedInput>,
    outputs: Vec<OutputScript>,
    fee: u64,
}

/// One signing request
pub struct SigningSession<'a> {
    registry: &'a CoinRegistry,
    config: &'a SigningConfig,
    secp: Secp256k1<VerifyOnly>,
    state: SigningState,
    history: Vec<SigningState>,
}

impl<'a> SigningSession<'a> {
    pub fn new(registry: &'a CoinRegistry, config: &'a SigningConfig) -> Self {
        Self {
            registry,
            config,
            secp: Secp256k1::verification_only(),
            state: SigningState::Building,
            history: vec![SigningState::Building],
        }
    }

    pub fn state(&self) -> SigningState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[SigningState] {
        &self.history
    }

    /// Sign `request`. A session signs at most one request.
    pub async fn sign(
        &mut self,
        request: &UnsignedTransaction,
        oracle: &dyn SigningOracle,
        cache: &mut KeyCache,
        cancel: CancelSignal,
    ) -> SignerResult<SignedTransaction> {
        if self.history.len() > 1 || self.state != SigningState::Building {
            return Err(SignerError::internal("Signing session already used"));
        }

        let mut cancel = cancel;
        match self.run(request, oracle, cache, &mut cancel).await {
            Ok(signed) => {
                self.transition(SigningState::Done);
                log_info!(
                    MODULE,
                    "Signing request complete",
                    coin = request.coin,
                    txid = signed.txid,
                    fee = signed.fee
                );
                Ok(signed)
            }
            Err(err) => {
                let failed_at = self.state;
                self.transition(SigningState::Failed(err.code));
                if err.code.is_validation() || err.code.is_oracle() {
                    log_warn!(MODULE, "Signing request failed", at = failed_at, error = err);
                } else {
                    log_error!(MODULE, "Signing request failed", at = failed_at, error = err);
                }
                Err(err)
            }
        }
    }

    fn transition(&mut self, next: SigningState) {
        log_debug!(MODULE, "State transition", from = self.state, to = next);
        self.state = next;
        self.history.push(next);
    }

    async fn run(
        &mut self,
        request: &UnsignedTransaction,
        oracle: &dyn SigningOracle,
        cache: &mut KeyCache,
        cancel: &mut CancelSignal,
    ) -> SignerResult<SignedTransaction> {
        let coin = self.registry.require(&request.coin)?;
        let validated = validate_request(coin, self.config, request)?;
        log_info!(
            MODULE,
            "Signing request accepted",
            coin = coin.name,
            inputs = validated.inputs.len(),
            outputs = validated.outputs.len(),
            fee = validated.fee
        );

        let mut unsigned = validated.unsigned;
        unsigned.outputs = self
            .resolve_outputs(&request.outputs, validated.outputs, oracle, cache, cancel)
            .await?;

        let engine = SighashEngine::new(unsigned.clone(), coin.sighash_type());
        let hashing = self.config.payload_hashing_for(&coin.name);
        let hash_type_byte = (coin.sighash_type() & 0xff) as u8;

        let mut pubkeys = Vec::with_capacity(validated.inputs.len());
        for input in &validated.inputs {
            pubkeys.push(self.public_key(&input.address_n, oracle, cache, cancel).await?);
        }

        let mut signatures = Vec::with_capacity(validated.inputs.len());
        for (index, (input, &pubkey)) in validated.inputs.iter().zip(&pubkeys).enumerate() {
            self.transition(SigningState::Hashing(index));
            let pubkey_hash = hash160(&pubkey);

            let expected_script = script_pubkey_for_key(&pubkey_hash, input.script_type)?;
            if let Some(prev_script) = &input.prev_script {
                if *prev_script != expected_script {
                    return Err(SignerError::invalid_input(format!(
                        "Input {} spends an output not locked to the key at its path",
                        index
                    )));
                }
            }

            let script_code = match input.kind {
                SighashKind::Legacy => input.prev_script.clone().ok_or_else(|| {
                    SignerError::missing_field("raw_prev_tx_hex").with_details(format!("input #{}", index))
                })?,
                SighashKind::WitnessV0 | SighashKind::ForkId => script::p2pkh(&pubkey_hash),
            };
            let spent = SpentOutput {
                kind: input.kind,
                script_code,
                amount: Some(input.amount),
            };
            let preimage = engine.preimage(index, &spent)?;
            let digest = sha256d(&preimage);
            let payload = match hashing.hash_algorithm() {
                HashAlgorithm::None => digest,
                HashAlgorithm::Sha256 => sha256(&preimage),
            };
            log_debug!(MODULE, "Pre-image built", input = index, sighash = hex::encode(digest));

            self.transition(SigningState::AwaitingSignature(index));
            let response = guarded(
                oracle.sign(&input.address_n, &payload, hashing.hash_algorithm()),
                self.config,
                cancel,
            )
            .await?;

            self.transition(SigningState::Assembling(index));
            let signature = match response {
                OracleSignature::Raw(signature) => signature,
                OracleSignature::Der(bytes) => der::decode_tlv(&bytes)?,
            };
            if self.config.verify_signatures {
                self.verify(&signature, &digest, &pubkey)
                    .map_err(|e| e.with_details(format!("input #{}", index)))?;
            }

            let with_type = der::encode_der(&signature, hash_type_byte);
            let txin = &mut unsigned.inputs[index];
            match input.script_type {
                ScriptType::P2pkh => {
                    let mut script_sig = Vec::with_capacity(with_type.len() + pubkey.len() + 2);
                    script::push_data(&mut script_sig, &with_type);
                    script::push_data(&mut script_sig, &pubkey);
                    txin.script_sig = script_sig;
                }
                ScriptType::P2shP2wpkh => {
                    let mut script_sig = Vec::with_capacity(23);
                    script::push_data(&mut script_sig, &script::witness_v0(&pubkey_hash));
                    txin.script_sig = script_sig;
                    txin.witness = vec![with_type, pubkey.to_vec()];
                }
                ScriptType::P2wpkh => {
                    txin.witness = vec![with_type, pubkey.to_vec()];
                }
                other => {
                    return Err(SignerError::unsupported_script_type(format!(
                        "Cannot sign {} inputs",
                        other
                    )));
                }
            }

            signatures.push(hex::encode(signature.to_der()));
            log_debug!(MODULE, "Input signed", input = index, signature = signatures[index]);
        }

        self.transition(SigningState::Finalizing);
        let serialized = unsigned.serialize();
        Ok(SignedTransaction {
            signatures,
            serialized_tx: hex::encode(serialized),
            txid: hex::encode(unsigned.txid()),
            fee: validated.fee,
        })
    }

    async fn resolve_outputs(
        &self,
        requested: &[UnsignedOutput],
        scripts: Vec<OutputScript>,
        oracle: &dyn SigningOracle,
        cache: &mut KeyCache,
        cancel: &mut CancelSignal,
    ) -> SignerResult<Vec<TxOut>> {
        let mut outputs = Vec::with_capacity(scripts.len());
        for (output, script) in requested.iter().zip(scripts) {
            let script_pubkey = match script {
                OutputScript::Resolved(script) => script,
                OutputScript::Change { address_n, script_type } => {
                    let pubkey = self.public_key(&address_n, oracle, cache, cancel).await?;
                    script_pubkey_for_key(&hash160(&pubkey), script_type)?
                }
            };
            outputs.push(TxOut {
                value: output.amount,
                script_pubkey,
            });
        }
        Ok(outputs)
    }

    async fn public_key(
        &self,
        address_n: &[u32],
        oracle: &dyn SigningOracle,
        cache: &mut KeyCache,
        cancel: &mut CancelSignal,
    ) -> SignerResult<[u8; 33]> {
        if let Some(pubkey) = cache.get(address_n) {
            return Ok(pubkey);
        }
        let raw = guarded(oracle.get_public_key(address_n), self.config, cancel).await?;
        let pubkey = compress_pubkey(&raw).map_err(|e| {
            SignerError::oracle_error(format!("Oracle returned an invalid public key: {}", e.message))
        })?;
        cache.set(address_n, pubkey);
        Ok(pubkey)
    }

    /// Check the signature against the digest; high-S is normalized on a copy only
    fn verify(&self, signature: &Signature, digest: &[u8; 32], pubkey: &[u8; 33]) -> SignerResult<()> {
        let mut sig = ecdsa::Signature::from_compact(&signature.to_compact())
            .map_err(|e| SignerError::malformed_signature(format!("Invalid signature values: {}", e)))?;
        sig.normalize_s();
        let message = Message::from_digest(*digest);
        let key = PublicKey::from_slice(pubkey)?;
        self.secp
            .verify_ecdsa(&message, &sig, &key)
            .map_err(|_| SignerError::malformed_signature("Signature does not verify against the sighash"))
    }
}

/// Run an oracle call under the configured timeout and the cancel signal
async fn guarded<T, F>(call: F, config: &SigningConfig, cancel: &mut CancelSignal) -> SignerResult<T>
where
    F: Future<Output = Result<T, OracleError>>,
{
    let timed = async {
        match config.oracle_timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(OracleError::Timeout)),
            None => call.await,
        }
    };

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OracleError::Cancelled),
        result = timed => result,
    };
    outcome.map_err(SignerError::from)
}

/// Everything that can be checked without the oracle
fn validate_request(
    coin: &CoinParams,
    config: &SigningConfig,
    request: &UnsignedTransaction,
) -> SignerResult<ValidatedRequest> {
    if request.inputs.is_empty() {
        return Err(SignerError::invalid_input("Transaction has no inputs"));
    }
    if request.outputs.is_empty() {
        return Err(SignerError::invalid_input("Transaction has no outputs"));
    }

    let mut tx_inputs = Vec::with_capacity(request.inputs.len());
    let mut prepared = Vec::with_capacity(request.inputs.len());
    let mut outpoints = HashSet::with_capacity(request.inputs.len());
    for (index, input) in request.inputs.iter().enumerate() {
        let (txin, ready) = validate_input(coin, config, input)
            .map_err(|e| e.with_details(format!("input #{}", index)))?;
        if !outpoints.insert((txin.prev_txid, txin.vout)) {
            return Err(SignerError::invalid_input(format!(
                "Outpoint {}:{} is spent twice",
                input.prev_tx_id, input.vout
            ))
            .with_details(format!("input #{}", index)));
        }
        tx_inputs.push(txin);
        prepared.push(ready);
    }

    let mut outputs = Vec::with_capacity(request.outputs.len());
    for (index, output) in request.outputs.iter().enumerate() {
        let script = validate_output(coin, output)
            .map_err(|e| e.with_details(format!("output #{}", index)))?;
        outputs.push(script);
    }

    let total_in = checked_sum(prepared.iter().map(|input| input.amount))?;
    let total_out = checked_sum(request.outputs.iter().map(|output| output.amount))?;
    if total_out > total_in {
        return Err(SignerError::insufficient_input_value(total_in, total_out));
    }

    Ok(ValidatedRequest {
        unsigned: Transaction {
            version: request.version.unwrap_or(config.default_version),
            inputs: tx_inputs,
            outputs: Vec::new(),
            lock_time: request.lock_time.unwrap_or(0),
        },
        inputs: prepared,
        outputs,
        fee: total_in - total_out,
    })
}

fn validate_input(
    coin: &CoinParams,
    config: &SigningConfig,
    input: &UnsignedInput,
) -> SignerResult<(TxIn, PreparedInput)> {
    ensure_signable(coin, input.script_type)?;
    if input.address_n.is_empty() {
        return Err(SignerError::missing_field("address_n"));
    }

    let txid_bytes = hex::decode(input.prev_tx_id.trim())?;
    let txid: [u8; 32] = txid_bytes.as_slice().try_into().map_err(|_| {
        SignerError::invalid_input(format!("prev_tx_id must be 32 bytes, got {}", txid_bytes.len()))
    })?;

    let kind = SighashKind::select(coin, input.script_type);

    let mut amount = input.amount;
    let mut prev_script = None;
    match &input.raw_prev_tx_hex {
        Some(raw) => {
            let prev = spent_output(raw, input.vout)?;
            if config.verify_prev_tx_hash && !prev.txid.eq_ignore_ascii_case(input.prev_tx_id.trim()) {
                return Err(SignerError::invalid_input(format!(
                    "raw_prev_tx_hex hashes to {}, not {}",
                    prev.txid, input.prev_tx_id
                )));
            }
            if let Some(declared) = amount {
                if declared != prev.value {
                    return Err(SignerError::invalid_input(format!(
                        "Declared amount {} does not match spent output value {}",
                        declared, prev.value
                    )));
                }
            }
            amount = Some(prev.value);
            prev_script = Some(prev.script_pubkey);
        }
        None if kind == SighashKind::Legacy => {
            return Err(SignerError::missing_field("raw_prev_tx_hex"));
        }
        None => {}
    }

    let amount = amount.ok_or_else(|| SignerError::missing_field("amount"))?;
    let sequence = input.sequence.unwrap_or(config.default_sequence);

    Ok((
        TxIn::new(reversed(txid), input.vout, sequence),
        PreparedInput {
            address_n: input.address_n.clone(),
            script_type: input.script_type,
            kind,
            amount,
            prev_script,
        },
    ))
}

fn validate_output(coin: &CoinParams, output: &UnsignedOutput) -> SignerResult<OutputScript> {
    let targets = [
        output.address.is_some(),
        output.address_n.is_some(),
        output.op_return_data.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if targets > 1 {
        return Err(SignerError::invalid_input(
            "Output must set exactly one of address, address_n or op_return_data",
        ));
    }

    if let Some(address) = &output.address {
        return Ok(OutputScript::Resolved(classify_for(address, coin)?.script_pubkey()));
    }

    if let Some(address_n) = &output.address_n {
        let script_type = output
            .script_type
            .ok_or_else(|| SignerError::missing_field("script_type"))?;
        ensure_signable(coin, script_type)?;
        return Ok(OutputScript::Change {
            address_n: address_n.clone(),
            script_type,
        });
    }

    if let Some(data) = &output.op_return_data {
        if output.amount != 0 {
            return Err(SignerError::invalid_input("OP_RETURN output must carry zero value"));
        }
        return Ok(OutputScript::Resolved(script::op_return(&hex::decode(data.trim())?)?));
    }

    Err(SignerError::missing_field("address"))
}

fn ensure_signable(coin: &CoinParams, script_type: ScriptType) -> SignerResult<()> {
    if script_type.is_multisig() {
        return Err(SignerError::unsupported_script_type(format!(
            "Multisig script type {} is not supported for signing",
            script_type
        )));
    }
    if !coin.supports_script_type(script_type) {
        return Err(SignerError::unsupported_script_type(format!(
            "{} does not support {}",
            coin.name, script_type
        )));
    }
    Ok(())
}

fn checked_sum(mut values: impl Iterator<Item = u64>) -> SignerResult<u64> {
    values.try_fold(0u64, |acc, value| {
        acc.checked_add(value)
            .ok_or_else(|| SignerError::invalid_input("Amount total overflows"))
    })
}

/// Sign `request` against the built-in coin table with a fresh key cache
pub async fn sign_transaction(
    request: &UnsignedTransaction,
    oracle: &dyn SigningOracle,
    config: &SigningConfig,
) -> SignerResult<SignedTransaction> {
    let mut session = SigningSession::new(CoinRegistry::builtin(), config);
    let mut cache = KeyCache::new();
    session.sign(request, oracle, &mut cache, CancelSignal::never()).await
}
