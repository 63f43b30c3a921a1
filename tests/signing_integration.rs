use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{ecdsa, Message, PublicKey, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{absolute, transaction, Amount, ScriptBuf};
use utxo_signer::signing::der::Signature;
use utxo_signer::utils::hash160;
use utxo_signer::{
    bip32_to_address_n, cancel_pair, sign_transaction, CancelSignal, CoinRegistry, ErrorCode,
    HashAlgorithm, KeyCache, NativeOracle, OracleError, OracleSignature, PayloadHashing,
    ScriptType, SigningConfig, SigningOracle, SigningSession, SigningState, UnsignedInput,
    UnsignedOutput, UnsignedTransaction,
};

const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

const FIXTURE_PUBKEY: &str = "023230848585885f63803a0a8aecdd6538792d5c539215c91698e315bf0253b43d";
const FIXTURE_DER: &str = "30450221009a0b7be0d4ed3146ee262b42202841834698bb3ee39c24e7437df208b8b7077102202b79ab1e7736219387dffe8d615bbdba87e11477104b867ef47afed1a5ede781";
const FIXTURE_PREV_TXID: &str = "d5f65ee80147b4bcc70b75e4bbf2d7382021b871bd8867ef8fa525ef50864882";
/// Pays 390000 sats to the fixture key's P2PKH script at vout 0
const FIXTURE_PREV_TX: &str = "010000000111111111111111111111111111111111111111111111111111111111111111110000000000ffffffff0170f30500000000001976a91424a56db43cf6f2b02e838ea493f95d8d6047423188ac00000000";
const FIXTURE_SIGNED_TX: &str = "010000000182488650ef25a58fef6788bd71b8212038d7f2bbe4750bc7bcb44701e85ef6d5000000006b4830450221009a0b7be0d4ed3146ee262b42202841834698bb3ee39c24e7437df208b8b7077102202b79ab1e7736219387dffe8d615bbdba87e11477104b867ef47afed1a5ede7810121023230848585885f63803a0a8aecdd6538792d5c539215c91698e315bf0253b43dffffffff0160cc0500000000001976a914de9b2a8da088824e8fe51debea566617d851537888ac00000000";
const FIXTURE_TXID: &str = "fd79435246dee76b2f159d2db08032d666c95adc544de64c8c49f474df4a7fee";

enum Behavior {
    Respond(OracleSignature),
    Fail(OracleError),
    Stall,
    Hang,
}

/// Oracle that holds one fixed key and answers every sign call the same way
struct ScriptedOracle {
    pubkey: Vec<u8>,
    behavior: Behavior,
    key_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    payloads: Mutex<Vec<(Vec<u8>, HashAlgorithm)>>,
}

impl ScriptedOracle {
    fn new(behavior: Behavior) -> Self {
        Self {
            pubkey: hex::decode(FIXTURE_PUBKEY).unwrap(),
            behavior,
            key_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    fn fixture() -> Self {
        Self::new(Behavior::Respond(OracleSignature::Der(hex::decode(FIXTURE_DER).unwrap())))
    }

    fn total_calls(&self) -> usize {
        self.key_calls.load(Ordering::SeqCst) + self.sign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SigningOracle for ScriptedOracle {
    async fn get_public_key(&self, _address_n: &[u32]) -> Result<Vec<u8>, OracleError> {
        self.key_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pubkey.clone())
    }

    async fn sign(
        &self,
        _address_n: &[u32],
        payload: &[u8],
        hash_algorithm: HashAlgorithm,
    ) -> Result<OracleSignature, OracleError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push((payload.to_vec(), hash_algorithm));
        match &self.behavior {
            Behavior::Respond(signature) => Ok(signature.clone()),
            Behavior::Fail(err) => Err(err.clone()),
            Behavior::Stall => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Err(OracleError::Device("stalled".into()))
            }
            Behavior::Hang => std::future::pending().await,
        }
    }
}

fn path(s: &str) -> Vec<u32> {
    bip32_to_address_n(s).unwrap()
}

fn fixture_request() -> UnsignedTransaction {
    UnsignedTransaction {
        coin: "Bitcoin".into(),
        inputs: vec![UnsignedInput {
            address_n: path("m/44'/0'/0'/0/0"),
            script_type: ScriptType::P2pkh,
            prev_tx_id: FIXTURE_PREV_TXID.into(),
            vout: 0,
            amount: Some(390000),
            raw_prev_tx_hex: Some(FIXTURE_PREV_TX.into()),
            sequence: None,
        }],
        outputs: vec![UnsignedOutput::to_address("1MJ2tj2ThBE62zXbBYA5ZaN3fdve5CPAz1", 380000)],
        version: None,
        lock_time: None,
    }
}

fn fixture_config() -> SigningConfig {
    SigningConfig::default().without_prev_tx_hash_check()
}

fn fixture_signature() -> Signature {
    let bytes = hex::decode(FIXTURE_DER).unwrap();
    utxo_signer::signing::der::decode_tlv(&bytes).unwrap()
}

/// Pubkey hash of the key the native oracle holds at `address_n`
async fn native_hash(oracle: &NativeOracle, address_n: &str) -> [u8; 20] {
    hash160(&oracle.get_public_key(&path(address_n)).await.unwrap())
}

/// A one-output transaction paying `value` to `script_pubkey`
fn funding_tx(value: u64, script_pubkey: ScriptBuf) -> bitcoin::Transaction {
    bitcoin::Transaction {
        version: transaction::Version::ONE,
        lock_time: absolute::LockTime::ZERO,
        input: vec![bitcoin::TxIn::default()],
        output: vec![bitcoin::TxOut {
            value: Amount::from_sat(value),
            script_pubkey,
        }],
    }
}

fn decode_tx(serialized: &str) -> bitcoin::Transaction {
    bitcoin::consensus::encode::deserialize(&hex::decode(serialized).unwrap()).unwrap()
}

fn verify(sighash: [u8; 32], sig_with_type: &[u8], pubkey: &[u8]) {
    let (der, hash_type) = sig_with_type.split_at(sig_with_type.len() - 1);
    assert_eq!(hash_type, &[0x01]);
    let sig = ecdsa::Signature::from_der(der).unwrap();
    let key = PublicKey::from_slice(pubkey).unwrap();
    Secp256k1::verification_only()
        .verify_ecdsa(&Message::from_digest(sighash), &sig, &key)
        .unwrap();
}

// =============================================================================
// Reference transaction
// =============================================================================

#[tokio::test]
async fn test_reference_legacy_transaction() {
    let oracle = ScriptedOracle::fixture();
    let signed = sign_transaction(&fixture_request(), &oracle, &fixture_config())
        .await
        .unwrap();

    assert_eq!(signed.serialized_tx, FIXTURE_SIGNED_TX);
    assert_eq!(signed.txid, FIXTURE_TXID);
    assert_eq!(signed.fee, 10000);
    assert_eq!(signed.signatures, vec![FIXTURE_DER.to_string()]);
    assert_eq!(oracle.sign_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reference_accepts_raw_and_typed_signatures() {
    let raw = ScriptedOracle::new(Behavior::Respond(OracleSignature::Raw(fixture_signature())));
    let signed = sign_transaction(&fixture_request(), &raw, &fixture_config()).await.unwrap();
    assert_eq!(signed.serialized_tx, FIXTURE_SIGNED_TX);

    let mut typed = hex::decode(FIXTURE_DER).unwrap();
    typed.push(0x01);
    let typed = ScriptedOracle::new(Behavior::Respond(OracleSignature::Der(typed)));
    let signed = sign_transaction(&fixture_request(), &typed, &fixture_config()).await.unwrap();
    assert_eq!(signed.serialized_tx, FIXTURE_SIGNED_TX);
}

#[tokio::test]
async fn test_reference_request_from_json() {
    let json = format!(
        r#"{{
            "coin": "Bitcoin",
            "inputs": [{{
                "address_n": [2147483692, 2147483648, 2147483648, 0, 0],
                "script_type": "p2pkh",
                "prev_tx_id": "{}",
                "vout": 0,
                "raw_prev_tx_hex": "{}"
            }}],
            "outputs": [{{ "amount": 380000, "address": "1MJ2tj2ThBE62zXbBYA5ZaN3fdve5CPAz1" }}]
        }}"#,
        FIXTURE_PREV_TXID, FIXTURE_PREV_TX
    );
    let request: UnsignedTransaction = serde_json::from_str(&json).unwrap();
    let oracle = ScriptedOracle::fixture();
    let signed = sign_transaction(&request, &oracle, &fixture_config()).await.unwrap();
    assert_eq!(signed.txid, FIXTURE_TXID);
    assert_eq!(signed.fee, 10000);
}

#[tokio::test]
async fn test_single_sha256_payload_mode() {
    let digest_oracle = ScriptedOracle::fixture();
    sign_transaction(&fixture_request(), &digest_oracle, &fixture_config()).await.unwrap();

    let hashing_oracle = ScriptedOracle::fixture();
    let config = fixture_config().with_payload_hashing(PayloadHashing::SingleSha256);
    let signed = sign_transaction(&fixture_request(), &hashing_oracle, &config).await.unwrap();
    assert_eq!(signed.serialized_tx, FIXTURE_SIGNED_TX);

    let (digest, digest_algo) = digest_oracle.payloads.lock().unwrap()[0].clone();
    let (payload, payload_algo) = hashing_oracle.payloads.lock().unwrap()[0].clone();
    assert_eq!(digest_algo, HashAlgorithm::None);
    assert_eq!(payload_algo, HashAlgorithm::Sha256);
    assert_eq!(
        hex::encode(&digest),
        "7bd46a5214886831320b82d22ea388e1f18e4e06c0b4493a2bfdaf431422bb54"
    );
    assert_eq!(utxo_signer::utils::sha256(&payload).to_vec(), digest);
}

// =============================================================================
// Validation happens before the oracle is contacted
// =============================================================================

#[tokio::test]
async fn test_validation_errors_never_reach_the_oracle() {
    let mut bad_address = fixture_request();
    bad_address.outputs[0].address = Some("1MJ2tj2ThBE62zXbBYA5ZaN3fdve5CPAz2".into());

    let mut overspend = fixture_request();
    overspend.outputs[0].amount = 390001;

    let mut unknown_coin = fixture_request();
    unknown_coin.coin = "Florincoin".into();

    let mut multisig = fixture_request();
    multisig.inputs[0].script_type = ScriptType::P2shMultisig;

    let mut no_prev_tx = fixture_request();
    no_prev_tx.inputs[0].raw_prev_tx_hex = None;

    let mut wrong_amount = fixture_request();
    wrong_amount.inputs[0].amount = Some(390001);

    let mut no_outputs = fixture_request();
    no_outputs.outputs.clear();

    let mut big_op_return = fixture_request();
    big_op_return.outputs.push(UnsignedOutput::op_return(&[0u8; 81]));

    let mut duplicate_outpoint = fixture_request();
    duplicate_outpoint.inputs.push(duplicate_outpoint.inputs[0].clone());

    let cases = [
        (bad_address, ErrorCode::UnrecognizedAddressFormat),
        (overspend, ErrorCode::InsufficientInputValue),
        (unknown_coin, ErrorCode::UnsupportedCoin),
        (multisig, ErrorCode::UnsupportedScriptType),
        (no_prev_tx, ErrorCode::MissingRequiredField),
        (wrong_amount, ErrorCode::InvalidInput),
        (no_outputs, ErrorCode::InvalidInput),
        (big_op_return, ErrorCode::InvalidInput),
        (duplicate_outpoint, ErrorCode::InvalidInput),
    ];

    for (request, expected) in cases {
        let oracle = ScriptedOracle::fixture();
        let err = sign_transaction(&request, &oracle, &fixture_config()).await.unwrap_err();
        assert_eq!(err.code, expected, "{}", err);
        assert_eq!(oracle.total_calls(), 0, "oracle contacted for {:?}", expected);
    }
}

#[tokio::test]
async fn test_prev_tx_hash_mismatch_is_rejected_by_default() {
    let oracle = ScriptedOracle::fixture();
    let err = sign_transaction(&fixture_request(), &oracle, &SigningConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(oracle.total_calls(), 0);
}

#[tokio::test]
async fn test_prev_output_not_owned_by_key() {
    // Key differs from the one the spent output is locked to
    let mut oracle = ScriptedOracle::fixture();
    oracle.pubkey = hex::decode("03aaeb52dd7494c361049de67cc680e83ebcbbbdbeb13637d92cd845f70308af5e").unwrap();

    let err = sign_transaction(&fixture_request(), &oracle, &fixture_config()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(oracle.sign_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Oracle failures
// =============================================================================

#[tokio::test]
async fn test_signature_that_does_not_verify() {
    let bogus = Signature::new([0x11; 32], [0x22; 32]);
    let oracle = ScriptedOracle::new(Behavior::Respond(OracleSignature::Raw(bogus)));
    let err = sign_transaction(&fixture_request(), &oracle, &fixture_config()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedSignature);
}

#[tokio::test]
async fn test_undecodable_signature() {
    let oracle = ScriptedOracle::new(Behavior::Respond(OracleSignature::Der(vec![0x31, 0x02, 0x00])));
    let err = sign_transaction(&fixture_request(), &oracle, &fixture_config()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedSignature);
}

#[tokio::test]
async fn test_oracle_errors_map_to_codes() {
    let cases = [
        (OracleError::Rejected, ErrorCode::OracleRejected),
        (OracleError::Timeout, ErrorCode::OracleTimeout),
        (OracleError::Device("unplugged".into()), ErrorCode::OracleError),
    ];
    for (oracle_err, expected) in cases {
        let oracle = ScriptedOracle::new(Behavior::Fail(oracle_err));
        let err = sign_transaction(&fixture_request(), &oracle, &fixture_config()).await.unwrap_err();
        assert_eq!(err.code, expected);
        assert_eq!(oracle.sign_calls.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_oracle_timeout() {
    let oracle = ScriptedOracle::new(Behavior::Stall);
    let config = fixture_config().with_oracle_timeout(Duration::from_millis(50));
    let registry = CoinRegistry::builtin();
    let mut session = SigningSession::new(registry, &config);
    let mut cache = KeyCache::new();

    let err = session
        .sign(&fixture_request(), &oracle, &mut cache, CancelSignal::never())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::OracleTimeout);
    assert_eq!(session.state(), SigningState::Failed(ErrorCode::OracleTimeout));
    assert!(session.history().contains(&SigningState::AwaitingSignature(0)));
}

#[tokio::test]
async fn test_cancel_while_awaiting_signature() {
    let oracle = ScriptedOracle::new(Behavior::Hang);
    let config = fixture_config();
    let mut session = SigningSession::new(CoinRegistry::builtin(), &config);
    let mut cache = KeyCache::new();
    let (handle, signal) = cancel_pair();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });

    let err = session
        .sign(&fixture_request(), &oracle, &mut cache, signal)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert_eq!(err.code, ErrorCode::Cancelled);
    let history = session.history();
    assert_eq!(history[history.len() - 2], SigningState::AwaitingSignature(0));
    assert_eq!(history[history.len() - 1], SigningState::Failed(ErrorCode::Cancelled));
}

#[tokio::test]
async fn test_cancel_before_start() {
    let oracle = ScriptedOracle::fixture();
    let config = fixture_config();
    let mut session = SigningSession::new(CoinRegistry::builtin(), &config);
    let mut cache = KeyCache::new();
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let err = session
        .sign(&fixture_request(), &oracle, &mut cache, signal)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Cancelled);
    assert_eq!(oracle.sign_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Native oracle, checked against an independent sighash implementation
// =============================================================================

#[tokio::test]
async fn test_mixed_script_types_sign_and_verify() {
    let oracle = NativeOracle::from_mnemonic(MNEMONIC, "").unwrap();

    let legacy_hash = native_hash(&oracle, "m/44'/0'/0'/0/0").await;
    let legacy_script = ScriptBuf::from_bytes(utxo_signer::tx::script::p2pkh(&legacy_hash));
    let funding = funding_tx(50_000, legacy_script.clone());
    let funding_hex = bitcoin::consensus::encode::serialize_hex(&funding);

    let wrapped_hash = native_hash(&oracle, "m/49'/0'/0'/0/0").await;
    let native_hash_ = native_hash(&oracle, "m/84'/0'/0'/0/0").await;
    let change_hash = native_hash(&oracle, "m/84'/0'/0'/1/0").await;

    let request = UnsignedTransaction {
        coin: "Bitcoin".into(),
        inputs: vec![
            UnsignedInput {
                address_n: path("m/44'/0'/0'/0/0"),
                script_type: ScriptType::P2pkh,
                prev_tx_id: funding.compute_txid().to_string(),
                vout: 0,
                amount: None,
                raw_prev_tx_hex: Some(funding_hex),
                sequence: None,
            },
            UnsignedInput {
                address_n: path("m/49'/0'/0'/0/0"),
                script_type: ScriptType::P2shP2wpkh,
                prev_tx_id: "11".repeat(32),
                vout: 3,
                amount: Some(70_000),
                raw_prev_tx_hex: None,
                sequence: Some(0xffff_fffd),
            },
            UnsignedInput {
                address_n: path("m/84'/0'/0'/0/0"),
                script_type: ScriptType::P2wpkh,
                prev_tx_id: "22".repeat(32),
                vout: 1,
                amount: Some(30_000),
                raw_prev_tx_hex: None,
                sequence: None,
            },
        ],
        outputs: vec![
            UnsignedOutput::to_address("bc1qyjjkmdpu7metqt5r36jf872a34syws33s82q2j", 100_000),
            UnsignedOutput::change(path("m/84'/0'/0'/1/0"), ScriptType::P2wpkh, 48_000),
            UnsignedOutput::op_return(b"utxo-signer"),
        ],
        version: Some(2),
        lock_time: Some(800_000),
    };

    let config = SigningConfig::default();
    let mut session = SigningSession::new(CoinRegistry::builtin(), &config);
    let mut cache = KeyCache::new();
    let signed = session
        .sign(&request, &oracle, &mut cache, CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(signed.fee, 2_000);
    assert_eq!(signed.signatures.len(), 3);

    let tx = decode_tx(&signed.serialized_tx);
    assert_eq!(signed.txid, tx.compute_txid().to_string());
    assert_eq!(tx.version, transaction::Version::TWO);
    assert_eq!(tx.lock_time.to_consensus_u32(), 800_000);
    assert_eq!(tx.input[1].sequence.0, 0xffff_fffd);

    let mut change_script = vec![0x00, 0x14];
    change_script.extend_from_slice(&change_hash);
    assert_eq!(tx.output[1].script_pubkey.as_bytes(), change_script.as_slice());
    assert_eq!(tx.output[2].value, Amount::ZERO);
    assert!(tx.output[2].script_pubkey.is_op_return());

    let mut sighashes = SighashCache::new(&tx);

    // P2PKH: signature and key in scriptSig, no witness
    let script_sig = tx.input[0].script_sig.as_bytes();
    let sig_len = script_sig[0] as usize;
    let legacy_sig = &script_sig[1..1 + sig_len];
    let legacy_key = &script_sig[2 + sig_len..];
    assert!(tx.input[0].witness.is_empty());
    let legacy = sighashes
        .legacy_signature_hash(0, &legacy_script, EcdsaSighashType::All.to_u32())
        .unwrap();
    verify(legacy.to_byte_array(), legacy_sig, legacy_key);

    // P2SH-P2WPKH: redeem script push in scriptSig, signature in witness
    let mut redeem = vec![0x16, 0x00, 0x14];
    redeem.extend_from_slice(&wrapped_hash);
    assert_eq!(tx.input[1].script_sig.as_bytes(), redeem.as_slice());
    let program = ScriptBuf::from_bytes(redeem[1..].to_vec());
    let wrapped = sighashes
        .p2wpkh_signature_hash(1, &program, Amount::from_sat(70_000), EcdsaSighashType::All)
        .unwrap();
    let witness: Vec<&[u8]> = tx.input[1].witness.iter().collect();
    verify(wrapped.to_byte_array(), witness[0], witness[1]);

    // P2WPKH: empty scriptSig
    assert!(tx.input[2].script_sig.is_empty());
    let mut program = vec![0x00, 0x14];
    program.extend_from_slice(&native_hash_);
    let native = sighashes
        .p2wpkh_signature_hash(
            2,
            &ScriptBuf::from_bytes(program),
            Amount::from_sat(30_000),
            EcdsaSighashType::All,
        )
        .unwrap();
    let witness: Vec<&[u8]> = tx.input[2].witness.iter().collect();
    verify(native.to_byte_array(), witness[0], witness[1]);

    // One key fetch per distinct path
    assert_eq!(cache.len(), 4);
}

#[tokio::test]
async fn test_bitcoin_cash_uses_fork_id() {
    let oracle = NativeOracle::from_mnemonic(MNEMONIC, "").unwrap();
    let request = UnsignedTransaction {
        coin: "BitcoinCash".into(),
        inputs: vec![UnsignedInput {
            address_n: path("m/44'/145'/0'/0/0"),
            script_type: ScriptType::P2pkh,
            prev_tx_id: FIXTURE_PREV_TXID.into(),
            vout: 0,
            amount: Some(25_000),
            raw_prev_tx_hex: None,
            sequence: None,
        }],
        outputs: vec![UnsignedOutput::to_address(
            "bitcoincash:qqj22md58nm09vpwsw82fyletkxkq36zxyxh322pru",
            24_000,
        )],
        version: None,
        lock_time: None,
    };

    let signed = sign_transaction(&request, &oracle, &SigningConfig::default()).await.unwrap();
    assert_eq!(signed.fee, 1_000);

    let tx = decode_tx(&signed.serialized_tx);
    let script_sig = tx.input[0].script_sig.as_bytes();
    let sig_len = script_sig[0] as usize;
    assert_eq!(script_sig[sig_len], 0x41);
    assert_eq!(
        hex::encode(&script_sig[2 + sig_len..]),
        "02bbe7dbcdf8b2261530a867df7180b17a90b482f74f2736b8a30d3f756e42e217"
    );
    assert_eq!(
        hex::encode(tx.output[0].script_pubkey.as_bytes()),
        "76a91424a56db43cf6f2b02e838ea493f95d8d6047423188ac"
    );
}

#[tokio::test]
async fn test_key_cache_is_shared_across_inputs() {
    let oracle = ScriptedOracle::fixture();
    let spend = |vout| UnsignedInput {
        address_n: path("m/84'/0'/0'/0/0"),
        script_type: ScriptType::P2wpkh,
        prev_tx_id: "22".repeat(32),
        vout,
        amount: Some(200_000),
        raw_prev_tx_hex: None,
        sequence: None,
    };
    let mut request = fixture_request();
    request.inputs = vec![spend(0), spend(1)];
    request.outputs[0].amount = 390_000;

    // The fixture signature commits to a different transaction
    let mut config = fixture_config();
    config.verify_signatures = false;

    let mut session = SigningSession::new(CoinRegistry::builtin(), &config);
    let mut cache = KeyCache::new();
    let signed = session
        .sign(&request, &oracle, &mut cache, CancelSignal::never())
        .await
        .unwrap();

    assert_eq!(signed.fee, 10_000);
    assert_eq!(signed.signatures.len(), 2);
    assert_eq!(oracle.key_calls.load(Ordering::SeqCst), 1);
    assert_eq!(oracle.sign_calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.hits(), 1);
    assert_eq!(
        session.history(),
        &[
            SigningState::Building,
            SigningState::Hashing(0),
            SigningState::AwaitingSignature(0),
            SigningState::Assembling(0),
            SigningState::Hashing(1),
            SigningState::AwaitingSignature(1),
            SigningState::Assembling(1),
            SigningState::Finalizing,
            SigningState::Done,
        ]
    );
}
