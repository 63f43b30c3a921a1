//! In-process software oracle
//!
//! Derives keys from a BIP39 mnemonic and signs with deterministic
//! (RFC 6979) low-S ECDSA. Useful for tests, watch-only tooling and hot
//! wallets; the seed is zeroized on drop.

use async_trait::async_trait;
use bip39::Mnemonic;
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::Network;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

use crate::error::SignerResult;
use crate::signing::der::Signature;
use crate::signing::oracle::{HashAlgorithm, OracleError, OracleSignature, SigningOracle};
use crate::utils::sha256;

pub struct NativeOracle {
    seed: Zeroizing<[u8; 64]>,
    secp: Secp256k1<All>,
}

impl NativeOracle {
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> SignerResult<Self> {
        let mnemonic = Mnemonic::parse(phrase)?;
        Ok(Self::from_seed(mnemonic.to_seed(passphrase)))
    }

    pub fn from_seed(seed: [u8; 64]) -> Self {
        Self {
            seed: Zeroizing::new(seed),
            secp: Secp256k1::new(),
        }
    }

    fn secret_key(&self, address_n: &[u32]) -> Result<SecretKey, OracleError> {
        let master = Xpriv::new_master(Network::Bitcoin, &self.seed[..])
            .map_err(|e| OracleError::Device(e.to_string()))?;
        let path: DerivationPath = address_n
            .iter()
            .map(|index| ChildNumber::from(*index))
            .collect::<Vec<_>>()
            .into();
        let child = master
            .derive_priv(&self.secp, &path)
            .map_err(|e| OracleError::Device(e.to_string()))?;
        Ok(child.private_key)
    }
}

impl std::fmt::Debug for NativeOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeOracle").finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningOracle for NativeOracle {
    async fn get_public_key(&self, address_n: &[u32]) -> Result<Vec<u8>, OracleError> {
        let secret = self.secret_key(address_n)?;
        Ok(PublicKey::from_secret_key(&self.secp, &secret).serialize().to_vec())
    }

    async fn sign(
        &self,
        address_n: &[u32],
        payload: &[u8],
        hash_algorithm: HashAlgorithm,
    ) -> Result<OracleSignature, OracleError> {
        let digest = match hash_algorithm {
            HashAlgorithm::None => payload.to_vec(),
            HashAlgorithm::Sha256 => sha256(payload).to_vec(),
        };
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| OracleError::Device(format!("Payload is not a 32-byte digest: {}", e)))?;

        let secret = self.secret_key(address_n)?;
        let compact = self.secp.sign_ecdsa(&message, &secret).serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);
        Ok(OracleSignature::Raw(Signature::new(r, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sha256d;
    use crate::wallet::bip32_to_address_n;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[tokio::test]
    async fn test_public_keys_match_bip_vectors() {
        let oracle = NativeOracle::from_mnemonic(MNEMONIC, "").unwrap();

        let bip44 = oracle
            .get_public_key(&bip32_to_address_n("m/44'/0'/0'/0/0").unwrap())
            .await
            .unwrap();
        assert_eq!(
            hex::encode(bip44),
            "03aaeb52dd7494c361049de67cc680e83ebcbbbdbeb13637d92cd845f70308af5e"
        );

        let bip84 = oracle
            .get_public_key(&bip32_to_address_n("m/84'/0'/0'/0/0").unwrap())
            .await
            .unwrap();
        assert_eq!(
            hex::encode(bip84),
            "0330d54fd0dd420a6e5f8d3624f5f3482cae350f79d5f0753bf5beef9c2d91af3c"
        );
    }

    #[tokio::test]
    async fn test_hash_modes_agree() {
        let oracle = NativeOracle::from_mnemonic(MNEMONIC, "").unwrap();
        let path = bip32_to_address_n("m/44'/0'/0'/0/0").unwrap();
        let preimage = b"some transaction pre-image";

        let digest = sha256d(preimage);
        let direct = oracle.sign(&path, &digest, HashAlgorithm::None).await.unwrap();
        let hashed = oracle
            .sign(&path, &sha256(preimage), HashAlgorithm::Sha256)
            .await
            .unwrap();
        assert_eq!(direct, hashed);

        let OracleSignature::Raw(sig) = direct else {
            panic!("native oracle returns raw signatures");
        };
        // low-S: top bit of s is never set
        assert!(sig.s[0] < 0x80);
    }

    #[tokio::test]
    async fn test_rejects_non_digest_payload() {
        let oracle = NativeOracle::from_mnemonic(MNEMONIC, "").unwrap();
        let err = oracle.sign(&[0], b"short", HashAlgorithm::None).await.unwrap_err();
        assert!(matches!(err, OracleError::Device(_)));
    }

    #[test]
    fn test_bad_mnemonic() {
        assert!(NativeOracle::from_mnemonic("abandon abandon", "").is_err());
    }
}
