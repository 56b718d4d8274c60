//! Ed25519 keys, signatures and account id derivation

use crate::error::{Error, Result};
use crate::hasher::{hash_parts, HashPrefix};
use crate::types::AccountId;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ed25519 public key as carried in transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Account controlled by this key when used as a master key
    pub fn account_id(&self) -> AccountId {
        let digest = hash_parts(HashPrefix::AccountId, &[&self.0]);
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest.0[..20]);
        AccountId(id)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::InvalidKey {
            reason: e.to_string(),
        })?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| Error::InvalidKey {
            reason: "expected 32 bytes".to_string(),
        })?;
        VerifyingKey::from_bytes(&bytes).map_err(|e| Error::InvalidKey {
            reason: e.to_string(),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.0))
    }
}

/// Signing key pair
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Deterministic key pair from a 32 byte seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let public_key = PublicKey(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            public_key,
        }
    }

    /// Deterministic key pair from a numeric seed, for fixtures and replays
    pub fn from_u64(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self::from_seed(&bytes)
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn account_id(&self) -> AccountId {
        self.public_key.account_id()
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

/// Verify a detached signature. Malformed keys or signatures never verify.
pub fn verify_signature(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}
