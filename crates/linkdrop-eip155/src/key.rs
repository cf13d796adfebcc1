//! Link keys: the one-time secp256k1 keys a claim link carries.
//!
//! The address of a link key is the transfer id under which the escrow holds funds.

use alloy_primitives::{Address, B256, Signature, U256, uint};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use std::fmt;

use crate::capability::{CapabilityError, RandomSource, random_array};

/// Order of the secp256k1 group. Valid private keys are in `[1, n)`.
pub const SECP256K1_ORDER: U256 =
    uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);

pub const LINK_KEY_LENGTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Seed is zero or not below the secp256k1 group order")]
    InvalidSeed,
    #[error("Link key must be at most {LINK_KEY_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
    #[error("Signing with link key failed: {0}")]
    Signing(#[from] alloy_signer::Error),
}

/// A claim link private key.
#[derive(Clone)]
pub struct LinkKey(PrivateKeySigner);

impl LinkKey {
    /// Interprets `seed` as a big-endian scalar. Zero and values `>= n` are rejected
    /// with [`KeyError::InvalidSeed`]; draw fresh randomness and retry.
    pub fn from_seed(seed: &[u8; LINK_KEY_LENGTH]) -> Result<Self, KeyError> {
        let scalar = U256::from_be_bytes(*seed);
        if scalar.is_zero() || scalar >= SECP256K1_ORDER {
            return Err(KeyError::InvalidSeed);
        }
        let signer =
            PrivateKeySigner::from_bytes(&B256::from(*seed)).map_err(|_| KeyError::InvalidSeed)?;
        Ok(Self(signer))
    }

    /// Accepts keys shorter than 32 bytes by left-padding with zeros: links issued by
    /// encoders that dropped leading zero bytes of the scalar still decode.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() > LINK_KEY_LENGTH {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let mut seed = [0u8; LINK_KEY_LENGTH];
        seed[LINK_KEY_LENGTH - bytes.len()..].copy_from_slice(bytes);
        Self::from_seed(&seed)
    }

    /// Generates a fresh key from 32 bytes of injected randomness.
    pub fn generate<R: RandomSource + ?Sized>(rng: &R) -> Result<Self, KeyError> {
        let seed = random_array::<LINK_KEY_LENGTH, R>(rng)?;
        Self::from_seed(&seed)
    }

    /// Keccak256 of the uncompressed public key, low 20 bytes.
    pub fn address(&self) -> Address {
        self.0.address()
    }

    pub fn to_bytes(&self) -> B256 {
        self.0.to_bytes()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.0
    }

    pub fn sign_hash(&self, hash: &B256) -> Result<Signature, KeyError> {
        Ok(self.0.sign_hash_sync(hash)?)
    }
}

/// Transfer id of a link key.
pub fn address_of(link_key: &LinkKey) -> Address {
    link_key.address()
}

impl PartialEq for LinkKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for LinkKey {}

impl fmt::Debug for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LinkKey").field(&self.address()).finish()
    }
}

impl From<PrivateKeySigner> for LinkKey {
    fn from(signer: PrivateKeySigner) -> Self {
        Self(signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn seed_from(value: U256) -> [u8; 32] {
        value.to_be_bytes::<32>()
    }

    #[test]
    fn test_key_one_address() {
        let key = LinkKey::from_seed(&seed_from(U256::from(1))).unwrap();
        assert_eq!(key.address(), address!("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"));
        assert_eq!(address_of(&key), key.address());
    }

    #[test]
    fn test_seed_validity_boundary() {
        assert!(matches!(LinkKey::from_seed(&[0u8; 32]), Err(KeyError::InvalidSeed)));
        assert!(matches!(
            LinkKey::from_seed(&seed_from(SECP256K1_ORDER)),
            Err(KeyError::InvalidSeed)
        ));
        assert!(matches!(LinkKey::from_seed(&[0xff; 32]), Err(KeyError::InvalidSeed)));
        assert!(LinkKey::from_seed(&seed_from(SECP256K1_ORDER - U256::from(1))).is_ok());
        assert!(LinkKey::from_seed(&seed_from(U256::from(2))).is_ok());
    }

    #[test]
    fn test_from_slice_left_pads() {
        let short = LinkKey::from_slice(&[0x01]).unwrap();
        let full = LinkKey::from_seed(&seed_from(U256::from(1))).unwrap();
        assert_eq!(short, full);
        assert_eq!(short.to_bytes(), B256::from(seed_from(U256::from(1))));
        assert!(matches!(LinkKey::from_slice(&[1u8; 33]), Err(KeyError::InvalidLength(33))));
    }

    #[test]
    fn test_generate_uses_injected_randomness() {
        let rng = |len: usize| -> Result<Vec<u8>, CapabilityError> { Ok(vec![0x42; len]) };
        let a = LinkKey::generate(&rng).unwrap();
        let b = LinkKey::generate(&rng).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_bytes(), B256::repeat_byte(0x42));
    }

    #[test]
    fn test_generate_rejects_zero_randomness() {
        let rng = |len: usize| -> Result<Vec<u8>, CapabilityError> { Ok(vec![0; len]) };
        assert!(matches!(LinkKey::generate(&rng), Err(KeyError::InvalidSeed)));
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = LinkKey::from_seed(&[0x42; 32]).unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("4242424242"));
    }
}
