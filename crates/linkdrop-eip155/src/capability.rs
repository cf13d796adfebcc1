//! Injected capabilities: randomness, typed-data signing and transaction broadcasting.
//!
//! The crypto core never reaches for ambient state. Whoever drives a claim link hands
//! these in, and any error they return is propagated unchanged.

use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, Bytes, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use linkdrop_types::chain::ChainId;
use linkdrop_types::claim_link::Transaction;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("Randomness source failed: {0}")]
    Randomness(#[source] BoxError),
    #[error("Randomness source returned {actual} bytes, expected {expected}")]
    RandomnessLength { expected: usize, actual: usize },
    #[error("Typed data signer failed: {0}")]
    Signer(#[source] BoxError),
    #[error("Typed data signer returned a malformed signature: {0}")]
    MalformedSignature(String),
    #[error("Transaction sender failed: {0}")]
    Transaction(#[source] BoxError),
}

/// Source of cryptographically secure random bytes.
pub trait RandomSource: Send + Sync {
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>, CapabilityError>;
}

impl<F> RandomSource for F
where
    F: Fn(usize) -> Result<Vec<u8>, CapabilityError> + Send + Sync,
{
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>, CapabilityError> {
        self(len)
    }
}

/// Operating system backed randomness via the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>, CapabilityError> {
        let mut bytes = vec![0u8; len];
        rand::fill(bytes.as_mut_slice());
        Ok(bytes)
    }
}

/// Draws exactly `N` bytes, rejecting a source that returns any other length.
pub fn random_array<const N: usize, R>(rng: &R) -> Result<[u8; N], CapabilityError>
where
    R: RandomSource + ?Sized,
{
    let bytes = rng.random_bytes(N)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| CapabilityError::RandomnessLength {
        expected: N,
        actual: bytes.len(),
    })
}

/// Produces a 65-byte `r || s || v` signature over EIP-712 typed data.
///
/// Wallet integrations forward the typed data to `eth_signTypedData_v4`; the JSON form
/// of [`TypedData`] is exactly that payload.
#[async_trait::async_trait]
pub trait TypedDataSigner: Send + Sync {
    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, CapabilityError>;
}

#[async_trait::async_trait]
impl TypedDataSigner for PrivateKeySigner {
    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, CapabilityError> {
        let hash = typed_data
            .eip712_signing_hash()
            .map_err(|e| CapabilityError::Signer(Box::new(e)))?;
        let signature = self
            .sign_hash_sync(&hash)
            .map_err(|e| CapabilityError::Signer(Box::new(e)))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }
}

#[async_trait::async_trait]
impl<T: TypedDataSigner + ?Sized> TypedDataSigner for Arc<T> {
    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, CapabilityError> {
        (**self).sign_typed_data(typed_data).await
    }
}

/// Broadcasts a transaction (or user operation) and returns its hash.
#[async_trait::async_trait]
pub trait TransactionSender: Send + Sync {
    async fn send_transaction(
        &self,
        chain_id: ChainId,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Transaction, CapabilityError>;
}

#[async_trait::async_trait]
impl<T: TransactionSender + ?Sized> TransactionSender for Arc<T> {
    async fn send_transaction(
        &self,
        chain_id: ChainId,
        to: Address,
        value: U256,
        data: Bytes,
    ) -> Result<Transaction, CapabilityError> {
        (**self).send_transaction(chain_id, to, value, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_random_length() {
        let bytes = OsRandom.random_bytes(32).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_ne!(bytes, vec![0u8; 32]);
    }

    #[test]
    fn test_random_array_rejects_short_source() {
        let short = |_len: usize| -> Result<Vec<u8>, CapabilityError> { Ok(vec![1u8; 16]) };
        match random_array::<32, _>(&short) {
            Err(CapabilityError::RandomnessLength { expected, actual }) => {
                assert_eq!((expected, actual), (32, 16));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_random_array_propagates_failure() {
        let failing = |_len: usize| -> Result<Vec<u8>, CapabilityError> {
            Err(CapabilityError::Randomness("entropy pool closed".into()))
        };
        assert!(matches!(
            random_array::<24, _>(&failing),
            Err(CapabilityError::Randomness(_))
        ));
    }
}
