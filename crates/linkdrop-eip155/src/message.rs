//! Sender message encryption.
//!
//! The sender signs a fixed EIP-712 statement about the transfer; the SHA-256 of that
//! signature is the [`InitialKey`]. The symmetric key is derived from a Base58 prefix of
//! the initial key, so only someone able to reproduce the signature (or holding the
//! initial key from the claim URL) can read the note.
//!
//! Wire format: `key_length: u16 BE || 0x00 || nonce(24) || secretbox(plaintext)`.

use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, B256, Bytes};
use alloy_sol_types::{Eip712Domain, eip712_domain, sol};
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Key, Nonce, XSalsa20Poly1305};
use linkdrop_types::chain::ChainId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::capability::{CapabilityError, RandomSource, TypedDataSigner, random_array};
use crate::signature::normalize_recovery_byte;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Cipher type byte of the only supported scheme, XSalsa20-Poly1305.
pub const CIPHER_TYPE_SECRETBOX: u8 = 0;
pub const NONCE_LENGTH: usize = 24;
pub const SYMMETRIC_KEY_LENGTH: usize = 32;
const KEY_LENGTH_PREFIX: usize = 2;
const CIPHER_HEADER: usize = 1 + NONCE_LENGTH;

const ENCRYPTION_DOMAIN_NAME: &str = "MyEncryptionScheme";
const ENCRYPTION_DOMAIN_VERSION: &str = "1";

sol!(
    /// Statement the sender signs to derive the message key for one transfer.
    #[derive(Serialize, Deserialize)]
    struct EncryptionMessage {
        string seed;
    }
);

#[derive(Debug, thiserror::Error)]
pub enum MessageCryptoError {
    #[error("Encryption key length {0} does not fit into two bytes")]
    KeyLengthTooLarge(usize),
    #[error("Encrypted message is {0} bytes, too short to hold its header")]
    TooShort(usize),
    #[error("Unsupported cipher type {0}")]
    UnsupportedCipher(u8),
    #[error("Message authentication failed")]
    AuthenticationFailed,
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decrypted message is not valid UTF-8")]
    InvalidUtf8,
    #[error("Could not derive encryption key: {0}")]
    KeyDerivation(#[from] bs58::decode::Error),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// SHA-256 of the sender's encryption-statement signature. Travels in claim URLs as `m`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InitialKey(B256);

impl InitialKey {
    /// Hashes a 65-byte signature. The recovery byte is normalized to 27/28 first so
    /// signers that return 0/1 derive the same key.
    pub fn from_signature(signature: &[u8]) -> Self {
        let mut signature = signature.to_vec();
        normalize_recovery_byte(&mut signature);
        Self(B256::from(<[u8; 32]>::from(Sha256::digest(&signature))))
    }

    pub fn as_b256(&self) -> B256 {
        self.0
    }

    /// Symmetric key for a given Base58 prefix length.
    pub fn encryption_key(&self, key_length: usize) -> Result<EncryptionKey, MessageCryptoError> {
        let encoded = bs58::encode(self.0).into_string();
        let prefix = &encoded[..key_length.min(encoded.len())];
        let truncated = bs58::decode(prefix).into_vec()?;
        Ok(EncryptionKey(Sha256::digest(&truncated).into()))
    }
}

impl From<B256> for InitialKey {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Debug for InitialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InitialKey(..)")
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; SYMMETRIC_KEY_LENGTH]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Seals `plaintext` into `type || nonce || box`.
    pub fn seal(&self, plaintext: &[u8], nonce: &[u8; NONCE_LENGTH]) -> Result<Vec<u8>, MessageCryptoError> {
        let cipher = XSalsa20Poly1305::new(Key::from_slice(&self.0));
        let sealed = cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|_| MessageCryptoError::EncryptionFailed)?;
        let mut out = Vec::with_capacity(CIPHER_HEADER + sealed.len());
        out.push(CIPHER_TYPE_SECRETBOX);
        out.extend_from_slice(nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>, MessageCryptoError> {
        if data.len() < CIPHER_HEADER {
            return Err(MessageCryptoError::TooShort(data.len()));
        }
        if data[0] != CIPHER_TYPE_SECRETBOX {
            return Err(MessageCryptoError::UnsupportedCipher(data[0]));
        }
        let cipher = XSalsa20Poly1305::new(Key::from_slice(&self.0));
        cipher
            .decrypt(Nonce::from_slice(&data[1..CIPHER_HEADER]), &data[CIPHER_HEADER..])
            .map_err(|_| MessageCryptoError::AuthenticationFailed)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// An encrypted sender note together with the key length it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMessage {
    pub key_length: u16,
    pub ciphertext: Bytes,
}

impl EncryptedMessage {
    pub fn to_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(KEY_LENGTH_PREFIX + self.ciphertext.len());
        out.extend_from_slice(&self.key_length.to_be_bytes());
        out.extend_from_slice(&self.ciphertext);
        out.into()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MessageCryptoError> {
        if bytes.len() < KEY_LENGTH_PREFIX + CIPHER_HEADER {
            return Err(MessageCryptoError::TooShort(bytes.len()));
        }
        Ok(Self {
            key_length: u16::from_be_bytes([bytes[0], bytes[1]]),
            ciphertext: Bytes::copy_from_slice(&bytes[KEY_LENGTH_PREFIX..]),
        })
    }

    /// Opens the note with a known initial key.
    pub fn decrypt(&self, initial_key: &InitialKey) -> Result<String, MessageCryptoError> {
        let key = initial_key.encryption_key(usize::from(self.key_length))?;
        let plaintext = key.open(&self.ciphertext)?;
        String::from_utf8(plaintext).map_err(|_| MessageCryptoError::InvalidUtf8)
    }
}

pub fn encryption_domain(chain_id: ChainId) -> Eip712Domain {
    eip712_domain! {
        name: ENCRYPTION_DOMAIN_NAME,
        version: ENCRYPTION_DOMAIN_VERSION,
        chain_id: chain_id.inner(),
    }
}

pub fn encryption_statement(transfer_id: Address) -> EncryptionMessage {
    EncryptionMessage {
        seed: format!("Encrypting message (transferId: {transfer_id})"),
    }
}

/// Typed data the sender signs to derive the initial key for `transfer_id`.
pub fn encryption_typed_data(transfer_id: Address, chain_id: ChainId) -> TypedData {
    TypedData::from_struct(
        &encryption_statement(transfer_id),
        Some(encryption_domain(chain_id)),
    )
}

/// Asks `signer` for the encryption statement signature and hashes it.
pub async fn derive_initial_key<S: TypedDataSigner + ?Sized>(
    transfer_id: Address,
    chain_id: ChainId,
    signer: &S,
) -> Result<InitialKey, MessageCryptoError> {
    let signature = signer
        .sign_typed_data(&encryption_typed_data(transfer_id, chain_id))
        .await?;
    Ok(InitialKey::from_signature(&signature))
}

/// Encrypts `text` for `transfer_id`. Returns the message and the initial key, which a
/// claim URL may carry to let the receiver read the note.
#[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
    transfer_id = %transfer_id,
    chain_id = %chain_id,
    key_length = key_length
)))]
pub async fn encrypt_message<R, S>(
    text: &str,
    transfer_id: Address,
    chain_id: ChainId,
    key_length: usize,
    rng: &R,
    signer: &S,
) -> Result<(EncryptedMessage, InitialKey), MessageCryptoError>
where
    R: RandomSource + ?Sized,
    S: TypedDataSigner + ?Sized,
{
    let key_length_prefix =
        u16::try_from(key_length).map_err(|_| MessageCryptoError::KeyLengthTooLarge(key_length))?;
    let initial_key = derive_initial_key(transfer_id, chain_id, signer).await?;
    let nonce = random_array::<NONCE_LENGTH, R>(rng)?;
    let ciphertext = initial_key
        .encryption_key(key_length)?
        .seal(text.as_bytes(), &nonce)?;
    let message = EncryptedMessage {
        key_length: key_length_prefix,
        ciphertext: ciphertext.into(),
    };
    Ok((message, initial_key))
}

/// Re-derives the initial key through `signer` and opens the note. Fails with
/// [`MessageCryptoError::AuthenticationFailed`] for any signer other than the sender.
#[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %transfer_id)))]
pub async fn decrypt_sender_message<S: TypedDataSigner + ?Sized>(
    message: &EncryptedMessage,
    transfer_id: Address,
    chain_id: ChainId,
    signer: &S,
) -> Result<String, MessageCryptoError> {
    let initial_key = derive_initial_key(transfer_id, chain_id, signer).await?;
    message.decrypt(&initial_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use alloy_signer_local::PrivateKeySigner;
    use alloy_sol_types::SolStruct;
    use linkdrop_types::networks::KnownNetwork;

    const TRANSFER_ID: Address = address!("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");

    fn sender() -> PrivateKeySigner {
        PrivateKeySigner::from_bytes(&B256::repeat_byte(0x01)).unwrap()
    }

    fn fixed_rng(len: usize) -> Result<Vec<u8>, CapabilityError> {
        Ok(vec![0x5a; len])
    }

    #[test]
    fn test_statement_hash_matches_typed_data() {
        let domain = encryption_domain(ChainId::base());
        let statement = encryption_statement(TRANSFER_ID);
        assert_eq!(
            statement.seed,
            "Encrypting message (transferId: 0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf)"
        );
        let typed_data = encryption_typed_data(TRANSFER_ID, ChainId::base());
        assert_eq!(
            typed_data.eip712_signing_hash().unwrap(),
            statement.eip712_signing_hash(&domain)
        );
        assert!(domain.verifying_contract.is_none());
    }

    #[test]
    fn test_encryption_key_is_deterministic_per_length() {
        let initial = InitialKey::from_signature(&[0x33; 65]);
        let a = initial.encryption_key(12).unwrap();
        assert_eq!(a, initial.encryption_key(12).unwrap());
        assert_ne!(a, initial.encryption_key(13).unwrap());
        assert_ne!(initial.encryption_key(6).unwrap(), initial.encryption_key(43).unwrap());
        // Lengths beyond the Base58 form use the whole key.
        assert_eq!(
            initial.encryption_key(128).unwrap(),
            initial.encryption_key(1000).unwrap()
        );
    }

    #[test]
    fn test_initial_key_normalizes_recovery_byte() {
        let mut low = [0x44u8; 65];
        low[64] = 1;
        let mut high = low;
        high[64] = 28;
        assert_eq!(InitialKey::from_signature(&low), InitialKey::from_signature(&high));
    }

    #[test]
    fn test_seal_open() {
        let key = EncryptionKey::from_bytes([7u8; 32]);
        let nonce = [9u8; NONCE_LENGTH];
        let sealed = key.seal(b"gm", &nonce).unwrap();
        assert_eq!(sealed[0], CIPHER_TYPE_SECRETBOX);
        assert_eq!(&sealed[1..25], &nonce);
        assert_eq!(sealed.len(), 1 + NONCE_LENGTH + 16 + 2);
        assert_eq!(key.open(&sealed).unwrap(), b"gm");

        let wrong = EncryptionKey::from_bytes([8u8; 32]);
        assert!(matches!(wrong.open(&sealed), Err(MessageCryptoError::AuthenticationFailed)));

        let mut tampered = sealed.clone();
        tampered[0] = 1;
        assert!(matches!(key.open(&tampered), Err(MessageCryptoError::UnsupportedCipher(1))));
        assert!(matches!(key.open(&sealed[..10]), Err(MessageCryptoError::TooShort(10))));
    }

    #[test]
    fn test_message_bytes_layout() {
        let message = EncryptedMessage {
            key_length: 300,
            ciphertext: Bytes::from(vec![0u8; CIPHER_HEADER + 16]),
        };
        let bytes = message.to_bytes();
        assert_eq!(&bytes[..2], &[0x01, 0x2c]);
        assert_eq!(EncryptedMessage::from_bytes(&bytes).unwrap(), message);
        assert!(matches!(
            EncryptedMessage::from_bytes(&[0, 12, 0]),
            Err(MessageCryptoError::TooShort(3))
        ));
    }

    #[tokio::test]
    async fn test_sender_can_decrypt() {
        let signer = sender();
        let (message, initial_key) =
            encrypt_message("hello there", TRANSFER_ID, ChainId::base(), 12, &fixed_rng, &signer)
                .await
                .unwrap();
        assert_eq!(message.key_length, 12);
        let text = decrypt_sender_message(&message, TRANSFER_ID, ChainId::base(), &signer)
            .await
            .unwrap();
        assert_eq!(text, "hello there");
        assert_eq!(message.decrypt(&initial_key).unwrap(), "hello there");
    }

    #[tokio::test]
    async fn test_other_signer_cannot_decrypt() {
        let (message, _) =
            encrypt_message("secret", TRANSFER_ID, ChainId::base(), 43, &fixed_rng, &sender())
                .await
                .unwrap();
        let stranger = PrivateKeySigner::from_bytes(&B256::repeat_byte(0x02)).unwrap();
        assert!(matches!(
            decrypt_sender_message(&message, TRANSFER_ID, ChainId::base(), &stranger).await,
            Err(MessageCryptoError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_signer_failure_propagates() {
        struct Offline;
        #[async_trait::async_trait]
        impl TypedDataSigner for Offline {
            async fn sign_typed_data(&self, _: &TypedData) -> Result<Bytes, CapabilityError> {
                Err(CapabilityError::Signer("wallet locked".into()))
            }
        }
        assert!(matches!(
            encrypt_message("x", TRANSFER_ID, ChainId::base(), 12, &fixed_rng, &Offline).await,
            Err(MessageCryptoError::Capability(CapabilityError::Signer(_)))
        ));
    }
}
