//! Receiver signatures: proof that the redeemer holds the link key.
//!
//! The link key personal-signs `keccak256(receiver)`. The escrow recovers the signer and
//! checks it against the transfer id, so the key itself never leaves the claim URL.

use alloy_primitives::{Address, B256, Bytes, eip191_hash_message, keccak256};

use crate::capability::CapabilityError;
use crate::key::{KeyError, LinkKey};
use crate::signature::{recover_signer, to_rsv_bytes};

/// EIP-191 personal-message digest over `keccak256(receiver)`.
pub fn receiver_digest(receiver: Address) -> B256 {
    eip191_hash_message(keccak256(receiver))
}

/// Signs `receiver` with the link key. The recovery byte is always 27 or 28.
pub fn sign_receiver(link_key: &LinkKey, receiver: Address) -> Result<Bytes, KeyError> {
    let signature = link_key.sign_hash(&receiver_digest(receiver))?;
    Ok(to_rsv_bytes(&signature))
}

/// Address of the key that produced `signature` for `receiver`.
pub fn recover_receiver_signer(receiver: Address, signature: &[u8]) -> Result<Address, CapabilityError> {
    recover_signer(&receiver_digest(receiver), signature)
}
