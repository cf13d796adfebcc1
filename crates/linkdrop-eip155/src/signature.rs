//! 65-byte ECDSA signature helpers.

use alloy_primitives::{Address, B256, Bytes, Signature};

use crate::capability::CapabilityError;

pub const SIGNATURE_LENGTH: usize = 65;

/// Raises a `0/1` recovery byte to the Ethereum `27/28` convention. Other values pass through.
pub fn normalize_recovery_byte(signature: &mut [u8]) {
    if signature.len() == SIGNATURE_LENGTH && signature[SIGNATURE_LENGTH - 1] < 27 {
        signature[SIGNATURE_LENGTH - 1] += 27;
    }
}

/// Parses a signature returned by an external signer.
pub fn parse_signature(bytes: &[u8]) -> Result<Signature, CapabilityError> {
    if bytes.len() != SIGNATURE_LENGTH {
        return Err(CapabilityError::MalformedSignature(format!(
            "expected {SIGNATURE_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }
    Signature::from_raw(bytes).map_err(|e| CapabilityError::MalformedSignature(e.to_string()))
}

/// Canonical `r || s || v` bytes with `v` in `{27, 28}`.
pub fn to_rsv_bytes(signature: &Signature) -> Bytes {
    Bytes::copy_from_slice(&signature.as_bytes())
}

/// Recovers the signer of `prehash` from a 65-byte signature.
pub fn recover_signer(prehash: &B256, signature: &[u8]) -> Result<Address, CapabilityError> {
    parse_signature(signature)?
        .recover_address_from_prehash(prehash)
        .map_err(|e| CapabilityError::MalformedSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_recovery_byte() {
        let mut signature = [0u8; 65];
        signature[64] = 1;
        normalize_recovery_byte(&mut signature);
        assert_eq!(signature[64], 28);
        normalize_recovery_byte(&mut signature);
        assert_eq!(signature[64], 28);

        let mut short = [0u8; 64];
        short[63] = 1;
        normalize_recovery_byte(&mut short);
        assert_eq!(short[63], 1);
    }

    #[test]
    fn test_parse_signature_rejects_wrong_length() {
        assert!(matches!(
            parse_signature(&[0u8; 64]),
            Err(CapabilityError::MalformedSignature(_))
        ));
    }
}
