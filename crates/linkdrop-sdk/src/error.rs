//! Errors surfaced by [`ClaimLink`](crate::ClaimLink) and [`LinkdropSdk`](crate::LinkdropSdk).
//!
//! Every failure falls into one [`ErrorKind`]. Module errors from `linkdrop-eip155` are
//! routed by what went wrong rather than by where: a signer failure inside message
//! encryption is [`ErrorKind::External`], a failed MAC is [`ErrorKind::Crypto`].

use alloy_primitives::{Address, U256};
use linkdrop_eip155::authorization::AuthorizationError;
use linkdrop_eip155::capability::CapabilityError;
use linkdrop_eip155::escrow::{DepositCallError, EscrowLookupError};
use linkdrop_eip155::key::KeyError;
use linkdrop_eip155::link::LinkDecodeError;
use linkdrop_eip155::message::MessageCryptoError;
use linkdrop_eip155::recovery::RecoveryError;
use linkdrop_types::api::EscrowApiError;
use linkdrop_types::claim_link::ClaimLinkStatus;
use linkdrop_types::token::{TokenType, TokenValidationError};

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Decode,
    Crypto,
    State,
    External,
    Api,
}

#[derive(Debug, thiserror::Error)]
pub enum ClaimLinkError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] LinkDecodeError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    External(#[from] CapabilityError),
    #[error(transparent)]
    Api(#[from] EscrowApiError),
}

impl ClaimLinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClaimLinkError::Validation(_) => ErrorKind::Validation,
            ClaimLinkError::Decode(_) => ErrorKind::Decode,
            ClaimLinkError::Crypto(_) => ErrorKind::Crypto,
            ClaimLinkError::State(_) => ErrorKind::State,
            ClaimLinkError::External(_) => ErrorKind::External,
            ClaimLinkError::Api(_) => ErrorKind::Api,
        }
    }
}

/// Input rejected before anything was signed or sent.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Token(#[from] TokenValidationError),
    #[error(transparent)]
    Escrow(#[from] EscrowLookupError),
    #[error(transparent)]
    DepositCall(#[from] DepositCallError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Receiver address is zero")]
    ZeroReceiver,
    #[error("Amount {amount} is outside the transferable range {min}..={max}")]
    AmountOutOfRange { amount: U256, min: U256, max: U256 },
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Message text is {length} bytes, at most {max} allowed")]
    MessageTooLong { length: usize, max: usize },
    #[error("Encryption key length {length} is outside {min}..={max}")]
    KeyLengthOutOfRange { length: usize, min: usize, max: usize },
    #[error("Amount of an ERC721 claim link cannot change")]
    NftAmountImmutable,
    #[error("Transfer limits are not available for {0} tokens")]
    NftLimits(TokenType),
    #[error("Dashboard claim links are redeemed through the dashboard")]
    DashboardLink,
    #[error("Deposit authorizations are only supported for ERC20 tokens, got {0}")]
    NotErc20(TokenType),
    #[error("No EIP-712 domain known for this token, pass one explicitly")]
    UnknownAuthorizationDomain,
}

/// Cryptographic failure. Never downgraded to "no message" or "no signature".
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error(transparent)]
    Key(KeyError),
    #[error(transparent)]
    Message(MessageCryptoError),
    #[error("Recovery signature does not verify: {0}")]
    Signature(String),
    /// The transfer's escrow is not a known deployment, so the recovery domain is unknown.
    #[error("Cannot verify recovery signature: escrow {0} has no known version")]
    UnverifiableSignature(Address),
}

/// Operation attempted in the wrong lifecycle state. Checked before any side effect.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Cannot {operation} a claim link with status {status}")]
    InvalidStatus {
        operation: &'static str,
        status: ClaimLinkStatus,
    },
    #[error("Cannot {0} without a link key")]
    MissingLinkKey(&'static str),
    #[error("Claim URL has not been generated yet")]
    MissingClaimUrl,
    #[error("Message key is not available for this link")]
    MissingMessageKey,
    #[error("Recovered link has no sender signature yet")]
    MissingSenderSignature,
}

impl From<KeyError> for ClaimLinkError {
    fn from(value: KeyError) -> Self {
        match value {
            KeyError::Capability(e) => ClaimLinkError::External(e),
            other => ClaimLinkError::Crypto(CryptoError::Key(other)),
        }
    }
}

impl From<MessageCryptoError> for ClaimLinkError {
    fn from(value: MessageCryptoError) -> Self {
        match value {
            MessageCryptoError::Capability(e) => ClaimLinkError::External(e),
            other => ClaimLinkError::Crypto(CryptoError::Message(other)),
        }
    }
}

impl From<AuthorizationError> for ClaimLinkError {
    fn from(value: AuthorizationError) -> Self {
        match value {
            AuthorizationError::Capability(e) => ClaimLinkError::External(e),
            AuthorizationError::NotErc20(token_type) => ValidationError::NotErc20(token_type).into(),
            AuthorizationError::UnknownDomain { .. } => ValidationError::UnknownAuthorizationDomain.into(),
        }
    }
}

impl From<RecoveryError> for ClaimLinkError {
    fn from(value: RecoveryError) -> Self {
        match value {
            RecoveryError::Escrow(e) => ValidationError::Escrow(e).into(),
            RecoveryError::Key(e) => e.into(),
            RecoveryError::Capability(e) => ClaimLinkError::External(e),
        }
    }
}

impl From<TokenValidationError> for ClaimLinkError {
    fn from(value: TokenValidationError) -> Self {
        ValidationError::Token(value).into()
    }
}

impl From<EscrowLookupError> for ClaimLinkError {
    fn from(value: EscrowLookupError) -> Self {
        ValidationError::Escrow(value).into()
    }
}

impl From<DepositCallError> for ClaimLinkError {
    fn from(value: DepositCallError) -> Self {
        ValidationError::DepositCall(value).into()
    }
}

impl From<ConfigError> for ClaimLinkError {
    fn from(value: ConfigError) -> Self {
        ValidationError::Config(value).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_failures_are_external() {
        let failure = || CapabilityError::Signer("wallet closed".into());
        let from_key: ClaimLinkError = KeyError::Capability(failure()).into();
        let from_message: ClaimLinkError = MessageCryptoError::Capability(failure()).into();
        let from_auth: ClaimLinkError = AuthorizationError::Capability(failure()).into();
        let from_recovery: ClaimLinkError = RecoveryError::Capability(failure()).into();
        for err in [from_key, from_message, from_auth, from_recovery] {
            assert_eq!(err.kind(), ErrorKind::External);
        }
    }

    #[test]
    fn test_error_kinds() {
        let err: ClaimLinkError = MessageCryptoError::AuthenticationFailed.into();
        assert_eq!(err.kind(), ErrorKind::Crypto);
        let err: ClaimLinkError = KeyError::InvalidSeed.into();
        assert_eq!(err.kind(), ErrorKind::Crypto);
        let err: ClaimLinkError = LinkDecodeError::MissingParameter("k").into();
        assert_eq!(err.kind(), ErrorKind::Decode);
        let err: ClaimLinkError = StateError::MissingClaimUrl.into();
        assert_eq!(err.kind(), ErrorKind::State);
        let err: ClaimLinkError = TokenValidationError::MissingAddress.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err: ClaimLinkError = EscrowApiError::Rejected("expired".into()).into();
        assert_eq!(err.kind(), ErrorKind::Api);
    }

    #[test]
    fn test_state_error_message() {
        let err = StateError::InvalidStatus {
            operation: "add a message to",
            status: ClaimLinkStatus::Deposited,
        };
        assert_eq!(
            err.to_string(),
            "Cannot add a message to a claim link with status deposited"
        );
    }
}
