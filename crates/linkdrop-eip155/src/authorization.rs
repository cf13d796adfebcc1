//! Gas-less deposit authorizations for stablecoins.
//!
//! The sender signs an EIP-3009 style statement allowing the escrow to pull
//! `total_amount` of the token. The escrow API relays it on-chain, so the authorization
//! blob sent to the API is the ABI-encoded call arguments and the selector travels
//! separately.
//!
//! Three token-side entry points exist:
//! - `approveWithAuthorization(..., v, r, s)` for bridged Polygon USDC,
//! - `receiveWithAuthorization(..., v, r, s)` for older FiatToken deployments,
//! - `receiveWithAuthorization(..., bytes signature)` for FiatToken v2.2 and later.
//!
//! The encoding must match the token's verifier exactly; a mismatch is only detected
//! on-chain.

use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_sol_types::{Eip712Domain, SolCall, SolStruct, sol};
use linkdrop_types::chain::ChainId;
use linkdrop_types::timestamp::UnixTimestamp;
use linkdrop_types::token::{Token, TokenKind, TokenType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::capability::{CapabilityError, TypedDataSigner};
use crate::signature::{parse_signature, to_rsv_bytes};
use crate::stablecoins::find_stablecoin;

#[cfg(feature = "telemetry")]
use tracing::instrument;

/// Seconds before now the authorization becomes valid.
pub const VALID_AFTER_OFFSET: u64 = 60 * 60;
/// Seconds after now the authorization expires.
pub const VALID_BEFORE_OFFSET: u64 = 24 * 60 * 60;

sol!(
    /// EIP-712 statement for `approveWithAuthorization`.
    #[derive(Serialize, Deserialize)]
    struct ApproveWithAuthorization {
        address owner;
        address spender;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

sol!(
    /// EIP-712 statement for both `receiveWithAuthorization` encodings.
    #[derive(Serialize, Deserialize)]
    struct ReceiveWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

sol! {
    #[allow(missing_docs)]
    #[allow(clippy::too_many_arguments)]
    #[derive(Debug)]
    interface IDepositAuthorization {
        function approveWithAuthorization(
            address owner,
            address spender,
            uint256 value,
            uint256 validAfter,
            uint256 validBefore,
            bytes32 nonce,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external;

        function receiveWithAuthorization(
            address from,
            address to,
            uint256 value,
            uint256 validAfter,
            uint256 validBefore,
            bytes32 nonce,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external;

        function receiveWithAuthorization(
            address from,
            address to,
            uint256 value,
            uint256 validAfter,
            uint256 validBefore,
            bytes32 nonce,
            bytes signature
        ) external;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationMethod {
    ApproveWithAuthorization,
    ReceiveWithAuthorization,
    #[serde(rename = "ReceiveWithAuthorizationEOA")]
    ReceiveWithAuthorizationEoa,
}

impl AuthorizationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationMethod::ApproveWithAuthorization => "ApproveWithAuthorization",
            AuthorizationMethod::ReceiveWithAuthorization => "ReceiveWithAuthorization",
            AuthorizationMethod::ReceiveWithAuthorizationEoa => "ReceiveWithAuthorizationEOA",
        }
    }

    pub fn selector_bytes(&self) -> [u8; 4] {
        match self {
            AuthorizationMethod::ApproveWithAuthorization => {
                IDepositAuthorization::approveWithAuthorizationCall::SELECTOR
            }
            AuthorizationMethod::ReceiveWithAuthorizationEoa => {
                IDepositAuthorization::receiveWithAuthorization_0Call::SELECTOR
            }
            AuthorizationMethod::ReceiveWithAuthorization => {
                IDepositAuthorization::receiveWithAuthorization_1Call::SELECTOR
            }
        }
    }

    /// `0x`-prefixed selector as the escrow API expects it.
    pub fn selector(&self) -> String {
        alloy_primitives::hex::encode_prefixed(self.selector_bytes())
    }
}

impl fmt::Display for AuthorizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown authorization method `{0}`")]
pub struct AuthorizationMethodFormatError(String);

impl FromStr for AuthorizationMethod {
    type Err = AuthorizationMethodFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ApproveWithAuthorization" => Ok(AuthorizationMethod::ApproveWithAuthorization),
            "ReceiveWithAuthorization" => Ok(AuthorizationMethod::ReceiveWithAuthorization),
            "ReceiveWithAuthorizationEOA" => Ok(AuthorizationMethod::ReceiveWithAuthorizationEoa),
            other => Err(AuthorizationMethodFormatError(other.to_string())),
        }
    }
}

/// Caller overrides. Both fields default to the stablecoin table entry for the token.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationConfig {
    pub domain: Option<Eip712Domain>,
    pub method: Option<AuthorizationMethod>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("Deposit authorizations are only supported for ERC20 tokens, got {0}")]
    NotErc20(TokenType),
    #[error("No EIP-712 domain known for token {token} on chain {chain_id}")]
    UnknownDomain { chain_id: ChainId, token: Address },
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// An explicit override wins; otherwise the stablecoin table decides, and unknown
/// tokens fall back to `receiveWithAuthorization` with a full signature.
pub fn select_method(token: &Token, method: Option<AuthorizationMethod>) -> AuthorizationMethod {
    method
        .or_else(|| find_stablecoin(token.chain_id, token.address()).map(|s| s.method))
        .unwrap_or(AuthorizationMethod::ReceiveWithAuthorization)
}

/// Deterministic authorization nonce. The preimage is the concatenation of the
/// checksummed addresses and decimal amounts, as the escrow service computes it.
pub fn authorization_nonce(
    method: AuthorizationMethod,
    sender: Address,
    transfer_id: Address,
    amount: U256,
    expiration: UnixTimestamp,
    fee_amount: U256,
) -> B256 {
    let preimage = match method {
        AuthorizationMethod::ApproveWithAuthorization => {
            format!("{sender}{transfer_id}{amount}{expiration}")
        }
        AuthorizationMethod::ReceiveWithAuthorization
        | AuthorizationMethod::ReceiveWithAuthorizationEoa => {
            format!("{sender}{transfer_id}{amount}{expiration}{fee_amount}")
        }
    };
    keccak256(preimage.as_bytes())
}

/// `(valid_after, valid_before)` around `now`.
pub fn validity_window(now: UnixTimestamp) -> (UnixTimestamp, UnixTimestamp) {
    (now - VALID_AFTER_OFFSET, now + VALID_BEFORE_OFFSET)
}

/// Inputs of a deposit authorization.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub token: Token,
    pub sender: Address,
    /// Escrow contract that pulls the funds.
    pub escrow: Address,
    pub transfer_id: Address,
    /// Amount moved into escrow, fee included.
    pub total_amount: U256,
    pub expiration: UnixTimestamp,
    pub fee_amount: U256,
    pub now: UnixTimestamp,
}

/// A signed, encoded authorization ready for the escrow API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositAuthorization {
    pub method: AuthorizationMethod,
    /// ABI-encoded call arguments, without the selector.
    pub authorization: Bytes,
    pub nonce: B256,
    pub valid_after: UnixTimestamp,
    pub valid_before: UnixTimestamp,
}

impl DepositAuthorization {
    pub fn selector(&self) -> String {
        self.method.selector()
    }
}

fn resolve_domain(token: &Token, config: &AuthorizationConfig) -> Result<Eip712Domain, AuthorizationError> {
    if let Some(domain) = &config.domain {
        return Ok(domain.clone());
    }
    find_stablecoin(token.chain_id, token.address())
        .map(|s| s.eip712_domain())
        .ok_or(AuthorizationError::UnknownDomain {
            chain_id: token.chain_id,
            token: token.address(),
        })
}

async fn sign<T, S>(statement: &T, domain: Eip712Domain, signer: &S) -> Result<alloy_primitives::Signature, AuthorizationError>
where
    T: SolStruct + Serialize,
    S: TypedDataSigner + ?Sized,
{
    let typed_data = TypedData::from_struct(statement, Some(domain));
    let raw = signer.sign_typed_data(&typed_data).await?;
    Ok(parse_signature(&raw)?)
}

/// Signs and encodes a deposit authorization for an ERC20 stablecoin.
#[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
    chain_id = %request.token.chain_id,
    token = %request.token.address(),
    transfer_id = %request.transfer_id
)))]
pub async fn build_deposit_authorization<S: TypedDataSigner + ?Sized>(
    request: &AuthorizationRequest,
    config: &AuthorizationConfig,
    signer: &S,
) -> Result<DepositAuthorization, AuthorizationError> {
    if !matches!(request.token.kind, TokenKind::Erc20 { .. }) {
        return Err(AuthorizationError::NotErc20(request.token.token_type()));
    }
    let domain = resolve_domain(&request.token, config)?;
    let method = select_method(&request.token, config.method);
    let nonce = authorization_nonce(
        method,
        request.sender,
        request.transfer_id,
        request.total_amount,
        request.expiration,
        request.fee_amount,
    );
    let (valid_after, valid_before) = validity_window(request.now);
    let after = U256::from(valid_after.as_secs());
    let before = U256::from(valid_before.as_secs());

    let mut authorization = Vec::new();
    match method {
        AuthorizationMethod::ApproveWithAuthorization => {
            let statement = ApproveWithAuthorization {
                owner: request.sender,
                spender: request.escrow,
                value: request.total_amount,
                validAfter: after,
                validBefore: before,
                nonce,
            };
            let signature = sign(&statement, domain, signer).await?;
            IDepositAuthorization::approveWithAuthorizationCall {
                owner: statement.owner,
                spender: statement.spender,
                value: statement.value,
                validAfter: statement.validAfter,
                validBefore: statement.validBefore,
                nonce,
                v: 27 + signature.v() as u8,
                r: B256::from(signature.r()),
                s: B256::from(signature.s()),
            }
            .abi_encode_raw(&mut authorization);
        }
        AuthorizationMethod::ReceiveWithAuthorizationEoa | AuthorizationMethod::ReceiveWithAuthorization => {
            let statement = ReceiveWithAuthorization {
                from: request.sender,
                to: request.escrow,
                value: request.total_amount,
                validAfter: after,
                validBefore: before,
                nonce,
            };
            let signature = sign(&statement, domain, signer).await?;
            if method == AuthorizationMethod::ReceiveWithAuthorizationEoa {
                IDepositAuthorization::receiveWithAuthorization_0Call {
                    from: statement.from,
                    to: statement.to,
                    value: statement.value,
                    validAfter: statement.validAfter,
                    validBefore: statement.validBefore,
                    nonce,
                    v: 27 + signature.v() as u8,
                    r: B256::from(signature.r()),
                    s: B256::from(signature.s()),
                }
                .abi_encode_raw(&mut authorization);
            } else {
                IDepositAuthorization::receiveWithAuthorization_1Call {
                    from: statement.from,
                    to: statement.to,
                    value: statement.value,
                    validAfter: statement.validAfter,
                    validBefore: statement.validBefore,
                    nonce,
                    signature: to_rsv_bytes(&signature),
                }
                .abi_encode_raw(&mut authorization);
            }
        }
    }

    Ok(DepositAuthorization {
        method,
        authorization: authorization.into(),
        nonce,
        valid_after,
        valid_before,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stablecoins::{USDC_AVALANCHE, USDC_BASE, USDC_BRIDGED_POLYGON};
    use alloy_primitives::{Signature, address};
    use alloy_signer_local::PrivateKeySigner;
    use linkdrop_types::networks::KnownNetwork;

    const ESCROW: Address = address!("0xbe7b40eb3a9d85d3a76142cb637ab824f0d35ead");
    const TRANSFER_ID: Address = address!("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");

    fn signer() -> PrivateKeySigner {
        PrivateKeySigner::from_bytes(&B256::repeat_byte(0x07)).unwrap()
    }

    fn request(token: Token) -> AuthorizationRequest {
        AuthorizationRequest {
            token,
            sender: signer().address(),
            escrow: ESCROW,
            transfer_id: TRANSFER_ID,
            total_amount: U256::from(1_010_000u64),
            expiration: UnixTimestamp::from_secs(1_900_000_000),
            fee_amount: U256::from(10_000u64),
            now: UnixTimestamp::from_secs(1_800_000_000),
        }
    }

    #[test]
    fn test_selectors() {
        assert_eq!(AuthorizationMethod::ApproveWithAuthorization.selector(), "0xe1560fd3");
        assert_eq!(AuthorizationMethod::ReceiveWithAuthorizationEoa.selector(), "0xef55bec6");
        assert_eq!(AuthorizationMethod::ReceiveWithAuthorization.selector(), "0x88b7ab63");
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in [
            AuthorizationMethod::ApproveWithAuthorization,
            AuthorizationMethod::ReceiveWithAuthorization,
            AuthorizationMethod::ReceiveWithAuthorizationEoa,
        ] {
            assert_eq!(method.as_str().parse::<AuthorizationMethod>().unwrap(), method);
        }
        assert!("Permit".parse::<AuthorizationMethod>().is_err());
    }

    #[test]
    fn test_select_method() {
        let bridged = Token::erc20(ChainId::polygon(), USDC_BRIDGED_POLYGON.address);
        let usdc_base = Token::erc20(ChainId::base(), USDC_BASE.address);
        let avalanche = Token::erc20(ChainId::avalanche(), USDC_AVALANCHE.address);
        assert_eq!(select_method(&bridged, None), AuthorizationMethod::ApproveWithAuthorization);
        assert_eq!(select_method(&usdc_base, None), AuthorizationMethod::ReceiveWithAuthorization);
        assert_eq!(select_method(&avalanche, None), AuthorizationMethod::ReceiveWithAuthorizationEoa);
        for method in [
            AuthorizationMethod::ApproveWithAuthorization,
            AuthorizationMethod::ReceiveWithAuthorization,
            AuthorizationMethod::ReceiveWithAuthorizationEoa,
        ] {
            assert_eq!(select_method(&bridged, Some(method)), method);
            assert_eq!(select_method(&usdc_base, Some(method)), method);
        }
    }

    #[test]
    fn test_nonce() {
        let sender = signer().address();
        let amount = U256::from(5u64);
        let expiration = UnixTimestamp::from_secs(100);
        let approve = authorization_nonce(
            AuthorizationMethod::ApproveWithAuthorization,
            sender,
            TRANSFER_ID,
            amount,
            expiration,
            U256::from(1u64),
        );
        let expected = keccak256(format!("{sender}0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf5100"));
        assert_eq!(approve, expected);

        let receive = |fee: u64| {
            authorization_nonce(
                AuthorizationMethod::ReceiveWithAuthorization,
                sender,
                TRANSFER_ID,
                amount,
                expiration,
                U256::from(fee),
            )
        };
        assert_eq!(receive(1), receive(1));
        assert_ne!(receive(1), receive(2));
        assert_ne!(receive(1), approve);
    }

    #[test]
    fn test_validity_window() {
        let (after, before) = validity_window(UnixTimestamp::from_secs(100_000));
        assert_eq!(after.as_secs(), 100_000 - 3_600);
        assert_eq!(before.as_secs(), 100_000 + 86_400);
    }

    #[tokio::test]
    async fn test_receive_with_full_signature() {
        let request = request(Token::erc20(ChainId::base(), USDC_BASE.address));
        let auth = build_deposit_authorization(&request, &AuthorizationConfig::default(), &signer())
            .await
            .unwrap();
        assert_eq!(auth.method, AuthorizationMethod::ReceiveWithAuthorization);
        assert_eq!(auth.selector(), "0x88b7ab63");

        let call = IDepositAuthorization::receiveWithAuthorization_1Call::abi_decode_raw(&auth.authorization).unwrap();
        assert_eq!(call.from, request.sender);
        assert_eq!(call.to, ESCROW);
        assert_eq!(call.value, request.total_amount);
        assert_eq!(call.validAfter, U256::from(1_800_000_000u64 - 3_600));
        assert_eq!(call.nonce, auth.nonce);
        assert_eq!(call.signature.len(), 65);

        let statement = ReceiveWithAuthorization {
            from: call.from,
            to: call.to,
            value: call.value,
            validAfter: call.validAfter,
            validBefore: call.validBefore,
            nonce: call.nonce,
        };
        let hash = statement.eip712_signing_hash(&USDC_BASE.eip712_domain());
        let signature = Signature::from_raw(&call.signature).unwrap();
        assert_eq!(signature.recover_address_from_prehash(&hash).unwrap(), request.sender);
    }

    #[tokio::test]
    async fn test_approve_with_split_signature() {
        let request = request(Token::erc20(ChainId::polygon(), USDC_BRIDGED_POLYGON.address));
        let auth = build_deposit_authorization(&request, &AuthorizationConfig::default(), &signer())
            .await
            .unwrap();
        assert_eq!(auth.method, AuthorizationMethod::ApproveWithAuthorization);

        let call = IDepositAuthorization::approveWithAuthorizationCall::abi_decode_raw(&auth.authorization).unwrap();
        assert!(call.v == 27 || call.v == 28);
        let statement = ApproveWithAuthorization {
            owner: call.owner,
            spender: call.spender,
            value: call.value,
            validAfter: call.validAfter,
            validBefore: call.validBefore,
            nonce: call.nonce,
        };
        let hash = statement.eip712_signing_hash(&USDC_BRIDGED_POLYGON.eip712_domain());
        let signature = Signature::from_scalars_and_parity(call.r, call.s, call.v == 28);
        assert_eq!(signature.recover_address_from_prehash(&hash).unwrap(), request.sender);
    }

    #[tokio::test]
    async fn test_override_and_errors() {
        let request = request(Token::erc20(ChainId::base(), USDC_BASE.address));
        let config = AuthorizationConfig {
            domain: None,
            method: Some(AuthorizationMethod::ReceiveWithAuthorizationEoa),
        };
        let auth = build_deposit_authorization(&request, &config, &signer()).await.unwrap();
        assert_eq!(auth.selector(), "0xef55bec6");
        assert!(IDepositAuthorization::receiveWithAuthorization_0Call::abi_decode_raw(&auth.authorization).is_ok());

        let unknown = Token::erc20(ChainId::base(), address!("0x1111111111111111111111111111111111111111"));
        let mut unknown_request = request.clone();
        unknown_request.token = unknown;
        assert!(matches!(
            build_deposit_authorization(&unknown_request, &AuthorizationConfig::default(), &signer()).await,
            Err(AuthorizationError::UnknownDomain { .. })
        ));

        let mut native_request = request;
        native_request.token = Token::native(ChainId::base());
        assert!(matches!(
            build_deposit_authorization(&native_request, &AuthorizationConfig::default(), &signer()).await,
            Err(AuthorizationError::NotErc20(TokenType::Native))
        ));
    }
}
