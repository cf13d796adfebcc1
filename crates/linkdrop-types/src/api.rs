//! Typed request and response shapes of the Linkdrop escrow API, and the
//! [`EscrowApi`] trait the SDK consumes.
//!
//! The trait is transport-agnostic. `linkdrop-sdk` ships a `reqwest` implementation;
//! tests substitute in-memory fakes.
//!
//! All requests are keyed by chain: every implementation must route a request to the
//! API host for `token.chain_id` (see [`ChainId::network_name`]).

use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::chain::ChainId;
use crate::claim_link::{ClaimLinkFee, ClaimLinkFeeData, ClaimLinkOperation, ClaimLinkStatus, TransactionType};
use crate::timestamp::UnixTimestamp;
use crate::token::{Token, TokenType, TokenValidationError};

#[derive(Debug, thiserror::Error)]
pub enum EscrowApiError {
    #[error("Chain {0} has no escrow API host")]
    UnsupportedChain(ChainId),
    #[error("Escrow API rejected the request: {0}")]
    Rejected(String),
    #[error("Escrow API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Escrow API request failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Malformed escrow API response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<TokenValidationError> for EscrowApiError {
    fn from(value: TokenValidationError) -> Self {
        EscrowApiError::MalformedResponse(value.to_string())
    }
}

/// The `{ success, error }` envelope every escrow API response carries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiStatus {
    /// Turns an explicit `success: false` into [`EscrowApiError::Rejected`].
    pub fn into_result(self) -> Result<(), EscrowApiError> {
        match self.success {
            Some(false) => {
                let message = self.error.unwrap_or_else(|| "unknown error".to_string());
                #[cfg(feature = "telemetry")]
                tracing::debug!(error = %message, "escrow API rejected request");
                Err(EscrowApiError::Rejected(message))
            }
            _ => Ok(()),
        }
    }
}

/// Body of `/redeem` and `/redeem-recovered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedeemRequest {
    #[serde(skip)]
    pub chain_id: ChainId,
    pub transfer_id: Address,
    pub token: Address,
    pub sender: Address,
    pub receiver: Address,
    pub escrow: Address,
    pub receiver_sig: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_sig: Option<Bytes>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedeemResponse {
    pub tx_hash: B256,
}

/// Query of `/fee`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeQuery {
    pub token: Token,
    pub sender: Address,
    pub transfer_id: Address,
    pub expiration: UnixTimestamp,
    pub amount: U256,
}

impl FeeQuery {
    /// Query-string pairs in the order the API documents them. Fungible tokens send id `0`.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("amount", self.amount.to_string()),
            ("token_address", self.token.address().to_checksum(None)),
            ("sender", self.sender.to_checksum(None)),
            ("token_type", self.token.token_type().to_string()),
            ("transfer_id", self.transfer_id.to_checksum(None)),
            ("expiration", self.expiration.to_string()),
            ("token_id", self.token.id().unwrap_or_default().to_string()),
        ]
    }
}

/// Response of `/fee`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeQuote {
    /// Echo of the requested amount. Older API versions omit it.
    #[serde(default, with = "crate::decimal::option")]
    pub amount: Option<U256>,
    #[serde(with = "crate::decimal")]
    pub total_amount: U256,
    #[serde(default, with = "crate::decimal::option")]
    pub max_transfer_amount: Option<U256>,
    #[serde(default, with = "crate::decimal::option")]
    pub min_transfer_amount: Option<U256>,
    #[serde(default)]
    pub fee_token: Address,
    #[serde(with = "crate::decimal")]
    pub fee_amount: U256,
    #[serde(default)]
    pub fee_authorization: Bytes,
}

impl FeeQuote {
    /// Folds the quote into fee data for `amount` on `chain_id`.
    ///
    /// Missing limits are treated as unbounded: min `0`, max `U256::MAX`.
    pub fn into_fee_data(self, chain_id: ChainId, amount: U256) -> ClaimLinkFeeData {
        ClaimLinkFeeData {
            amount: self.amount.unwrap_or(amount),
            total_amount: self.total_amount,
            max_transfer_amount: self.max_transfer_amount.unwrap_or(U256::MAX),
            min_transfer_amount: self.min_transfer_amount.unwrap_or(U256::ZERO),
            fee: ClaimLinkFee::new(
                chain_id,
                self.fee_token,
                self.fee_amount,
                self.fee_authorization,
            ),
        }
    }
}

/// Body of `/deposit`, `/deposit-erc721` and `/deposit-erc1155`, chosen by `token_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositRequest {
    #[serde(skip)]
    pub chain_id: ChainId,
    pub sender: Address,
    pub escrow: Address,
    pub transfer_id: Address,
    pub token: Address,
    pub token_type: TokenType,
    #[serde(with = "crate::decimal::option", skip_serializing_if = "Option::is_none")]
    pub token_id: Option<U256>,
    #[serde(with = "crate::decimal")]
    pub expiration: UnixTimestamp,
    pub tx_hash: B256,
    pub transaction_type: TransactionType,
    pub fee_authorization: Bytes,
    #[serde(with = "crate::decimal")]
    pub amount: U256,
    #[serde(with = "crate::decimal")]
    pub fee_amount: U256,
    #[serde(with = "crate::decimal")]
    pub total_amount: U256,
    pub fee_token: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_sender_message: Option<Bytes>,
}

/// Body of `/deposit-with-authorization`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositWithAuthorizationRequest {
    #[serde(skip)]
    pub chain_id: ChainId,
    pub sender: Address,
    pub escrow: Address,
    pub transfer_id: Address,
    pub token: Address,
    pub token_type: TokenType,
    #[serde(with = "crate::decimal")]
    pub expiration: UnixTimestamp,
    #[serde(with = "crate::decimal")]
    pub amount: U256,
    pub authorization: Bytes,
    /// Four-byte selector of the token method the relayer must call, `0x`-hex.
    pub authorization_selector: String,
    #[serde(with = "crate::decimal")]
    pub fee_amount: U256,
    #[serde(with = "crate::decimal")]
    pub total_amount: U256,
    pub fee_authorization: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_sender_message: Option<Bytes>,
}

/// A transfer as the escrow API reports it from `/payment-status/...`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRecord {
    pub transfer_id: Address,
    pub chain_id: ChainId,
    pub status: ClaimLinkStatus,
    pub sender: Address,
    pub token: Address,
    pub token_type: TokenType,
    #[serde(default, with = "crate::decimal::option")]
    pub token_id: Option<U256>,
    #[serde(with = "crate::decimal")]
    pub amount: U256,
    #[serde(default, with = "crate::decimal::option")]
    pub total_amount: Option<U256>,
    #[serde(default, with = "crate::decimal::option")]
    pub fee_amount: Option<U256>,
    #[serde(default)]
    pub fee_token: Address,
    pub escrow: Address,
    pub expiration: UnixTimestamp,
    #[serde(default)]
    pub operations: Vec<ClaimLinkOperation>,
    /// Raw encrypted sender note, as posted with the deposit.
    #[serde(default)]
    pub encrypted_sender_message: Option<Bytes>,
}

impl TransferRecord {
    pub fn token(&self) -> Result<Token, TokenValidationError> {
        Token::from_parts(self.chain_id, self.token_type, self.token, self.token_id)
    }

    pub fn fee(&self) -> ClaimLinkFee {
        ClaimLinkFee::new(
            self.chain_id,
            self.fee_token,
            self.fee_amount.unwrap_or_default(),
            Bytes::new(),
        )
    }
}

/// Response of the `/payment-status/...` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferStatusResponse {
    pub claim_link: TransferRecord,
}

/// Query of `/payment-status/sender/{sender}/get-sender-history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub token: Token,
    pub sender: Address,
    pub only_active: bool,
    pub offset: u64,
    pub limit: u64,
}

impl HistoryQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("only_active", self.only_active.to_string()),
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
            ("token_address", self.token.address().to_checksum(None)),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ResultSet {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SenderHistory {
    #[serde(rename = "claim_links", alias = "claimLinks", default)]
    pub claim_links: Vec<TransferRecord>,
    #[serde(rename = "result_set", alias = "resultSet", default)]
    pub result_set: ResultSet,
}

/// Response of `/limits`. USD values are informational decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLimits {
    #[serde(rename = "min_transfer_amount", with = "crate::decimal")]
    pub min_amount: U256,
    #[serde(rename = "max_transfer_amount", with = "crate::decimal")]
    pub max_amount: U256,
    #[serde(rename = "min_transfer_amount_usd", default)]
    pub min_amount_usd: Option<String>,
    #[serde(rename = "max_transfer_amount_usd", default)]
    pub max_amount_usd: Option<String>,
}

/// The escrow service as seen by the SDK.
///
/// Implementations surface service errors verbatim and never retry.
#[async_trait::async_trait]
pub trait EscrowApi: Send + Sync {
    async fn redeem_link(&self, request: &RedeemRequest) -> Result<RedeemResponse, EscrowApiError>;

    async fn redeem_recovered_link(
        &self,
        request: &RedeemRequest,
    ) -> Result<RedeemResponse, EscrowApiError>;

    async fn get_transfer_status(
        &self,
        chain_id: ChainId,
        transfer_id: Address,
    ) -> Result<TransferRecord, EscrowApiError>;

    async fn get_transfer_status_by_tx_hash(
        &self,
        chain_id: ChainId,
        tx_hash: B256,
    ) -> Result<TransferRecord, EscrowApiError>;

    async fn get_fee(&self, query: &FeeQuery) -> Result<FeeQuote, EscrowApiError>;

    async fn deposit(&self, request: &DepositRequest) -> Result<(), EscrowApiError>;

    async fn deposit_with_authorization(
        &self,
        request: &DepositWithAuthorizationRequest,
    ) -> Result<(), EscrowApiError>;

    async fn get_sender_history(&self, query: &HistoryQuery)
    -> Result<SenderHistory, EscrowApiError>;

    async fn get_limits(&self, token: &Token) -> Result<TransferLimits, EscrowApiError>;
}

#[async_trait::async_trait]
impl<T: EscrowApi + ?Sized> EscrowApi for std::sync::Arc<T> {
    async fn redeem_link(&self, request: &RedeemRequest) -> Result<RedeemResponse, EscrowApiError> {
        (**self).redeem_link(request).await
    }

    async fn redeem_recovered_link(
        &self,
        request: &RedeemRequest,
    ) -> Result<RedeemResponse, EscrowApiError> {
        (**self).redeem_recovered_link(request).await
    }

    async fn get_transfer_status(
        &self,
        chain_id: ChainId,
        transfer_id: Address,
    ) -> Result<TransferRecord, EscrowApiError> {
        (**self).get_transfer_status(chain_id, transfer_id).await
    }

    async fn get_transfer_status_by_tx_hash(
        &self,
        chain_id: ChainId,
        tx_hash: B256,
    ) -> Result<TransferRecord, EscrowApiError> {
        (**self).get_transfer_status_by_tx_hash(chain_id, tx_hash).await
    }

    async fn get_fee(&self, query: &FeeQuery) -> Result<FeeQuote, EscrowApiError> {
        (**self).get_fee(query).await
    }

    async fn deposit(&self, request: &DepositRequest) -> Result<(), EscrowApiError> {
        (**self).deposit(request).await
    }

    async fn deposit_with_authorization(
        &self,
        request: &DepositWithAuthorizationRequest,
    ) -> Result<(), EscrowApiError> {
        (**self).deposit_with_authorization(request).await
    }

    async fn get_sender_history(
        &self,
        query: &HistoryQuery,
    ) -> Result<SenderHistory, EscrowApiError> {
        (**self).get_sender_history(query).await
    }

    async fn get_limits(&self, token: &Token) -> Result<TransferLimits, EscrowApiError> {
        (**self).get_limits(token).await
    }
}
