//! Lifecycle vocabulary shared by the SDK and the escrow API: statuses, operations,
//! fees, and the on-chain deposit transaction shape.

use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chain::ChainId;
use crate::token::Token;

/// Claim link lifecycle status.
///
/// Variants are declared in lifecycle order so that `status >= ClaimLinkStatus::Deposited`
/// reads as "funds have reached the escrow". Refunding, Refunded, Cancelled and Error
/// are terminal off-path states and order after every happy-path state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimLinkStatus {
    Created,
    Depositing,
    Deposited,
    Redeeming,
    Redeemed,
    Refunding,
    Refunded,
    Cancelled,
    Error,
}

impl ClaimLinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimLinkStatus::Created => "created",
            ClaimLinkStatus::Depositing => "depositing",
            ClaimLinkStatus::Deposited => "deposited",
            ClaimLinkStatus::Redeeming => "redeeming",
            ClaimLinkStatus::Redeemed => "redeemed",
            ClaimLinkStatus::Refunding => "refunding",
            ClaimLinkStatus::Refunded => "refunded",
            ClaimLinkStatus::Cancelled => "cancelled",
            ClaimLinkStatus::Error => "error",
        }
    }

    /// Amount and message are frozen once the deposit has landed.
    pub fn is_mutable(&self) -> bool {
        *self < ClaimLinkStatus::Deposited
    }
}

impl fmt::Display for ClaimLinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown claim link status {0:?}")]
pub struct ClaimLinkStatusFormatError(String);

impl FromStr for ClaimLinkStatus {
    type Err = ClaimLinkStatusFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "created" => ClaimLinkStatus::Created,
            "depositing" => ClaimLinkStatus::Depositing,
            "deposited" => ClaimLinkStatus::Deposited,
            "redeeming" => ClaimLinkStatus::Redeeming,
            "redeemed" => ClaimLinkStatus::Redeemed,
            "refunding" => ClaimLinkStatus::Refunding,
            "refunded" => ClaimLinkStatus::Refunded,
            "cancelled" => ClaimLinkStatus::Cancelled,
            "error" => ClaimLinkStatus::Error,
            other => return Err(ClaimLinkStatusFormatError(other.to_string())),
        };
        Ok(status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Completed,
    Error,
}

/// A single escrow-side operation (deposit, redeem, refund) recorded against a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimLinkOperation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub status: OperationStatus,
    #[serde(default)]
    pub receiver: Option<Address>,
    #[serde(default, rename = "txHash", alias = "tx_hash")]
    pub tx_hash: Option<B256>,
}

/// Fee charged by the escrow for a transfer, plus the oracle's signed authorization
/// permitting the escrow to collect it. Re-quote whenever the amount changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimLinkFee {
    /// Native coin or an ERC20.
    pub token: Token,
    pub amount: U256,
    pub authorization: Bytes,
}

impl ClaimLinkFee {
    /// Fee tokens arrive as a bare address: zero means the native coin.
    pub fn new(chain_id: ChainId, fee_token: Address, amount: U256, authorization: Bytes) -> Self {
        let token = if fee_token.is_zero() {
            Token::native(chain_id)
        } else {
            Token::erc20(chain_id, fee_token)
        };
        Self {
            token,
            amount,
            authorization,
        }
    }
}

/// A fee quote bracketed by the transferable amount limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimLinkFeeData {
    pub amount: U256,
    pub total_amount: U256,
    pub max_transfer_amount: U256,
    pub min_transfer_amount: U256,
    pub fee: ClaimLinkFee,
}

/// Everything a broadcaster needs to submit a deposit to the escrow contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositParams {
    pub chain_id: ChainId,
    pub to: Address,
    #[serde(with = "crate::decimal")]
    pub value: U256,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "tx")]
    Tx,
    #[serde(rename = "userOp")]
    UserOp,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Tx => "tx",
            TransactionType::UserOp => "userOp",
        }
    }
}

/// A broadcast deposit: a plain transaction hash or an ERC-4337 user operation hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: B256,
    #[serde(rename = "type")]
    pub kind: TransactionType,
}
