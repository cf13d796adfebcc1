//! Assets that can be deposited behind a claim link.
//!
//! A token is a chain plus a [`TokenKind`]. The kind is a tagged variant, so an ERC20
//! with a token id or a native coin with a contract address cannot be constructed.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chain::ChainId;

/// Token standard, as spelled by the escrow API (`NATIVE`, `ERC20`, `ERC721`, `ERC1155`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum TokenType {
    #[serde(rename = "NATIVE")]
    Native,
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "ERC721")]
    Erc721,
    #[serde(rename = "ERC1155")]
    Erc1155,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Native => "NATIVE",
            TokenType::Erc20 => "ERC20",
            TokenType::Erc721 => "ERC721",
            TokenType::Erc1155 => "ERC1155",
        }
    }

    pub fn is_nft(&self) -> bool {
        matches!(self, TokenType::Erc721 | TokenType::Erc1155)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = TokenValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NATIVE" => Ok(TokenType::Native),
            "ERC20" => Ok(TokenType::Erc20),
            "ERC721" => Ok(TokenType::Erc721),
            "ERC1155" => Ok(TokenType::Erc1155),
            other => Err(TokenValidationError::UnknownTokenType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Native,
    Erc20 { address: Address },
    Erc721 { address: Address, id: U256 },
    Erc1155 { address: Address, id: U256 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub chain_id: ChainId,
    pub kind: TokenKind,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("Token chain {0} is not supported")]
    UnsupportedChain(ChainId),
    #[error("Token contract address is not provided")]
    MissingAddress,
    #[error("Native token should not have an address, got {0}")]
    NativeWithAddress(Address),
    #[error("Token id is not provided for {0} token")]
    MissingTokenId(TokenType),
    #[error("Token id is not supported for {0} token")]
    UnexpectedTokenId(TokenType),
    #[error("Unknown token type {0}")]
    UnknownTokenType(String),
}

impl Token {
    pub fn native(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            kind: TokenKind::Native,
        }
    }

    pub fn erc20(chain_id: ChainId, address: Address) -> Self {
        Self {
            chain_id,
            kind: TokenKind::Erc20 { address },
        }
    }

    pub fn erc721(chain_id: ChainId, address: Address, id: U256) -> Self {
        Self {
            chain_id,
            kind: TokenKind::Erc721 { address, id },
        }
    }

    pub fn erc1155(chain_id: ChainId, address: Address, id: U256) -> Self {
        Self {
            chain_id,
            kind: TokenKind::Erc1155 { address, id },
        }
    }

    /// Rebuilds a token from the flat `(type, address, id)` triple used by the escrow API.
    ///
    /// The API always sends a `token_id`, `"0"` for fungible tokens, so a zero id is
    /// accepted for native and ERC20 tokens and ignored.
    pub fn from_parts(
        chain_id: ChainId,
        token_type: TokenType,
        address: Address,
        id: Option<U256>,
    ) -> Result<Self, TokenValidationError> {
        let fungible_id_is_set = id.is_some_and(|id| !id.is_zero());
        let token = match token_type {
            TokenType::Native => {
                if !address.is_zero() {
                    return Err(TokenValidationError::NativeWithAddress(address));
                }
                if fungible_id_is_set {
                    return Err(TokenValidationError::UnexpectedTokenId(token_type));
                }
                Token::native(chain_id)
            }
            TokenType::Erc20 => {
                if fungible_id_is_set {
                    return Err(TokenValidationError::UnexpectedTokenId(token_type));
                }
                Token::erc20(chain_id, address)
            }
            TokenType::Erc721 => {
                let id = id.ok_or(TokenValidationError::MissingTokenId(token_type))?;
                Token::erc721(chain_id, address, id)
            }
            TokenType::Erc1155 => {
                let id = id.ok_or(TokenValidationError::MissingTokenId(token_type))?;
                Token::erc1155(chain_id, address, id)
            }
        };
        Ok(token)
    }

    pub fn token_type(&self) -> TokenType {
        match self.kind {
            TokenKind::Native => TokenType::Native,
            TokenKind::Erc20 { .. } => TokenType::Erc20,
            TokenKind::Erc721 { .. } => TokenType::Erc721,
            TokenKind::Erc1155 { .. } => TokenType::Erc1155,
        }
    }

    /// Contract address, or the zero address for the native coin.
    pub fn address(&self) -> Address {
        match self.kind {
            TokenKind::Native => Address::ZERO,
            TokenKind::Erc20 { address }
            | TokenKind::Erc721 { address, .. }
            | TokenKind::Erc1155 { address, .. } => address,
        }
    }

    pub fn id(&self) -> Option<U256> {
        match self.kind {
            TokenKind::Erc721 { id, .. } | TokenKind::Erc1155 { id, .. } => Some(id),
            TokenKind::Native | TokenKind::Erc20 { .. } => None,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self.kind, TokenKind::Native)
    }

    pub fn is_nft(&self) -> bool {
        self.token_type().is_nft()
    }

    pub fn validate(&self) -> Result<(), TokenValidationError> {
        if !self.chain_id.is_supported() {
            return Err(TokenValidationError::UnsupportedChain(self.chain_id));
        }
        if !self.is_native() && self.address().is_zero() {
            return Err(TokenValidationError::MissingAddress);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::KnownNetwork;
    use alloy_primitives::address;

    const USDC_BASE: Address = address!("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913");

    #[test]
    fn test_token_accessors() {
        let nft = Token::erc721(ChainId::base(), USDC_BASE, U256::from(7));
        assert_eq!(nft.token_type(), TokenType::Erc721);
        assert_eq!(nft.id(), Some(U256::from(7)));
        assert!(nft.is_nft());

        let native = Token::native(ChainId::base());
        assert_eq!(native.address(), Address::ZERO);
        assert_eq!(native.id(), None);
    }

    #[test]
    fn test_token_validate() {
        assert!(Token::native(ChainId::polygon()).validate().is_ok());
        assert_eq!(
            Token::erc20(ChainId::base(), Address::ZERO).validate(),
            Err(TokenValidationError::MissingAddress)
        );
        assert_eq!(
            Token::native(ChainId::new(1)).validate(),
            Err(TokenValidationError::UnsupportedChain(ChainId::new(1)))
        );
    }

    #[test]
    fn test_token_from_parts() {
        let erc20 =
            Token::from_parts(ChainId::base(), TokenType::Erc20, USDC_BASE, Some(U256::ZERO))
                .unwrap();
        assert_eq!(erc20, Token::erc20(ChainId::base(), USDC_BASE));

        let bad = Token::from_parts(ChainId::base(), TokenType::Erc20, USDC_BASE, Some(U256::from(1)));
        assert_eq!(bad, Err(TokenValidationError::UnexpectedTokenId(TokenType::Erc20)));

        let bad = Token::from_parts(ChainId::base(), TokenType::Native, USDC_BASE, None);
        assert_eq!(bad, Err(TokenValidationError::NativeWithAddress(USDC_BASE)));

        let bad = Token::from_parts(ChainId::base(), TokenType::Erc1155, USDC_BASE, None);
        assert_eq!(bad, Err(TokenValidationError::MissingTokenId(TokenType::Erc1155)));
    }

    #[test]
    fn test_token_type_wire_names() {
        assert_eq!(serde_json::to_string(&TokenType::Erc1155).unwrap(), "\"ERC1155\"");
        assert_eq!("NATIVE".parse::<TokenType>().unwrap(), TokenType::Native);
        assert!("erc20".parse::<TokenType>().is_err());
    }
}
