//! Deployed Linkdrop escrow contracts and deposit calldata.
//!
//! Escrow addresses are grouped by contract version. The version is the `version`
//! field of the escrow's EIP-712 domain, so recovered links must resolve it by
//! reverse lookup from the escrow address.

use alloy_primitives::{Address, Bytes, U256, address};
use alloy_sol_types::{SolCall, sol};
use linkdrop_types::chain::ChainId;
use linkdrop_types::claim_link::ClaimLinkFee;
use linkdrop_types::networks::KnownNetwork;
use linkdrop_types::timestamp::UnixTimestamp;
use linkdrop_types::token::{Token, TokenKind, TokenType};

/// Escrow deployments by EIP-712 domain version.
pub static ESCROW_VERSIONS: &[(&str, &[Address])] = &[
    ("1", &[address!("0x0522dd6e9f2beca1cd15a5fd275dc279a1a08eac")]),
    (
        "2",
        &[
            address!("0xad27383460183fd7e21b71df3b4cac9480eb9a75"),
            address!("0x0B79cC1E78C47fF08cA6f355e8aCD32AEa5bFe58"),
            address!("0xc4eb6e5933bc5e32dfd5c80baf143212a95549b3"),
        ],
    ),
    (
        "3",
        &[
            address!("0x0b962bbbf101941d0d0ec1041d01668dac36647a"),
            address!("0x2d5dfe0e4582c905233df527242616017f36e192"),
            address!("0x021ccef76804c43da62b01652d41bcf6f6394731"),
        ],
    ),
    (
        "3.1",
        &[
            address!("0x88d51990a3b962f975846f3688e36d2a1fc611f1"),
            address!("0x648b9a6c54890a8fb17de128c6352f621154f358"),
            address!("0x7143f68e689e8540a8eec26b482e1d4ac2e28794"),
            address!("0xe07fa88a10a915b7339aff050db82c0030bf6861"),
            address!("0x4366caf3963d147da4a4287061354058d871d1be"),
            address!("0x317d2501396fe75d997799bf3bdbc7cc6768b533"),
            address!("0x59548f7e4ef381df57a3e5dacbf2ab65111404d6"),
            address!("0xedfea6336c922f896c7e09ba282beb0cb4476675"),
            address!("0xff3471dfdc6f82694e5ad4d4e7ffedf23e1e38e0"),
            address!("0x139b79602b68e8198ea3d57f5e6311fd98262269"),
            address!("0xe0cec4f0b66257fc6b13652c303237de0fd92ed8"),
        ],
    ),
    (
        "3.2",
        &[
            address!("0x5badb0143f69015c5c86cbd9373474a9c8ab713b"),
            address!("0x3c74782de03c0402d207fe41307fe50fe9b6b5c7"),
            address!("0xbe7b40eb3a9d85d3a76142cb637ab824f0d35ead"),
            address!("0x5fc1316119a1b7cec52a2984c62764343dca70c9"),
        ],
    ),
];

pub const DEFAULT_ESCROW_ADDRESS: Address = address!("0xbe7b40eb3a9d85d3a76142cb637ab824f0d35ead");
pub const DEFAULT_ESCROW_NFT_ADDRESS: Address =
    address!("0x5fc1316119a1b7cec52a2984c62764343dca70c9");
pub const COINBASE_WALLET_ESCROW_ADDRESS: Address =
    address!("0x5badb0143f69015c5c86cbd9373474a9c8ab713b");
pub const COINBASE_WALLET_ESCROW_NFT_ADDRESS: Address =
    address!("0x3c74782de03c0402d207fe41307fe50fe9b6b5c7");

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EscrowLookupError {
    #[error("Address {0} is not a known escrow contract")]
    UnknownEscrow(Address),
    #[error("No escrow is deployed on chain {0}")]
    UnsupportedChain(ChainId),
}

/// EIP-712 domain version of a deployed escrow.
pub fn escrow_version(escrow: Address) -> Result<&'static str, EscrowLookupError> {
    ESCROW_VERSIONS
        .iter()
        .find(|(_, addresses)| addresses.contains(&escrow))
        .map(|(version, _)| *version)
        .ok_or(EscrowLookupError::UnknownEscrow(escrow))
}

/// Current `(escrow, nft_escrow)` pair for a chain.
pub fn escrow_addresses_for_chain(chain_id: ChainId) -> Result<(Address, Address), EscrowLookupError> {
    if chain_id == ChainId::base() {
        Ok((COINBASE_WALLET_ESCROW_ADDRESS, COINBASE_WALLET_ESCROW_NFT_ADDRESS))
    } else if [
        ChainId::polygon(),
        ChainId::avalanche(),
        ChainId::optimism(),
        ChainId::arbitrum(),
    ]
    .contains(&chain_id)
    {
        Ok((DEFAULT_ESCROW_ADDRESS, DEFAULT_ESCROW_NFT_ADDRESS))
    } else {
        Err(EscrowLookupError::UnsupportedChain(chain_id))
    }
}

/// Escrow that accepts `token`: NFTs go to the NFT escrow.
pub fn escrow_address_for_token(token: &Token) -> Result<Address, EscrowLookupError> {
    let (escrow, escrow_nft) = escrow_addresses_for_chain(token.chain_id)?;
    Ok(if token.is_nft() { escrow_nft } else { escrow })
}

sol! {
    /// Deposit entry points of the Linkdrop escrow for fungible tokens.
    #[allow(missing_docs)]
    #[derive(Debug)]
    interface ILinkdropEscrow {
        function depositETH(
            address transferId,
            uint128 amount,
            uint128 expiration,
            uint128 feeAmount,
            bytes feeAuthorization,
            bytes encryptedSenderMessage
        ) external payable;

        function deposit(
            address token,
            address transferId,
            uint128 amount,
            uint128 expiration,
            address feeToken,
            uint128 feeAmount,
            bytes feeAuthorization,
            bytes encryptedSenderMessage
        ) external;
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DepositCallError {
    #[error("On-chain deposit of {0} tokens is not supported, register the deposit with the escrow API")]
    UnsupportedToken(TokenType),
    #[error("{0} does not fit into uint128")]
    Overflow(&'static str),
}

fn to_u128(value: U256, field: &'static str) -> Result<u128, DepositCallError> {
    u128::try_from(value).map_err(|_| DepositCallError::Overflow(field))
}

/// ABI-encoded escrow call for a native or ERC20 deposit of `total_amount`.
pub fn deposit_calldata(
    token: &Token,
    transfer_id: Address,
    total_amount: U256,
    expiration: UnixTimestamp,
    fee: &ClaimLinkFee,
    encrypted_message: Bytes,
) -> Result<Bytes, DepositCallError> {
    let amount = to_u128(total_amount, "amount")?;
    let expiration = u128::from(expiration.as_secs());
    let fee_amount = to_u128(fee.amount, "fee amount")?;
    let data = match token.kind {
        TokenKind::Native => ILinkdropEscrow::depositETHCall {
            transferId: transfer_id,
            amount,
            expiration,
            feeAmount: fee_amount,
            feeAuthorization: fee.authorization.clone(),
            encryptedSenderMessage: encrypted_message,
        }
        .abi_encode(),
        TokenKind::Erc20 { address } => ILinkdropEscrow::depositCall {
            token: address,
            transferId: transfer_id,
            amount,
            expiration,
            feeToken: fee.token.address(),
            feeAmount: fee_amount,
            feeAuthorization: fee.authorization.clone(),
            encryptedSenderMessage: encrypted_message,
        }
        .abi_encode(),
        TokenKind::Erc721 { .. } | TokenKind::Erc1155 { .. } => {
            return Err(DepositCallError::UnsupportedToken(token.token_type()));
        }
    };
    Ok(Bytes::from(data))
}

/// Native value attached to the deposit transaction.
///
/// Native deposits send the full total. Token deposits send nothing when the fee is
/// paid in the same token, otherwise they send the fee in the native coin.
pub fn deposit_value(token: &Token, fee: &ClaimLinkFee, total_amount: U256) -> U256 {
    if token.is_native() {
        total_amount
    } else if fee.token.address() == token.address() {
        U256::ZERO
    } else {
        fee.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolCall;

    const USDC_BASE: Address = address!("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913");

    #[test]
    fn test_escrow_version_lookup() {
        assert_eq!(escrow_version(DEFAULT_ESCROW_ADDRESS), Ok("3.2"));
        assert_eq!(
            escrow_version(address!("0x0522dd6e9f2beca1cd15a5fd275dc279a1a08eac")),
            Ok("1")
        );
        assert_eq!(
            escrow_version(address!("0xe0cec4f0b66257fc6b13652c303237de0fd92ed8")),
            Ok("3.1")
        );
        assert_eq!(
            escrow_version(Address::ZERO),
            Err(EscrowLookupError::UnknownEscrow(Address::ZERO))
        );
    }

    #[test]
    fn test_escrow_for_token() {
        let usdc = Token::erc20(ChainId::base(), USDC_BASE);
        assert_eq!(escrow_address_for_token(&usdc), Ok(COINBASE_WALLET_ESCROW_ADDRESS));
        let nft = Token::erc721(ChainId::polygon(), USDC_BASE, U256::from(1));
        assert_eq!(escrow_address_for_token(&nft), Ok(DEFAULT_ESCROW_NFT_ADDRESS));
        let unsupported = Token::native(ChainId::new(1));
        assert_eq!(
            escrow_address_for_token(&unsupported),
            Err(EscrowLookupError::UnsupportedChain(ChainId::new(1)))
        );
    }

    #[test]
    fn test_deposit_value() {
        let base = ChainId::base();
        let native = Token::native(base);
        let usdc = Token::erc20(base, USDC_BASE);
        let total = U256::from(1_010u64);
        let native_fee = ClaimLinkFee::new(base, Address::ZERO, U256::from(10), Bytes::new());
        let usdc_fee = ClaimLinkFee::new(base, USDC_BASE, U256::from(10), Bytes::new());

        assert_eq!(deposit_value(&native, &native_fee, total), total);
        assert_eq!(deposit_value(&usdc, &usdc_fee, total), U256::ZERO);
        assert_eq!(deposit_value(&usdc, &native_fee, total), U256::from(10));
    }

    #[test]
    fn test_deposit_calldata_native() {
        let base = ChainId::base();
        let fee = ClaimLinkFee::new(base, Address::ZERO, U256::from(10), Bytes::from(vec![1, 2]));
        let transfer_id = address!("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        let data = deposit_calldata(
            &Token::native(base),
            transfer_id,
            U256::from(1_000_000_010u64),
            UnixTimestamp::from_secs(1_900_000_000),
            &fee,
            Bytes::new(),
        )
        .unwrap();
        assert_eq!(&data[..4], ILinkdropEscrow::depositETHCall::SELECTOR.as_slice());
        let decoded = ILinkdropEscrow::depositETHCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.transferId, transfer_id);
        assert_eq!(decoded.amount, 1_000_000_010u128);
        assert_eq!(decoded.feeAuthorization, Bytes::from(vec![1, 2]));
    }

    #[test]
    fn test_deposit_calldata_rejects_nft_and_overflow() {
        let base = ChainId::base();
        let fee = ClaimLinkFee::new(base, Address::ZERO, U256::ZERO, Bytes::new());
        let nft = Token::erc1155(base, USDC_BASE, U256::from(3));
        assert_eq!(
            deposit_calldata(&nft, Address::ZERO, U256::from(1), UnixTimestamp::from_secs(1), &fee, Bytes::new()),
            Err(DepositCallError::UnsupportedToken(TokenType::Erc1155))
        );
        assert_eq!(
            deposit_calldata(
                &Token::native(base),
                Address::ZERO,
                U256::MAX,
                UnixTimestamp::from_secs(1),
                &fee,
                Bytes::new()
            ),
            Err(DepositCallError::Overflow("amount"))
        );
    }
}
