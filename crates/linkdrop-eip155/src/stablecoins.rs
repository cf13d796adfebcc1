//! Stablecoins that accept gas-less deposits through EIP-3009 style authorizations.

use alloy_primitives::{Address, B256, U256, address, b256};
use alloy_sol_types::Eip712Domain;
use linkdrop_types::chain::ChainId;
use linkdrop_types::networks::KnownNetwork;
use std::borrow::Cow;

use crate::authorization::AuthorizationMethod;

/// A token deployment together with the EIP-712 domain its authorizations are signed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StablecoinDeployment {
    pub chain_id: ChainId,
    pub address: Address,
    pub name: &'static str,
    pub version: &'static str,
    /// Polygon PoS bridged tokens use a salt in place of the chain id.
    pub salt: Option<B256>,
    pub method: AuthorizationMethod,
}

impl StablecoinDeployment {
    const fn new(
        chain_id: u64,
        address: Address,
        name: &'static str,
        version: &'static str,
        method: AuthorizationMethod,
    ) -> Self {
        Self {
            chain_id: ChainId::new(chain_id),
            address,
            name,
            version,
            salt: None,
            method,
        }
    }

    pub fn eip712_domain(&self) -> Eip712Domain {
        let chain_id = match self.salt {
            Some(_) => None,
            None => Some(U256::from(self.chain_id.inner())),
        };
        Eip712Domain::new(
            Some(Cow::Borrowed(self.name)),
            Some(Cow::Borrowed(self.version)),
            chain_id,
            Some(self.address),
            self.salt,
        )
    }
}

const USD_COIN: &str = "USD Coin";

pub static USDC_BASE: StablecoinDeployment = StablecoinDeployment::new(
    8453,
    address!("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
    USD_COIN,
    "2",
    AuthorizationMethod::ReceiveWithAuthorization,
);

pub static EURC_BASE: StablecoinDeployment = StablecoinDeployment::new(
    8453,
    address!("0x60a3e35cc302bfa44cb288bc5a4f316fdb1adb42"),
    "EURC",
    "2",
    AuthorizationMethod::ReceiveWithAuthorization,
);

pub static CBBTC_BASE: StablecoinDeployment = StablecoinDeployment::new(
    8453,
    address!("0xcbb7c0000ab88b473b1f5afd9ef808440eed33bf"),
    "Coinbase Wrapped BTC",
    "2",
    AuthorizationMethod::ReceiveWithAuthorizationEoa,
);

pub static USDC_POLYGON: StablecoinDeployment = StablecoinDeployment::new(
    137,
    address!("0x3c499c542cef5e3811e1192ce70d8cc03d5c3359"),
    USD_COIN,
    "2",
    AuthorizationMethod::ReceiveWithAuthorization,
);

pub static USDC_BRIDGED_POLYGON: StablecoinDeployment = StablecoinDeployment {
    chain_id: ChainId::new(137),
    address: address!("0x2791bca1f2de4661ed88a30c99a7a9449aa84174"),
    name: "USD Coin (PoS)",
    version: "1",
    salt: Some(b256!(
        "0x0000000000000000000000000000000000000000000000000000000000000089"
    )),
    method: AuthorizationMethod::ApproveWithAuthorization,
};

pub static USDC_ARBITRUM: StablecoinDeployment = StablecoinDeployment::new(
    42161,
    address!("0xaf88d065e77c8cc2239327c5edb3a432268e5831"),
    USD_COIN,
    "2",
    AuthorizationMethod::ReceiveWithAuthorization,
);

pub static USDC_OPTIMISM: StablecoinDeployment = StablecoinDeployment::new(
    10,
    address!("0x0b2c639c533813f4aa9d7837caf62653d097ff85"),
    USD_COIN,
    "2",
    AuthorizationMethod::ReceiveWithAuthorization,
);

pub static USDC_AVALANCHE: StablecoinDeployment = StablecoinDeployment::new(
    43114,
    address!("0xb97ef9ef8734c71904d8002f8b6bc66dd9c48a6e"),
    USD_COIN,
    "2",
    AuthorizationMethod::ReceiveWithAuthorizationEoa,
);

pub static STABLECOINS: &[&StablecoinDeployment] = &[
    &USDC_BASE,
    &EURC_BASE,
    &CBBTC_BASE,
    &USDC_POLYGON,
    &USDC_BRIDGED_POLYGON,
    &USDC_ARBITRUM,
    &USDC_OPTIMISM,
    &USDC_AVALANCHE,
];

pub fn find_stablecoin(chain_id: ChainId, address: Address) -> Option<&'static StablecoinDeployment> {
    STABLECOINS
        .iter()
        .find(|s| s.chain_id == chain_id && s.address == address)
        .copied()
}

/// Native Circle USDC per network.
#[derive(Debug, Clone, Copy)]
pub struct USDC;

impl KnownNetwork<StablecoinDeployment> for USDC {
    fn base() -> StablecoinDeployment {
        USDC_BASE
    }

    fn polygon() -> StablecoinDeployment {
        USDC_POLYGON
    }

    fn arbitrum() -> StablecoinDeployment {
        USDC_ARBITRUM
    }

    fn optimism() -> StablecoinDeployment {
        USDC_OPTIMISM
    }

    fn avalanche() -> StablecoinDeployment {
        USDC_AVALANCHE
    }
}
