#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Claim link lifecycle on top of the Linkdrop escrow.
//!
//! [`LinkdropSdk`] is the entry point. It creates [`ClaimLink`]s, restores them from
//! claim URLs and issues [`ClaimLinkRecovered`] links for transfers whose key is lost.
//! Randomness, signing and transaction broadcasting are injected by the caller through
//! the traits re-exported from [`linkdrop_eip155::capability`].
//!
//! # Feature Flags
//!
//! - `telemetry` - `tracing` spans on every escrow API call and lifecycle events on
//!   state transitions. Link keys, message keys and plaintext are never recorded.
//!
//! # Example
//!
//! ```no_run
//! use alloy_primitives::{Address, U256};
//! use linkdrop_sdk::{ClaimLinkParams, LinkdropSdk, SdkConfig};
//! use linkdrop_sdk::capability::OsRandom;
//! use linkdrop_types::chain::ChainId;
//! use linkdrop_types::networks::KnownNetwork;
//! use linkdrop_types::timestamp::UnixTimestamp;
//! use linkdrop_types::token::Token;
//!
//! # async fn run(sender: Address) -> Result<(), linkdrop_sdk::ClaimLinkError> {
//! let sdk = LinkdropSdk::http(SdkConfig::production("https://p2p.linkdrop.io"))?;
//! let params = ClaimLinkParams {
//!     token: Token::native(ChainId::base()),
//!     amount: U256::from(1_000_000_000u64),
//!     sender,
//!     expiration: UnixTimestamp::now() + 86_400,
//!     escrow_address: None,
//! };
//! let mut link = sdk.claim_link(params, &OsRandom).await?;
//! let url = link.generate_claim_url(None)?;
//! # let _ = url;
//! # Ok(())
//! # }
//! ```

pub mod claim_link;
pub mod claim_link_recovered;
pub mod config;
pub mod error;
pub mod http;
pub mod sdk;

pub use claim_link::{ClaimLink, ClaimLinkParams, decrypt_message_with_link_key};
pub use claim_link_recovered::{ClaimLinkRecovered, RecoveredLinkParams};
pub use config::{MessageConfig, SdkConfig};
pub use error::{ClaimLinkError, ErrorKind};
pub use http::HttpEscrowApi;
pub use linkdrop_eip155::capability;
pub use sdk::LinkdropSdk;
