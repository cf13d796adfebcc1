#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EVM cryptography for Linkdrop claim links.
//!
//! Every operation here is a pure function of its inputs plus the injected
//! [`capability`] traits: randomness, typed-data signing and transaction broadcasting.
//!
//! - [`key`] - link keys and the transfer ids derived from them
//! - [`link`] - the claim URL codec
//! - [`receiver`] - receiver signatures presented on redeem
//! - [`recovery`] - recovered links re-authorized by the sender
//! - [`message`] - sender note encryption
//! - [`authorization`] and [`stablecoins`] - gas-less deposit authorizations
//! - [`escrow`] - escrow deployments and deposit calldata

pub mod authorization;
pub mod capability;
pub mod escrow;
pub mod key;
pub mod link;
pub mod message;
pub mod receiver;
pub mod recovery;
pub mod signature;
pub mod stablecoins;

pub use capability::{OsRandom, RandomSource, TransactionSender, TypedDataSigner};
pub use key::LinkKey;
pub use link::{DecodedLink, decode_link, encode_link};
