#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for Linkdrop claim links.
//!
//! This crate is chain-cryptography free. It provides:
//!
//! - [`chain`] and [`networks`] - numeric EIP-155 chain ids and the networks the escrow serves
//! - [`token`] - the tagged [`Token`](token::Token) model (native, ERC20, ERC721, ERC1155)
//! - [`claim_link`] - lifecycle status, operations, fees and deposit parameters
//! - [`api`] - escrow API request/response shapes and the [`EscrowApi`](api::EscrowApi) trait
//! - [`timestamp`] and [`decimal`] - wire helpers for times and big integers

pub mod api;
pub mod chain;
pub mod claim_link;
pub mod decimal;
pub mod networks;
pub mod timestamp;
pub mod token;
