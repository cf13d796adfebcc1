//! Claim URL codec.
//!
//! A claim URL has the shape
//! `<base>/#/code?k=<key>&sg=<sig>&i=<transfer id>&c=<chain>&v=<version>&sgl=<sig len>&src=p2p&m=<hex>`.
//! Binary fields are Base58; `m` is `0x`-prefixed hex. Only `k` and `c` are required.

use alloy_primitives::{Address, B256, Bytes, hex};
use linkdrop_types::chain::ChainId;
use linkdrop_types::networks::KnownNetwork;
use std::borrow::Cow;
use std::collections::HashMap;
use std::str::FromStr;

use crate::key::{KeyError, LinkKey};
use crate::signature::SIGNATURE_LENGTH;

/// Version written into newly generated claim URLs.
pub const CLAIM_LINK_VERSION: &str = "3";
/// Version assumed for links that carry no `v` parameter.
pub const LEGACY_CLAIM_LINK_VERSION: &str = "1";
/// Signature length assumed for links that carry no `sgl` parameter.
pub const DEFAULT_SIGNATURE_LENGTH: usize = SIGNATURE_LENGTH;

const ADDRESS_LENGTH: usize = 20;
const P2P_SOURCE: &str = "p2p";
const DASHBOARD_SOURCE: &str = "d";
const REDEEM_PATH: &str = "/redeem/";

#[derive(Debug, thiserror::Error)]
pub enum LinkDecodeError {
    #[error("Claim URL has no `{0}` parameter")]
    MissingParameter(&'static str),
    #[error("Parameter `{param}` is not valid Base58: {source}")]
    InvalidBase58 {
        param: &'static str,
        #[source]
        source: bs58::decode::Error,
    },
    #[error("Invalid link key: {0}")]
    InvalidLinkKey(#[source] KeyError),
    #[error("Invalid chain id `{0}`")]
    InvalidChainId(String),
    #[error("Chain {0} is not supported")]
    UnsupportedChain(ChainId),
    #[error("Invalid signature length `{0}`")]
    InvalidSignatureLength(String),
    #[error("Signature is {actual} bytes but `sgl` says {expected}")]
    SignatureTooLong { expected: usize, actual: usize },
    #[error("Transfer id is {0} bytes, expected at most 20")]
    InvalidTransferId(usize),
    #[error("Invalid message key parameter `{0}`")]
    InvalidMessageKey(String),
    #[error("Unknown link source `{0}`")]
    UnknownSource(String),
}

/// Everything a claim URL carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLink {
    pub link_key: LinkKey,
    pub transfer_id: Address,
    pub chain_id: ChainId,
    pub version: String,
    /// Present only on recovered links.
    pub sender_signature: Option<Bytes>,
    /// Initial message key, present when the link lets the receiver read the note.
    pub message_key: Option<B256>,
}

impl DecodedLink {
    /// A fresh, non-recovered link whose transfer id is the link key's address.
    pub fn new(link_key: LinkKey, chain_id: ChainId) -> Self {
        Self {
            transfer_id: link_key.address(),
            link_key,
            chain_id,
            version: CLAIM_LINK_VERSION.to_string(),
            sender_signature: None,
            message_key: None,
        }
    }

    pub fn is_recovered(&self) -> bool {
        self.sender_signature.is_some()
    }
}

/// Encodes `link` under `base_url`.
///
/// `i` is written only when the transfer id is not the link key's own address, `sgl`
/// only alongside `sg`, and `m` only for a non-zero message key.
pub fn encode_link(base_url: &str, link: &DecodedLink) -> String {
    let mut url = format!(
        "{}/#/code?k={}",
        base_url.trim_end_matches('/'),
        bs58::encode(link.link_key.to_bytes()).into_string()
    );
    if let Some(signature) = &link.sender_signature {
        url.push_str("&sg=");
        url.push_str(&bs58::encode(signature).into_string());
    }
    if link.transfer_id != link.link_key.address() {
        url.push_str("&i=");
        url.push_str(&bs58::encode(link.transfer_id).into_string());
    }
    url.push_str(&format!("&c={}&v={}", link.chain_id, link.version));
    if let Some(signature) = &link.sender_signature {
        url.push_str(&format!("&sgl={}", signature.len()));
    }
    url.push_str("&src=");
    url.push_str(P2P_SOURCE);
    if let Some(key) = link.message_key.filter(|key| !key.is_zero()) {
        url.push_str("&m=");
        url.push_str(&hex::encode_prefixed(key));
    }
    url
}

/// Query parameters of a claim URL, whether they sit in the query or behind a `#/` route.
fn query_params(url: &str) -> HashMap<String, String> {
    let query = match url.split_once('?') {
        Some((_, rest)) => rest.split('#').next().unwrap_or_default(),
        None => "",
    };
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn base58(param: &'static str, value: &str) -> Result<Vec<u8>, LinkDecodeError> {
    bs58::decode(value)
        .into_vec()
        .map_err(|source| LinkDecodeError::InvalidBase58 { param, source })
}

fn left_pad(bytes: &[u8], len: usize) -> Cow<'_, [u8]> {
    if bytes.len() >= len {
        return Cow::Borrowed(bytes);
    }
    let mut padded = vec![0u8; len];
    padded[len - bytes.len()..].copy_from_slice(bytes);
    Cow::Owned(padded)
}

fn parse_chain_id(value: &str) -> Result<ChainId, LinkDecodeError> {
    ChainId::from_str(value).map_err(|_| LinkDecodeError::InvalidChainId(value.to_string()))
}

fn parse_message_key(value: &str) -> Result<B256, LinkDecodeError> {
    let invalid = || LinkDecodeError::InvalidMessageKey(value.to_string());
    let bytes = hex::decode(value).map_err(|_| invalid())?;
    B256::try_from(bytes.as_slice()).map_err(|_| invalid())
}

/// Decodes a claim URL.
///
/// Missing `v` means version `1`, missing `sgl` means 65; an `sgl` outside `1..=65`
/// is rejected. Signatures shorter than `sgl` after Base58 decoding are left-padded
/// with zeros; longer ones are rejected.
pub fn decode_link(url: &str) -> Result<DecodedLink, LinkDecodeError> {
    let params = query_params(url);

    let key_bytes = base58("k", non_empty(&params, "k").ok_or(LinkDecodeError::MissingParameter("k"))?)?;
    let link_key = LinkKey::from_slice(&key_bytes).map_err(LinkDecodeError::InvalidLinkKey)?;

    let chain_id = parse_chain_id(non_empty(&params, "c").ok_or(LinkDecodeError::MissingParameter("c"))?)?;

    let version = non_empty(&params, "v")
        .unwrap_or(LEGACY_CLAIM_LINK_VERSION)
        .to_string();

    let signature_length = match non_empty(&params, "sgl") {
        Some(sgl) => sgl
            .parse::<usize>()
            .ok()
            .filter(|len| (1..=SIGNATURE_LENGTH).contains(len))
            .ok_or_else(|| LinkDecodeError::InvalidSignatureLength(sgl.to_string()))?,
        None => DEFAULT_SIGNATURE_LENGTH,
    };
    let sender_signature = match non_empty(&params, "sg") {
        Some(sg) => {
            let raw = base58("sg", sg)?;
            if raw.len() > signature_length {
                return Err(LinkDecodeError::SignatureTooLong {
                    expected: signature_length,
                    actual: raw.len(),
                });
            }
            Some(Bytes::copy_from_slice(&left_pad(&raw, signature_length)))
        }
        None => None,
    };

    let transfer_id = match non_empty(&params, "i") {
        Some(i) => {
            let raw = base58("i", i)?;
            if raw.len() > ADDRESS_LENGTH {
                return Err(LinkDecodeError::InvalidTransferId(raw.len()));
            }
            Address::from_slice(&left_pad(&raw, ADDRESS_LENGTH))
        }
        None => link_key.address(),
    };

    let message_key = non_empty(&params, "m")
        .map(parse_message_key)
        .transpose()?
        .filter(|key| !key.is_zero());

    Ok(DecodedLink {
        link_key,
        transfer_id,
        chain_id,
        version,
        sender_signature,
        message_key,
    })
}

/// Who issued a claim URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// Peer-to-peer links generated by this SDK.
    P2p,
    /// Links issued by the Linkdrop dashboard.
    Dashboard,
}

pub fn link_source(url: &str) -> Result<LinkSource, LinkDecodeError> {
    if url.contains(REDEEM_PATH) {
        return Ok(LinkSource::Dashboard);
    }
    match non_empty(&query_params(url), "src") {
        None | Some(P2P_SOURCE) => Ok(LinkSource::P2p),
        Some(DASHBOARD_SOURCE) => Ok(LinkSource::Dashboard),
        Some(other) => Err(LinkDecodeError::UnknownSource(other.to_string())),
    }
}

/// The `v` parameter of a claim URL, without decoding the rest.
pub fn version_from_claim_url(url: &str) -> Result<String, LinkDecodeError> {
    non_empty(&query_params(url), "v")
        .map(str::to_string)
        .ok_or(LinkDecodeError::MissingParameter("v"))
}

/// A dashboard claim link: an opaque claim code plus the chain it lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardLink {
    pub claim_code: String,
    pub chain_id: ChainId,
}

/// Parses a dashboard link. The claim code is the last `/redeem/` path segment or the
/// `k` parameter; the chain defaults to Polygon when `c` is missing or not a number.
pub fn parse_dashboard_link(url: &str) -> Result<DashboardLink, LinkDecodeError> {
    let params = query_params(url);
    let claim_code = if url.contains(REDEEM_PATH) {
        url.split('?')
            .next()
            .and_then(|path| path.trim_end_matches('/').rsplit('/').next())
            .filter(|code| !code.is_empty())
            .map(str::to_string)
    } else {
        non_empty(&params, "k").map(str::to_string)
    }
    .ok_or(LinkDecodeError::MissingParameter("k"))?;

    let chain_id = non_empty(&params, "c")
        .and_then(|c| ChainId::from_str(c).ok())
        .unwrap_or_else(ChainId::polygon);
    if !chain_id.is_supported() {
        return Err(LinkDecodeError::UnsupportedChain(chain_id));
    }
    Ok(DashboardLink {
        claim_code,
        chain_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    const BASE_URL: &str = "https://p2p.linkdrop.io";

    fn key(byte: u8) -> LinkKey {
        LinkKey::from_seed(&[byte; 32]).unwrap()
    }

    #[test]
    fn test_encode_plain_link() {
        let link = DecodedLink::new(key(7), ChainId::base());
        let url = encode_link(BASE_URL, &link);
        assert!(url.starts_with("https://p2p.linkdrop.io/#/code?k="));
        assert!(url.contains("&c=8453&v=3"));
        assert!(url.ends_with("&src=p2p"));
        assert!(!url.contains("&i="));
        assert!(!url.contains("&sgl="));
        assert_eq!(decode_link(&url).unwrap(), link);
    }

    #[test]
    fn test_recovered_link_round_trip() {
        let mut signature = vec![0u8; 65];
        signature[1..].copy_from_slice(&[0xab; 64]);
        let link = DecodedLink {
            link_key: key(9),
            transfer_id: address!("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"),
            chain_id: ChainId::polygon(),
            version: CLAIM_LINK_VERSION.to_string(),
            sender_signature: Some(Bytes::from(signature)),
            message_key: Some(b256!(
                "0x1111111111111111111111111111111111111111111111111111111111111111"
            )),
        };
        let url = encode_link(&format!("{BASE_URL}/"), &link);
        assert!(url.contains("&sgl=65&src=p2p&m=0x1111"));
        assert!(!url.contains("//#"));
        assert_eq!(decode_link(&url).unwrap(), link);
    }

    #[test]
    fn test_zero_message_key_is_omitted() {
        let mut link = DecodedLink::new(key(3), ChainId::base());
        link.message_key = Some(B256::ZERO);
        let url = encode_link(BASE_URL, &link);
        assert!(!url.contains("&m="));
        assert_eq!(decode_link(&url).unwrap().message_key, None);
    }

    #[test]
    fn test_decode_defaults_for_legacy_links() {
        let link_key = key(5);
        let short_signature = [0x42u8; 63];
        let url = format!(
            "{BASE_URL}/#/code?k={}&sg={}&c=137",
            bs58::encode(link_key.to_bytes()).into_string(),
            bs58::encode(short_signature).into_string()
        );
        let decoded = decode_link(&url).unwrap();
        assert_eq!(decoded.version, "1");
        assert_eq!(decoded.transfer_id, link_key.address());
        let signature = decoded.sender_signature.unwrap();
        assert_eq!(signature.len(), 65);
        assert_eq!(&signature[..2], &[0, 0]);
        assert_eq!(&signature[2..], &short_signature[..]);
    }

    #[test]
    fn test_decode_left_pads_short_link_key() {
        let mut seed = [0x21u8; 32];
        seed[0] = 0;
        let link_key = LinkKey::from_seed(&seed).unwrap();
        let url = format!(
            "{BASE_URL}/#/code?k={}&c=8453&v=3",
            bs58::encode(&seed[1..]).into_string()
        );
        assert_eq!(decode_link(&url).unwrap().link_key, link_key);
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        let k = bs58::encode([1u8; 32]).into_string();
        assert!(matches!(
            decode_link(&format!("{BASE_URL}/#/code?k={k}&c=base")),
            Err(LinkDecodeError::InvalidChainId(_))
        ));
        assert!(matches!(
            decode_link(&format!("{BASE_URL}/#/code?k={k}")),
            Err(LinkDecodeError::MissingParameter("c"))
        ));
        assert!(matches!(
            decode_link(&format!("{BASE_URL}/#/code?k=0OIl&c=1")),
            Err(LinkDecodeError::InvalidBase58 { param: "k", .. })
        ));
        let zero_key = bs58::encode([0u8; 32]).into_string();
        assert!(matches!(
            decode_link(&format!("{BASE_URL}/#/code?k={zero_key}&c=1")),
            Err(LinkDecodeError::InvalidLinkKey(KeyError::InvalidSeed))
        ));
        let sg = bs58::encode([7u8; 65]).into_string();
        assert!(matches!(
            decode_link(&format!("{BASE_URL}/#/code?k={k}&sg={sg}&sgl=64&c=1")),
            Err(LinkDecodeError::SignatureTooLong {
                expected: 64,
                actual: 65
            })
        ));
        for sgl in ["0", "66", "10000000000", "18446744073709551615", "-1"] {
            assert!(matches!(
                decode_link(&format!("{BASE_URL}/#/code?k={k}&sg={sg}&sgl={sgl}&c=1")),
                Err(LinkDecodeError::InvalidSignatureLength(value)) if value == sgl
            ));
        }
        assert!(matches!(
            decode_link(&format!("{BASE_URL}/#/code?k={k}&c=1&m=0x1234")),
            Err(LinkDecodeError::InvalidMessageKey(_))
        ));
    }

    #[test]
    fn test_decode_message_key_without_prefix() {
        let k = bs58::encode([1u8; 32]).into_string();
        let m = "22".repeat(32);
        let decoded = decode_link(&format!("{BASE_URL}/#/code?k={k}&c=10&v=3&m={m}")).unwrap();
        assert_eq!(decoded.message_key, Some(B256::repeat_byte(0x22)));
    }

    #[test]
    fn test_link_source() {
        assert_eq!(
            link_source("https://a.io/#/code?k=x&src=p2p").unwrap(),
            LinkSource::P2p
        );
        assert_eq!(link_source("https://a.io/#/code?k=x").unwrap(), LinkSource::P2p);
        assert_eq!(
            link_source("https://a.io/#/code?k=x&src=d").unwrap(),
            LinkSource::Dashboard
        );
        assert_eq!(
            link_source("https://claim.linkdrop.io/redeem/abc123?src=d").unwrap(),
            LinkSource::Dashboard
        );
        assert!(matches!(
            link_source("https://a.io/#/code?src=other"),
            Err(LinkDecodeError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_version_from_claim_url() {
        assert_eq!(version_from_claim_url("https://a.io/#/code?k=x&v=3").unwrap(), "3");
        assert!(matches!(
            version_from_claim_url("https://a.io/#/code?k=x"),
            Err(LinkDecodeError::MissingParameter("v"))
        ));
    }

    #[test]
    fn test_parse_dashboard_link() {
        let link = parse_dashboard_link("https://claim.linkdrop.io/redeem/abc123?src=d&c=8453").unwrap();
        assert_eq!(link.claim_code, "abc123");
        assert_eq!(link.chain_id, ChainId::base());

        let link = parse_dashboard_link("https://claim.linkdrop.io/#/code?k=xyz&src=d").unwrap();
        assert_eq!(link.claim_code, "xyz");
        assert_eq!(link.chain_id, ChainId::polygon());

        assert!(matches!(
            parse_dashboard_link("https://claim.linkdrop.io/redeem/abc?c=1"),
            Err(LinkDecodeError::UnsupportedChain(_))
        ));
    }
}
