//! Recovered links.
//!
//! When the original link key is gone, the sender re-authorizes redemption for a fresh
//! key by signing `Transfer{linkKeyId, transferId}` under the escrow's EIP-712 domain.
//! The new link carries that signature and the old transfer id explicitly.

use alloy_dyn_abi::TypedData;
use alloy_primitives::Address;
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain, sol};
use linkdrop_types::chain::ChainId;
use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityError, RandomSource, TypedDataSigner};
use crate::escrow::{EscrowLookupError, escrow_version};
use crate::key::{KeyError, LinkKey};
use crate::link::{CLAIM_LINK_VERSION, DecodedLink};
use crate::signature::{parse_signature, to_rsv_bytes};

#[cfg(feature = "telemetry")]
use tracing::instrument;

const ESCROW_DOMAIN_NAME: &str = "LinkdropEscrow";

sol!(
    /// Sender statement that `linkKeyId` may redeem `transferId`.
    #[derive(Serialize, Deserialize)]
    struct Transfer {
        address linkKeyId;
        address transferId;
    }
);

#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error(transparent)]
    Escrow(#[from] EscrowLookupError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

pub fn recovery_domain(chain_id: ChainId, escrow_version: &str, escrow: Address) -> Eip712Domain {
    eip712_domain! {
        name: ESCROW_DOMAIN_NAME,
        version: escrow_version.to_string(),
        chain_id: chain_id.inner(),
        verifying_contract: escrow,
    }
}

/// Typed data for the recovery statement. The escrow version is looked up from `escrow`.
pub fn recovery_typed_data(
    link_key_id: Address,
    transfer_id: Address,
    chain_id: ChainId,
    escrow: Address,
) -> Result<TypedData, EscrowLookupError> {
    let version = escrow_version(escrow)?;
    let statement = Transfer {
        linkKeyId: link_key_id,
        transferId: transfer_id,
    };
    Ok(TypedData::from_struct(
        &statement,
        Some(recovery_domain(chain_id, version, escrow)),
    ))
}

/// Issues a recovered link for `transfer_id`: a fresh link key plus the sender's
/// signature binding that key to the transfer.
#[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
    transfer_id = %transfer_id,
    chain_id = %chain_id,
    escrow = %escrow
)))]
pub async fn recover_link<R, S>(
    transfer_id: Address,
    chain_id: ChainId,
    escrow: Address,
    rng: &R,
    signer: &S,
) -> Result<DecodedLink, RecoveryError>
where
    R: RandomSource + ?Sized,
    S: TypedDataSigner + ?Sized,
{
    let link_key = LinkKey::generate(rng)?;
    let typed_data = recovery_typed_data(link_key.address(), transfer_id, chain_id, escrow)?;
    let signature = parse_signature(&signer.sign_typed_data(&typed_data).await?)?;
    Ok(DecodedLink {
        link_key,
        transfer_id,
        chain_id,
        version: CLAIM_LINK_VERSION.to_string(),
        sender_signature: Some(to_rsv_bytes(&signature)),
        message_key: None,
    })
}

/// Address that signed the recovery statement of `link`, given the escrow it targets.
pub fn recover_sender(link: &DecodedLink, escrow: Address) -> Result<Option<Address>, RecoveryError> {
    let Some(signature) = &link.sender_signature else {
        return Ok(None);
    };
    let version = escrow_version(escrow)?;
    let statement = Transfer {
        linkKeyId: link.link_key.address(),
        transferId: link.transfer_id,
    };
    let hash = statement.eip712_signing_hash(&recovery_domain(link.chain_id, version, escrow));
    let sender = parse_signature(signature)?
        .recover_address_from_prehash(&hash)
        .map_err(|e| CapabilityError::MalformedSignature(e.to_string()))?;
    Ok(Some(sender))
}
