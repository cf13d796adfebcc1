//! Recovered claim links: a known transfer whose original link key is gone.

use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, B256, Bytes};
use linkdrop_eip155::capability::{RandomSource, TypedDataSigner};
use linkdrop_eip155::key::LinkKey;
use linkdrop_eip155::link::{CLAIM_LINK_VERSION, DecodedLink, encode_link};
use linkdrop_eip155::message::InitialKey;
use linkdrop_eip155::receiver::sign_receiver;
use linkdrop_eip155::recovery::{recover_link, recovery_typed_data};
use linkdrop_eip155::signature::parse_signature;
use linkdrop_types::api::{EscrowApi, RedeemRequest};
use linkdrop_types::token::Token;
use std::sync::Arc;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::config::SdkConfig;
use crate::error::{ClaimLinkError, StateError, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredLinkParams {
    pub transfer_id: Address,
    pub token: Token,
    pub sender: Address,
    /// Escrow holding the deposit. Resolved from the SDK config when absent.
    pub escrow_address: Option<Address>,
}

pub struct ClaimLinkRecovered {
    api: Arc<dyn EscrowApi>,
    config: Arc<SdkConfig>,
    transfer_id: Address,
    sender: Address,
    token: Token,
    escrow: Address,
    message_key: Option<InitialKey>,
    link_key: Option<LinkKey>,
    sender_signature: Option<Bytes>,
    claim_url: Option<String>,
}

impl ClaimLinkRecovered {
    pub(crate) fn new(
        api: Arc<dyn EscrowApi>,
        config: Arc<SdkConfig>,
        params: RecoveredLinkParams,
        escrow: Address,
    ) -> Result<Self, ClaimLinkError> {
        params.token.validate()?;
        Ok(Self {
            api,
            config,
            transfer_id: params.transfer_id,
            sender: params.sender,
            token: params.token,
            escrow,
            message_key: None,
            link_key: None,
            sender_signature: None,
            claim_url: None,
        })
    }

    pub fn transfer_id(&self) -> Address {
        self.transfer_id
    }

    pub fn escrow(&self) -> Address {
        self.escrow
    }

    pub fn link_key(&self) -> Option<&LinkKey> {
        self.link_key.as_ref()
    }

    pub fn sender_signature(&self) -> Option<&Bytes> {
        self.sender_signature.as_ref()
    }

    pub fn claim_url(&self) -> Option<&str> {
        self.claim_url.as_deref()
    }

    /// Carries a known message key into the URLs generated from now on.
    pub fn with_message_key(mut self, message_key: InitialKey) -> Self {
        self.message_key = Some(message_key);
        self
    }

    /// Statement the sender signs to let `link_key_id` redeem this transfer.
    pub fn typed_data(&self, link_key_id: Address) -> Result<TypedData, ClaimLinkError> {
        Ok(recovery_typed_data(
            link_key_id,
            self.transfer_id,
            self.token.chain_id,
            self.escrow,
        )?)
    }

    /// Draws a fresh link key, has the sender sign for it and encodes the URL.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %self.transfer_id)))]
    pub async fn generate_claim_url<R, S>(&mut self, rng: &R, signer: &S) -> Result<String, ClaimLinkError>
    where
        R: RandomSource + ?Sized,
        S: TypedDataSigner + ?Sized,
    {
        let link = recover_link(self.transfer_id, self.token.chain_id, self.escrow, rng, signer).await?;
        let signature = link
            .sender_signature
            .clone()
            .ok_or(StateError::MissingSenderSignature)?;
        self.claim_url_with(link.link_key, signature)
    }

    /// Encodes the URL for a link key and a sender signature obtained elsewhere,
    /// e.g. from a wallet that signed [`typed_data`](Self::typed_data) out of band.
    pub fn claim_url_with(&mut self, link_key: LinkKey, sender_signature: Bytes) -> Result<String, ClaimLinkError> {
        parse_signature(&sender_signature)?;
        let link = DecodedLink {
            link_key: link_key.clone(),
            transfer_id: self.transfer_id,
            chain_id: self.token.chain_id,
            version: CLAIM_LINK_VERSION.to_string(),
            sender_signature: Some(sender_signature.clone()),
            message_key: self.message_key.map(|key| key.as_b256()),
        };
        let url = encode_link(&self.config.base_url, &link);
        self.link_key = Some(link_key);
        self.sender_signature = Some(sender_signature);
        self.claim_url = Some(url.clone());
        Ok(url)
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %self.transfer_id, receiver = %receiver)))]
    pub async fn redeem(&self, receiver: Address) -> Result<B256, ClaimLinkError> {
        if receiver.is_zero() {
            return Err(ValidationError::ZeroReceiver.into());
        }
        let link_key = self.link_key.as_ref().ok_or(StateError::MissingLinkKey("redeem"))?;
        let sender_signature = self
            .sender_signature
            .clone()
            .ok_or(StateError::MissingSenderSignature)?;
        let request = RedeemRequest {
            chain_id: self.token.chain_id,
            transfer_id: self.transfer_id,
            token: self.token.address(),
            sender: self.sender,
            receiver,
            escrow: self.escrow,
            receiver_sig: sign_receiver(link_key, receiver)?,
            sender_sig: Some(sender_signature),
        };
        let response = self.api.redeem_recovered_link(&request).await?;
        Ok(response.tx_hash)
    }
}
