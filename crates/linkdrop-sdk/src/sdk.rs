//! The SDK facade: creates claim links, restores them from URLs and answers
//! escrow-wide queries.

use alloy_primitives::{Address, U256};
use linkdrop_eip155::capability::RandomSource;
use linkdrop_eip155::escrow::{
    DEFAULT_ESCROW_ADDRESS, DEFAULT_ESCROW_NFT_ADDRESS, escrow_address_for_token, escrow_version,
};
use linkdrop_eip155::key::LinkKey;
use linkdrop_eip155::link::{LinkSource, decode_link, link_source, version_from_claim_url};
use linkdrop_eip155::message::EncryptedMessage;
use linkdrop_eip155::recovery::recover_sender;
use linkdrop_types::api::{
    EscrowApi, EscrowApiError, FeeQuery, HistoryQuery, SenderHistory, TransferLimits,
};
use linkdrop_types::claim_link::ClaimLinkFee;
use linkdrop_types::timestamp::UnixTimestamp;
use linkdrop_types::token::Token;
use std::sync::Arc;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::claim_link::{ClaimLink, ClaimLinkParams, ClaimLinkState};
use crate::claim_link_recovered::{ClaimLinkRecovered, RecoveredLinkParams};
use crate::config::SdkConfig;
use crate::error::{ClaimLinkError, CryptoError, ValidationError};
use crate::http::HttpEscrowApi;

#[derive(Clone)]
pub struct LinkdropSdk {
    config: Arc<SdkConfig>,
    api: Arc<dyn EscrowApi>,
}

impl LinkdropSdk {
    pub fn new(config: SdkConfig, api: Arc<dyn EscrowApi>) -> Result<Self, ClaimLinkError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            api,
        })
    }

    /// SDK talking to the escrow API over HTTP.
    pub fn http(config: SdkConfig) -> Result<Self, ClaimLinkError> {
        let api = HttpEscrowApi::new(&config)?;
        Self::new(config, Arc::new(api))
    }

    /// [`http`](Self::http) with [`SdkConfig::from_env`].
    pub fn from_env() -> Result<Self, ClaimLinkError> {
        Self::http(SdkConfig::from_env()?)
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.config.environment
    }

    pub fn api(&self) -> &Arc<dyn EscrowApi> {
        &self.api
    }

    /// Escrow that new links for `token` deposit into.
    ///
    /// A configured escrow pair other than the default one is used as is. With the
    /// default pair, the chain's current deployment decides.
    pub fn escrow_address_for_token(&self, token: &Token) -> Result<Address, ClaimLinkError> {
        let (configured, default) = if token.is_nft() {
            (self.config.escrow_nft_address, DEFAULT_ESCROW_NFT_ADDRESS)
        } else {
            (self.config.escrow_address, DEFAULT_ESCROW_ADDRESS)
        };
        if configured != default {
            return Ok(configured);
        }
        Ok(escrow_address_for_token(token)?)
    }

    fn resolve_escrow(&self, token: &Token, explicit: Option<Address>) -> Result<Address, ClaimLinkError> {
        match explicit {
            Some(escrow) => Ok(escrow),
            None => self.escrow_address_for_token(token),
        }
    }

    /// New claim link under a fresh link key drawn from `rng`.
    pub async fn claim_link<R>(&self, params: ClaimLinkParams, rng: &R) -> Result<ClaimLink, ClaimLinkError>
    where
        R: RandomSource + ?Sized,
    {
        let link_key = LinkKey::generate(rng)?;
        self.claim_link_with_link_key(params, link_key).await
    }

    pub async fn claim_link_with_link_key(
        &self,
        params: ClaimLinkParams,
        link_key: LinkKey,
    ) -> Result<ClaimLink, ClaimLinkError> {
        let transfer_id = link_key.address();
        let escrow = self.resolve_escrow(&params.token, params.escrow_address)?;
        ClaimLink::create(
            self.api.clone(),
            self.config.clone(),
            params,
            escrow,
            Some(link_key),
            transfer_id,
        )
        .await
    }

    /// Claim link known only by its transfer id. Without a link key it cannot
    /// produce a claim URL or redeem, but it can deposit and issue recovered URLs.
    pub async fn claim_link_with_transfer_id(
        &self,
        params: ClaimLinkParams,
        transfer_id: Address,
    ) -> Result<ClaimLink, ClaimLinkError> {
        let escrow = self.resolve_escrow(&params.token, params.escrow_address)?;
        ClaimLink::create(
            self.api.clone(),
            self.config.clone(),
            params,
            escrow,
            None,
            transfer_id,
        )
        .await
    }

    pub fn claim_link_recovered(&self, params: RecoveredLinkParams) -> Result<ClaimLinkRecovered, ClaimLinkError> {
        let escrow = self.resolve_escrow(&params.token, params.escrow_address)?;
        ClaimLinkRecovered::new(self.api.clone(), self.config.clone(), params, escrow)
    }

    /// Decodes `claim_url` and rebuilds the link from the escrow API's record.
    ///
    /// A recovered link must carry a signature by the transfer's sender; anything else
    /// is rejected as a forgery. Recovered links on an escrow outside the known
    /// deployments cannot be verified and fail with
    /// [`CryptoError::UnverifiableSignature`].
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err))]
    pub async fn get_claim_link(&self, claim_url: &str) -> Result<ClaimLink, ClaimLinkError> {
        if link_source(claim_url)? == LinkSource::Dashboard {
            return Err(ValidationError::DashboardLink.into());
        }
        let link = decode_link(claim_url)?;
        let record = self
            .api
            .get_transfer_status(link.chain_id, link.transfer_id)
            .await?;
        if record.transfer_id != link.transfer_id {
            return Err(EscrowApiError::MalformedResponse(format!(
                "requested transfer {}, got {}",
                link.transfer_id, record.transfer_id
            ))
            .into());
        }
        if link.is_recovered() && escrow_version(record.escrow).is_err() {
            return Err(CryptoError::UnverifiableSignature(record.escrow).into());
        }
        if let Some(signer) = recover_sender(&link, record.escrow)? {
            if signer != record.sender {
                return Err(CryptoError::Signature(format!(
                    "signed by {signer}, transfer sender is {}",
                    record.sender
                ))
                .into());
            }
        }

        let message = match &record.encrypted_sender_message {
            Some(bytes) if !bytes.is_empty() => Some(EncryptedMessage::from_bytes(bytes)?),
            _ => None,
        };
        let state = ClaimLinkState {
            token: record.token()?,
            amount: record.amount,
            total_amount: record.total_amount.unwrap_or(record.amount),
            sender: record.sender,
            fee: record.fee(),
            escrow: record.escrow,
            expiration: record.expiration,
            status: record.status,
            operations: record.operations,
            message,
        };

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            transfer_id = %link.transfer_id,
            status = %state.status,
            recovered = link.is_recovered(),
            "claim link restored"
        );
        Ok(ClaimLink::restore(
            self.api.clone(),
            self.config.clone(),
            link,
            state,
            claim_url.to_string(),
        ))
    }

    pub async fn get_sender_history(
        &self,
        token: Token,
        sender: Address,
        only_active: bool,
        offset: u64,
        limit: u64,
    ) -> Result<SenderHistory, ClaimLinkError> {
        token.validate()?;
        let query = HistoryQuery {
            token,
            sender,
            only_active,
            offset,
            limit,
        };
        Ok(self.api.get_sender_history(&query).await?)
    }

    /// Transferable amount limits. Fungible tokens only.
    pub async fn get_limits(&self, token: &Token) -> Result<TransferLimits, ClaimLinkError> {
        token.validate()?;
        if token.is_nft() {
            return Err(ValidationError::NftLimits(token.token_type()).into());
        }
        Ok(self.api.get_limits(token).await?)
    }

    /// Fee the escrow would charge for a transfer, together with the resulting total.
    pub async fn get_current_fee(
        &self,
        token: Token,
        sender: Address,
        transfer_id: Address,
        expiration: UnixTimestamp,
        amount: U256,
    ) -> Result<(ClaimLinkFee, U256), ClaimLinkError> {
        token.validate()?;
        let query = FeeQuery {
            token,
            sender,
            transfer_id,
            expiration,
            amount,
        };
        let fee_data = self.api.get_fee(&query).await?.into_fee_data(token.chain_id, amount);
        Ok((fee_data.fee, fee_data.total_amount))
    }

    pub fn get_version_from_claim_url(&self, claim_url: &str) -> Result<String, ClaimLinkError> {
        Ok(version_from_claim_url(claim_url)?)
    }

    pub fn get_version_from_escrow_contract(&self, escrow: Address) -> Result<&'static str, ClaimLinkError> {
        Ok(escrow_version(escrow)?)
    }
}
