//! The claim link aggregate.
//!
//! A [`ClaimLink`] carries one transfer through its lifecycle: created with a fee
//! quote, optionally given an encrypted note, deposited on-chain or through a
//! gas-less authorization, shared as a claim URL and finally redeemed.
//!
//! Guards are checked before any side effect. A guarded call that fails leaves every
//! field as it was.

use alloy_primitives::{Address, B256, Bytes, U256};
use linkdrop_eip155::authorization::{AuthorizationConfig, AuthorizationRequest, build_deposit_authorization};
use linkdrop_eip155::capability::{RandomSource, TransactionSender, TypedDataSigner};
use linkdrop_eip155::escrow::{deposit_calldata, deposit_value};
use linkdrop_eip155::key::LinkKey;
use linkdrop_eip155::link::{CLAIM_LINK_VERSION, DecodedLink, encode_link};
use linkdrop_eip155::message::{EncryptedMessage, InitialKey, decrypt_sender_message, encrypt_message};
use linkdrop_eip155::receiver::sign_receiver;
use linkdrop_eip155::recovery::recover_link;
use linkdrop_types::api::{
    DepositRequest, DepositWithAuthorizationRequest, EscrowApi, FeeQuery, RedeemRequest,
};
use linkdrop_types::claim_link::{
    ClaimLinkFee, ClaimLinkFeeData, ClaimLinkOperation, ClaimLinkStatus, DepositParams,
    Transaction,
};
use linkdrop_types::timestamp::UnixTimestamp;
use linkdrop_types::token::{Token, TokenType};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::config::SdkConfig;
use crate::error::{ClaimLinkError, StateError, ValidationError};

/// Base58 prefix length used when [`ClaimLink::add_message`] is given none.
pub const DEFAULT_ENCRYPTION_KEY_LENGTH: usize = 12;

/// Inputs for a new claim link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimLinkParams {
    pub token: Token,
    pub amount: U256,
    pub sender: Address,
    pub expiration: UnixTimestamp,
    /// Escrow override. Resolved from the SDK config when absent.
    pub escrow_address: Option<Address>,
}

pub struct ClaimLink {
    api: Arc<dyn EscrowApi>,
    config: Arc<SdkConfig>,
    link_key: Option<LinkKey>,
    transfer_id: Address,
    sender_signature: Option<Bytes>,
    token: Token,
    amount: U256,
    sender: Address,
    fee: ClaimLinkFee,
    total_amount: U256,
    message: Option<EncryptedMessage>,
    message_key: Option<InitialKey>,
    share_message_key: bool,
    escrow: Address,
    expiration: UnixTimestamp,
    operations: Vec<ClaimLinkOperation>,
    status: ClaimLinkStatus,
    claim_url: Option<String>,
}

/// Everything needed to rebuild a link from an escrow API record.
pub(crate) struct ClaimLinkState {
    pub token: Token,
    pub amount: U256,
    pub total_amount: U256,
    pub sender: Address,
    pub fee: ClaimLinkFee,
    pub escrow: Address,
    pub expiration: UnixTimestamp,
    pub status: ClaimLinkStatus,
    pub operations: Vec<ClaimLinkOperation>,
    pub message: Option<EncryptedMessage>,
}

async fn fetch_fee(
    api: &dyn EscrowApi,
    token: Token,
    sender: Address,
    transfer_id: Address,
    expiration: UnixTimestamp,
    amount: U256,
) -> Result<ClaimLinkFeeData, ClaimLinkError> {
    let query = FeeQuery {
        token,
        sender,
        transfer_id,
        expiration,
        amount,
    };
    let quote = api.get_fee(&query).await?;
    Ok(quote.into_fee_data(token.chain_id, amount))
}

impl ClaimLink {
    /// Validates the token and quotes the fee for a fresh link.
    pub(crate) async fn create(
        api: Arc<dyn EscrowApi>,
        config: Arc<SdkConfig>,
        params: ClaimLinkParams,
        escrow: Address,
        link_key: Option<LinkKey>,
        transfer_id: Address,
    ) -> Result<Self, ClaimLinkError> {
        params.token.validate()?;
        let fee_data = fetch_fee(
            api.as_ref(),
            params.token,
            params.sender,
            transfer_id,
            params.expiration,
            params.amount,
        )
        .await?;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            transfer_id = %transfer_id,
            chain_id = %params.token.chain_id,
            token_type = %params.token.token_type(),
            "claim link created"
        );

        Ok(Self {
            api,
            config,
            link_key,
            transfer_id,
            sender_signature: None,
            token: params.token,
            amount: params.amount,
            sender: params.sender,
            fee: fee_data.fee,
            total_amount: fee_data.total_amount,
            message: None,
            message_key: None,
            share_message_key: false,
            escrow,
            expiration: params.expiration,
            operations: Vec::new(),
            status: ClaimLinkStatus::Created,
            claim_url: None,
        })
    }

    /// Rebuilds a link from a decoded claim URL and the escrow's record of it.
    pub(crate) fn restore(
        api: Arc<dyn EscrowApi>,
        config: Arc<SdkConfig>,
        link: DecodedLink,
        state: ClaimLinkState,
        claim_url: String,
    ) -> Self {
        let message_key = link.message_key.map(InitialKey::from);
        Self {
            api,
            config,
            transfer_id: link.transfer_id,
            link_key: Some(link.link_key),
            sender_signature: link.sender_signature,
            token: state.token,
            amount: state.amount,
            sender: state.sender,
            fee: state.fee,
            total_amount: state.total_amount,
            message: state.message,
            share_message_key: message_key.is_some(),
            message_key,
            escrow: state.escrow,
            expiration: state.expiration,
            operations: state.operations,
            status: state.status,
            claim_url: Some(claim_url),
        }
    }

    pub fn link_key(&self) -> Option<&LinkKey> {
        self.link_key.as_ref()
    }

    pub fn transfer_id(&self) -> Address {
        self.transfer_id
    }

    pub fn sender_signature(&self) -> Option<&Bytes> {
        self.sender_signature.as_ref()
    }

    pub fn is_recovered(&self) -> bool {
        self.sender_signature.is_some()
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    /// Amount moved into escrow, fee included when the fee is paid in the same token.
    pub fn total_amount(&self) -> U256 {
        self.total_amount
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn fee(&self) -> &ClaimLinkFee {
        &self.fee
    }

    pub fn escrow(&self) -> Address {
        self.escrow
    }

    pub fn expiration(&self) -> UnixTimestamp {
        self.expiration
    }

    pub fn status(&self) -> ClaimLinkStatus {
        self.status
    }

    pub fn operations(&self) -> &[ClaimLinkOperation] {
        &self.operations
    }

    pub fn message(&self) -> Option<&EncryptedMessage> {
        self.message.as_ref()
    }

    pub fn claim_url(&self) -> Option<&str> {
        self.claim_url.as_deref()
    }

    /// Whether generated claim URLs carry the message key (`m`), letting the receiver
    /// read the note without the sender's signer.
    pub fn shares_message_key(&self) -> bool {
        self.share_message_key
    }

    /// Changing the flag while a message key exists drops the stored claim URL; call
    /// [`generate_claim_url`](Self::generate_claim_url) again.
    pub fn set_share_message_key(&mut self, share: bool) {
        if share != self.share_message_key && self.message_key.is_some() {
            self.claim_url = None;
        }
        self.share_message_key = share;
    }

    fn ensure_mutable(&self, operation: &'static str) -> Result<(), StateError> {
        if self.status.is_mutable() {
            Ok(())
        } else {
            Err(StateError::InvalidStatus {
                operation,
                status: self.status,
            })
        }
    }

    fn require_link_key(&self, operation: &'static str) -> Result<&LinkKey, StateError> {
        self.link_key.as_ref().ok_or(StateError::MissingLinkKey(operation))
    }

    /// Encrypts `text` for this transfer. The sender signs the encryption statement
    /// through `signer`; `key_length` defaults to [`DEFAULT_ENCRYPTION_KEY_LENGTH`].
    ///
    /// When the link shares its message key, a previously generated claim URL is
    /// dropped since it carries the old key.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %self.transfer_id)))]
    pub async fn add_message<R, S>(
        &mut self,
        text: &str,
        key_length: Option<usize>,
        rng: &R,
        signer: &S,
    ) -> Result<(), ClaimLinkError>
    where
        R: RandomSource + ?Sized,
        S: TypedDataSigner + ?Sized,
    {
        self.ensure_mutable("add a message to")?;
        let limits = self.config.message;
        if text.is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        if text.len() > limits.max_text_length {
            return Err(ValidationError::MessageTooLong {
                length: text.len(),
                max: limits.max_text_length,
            }
            .into());
        }
        let key_length = key_length.unwrap_or(DEFAULT_ENCRYPTION_KEY_LENGTH);
        if key_length < limits.min_encryption_key_length || key_length > limits.max_encryption_key_length {
            return Err(ValidationError::KeyLengthOutOfRange {
                length: key_length,
                min: limits.min_encryption_key_length,
                max: limits.max_encryption_key_length,
            }
            .into());
        }

        let (message, initial_key) = encrypt_message(
            text,
            self.transfer_id,
            self.token.chain_id,
            key_length,
            rng,
            signer,
        )
        .await?;
        self.message = Some(message);
        self.message_key = Some(initial_key);
        if self.share_message_key {
            self.claim_url = None;
        }
        Ok(())
    }

    /// Re-quotes the fee for `amount` and adopts it when the amount is within limits.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %self.transfer_id, amount = %amount)))]
    pub async fn update_amount(&mut self, amount: U256) -> Result<(), ClaimLinkError> {
        self.ensure_mutable("update the amount of")?;
        if self.token.token_type() == TokenType::Erc721 {
            return Err(ValidationError::NftAmountImmutable.into());
        }
        let fee_data = self.fee_for(amount).await?;
        if amount < fee_data.min_transfer_amount || amount > fee_data.max_transfer_amount {
            return Err(ValidationError::AmountOutOfRange {
                amount,
                min: fee_data.min_transfer_amount,
                max: fee_data.max_transfer_amount,
            }
            .into());
        }
        self.amount = amount;
        self.total_amount = fee_data.total_amount;
        self.fee = fee_data.fee;
        Ok(())
    }

    /// Fee quote for the current amount. Does not modify the link.
    pub async fn get_current_fee(&self) -> Result<ClaimLinkFeeData, ClaimLinkError> {
        self.fee_for(self.amount).await
    }

    async fn fee_for(&self, amount: U256) -> Result<ClaimLinkFeeData, ClaimLinkError> {
        fetch_fee(
            self.api.as_ref(),
            self.token,
            self.sender,
            self.transfer_id,
            self.expiration,
            amount,
        )
        .await
    }

    fn encrypted_message_bytes(&self) -> Option<Bytes> {
        self.message.as_ref().map(EncryptedMessage::to_bytes)
    }

    /// Transaction that deposits a native or ERC20 link into escrow.
    pub fn get_deposit_params(&self) -> Result<DepositParams, ClaimLinkError> {
        let data = deposit_calldata(
            &self.token,
            self.transfer_id,
            self.total_amount,
            self.expiration,
            &self.fee,
            self.encrypted_message_bytes().unwrap_or_default(),
        )?;
        Ok(DepositParams {
            chain_id: self.token.chain_id,
            to: self.escrow,
            value: deposit_value(&self.token, &self.fee, self.total_amount),
            data,
        })
    }

    /// Broadcasts the deposit through `sender` and registers it with the escrow API.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %self.transfer_id)))]
    pub async fn deposit<T>(&mut self, sender: &T) -> Result<Transaction, ClaimLinkError>
    where
        T: TransactionSender + ?Sized,
    {
        self.ensure_mutable("deposit")?;
        let params = self.get_deposit_params()?;
        let transaction = sender
            .send_transaction(params.chain_id, params.to, params.value, params.data)
            .await?;
        self.deposit_register(transaction).await?;
        Ok(transaction)
    }

    /// Tells the escrow API about a deposit broadcast elsewhere. NFT deposits go
    /// through here directly.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %self.transfer_id, tx_hash = %transaction.hash)))]
    pub async fn deposit_register(&mut self, transaction: Transaction) -> Result<(), ClaimLinkError> {
        self.ensure_mutable("register a deposit for")?;
        let amount = match self.token.token_type() {
            TokenType::Erc721 => U256::from(1),
            _ => self.amount,
        };
        let request = DepositRequest {
            chain_id: self.token.chain_id,
            sender: self.sender,
            escrow: self.escrow,
            transfer_id: self.transfer_id,
            token: self.token.address(),
            token_type: self.token.token_type(),
            token_id: self.token.id(),
            expiration: self.expiration,
            tx_hash: transaction.hash,
            transaction_type: transaction.kind,
            fee_authorization: self.fee.authorization.clone(),
            amount,
            fee_amount: self.fee.amount,
            total_amount: self.total_amount,
            fee_token: self.fee.token.address(),
            encrypted_sender_message: self.encrypted_message_bytes(),
        };
        self.api.deposit(&request).await?;
        self.status = ClaimLinkStatus::Deposited;

        #[cfg(feature = "telemetry")]
        tracing::info!(transfer_id = %self.transfer_id, "claim link deposited");
        Ok(())
    }

    /// Signs a gas-less deposit authorization for a supported stablecoin and hands it
    /// to the escrow API's relayer.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %self.transfer_id)))]
    pub async fn deposit_with_authorization<S>(
        &mut self,
        signer: &S,
        config: &AuthorizationConfig,
    ) -> Result<(), ClaimLinkError>
    where
        S: TypedDataSigner + ?Sized,
    {
        self.ensure_mutable("deposit")?;
        let request = AuthorizationRequest {
            token: self.token,
            sender: self.sender,
            escrow: self.escrow,
            transfer_id: self.transfer_id,
            total_amount: self.total_amount,
            expiration: self.expiration,
            fee_amount: self.fee.amount,
            now: UnixTimestamp::now(),
        };
        let authorization = build_deposit_authorization(&request, config, signer).await?;
        let request = DepositWithAuthorizationRequest {
            chain_id: self.token.chain_id,
            sender: self.sender,
            escrow: self.escrow,
            transfer_id: self.transfer_id,
            token: self.token.address(),
            token_type: self.token.token_type(),
            expiration: self.expiration,
            amount: self.amount,
            authorization_selector: authorization.selector(),
            authorization: authorization.authorization,
            fee_amount: self.fee.amount,
            total_amount: self.total_amount,
            fee_authorization: self.fee.authorization.clone(),
            encrypted_sender_message: self.encrypted_message_bytes(),
        };
        self.api.deposit_with_authorization(&request).await?;
        self.status = ClaimLinkStatus::Deposited;

        #[cfg(feature = "telemetry")]
        tracing::info!(
            transfer_id = %self.transfer_id,
            method = %authorization.method,
            "claim link deposited with authorization"
        );
        Ok(())
    }

    /// Refreshes status and operations from the escrow API.
    pub async fn get_status(&mut self) -> Result<(ClaimLinkStatus, Vec<ClaimLinkOperation>), ClaimLinkError> {
        let record = self
            .api
            .get_transfer_status(self.token.chain_id, self.transfer_id)
            .await?;
        if record.status != self.status {
            #[cfg(feature = "telemetry")]
            tracing::debug!(
                transfer_id = %self.transfer_id,
                from = %self.status,
                to = %record.status,
                "claim link status changed"
            );
            self.status = record.status;
        }
        self.operations = record.operations;
        Ok((self.status, self.operations.clone()))
    }

    /// Encodes the claim URL for this link's key and keeps it on the link.
    ///
    /// Passing `sender_signature` issues a recovered link for the current key.
    pub fn generate_claim_url(&mut self, sender_signature: Option<Bytes>) -> Result<String, ClaimLinkError> {
        let link_key = self.require_link_key("generate a claim URL")?.clone();
        let sender_signature = sender_signature.or_else(|| self.sender_signature.clone());
        let link = DecodedLink {
            link_key,
            transfer_id: self.transfer_id,
            chain_id: self.token.chain_id,
            version: CLAIM_LINK_VERSION.to_string(),
            sender_signature: sender_signature.clone(),
            message_key: self.shared_message_key(),
        };
        let url = encode_link(&self.config.base_url, &link);
        self.sender_signature = sender_signature;
        self.claim_url = Some(url.clone());
        Ok(url)
    }

    fn shared_message_key(&self) -> Option<B256> {
        self.message_key
            .filter(|_| self.share_message_key)
            .map(|key| key.as_b256())
    }

    /// Issues a recovered claim URL under a fresh link key, signed by the sender.
    ///
    /// Works without the original link key. The link itself is not modified: the
    /// returned URL is redeemed by whoever decodes it.
    pub async fn generate_recovered_claim_url<R, S>(&self, rng: &R, signer: &S) -> Result<String, ClaimLinkError>
    where
        R: RandomSource + ?Sized,
        S: TypedDataSigner + ?Sized,
    {
        let mut link = recover_link(self.transfer_id, self.token.chain_id, self.escrow, rng, signer).await?;
        link.message_key = self.shared_message_key();
        Ok(encode_link(&self.config.base_url, &link))
    }

    /// Redeems the link to `receiver`. Recovered links go through the recovered
    /// endpoint with the sender's signature attached.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %self.transfer_id, receiver = %receiver)))]
    pub async fn redeem(&self, receiver: Address) -> Result<B256, ClaimLinkError> {
        if receiver.is_zero() {
            return Err(ValidationError::ZeroReceiver.into());
        }
        if self.claim_url.is_none() {
            return Err(StateError::MissingClaimUrl.into());
        }
        let link_key = self.require_link_key("redeem")?;
        let request = RedeemRequest {
            chain_id: self.token.chain_id,
            transfer_id: self.transfer_id,
            token: self.token.address(),
            sender: self.sender,
            receiver,
            escrow: self.escrow,
            receiver_sig: sign_receiver(link_key, receiver)?,
            sender_sig: self.sender_signature.clone(),
        };
        let response = match request.sender_sig {
            Some(_) => self.api.redeem_recovered_link(&request).await?,
            None => self.api.redeem_link(&request).await?,
        };

        #[cfg(feature = "telemetry")]
        tracing::info!(transfer_id = %self.transfer_id, tx_hash = %response.tx_hash, "claim link redeemed");
        Ok(response.tx_hash)
    }

    /// Sender path: re-derives the message key through `signer`. `None` when the
    /// link carries no note.
    pub async fn decrypt_sender_message<S>(&self, signer: &S) -> Result<Option<String>, ClaimLinkError>
    where
        S: TypedDataSigner + ?Sized,
    {
        let Some(message) = &self.message else {
            return Ok(None);
        };
        let text = decrypt_sender_message(message, self.transfer_id, self.token.chain_id, signer).await?;
        Ok(Some(text))
    }

    /// Receiver path: opens the note with the key carried by the claim URL.
    pub fn decrypt_message(&self) -> Result<Option<String>, ClaimLinkError> {
        let Some(message) = &self.message else {
            return Ok(None);
        };
        let key = self.message_key.as_ref().ok_or(StateError::MissingMessageKey)?;
        decrypt_message_with_link_key(message, key).map(Some)
    }
}

/// Opens `message` with the initial key a claim URL carries in `m`.
pub fn decrypt_message_with_link_key(
    message: &EncryptedMessage,
    initial_key: &InitialKey,
) -> Result<String, ClaimLinkError> {
    Ok(message.decrypt(initial_key)?)
}

impl fmt::Debug for ClaimLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimLink")
            .field("transfer_id", &self.transfer_id)
            .field("token", &self.token)
            .field("amount", &self.amount)
            .field("total_amount", &self.total_amount)
            .field("sender", &self.sender)
            .field("escrow", &self.escrow)
            .field("expiration", &self.expiration)
            .field("status", &self.status)
            .field("has_message", &self.message.is_some())
            .finish_non_exhaustive()
    }
}
