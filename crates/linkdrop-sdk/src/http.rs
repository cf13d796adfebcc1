//! [`EscrowApi`] over HTTP.
//!
//! Requests go to `{api_url}/{network}` where `network` is the escrow API name of the
//! request's chain. Every response is checked twice: a non-2xx status becomes
//! [`EscrowApiError::Status`], and a `success: false` body becomes
//! [`EscrowApiError::Rejected`]. Nothing is retried.

use alloy_primitives::{Address, B256};
use linkdrop_types::api::{
    ApiStatus, DepositRequest, DepositWithAuthorizationRequest, EscrowApi, EscrowApiError,
    FeeQuery, FeeQuote, HistoryQuery, RedeemRequest, RedeemResponse, SenderHistory,
    TransferLimits, TransferRecord, TransferStatusResponse,
};
use linkdrop_types::chain::ChainId;
use linkdrop_types::token::{Token, TokenType};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::config::SdkConfig;

fn transport<E: std::error::Error + Send + Sync + 'static>(error: E) -> EscrowApiError {
    EscrowApiError::Transport(Box::new(error))
}

#[derive(Debug, Clone)]
pub struct HttpEscrowApi {
    client: Client,
    api_url: String,
}

impl HttpEscrowApi {
    pub fn new(config: &SdkConfig) -> Result<Self, EscrowApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(transport)?;
            bearer.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
        }
        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// API root for `chain_id`.
    pub fn host(&self, chain_id: ChainId) -> Result<String, EscrowApiError> {
        let network = chain_id
            .network_name()
            .ok_or(EscrowApiError::UnsupportedChain(chain_id))?;
        Ok(format!("{}/{network}", self.api_url))
    }

    fn endpoint(
        &self,
        chain_id: ChainId,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<Url, EscrowApiError> {
        let mut url = Url::parse(&format!("{}{path}", self.host(chain_id)?))
            .map_err(|e| EscrowApiError::MalformedResponse(format!("invalid API URL: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, EscrowApiError> {
        self.send(self.client.request(Method::GET, url)).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, url: Url, body: &B) -> Result<T, EscrowApiError> {
        let body = serde_json::to_vec(body)?;
        self.send(self.client.request(Method::POST, url).body(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, EscrowApiError> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        if !status.is_success() {
            #[cfg(feature = "telemetry")]
            tracing::warn!(status = status.as_u16(), "escrow API returned an error status");
            return Err(EscrowApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_body(&body)
    }
}

/// Checks the `{success, error}` envelope, then decodes the payload.
fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, EscrowApiError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(EscrowApiError::MalformedResponse("empty response body".to_string()));
    }
    let envelope: ApiStatus = serde_json::from_str(body)?;
    envelope.into_result()?;
    Ok(serde_json::from_str(body)?)
}

fn deposit_path(token_type: TokenType) -> &'static str {
    match token_type {
        TokenType::Erc721 => "/deposit-erc721",
        TokenType::Erc1155 => "/deposit-erc1155",
        TokenType::Native | TokenType::Erc20 => "/deposit",
    }
}

fn limits_query(token: &Token) -> Vec<(&'static str, String)> {
    vec![
        ("token_address", token.address().to_checksum(None)),
        ("token_type", token.token_type().to_string()),
    ]
}

#[async_trait::async_trait]
impl EscrowApi for HttpEscrowApi {
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %request.transfer_id)))]
    async fn redeem_link(&self, request: &RedeemRequest) -> Result<RedeemResponse, EscrowApiError> {
        let url = self.endpoint(request.chain_id, "/redeem", &[])?;
        self.post(url, request).await
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %request.transfer_id)))]
    async fn redeem_recovered_link(
        &self,
        request: &RedeemRequest,
    ) -> Result<RedeemResponse, EscrowApiError> {
        let url = self.endpoint(request.chain_id, "/redeem-recovered", &[])?;
        self.post(url, request).await
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(chain_id = %chain_id, transfer_id = %transfer_id)))]
    async fn get_transfer_status(
        &self,
        chain_id: ChainId,
        transfer_id: Address,
    ) -> Result<TransferRecord, EscrowApiError> {
        let path = format!("/payment-status/transfer/{}", transfer_id.to_checksum(None));
        let url = self.endpoint(chain_id, &path, &[])?;
        let response: TransferStatusResponse = self.get(url).await?;
        Ok(response.claim_link)
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(chain_id = %chain_id, tx_hash = %tx_hash)))]
    async fn get_transfer_status_by_tx_hash(
        &self,
        chain_id: ChainId,
        tx_hash: B256,
    ) -> Result<TransferRecord, EscrowApiError> {
        let url = self.endpoint(chain_id, &format!("/payment-status/transaction/{tx_hash}"), &[])?;
        let response: TransferStatusResponse = self.get(url).await?;
        Ok(response.claim_link)
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(chain_id = %query.token.chain_id, transfer_id = %query.transfer_id)))]
    async fn get_fee(&self, query: &FeeQuery) -> Result<FeeQuote, EscrowApiError> {
        let url = self.endpoint(query.token.chain_id, "/fee", &query.to_query_pairs())?;
        self.get(url).await
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %request.transfer_id)))]
    async fn deposit(&self, request: &DepositRequest) -> Result<(), EscrowApiError> {
        let url = self.endpoint(request.chain_id, deposit_path(request.token_type), &[])?;
        let _: IgnoredAny = self.post(url, request).await?;
        Ok(())
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(transfer_id = %request.transfer_id)))]
    async fn deposit_with_authorization(
        &self,
        request: &DepositWithAuthorizationRequest,
    ) -> Result<(), EscrowApiError> {
        let url = self.endpoint(request.chain_id, "/deposit-with-authorization", &[])?;
        let _: IgnoredAny = self.post(url, request).await?;
        Ok(())
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(sender = %query.sender)))]
    async fn get_sender_history(&self, query: &HistoryQuery) -> Result<SenderHistory, EscrowApiError> {
        let path = format!(
            "/payment-status/sender/{}/get-sender-history",
            query.sender.to_checksum(None)
        );
        let url = self.endpoint(query.token.chain_id, &path, &query.to_query_pairs())?;
        self.get(url).await
    }

    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(chain_id = %token.chain_id)))]
    async fn get_limits(&self, token: &Token) -> Result<TransferLimits, EscrowApiError> {
        let url = self.endpoint(token.chain_id, "/limits", &limits_query(token))?;
        self.get(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{U256, address};
    use linkdrop_types::networks::KnownNetwork;
    use linkdrop_types::timestamp::UnixTimestamp;

    fn api() -> HttpEscrowApi {
        HttpEscrowApi::new(&SdkConfig::new("https://p2p.linkdrop.io").with_api_key("k")).unwrap()
    }

    #[test]
    fn test_host_per_chain() {
        let api = api();
        assert_eq!(
            api.host(ChainId::base()).unwrap(),
            "https://escrow-api.linkdrop.io/v3/base"
        );
        assert_eq!(
            api.host(ChainId::avalanche()).unwrap(),
            "https://escrow-api.linkdrop.io/v3/avalanche"
        );
        assert!(matches!(
            api.host(ChainId::new(1)),
            Err(EscrowApiError::UnsupportedChain(_))
        ));
    }

    #[test]
    fn test_fee_endpoint_query() {
        let query = FeeQuery {
            token: Token::native(ChainId::polygon()),
            sender: Address::ZERO,
            transfer_id: address!("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"),
            expiration: UnixTimestamp::from_secs(1_700_000_000),
            amount: U256::from(5),
        };
        let url = api()
            .endpoint(ChainId::polygon(), "/fee", &query.to_query_pairs())
            .unwrap();
        assert_eq!(url.path(), "/v3/polygon/fee");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("amount".to_string(), "5".to_string()));
        assert!(pairs.contains(&(
            "transfer_id".to_string(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".to_string()
        )));
    }

    #[test]
    fn test_deposit_paths() {
        assert_eq!(deposit_path(TokenType::Native), "/deposit");
        assert_eq!(deposit_path(TokenType::Erc20), "/deposit");
        assert_eq!(deposit_path(TokenType::Erc721), "/deposit-erc721");
        assert_eq!(deposit_path(TokenType::Erc1155), "/deposit-erc1155");
    }

    #[test]
    fn test_parse_body_envelope() {
        let rejected = parse_body::<IgnoredAny>(r#"{"success":false,"error":"link expired"}"#);
        assert!(matches!(rejected, Err(EscrowApiError::Rejected(msg)) if msg == "link expired"));

        let redeemed: RedeemResponse = parse_body(
            r#"{"success":true,"tx_hash":"0x1111111111111111111111111111111111111111111111111111111111111111"}"#,
        )
        .unwrap();
        assert_eq!(redeemed.tx_hash, B256::repeat_byte(0x11));

        assert!(matches!(
            parse_body::<IgnoredAny>("  "),
            Err(EscrowApiError::MalformedResponse(_))
        ));
        assert!(matches!(parse_body::<IgnoredAny>("<html>"), Err(EscrowApiError::Json(_))));
    }

    #[test]
    fn test_limits_query() {
        let usdc = Token::erc20(
            ChainId::base(),
            address!("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
        );
        let query = limits_query(&usdc);
        assert_eq!(query[1], ("token_type", "ERC20".to_string()));
        assert_eq!(query[0].1, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    }
}
