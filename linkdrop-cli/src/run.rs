use linkdrop_eip155::capability::OsRandom;
use linkdrop_eip155::escrow::escrow_version;
use linkdrop_eip155::key::LinkKey;
use linkdrop_eip155::link::{DecodedLink, decode_link, encode_link};
use linkdrop_eip155::receiver::sign_receiver;
use linkdrop_sdk::LinkdropSdk;
use linkdrop_types::token::Token;
use serde_json::json;

use crate::Command;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn parse_link_key(key: &str) -> CliResult<LinkKey> {
    let bytes = bs58::decode(key).into_vec()?;
    Ok(LinkKey::from_slice(&bytes)?)
}

fn print(value: serde_json::Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub async fn run(command: Command) -> CliResult<()> {
    match command {
        Command::GenerateKey { chain, base_url } => {
            let link_key = LinkKey::generate(&OsRandom)?;
            let link = DecodedLink::new(link_key, chain);
            print(json!({
                "linkKey": bs58::encode(link.link_key.to_bytes()).into_string(),
                "transferId": link.transfer_id,
                "claimUrl": encode_link(&base_url, &link),
            }))
        }
        Command::Encode {
            key,
            chain,
            transfer_id,
            base_url,
        } => {
            let mut link = DecodedLink::new(parse_link_key(&key)?, chain);
            if let Some(transfer_id) = transfer_id {
                link.transfer_id = transfer_id;
            }
            println!("{}", encode_link(&base_url, &link));
            Ok(())
        }
        Command::Decode { url } => {
            let link = decode_link(&url)?;
            print(json!({
                "transferId": link.transfer_id,
                "linkKeyId": link.link_key.address(),
                "chainId": link.chain_id,
                "version": link.version,
                "recovered": link.is_recovered(),
                "senderSignature": link.sender_signature,
                "messageKey": link.message_key,
            }))
        }
        Command::ReceiverSig { key, receiver } => {
            let signature = sign_receiver(&parse_link_key(&key)?, receiver)?;
            println!("{signature}");
            Ok(())
        }
        Command::EscrowVersion { escrow } => {
            println!("{}", escrow_version(escrow)?);
            Ok(())
        }
        Command::Status { url } => {
            let sdk = LinkdropSdk::from_env()?;
            let link = sdk.get_claim_link(&url).await?;
            print(json!({
                "transferId": link.transfer_id(),
                "status": link.status().to_string(),
                "tokenType": link.token().token_type(),
                "token": link.token().address(),
                "amount": link.amount(),
                "totalAmount": link.total_amount(),
                "sender": link.sender(),
                "escrow": link.escrow(),
                "expiration": link.expiration().as_secs(),
                "operations": link.operations(),
                "hasMessage": link.message().is_some(),
            }))
        }
        Command::Limits {
            chain,
            token_type,
            token,
        } => {
            let token = Token::from_parts(chain, token_type, token, None)?;
            let sdk = LinkdropSdk::from_env()?;
            print(serde_json::to_value(sdk.get_limits(&token).await?)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_key() {
        let key = LinkKey::from_seed(&[7u8; 32]).unwrap();
        let encoded = bs58::encode(key.to_bytes()).into_string();
        assert_eq!(parse_link_key(&encoded).unwrap(), key);
        assert!(parse_link_key("0OIl").is_err());
    }
}
