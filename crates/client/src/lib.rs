use alloy_consensus::TxEnvelope;
use alloy_network::{eip2718::Encodable2718, EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};
use thiserror::Error;

/// A function that signs a transaction request and returns signed bytes.
///
/// Re-exported by the `action` crate; actions only ever see signed bytes, so
/// tests can substitute a signer that records or rejects requests.
pub type SignerFn = Arc<
    dyn Fn(TransactionRequest) -> Pin<Box<dyn Future<Output = eyre::Result<Bytes>> + Send>>
        + Send
        + Sync,
>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    /// Error with private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Error building an HTTP client for an offchain service
    #[error("Invalid HTTP client configuration: {0}")]
    Http(String),
}

/// Convenience function to create an ethereum rpc provider from url.
pub fn create_provider(rpc_url: &str) -> Result<impl Provider + Clone, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;
    let provider = ProviderBuilder::new().connect_http(url);

    Ok(provider)
}

/// Address controlled by a private key.
pub fn signer_address(private_key: &str) -> Result<Address, ClientError> {
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| ClientError::InvalidPrivateKey(format!("{}", e)))?;
    Ok(signer.address())
}

/// Sign with a local private key for the chain `chain_id`.
///
/// Nonce, fees and gas are filled from `provider` right before signing, so a
/// signer can be shared by several actions on the same chain.
pub fn local_signer_fn<P>(
    private_key: &str,
    chain_id: u64,
    provider: P,
) -> Result<SignerFn, ClientError>
where
    P: Provider + Clone + 'static,
{
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| ClientError::InvalidPrivateKey(format!("{}", e)))?;
    let from = signer.address();
    let wallet = EthereumWallet::from(signer);

    Ok(Arc::new(move |tx: TransactionRequest| {
        let wallet = wallet.clone();
        let provider = provider.clone();
        Box::pin(async move {
            let envelope: TxEnvelope = fill_transaction(tx, &provider, from, chain_id)
                .await?
                .build(&wallet)
                .await
                .map_err(|e| eyre::eyre!("signing failed: {}", e))?;

            let mut raw = Vec::new();
            envelope.encode_2718(&mut raw);
            Ok(Bytes::from(raw))
        })
    }))
}

/// Fill missing transaction fields using the provider.
///
/// Fields already set by the caller (e.g. a fixed gas ceiling) are left untouched.
pub async fn fill_transaction<P>(
    mut tx: TransactionRequest,
    provider: &P,
    from: Address,
    chain_id: u64,
) -> eyre::Result<TransactionRequest>
where
    P: Provider,
{
    tx.from.get_or_insert(from);
    tx.chain_id.get_or_insert(chain_id);

    if tx.nonce.is_none() {
        tx.nonce = Some(provider.get_transaction_count(from).await?);
    }

    // fees first, gas estimation may depend on them
    if tx.max_fee_per_gas.is_none() || tx.max_priority_fee_per_gas.is_none() {
        let fees = provider.estimate_eip1559_fees().await?;
        tx.max_fee_per_gas.get_or_insert(fees.max_fee_per_gas);
        tx.max_priority_fee_per_gas
            .get_or_insert(fees.max_priority_fee_per_gas);
    }

    if tx.gas.is_none() {
        let estimate = provider.estimate_gas(tx.clone()).await?;
        tx.gas = Some(estimate + estimate / 5);
    }

    Ok(tx)
}

/// Build an HTTP client for an offchain service.
///
/// Every request made through the client carries `timeout`; `headers` are sent
/// with every request (typically an API key).
pub fn http_client(
    timeout: Duration,
    headers: &[(&str, &str)],
) -> Result<reqwest::Client, ClientError> {
    let mut default_headers = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::Http(format!("header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::Http(format!("header value for {}: {}", name, e)))?;
        default_headers.insert(name, value);
    }

    reqwest::Client::builder()
        .default_headers(default_headers)
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::Http(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url() {
        let result = create_provider("not a url");
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_signer_address() {
        // anvil's first dev account
        let key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert_eq!(
            signer_address(key).unwrap(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
        );
        assert!(signer_address("0x1234").is_err());
    }

    #[test]
    fn test_invalid_private_key() {
        let provider = ProviderBuilder::new().connect_http("http://localhost:8545".parse().unwrap());
        let result = local_signer_fn("not a key", 114, provider);
        assert!(matches!(result, Err(ClientError::InvalidPrivateKey(_))));
    }

    #[test]
    fn test_http_client_rejects_bad_header() {
        let result = http_client(Duration::from_secs(1), &[("x-api-key", "bad\nvalue")]);
        assert!(matches!(result, Err(ClientError::Http(_))));
    }

    #[test]
    fn test_http_client_with_api_key() {
        let result = http_client(Duration::from_secs(1), &[("X-API-KEY", "00000000")]);
        assert!(result.is_ok());
    }
}
