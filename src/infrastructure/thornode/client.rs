//! HTTP client for the THORNode REST API

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::types::{Balance, BalancesResponse, Network, Pool, Vault};
use super::ChainDataSource;
use crate::shared::errors::FetchError;

pub struct ThornodeClient {
    http_client: Client,
    base_url: String,
    client_id: String,
}

impl ThornodeClient {
    pub fn new(base_url: &str, client_id: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");

        let response = self
            .http_client
            .get(&url)
            .header("accept", "application/json")
            .header("x-client-id", &self.client_id)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ChainDataSource for ThornodeClient {
    async fn vaults(&self) -> Result<Vec<Vault>, FetchError> {
        self.get_json("/thorchain/vaults/asgard").await
    }

    async fn pools(&self) -> Result<Vec<Pool>, FetchError> {
        self.get_json("/thorchain/pools").await
    }

    async fn derived_pools(&self) -> Result<Vec<Pool>, FetchError> {
        self.get_json("/thorchain/dpools").await
    }

    async fn network(&self) -> Result<Network, FetchError> {
        self.get_json("/thorchain/network").await
    }

    async fn balances(&self, address: &str) -> Result<Vec<Balance>, FetchError> {
        let response: BalancesResponse = self
            .get_json(&format!("/cosmos/bank/v1beta1/balances/{}", address))
            .await?;
        Ok(response.balances)
    }
}
