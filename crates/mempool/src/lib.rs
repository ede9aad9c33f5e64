pub mod tx;
pub mod utxo;

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bitcoin::{Address, Amount, OutPoint, Transaction, Txid};
use datatypes::types;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Source of unspent outputs and sink for signed transactions.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn get_utxos(&self, address: &Address) -> Result<Vec<types::Utxo>>;

    async fn send_tx(&self, tx: &Transaction) -> Result<Txid>;

    /// Sum of every unspent output at `address`, token-carrying ones included.
    async fn get_balance(&self, address: &Address) -> Result<Amount> {
        let utxos = self.get_utxos(address).await?;
        utxos
            .iter()
            .try_fold(Amount::ZERO, |total, utxo| total.checked_add(utxo.value))
            .ok_or_else(|| anyhow!("balance overflow at {}", address))
    }
}

/// Esplora style REST indexer.
#[derive(Debug, Clone)]
pub struct MempoolClient {
    base_url: String,
    client: Client,
    confirmed_only: bool,
}

impl MempoolClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            confirmed_only: false,
        })
    }

    pub fn confirmed_only(mut self, confirmed_only: bool) -> Self {
        self.confirmed_only = confirmed_only;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Provider for MempoolClient {
    async fn get_utxos(&self, address: &Address) -> Result<Vec<types::Utxo>> {
        self.gets_utxo(address, self.confirmed_only).await
    }

    async fn send_tx(&self, tx: &Transaction) -> Result<Txid> {
        self.broadcast(tx).await
    }
}
