use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;

use super::*;

#[derive(Parser, Debug)]
#[command(name = "vault", about = "Merchant vault contract tools")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the vault address and balance
    Compile,
    /// Refund an accidental payment from the vault back to its sender
    Refund {
        /// Amount the sender paid, in satoshis
        #[arg(short = 'a', long)]
        refund_amount: String,
        #[arg(short = 's', long)]
        sender_address: String,
        /// Compressed public key of the sender, hex
        #[arg(short = 'p', long)]
        sender_pubkey: String,
    },
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub network: types::VaultNetwork,
    #[serde(default = "default_refund_timeout")]
    pub refund_timeout_secs: u64,
    pub provider: ProviderConfig,
    pub merchant: MerchantConfig,
    pub sign: Option<SignConfig>,
}

#[derive(Deserialize, Debug)]
pub struct ProviderConfig {
    pub url: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub confirmed_only: bool,
}

#[derive(Deserialize, Debug)]
pub struct MerchantConfig {
    pub receiver_pk: String,
    pub signer_pk: String,
}

#[derive(Deserialize)]
pub struct SignConfig {
    pub wif: String,
}

impl std::fmt::Debug for SignConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignConfig").field("wif", &"***").finish()
    }
}

fn default_refund_timeout() -> u64 {
    120
}

fn default_provider_timeout() -> u64 {
    30
}

impl MerchantConfig {
    pub fn keys(&self) -> Result<types::MerchantKeys> {
        let receiver_pk = PublicKey::from_str(&self.receiver_pk)
            .with_context(|| format!("invalid merchant receiver_pk {}", self.receiver_pk))?;
        let signer_pk = PublicKey::from_str(&self.signer_pk)
            .with_context(|| format!("invalid merchant signer_pk {}", self.signer_pk))?;
        Ok(types::MerchantKeys {
            receiver_pk,
            signer_pk,
        })
    }
}

impl Config {
    pub fn signer_key(&self) -> Result<PrivateKey> {
        let sign = self
            .sign
            .as_ref()
            .ok_or_else(|| anyhow!("[sign] section with the merchant signer wif is required"))?;
        let key = PrivateKey::from_wif(sign.wif.trim()).context("invalid signer wif")?;
        let kind: bitcoin::NetworkKind = self.network.params().into();
        if key.network != kind {
            return Err(anyhow!(
                "signer wif is not for the {:?} network",
                self.network
            ));
        }
        Ok(key)
    }
}

pub fn load_config(path: &str) -> Result<Config> {
    let config_content =
        fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path))?;
    let config: Config = toml::from_str(&config_content)
        .with_context(|| format!("failed to parse config file {}", path))?;
    debug!("loaded config {:?}", config);

    Ok(config)
}
