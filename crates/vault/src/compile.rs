use super::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultInfo {
    pub address: String,
    pub script_pubkey: String,
    pub balance: u64,
}

/// Instantiates the merchant vault and reports where it lives and what it holds.
#[tracing::instrument(skip_all, fields(network = ?network))]
pub async fn compile_vault<P: Provider + ?Sized>(
    keys: types::MerchantKeys,
    network: types::VaultNetwork,
    provider: &P,
) -> Result<VaultInfo, RefundError> {
    let vault = Vault::new(keys, network)?;
    let balance = provider.get_balance(vault.address()).await?;
    info!("vault {} balance {}", vault.address(), balance);

    Ok(VaultInfo {
        address: vault.address().to_string(),
        script_pubkey: vault.script_pubkey().to_hex_string(),
        balance: balance.to_sat(),
    })
}
