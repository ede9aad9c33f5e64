use std::str::FromStr;

use super::*;
use bitcoin::ScriptBuf;

#[derive(Debug, Deserialize)]
pub(crate) struct Utxo {
    txid: String,
    vout: u32,
    value: u64,
    status: Status,
    #[serde(default)]
    token: Option<types::TokenData>,
}

#[derive(Debug, Deserialize)]
struct Status {
    confirmed: bool,
    #[serde(default, rename = "block_height")]
    _block_height: Option<u32>,
}

impl MempoolClient {
    pub(crate) async fn gets_utxo(
        &self,
        address: &Address,
        confirmed: bool,
    ) -> Result<Vec<types::Utxo>> {
        let url = format!("{}/api/address/{}/utxo", self.base_url, address);
        debug!("{}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("fetch utxo failed: {} {}", status, body));
        }

        let utxos: Vec<Utxo> = response.json().await?;
        debug!("address {} has {} utxos", address, utxos.len());
        into_utxos(utxos, &address.script_pubkey(), confirmed)
    }
}

/// Keeps the indexer's ordering.
pub(crate) fn into_utxos(
    utxos: Vec<Utxo>,
    script_pubkey: &ScriptBuf,
    confirmed: bool,
) -> Result<Vec<types::Utxo>> {
    let mut my_utxos: Vec<types::Utxo> = Vec::with_capacity(utxos.len());
    for utxo in utxos {
        if confirmed && !utxo.status.confirmed {
            continue;
        }

        let out_point = OutPoint::from_str(&format!("{}:{}", utxo.txid, utxo.vout))
            .map_err(|e| anyhow!("invalid outpoint {}:{}: {}", utxo.txid, utxo.vout, e))?;
        my_utxos.push(types::Utxo {
            out_point,
            value: Amount::from_sat(utxo.value),
            script_pubkey: script_pubkey.clone(),
            token: utxo.token,
        });
    }

    Ok(my_utxos)
}
