use std::str::FromStr;

use super::*;
use bitcoin::consensus::encode::serialize_hex;

impl MempoolClient {
    pub(crate) async fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        let url = format!("{}/api/tx", self.base_url);
        let tx_hex = serialize_hex(tx);
        debug!("broadcast {} to {}", tx.compute_txid(), url);
        let response = self.client.post(url).body(tx_hex).send().await?;
        let status = response.status();
        let resp = response.text().await?;
        if !status.is_success() {
            return Err(anyhow!("broadcast rejected: {} {}", status, resp));
        }

        parse_txid(&resp)
    }
}

fn parse_txid(body: &str) -> Result<Txid> {
    Txid::from_str(body.trim()).map_err(|e| anyhow!("unexpected broadcast response {:?}: {}", body, e))
}
