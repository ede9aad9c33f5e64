use bitcoin::{Amount, Network, OutPoint, PublicKey, ScriptBuf};
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub out_point: OutPoint,
    pub value: Amount,
    pub script_pubkey: ScriptBuf,
    pub token: Option<TokenData>,
}

impl Utxo {
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

/// Token payload attached to an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub category: String,
    #[serde(default)]
    pub amount: u64,
    #[serde(default)]
    pub nft: Option<Nft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nft {
    pub capability: String,
    #[serde(default)]
    pub commitment: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultNetwork {
    #[default]
    Mainnet,
    Chipnet,
}

impl VaultNetwork {
    /// Bitcoin parameters used for addresses and keys on this network.
    ///
    /// `mainnet` and `chipnet` are Bitcoin Cash networks. They are encoded with
    /// the legacy Bitcoin main and test parameters: base58 addresses rather than
    /// cashaddr, and no fork id in the signature hash.
    pub fn params(&self) -> Network {
        match self {
            VaultNetwork::Mainnet => Network::Bitcoin,
            VaultNetwork::Chipnet => Network::Testnet,
        }
    }
}

/// Vault constructor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerchantKeys {
    pub receiver_pk: PublicKey,
    pub signer_pk: PublicKey,
}
