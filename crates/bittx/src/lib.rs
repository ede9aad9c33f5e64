use bitcoin::absolute::LockTime;
use bitcoin::blockdata::transaction::{Transaction, TxIn, TxOut};
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, PublicKey, ScriptBuf, Sequence, Witness};
use datatypes::types;
use tracing::{debug, info};

pub mod builder;
pub mod error;
pub mod signer;
pub mod vault;

pub use error::VaultError;
pub use vault::Vault;

/// Flat fee taken from every refunded output.
pub const FIXED_FEE: Amount = Amount::from_sat(1000);

/// Smallest output value the network relays.
pub const DUST_LIMIT: Amount = Amount::from_sat(546);

/// P2PKH address of a sender key, the default refund destination.
pub fn pubkey_to_address(pubkey: &PublicKey, network: types::VaultNetwork) -> Address {
    Address::p2pkh(pubkey.pubkey_hash(), network.params())
}
