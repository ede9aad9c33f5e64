use bitcoin::opcodes::all::{OP_CHECKSIG, OP_DROP, OP_ELSE, OP_ENDIF, OP_EQUALVERIFY, OP_IF, OP_SIZE};
use bitcoin::script::Builder;

use super::*;
use crate::builder::refund::RefundCall;

/// Length of a compressed secp256k1 public key.
const COMPRESSED_PUBKEY_LEN: i64 = 33;

/// Merchant vault: a P2SH contract with a claim path for the receiver key and
/// an emergency refund path co-signed by the signer key.
#[derive(Debug, Clone)]
pub struct Vault {
    keys: types::MerchantKeys,
    network: types::VaultNetwork,
    redeem_script: ScriptBuf,
    address: Address,
}

impl Vault {
    pub fn new(
        keys: types::MerchantKeys,
        network: types::VaultNetwork,
    ) -> Result<Self, VaultError> {
        let redeem_script = build_redeem_script(&keys);
        let address = Address::p2sh(&redeem_script, network.params())
            .map_err(|e| VaultError::Script(e.to_string()))?;
        debug!(
            "compiled vault {} redeem script {}",
            address,
            hex::encode(redeem_script.as_bytes())
        );

        Ok(Self {
            keys,
            network,
            redeem_script,
            address,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }

    pub fn redeem_script(&self) -> &ScriptBuf {
        &self.redeem_script
    }

    pub fn keys(&self) -> &types::MerchantKeys {
        &self.keys
    }

    pub fn network(&self) -> types::VaultNetwork {
        self.network
    }

    /// Starts an emergency refund spend recorded against `sender_pk`.
    pub fn emergency_refund(&self, sender_pk: PublicKey) -> RefundCall<'_> {
        RefundCall::new(self, sender_pk)
    }
}

// OP_IF
//   <receiver_pk> OP_CHECKSIG
// OP_ELSE
//   OP_SIZE 33 OP_EQUALVERIFY OP_DROP <signer_pk> OP_CHECKSIG
// OP_ENDIF
fn build_redeem_script(keys: &types::MerchantKeys) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_IF)
        .push_key(&keys.receiver_pk)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_ELSE)
        .push_opcode(OP_SIZE)
        .push_int(COMPRESSED_PUBKEY_LEN)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_DROP)
        .push_key(&keys.signer_pk)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_ENDIF)
        .into_script()
}
