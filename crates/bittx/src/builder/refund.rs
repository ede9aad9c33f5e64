use bitcoin::PrivateKey;

use super::*;
use crate::builder::base::{build_tx, sum_values};
use crate::signer;
use crate::vault::Vault;

/// Spend of vault outputs through the emergency refund path.
#[derive(Debug, Clone)]
pub struct RefundCall<'a> {
    vault: &'a Vault,
    sender_pk: PublicKey,
    inputs: Vec<types::Utxo>,
    outputs: Vec<TxOut>,
    change: bool,
}

impl<'a> RefundCall<'a> {
    pub(crate) fn new(vault: &'a Vault, sender_pk: PublicKey) -> Self {
        Self {
            vault,
            sender_pk,
            inputs: Vec::new(),
            outputs: Vec::new(),
            change: true,
        }
    }

    pub fn from_utxos(mut self, utxos: Vec<types::Utxo>) -> Self {
        self.inputs.extend(utxos);
        self
    }

    pub fn to(mut self, address: &Address, amount: Amount) -> Self {
        self.outputs.push(TxOut {
            value: amount,
            script_pubkey: address.script_pubkey(),
        });
        self
    }

    /// Whatever the outputs leave over goes to fees.
    pub fn without_change(mut self) -> Self {
        self.change = false;
        self
    }

    /// Unsigned transaction plus the outputs it spends.
    ///
    /// Every requested output must pay the P2PKH address of `sender_pk`, so the
    /// signed refund can only reach the key it was built for.
    pub fn build(&self) -> Result<(Transaction, Vec<TxOut>), VaultError> {
        if self.inputs.is_empty() {
            return Err(VaultError::NoInputs);
        }
        if self.outputs.is_empty() {
            return Err(VaultError::NoOutputs);
        }
        if let Some(utxo) = self.inputs.iter().find(|utxo| utxo.has_token()) {
            return Err(VaultError::TokenInput(utxo.out_point));
        }
        if let Some(out) = self.outputs.iter().find(|out| out.value < DUST_LIMIT) {
            return Err(VaultError::Dust(out.value.to_sat()));
        }
        let sender = pubkey_to_address(&self.sender_pk, self.vault.network());
        let sender_script = sender.script_pubkey();
        if self
            .outputs
            .iter()
            .any(|out| out.script_pubkey != sender_script)
        {
            return Err(VaultError::SenderMismatch { sender });
        }

        let input_val = self
            .inputs
            .iter()
            .try_fold(Amount::ZERO, |total, utxo| total.checked_add(utxo.value))
            .ok_or_else(|| VaultError::Script("input value overflow".to_string()))?;
        let output_val = sum_values(&self.outputs);
        if input_val < output_val {
            return Err(VaultError::insufficient(output_val, input_val));
        }

        let mut outputs = self.outputs.clone();
        if self.change {
            let needed = output_val + FIXED_FEE;
            if input_val < needed {
                return Err(VaultError::insufficient(needed, input_val));
            }
            let change_amount = input_val - needed;
            if change_amount >= DUST_LIMIT {
                outputs.push(TxOut {
                    value: change_amount,
                    script_pubkey: self.vault.script_pubkey(),
                });
            }
        }

        // spent outputs are the vault's p2sh script whatever the indexer reported
        let inputs: Vec<types::Utxo> = self
            .inputs
            .iter()
            .map(|utxo| types::Utxo {
                script_pubkey: self.vault.script_pubkey(),
                ..utxo.clone()
            })
            .collect();

        Ok(build_tx(&inputs, outputs))
    }

    /// Builds and signs every input with the merchant signer key.
    pub fn sign(&self, signer_key: &PrivateKey) -> Result<Transaction, VaultError> {
        let (tx, _prevouts) = self.build()?;
        signer::sign_refund(self.vault, tx, &self.sender_pk, signer_key)
    }
}
