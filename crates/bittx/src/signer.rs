use super::*;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{ecdsa, PrivateKey};
use secp256k1::Secp256k1;

use crate::vault::Vault;

/// Signs every input of `tx` through the vault's emergency refund path.
///
/// Each script_sig becomes `<signer_sig> <sender_pk> OP_FALSE <redeem_script>`.
/// Signatures use the legacy SIGHASH_ALL digest without the Bitcoin Cash fork id.
pub fn sign_refund(
    vault: &Vault,
    mut tx: Transaction,
    sender_pk: &PublicKey,
    signer_key: &PrivateKey,
) -> Result<Transaction, VaultError> {
    let secp256k1 = Secp256k1::new();
    let expected = vault.keys().signer_pk;
    if signer_key.public_key(&secp256k1).inner != expected.inner {
        return Err(VaultError::SignerMismatch { expected });
    }

    let redeem_script = vault.redeem_script();
    let mut signatures = Vec::with_capacity(tx.input.len());
    {
        let cache = SighashCache::new(&tx);
        for idx in 0..tx.input.len() {
            let sighash = cache
                .legacy_signature_hash(idx, redeem_script, EcdsaSighashType::All.to_u32())
                .map_err(|e| VaultError::Sighash(e.to_string()))?;
            let msg = secp256k1::Message::from_digest_slice(sighash.as_ref())
                .map_err(|e| VaultError::Sighash(e.to_string()))?;
            let sig = secp256k1.sign_ecdsa(&msg, &signer_key.inner);
            signatures.push(ecdsa::Signature::sighash_all(sig));
        }
    }

    for (input, signature) in tx.input.iter_mut().zip(signatures) {
        input.script_sig = refund_script_sig(&signature, sender_pk, redeem_script)?;
    }

    info!(
        "signed refund tx {} hex : {}",
        tx.compute_txid(),
        serialize_hex(&tx)
    );
    Ok(tx)
}

fn refund_script_sig(
    signature: &ecdsa::Signature,
    sender_pk: &PublicKey,
    redeem_script: &ScriptBuf,
) -> Result<ScriptBuf, VaultError> {
    let sig = PushBytesBuf::try_from(signature.to_vec())
        .map_err(|e| VaultError::Script(e.to_string()))?;
    let redeem = PushBytesBuf::try_from(redeem_script.to_bytes())
        .map_err(|e| VaultError::Script(e.to_string()))?;

    Ok(Builder::new()
        .push_slice(sig)
        .push_key(sender_pk)
        .push_int(0)
        .push_slice(redeem)
        .into_script())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::tests::{chipnet_vault, private_key, public_key};
    use bitcoin::script::Instruction;
    use bitcoin::OutPoint;
    use std::str::FromStr;

    #[test]
    fn refund_signature_verifies_against_signer_key() {
        let vault = chipnet_vault();
        let sender_pk = public_key(0x44);
        let utxo = types::Utxo {
            out_point: OutPoint::from_str(
                "c997a5e56e104202fa209c6a852dd90660a20b2d9c352423edce25857fcd3704:1",
            )
            .unwrap(),
            value: Amount::from_sat(2000),
            ..Default::default()
        };
        let signed = vault
            .emergency_refund(sender_pk)
            .from_utxos(vec![utxo])
            .to(
                &pubkey_to_address(&sender_pk, types::VaultNetwork::Chipnet),
                Amount::from_sat(1000),
            )
            .without_change()
            .sign(&private_key(0x22))
            .unwrap();

        let pushes: Vec<Vec<u8>> = signed.input[0]
            .script_sig
            .instructions()
            .map(|ins| match ins.unwrap() {
                Instruction::PushBytes(bytes) => bytes.as_bytes().to_vec(),
                Instruction::Op(op) => vec![op.to_u8()],
            })
            .collect();
        assert_eq!(pushes.len(), 4);
        assert_eq!(pushes[1], sender_pk.to_bytes());
        assert!(pushes[2].is_empty());
        assert_eq!(pushes[3], vault.redeem_script().to_bytes());

        let signature = ecdsa::Signature::from_slice(&pushes[0]).unwrap();
        assert_eq!(signature.sighash_type, EcdsaSighashType::All);

        let mut unsigned = signed.clone();
        unsigned.input[0].script_sig = ScriptBuf::new();
        let sighash = SighashCache::new(&unsigned)
            .legacy_signature_hash(0, vault.redeem_script(), EcdsaSighashType::All.to_u32())
            .unwrap();
        let msg = secp256k1::Message::from_digest_slice(sighash.as_ref()).unwrap();
        let secp = Secp256k1::verification_only();
        assert!(secp
            .verify_ecdsa(&msg, &signature.signature, &vault.keys().signer_pk.inner)
            .is_ok());
    }
}
