//! Emergency refund of vault outputs back to their sender.
//!
//! The vault address collects payments from many senders. When a sender pays
//! by mistake the merchant returns the exact amount, minus a flat fee, by
//! spending one matching output through the contract's refund path.

use super::*;
use bittx::{DUST_LIMIT, FIXED_FEE};

/// Validated refund parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub sender_pk: PublicKey,
    pub sender_address: Address,
    pub refund_amount: Amount,
}

impl RefundRequest {
    /// Parses raw caller input, rejecting anything the contract could not use.
    pub fn parse(
        sender_pubkey: &str,
        sender_address: &str,
        refund_amount: &str,
        network: types::VaultNetwork,
    ) -> Result<Self, RefundError> {
        let sender_pk = PublicKey::from_str(sender_pubkey.trim())
            .map_err(|e| RefundError::invalid(format!("sender pubkey {:?}: {}", sender_pubkey, e)))?;
        if !sender_pk.compressed {
            return Err(RefundError::invalid("sender pubkey must be compressed"));
        }

        let sender_address = Address::from_str(sender_address.trim())
            .map_err(|e| RefundError::invalid(format!("sender address {:?}: {}", sender_address, e)))?
            .require_network(network.params())
            .map_err(|e| RefundError::invalid(format!("sender address: {}", e)))?;

        let sats: u64 = refund_amount
            .trim()
            .parse()
            .map_err(|e| RefundError::invalid(format!("refund amount {:?}: {}", refund_amount, e)))?;
        if sats == 0 {
            return Err(RefundError::invalid("refund amount must be > 0"));
        }

        Ok(Self {
            sender_pk,
            sender_address,
            refund_amount: Amount::from_sat(sats),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    pub txid: Txid,
    pub out_point: OutPoint,
    /// Value paid to the sender after the fee.
    pub amount: Amount,
    /// Refund attempts made on candidates, the successful one included.
    pub attempts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundOutcome {
    Refunded(RefundReceipt),
    /// No candidate was spendable. `attempts` counts failed refund attempts,
    /// whether they failed while signing or on submission.
    NotFound { candidates: usize, attempts: usize },
}

impl RefundOutcome {
    pub fn receipt(&self) -> Option<&RefundReceipt> {
        match self {
            RefundOutcome::Refunded(receipt) => Some(receipt),
            RefundOutcome::NotFound { .. } => None,
        }
    }
}

/// Outputs without a token payload whose value equals `amount` exactly,
/// in the order the provider returned them.
pub fn select_candidates(utxos: Vec<types::Utxo>, amount: Amount) -> Vec<types::Utxo> {
    utxos
        .into_iter()
        .filter(|utxo| !utxo.has_token() && utxo.value == amount)
        .collect()
}

/// Payout left after the flat fee, or `None` when it would be dust.
pub fn payout_after_fee(value: Amount) -> Option<Amount> {
    value
        .checked_sub(FIXED_FEE)
        .filter(|payout| *payout >= DUST_LIMIT)
}

/// Spends the first vault output matching `request` back to the sender.
///
/// Candidates are tried one at a time; a rejected submission moves on to the
/// next one and the first accepted spend ends the scan.
#[tracing::instrument(
    skip_all,
    fields(vault = %vault.address(), amount = request.refund_amount.to_sat())
)]
pub async fn emergency_refund<P: Provider + ?Sized>(
    vault: &Vault,
    provider: &P,
    signer_key: &PrivateKey,
    request: &RefundRequest,
) -> Result<RefundOutcome, RefundError> {
    let utxos = provider.get_utxos(vault.address()).await?;
    let total = utxos.len();
    let candidates = select_candidates(utxos, request.refund_amount);
    info!(
        "vault holds {} outputs, {} match the refund amount",
        total,
        candidates.len()
    );

    let mut attempts = 0;
    for utxo in candidates.iter() {
        let Some(payout) = payout_after_fee(utxo.value) else {
            debug!("skip {}: payout below dust", utxo.out_point);
            continue;
        };

        attempts += 1;
        match try_refund(vault, provider, signer_key, request, utxo, payout).await {
            Ok(txid) => {
                info!(
                    "refunded {} to {} spending {}, txid {}",
                    payout, request.sender_address, utxo.out_point, txid
                );
                return Ok(RefundOutcome::Refunded(RefundReceipt {
                    txid,
                    out_point: utxo.out_point,
                    amount: payout,
                    attempts,
                }));
            }
            Err(err) => {
                // several senders may have paid the same amount
                warn!("refund attempt on {} failed: {}", utxo.out_point, err);
            }
        }
    }

    Ok(RefundOutcome::NotFound {
        candidates: candidates.len(),
        attempts,
    })
}

async fn try_refund<P: Provider + ?Sized>(
    vault: &Vault,
    provider: &P,
    signer_key: &PrivateKey,
    request: &RefundRequest,
    utxo: &types::Utxo,
    payout: Amount,
) -> Result<Txid, RefundError> {
    let tx = vault
        .emergency_refund(request.sender_pk)
        .from_utxos(vec![utxo.clone()])
        .to(&request.sender_address, payout)
        .without_change()
        .sign(signer_key)?;
    let txid = provider.send_tx(&tx).await?;
    Ok(txid)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use bitcoin::Transaction;
    use std::collections::HashSet;
    use std::sync::Mutex;

    const TXID: &str = "c997a5e56e104202fa209c6a852dd90660a20b2d9c352423edce25857fcd3704";

    /// In-memory provider recording every submission.
    #[derive(Default)]
    pub(crate) struct FakeProvider {
        pub utxos: Vec<types::Utxo>,
        pub reject: HashSet<OutPoint>,
        pub fail_fetch: bool,
        pub sent: Mutex<Vec<Transaction>>,
    }

    impl FakeProvider {
        pub(crate) fn with_utxos(utxos: Vec<types::Utxo>) -> Self {
            Self {
                utxos,
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<Transaction> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for FakeProvider {
        async fn get_utxos(&self, _address: &Address) -> Result<Vec<types::Utxo>> {
            if self.fail_fetch {
                return Err(anyhow!("connection refused"));
            }
            Ok(self.utxos.clone())
        }

        async fn send_tx(&self, tx: &Transaction) -> Result<Txid> {
            self.sent.lock().unwrap().push(tx.clone());
            let spent = tx.input[0].previous_output;
            if self.reject.contains(&spent) {
                return Err(anyhow!("mandatory-script-verify-flag-failed"));
            }
            Ok(tx.compute_txid())
        }
    }

    pub(crate) fn private_key(byte: u8) -> PrivateKey {
        let secret = SecretKey::from_slice(&[byte; 32]).unwrap();
        PrivateKey::new(secret, bitcoin::Network::Testnet)
    }

    pub(crate) fn merchant_keys() -> types::MerchantKeys {
        let secp = Secp256k1::new();
        types::MerchantKeys {
            receiver_pk: private_key(0x11).public_key(&secp),
            signer_pk: private_key(0x22).public_key(&secp),
        }
    }

    pub(crate) fn utxo(vout: u32, sats: u64) -> types::Utxo {
        types::Utxo {
            out_point: OutPoint::from_str(&format!("{}:{}", TXID, vout)).unwrap(),
            value: Amount::from_sat(sats),
            ..Default::default()
        }
    }

    pub(crate) fn token_utxo(vout: u32, sats: u64) -> types::Utxo {
        types::Utxo {
            token: Some(types::TokenData {
                category: "x".to_string(),
                amount: 0,
                nft: None,
            }),
            ..utxo(vout, sats)
        }
    }

    fn vault() -> Vault {
        Vault::new(merchant_keys(), types::VaultNetwork::Chipnet).unwrap()
    }

    fn request(sats: u64) -> RefundRequest {
        let sender_pk = private_key(0x44).public_key(&Secp256k1::new());
        RefundRequest {
            sender_pk,
            sender_address: bittx::pubkey_to_address(&sender_pk, types::VaultNetwork::Chipnet),
            refund_amount: Amount::from_sat(sats),
        }
    }

    #[test]
    fn payout_respects_dust_threshold() {
        assert_eq!(payout_after_fee(Amount::from_sat(1545)), None);
        assert_eq!(
            payout_after_fee(Amount::from_sat(1546)),
            Some(Amount::from_sat(546))
        );
        assert_eq!(payout_after_fee(Amount::from_sat(500)), None);
    }

    #[test]
    fn candidates_keep_provider_order() {
        let utxos = vec![utxo(3, 5000), utxo(1, 4000), token_utxo(2, 5000), utxo(0, 5000)];
        let picked = select_candidates(utxos, Amount::from_sat(5000));
        let vouts: Vec<u32> = picked.iter().map(|u| u.out_point.vout).collect();
        assert_eq!(vouts, vec![3, 0]);
    }

    #[tokio::test]
    async fn nothing_matching_is_not_found() {
        let provider = FakeProvider::with_utxos(vec![utxo(0, 3000), token_utxo(1, 5000)]);
        let outcome = emergency_refund(&vault(), &provider, &private_key(0x22), &request(5000))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RefundOutcome::NotFound {
                candidates: 0,
                attempts: 0
            }
        );
        assert!(provider.sent().is_empty());
    }

    #[tokio::test]
    async fn dust_candidates_are_never_submitted() {
        let provider = FakeProvider::with_utxos(vec![utxo(0, 1500), utxo(1, 1500)]);
        let outcome = emergency_refund(&vault(), &provider, &private_key(0x22), &request(1500))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RefundOutcome::NotFound {
                candidates: 2,
                attempts: 0
            }
        );
        assert!(provider.sent().is_empty());
    }

    #[tokio::test]
    async fn single_match_refunds_amount_minus_fee() {
        let req = request(2000);
        let provider = FakeProvider::with_utxos(vec![utxo(0, 1000), utxo(1, 2000)]);
        let outcome = emergency_refund(&vault(), &provider, &private_key(0x22), &req)
            .await
            .unwrap();

        let receipt = outcome.receipt().unwrap();
        assert_eq!(receipt.amount, Amount::from_sat(1000));
        assert_eq!(receipt.out_point.vout, 1);
        assert_eq!(receipt.attempts, 1);

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].input.len(), 1);
        assert_eq!(sent[0].output.len(), 1);
        assert_eq!(sent[0].output[0].value, Amount::from_sat(1000));
        assert_eq!(
            sent[0].output[0].script_pubkey,
            req.sender_address.script_pubkey()
        );
        assert_eq!(receipt.txid, sent[0].compute_txid());
    }

    #[tokio::test]
    async fn rejected_submission_moves_to_next_candidate() {
        let mut provider = FakeProvider::with_utxos(vec![utxo(0, 2000), utxo(1, 2000)]);
        provider.reject.insert(utxo(0, 2000).out_point);
        let outcome = emergency_refund(&vault(), &provider, &private_key(0x22), &request(2000))
            .await
            .unwrap();

        let receipt = outcome.receipt().unwrap();
        assert_eq!(receipt.out_point.vout, 1);
        assert_eq!(receipt.attempts, 2);

        let sent = provider.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(receipt.txid, sent[1].compute_txid());
    }

    #[tokio::test]
    async fn first_success_stops_the_scan() {
        let provider =
            FakeProvider::with_utxos(vec![utxo(0, 2000), utxo(1, 2000), utxo(2, 2000)]);
        let outcome = emergency_refund(&vault(), &provider, &private_key(0x22), &request(2000))
            .await
            .unwrap();

        assert_eq!(outcome.receipt().unwrap().out_point.vout, 0);
        assert_eq!(provider.sent().len(), 1);
    }

    #[tokio::test]
    async fn token_outputs_are_excluded() {
        let provider = FakeProvider::with_utxos(vec![utxo(0, 5000), token_utxo(1, 5000)]);
        let outcome = emergency_refund(&vault(), &provider, &private_key(0x22), &request(5000))
            .await
            .unwrap();

        let receipt = outcome.receipt().unwrap();
        assert_eq!(receipt.out_point.vout, 0);
        assert_eq!(receipt.amount, Amount::from_sat(4000));

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].output[0].value, Amount::from_sat(4000));
    }

    #[tokio::test]
    async fn all_rejected_is_not_found() {
        let mut provider = FakeProvider::with_utxos(vec![utxo(0, 2000), utxo(1, 2000)]);
        provider.reject.insert(utxo(0, 2000).out_point);
        provider.reject.insert(utxo(1, 2000).out_point);
        let outcome = emergency_refund(&vault(), &provider, &private_key(0x22), &request(2000))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RefundOutcome::NotFound {
                candidates: 2,
                attempts: 2
            }
        );
    }

    #[tokio::test]
    async fn wrong_signer_fails_every_attempt_without_submitting() {
        let provider = FakeProvider::with_utxos(vec![utxo(0, 2000)]);
        let outcome = emergency_refund(&vault(), &provider, &private_key(0x55), &request(2000))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RefundOutcome::NotFound {
                candidates: 1,
                attempts: 1
            }
        );
        assert!(provider.sent().is_empty());
    }

    #[tokio::test]
    async fn address_of_another_key_is_never_paid() {
        let provider = FakeProvider::with_utxos(vec![utxo(0, 2000), utxo(1, 2000)]);
        let mut req = request(2000);
        let other = private_key(0x66).public_key(&Secp256k1::new());
        req.sender_address = bittx::pubkey_to_address(&other, types::VaultNetwork::Chipnet);
        let outcome = emergency_refund(&vault(), &provider, &private_key(0x22), &req)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RefundOutcome::NotFound {
                candidates: 2,
                attempts: 2
            }
        );
        assert!(provider.sent().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let provider = FakeProvider {
            fail_fetch: true,
            ..Default::default()
        };
        let res = emergency_refund(&vault(), &provider, &private_key(0x22), &request(2000)).await;
        assert!(matches!(res, Err(RefundError::Provider(_))));
    }

    #[test]
    fn parse_valid_request() {
        let sender_pk = private_key(0x44).public_key(&Secp256k1::new());
        let address = bittx::pubkey_to_address(&sender_pk, types::VaultNetwork::Chipnet);
        let req = RefundRequest::parse(
            &sender_pk.to_string(),
            &address.to_string(),
            " 5000 ",
            types::VaultNetwork::Chipnet,
        )
        .unwrap();

        assert_eq!(req.sender_pk, sender_pk);
        assert_eq!(req.sender_address, address);
        assert_eq!(req.refund_amount, Amount::from_sat(5000));
    }

    #[test]
    fn parse_rejects_bad_input() {
        let sender_pk = private_key(0x44).public_key(&Secp256k1::new());
        let pk = sender_pk.to_string();
        let address = bittx::pubkey_to_address(&sender_pk, types::VaultNetwork::Chipnet).to_string();
        let net = types::VaultNetwork::Chipnet;

        for amount in ["abc", "-5", "0", "", "12.5"] {
            let res = RefundRequest::parse(&pk, &address, amount, net);
            assert!(
                matches!(res, Err(RefundError::InvalidRequest(_))),
                "amount {:?}",
                amount
            );
        }

        let res = RefundRequest::parse("02deadbeef", &address, "5000", net);
        assert!(matches!(res, Err(RefundError::InvalidRequest(_))));

        let uncompressed = "042c0b7cf95324a07d05398b240174dc0c2be444d96b159aa6c7f7b1e668680991ae31a9c671a36543f46cea8fce6984608aa316aa0472a7eed08847440218cb2f";
        let res = RefundRequest::parse(uncompressed, &address, "5000", net);
        assert!(matches!(res, Err(RefundError::InvalidRequest(_))));

        // mainnet address on chipnet
        let res = RefundRequest::parse(&pk, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa", "5000", net);
        assert!(matches!(res, Err(RefundError::InvalidRequest(_))));
    }
}
