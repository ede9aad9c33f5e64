use super::*;

/// Assembles an unsigned transaction spending `inputs` into `outputs`.
/// Returns the transaction together with the spent outputs, in input order.
pub fn build_tx(inputs: &[types::Utxo], outputs: Vec<TxOut>) -> (Transaction, Vec<TxOut>) {
    let mut tx_ins = Vec::with_capacity(inputs.len());
    let mut prevouts = Vec::with_capacity(inputs.len());

    for input in inputs.iter() {
        let tx_in = TxIn {
            previous_output: input.out_point,
            script_sig: ScriptBuf::new(),
            sequence: Sequence(0xffffffff),
            witness: Witness::new(),
        };
        prevouts.push(TxOut {
            value: input.value,
            script_pubkey: input.script_pubkey.clone(),
        });
        tx_ins.push(tx_in);
    }

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: tx_ins,
        output: outputs,
    };

    (tx, prevouts)
}

pub fn sum_values(outs: &[TxOut]) -> Amount {
    outs.iter().map(|out| out.value).sum::<Amount>()
}
