use bitcoin::{Address, Amount, OutPoint, PublicKey};

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("script build error: {0}")]
    Script(String),
    #[error("refund call has no input")]
    NoInputs,
    #[error("refund call has no output")]
    NoOutputs,
    #[error("input {0} carries a token payload")]
    TokenInput(OutPoint),
    #[error("output of {0} sat is below dust")]
    Dust(u64),
    #[error("refund output must pay the sender address {sender}")]
    SenderMismatch { sender: Address },
    #[error("insufficient funds: need {needed} sat, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("signing key does not match vault signer {expected}")]
    SignerMismatch { expected: PublicKey },
    #[error("signature hash error: {0}")]
    Sighash(String),
}

impl VaultError {
    pub(crate) fn insufficient(needed: Amount, available: Amount) -> Self {
        Self::InsufficientFunds {
            needed: needed.to_sat(),
            available: available.to_sat(),
        }
    }
}
