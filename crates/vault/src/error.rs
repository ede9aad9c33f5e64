/// Errors surfaced by the refund and compile operations.
///
/// Finding nothing to refund is not an error; see [`crate::refund::RefundOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum RefundError {
    /// The caller supplied a value that does not parse or violates a bound.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The vault contract refused to build or sign the spend.
    #[error(transparent)]
    Contract(#[from] bittx::VaultError),

    /// Fetching outputs or submitting a transaction failed.
    #[error("provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

impl RefundError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}
