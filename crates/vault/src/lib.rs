pub mod compile;
pub mod config;
pub mod error;
pub mod refund;

use anyhow::{anyhow, Context, Result};
use bitcoin::{Address, Amount, OutPoint, PrivateKey, PublicKey, Txid};
use bittx::Vault;
use datatypes::types;
use mempool::Provider;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub use error::RefundError;
