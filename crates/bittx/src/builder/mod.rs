pub mod base;
pub mod refund;

use super::*;
