//! Contract bindings for the flash liquidation collaborators.
//!
//! This module provides `sol!` definitions and calldata encoders for the
//! lending pool, the flash loan receiver callback, the swap router, and
//! ERC20 tokens. The ledger records every collaborator call as ABI
//! calldata built from these bindings, so a unit's call trace can be
//! inspected and decoded exactly as it would be on chain.
//!
//! # Example
//!
//! ```rust,ignore
//! use flash_liquidator_chain::contracts::{aave_v3, router};
//!
//! let calldata = aave_v3::encode_pool_liquidation(collateral, debt, user, amount, false);
//! let extras = vec![router::encode_hop_fee(3000).unwrap_or_default()];
//! ```

pub mod aave_v3;
pub mod common;
pub mod router;

pub use aave_v3::{IFlashLoanReceiver, IPool};
pub use common::IERC20;
pub use router::ISwapRouter;
