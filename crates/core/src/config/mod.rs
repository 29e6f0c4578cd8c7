//! Configuration for the flash liquidation executor.
//!
//! This module provides:
//! - Executor runtime configuration (profiles, swap and settlement policy)
//! - `${VAR}` expansion shared by config and scenario files

mod env;
mod executor;

pub use env::expand_env;
pub use executor::{ExecutorConfig, FlashLoanConfig, SettlementConfig, SwapConfig};
