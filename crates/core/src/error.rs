//! Errors that abort a flash liquidation unit.

use alloy::primitives::{Address, U256};
use thiserror::Error;

use flash_liquidator_chain::{LedgerError, ProtocolError};

/// Reason a flash liquidation unit failed.
///
/// Every variant aborts the unit; the host rolls back all mutations made
/// before the failure.
#[derive(Debug, Error)]
pub enum LiquidationError {
    #[error("malformed liquidation payload: {0}")]
    Decode(#[from] alloy::sol_types::Error),

    #[error("swap path mismatch: {0}")]
    PathMismatch(String),

    #[error("liquidation of {borrower} failed: {reason}")]
    LiquidationFailed { borrower: Address, reason: String },

    #[error("swap failed: {0}")]
    SwapFailed(String),

    #[error("insufficient repayment: balance {balance} < total due {total_due}")]
    InsufficientRepayment { balance: U256, total_due: U256 },

    #[error("no profit: balance {balance} only covers total due {total_due}")]
    NoProfit { balance: U256, total_due: U256 },

    #[error("unauthorized {role} {actual}, expected {expected}")]
    Unauthorized {
        role: &'static str,
        actual: Address,
        expected: Address,
    },

    #[error("unsupported flash loan: {0}")]
    UnsupportedLoan(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("collaborator error: {0}")]
    Protocol(ProtocolError),
}

impl From<ProtocolError> for LiquidationError {
    /// Unwrap errors raised inside the flash loan callback so the unit
    /// reports the step that actually failed, not the pool that relayed it.
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Receiver(inner) => match inner.downcast::<LiquidationError>() {
                Ok(err) => err,
                Err(other) => LiquidationError::Protocol(ProtocolError::Receiver(other)),
            },
            ProtocolError::Ledger(err) => LiquidationError::Ledger(err),
            other => LiquidationError::Protocol(other),
        }
    }
}

impl LiquidationError {
    /// Short stable label for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::PathMismatch(_) => "path_mismatch",
            Self::LiquidationFailed { .. } => "liquidation_failed",
            Self::SwapFailed(_) => "swap_failed",
            Self::InsufficientRepayment { .. } => "insufficient_repayment",
            Self::NoProfit { .. } => "no_profit",
            Self::Unauthorized { .. } => "unauthorized",
            Self::UnsupportedLoan(_) => "unsupported_loan",
            Self::Overflow(_) => "overflow",
            Self::Ledger(_) => "ledger",
            Self::Protocol(_) => "protocol",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receiver_error_is_unwrapped() {
        let inner = LiquidationError::InsufficientRepayment {
            balance: U256::from(1000u64),
            total_due: U256::from(1005u64),
        };
        let relayed = ProtocolError::Receiver(anyhow::Error::from(inner));

        let err = LiquidationError::from(relayed);
        assert!(matches!(err, LiquidationError::InsufficientRepayment { .. }));
        assert_eq!(err.kind(), "insufficient_repayment");
    }

    #[test]
    fn test_foreign_receiver_error_kept() {
        let relayed = ProtocolError::Receiver(anyhow::anyhow!("boom"));
        let err = LiquidationError::from(relayed);
        assert!(matches!(err, LiquidationError::Protocol(ProtocolError::Receiver(_))));
    }

    #[test]
    fn test_ledger_error_flattened() {
        let ledger = LedgerError::Overflow {
            token: Address::ZERO,
            holder: Address::ZERO,
        };
        let err = LiquidationError::from(ProtocolError::Ledger(ledger));
        assert!(matches!(err, LiquidationError::Ledger(_)));
    }
}
