//! Flash liquidation executor.
//!
//! [`FlashLiquidator`] borrows the debt asset from the lending pool, and
//! inside the pool's callback liquidates the borrower, routes the seized
//! collateral back into the debt asset, pays out the surplus and
//! authorizes the pool to pull principal plus premium. The whole sequence
//! runs as one [`Host`] unit: any failure leaves the ledger untouched.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use flash_liquidator_chain::{
    FlashLoanReceiver, Host, LendingPool, Ledger, LiquidationCallParams, LoanCallback, SwapRouter,
};

use crate::config::ExecutorConfig;
use crate::error::LiquidationError;
use crate::instruction::{FlashRequest, LiquidationInstruction};
use crate::path::{validate_route, validate_swap_input};
use crate::settlement::{settle, RepaymentObligation, SettlementReport};
use crate::swap::{execute_swap, SwapOutcome};

/// Progress of the current (or last) flash liquidation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitState {
    #[default]
    Idle,
    LoanRequested,
    Liquidating,
    Swapping,
    Settling,
    Repaid,
    Aborted,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::LoanRequested => "loan_requested",
            Self::Liquidating => "liquidating",
            Self::Swapping => "swapping",
            Self::Settling => "settling",
            Self::Repaid => "repaid",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Flash liquidation executor.
pub struct FlashLiquidator<P, R> {
    /// Executor account: receives the loan and the collateral
    address: Address,

    /// Only account allowed to start units and rescue tokens
    owner: Address,

    /// Receives the settlement surplus
    beneficiary: Address,

    pool: Arc<P>,

    router: Arc<R>,

    config: ExecutorConfig,

    state: Mutex<UnitState>,

    /// Held for the whole of a unit so state transitions do not interleave
    unit: Mutex<()>,
}

impl<P: LendingPool, R: SwapRouter> FlashLiquidator<P, R> {
    /// Create an executor at `address` owned by `owner`. The owner is also
    /// the beneficiary until [`Self::with_beneficiary`] says otherwise.
    pub fn new(address: Address, owner: Address, pool: Arc<P>, router: Arc<R>) -> Self {
        Self {
            address,
            owner,
            beneficiary: owner,
            pool,
            router,
            config: ExecutorConfig::default(),
            state: Mutex::new(UnitState::Idle),
            unit: Mutex::new(()),
        }
    }

    /// Send the surplus to `beneficiary` instead of the owner.
    pub fn with_beneficiary(mut self, beneficiary: Address) -> Self {
        self.beneficiary = beneficiary;
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn beneficiary(&self) -> Address {
        self.beneficiary
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// State of the current unit, or the terminal state of the last one.
    pub fn state(&self) -> UnitState {
        *self.state.lock()
    }

    /// Flash-borrow `amount` of `debt_asset` and liquidate per `instruction`.
    ///
    /// The route is validated before the loan is requested, so an
    /// incoherent route never touches the ledger.
    #[instrument(skip(self, host, instruction), fields(borrower = %instruction.borrower))]
    pub fn liquidate(
        &self,
        host: &Host,
        caller: Address,
        debt_asset: Address,
        amount: U256,
        instruction: &LiquidationInstruction,
    ) -> Result<SettlementReport, LiquidationError> {
        self.ensure_owner(caller)?;

        let _unit = self.unit.lock();
        let result = self.run_unit(host, debt_asset, amount, instruction);
        match &result {
            Ok(report) => {
                self.transition(UnitState::Repaid);
                info!(
                    borrower = %report.borrower,
                    total_due = %report.total_due,
                    profit = %report.profit,
                    "[LIQUIDATE] Flash liquidation committed"
                );
            }
            Err(err) => {
                self.transition(UnitState::Aborted);
                warn!(
                    borrower = %instruction.borrower,
                    kind = err.kind(),
                    error = %err,
                    "[LIQUIDATE] Flash liquidation aborted"
                );
            }
        }
        result
    }

    /// Sweep the executor's entire `token` balance to `to`. Returns the
    /// amount moved.
    #[instrument(skip(self, host))]
    pub fn rescue_tokens(
        &self,
        host: &Host,
        caller: Address,
        token: Address,
        to: Address,
    ) -> Result<U256, LiquidationError> {
        self.ensure_owner(caller)?;

        let amount = host.execute(|ledger| {
            let balance = ledger.balance_of(token, self.address);
            if !balance.is_zero() {
                ledger.transfer(token, self.address, to, balance)?;
            }
            Ok::<_, LiquidationError>(balance)
        })?;

        info!(token = %token, to = %to, amount = %amount, "[RESCUE] Tokens rescued");
        Ok(amount)
    }

    fn run_unit(
        &self,
        host: &Host,
        debt_asset: Address,
        amount: U256,
        instruction: &LiquidationInstruction,
    ) -> Result<SettlementReport, LiquidationError> {
        validate_route(instruction, debt_asset)?;

        let request = FlashRequest::new(debt_asset, amount).into_pool_request(
            self.address,
            instruction.encode(),
            self.config.flash_loan.referral_code,
        );

        self.transition(UnitState::LoanRequested);
        info!(
            borrower = %instruction.borrower,
            debt_asset = %debt_asset,
            collateral = %instruction.collateral_asset,
            amount = %amount,
            hops = instruction.hops(),
            "[LIQUIDATE] Requesting flash loan"
        );

        let beneficiary_before = host.read(|ledger| ledger.balance_of(debt_asset, self.beneficiary));

        let receiver = UnitReceiver::new(self);
        let report = host.execute(|ledger| {
            self.pool.flash_loan(ledger, self.address, &receiver, request)?;
            receiver.take_report().ok_or_else(|| {
                LiquidationError::UnsupportedLoan("pool completed without invoking the callback".to_string())
            })
        })?;

        let beneficiary_after = host.read(|ledger| ledger.balance_of(debt_asset, self.beneficiary));
        let received = beneficiary_after.saturating_sub(beneficiary_before);
        if received != report.profit {
            warn!(
                expected = %report.profit,
                received = %received,
                "[SETTLE] Beneficiary balance moved by a different amount than the profit"
            );
        }

        Ok(report)
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), LiquidationError> {
        if caller != self.owner {
            return Err(LiquidationError::Unauthorized {
                role: "owner",
                actual: caller,
                expected: self.owner,
            });
        }
        Ok(())
    }

    fn transition(&self, next: UnitState) {
        let mut state = self.state.lock();
        let prev = *state;
        debug!(from = %prev, to = %next, "Unit state");
        *state = next;
    }

    /// Callback body. Runs on the pool's staged ledger.
    fn handle_loan(&self, ledger: &mut Ledger, callback: &LoanCallback) -> Result<SettlementReport, LiquidationError> {
        if callback.caller != self.pool.address() {
            return Err(LiquidationError::Unauthorized {
                role: "callback caller",
                actual: callback.caller,
                expected: self.pool.address(),
            });
        }
        if callback.initiator != self.address {
            return Err(LiquidationError::Unauthorized {
                role: "loan initiator",
                actual: callback.initiator,
                expected: self.address,
            });
        }

        let (debt_asset, amount, premium) = match (
            callback.assets.as_slice(),
            callback.amounts.as_slice(),
            callback.premiums.as_slice(),
        ) {
            ([asset], [amount], [premium]) => (*asset, *amount, *premium),
            _ => {
                return Err(LiquidationError::UnsupportedLoan(format!(
                    "expected one asset, got {} assets, {} amounts, {} premiums",
                    callback.assets.len(),
                    callback.amounts.len(),
                    callback.premiums.len()
                )))
            }
        };

        let instruction = LiquidationInstruction::decode(&callback.params)?;
        validate_route(&instruction, debt_asset)?;
        validate_swap_input(&instruction, self.pool.wrapped_asset(instruction.collateral_asset))?;

        let obligation = RepaymentObligation::new(amount, premium)?;

        self.transition(UnitState::Liquidating);
        self.liquidate_position(ledger, debt_asset, amount, &instruction)?;

        let swap = if instruction.needs_swap() {
            self.transition(UnitState::Swapping);
            execute_swap(
                ledger,
                self.router.as_ref(),
                self.address,
                &instruction,
                &obligation,
                self.config.swap_settings(),
            )?
        } else {
            None
        };

        self.transition(UnitState::Settling);
        self.settle_loan(ledger, debt_asset, &instruction, &obligation, swap)
    }

    fn liquidate_position(
        &self,
        ledger: &mut Ledger,
        debt_asset: Address,
        amount: U256,
        instruction: &LiquidationInstruction,
    ) -> Result<(), LiquidationError> {
        let receive_wrapped = instruction.receive_wrapped();
        ledger.approve(debt_asset, self.address, self.pool.address(), amount);

        let params = LiquidationCallParams {
            collateral_asset: instruction.collateral_asset,
            debt_asset,
            borrower: instruction.borrower,
            debt_to_cover: amount,
            receive_wrapped,
        };

        match self.pool.liquidation_call(ledger, self.address, params) {
            Ok(true) => {
                debug!(
                    borrower = %instruction.borrower,
                    receive_wrapped,
                    "[LIQUIDATE] Position liquidated"
                );
                Ok(())
            }
            Ok(false) => Err(LiquidationError::LiquidationFailed {
                borrower: instruction.borrower,
                reason: "pool declined the liquidation".to_string(),
            }),
            Err(err) => Err(LiquidationError::LiquidationFailed {
                borrower: instruction.borrower,
                reason: err.to_string(),
            }),
        }
    }

    fn settle_loan(
        &self,
        ledger: &mut Ledger,
        debt_asset: Address,
        instruction: &LiquidationInstruction,
        obligation: &RepaymentObligation,
        swap: Option<SwapOutcome>,
    ) -> Result<SettlementReport, LiquidationError> {
        let final_balance = ledger.balance_of(debt_asset, self.address);
        let result = settle(final_balance, obligation, self.config.settlement.profit_policy)?;

        if !result.profit.is_zero() {
            ledger.transfer(debt_asset, self.address, self.beneficiary, result.profit)?;
        }
        ledger.approve(debt_asset, self.address, self.pool.address(), obligation.total_due);

        debug!(
            final_balance = %result.final_balance,
            total_due = %obligation.total_due,
            profit = %result.profit,
            "[SETTLE] Repayment authorized"
        );

        Ok(SettlementReport {
            borrower: instruction.borrower,
            collateral_asset: instruction.collateral_asset,
            debt_asset,
            principal: obligation.principal,
            fee: obligation.fee,
            total_due: obligation.total_due,
            final_balance: result.final_balance,
            profit: result.profit,
            amount_swapped: swap.map_or(U256::ZERO, |s| s.amount_in),
            amount_received: swap.map_or(U256::ZERO, |s| s.amount_out),
            beneficiary: self.beneficiary,
        })
    }
}

/// Callback target for a single unit. The report it collects is returned
/// from the same staged execution that commits the unit.
struct UnitReceiver<'a, P, R> {
    liquidator: &'a FlashLiquidator<P, R>,
    report: Mutex<Option<SettlementReport>>,
}

impl<'a, P, R> UnitReceiver<'a, P, R> {
    fn new(liquidator: &'a FlashLiquidator<P, R>) -> Self {
        Self {
            liquidator,
            report: Mutex::new(None),
        }
    }

    fn take_report(&self) -> Option<SettlementReport> {
        self.report.lock().take()
    }
}

impl<P: LendingPool, R: SwapRouter> FlashLoanReceiver for UnitReceiver<'_, P, R> {
    fn address(&self) -> Address {
        self.liquidator.address
    }

    fn on_loan_received(&self, ledger: &mut Ledger, callback: &LoanCallback) -> anyhow::Result<bool> {
        let report = self.liquidator.handle_loan(ledger, callback)?;
        *self.report.lock() = Some(report);
        Ok(true)
    }
}

impl<P, R> fmt::Debug for FlashLiquidator<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlashLiquidator")
            .field("address", &self.address)
            .field("owner", &self.owner)
            .field("beneficiary", &self.beneficiary)
            .field("profile", &self.config.profile)
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;
    use flash_liquidator_chain::{ReserveConfig, SimLendingPool, SimSwapRouter};

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn executor() -> FlashLiquidator<SimLendingPool, SimSwapRouter> {
        let pool = SimLendingPool::new(addr(0xAA)).with_reserve(ReserveConfig {
            asset: addr(0x01),
            wrapped: addr(0x11),
            debt_token: addr(0x21),
            price: U256::from(1u64),
            liquidation_threshold_bps: 8000,
        });
        FlashLiquidator::new(
            addr(0xC0),
            addr(0x0A),
            Arc::new(pool),
            Arc::new(SimSwapRouter::new(addr(0xEE))),
        )
    }

    fn callback(caller: Address, initiator: Address) -> LoanCallback {
        LoanCallback {
            caller,
            assets: vec![addr(0x01)],
            amounts: vec![U256::from(1000u64)],
            premiums: vec![U256::from(5u64)],
            initiator,
            params: LiquidationInstruction::new(addr(0x01), addr(0xB0)).encode(),
        }
    }

    #[test]
    fn test_new_defaults() {
        let executor = executor();
        assert_eq!(executor.state(), UnitState::Idle);
        assert_eq!(executor.beneficiary(), executor.owner());
        assert_eq!(executor.with_beneficiary(addr(0x0B)).beneficiary(), addr(0x0B));
    }

    #[test]
    fn test_foreign_callback_caller_rejected() {
        let executor = executor();
        let mut ledger = Ledger::new(0);
        let err = executor
            .handle_loan(&mut ledger, &callback(addr(0x99), addr(0xC0)))
            .unwrap_err();
        assert!(matches!(err, LiquidationError::Unauthorized { role: "callback caller", .. }));
    }

    #[test]
    fn test_foreign_initiator_rejected() {
        let executor = executor();
        let mut ledger = Ledger::new(0);
        let err = executor
            .handle_loan(&mut ledger, &callback(addr(0xAA), addr(0x99)))
            .unwrap_err();
        assert!(matches!(err, LiquidationError::Unauthorized { role: "loan initiator", .. }));
    }

    #[test]
    fn test_multi_asset_loan_rejected() {
        let executor = executor();
        let mut ledger = Ledger::new(0);
        let mut cb = callback(addr(0xAA), addr(0xC0));
        cb.assets.push(addr(0x02));
        cb.amounts.push(U256::from(1u64));
        cb.premiums.push(U256::ZERO);

        let err = executor.handle_loan(&mut ledger, &cb).unwrap_err();
        assert!(matches!(err, LiquidationError::UnsupportedLoan(_)));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let executor = executor();
        let mut ledger = Ledger::new(0);
        let mut cb = callback(addr(0xAA), addr(0xC0));
        cb.params = Bytes::from(cb.params[..40].to_vec());

        let err = executor.handle_loan(&mut ledger, &cb).unwrap_err();
        assert!(matches!(err, LiquidationError::Decode(_)));
        assert!(ledger.trace().is_empty());
    }

    #[test]
    fn test_declined_liquidation_fails_step() {
        let executor = executor();
        let mut ledger = Ledger::new(0);
        // Borrower has no debt, so the pool declines
        let err = executor
            .handle_loan(&mut ledger, &callback(addr(0xAA), addr(0xC0)))
            .unwrap_err();
        assert!(matches!(err, LiquidationError::LiquidationFailed { .. }));
        assert_eq!(executor.state(), UnitState::Liquidating);
    }

    #[test]
    fn test_unit_state_display() {
        assert_eq!(UnitState::LoanRequested.to_string(), "loan_requested");
        assert_eq!(UnitState::default(), UnitState::Idle);
    }
}
