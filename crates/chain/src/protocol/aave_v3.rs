//! In-memory AAVE V3 style lending pool.
//!
//! Reserve layout follows AAVE V3: the underlying liquidity of each reserve
//! sits at its wrapped (aToken) address, suppliers hold the wrapped token
//! 1:1, and borrowers hold a debt token per borrowed reserve. Prices are
//! quoted per smallest unit and all reserves are assumed to share the same
//! decimals.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use tracing::debug;

use super::{
    FlashLoanReceiver, FlashLoanRequest, LendingPool, LiquidationCallParams, LoanCallback,
    ProtocolError,
};
use crate::contracts::aave_v3::{
    encode_execute_operation, encode_flash_loan, encode_pool_liquidation,
};
use crate::ledger::Ledger;
use crate::u256_math;

/// Default flash loan premium (0.09%)
const DEFAULT_PREMIUM_BPS: u16 = 9;

/// Default liquidation bonus (5%)
const DEFAULT_LIQUIDATION_BONUS_BPS: u16 = 500;

/// Reserve configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveConfig {
    /// Underlying token address
    pub asset: Address,
    /// Wrapped (aToken) address; also holds the underlying liquidity
    pub wrapped: Address,
    /// Variable debt token address
    pub debt_token: Address,
    /// Price per smallest unit
    pub price: U256,
    /// Liquidation threshold in basis points (8000 = 80%)
    pub liquidation_threshold_bps: u16,
}

/// AAVE V3 style pool backed by the ledger.
#[derive(Debug, Clone)]
pub struct SimLendingPool {
    address: Address,
    premium_bps: u16,
    liquidation_bonus_bps: u16,
    reserves: HashMap<Address, ReserveConfig>,
}

impl SimLendingPool {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            premium_bps: DEFAULT_PREMIUM_BPS,
            liquidation_bonus_bps: DEFAULT_LIQUIDATION_BONUS_BPS,
            reserves: HashMap::new(),
        }
    }

    /// Set the flash loan premium.
    pub fn with_premium_bps(mut self, premium_bps: u16) -> Self {
        self.premium_bps = premium_bps;
        self
    }

    /// Set the liquidation bonus.
    pub fn with_liquidation_bonus_bps(mut self, bonus_bps: u16) -> Self {
        self.liquidation_bonus_bps = bonus_bps;
        self
    }

    /// List a reserve.
    pub fn with_reserve(mut self, reserve: ReserveConfig) -> Self {
        self.reserves.insert(reserve.asset, reserve);
        self
    }

    pub fn reserve(&self, asset: Address) -> Result<&ReserveConfig, ProtocolError> {
        self.reserves
            .get(&asset)
            .ok_or(ProtocolError::UnknownReserve(asset))
    }

    /// Premium owed on a flash loan of `amount`.
    pub fn premium_for(&self, amount: U256) -> Result<U256, ProtocolError> {
        u256_math::bps_of(amount, self.premium_bps).ok_or(ProtocolError::Overflow("premium"))
    }

    /// Add lendable liquidity to a reserve.
    pub fn supply(&self, ledger: &mut Ledger, asset: Address, amount: U256) -> Result<(), ProtocolError> {
        let reserve = self.reserve(asset)?;
        ledger.mint(asset, reserve.wrapped, amount)?;
        Ok(())
    }

    /// Open a borrower position: `collateral_amount` supplied, `debt_amount` owed.
    pub fn open_position(
        &self,
        ledger: &mut Ledger,
        borrower: Address,
        collateral_asset: Address,
        collateral_amount: U256,
        debt_asset: Address,
        debt_amount: U256,
    ) -> Result<(), ProtocolError> {
        let collateral = self.reserve(collateral_asset)?;
        let debt = self.reserve(debt_asset)?;

        ledger.mint(collateral.asset, collateral.wrapped, collateral_amount)?;
        ledger.mint(collateral.wrapped, borrower, collateral_amount)?;
        ledger.mint(debt.debt_token, borrower, debt_amount)?;
        Ok(())
    }

    /// Borrower health factor in WAD.
    pub fn health_factor(&self, ledger: &Ledger, borrower: Address) -> Result<U256, ProtocolError> {
        let mut collateral_adjusted = U256::ZERO;
        let mut debt_value = U256::ZERO;

        for reserve in self.reserves.values() {
            let supplied = ledger.balance_of(reserve.wrapped, borrower);
            if !supplied.is_zero() {
                let value = supplied
                    .checked_mul(reserve.price)
                    .ok_or(ProtocolError::Overflow("collateral value"))?;
                let adjusted = u256_math::bps_of(value, reserve.liquidation_threshold_bps)
                    .ok_or(ProtocolError::Overflow("collateral value"))?;
                collateral_adjusted = collateral_adjusted
                    .checked_add(adjusted)
                    .ok_or(ProtocolError::Overflow("collateral value"))?;
            }

            let owed = ledger.balance_of(reserve.debt_token, borrower);
            if !owed.is_zero() {
                let value = owed
                    .checked_mul(reserve.price)
                    .ok_or(ProtocolError::Overflow("debt value"))?;
                debt_value = debt_value
                    .checked_add(value)
                    .ok_or(ProtocolError::Overflow("debt value"))?;
            }
        }

        Ok(u256_math::calculate_hf_wad(collateral_adjusted, debt_value))
    }

    /// Collateral seized for covering `covered` debt, before capping.
    fn collateral_for(
        &self,
        covered: U256,
        debt: &ReserveConfig,
        collateral: &ReserveConfig,
    ) -> Result<U256, ProtocolError> {
        let debt_value = covered
            .checked_mul(debt.price)
            .ok_or(ProtocolError::Overflow("seized collateral"))?;
        let with_bonus = u256_math::apply_basis_points_up(debt_value, self.liquidation_bonus_bps)
            .ok_or(ProtocolError::Overflow("seized collateral"))?;
        if collateral.price.is_zero() {
            return Err(ProtocolError::Overflow("seized collateral"));
        }
        Ok(with_bonus / collateral.price)
    }
}

impl LendingPool for SimLendingPool {
    fn address(&self) -> Address {
        self.address
    }

    fn wrapped_asset(&self, asset: Address) -> Option<Address> {
        self.reserves.get(&asset).map(|r| r.wrapped)
    }

    fn flash_loan(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        receiver: &dyn FlashLoanReceiver,
        request: FlashLoanRequest,
    ) -> Result<(), ProtocolError> {
        if request.assets.is_empty()
            || request.assets.len() != request.amounts.len()
            || request.assets.len() != request.modes.len()
        {
            return Err(ProtocolError::InvalidRequest(format!(
                "{} assets, {} amounts, {} modes",
                request.assets.len(),
                request.amounts.len(),
                request.modes.len()
            )));
        }
        if receiver.address() != request.receiver {
            return Err(ProtocolError::InvalidRequest(format!(
                "receiver {} does not match request receiver {}",
                receiver.address(),
                request.receiver
            )));
        }
        if let Some(mode) = request.modes.iter().copied().find(|m| *m != 0) {
            return Err(ProtocolError::UnsupportedMode(mode));
        }

        ledger.record(
            caller,
            self.address,
            encode_flash_loan(
                request.receiver,
                request.assets.clone(),
                request.amounts.clone(),
                &request.modes,
                request.on_behalf_of,
                request.params.clone(),
                request.referral_code,
            ),
        );

        let mut premiums = Vec::with_capacity(request.assets.len());
        for (asset, amount) in request.assets.iter().zip(&request.amounts) {
            let reserve = self.reserve(*asset)?;
            premiums.push(self.premium_for(*amount)?);
            ledger.transfer(*asset, reserve.wrapped, request.receiver, *amount)?;
        }

        let callback = LoanCallback {
            caller: self.address,
            assets: request.assets.clone(),
            amounts: request.amounts.clone(),
            premiums: premiums.clone(),
            initiator: caller,
            params: request.params.clone(),
        };
        ledger.record(
            self.address,
            request.receiver,
            encode_execute_operation(
                callback.assets.clone(),
                callback.amounts.clone(),
                callback.premiums.clone(),
                callback.initiator,
                callback.params.clone(),
            ),
        );

        let accepted = receiver
            .on_loan_received(ledger, &callback)
            .map_err(ProtocolError::Receiver)?;
        if !accepted {
            return Err(ProtocolError::CallbackRejected(request.receiver));
        }

        for ((asset, amount), premium) in request.assets.iter().zip(&request.amounts).zip(&premiums) {
            let reserve = self.reserve(*asset)?;
            let due = amount
                .checked_add(*premium)
                .ok_or(ProtocolError::Overflow("flash loan repayment"))?;
            ledger.transfer_from(*asset, self.address, request.receiver, reserve.wrapped, due)?;

            debug!(
                asset = %asset,
                amount = %amount,
                premium = %premium,
                "[POOL] Flash loan repaid"
            );
        }

        Ok(())
    }

    fn liquidation_call(
        &self,
        ledger: &mut Ledger,
        caller: Address,
        params: LiquidationCallParams,
    ) -> Result<bool, ProtocolError> {
        let collateral = self.reserve(params.collateral_asset)?;
        let debt = self.reserve(params.debt_asset)?;

        ledger.record(
            caller,
            self.address,
            encode_pool_liquidation(
                params.collateral_asset,
                params.debt_asset,
                params.borrower,
                params.debt_to_cover,
                params.receive_wrapped,
            ),
        );

        let owed = ledger.balance_of(debt.debt_token, params.borrower);
        if owed.is_zero() {
            debug!(borrower = %params.borrower, "[POOL] No debt to liquidate");
            return Ok(false);
        }

        let hf = self.health_factor(ledger, params.borrower)?;
        if !u256_math::is_liquidatable_wad(hf) {
            debug!(borrower = %params.borrower, hf = %hf, "[POOL] Position is healthy");
            return Ok(false);
        }

        let covered = params.debt_to_cover.min(owed);
        let available = ledger.balance_of(collateral.wrapped, params.borrower);
        let seized = self.collateral_for(covered, debt, collateral)?.min(available);
        if seized.is_zero() {
            debug!(borrower = %params.borrower, "[POOL] No collateral to seize");
            return Ok(false);
        }

        ledger.transfer_from(debt.asset, self.address, caller, debt.wrapped, covered)?;
        ledger.burn(debt.debt_token, params.borrower, covered)?;

        if params.receive_wrapped {
            ledger.transfer(collateral.wrapped, params.borrower, caller, seized)?;
        } else {
            ledger.burn(collateral.wrapped, params.borrower, seized)?;
            ledger.transfer(collateral.asset, collateral.wrapped, caller, seized)?;
        }

        debug!(
            borrower = %params.borrower,
            covered = %covered,
            seized = %seized,
            wrapped = params.receive_wrapped,
            "[POOL] Liquidation executed"
        );

        Ok(true)
    }
}
