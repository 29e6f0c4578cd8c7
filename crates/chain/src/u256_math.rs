//! Checked U256 arithmetic for ledger and protocol accounting.
//!
//! Every helper here returns `None` on overflow instead of wrapping, so
//! callers can surface a hard error rather than silently corrupting a
//! balance.

use alloy::primitives::U256;

/// WAD constant: 1e18 for 18-decimal fixed-point arithmetic
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Basis points denominator (10000 = 100%)
pub const BPS_DENOMINATOR: U256 = U256::from_limbs([10000u64, 0, 0, 0]);

/// Fee denominator for per-hop router fees (1_000_000 = 100%, Uniswap style).
pub const FEE_DENOMINATOR: U256 = U256::from_limbs([1_000_000u64, 0, 0, 0]);

/// `value * bps / 10000`, rounded down.
///
/// Example: bps_of(1000, 50) = 5
#[inline]
pub fn bps_of(value: U256, basis_points: u16) -> Option<U256> {
    value
        .checked_mul(U256::from(basis_points))
        .map(|v| v / BPS_DENOMINATOR)
}

/// Apply basis points increase (e.g., for a liquidation bonus).
/// Returns: value * (10000 + basis_points) / 10000
///
/// Example: apply_basis_points_up(1000, 500) = 1050
#[inline]
pub fn apply_basis_points_up(value: U256, basis_points: u16) -> Option<U256> {
    let factor = U256::from(10000u32 + basis_points as u32);
    value.checked_mul(factor).map(|v| v / BPS_DENOMINATOR)
}

/// `a * b / denominator` with overflow detection on the product.
///
/// Returns `None` on overflow or a zero denominator.
#[inline]
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    a.checked_mul(b).map(|v| v / denominator)
}

/// Calculate health factor in WAD (18 decimals).
/// HF = (total_collateral_adjusted * 10^18) / total_debt
///
/// Returns U256::MAX if debt is zero.
#[inline]
pub fn calculate_hf_wad(collateral_adjusted: U256, debt: U256) -> U256 {
    if debt.is_zero() {
        return U256::MAX;
    }
    collateral_adjusted.saturating_mul(WAD) / debt
}

/// Check if health factor indicates liquidatable position (HF < 1.0).
#[inline]
pub fn is_liquidatable_wad(hf_wad: U256) -> bool {
    hf_wad < WAD
}

/// Constant-product output for a single hop with a fee in hundredths of a bip.
///
/// out = reserve_out * in_after_fee / (reserve_in + in_after_fee)
pub fn constant_product_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_ppm: u32,
) -> Option<U256> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return None;
    }
    let fee_factor = FEE_DENOMINATOR.checked_sub(U256::from(fee_ppm))?;
    let in_after_fee = mul_div(amount_in, fee_factor, FEE_DENOMINATOR)?;
    let denominator = reserve_in.checked_add(in_after_fee)?;
    mul_div(reserve_out, in_after_fee, denominator)
}
