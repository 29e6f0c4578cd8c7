//! Swap route validation.
//!
//! Checks that an instruction's route ends in the asset that must be
//! repaid and that its per-hop data lines up with the path, before any
//! ledger effect happens.

use alloy::primitives::Address;

use crate::error::LiquidationError;
use crate::instruction::LiquidationInstruction;

/// Validate route coherence against the repayment asset.
///
/// - non-empty path: at least two tokens, last token == `repayment_asset`,
///   one pair and one extras blob per hop
/// - empty path: collateral == `repayment_asset`, no pairs, no extras
pub fn validate_route(
    instruction: &LiquidationInstruction,
    repayment_asset: Address,
) -> Result<(), LiquidationError> {
    let path = &instruction.swap_path;

    let Some(last) = path.last() else {
        if instruction.collateral_asset != repayment_asset {
            return Err(LiquidationError::PathMismatch(format!(
                "empty path but collateral {} differs from repayment asset {}",
                instruction.collateral_asset, repayment_asset
            )));
        }
        if !instruction.swap_pairs.is_empty() || !instruction.swap_extras.is_empty() {
            return Err(LiquidationError::PathMismatch(format!(
                "empty path carries {} pairs and {} extras",
                instruction.swap_pairs.len(),
                instruction.swap_extras.len()
            )));
        }
        return Ok(());
    };

    if *last != repayment_asset {
        return Err(LiquidationError::PathMismatch(format!(
            "path ends in {} but repayment asset is {}",
            last, repayment_asset
        )));
    }

    let hops = instruction.hops();
    if hops == 0 {
        return Err(LiquidationError::PathMismatch(
            "path of a single token has no hop".to_string(),
        ));
    }
    if instruction.swap_pairs.len() != hops || instruction.swap_extras.len() != hops {
        return Err(LiquidationError::PathMismatch(format!(
            "{} hops but {} pairs and {} extras",
            hops,
            instruction.swap_pairs.len(),
            instruction.swap_extras.len()
        )));
    }

    Ok(())
}

/// Validate the first path token against what the liquidation will deliver.
///
/// A raw delivery must start the path at the collateral (guaranteed by the
/// wrapped/raw rule); a wrapped delivery must start at the pool's wrapped
/// form of the collateral.
pub fn validate_swap_input(
    instruction: &LiquidationInstruction,
    wrapped_collateral: Option<Address>,
) -> Result<(), LiquidationError> {
    if !instruction.receive_wrapped() {
        return Ok(());
    }

    let first = instruction.swap_path[0];
    match wrapped_collateral {
        Some(wrapped) if wrapped == first => Ok(()),
        Some(wrapped) => Err(LiquidationError::PathMismatch(format!(
            "path starts at {} but wrapped collateral is {}",
            first, wrapped
        ))),
        None => Err(LiquidationError::PathMismatch(format!(
            "path starts at {} but collateral {} has no wrapped form",
            first, instruction.collateral_asset
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    const X: u8 = 0x01;
    const Y: u8 = 0x02;
    const Z: u8 = 0x03;

    fn route(path: &[u8]) -> LiquidationInstruction {
        let hops = path.len().saturating_sub(1);
        LiquidationInstruction::new(addr(Y), addr(0xB0)).with_route(
            path.iter().map(|b| addr(*b)).collect(),
            (0..hops).map(|i| addr(0x50 + i as u8)).collect(),
            vec![Bytes::new(); hops],
        )
    }

    #[test]
    fn test_path_ending_in_repayment_asset_accepted() {
        assert!(validate_route(&route(&[Y, X]), addr(X)).is_ok());
        assert!(validate_route(&route(&[Y, Z, X]), addr(X)).is_ok());
    }

    #[test]
    fn test_path_ending_elsewhere_rejected() {
        let err = validate_route(&route(&[Y, Z]), addr(X)).unwrap_err();
        assert!(matches!(err, LiquidationError::PathMismatch(_)));
    }

    #[test]
    fn test_empty_path_requires_same_asset() {
        let same = LiquidationInstruction::new(addr(X), addr(0xB0));
        assert!(validate_route(&same, addr(X)).is_ok());

        let different = LiquidationInstruction::new(addr(Y), addr(0xB0));
        let err = validate_route(&different, addr(X)).unwrap_err();
        assert!(matches!(err, LiquidationError::PathMismatch(_)));
    }

    #[test]
    fn test_empty_path_with_pairs_rejected() {
        let mut instruction = LiquidationInstruction::new(addr(X), addr(0xB0));
        instruction.swap_pairs = vec![addr(0x50)];
        assert!(validate_route(&instruction, addr(X)).is_err());
    }

    #[test]
    fn test_single_token_path_rejected() {
        let mut instruction = route(&[X]);
        instruction.collateral_asset = addr(X);
        assert!(validate_route(&instruction, addr(X)).is_err());
    }

    #[test]
    fn test_misaligned_hops_rejected() {
        let mut instruction = route(&[Y, Z, X]);
        instruction.swap_extras.pop();
        assert!(validate_route(&instruction, addr(X)).is_err());

        let mut instruction = route(&[Y, Z, X]);
        instruction.swap_pairs.push(addr(0x5F));
        assert!(validate_route(&instruction, addr(X)).is_err());
    }

    #[test]
    fn test_swap_input_raw_needs_no_wrapped_form() {
        assert!(validate_swap_input(&route(&[Y, X]), None).is_ok());
    }

    #[test]
    fn test_swap_input_wrapped_must_match_pool() {
        // aY = 0x12
        let instruction = route(&[0x12, X]);
        assert!(validate_swap_input(&instruction, Some(addr(0x12))).is_ok());
        assert!(validate_swap_input(&instruction, Some(addr(0x13))).is_err());
        assert!(validate_swap_input(&instruction, None).is_err());
    }
}
