//! Common contract interfaces shared across collaborators.
//!
//! ERC20 is the only token standard the executor touches; every
//! approval and transfer it performs is recorded as `IERC20` calldata.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

// ERC20 interface for token interactions
sol! {
    /// Standard ERC20 interface (subset for liquidation needs)
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
    }
}

/// Encode `approve(spender, amount)` calldata.
pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    Bytes::from(IERC20::approveCall { spender, amount }.abi_encode())
}

/// Encode `transfer(to, amount)` calldata.
pub fn encode_transfer(to: Address, amount: U256) -> Bytes {
    Bytes::from(IERC20::transferCall { to, amount }.abi_encode())
}

/// Encode `transferFrom(from, to, amount)` calldata.
pub fn encode_transfer_from(from: Address, to: Address, amount: U256) -> Bytes {
    Bytes::from(IERC20::transferFromCall { from, to, amount }.abi_encode())
}
