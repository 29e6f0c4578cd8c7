//! Executor configuration with profile support.
//!
//! Profiles (default, production, diagnostic) fix how the swap step reacts
//! to router failures and whether a break-even settlement is accepted.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::env::expand_env;
use crate::settlement::ProfitPolicy;
use crate::swap::{SwapFailurePolicy, SwapSettings};

/// Main executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Swap step parameters
    #[serde(default)]
    pub swap: SwapConfig,

    /// Settlement acceptance
    #[serde(default)]
    pub settlement: SettlementConfig,

    /// Flash loan request parameters
    #[serde(default)]
    pub flash_loan: FlashLoanConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Swap step parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    /// Reaction to a failed router call
    #[serde(default)]
    pub failure_policy: SwapFailurePolicy,

    /// Seconds added to the current timestamp to form the swap deadline
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

fn default_deadline_secs() -> u64 {
    300
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            failure_policy: SwapFailurePolicy::default(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

/// Settlement acceptance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    #[serde(default)]
    pub profit_policy: ProfitPolicy,
}

/// Flash loan request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashLoanConfig {
    /// Integrator referral code passed to the pool
    #[serde(default)]
    pub referral_code: u16,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            swap: SwapConfig::default(),
            settlement: SettlementConfig::default(),
            flash_loan: FlashLoanConfig::default(),
        }
    }
}

impl ExecutorConfig {
    /// Load configuration from a TOML file. `${VAR}` references are expanded.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&expand_env(&content))?;
        Ok(config)
    }

    /// Strict swaps, profitable settlements only, short deadline.
    pub fn production() -> Self {
        Self {
            profile: "production".to_string(),
            swap: SwapConfig {
                failure_policy: SwapFailurePolicy::Strict,
                deadline_secs: 60,
            },
            settlement: SettlementConfig {
                profit_policy: ProfitPolicy::RequirePositive,
            },
            flash_loan: FlashLoanConfig::default(),
        }
    }

    /// Soft swaps: a failed router call surfaces as a settlement shortfall.
    pub fn diagnostic() -> Self {
        Self {
            profile: "diagnostic".to_string(),
            swap: SwapConfig {
                failure_policy: SwapFailurePolicy::Soft,
                deadline_secs: default_deadline_secs(),
            },
            settlement: SettlementConfig::default(),
            flash_loan: FlashLoanConfig::default(),
        }
    }

    /// Resolve from the `EXECUTOR_PROFILE` environment variable.
    ///
    /// Accepts a profile name (default, production, diagnostic) or a path
    /// to a `.toml` file. Unknown names fall back to the default profile.
    pub fn from_env() -> anyhow::Result<Self> {
        let profile = std::env::var("EXECUTOR_PROFILE").unwrap_or_else(|_| "default".to_string());
        Self::from_profile(&profile)
    }

    /// Resolve a profile name or `.toml` path.
    pub fn from_profile(profile: &str) -> anyhow::Result<Self> {
        if profile.ends_with(".toml") {
            return Self::from_file(profile);
        }
        Ok(match profile.to_lowercase().as_str() {
            "production" | "prod" => Self::production(),
            "diagnostic" | "diag" | "soft" => Self::diagnostic(),
            _ => Self::default(),
        })
    }

    /// Swap parameters for the swap step.
    pub fn swap_settings(&self) -> SwapSettings {
        SwapSettings {
            policy: self.swap.failure_policy,
            deadline_secs: self.swap.deadline_secs,
        }
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "Executor configuration loaded");
        tracing::info!(
            failure_policy = ?self.swap.failure_policy,
            deadline_secs = self.swap.deadline_secs,
            "Swap parameters"
        );
        tracing::info!(
            profit_policy = ?self.settlement.profit_policy,
            referral_code = self.flash_loan.referral_code,
            "Settlement parameters"
        );
    }
}
