//! Scenario files: the ledger, collaborators and liquidation request for
//! one run of the binary.

use std::path::Path;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use anyhow::{Context, Result};
use serde::Deserialize;

use flash_liquidator_chain::contracts::router::encode_hop_fee;
use flash_liquidator_chain::{Host, Ledger, ReserveConfig, SimLendingPool, SimPair, SimSwapRouter};
use flash_liquidator_core::{expand_env, LiquidationInstruction};

/// Scenario file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_name")]
    pub name: String,

    /// Block timestamp; defaults to the wall clock
    #[serde(default)]
    pub timestamp: Option<u64>,

    pub accounts: Accounts,

    pub pool: PoolSetup,

    pub router: RouterSetup,

    #[serde(default)]
    pub positions: Vec<PositionSetup>,

    pub liquidation: LiquidationRequest,
}

fn default_name() -> String {
    "unnamed".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Accounts {
    pub executor: Address,
    pub owner: Address,
    /// Defaults to the owner
    #[serde(default)]
    pub beneficiary: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolSetup {
    pub address: Address,
    #[serde(default = "default_premium_bps")]
    pub premium_bps: u16,
    #[serde(default = "default_bonus_bps")]
    pub liquidation_bonus_bps: u16,
    #[serde(default)]
    pub reserves: Vec<ReserveSetup>,
}

fn default_premium_bps() -> u16 {
    9
}
fn default_bonus_bps() -> u16 {
    500
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReserveSetup {
    pub asset: Address,
    pub wrapped: Address,
    pub debt_token: Address,
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(default = "default_threshold_bps")]
    pub liquidation_threshold_bps: u16,
    /// Lendable liquidity supplied at setup
    #[serde(default)]
    pub liquidity: Option<String>,
}

fn default_price() -> String {
    "1".to_string()
}
fn default_threshold_bps() -> u16 {
    8000
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterSetup {
    pub address: Address,
    #[serde(default = "default_fee_ppm")]
    pub default_fee_ppm: u32,
    #[serde(default)]
    pub pairs: Vec<PairSetup>,
}

fn default_fee_ppm() -> u32 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairSetup {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: String,
    pub reserve1: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionSetup {
    pub borrower: Address,
    pub collateral_asset: Address,
    pub collateral_amount: String,
    pub debt_asset: Address,
    pub debt_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiquidationRequest {
    pub debt_asset: Address,
    pub amount: String,
    pub collateral_asset: Address,
    pub borrower: Address,
    #[serde(default)]
    pub swap_path: Vec<Address>,
    #[serde(default)]
    pub swap_pairs: Vec<Address>,
    #[serde(default)]
    pub swap_extras: Vec<HopExtra>,
}

/// Per-hop routing data: raw hex, or a fee the router understands.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HopExtra {
    Fee { fee_ppm: u32 },
    Raw(String),
}

impl HopExtra {
    fn to_bytes(&self) -> Result<Bytes> {
        match self {
            Self::Fee { fee_ppm } => {
                encode_hop_fee(*fee_ppm).with_context(|| format!("Hop fee {} does not fit in uint24", fee_ppm))
            }
            Self::Raw(hex) if hex.is_empty() => Ok(Bytes::new()),
            Self::Raw(hex) => Bytes::from_str(hex).with_context(|| format!("Invalid extras hex: {}", hex)),
        }
    }
}

/// Collaborators and committed ledger built from a scenario.
pub struct World {
    pub host: Host,
    pub pool: SimLendingPool,
    pub router: SimSwapRouter,
}

impl Scenario {
    /// Load a scenario from a TOML file. `${VAR}` references are expanded.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        toml::from_str(&expand_env(&content))
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    pub fn beneficiary(&self) -> Address {
        self.accounts.beneficiary.unwrap_or(self.accounts.owner)
    }

    /// Build the pool, router and seeded ledger.
    pub fn build(&self) -> Result<World> {
        let mut pool = SimLendingPool::new(self.pool.address)
            .with_premium_bps(self.pool.premium_bps)
            .with_liquidation_bonus_bps(self.pool.liquidation_bonus_bps);
        for reserve in &self.pool.reserves {
            pool = pool.with_reserve(ReserveConfig {
                asset: reserve.asset,
                wrapped: reserve.wrapped,
                debt_token: reserve.debt_token,
                price: parse_amount(&reserve.price)?,
                liquidation_threshold_bps: reserve.liquidation_threshold_bps,
            });
        }

        let mut router =
            SimSwapRouter::new(self.router.address).with_default_fee_ppm(self.router.default_fee_ppm);
        for pair in &self.router.pairs {
            router = router.with_pair(SimPair {
                address: pair.address,
                token0: pair.token0,
                token1: pair.token1,
            });
        }

        let mut ledger = Ledger::new(self.timestamp.unwrap_or_else(now));
        for reserve in &self.pool.reserves {
            if let Some(liquidity) = &reserve.liquidity {
                pool.supply(&mut ledger, reserve.asset, parse_amount(liquidity)?)?;
            }
        }
        for pair in &self.router.pairs {
            router.add_liquidity(
                &mut ledger,
                pair.address,
                parse_amount(&pair.reserve0)?,
                parse_amount(&pair.reserve1)?,
            )?;
        }
        for position in &self.positions {
            pool.open_position(
                &mut ledger,
                position.borrower,
                position.collateral_asset,
                parse_amount(&position.collateral_amount)?,
                position.debt_asset,
                parse_amount(&position.debt_amount)?,
            )?;
        }

        Ok(World {
            host: Host::new(ledger),
            pool,
            router,
        })
    }

    /// The instruction and loan amount for the run.
    pub fn instruction(&self) -> Result<(LiquidationInstruction, U256)> {
        let request = &self.liquidation;
        let extras = request
            .swap_extras
            .iter()
            .map(HopExtra::to_bytes)
            .collect::<Result<Vec<_>>>()?;

        let instruction = LiquidationInstruction::new(request.collateral_asset, request.borrower).with_route(
            request.swap_path.clone(),
            request.swap_pairs.clone(),
            extras,
        );
        Ok((instruction, parse_amount(&request.amount)?))
    }
}

/// Parse a decimal or `0x` hex amount. Underscores are ignored.
fn parse_amount(s: &str) -> Result<U256> {
    let cleaned = s.replace('_', "");
    U256::from_str(&cleaned).with_context(|| format!("Invalid amount: {}", s))
}

fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}
