//! Flash Liquidator
//!
//! Runs one flash liquidation unit against an in-memory lending pool and
//! swap router described by a scenario file:
//! - Borrows the debt asset, liquidates the borrower and routes the seized
//!   collateral back through the router inside one atomic unit
//! - Prints the settlement report as JSON
//! - Exits non-zero with the abort reason when the unit rolls back

mod scenario;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flash_liquidator_core::{ExecutorConfig, FlashLiquidator};

use crate::scenario::Scenario;

/// Environment variable names.
mod env {
    pub const SCENARIO_FILE: &str = "SCENARIO_FILE";
}

const DEFAULT_SCENARIO: &str = "scenarios/cross_asset.toml";

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,flash_liquidator_core=debug,flash_liquidator_chain=debug")
        }))
        .init();

    // EXECUTOR_PROFILE selects: default, production, diagnostic, or a .toml path
    let config = ExecutorConfig::from_env().context("Failed to load executor config")?;
    config.log_config();

    let scenario_path =
        std::env::var(env::SCENARIO_FILE).unwrap_or_else(|_| DEFAULT_SCENARIO.to_string());
    let scenario = Scenario::from_file(&scenario_path)?;
    info!(scenario = %scenario.name, path = %scenario_path, "Scenario loaded");

    let world = scenario.build().context("Failed to build scenario")?;
    let (instruction, amount) = scenario.instruction()?;

    let executor = FlashLiquidator::new(
        scenario.accounts.executor,
        scenario.accounts.owner,
        Arc::new(world.pool),
        Arc::new(world.router),
    )
    .with_beneficiary(scenario.beneficiary())
    .with_config(config);

    let outcome = executor.liquidate(
        &world.host,
        scenario.accounts.owner,
        scenario.liquidation.debt_asset,
        amount,
        &instruction,
    );

    world.host.read(|ledger| {
        for record in ledger.trace() {
            debug!(%record, "[TRACE] Committed call");
        }
    });

    let report = outcome.with_context(|| format!("Flash liquidation of {} aborted", instruction.borrower))?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
