//! Persistence layer.
//!
//! Writes the result record of a run to a JSON file, overwritten on
//! every run. Nothing is read back by the bot itself; `load_results`
//! exists for tooling and tests.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{Balance, Opportunity, TradeOutcome};

/// Default results file path.
pub const DEFAULT_RESULTS_FILE: &str = "arbitrage_results.json";

/// Everything a run found, as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub trading_enabled: bool,
    pub triangular_opportunities: Vec<Opportunity>,
    pub spread_opportunities: Vec<Opportunity>,
    pub balance: Balance,
    #[serde(default)]
    pub trades: Vec<TradeOutcome>,
}

/// Save the run record, replacing any previous file.
pub fn save_results(record: &RunRecord, path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_RESULTS_FILE);
    let json = serde_json::to_string_pretty(record)
        .context("Failed to serialise run results")?;

    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write results to {path}"))?;

    info!(
        path,
        triangular = record.triangular_opportunities.len(),
        spreads = record.spread_opportunities.len(),
        "Results saved"
    );
    Ok(())
}

/// Load a run record. Returns None if the file doesn't exist.
pub fn load_results(path: Option<&str>) -> Result<Option<RunRecord>> {
    let path = path.unwrap_or(DEFAULT_RESULTS_FILE);

    if !Path::new(path).exists() {
        debug!(path, "No results file found");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results from {path}"))?;

    let record: RunRecord = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse results from {path}"))?;

    Ok(Some(record))
}

/// Delete the results file (for testing or reset).
pub fn delete_results(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_RESULTS_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to delete results file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
