//! Assembly report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AssemblyConfig;
use crate::formulation::FormulationStats;
use crate::statistics::AssembledForm;
use crate::traits::SolveStatus;

/// The outcome of one assembly run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Solver backend name.
    pub solver: String,
    pub status: SolveStatus,
    /// Value of the deviation variable in the solution.
    pub deviation: f64,
    /// Largest |achieved - target| recomputed from the assembled forms.
    pub worst_deviation: f64,
    pub pool: PoolSummary,
    pub config: AssemblyConfig,
    pub stats: FormulationStats,
    pub forms: Vec<AssembledForm>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Summary of the item pool (without the items themselves).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub items: usize,
    pub categories: usize,
    pub category_sizes: Vec<usize>,
}

impl AssemblyReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AssemblyReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Item ids per form, in form order.
    pub fn form_item_ids(&self) -> Vec<Vec<String>> {
        self.forms.iter().map(|f| f.item_ids.clone()).collect()
    }
}
