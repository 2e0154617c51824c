//! Markov Clustering over a sparse matrix.
//!
//! The matrix flows between stages as `((row, col), value)` records; no stage
//! mutates its input. One round is expand (matrix squared), inflate
//! (elementwise power) and normalize (column-stochastic with pruning).

mod expand;
mod inflate;
mod normalize;

use std::collections::BTreeSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub use expand::{ExpandStage, Factor, JoinValue};
pub use inflate::InflateStage;
pub use normalize::{ColumnPartial, NormalizeStage};

use crate::engine::ExecutionEngine;
use crate::options::{ConfigError, MclOptions};
use crate::report::{IterationStats, RunReport};

/// Entries whose share of their column is at or below this are dropped.
pub const PRUNE_THRESHOLD: f64 = 0.065;

/// `(row, col)`, both 1-based.
pub type Cell = (u32, u32);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub row: u32,
    pub col: u32,
    pub value: f64,
}

impl MatrixEntry {
    pub fn cell(&self) -> Cell {
        (self.row, self.col)
    }
}

impl From<(Cell, f64)> for MatrixEntry {
    fn from(((row, col), value): (Cell, f64)) -> Self {
        Self { row, col, value }
    }
}

impl From<MatrixEntry> for (Cell, f64) {
    fn from(entry: MatrixEntry) -> Self {
        (entry.cell(), entry.value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MclError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("entry ({row}, {col}) is outside a {matrix_size}x{matrix_size} matrix")]
    OutOfRange { row: u32, col: u32, matrix_size: u32 },

    #[error("entry ({row}, {col}) appears more than once")]
    DuplicateEntry { row: u32, col: u32 },

    #[error("entry ({row}, {col}) has value {value}, expected a finite non-negative real")]
    InvalidValue { row: u32, col: u32, value: f64 },
}

#[derive(Debug, Clone)]
pub struct MclOutcome {
    /// Final matrix, ordered by `(row, col)`.
    pub entries: Vec<MatrixEntry>,
    pub report: RunReport,
}

/// Runs `normalize, (expand, inflate, normalize) x iterations, normalize`.
pub fn run_mcl<E: ExecutionEngine>(
    engine: &E,
    entries: Vec<MatrixEntry>,
    options: &MclOptions,
) -> Result<MclOutcome, MclError> {
    options.validate()?;
    validate_entries(&entries, options.matrix_size)?;

    let started = Instant::now();
    let mut report = RunReport::new("mcl");
    tracing::info!(
        entries = entries.len(),
        matrix_size = options.matrix_size,
        inflation_parameter = options.inflation_parameter,
        iterations = options.iterations,
        "mcl start"
    );

    let normalize = NormalizeStage;
    let expand = ExpandStage::new(options.matrix_size);
    let inflate = InflateStage::new(options.inflation_parameter);

    let mut matrix: Vec<(Cell, f64)> = entries.into_iter().map(Into::into).collect();
    matrix = engine.run_stage(&normalize, matrix);

    for iteration in 1..=options.iterations {
        let inputs = matrix.len();
        let expanded = engine.run_stage(&expand, matrix);
        let inflated = engine.run_map(&inflate, expanded);
        matrix = engine.run_stage(&normalize, inflated);

        tracing::info!(iteration, entries = matrix.len(), "mcl iteration complete");
        report.iterations.push(IterationStats {
            iteration,
            inputs,
            outputs: matrix.len(),
            ..Default::default()
        });
    }

    matrix = engine.run_stage(&normalize, matrix);
    matrix.sort_by_key(|(cell, _)| *cell);

    report.elapsed_ms = started.elapsed().as_millis();
    tracing::info!(
        entries = matrix.len(),
        elapsed_ms = report.elapsed_ms,
        "mcl done"
    );
    Ok(MclOutcome {
        entries: matrix.into_iter().map(MatrixEntry::from).collect(),
        report,
    })
}

fn validate_entries(entries: &[MatrixEntry], matrix_size: u32) -> Result<(), MclError> {
    let mut seen = BTreeSet::new();
    for entry in entries {
        let in_range = |i: u32| (1..=matrix_size).contains(&i);
        if !in_range(entry.row) || !in_range(entry.col) {
            return Err(MclError::OutOfRange {
                row: entry.row,
                col: entry.col,
                matrix_size,
            });
        }
        if !entry.value.is_finite() || entry.value < 0.0 {
            return Err(MclError::InvalidValue {
                row: entry.row,
                col: entry.col,
                value: entry.value,
            });
        }
        if !seen.insert(entry.cell()) {
            return Err(MclError::DuplicateEntry {
                row: entry.row,
                col: entry.col,
            });
        }
    }
    Ok(())
}
