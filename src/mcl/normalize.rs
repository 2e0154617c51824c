use serde::{Deserialize, Serialize};

use super::{Cell, PRUNE_THRESHOLD};
use crate::engine::{Emitter, MapStage, ReduceStage};

/// Mergeable slice of one column: its entries plus their running sum.
///
/// Merging is associative and commutative, so the combiner can fold any
/// subset of a column's partials any number of times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPartial {
    pub sum: f64,
    pub entries: Vec<(u32, f64)>,
}

impl ColumnPartial {
    pub fn single(row: u32, value: f64) -> Self {
        Self {
            sum: value,
            entries: vec![(row, value)],
        }
    }

    pub fn merge(&mut self, mut other: ColumnPartial) {
        self.sum += other.sum;
        self.entries.append(&mut other.entries);
    }
}

/// Rescales every column to sum to 1 and prunes entries whose share of the
/// column is at most [`PRUNE_THRESHOLD`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeStage;

impl MapStage for NormalizeStage {
    type InKey = Cell;
    type InValue = f64;
    type Key = u32;
    type Value = ColumnPartial;

    fn name(&self) -> &'static str {
        "mcl-normalize"
    }

    fn map(&self, cell: &Cell, value: &f64, out: &mut Emitter<u32, ColumnPartial>) {
        let (row, col) = *cell;
        out.emit(col, ColumnPartial::single(row, *value));
    }
}

impl ReduceStage for NormalizeStage {
    type OutKey = Cell;
    type OutValue = f64;

    fn combine(&self, _col: &u32, values: Vec<ColumnPartial>) -> Vec<ColumnPartial> {
        merge_all(values).into_iter().collect()
    }

    fn reduce(&self, col: &u32, values: Vec<ColumnPartial>, out: &mut Emitter<Cell, f64>) {
        let Some(column) = merge_all(values) else {
            return;
        };
        if column.sum == 0.0 {
            return;
        }
        for (row, value) in column.entries {
            let share = value / column.sum;
            if share > PRUNE_THRESHOLD {
                out.emit((row, *col), share);
            }
        }
    }
}

fn merge_all(values: Vec<ColumnPartial>) -> Option<ColumnPartial> {
    values.into_iter().reduce(|mut acc, part| {
        acc.merge(part);
        acc
    })
}
