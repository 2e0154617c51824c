use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Cell;
use crate::engine::{Emitter, MapStage, ReduceStage};

/// Which side of the product `M[i,t] * M[t,j]` a join value supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Factor {
    /// `M[i,t]`
    Left,
    /// `M[t,j]`
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoinValue {
    /// The shared index `t`.
    pub index: u32,
    pub factor: Factor,
    pub value: f64,
}

/// Sparse `M x M` through a row/column join.
///
/// Every entry `(r, c)` is sent to each output cell it can contribute to:
/// `(r, k)` as a left factor and `(k, c)` as a right factor, for
/// `k in 1..=matrix_size`.
#[derive(Debug, Clone, Copy)]
pub struct ExpandStage {
    matrix_size: u32,
}

impl ExpandStage {
    pub fn new(matrix_size: u32) -> Self {
        Self { matrix_size }
    }
}

impl MapStage for ExpandStage {
    type InKey = Cell;
    type InValue = f64;
    type Key = Cell;
    type Value = JoinValue;

    fn name(&self) -> &'static str {
        "mcl-expand"
    }

    fn map(&self, cell: &Cell, value: &f64, out: &mut Emitter<Cell, JoinValue>) {
        let (row, col) = *cell;
        for k in 1..=self.matrix_size {
            out.emit(
                (row, k),
                JoinValue {
                    index: col,
                    factor: Factor::Left,
                    value: *value,
                },
            );
            out.emit(
                (k, col),
                JoinValue {
                    index: row,
                    factor: Factor::Right,
                    value: *value,
                },
            );
        }
    }
}

impl ReduceStage for ExpandStage {
    type OutKey = Cell;
    type OutValue = f64;

    /// Emits `sum_t M[i,t] * M[t,j]` over the indices that received both
    /// factors. A cell with no aligned pair is an implicit zero and is not
    /// emitted.
    fn reduce(&self, cell: &Cell, values: Vec<JoinValue>, out: &mut Emitter<Cell, f64>) {
        let mut pairs: BTreeMap<u32, (Option<f64>, Option<f64>)> = BTreeMap::new();
        for join in values {
            let slot = pairs.entry(join.index).or_default();
            let side = match join.factor {
                Factor::Left => &mut slot.0,
                Factor::Right => &mut slot.1,
            };
            *side = Some(side.unwrap_or(0.0) + join.value);
        }

        let mut sum = 0.0;
        let mut aligned = false;
        for (left, right) in pairs.into_values() {
            if let (Some(left), Some(right)) = (left, right) {
                sum += left * right;
                aligned = true;
            }
        }
        if aligned {
            out.emit(*cell, sum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOptions, ExecutionEngine, LocalEngine};

    fn expand(input: Vec<(Cell, f64)>, n: u32) -> Vec<(Cell, f64)> {
        LocalEngine::new(EngineOptions {
            partitions: 2,
            combine: true,
        })
        .run_stage(&ExpandStage::new(n), input)
    }

    #[test]
    fn squares_a_dense_three_by_three() {
        // [[1 2 0]
        //  [0 1 3]
        //  [4 0 1]]
        let input = vec![
            ((1, 1), 1.0),
            ((1, 2), 2.0),
            ((2, 2), 1.0),
            ((2, 3), 3.0),
            ((3, 1), 4.0),
            ((3, 3), 1.0),
        ];
        // M^2 = [[1 4 6] [12 1 6] [8 8 1]]
        let expected = vec![
            ((1, 1), 1.0),
            ((1, 2), 4.0),
            ((1, 3), 6.0),
            ((2, 1), 12.0),
            ((2, 2), 1.0),
            ((2, 3), 6.0),
            ((3, 1), 8.0),
            ((3, 2), 8.0),
            ((3, 3), 1.0),
        ];
        assert_eq!(expand(input, 3), expected);
    }

    #[test]
    fn unreachable_cells_stay_implicit() {
        // A single off-diagonal edge squares to the zero matrix.
        assert!(expand(vec![((1, 2), 0.5)], 2).is_empty());
    }

    #[test]
    fn diagonal_entry_pairs_with_itself() {
        assert_eq!(expand(vec![((2, 2), 3.0)], 2), vec![((2, 2), 9.0)]);
    }
}
