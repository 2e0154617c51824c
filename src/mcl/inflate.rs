use super::Cell;
use crate::engine::{Emitter, MapStage};

/// Raises every entry to an integer power. Map-only.
#[derive(Debug, Clone, Copy)]
pub struct InflateStage {
    power: i32,
}

impl InflateStage {
    pub fn new(inflation_parameter: u32) -> Self {
        Self {
            power: i32::try_from(inflation_parameter).unwrap_or(i32::MAX),
        }
    }
}

impl MapStage for InflateStage {
    type InKey = Cell;
    type InValue = f64;
    type Key = Cell;
    type Value = f64;

    fn name(&self) -> &'static str {
        "mcl-inflate"
    }

    fn map(&self, cell: &Cell, value: &f64, out: &mut Emitter<Cell, f64>) {
        out.emit(*cell, value.powi(self.power));
    }
}
