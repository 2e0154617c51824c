//! Stage contracts and the engine that executes them.
//!
//! A stage is a map function, an optional combiner and a reduce function. An
//! engine guarantees:
//! - every input record is mapped exactly once;
//! - all values emitted under one key reach exactly one reduce invocation;
//! - a combiner may run zero or more times over partial groups, so it must be
//!   associative and commutative;
//! - `run_stage` / `run_map` return only after every invocation completed,
//!   which is the barrier between consecutive stages.

mod local;
mod options;

pub use local::LocalEngine;
pub use options::EngineOptions;

/// Collects the `(key, value)` records produced by one invocation.
#[derive(Debug)]
pub struct Emitter<K, V> {
    records: Vec<(K, V)>,
}

impl<K, V> Emitter<K, V> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn emit(&mut self, key: K, value: V) {
        self.records.push((key, value));
    }

    pub fn into_records(self) -> Vec<(K, V)> {
        self.records
    }
}

impl<K, V> Default for Emitter<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

pub trait MapStage: Sync {
    type InKey: Send + Sync;
    type InValue: Send + Sync;
    type Key: Ord + Clone + Send + Sync;
    type Value: Send + Sync;

    /// Stage name used in logs.
    fn name(&self) -> &'static str;

    fn map(
        &self,
        key: &Self::InKey,
        value: &Self::InValue,
        out: &mut Emitter<Self::Key, Self::Value>,
    );
}

pub trait ReduceStage: MapStage {
    type OutKey: Send;
    type OutValue: Send;

    /// Map-side pre-aggregation of a partial group. Defaults to a no-op.
    fn combine(&self, _key: &Self::Key, values: Vec<Self::Value>) -> Vec<Self::Value> {
        values
    }

    fn reduce(
        &self,
        key: &Self::Key,
        values: Vec<Self::Value>,
        out: &mut Emitter<Self::OutKey, Self::OutValue>,
    );
}

pub trait ExecutionEngine {
    /// Runs a map-only stage.
    fn run_map<S: MapStage>(
        &self,
        stage: &S,
        input: Vec<(S::InKey, S::InValue)>,
    ) -> Vec<(S::Key, S::Value)>;

    /// Runs map, combine and reduce; output is ordered by reduce key.
    fn run_stage<S: ReduceStage>(
        &self,
        stage: &S,
        input: Vec<(S::InKey, S::InValue)>,
    ) -> Vec<(S::OutKey, S::OutValue)>;
}
