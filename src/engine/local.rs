use std::collections::BTreeMap;

use rayon::prelude::*;

use super::{EngineOptions, Emitter, ExecutionEngine, MapStage, ReduceStage};

/// In-process engine backed by the rayon thread pool.
///
/// Input is split into `partitions` contiguous map partitions. Each partition
/// is grouped by key (and combined, when enabled) on its own; partitions are
/// then merged in order so that reduce sees values in partition/emission
/// order and output comes back sorted by key.
#[derive(Debug, Clone, Default)]
pub struct LocalEngine {
    options: EngineOptions,
}

impl LocalEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    fn map_partitions<S: MapStage>(
        &self,
        stage: &S,
        input: &[(S::InKey, S::InValue)],
    ) -> Vec<Vec<(S::Key, S::Value)>> {
        if input.is_empty() {
            return Vec::new();
        }
        let chunk = input.len().div_ceil(self.options.partitions.max(1));
        input
            .par_chunks(chunk)
            .map(|partition| {
                let mut out = Emitter::new();
                for (key, value) in partition {
                    stage.map(key, value, &mut out);
                }
                out.into_records()
            })
            .collect()
    }
}

impl ExecutionEngine for LocalEngine {
    fn run_map<S: MapStage>(
        &self,
        stage: &S,
        input: Vec<(S::InKey, S::InValue)>,
    ) -> Vec<(S::Key, S::Value)> {
        let inputs = input.len();
        let output: Vec<_> = self
            .map_partitions(stage, &input)
            .into_iter()
            .flatten()
            .collect();
        tracing::debug!(
            stage = stage.name(),
            inputs,
            outputs = output.len(),
            "map stage complete"
        );
        output
    }

    fn run_stage<S: ReduceStage>(
        &self,
        stage: &S,
        input: Vec<(S::InKey, S::InValue)>,
    ) -> Vec<(S::OutKey, S::OutValue)> {
        let inputs = input.len();
        let partitions = self.map_partitions(stage, &input);
        drop(input);
        let mapped: usize = partitions.iter().map(Vec::len).sum();

        let combine = self.options.combine;
        let grouped: Vec<BTreeMap<S::Key, Vec<S::Value>>> = partitions
            .into_par_iter()
            .map(|records| {
                let mut groups: BTreeMap<S::Key, Vec<S::Value>> = BTreeMap::new();
                for (key, value) in records {
                    groups.entry(key).or_default().push(value);
                }
                if combine {
                    for (key, values) in groups.iter_mut() {
                        let partial = std::mem::take(values);
                        *values = stage.combine(key, partial);
                    }
                }
                groups
            })
            .collect();

        let mut merged: BTreeMap<S::Key, Vec<S::Value>> = BTreeMap::new();
        for groups in grouped {
            for (key, mut values) in groups {
                merged.entry(key).or_default().append(&mut values);
            }
        }
        let shuffled: usize = merged.values().map(Vec::len).sum();
        let groups: Vec<(S::Key, Vec<S::Value>)> = merged.into_iter().collect();
        let keys = groups.len();

        let reduced: Vec<Vec<(S::OutKey, S::OutValue)>> = groups
            .into_par_iter()
            .map(|(key, values)| {
                let mut out = Emitter::new();
                stage.reduce(&key, values, &mut out);
                out.into_records()
            })
            .collect();
        let output: Vec<_> = reduced.into_iter().flatten().collect();

        tracing::debug!(
            stage = stage.name(),
            inputs,
            mapped,
            shuffled,
            keys,
            outputs = output.len(),
            "stage complete"
        );
        output
    }
}
