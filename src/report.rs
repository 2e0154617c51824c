//! Per-run summary, written as JSON by the CLI.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IterationStats {
    pub iteration: usize,
    /// Records entering the iteration.
    pub inputs: usize,
    /// Records leaving the iteration.
    pub outputs: usize,
    /// K-means: points whose cluster changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reassigned: Option<usize>,
    /// K-means: clusters with no points after the iteration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_clusters: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub algorithm: &'static str,
    pub iterations: Vec<IterationStats>,
    pub elapsed_ms: u128,
}

impl RunReport {
    pub fn new(algorithm: &'static str) -> Self {
        Self {
            algorithm,
            iterations: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
