#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Number of map partitions. Clamped to at least 1.
    pub partitions: usize,
    /// Apply the stage combiner to each map partition.
    pub combine: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            partitions: rayon::current_num_threads().max(1),
            combine: true,
        }
    }
}
