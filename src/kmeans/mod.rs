//! K-means as a repeated assign/update map-reduce step.
//!
//! Each iteration maps every point against a read-only [`ClusterStore`]
//! snapshot, then reduces per cluster id to fold aggregate deltas. The
//! controller builds the next snapshot from the reduce output; mappers never
//! mutate the snapshot they read.

mod assign;
mod store;
mod update;

use std::time::Instant;

pub use assign::{assign_point, AggregateDelta, KMeansValue};
pub use store::{Cluster, ClusterStore};
pub use update::{combine_deltas, fold_cluster, ClusterUpdate, UpdateOutput};

use crate::engine::{Emitter, ExecutionEngine, MapStage, ReduceStage};
use crate::options::{ConfigError, KMeansOptions};
use crate::report::{IterationStats, RunReport};

pub type ClusterId = u32;

/// Label carried by points that are not yet counted in any aggregate.
pub const UNASSIGNED: ClusterId = 0;

#[derive(Debug, thiserror::Error)]
pub enum KMeansError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("seed contains no clusters")]
    EmptySeed,

    #[error("cluster id 0 is reserved for unassigned points")]
    ReservedClusterId,

    #[error("cluster {0} appears more than once in the seed")]
    DuplicateCluster(ClusterId),

    #[error("cluster {id} has {found} coordinates, expected {expected}")]
    SeedDimension {
        id: ClusterId,
        expected: usize,
        found: usize,
    },

    #[error("point #{index} has {found} coordinates, expected {expected}")]
    PointDimension {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// One assign + update round against a fixed snapshot.
#[derive(Debug, Clone, Copy)]
pub struct KMeansStage<'a> {
    snapshot: &'a ClusterStore,
}

impl<'a> KMeansStage<'a> {
    pub fn new(snapshot: &'a ClusterStore) -> Self {
        Self { snapshot }
    }
}

impl MapStage for KMeansStage<'_> {
    type InKey = ClusterId;
    type InValue = Vec<f64>;
    type Key = ClusterId;
    type Value = KMeansValue;

    fn name(&self) -> &'static str {
        "kmeans"
    }

    fn map(
        &self,
        current: &ClusterId,
        coords: &Vec<f64>,
        out: &mut Emitter<ClusterId, KMeansValue>,
    ) {
        assign_point(self.snapshot, *current, coords, out);
    }
}

impl ReduceStage for KMeansStage<'_> {
    type OutKey = ClusterId;
    type OutValue = UpdateOutput;

    fn combine(&self, _id: &ClusterId, values: Vec<KMeansValue>) -> Vec<KMeansValue> {
        combine_deltas(values)
    }

    fn reduce(
        &self,
        id: &ClusterId,
        values: Vec<KMeansValue>,
        out: &mut Emitter<ClusterId, UpdateOutput>,
    ) {
        fold_cluster(self.snapshot, *id, values, out);
    }
}

#[derive(Debug, Clone)]
pub struct KMeansOutcome {
    /// Final `(cluster id, coords)` assignments, ordered by cluster id.
    pub points: Vec<(ClusterId, Vec<f64>)>,
    pub store: ClusterStore,
    pub report: RunReport,
}

/// Runs exactly `options.iterations` assign/update rounds.
///
/// `points` carry their current cluster id; [`UNASSIGNED`] marks a point that
/// is not yet counted in any aggregate.
pub fn run_kmeans<E: ExecutionEngine>(
    engine: &E,
    store: ClusterStore,
    points: Vec<(ClusterId, Vec<f64>)>,
    options: &KMeansOptions,
) -> Result<KMeansOutcome, KMeansError> {
    options.validate()?;
    let expected = store.dimension();
    if let Some((index, (_, coords))) = points
        .iter()
        .enumerate()
        .find(|(_, (_, coords))| coords.len() != expected)
    {
        return Err(KMeansError::PointDimension {
            index,
            expected,
            found: coords.len(),
        });
    }

    let started = Instant::now();
    let mut report = RunReport::new("kmeans");
    let mut store = store;
    let mut points = points;
    tracing::info!(
        clusters = store.len(),
        points = points.len(),
        dimension = expected,
        iterations = options.iterations,
        "kmeans start"
    );

    for iteration in 1..=options.iterations {
        let inputs = points.len();
        let output = engine.run_stage(&KMeansStage::new(&store), points);

        let mut next_points = Vec::with_capacity(inputs);
        let mut updates = Vec::new();
        let mut reassigned = 0u64;
        for (id, value) in output {
            match value {
                UpdateOutput::Point(coords) => next_points.push((id, coords)),
                UpdateOutput::Aggregate(update) => {
                    reassigned += update.joined;
                    if update.cluster.count == 0 && update.left > 0 {
                        tracing::warn!(iteration, cluster = id, "cluster became empty");
                    }
                    updates.push(update.cluster);
                }
            }
        }
        store = store.apply(updates);
        points = next_points;

        let empty_clusters = store.empty_clusters();
        tracing::info!(iteration, reassigned, empty_clusters, "kmeans iteration complete");
        report.iterations.push(IterationStats {
            iteration,
            inputs,
            outputs: points.len(),
            reassigned: Some(reassigned as usize),
            empty_clusters: Some(empty_clusters),
        });
    }

    report.elapsed_ms = started.elapsed().as_millis();
    tracing::info!(elapsed_ms = report.elapsed_ms, "kmeans done");
    Ok(KMeansOutcome {
        points,
        store,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOptions, LocalEngine};

    fn engine(partitions: usize, combine: bool) -> LocalEngine {
        LocalEngine::new(EngineOptions {
            partitions,
            combine,
        })
    }

    /// Points 0 and 10 are the seed centroids and already counted; 1 and 11
    /// start unassigned.
    fn scenario() -> (ClusterStore, Vec<(ClusterId, Vec<f64>)>) {
        let store = ClusterStore::from_seed(&[(1, vec![0.0]), (2, vec![10.0])]).unwrap();
        let points = vec![
            (1, vec![0.0]),
            (0, vec![1.0]),
            (2, vec![10.0]),
            (0, vec![11.0]),
        ];
        (store, points)
    }

    #[test]
    fn one_iteration_splits_the_line() {
        let (store, points) = scenario();
        let outcome =
            run_kmeans(&engine(2, true), store, points, &KMeansOptions { iterations: 1 }).unwrap();

        assert_eq!(
            outcome.points,
            vec![
                (1, vec![0.0]),
                (1, vec![1.0]),
                (2, vec![10.0]),
                (2, vec![11.0]),
            ]
        );
        let c1 = outcome.store.get(1).unwrap();
        assert_eq!((c1.aggregate_sum.clone(), c1.count), (vec![1.0], 2));
        let c2 = outcome.store.get(2).unwrap();
        assert_eq!((c2.aggregate_sum.clone(), c2.count), (vec![21.0], 2));
        assert_eq!(outcome.report.iterations[0].reassigned, Some(2));
    }

    #[test]
    fn further_iterations_are_a_fixed_point() {
        let (store, points) = scenario();
        let once = run_kmeans(
            &engine(1, false),
            store.clone(),
            points.clone(),
            &KMeansOptions { iterations: 1 },
        )
        .unwrap();
        let many = run_kmeans(&engine(3, true), store, points, &KMeansOptions { iterations: 5 })
            .unwrap();

        assert_eq!(many.points, once.points);
        assert_eq!(many.store, once.store);
        assert_eq!(many.report.iterations.len(), 5);
        assert!(many.report.iterations[1..]
            .iter()
            .all(|it| it.reassigned == Some(0)));
    }

    #[test]
    fn moving_a_point_updates_both_clusters() {
        // Point 3 starts in cluster 2 (centroid 7) but is closer to cluster 1.
        let store = ClusterStore::from_seed(&[(1, vec![0.0]), (2, vec![10.0])]).unwrap();
        let store = store.apply([Cluster {
            id: 2,
            aggregate_sum: vec![13.0],
            count: 2,
        }]);
        let points = vec![(1, vec![0.0]), (2, vec![3.0]), (2, vec![10.0])];
        let outcome =
            run_kmeans(&engine(2, true), store, points, &KMeansOptions { iterations: 1 }).unwrap();

        assert_eq!(outcome.store.get(1).unwrap().aggregate_sum, vec![3.0]);
        assert_eq!(outcome.store.get(1).unwrap().count, 2);
        assert_eq!(outcome.store.get(2).unwrap().aggregate_sum, vec![10.0]);
        assert_eq!(outcome.store.get(2).unwrap().count, 1);
    }

    #[test]
    fn rejects_mismatched_dimensions_before_running() {
        let (store, _) = scenario();
        let err = run_kmeans(
            &engine(1, true),
            store,
            vec![(0, vec![1.0, 2.0])],
            &KMeansOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            KMeansError::PointDimension {
                index: 0,
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn rejects_zero_iterations() {
        let (store, points) = scenario();
        let err = run_kmeans(&engine(1, true), store, points, &KMeansOptions { iterations: 0 })
            .unwrap_err();
        assert!(matches!(err, KMeansError::Config(ConfigError::ZeroIterations)));
    }
}
