//! `mrcluster` runs two iterative clustering algorithms as sequences of
//! map/combine/reduce stages:
//! - K-means over points in Euclidean space (assign, then fold per-cluster
//!   aggregate deltas).
//! - Markov Clustering (MCL) over a sparse matrix (normalize, expand, inflate).
//!
//! Stage logic is pure: every map and reduce invocation only sees its own
//! input plus read-only configuration (and, for K-means, the cluster snapshot
//! of the current iteration). Grouping by key, partitioning and the barrier
//! between stages belong to an [`engine::ExecutionEngine`].

pub mod codec;
pub mod engine;
pub mod kmeans;
pub mod mcl;
pub mod options;
pub mod report;

pub use codec::{DecodeError, MatrixCodec, PointCodec, RecordCodec};
pub use engine::{EngineOptions, ExecutionEngine, LocalEngine};
pub use kmeans::{run_kmeans, Cluster, ClusterId, ClusterStore, KMeansOutcome, UNASSIGNED};
pub use mcl::{run_mcl, MatrixEntry, MclOutcome, PRUNE_THRESHOLD};
pub use options::{ConfigError, KMeansOptions, MclOptions};
pub use report::{IterationStats, RunReport};
