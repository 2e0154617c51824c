use serde::{Deserialize, Serialize};

use super::assign::{AggregateDelta, KMeansValue};
use super::{Cluster, ClusterId, ClusterStore};
use crate::engine::Emitter;

/// Output of the centroid-update reduce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdateOutput {
    /// Point record carried into the next iteration.
    Point(Vec<f64>),
    /// The cluster's aggregate after folding this iteration's deltas.
    Aggregate(ClusterUpdate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterUpdate {
    pub cluster: Cluster,
    pub joined: u64,
    pub left: u64,
}

/// Collapses the deltas of a partial group into one, passing points through.
pub fn combine_deltas(values: Vec<KMeansValue>) -> Vec<KMeansValue> {
    let mut merged: Option<AggregateDelta> = None;
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            KMeansValue::Point(_) => out.push(value),
            KMeansValue::Delta(delta) => match merged.as_mut() {
                Some(acc) => acc.merge(&delta),
                None => merged = Some(delta),
            },
        }
    }
    out.extend(merged.map(KMeansValue::Delta));
    out
}

/// Folds every delta for cluster `id` into its snapshot aggregate.
///
/// Emits each point unchanged and, when at least one delta arrived, exactly
/// one updated aggregate.
pub fn fold_cluster(
    snapshot: &ClusterStore,
    id: ClusterId,
    values: Vec<KMeansValue>,
    out: &mut Emitter<ClusterId, UpdateOutput>,
) {
    let mut total: Option<AggregateDelta> = None;
    for value in values {
        match value {
            KMeansValue::Point(coords) => out.emit(id, UpdateOutput::Point(coords)),
            KMeansValue::Delta(delta) => match total.as_mut() {
                Some(acc) => acc.merge(&delta),
                None => total = Some(delta),
            },
        }
    }

    let Some(delta) = total else {
        return;
    };
    let Some(current) = snapshot.get(id) else {
        tracing::warn!(cluster = id, "delta for cluster missing from snapshot");
        return;
    };

    let mut aggregate_sum = current.aggregate_sum.clone();
    for (acc, d) in aggregate_sum.iter_mut().zip(&delta.sum) {
        *acc += d;
    }
    let mut count = current.count as i64 + delta.count();
    if count < 0 {
        tracing::warn!(cluster = id, count, "aggregate count went negative, clamping to 0");
        count = 0;
    }
    if count == 0 {
        aggregate_sum.iter_mut().for_each(|s| *s = 0.0);
    }

    out.emit(
        id,
        UpdateOutput::Aggregate(ClusterUpdate {
            cluster: Cluster {
                id,
                aggregate_sum,
                count: count as u64,
            },
            joined: delta.joined,
            left: delta.left,
        }),
    );
}
