use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ClusterId, ClusterStore};
use crate::engine::Emitter;

/// Change to one cluster's aggregate caused by reassigned points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDelta {
    pub sum: Vec<f64>,
    /// Points that moved into the cluster.
    pub joined: u64,
    /// Points that moved out of the cluster.
    pub left: u64,
}

impl AggregateDelta {
    pub fn zero(dimension: usize) -> Self {
        Self {
            sum: vec![0.0; dimension],
            joined: 0,
            left: 0,
        }
    }

    pub fn add_point(&mut self, coords: &[f64]) {
        for (acc, x) in self.sum.iter_mut().zip(coords) {
            *acc += x;
        }
        self.joined += 1;
    }

    pub fn remove_point(&mut self, coords: &[f64]) {
        for (acc, x) in self.sum.iter_mut().zip(coords) {
            *acc -= x;
        }
        self.left += 1;
    }

    pub fn merge(&mut self, other: &AggregateDelta) {
        for (acc, x) in self.sum.iter_mut().zip(&other.sum) {
            *acc += x;
        }
        self.joined += other.joined;
        self.left += other.left;
    }

    /// Net change in member count.
    pub fn count(&self) -> i64 {
        self.joined as i64 - self.left as i64
    }
}

/// Records flowing from assignment to centroid update, keyed by cluster id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KMeansValue {
    /// A point now assigned to the key's cluster.
    Point(Vec<f64>),
    Delta(AggregateDelta),
}

/// Assigns one point to its nearest non-empty cluster of `snapshot`.
///
/// Always emits the point under its (possibly unchanged) cluster id. When the
/// assignment changes, also emits a delta removing the point from its previous
/// cluster (if that cluster exists in the snapshot) and one adding it to the
/// new cluster. If every cluster is empty the point keeps `current`.
pub fn assign_point(
    snapshot: &ClusterStore,
    current: ClusterId,
    coords: &[f64],
    out: &mut Emitter<ClusterId, KMeansValue>,
) {
    let target = snapshot.nearest(coords).unwrap_or(current);
    out.emit(target, KMeansValue::Point(coords.to_vec()));
    if target == current {
        return;
    }

    let dimension = snapshot.dimension();
    let mut deltas: BTreeMap<ClusterId, AggregateDelta> = BTreeMap::new();
    if snapshot.contains(current) {
        deltas
            .entry(current)
            .or_insert_with(|| AggregateDelta::zero(dimension))
            .remove_point(coords);
    }
    deltas
        .entry(target)
        .or_insert_with(|| AggregateDelta::zero(dimension))
        .add_point(coords);

    for (id, delta) in deltas {
        out.emit(id, KMeansValue::Delta(delta));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmeans::Cluster;

    fn store() -> ClusterStore {
        ClusterStore::from_seed(&[(1, vec![0.0]), (2, vec![10.0])]).unwrap()
    }

    fn run(snapshot: &ClusterStore, current: ClusterId, coords: &[f64]) -> Vec<(ClusterId, KMeansValue)> {
        let mut out = Emitter::new();
        assign_point(snapshot, current, coords, &mut out);
        out.into_records()
    }

    #[test]
    fn unchanged_assignment_emits_only_the_point() {
        let out = run(&store(), 2, &[11.0]);
        assert_eq!(out, vec![(2, KMeansValue::Point(vec![11.0]))]);
    }

    #[test]
    fn reassignment_emits_negative_and_positive_deltas() {
        let out = run(&store(), 2, &[1.0]);
        assert_eq!(
            out,
            vec![
                (1, KMeansValue::Point(vec![1.0])),
                (
                    1,
                    KMeansValue::Delta(AggregateDelta {
                        sum: vec![1.0],
                        joined: 1,
                        left: 0
                    })
                ),
                (
                    2,
                    KMeansValue::Delta(AggregateDelta {
                        sum: vec![-1.0],
                        joined: 0,
                        left: 1
                    })
                ),
            ]
        );
    }

    #[test]
    fn unassigned_point_only_joins() {
        let out = run(&store(), 0, &[9.0]);
        assert_eq!(
            out,
            vec![
                (2, KMeansValue::Point(vec![9.0])),
                (
                    2,
                    KMeansValue::Delta(AggregateDelta {
                        sum: vec![9.0],
                        joined: 1,
                        left: 0
                    })
                ),
            ]
        );
    }

    #[test]
    fn all_clusters_empty_keeps_current_id() {
        let snapshot = ClusterStore::from_clusters([Cluster {
            id: 1,
            aggregate_sum: vec![0.0],
            count: 0,
        }])
        .unwrap();
        let out = run(&snapshot, 5, &[3.0]);
        assert_eq!(out, vec![(5, KMeansValue::Point(vec![3.0]))]);
    }

    #[test]
    fn delta_merge_is_order_independent() {
        let mut a = AggregateDelta::zero(2);
        a.add_point(&[1.0, 2.0]);
        let mut b = AggregateDelta::zero(2);
        b.remove_point(&[0.5, 0.5]);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_eq!(ab, ba);
        assert_eq!(ab.count(), 0);
        assert_eq!(ab.sum, vec![0.5, 1.5]);
    }
}
