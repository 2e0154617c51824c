use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ClusterId, KMeansError, UNASSIGNED};

/// Running aggregate of the points assigned to one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub aggregate_sum: Vec<f64>,
    pub count: u64,
}

impl Cluster {
    /// `aggregate_sum / count`, or `None` for an empty cluster.
    pub fn centroid(&self) -> Option<Vec<f64>> {
        if self.count == 0 {
            return None;
        }
        let count = self.count as f64;
        Some(self.aggregate_sum.iter().map(|s| s / count).collect())
    }

    /// Squared Euclidean distance from `coords` to the centroid.
    pub fn squared_distance(&self, coords: &[f64]) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let count = self.count as f64;
        Some(
            self.aggregate_sum
                .iter()
                .zip(coords)
                .map(|(sum, x)| {
                    let d = sum / count - x;
                    d * d
                })
                .sum(),
        )
    }
}

/// Read-only snapshot of every cluster for one iteration.
///
/// Ordered by cluster id so that the nearest-cluster scan is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStore {
    clusters: BTreeMap<ClusterId, Cluster>,
    dimension: usize,
}

impl ClusterStore {
    /// Each seed record becomes a cluster whose aggregate holds that single
    /// point (`aggregate_sum = coords`, `count = 1`).
    pub fn from_seed(seed: &[(ClusterId, Vec<f64>)]) -> Result<Self, KMeansError> {
        Self::from_clusters(seed.iter().map(|(id, coords)| Cluster {
            id: *id,
            aggregate_sum: coords.clone(),
            count: 1,
        }))
    }

    pub fn from_clusters(clusters: impl IntoIterator<Item = Cluster>) -> Result<Self, KMeansError> {
        let mut map = BTreeMap::new();
        let mut dimension = None;
        for cluster in clusters {
            if cluster.id == UNASSIGNED {
                return Err(KMeansError::ReservedClusterId);
            }
            let expected = *dimension.get_or_insert(cluster.aggregate_sum.len());
            if cluster.aggregate_sum.len() != expected {
                return Err(KMeansError::SeedDimension {
                    id: cluster.id,
                    expected,
                    found: cluster.aggregate_sum.len(),
                });
            }
            let id = cluster.id;
            if map.insert(id, cluster).is_some() {
                return Err(KMeansError::DuplicateCluster(id));
            }
        }
        let dimension = dimension.ok_or(KMeansError::EmptySeed)?;
        Ok(Self {
            clusters: map,
            dimension,
        })
    }

    pub fn get(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    pub fn contains(&self, id: ClusterId) -> bool {
        self.clusters.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn empty_clusters(&self) -> usize {
        self.clusters.values().filter(|c| c.count == 0).count()
    }

    /// Non-empty cluster with the smallest squared distance to `coords`.
    ///
    /// Ties go to the lowest cluster id. Returns `None` when every cluster is
    /// empty.
    pub fn nearest(&self, coords: &[f64]) -> Option<ClusterId> {
        let mut best: Option<(ClusterId, f64)> = None;
        for cluster in self.clusters.values() {
            let Some(dist) = cluster.squared_distance(coords) else {
                continue;
            };
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((cluster.id, dist)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Next snapshot: `updates` replace their clusters, every other cluster
    /// carries over unchanged. Updates for unknown ids are ignored.
    pub fn apply(&self, updates: impl IntoIterator<Item = Cluster>) -> Self {
        let mut clusters = self.clusters.clone();
        for update in updates {
            if let Some(slot) = clusters.get_mut(&update.id) {
                *slot = update;
            } else {
                tracing::warn!(cluster = update.id, "dropping update for unknown cluster");
            }
        }
        Self {
            clusters,
            dimension: self.dimension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(id: ClusterId, sum: &[f64], count: u64) -> Cluster {
        Cluster {
            id,
            aggregate_sum: sum.to_vec(),
            count,
        }
    }

    #[test]
    fn seed_clusters_hold_one_point() {
        let store = ClusterStore::from_seed(&[(2, vec![10.0, 1.0]), (1, vec![0.0, 0.0])]).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.dimension(), 2);
        let ids: Vec<ClusterId> = store.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.get(2).unwrap().count, 1);
        assert_eq!(store.get(2).unwrap().centroid(), Some(vec![10.0, 1.0]));
    }

    #[test]
    fn seed_errors() {
        assert!(matches!(
            ClusterStore::from_seed(&[]),
            Err(KMeansError::EmptySeed)
        ));
        assert!(matches!(
            ClusterStore::from_seed(&[(0, vec![0.0]), (1, vec![10.0])]),
            Err(KMeansError::ReservedClusterId)
        ));
        assert!(matches!(
            ClusterStore::from_seed(&[(1, vec![0.0]), (1, vec![1.0])]),
            Err(KMeansError::DuplicateCluster(1))
        ));
        assert!(matches!(
            ClusterStore::from_seed(&[(1, vec![0.0]), (2, vec![1.0, 2.0])]),
            Err(KMeansError::SeedDimension {
                id: 2,
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn nearest_uses_centroid_not_sum() {
        // Cluster 1 centroid is 5.0 even though its sum is 10.0.
        let store =
            ClusterStore::from_clusters([cluster(1, &[10.0], 2), cluster(2, &[8.0], 1)]).unwrap();
        assert_eq!(store.nearest(&[5.5]), Some(1));
        assert_eq!(store.nearest(&[7.0]), Some(2));
    }

    #[test]
    fn nearest_breaks_ties_towards_lowest_id() {
        let store =
            ClusterStore::from_clusters([cluster(7, &[2.0], 1), cluster(3, &[0.0], 1)]).unwrap();
        assert_eq!(store.nearest(&[1.0]), Some(3));
    }

    #[test]
    fn nearest_skips_empty_clusters() {
        let store =
            ClusterStore::from_clusters([cluster(1, &[0.0], 0), cluster(2, &[9.0], 1)]).unwrap();
        assert_eq!(store.nearest(&[0.0]), Some(2));

        let all_empty = ClusterStore::from_clusters([cluster(1, &[0.0], 0)]).unwrap();
        assert_eq!(all_empty.nearest(&[0.0]), None);
        assert_eq!(all_empty.get(1).unwrap().centroid(), None);
    }

    #[test]
    fn apply_replaces_only_updated_clusters() {
        let store = ClusterStore::from_seed(&[(1, vec![0.0]), (2, vec![10.0])]).unwrap();
        let next = store.apply([cluster(2, &[21.0], 2), cluster(9, &[1.0], 1)]);
        assert_eq!(next.get(1), store.get(1));
        assert_eq!(next.get(2).unwrap().aggregate_sum, vec![21.0]);
        assert!(!next.contains(9));
        // The previous snapshot is untouched.
        assert_eq!(store.get(2).unwrap().count, 1);
    }
}
