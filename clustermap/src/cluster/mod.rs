//! Clusters, cluster sets and the partitioning algorithm.

use crate::item::ClusterItem;
use clustermap_types::GeoPoint2d;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod algorithm;

pub use algorithm::{cluster_all, cluster_incremental, IncrementalOutcome};
pub(crate) use algorithm::partition;

/// Number of the recompute request a result was computed for.
///
/// Generations grow monotonically. A result whose generation is not the current one is stale
/// and is never applied to the map.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub(crate) u64);

impl Generation {
    /// Numeric value of the generation.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for Generation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameters of one partitioning pass, derived from the viewport.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClusterParams {
    /// Maximum distance in meters between a cluster center and an item joining it.
    pub threshold: f64,
    /// When false every item gets its own cluster.
    pub clustering_enabled: bool,
}

impl ClusterParams {
    /// Creates new parameters.
    pub fn new(threshold: f64, clustering_enabled: bool) -> Self {
        Self {
            threshold,
            clustering_enabled,
        }
    }
}

/// One or more items rendered as a single badge marker.
///
/// The center of the cluster is the position of the item that founded it. It is not moved when
/// other items join the cluster.
pub struct Cluster<I> {
    center: GeoPoint2d,
    items: Vec<Arc<I>>,
}

impl<I> Clone for Cluster<I> {
    fn clone(&self) -> Self {
        Self {
            center: self.center,
            items: self.items.clone(),
        }
    }
}

impl<I> std::fmt::Debug for Cluster<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster")
            .field("center", &self.center)
            .field("size", &self.items.len())
            .finish()
    }
}

impl<I: ClusterItem> Cluster<I> {
    pub(crate) fn found(item: Arc<I>) -> Self {
        Self {
            center: item.position(),
            items: vec![item],
        }
    }

    pub(crate) fn push(&mut self, item: Arc<I>) {
        self.items.push(item);
    }

    /// Item that founded the cluster. Its position is the cluster center.
    pub fn founder(&self) -> &Arc<I> {
        // a cluster is always created with its founding item
        &self.items[0]
    }

    /// Identity of the cluster: the id of its founding item.
    pub fn key(&self) -> I::Id {
        self.founder().id()
    }

    /// Ids of all the members in the order they joined.
    pub fn member_ids(&self) -> Vec<I::Id> {
        self.items.iter().map(|item| item.id()).collect()
    }
}

impl<I> Cluster<I> {
    /// Center of the cluster.
    pub fn center(&self) -> GeoPoint2d {
        self.center
    }

    /// Members of the cluster in the order they joined it.
    pub fn items(&self) -> &[Arc<I>] {
        &self.items
    }

    /// Number of items in the cluster.
    pub fn size(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the cluster contains exactly one item.
    pub fn is_singleton(&self) -> bool {
        self.items.len() == 1
    }
}

/// Immutable result of one partitioning pass.
pub struct ClusterSet<I> {
    generation: Generation,
    params: ClusterParams,
    clusters: Vec<Cluster<I>>,
}

impl<I> std::fmt::Debug for ClusterSet<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSet")
            .field("generation", &self.generation)
            .field("params", &self.params)
            .field("clusters", &self.clusters)
            .finish()
    }
}

impl<I: ClusterItem> ClusterSet<I> {
    pub(crate) fn new(generation: Generation, params: ClusterParams, clusters: Vec<Cluster<I>>) -> Self {
        Self {
            generation,
            params,
            clusters,
        }
    }

    /// Returns a copy of the set with the result of an incremental step applied, and the index
    /// of the affected cluster.
    pub(crate) fn with_outcome(&self, outcome: IncrementalOutcome<I>) -> (Self, usize) {
        let mut clusters = self.clusters.clone();
        let index = match outcome {
            IncrementalOutcome::Joined { index, cluster } => {
                clusters[index] = cluster;
                index
            }
            IncrementalOutcome::Created(cluster) => {
                clusters.push(cluster);
                clusters.len() - 1
            }
        };

        (
            Self {
                generation: self.generation,
                params: self.params,
                clusters,
            },
            index,
        )
    }
}

impl<I> ClusterSet<I> {
    /// Generation of the request this set was computed for.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Parameters the set was computed with.
    pub fn params(&self) -> ClusterParams {
        self.params
    }

    /// Clusters in creation order.
    pub fn clusters(&self) -> &[Cluster<I>] {
        &self.clusters
    }

    /// Total number of items in all clusters.
    pub fn item_count(&self) -> usize {
        self.clusters.iter().map(Cluster::size).sum()
    }

    /// Returns true if the set has no clusters.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}
