use crate::cluster::{Cluster, ClusterParams};
use crate::item::ClusterItem;
use clustermap_types::GeoPoint2d;
use std::sync::Arc;

/// Result of adding a single item to an existing partition.
pub enum IncrementalOutcome<I> {
    /// The item joined the cluster with the given index.
    Joined {
        /// Index of the updated cluster in the set.
        index: usize,
        /// Updated cluster.
        cluster: Cluster<I>,
    },
    /// The item founded a new cluster, appended after all existing ones.
    Created(Cluster<I>),
}

impl<I> IncrementalOutcome<I> {
    /// The cluster containing the added item.
    pub fn cluster(&self) -> &Cluster<I> {
        match self {
            IncrementalOutcome::Joined { cluster, .. } => cluster,
            IncrementalOutcome::Created(cluster) => cluster,
        }
    }
}

fn find_cluster<I>(clusters: &[Cluster<I>], position: &GeoPoint2d, params: ClusterParams) -> Option<usize> {
    if !params.clustering_enabled {
        return None;
    }

    clusters
        .iter()
        .position(|cluster| cluster.center().distance_meters(position) <= params.threshold)
}

/// Partitions `items` into clusters.
///
/// Items are processed in input order. Every item joins the first cluster (in creation order)
/// whose center is within `params.threshold` meters from it, or founds a new cluster otherwise.
/// Cluster centers stay at the position of their founding items. The result is deterministic
/// for the same input order and parameters.
///
/// `should_stop` is checked before every item. Once it returns true the pass is abandoned and
/// `None` is returned.
pub(crate) fn partition<I: ClusterItem>(
    items: &[Arc<I>],
    params: ClusterParams,
    mut should_stop: impl FnMut() -> bool,
) -> Option<Vec<Cluster<I>>> {
    let mut clusters: Vec<Cluster<I>> = Vec::new();
    for item in items {
        if should_stop() {
            return None;
        }

        match find_cluster(&clusters, &item.position(), params) {
            Some(index) => clusters[index].push(item.clone()),
            None => clusters.push(Cluster::found(item.clone())),
        }
    }

    Some(clusters)
}

/// Partitions all `items` into clusters. See [`ClusterParams`] for the meaning of the parameters.
///
/// ```
/// use clustermap::cluster::{cluster_all, ClusterParams};
/// use clustermap::PointItem;
/// use clustermap_types::latlon;
/// use std::sync::Arc;
///
/// let items: Vec<_> = [latlon!(0.0, 0.0), latlon!(0.0, 0.00001), latlon!(10.0, 10.0)]
///     .into_iter()
///     .enumerate()
///     .map(|(id, position)| Arc::new(PointItem::new(id as u64, position, ())))
///     .collect();
///
/// let clusters = cluster_all(&items, ClusterParams::new(50.0, true));
/// assert_eq!(clusters.len(), 2);
/// assert_eq!(clusters[0].size(), 2);
/// ```
pub fn cluster_all<I: ClusterItem>(items: &[Arc<I>], params: ClusterParams) -> Vec<Cluster<I>> {
    partition(items, params, || false).unwrap_or_default()
}

/// Adds one item to an existing partition using the same rule as [`cluster_all`].
///
/// Adding an item this way gives the same membership as repartitioning the whole set with the
/// item appended at the end.
pub fn cluster_incremental<I: ClusterItem>(
    item: Arc<I>,
    clusters: &[Cluster<I>],
    params: ClusterParams,
) -> IncrementalOutcome<I> {
    match find_cluster(clusters, &item.position(), params) {
        Some(index) => {
            let mut cluster = clusters[index].clone();
            cluster.push(item);
            IncrementalOutcome::Joined { index, cluster }
        }
        None => IncrementalOutcome::Created(Cluster::found(item)),
    }
}
