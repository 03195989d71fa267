use clustermap_types::GeoPoint2d;
use maybe_sync::{MaybeSend, MaybeSync};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// A geo-positioned object that can be grouped into clusters.
///
/// Items are owned by the caller and handed to the engine wholesale or one by one. The engine
/// wraps them into `Arc`s and never mutates them. The identity returned by [`ClusterItem::id`]
/// must stay stable for the lifetime of the item and be unique within one item set: markers
/// are matched between two consecutive cluster sets by the id of the item that founded the
/// cluster.
pub trait ClusterItem: MaybeSend + MaybeSync + 'static {
    /// Type of the item identity.
    type Id: Clone + Eq + Hash + Debug + MaybeSend + MaybeSync + 'static;

    /// Stable identity of the item.
    fn id(&self) -> Self::Id;

    /// Geographic position of the item.
    fn position(&self) -> GeoPoint2d;
}

/// Ready-made item with a numeric id and an arbitrary payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointItem<T> {
    id: u64,
    position: GeoPoint2d,
    payload: T,
}

impl<T> PointItem<T> {
    /// Creates a new item.
    pub fn new(id: u64, position: GeoPoint2d, payload: T) -> Self {
        Self {
            id,
            position,
            payload,
        }
    }

    /// Payload attached to the item.
    pub fn payload(&self) -> &T {
        &self.payload
    }
}

impl<T> ClusterItem for PointItem<T>
where
    T: MaybeSend + MaybeSync + 'static,
{
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn position(&self) -> GeoPoint2d {
        self.position
    }
}
