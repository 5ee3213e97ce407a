//! Per-type location stores.
//!
//! Buckets only grow: locations are appended once and superseded in place
//! afterwards. Nothing is ever removed, so a location that disappears
//! upstream stays on the map until the view is dropped.

use std::collections::HashMap;

use foundation::LatLng;
use streaming::{LocationId, LocationRecord};

use crate::service::{LayerGroupId, MarkerHandle};

/// A reconciled location together with where it was drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLocation {
    pub record: LocationRecord,
    pub position: LatLng,
    pub marker: MarkerHandle,
}

/// Ordered locations of one semantic type, indexed by id.
///
/// Every indexed id appears exactly once in the sequence.
#[derive(Debug)]
pub struct TypeBucket {
    name: String,
    layer: LayerGroupId,
    locations: Vec<PlacedLocation>,
    index: HashMap<LocationId, usize>,
}

impl TypeBucket {
    pub fn new(name: impl Into<String>, layer: LayerGroupId) -> Self {
        Self {
            name: name.into(),
            layer,
            locations: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer(&self) -> LayerGroupId {
        self.layer
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&PlacedLocation> {
        self.index.get(id).map(|&i| &self.locations[i])
    }

    /// Locations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PlacedLocation> {
        self.locations.iter()
    }

    /// Appends a new location. Returns `false`, leaving the bucket unchanged,
    /// when the id is already present.
    pub fn add(&mut self, placed: PlacedLocation) -> bool {
        if self.contains(&placed.record.id) {
            return false;
        }
        self.index
            .insert(placed.record.id.clone(), self.locations.len());
        self.locations.push(placed);
        true
    }

    /// Supersedes the record and position of an existing location; the marker
    /// handle is kept. Returns `false` when the id is unknown.
    pub fn update(&mut self, record: LocationRecord, position: LatLng) -> bool {
        let Some(&i) = self.index.get(&record.id) else {
            return false;
        };
        let slot = &mut self.locations[i];
        slot.record = record;
        slot.position = position;
        true
    }
}

/// Registered type buckets in registration order.
#[derive(Debug, Default)]
pub struct Buckets {
    buckets: Vec<TypeBucket>,
    by_name: HashMap<String, usize>,
}

impl Buckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bucket; an already registered name keeps its bucket.
    pub fn register(&mut self, bucket: TypeBucket) -> bool {
        if self.by_name.contains_key(bucket.name()) {
            return false;
        }
        self.by_name
            .insert(bucket.name().to_string(), self.buckets.len());
        self.buckets.push(bucket);
        true
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TypeBucket> {
        self.by_name.get(name).map(|&i| &self.buckets[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TypeBucket> {
        self.by_name.get(name).map(|&i| &mut self.buckets[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeBucket> {
        self.buckets.iter()
    }

    /// First tag, in the record's own order, that names a registered bucket.
    pub fn resolve<'r>(&self, tags: &'r [String]) -> Option<&'r str> {
        tags.iter()
            .map(String::as_str)
            .find(|t| self.is_registered(t))
    }

    pub fn combined<'a>(&'a self, order: &'a [String]) -> CombinedLocations<'a> {
        CombinedLocations {
            buckets: self,
            order,
        }
    }
}

/// Read-through view over several buckets.
///
/// Iteration visits the buckets in `order`. When an id is filed under more
/// than one of them, lookups answer from the bucket latest in `order`.
#[derive(Debug, Clone, Copy)]
pub struct CombinedLocations<'a> {
    buckets: &'a Buckets,
    order: &'a [String],
}

impl<'a> CombinedLocations<'a> {
    pub fn get(&self, id: &str) -> Option<&'a PlacedLocation> {
        self.order
            .iter()
            .rev()
            .filter_map(|t| self.buckets.get(t))
            .find_map(|b| b.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a PlacedLocation> + 'a {
        let buckets = self.buckets;
        self.order
            .iter()
            .filter_map(move |t| buckets.get(t))
            .flat_map(TypeBucket::iter)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{Buckets, PlacedLocation, TypeBucket};
    use crate::service::{LayerGroupId, MarkerHandle};
    use foundation::LatLng;
    use serde_json::json;
    use streaming::LocationRecord;

    fn record(id: &str, types: &[&str]) -> LocationRecord {
        serde_json::from_value(json!({"_id": id, "entityTypes": types})).unwrap()
    }

    fn placed(id: &str, lat: f64) -> PlacedLocation {
        PlacedLocation {
            record: record(id, &["host"]),
            position: LatLng::new(lat, 0.0),
            marker: MarkerHandle(0),
        }
    }

    #[test]
    fn add_then_update_keeps_single_entry() {
        let mut b = TypeBucket::new("host", LayerGroupId(0));
        assert!(b.add(placed("h1", 1.0)));
        assert!(!b.add(placed("h1", 2.0)));
        assert_eq!(b.len(), 1);

        assert!(b.update(record("h1", &["host"]), LatLng::new(3.0, 0.0)));
        assert_eq!(b.len(), 1);
        assert_eq!(b.get("h1").unwrap().position.lat, 3.0);
        assert!(!b.update(record("h2", &["host"]), LatLng::new(0.0, 0.0)));
    }

    #[test]
    fn first_registered_tag_wins() {
        let mut buckets = Buckets::new();
        buckets.register(TypeBucket::new("router", LayerGroupId(0)));
        buckets.register(TypeBucket::new("host", LayerGroupId(1)));
        let tags = vec!["device".to_string(), "host".to_string(), "router".to_string()];
        assert_eq!(buckets.resolve(&tags), Some("host"));
        assert_eq!(buckets.resolve(&["device".to_string()]), None);
    }

    #[test]
    fn duplicate_registration_is_refused() {
        let mut buckets = Buckets::new();
        assert!(buckets.register(TypeBucket::new("host", LayerGroupId(0))));
        assert!(!buckets.register(TypeBucket::new("host", LayerGroupId(9))));
        assert_eq!(buckets.get("host").unwrap().layer(), LayerGroupId(0));
    }

    #[test]
    fn combined_view_iterates_in_order_and_prefers_later_types() {
        let mut buckets = Buckets::new();
        buckets.register(TypeBucket::new("host", LayerGroupId(0)));
        buckets.register(TypeBucket::new("router", LayerGroupId(1)));
        buckets.get_mut("host").unwrap().add(placed("a", 1.0));
        buckets.get_mut("host").unwrap().add(placed("shared", 1.0));
        buckets.get_mut("router").unwrap().add(placed("shared", 2.0));
        buckets.get_mut("router").unwrap().add(placed("b", 2.0));

        let order = vec!["host".to_string(), "router".to_string(), "unregistered".to_string()];
        let view = buckets.combined(&order);
        let ids: Vec<&str> = view.iter().map(|p| p.record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "shared", "shared", "b"]);
        assert_eq!(view.get("shared").unwrap().position.lat, 2.0);
        assert!(view.get("zzz").is_none());

        let only_host = vec!["host".to_string()];
        assert_eq!(buckets.combined(&only_host).len(), 2);
    }
}
