use std::collections::{BTreeMap, HashMap};

use foundation::{GeoBounds, LatLng};
use streaming::{EdgeId, LocationId, ViewConfig};

use crate::bucket::{Buckets, CombinedLocations, TypeBucket};
use crate::service::{LayerGroupId, LinkHandle, LinkStyle, MapLayerService};

/// Group key used for every link when all link types are rendered together.
pub const ALL_LINK_TYPES: &str = "*";

/// A link currently drawn on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLink {
    pub handle: LinkHandle,
    pub from_id: LocationId,
    pub to_id: LocationId,
    pub endpoints: [LatLng; 2],
    pub style: LinkStyle,
}

/// Mutable state of one map view.
///
/// Holds the configuration, current zoom, per-type buckets, drawn links and
/// the link layer groups. The synchronizer mutates it in place; callers
/// read it through the accessors.
pub struct ViewContext<M> {
    pub(crate) config: ViewConfig,
    pub(crate) zoom: u8,
    pub(crate) buckets: Buckets,
    pub(crate) links: HashMap<EdgeId, PlacedLink>,
    pub(crate) link_groups: BTreeMap<String, LayerGroupId>,
    pub(crate) layers: M,
}

impl<M: MapLayerService> ViewContext<M> {
    /// Creates a view with one bucket per configured location type and one
    /// link group per configured link type (or a single `*` group).
    pub fn new(config: ViewConfig, mut layers: M) -> Self {
        let mut buckets = Buckets::new();
        for t in &config.location_types {
            if !buckets.is_registered(t) {
                let group = layers.create_layer_group(t);
                buckets.register(TypeBucket::new(t.clone(), group));
            }
        }

        let mut link_groups = BTreeMap::new();
        if !config.hide_links {
            let names: Vec<&str> = if config.all_link_types() {
                vec![ALL_LINK_TYPES]
            } else {
                config.location_link_types.iter().map(String::as_str).collect()
            };
            for name in names {
                if !link_groups.contains_key(name) {
                    let group = layers.create_layer_group(name);
                    link_groups.insert(name.to_string(), group);
                }
            }
        }

        Self {
            config,
            zoom: 0,
            buckets,
            links: HashMap::new(),
            link_groups,
            layers,
        }
    }

    /// Effective filter box: explicit bounds, else the current viewport.
    pub fn effective_bounds(&self, explicit: Option<GeoBounds>) -> Option<GeoBounds> {
        explicit.or_else(|| self.layers.viewport_bounds())
    }
}

impl<M> ViewContext<M> {
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom;
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    pub fn bucket(&self, name: &str) -> Option<&TypeBucket> {
        self.buckets.get(name)
    }

    /// All configured location types as one read-through view.
    pub fn combined_locations(&self) -> CombinedLocations<'_> {
        self.buckets.combined(&self.config.location_types)
    }

    pub fn link(&self, id: &str) -> Option<&PlacedLink> {
        self.links.get(id)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn link_group(&self, link_type: &str) -> Option<LayerGroupId> {
        self.link_groups.get(link_type).copied()
    }

    pub fn layers(&self) -> &M {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut M {
        &mut self.layers
    }
}

#[cfg(test)]
mod tests {
    use super::{ALL_LINK_TYPES, ViewContext};
    use crate::recording::RecordingLayers;
    use foundation::GeoBounds;
    use streaming::ViewConfig;

    fn config(link_types: &[&str]) -> ViewConfig {
        ViewConfig {
            location_types: vec!["host".into(), "router".into(), "host".into()],
            location_link_types: link_types.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn creates_buckets_and_link_groups() {
        let view = ViewContext::new(config(&["connectsTo", "dependsOn"]), RecordingLayers::new());
        assert_eq!(view.buckets().iter().count(), 2);
        assert!(view.link_group("connectsTo").is_some());
        assert!(view.link_group("dependsOn").is_some());
        assert!(view.link_group(ALL_LINK_TYPES).is_none());
    }

    #[test]
    fn wildcard_creates_single_group() {
        let view = ViewContext::new(config(&["*"]), RecordingLayers::new());
        assert!(view.link_group(ALL_LINK_TYPES).is_some());
        assert_eq!(view.layers().attached_names(), vec!["*", "host", "router"]);
    }

    #[test]
    fn hidden_links_create_no_groups() {
        let mut cfg = config(&["connectsTo"]);
        cfg.hide_links = true;
        let view = ViewContext::new(cfg, RecordingLayers::new());
        assert!(view.link_group("connectsTo").is_none());
    }

    #[test]
    fn explicit_bounds_beat_viewport() {
        let viewport = GeoBounds::from_edges(0.0, 0.0, 1.0, 1.0);
        let explicit = GeoBounds::from_edges(5.0, 5.0, 6.0, 6.0);
        let mut view = ViewContext::new(config(&[]), RecordingLayers::with_viewport(viewport));
        assert_eq!(view.effective_bounds(Some(explicit)), Some(explicit));
        assert_eq!(view.effective_bounds(None), Some(viewport));
        view.layers_mut().set_viewport(None);
        assert_eq!(view.effective_bounds(None), None);
    }
}
