use foundation::{GeoBounds, LatLng};
use serde_json::Value;
use streaming::LocationId;

/// A layer group owned by the map (one clustering group per location type or link type).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerGroupId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkHandle(pub u64);

/// Everything a marker needs to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub id: LocationId,
    /// Location type; selects the marker styling.
    pub location_type: String,
    pub position: LatLng,
    pub name: Option<String>,
    pub affected_radius: Option<f64>,
    /// Configured tooltip properties present on the record, in configured order.
    pub tooltip: Vec<(String, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkStyle {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub smooth_factor: f64,
}

impl LinkStyle {
    pub fn with_color(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            weight: 3.0,
            opacity: 1.0,
            smooth_factor: 1.0,
        }
    }
}

/// Map widget the synchronizer draws into.
///
/// Rendering, clustering and styling live behind this trait.
pub trait MapLayerService: Send {
    /// Current viewport, if the map has one yet.
    fn viewport_bounds(&self) -> Option<GeoBounds>;

    fn create_layer_group(&mut self, name: &str) -> LayerGroupId;

    fn add_marker(&mut self, group: LayerGroupId, marker: &MarkerSpec) -> MarkerHandle;
    fn update_marker(&mut self, handle: MarkerHandle, marker: &MarkerSpec);

    fn add_link(&mut self, group: LayerGroupId, endpoints: [LatLng; 2], style: &LinkStyle) -> LinkHandle;
    fn update_link(&mut self, handle: LinkHandle, endpoints: [LatLng; 2], style: &LinkStyle);

    /// Detach every group from the combined location layer.
    fn clear_combined_layer(&mut self);
    fn attach_to_combined_layer(&mut self, group: LayerGroupId);
}
