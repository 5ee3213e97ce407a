use std::collections::{BTreeMap, BTreeSet};

use foundation::{GeoBounds, LatLng};

use crate::service::{
    LayerGroupId, LinkHandle, LinkStyle, MapLayerService, MarkerHandle, MarkerSpec,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMarker {
    pub group: LayerGroupId,
    pub spec: MarkerSpec,
    pub updates: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedLink {
    pub group: LayerGroupId,
    pub endpoints: [LatLng; 2],
    pub style: LinkStyle,
    pub updates: u32,
}

/// Headless [`MapLayerService`] that keeps what it was asked to draw.
///
/// The combined layer starts with every created group attached, like a map
/// whose type layers are all switched on.
#[derive(Debug, Default)]
pub struct RecordingLayers {
    viewport: Option<GeoBounds>,
    groups: Vec<String>,
    attached: BTreeSet<LayerGroupId>,
    markers: BTreeMap<MarkerHandle, RecordedMarker>,
    links: BTreeMap<LinkHandle, RecordedLink>,
    next_handle: u64,
}

impl RecordingLayers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport(viewport: GeoBounds) -> Self {
        Self {
            viewport: Some(viewport),
            ..Self::default()
        }
    }

    pub fn set_viewport(&mut self, viewport: Option<GeoBounds>) {
        self.viewport = viewport;
    }

    pub fn group_name(&self, group: LayerGroupId) -> Option<&str> {
        self.groups.get(group.0 as usize).map(String::as_str)
    }

    /// Names of the groups attached to the combined layer, sorted.
    pub fn attached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .attached
            .iter()
            .filter_map(|g| self.group_name(*g))
            .map(str::to_owned)
            .collect();
        names.sort();
        names
    }

    pub fn markers(&self) -> &BTreeMap<MarkerHandle, RecordedMarker> {
        &self.markers
    }

    pub fn links(&self) -> &BTreeMap<LinkHandle, RecordedLink> {
        &self.links
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl MapLayerService for RecordingLayers {
    fn viewport_bounds(&self) -> Option<GeoBounds> {
        self.viewport
    }

    fn create_layer_group(&mut self, name: &str) -> LayerGroupId {
        let id = LayerGroupId(self.groups.len() as u64);
        self.groups.push(name.to_string());
        self.attached.insert(id);
        id
    }

    fn add_marker(&mut self, group: LayerGroupId, marker: &MarkerSpec) -> MarkerHandle {
        let handle = MarkerHandle(self.next());
        self.markers.insert(
            handle,
            RecordedMarker {
                group,
                spec: marker.clone(),
                updates: 0,
            },
        );
        handle
    }

    fn update_marker(&mut self, handle: MarkerHandle, marker: &MarkerSpec) {
        if let Some(m) = self.markers.get_mut(&handle) {
            m.spec = marker.clone();
            m.updates += 1;
        }
    }

    fn add_link(&mut self, group: LayerGroupId, endpoints: [LatLng; 2], style: &LinkStyle) -> LinkHandle {
        let handle = LinkHandle(self.next());
        self.links.insert(
            handle,
            RecordedLink {
                group,
                endpoints,
                style: style.clone(),
                updates: 0,
            },
        );
        handle
    }

    fn update_link(&mut self, handle: LinkHandle, endpoints: [LatLng; 2], style: &LinkStyle) {
        if let Some(l) = self.links.get_mut(&handle) {
            l.endpoints = endpoints;
            l.style = style.clone();
            l.updates += 1;
        }
    }

    fn clear_combined_layer(&mut self) {
        self.attached.clear();
    }

    fn attach_to_combined_layer(&mut self, group: LayerGroupId) {
        self.attached.insert(group);
    }
}
