//! Zoom-level restriction of attached layers and requested types.

use crate::service::MapLayerService;
use crate::view::ViewContext;

impl<M: MapLayerService> ViewContext<M> {
    /// Attaches only the type layers registered for the current zoom level.
    ///
    /// Without a zoom map the combined layer is left alone, so every type
    /// stays attached. Returns the names of the attached types, or `None`
    /// when nothing was changed.
    pub fn apply_zoom_layers(&mut self) -> Option<Vec<String>> {
        let zoom_types = self.config.zoom_types(self.zoom)?;
        self.layers.clear_combined_layer();
        let mut attached = Vec::new();
        for t in &zoom_types.location_types {
            if let Some(bucket) = self.buckets.get(t) {
                self.layers.attach_to_combined_layer(bucket.layer());
                attached.push(t.clone());
            }
        }
        tracing::debug!(zoom = self.zoom, ?attached, "zoom layers applied");
        Some(attached)
    }
}

impl<M> ViewContext<M> {
    /// Configured location types requested at the current zoom level.
    pub fn requested_location_types(&self) -> Vec<String> {
        self.config
            .zoom_level_types(self.zoom, &self.config.location_types)
    }

    /// Configured group types requested at the current zoom level.
    pub fn requested_group_types(&self) -> Vec<String> {
        self.config
            .zoom_level_types(self.zoom, &self.config.location_group_types)
    }
}

#[cfg(test)]
mod tests {
    use crate::recording::RecordingLayers;
    use crate::view::ViewContext;
    use streaming::ViewConfig;

    fn zoomed_config() -> ViewConfig {
        ViewConfig::from_json_str(
            r#"{
                "locationTypes": ["region", "site", "host"],
                "locationGroupTypes": ["area", "campus"],
                "zoomTypeMap": {"3": "coarse", "12": "fine"},
                "zoomLevelTypeMap": {
                    "3": {"locationTypes": ["region", "unknown"], "dataTypes": ["region", "area"]},
                    "12": {"locationTypes": ["site", "host"], "dataTypes": ["site", "host", "campus"]}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn only_zoom_types_stay_attached() {
        let mut view = ViewContext::new(zoomed_config(), RecordingLayers::new());
        view.set_zoom(12);
        assert_eq!(view.apply_zoom_layers(), Some(vec!["site".to_string(), "host".to_string()]));
        assert_eq!(view.layers().attached_names(), vec!["host", "site"]);

        view.set_zoom(3);
        view.apply_zoom_layers();
        assert_eq!(view.layers().attached_names(), vec!["region"]);
    }

    #[test]
    fn requested_types_follow_zoom() {
        let mut view = ViewContext::new(zoomed_config(), RecordingLayers::new());
        view.set_zoom(3);
        assert_eq!(view.requested_location_types(), vec!["region"]);
        assert_eq!(view.requested_group_types(), vec!["area"]);
        view.set_zoom(12);
        assert_eq!(view.requested_location_types(), vec!["site", "host"]);
        assert_eq!(view.requested_group_types(), vec!["campus"]);
    }

    #[test]
    fn without_zoom_map_everything_stays() {
        let cfg = ViewConfig {
            location_types: vec!["host".into(), "router".into()],
            ..Default::default()
        };
        let mut view = ViewContext::new(cfg, RecordingLayers::new());
        view.set_zoom(9);
        assert_eq!(view.apply_zoom_layers(), None);
        assert_eq!(view.layers().attached_names(), vec!["host", "router"]);
        assert_eq!(view.requested_location_types(), vec!["host", "router"]);
    }
}
