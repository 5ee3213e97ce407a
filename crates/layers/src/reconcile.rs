//! Add-or-update merging of fetched locations into type buckets.

use foundation::LatLng;
use streaming::{LocationRecord, ViewConfig, number_value, provided_value};

use crate::bucket::PlacedLocation;
use crate::service::{MapLayerService, MarkerSpec};
use crate::view::ViewContext;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither a usable geolocation nor both configured coordinates.
    NoPosition,
    /// None of the record's type tags has a bucket.
    NoBucket,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    Updated,
    Skipped(SkipReason),
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl MergeSummary {
    pub fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Added => self.added += 1,
            MergeOutcome::Updated => self.updated += 1,
            MergeOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Where merged records are filed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MergeTarget<'a> {
    /// Pick the bucket from the record's own type tags.
    ByTypeTags,
    /// File every record under this type.
    Type(&'a str),
}

/// Marker position: the geolocation point if it has one, else the first
/// provided latitude and longitude candidates.
pub fn resolve_position(config: &ViewConfig, record: &LocationRecord) -> Option<LatLng> {
    if let Some(p) = record.geolocation_point() {
        return Some(p);
    }
    let lat = provided_value(&config.lat_props, &record.properties).and_then(number_value)?;
    let lng = provided_value(&config.long_props, &record.properties).and_then(number_value)?;
    Some(LatLng::new(lat, lng))
}

fn marker_spec(config: &ViewConfig, location_type: &str, record: &LocationRecord, position: LatLng) -> MarkerSpec {
    let tooltip = config
        .tooltip_properties
        .iter()
        .filter_map(|key| record.properties.get(key).map(|v| (key.clone(), v.clone())))
        .filter(|(_, v)| !v.is_null())
        .collect();
    MarkerSpec {
        id: record.id.clone(),
        location_type: location_type.to_string(),
        position,
        name: record.name().map(str::to_owned),
        affected_radius: provided_value(&config.affected_radius_props, &record.properties)
            .and_then(number_value),
        tooltip,
    }
}

impl<M: MapLayerService> ViewContext<M> {
    /// Merges one record, resolving its bucket from its type tags.
    pub fn merge_location(&mut self, record: LocationRecord) -> MergeOutcome {
        let Some(location_type) = self.buckets.resolve(&record.entity_types).map(str::to_owned) else {
            return MergeOutcome::Skipped(SkipReason::NoBucket);
        };
        self.merge_location_into(&location_type, record)
    }

    /// Merges one record into the bucket for `location_type`.
    ///
    /// A known id supersedes the stored record and moves its marker; an
    /// unknown id is appended and gets a new marker.
    pub fn merge_location_into(&mut self, location_type: &str, record: LocationRecord) -> MergeOutcome {
        let Some(position) = resolve_position(&self.config, &record) else {
            return MergeOutcome::Skipped(SkipReason::NoPosition);
        };
        let Some(bucket) = self.buckets.get_mut(location_type) else {
            return MergeOutcome::Skipped(SkipReason::NoBucket);
        };

        let spec = marker_spec(&self.config, location_type, &record, position);
        if let Some(existing) = bucket.get(&record.id) {
            self.layers.update_marker(existing.marker, &spec);
            bucket.update(record, position);
            MergeOutcome::Updated
        } else {
            let marker = self.layers.add_marker(bucket.layer(), &spec);
            bucket.add(PlacedLocation {
                record,
                position,
                marker,
            });
            MergeOutcome::Added
        }
    }

    pub fn merge_all(&mut self, records: impl IntoIterator<Item = LocationRecord>, target: MergeTarget<'_>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for record in records {
            let outcome = match target {
                MergeTarget::ByTypeTags => self.merge_location(record),
                MergeTarget::Type(t) => self.merge_location_into(t, record),
            };
            if let MergeOutcome::Skipped(reason) = outcome {
                tracing::trace!(?reason, "location skipped");
            }
            summary.record(outcome);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::{MergeOutcome, MergeSummary, MergeTarget, SkipReason, resolve_position};
    use crate::recording::RecordingLayers;
    use crate::view::ViewContext;
    use foundation::LatLng;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use streaming::{LocationRecord, ViewConfig};

    fn config() -> ViewConfig {
        ViewConfig {
            location_types: vec!["host".into(), "router".into()],
            lat_props: vec!["latitude".into(), "lat".into()],
            long_props: vec!["longitude".into(), "lng".into()],
            affected_radius_props: vec!["radius".into()],
            tooltip_properties: vec!["status".into(), "owner".into()],
            ..Default::default()
        }
    }

    fn record(v: Value) -> LocationRecord {
        serde_json::from_value(v).unwrap()
    }

    fn point(id: &str, types: &[&str], lat: f64, lng: f64) -> LocationRecord {
        record(json!({
            "_id": id,
            "entityTypes": types,
            "geolocation": {"type": "Point", "coordinates": [lng, lat]}
        }))
    }

    #[test]
    fn new_id_is_added() {
        let mut view = ViewContext::new(config(), RecordingLayers::new());
        let outcome = view.merge_location(point("h1", &["host"], 1.0, 2.0));
        assert_eq!(outcome, MergeOutcome::Added);
        assert_eq!(view.bucket("host").unwrap().len(), 1);
        assert_eq!(view.layers().markers().len(), 1);
    }

    #[test]
    fn known_id_is_updated_in_place() {
        let mut view = ViewContext::new(config(), RecordingLayers::new());
        view.merge_location(point("h1", &["host"], 1.0, 2.0));
        let outcome = view.merge_location(point("h1", &["host"], 5.0, 6.0));
        assert_eq!(outcome, MergeOutcome::Updated);

        let bucket = view.bucket("host").unwrap();
        assert_eq!(bucket.len(), 1);
        let placed = bucket.get("h1").unwrap();
        assert_eq!(placed.position, LatLng::new(5.0, 6.0));

        let marker = &view.layers().markers()[&placed.marker];
        assert_eq!(marker.updates, 1);
        assert_eq!(marker.spec.position, LatLng::new(5.0, 6.0));
        assert_eq!(view.layers().markers().len(), 1);
    }

    #[test]
    fn record_without_position_is_dropped() {
        let mut view = ViewContext::new(config(), RecordingLayers::new());
        let outcome = view.merge_location(record(json!({
            "_id": "h1", "entityTypes": ["host"], "lat": 3.0
        })));
        assert_eq!(outcome, MergeOutcome::Skipped(SkipReason::NoPosition));
        assert!(view.bucket("host").unwrap().is_empty());
        assert!(view.layers().markers().is_empty());
    }

    #[test]
    fn configured_coordinates_are_used() {
        let cfg = config();
        let r = record(json!({"_id": "x", "lat": "4.5", "longitude": -1, "lng": 9}));
        assert_eq!(resolve_position(&cfg, &r), Some(LatLng::new(4.5, -1.0)));
    }

    #[test]
    fn first_matching_tag_picks_the_bucket() {
        let mut view = ViewContext::new(config(), RecordingLayers::new());
        view.merge_location(point("d1", &["device", "router", "host"], 0.0, 0.0));
        assert_eq!(view.bucket("router").unwrap().len(), 1);
        assert!(view.bucket("host").unwrap().is_empty());
    }

    #[test]
    fn unknown_types_are_dropped() {
        let mut view = ViewContext::new(config(), RecordingLayers::new());
        let outcome = view.merge_location(point("s1", &["switch"], 0.0, 0.0));
        assert_eq!(outcome, MergeOutcome::Skipped(SkipReason::NoBucket));
    }

    #[test]
    fn marker_carries_radius_and_tooltip() {
        let mut view = ViewContext::new(config(), RecordingLayers::new());
        view.merge_location(record(json!({
            "_id": "h1",
            "entityTypes": ["host"],
            "name": "edge",
            "latitude": 1, "longitude": 2,
            "radius": 250,
            "owner": "ops",
            "status": null
        })));
        let marker = view.layers().markers().values().next().unwrap();
        assert_eq!(marker.spec.name.as_deref(), Some("edge"));
        assert_eq!(marker.spec.affected_radius, Some(250.0));
        assert_eq!(marker.spec.tooltip, vec![("owner".to_string(), json!("ops"))]);
        assert_eq!(marker.spec.location_type, "host");
    }

    #[test]
    fn explicit_target_ignores_tags() {
        let mut view = ViewContext::new(config(), RecordingLayers::new());
        let summary = view.merge_all(
            vec![
                point("a", &["anything"], 0.0, 0.0),
                point("b", &[], 1.0, 1.0),
                record(json!({"_id": "c"})),
            ],
            MergeTarget::Type("router"),
        );
        assert_eq!(
            summary,
            MergeSummary {
                added: 2,
                updated: 0,
                skipped: 1
            }
        );
        assert_eq!(view.bucket("router").unwrap().len(), 2);
    }
}
