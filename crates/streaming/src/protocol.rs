//! Topology wire records.
//!
//! Only the fields the synchronizer depends on are modelled; everything else
//! on a record is kept in its `properties` map so configured property
//! candidates (coordinates, tooltips, colours) can be looked up by name.
//!
//! Decoding is lenient: a response without `_items`, or items that lack an
//! identifier, degrade to fewer records rather than an error.

use foundation::LatLng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type LocationId = String;
pub type EdgeId = String;

/// Edge embedded in a location's `_references` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_id")]
    pub id: EdgeId,
    #[serde(rename = "_fromId")]
    pub from_id: LocationId,
    #[serde(rename = "_toId")]
    pub to_id: LocationId,
    #[serde(rename = "_edgeType", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "_id")]
    pub id: LocationId,
    #[serde(rename = "entityTypes", default)]
    pub entity_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<Value>,
    #[serde(
        rename = "_references",
        default,
        deserialize_with = "lenient_references",
        skip_serializing_if = "Option::is_none"
    )]
    pub references: Option<Vec<Reference>>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

fn lenient_references<'de, D>(deserializer: D) -> Result<Option<Vec<Reference>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Array(items)) = raw else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
    ))
}

impl LocationRecord {
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }

    /// Point taken from `geolocation`.
    ///
    /// GeoJSON geometries yield their first position (`[lng, lat]`); plain
    /// `{lat, lng}` / `{lat, lon}` objects are accepted too.
    pub fn geolocation_point(&self) -> Option<LatLng> {
        self.geolocation.as_ref().and_then(point_from_geometry)
    }
}

fn point_from_geometry(v: &Value) -> Option<LatLng> {
    let obj = v.as_object()?;
    if let Some(coords) = obj.get("coordinates") {
        return first_position(coords);
    }
    let lat = obj.get("lat").and_then(number_value)?;
    let lng = obj
        .get("lng")
        .or_else(|| obj.get("lon"))
        .and_then(number_value)?;
    Some(LatLng::new(lat, lng))
}

fn first_position(coords: &Value) -> Option<LatLng> {
    let arr = coords.as_array()?;
    match (arr.first(), arr.get(1)) {
        (Some(Value::Array(_)), _) => first_position(&arr[0]),
        (Some(lng), Some(lat)) => Some(LatLng::new(number_value(lat)?, number_value(lng)?)),
        _ => None,
    }
}

/// Reads a coordinate-like value: JSON numbers and numeric strings.
pub fn number_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whether a property value counts as provided: null, `false` and the empty
/// string do not.
fn is_provided(v: &Value) -> bool {
    match v {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// First candidate property present in `props`; candidate order decides.
pub fn provided_value<'a>(candidates: &[String], props: &'a Map<String, Value>) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|key| props.get(key))
        .find(|v| is_provided(v))
}

/// Records under `_items`. Items that do not decode are dropped.
pub fn decode_locations(body: &Value) -> Vec<LocationRecord> {
    let Some(items) = body.get("_items").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::debug!("dropping undecodable location item: {err}");
                None
            }
        })
        .collect()
}

/// Identifiers of the groups listed under `_items`.
pub fn decode_group_ids(body: &Value) -> Vec<String> {
    let Some(items) = body.get("_items").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| item.get("_id").and_then(Value::as_str))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{decode_group_ids, decode_locations, provided_value};
    use foundation::LatLng;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_geojson_point_as_lat_lng() {
        let body = json!({"_items": [{
            "_id": "h1",
            "entityTypes": ["host"],
            "name": "edge-1",
            "geolocation": {"type": "Point", "coordinates": [-0.12, 51.5]}
        }]});
        let records = decode_locations(&body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), Some("edge-1"));
        assert_eq!(records[0].geolocation_point(), Some(LatLng::new(51.5, -0.12)));
    }

    #[test]
    fn polygon_uses_first_vertex() {
        let body = json!({"_items": [{
            "_id": "a",
            "geolocation": {"type": "Polygon", "coordinates": [[[1.0, 2.0], [3.0, 4.0], [1.0, 2.0]]]}
        }]});
        let records = decode_locations(&body);
        assert_eq!(records[0].geolocation_point(), Some(LatLng::new(2.0, 1.0)));
    }

    #[test]
    fn missing_items_means_no_records() {
        assert!(decode_locations(&json!({"status": "ok"})).is_empty());
        assert!(decode_group_ids(&json!([])).is_empty());
    }

    #[test]
    fn bad_items_and_references_are_skipped() {
        let body = json!({"_items": [
            {"entityTypes": ["host"]},
            {"_id": "r1", "_references": "not-a-list"},
            {"_id": "r2", "_references": [
                {"_id": "e1", "_fromId": "r2", "_toId": "r1", "_edgeType": "connectsTo", "color": "red"},
                {"_id": "e2"}
            ]}
        ]});
        let records = decode_locations(&body);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].references, None);
        let refs = records[1].references.as_ref().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].edge_type.as_deref(), Some("connectsTo"));
        assert_eq!(refs[0].properties.get("color"), Some(&json!("red")));
    }

    #[test]
    fn group_ids_come_from_items() {
        let body = json!({"_items": [{"_id": "g1"}, {"name": "no id"}, {"_id": "g2"}]});
        assert_eq!(decode_group_ids(&body), vec!["g1".to_string(), "g2".to_string()]);
    }

    #[test]
    fn first_provided_candidate_wins() {
        let props = json!({"lat": "", "latitude": 0, "y": 5}).as_object().unwrap().clone();
        let candidates = vec!["missing".to_string(), "lat".to_string(), "latitude".to_string(), "y".to_string()];
        assert_eq!(provided_value(&candidates, &props), Some(&json!(0)));
    }
}
