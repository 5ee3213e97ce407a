use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        LatLng { lat, lng }
    }
}

/// Geographic rectangle given by its south-west and north-east corners.
///
/// Serialized with the same corner names a map viewport reports, so the JSON
/// form can be embedded verbatim in request identifiers.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    #[serde(rename = "_southWest")]
    pub south_west: LatLng,
    #[serde(rename = "_northEast")]
    pub north_east: LatLng,
}

impl GeoBounds {
    pub const fn new(south_west: LatLng, north_east: LatLng) -> Self {
        GeoBounds {
            south_west,
            north_east,
        }
    }

    /// Builds bounds from `south, west, north, east` degrees.
    pub const fn from_edges(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }
}

#[cfg(test)]
mod tests {
    use super::{GeoBounds, LatLng};

    #[test]
    fn json_uses_viewport_corner_names() {
        let b = GeoBounds::from_edges(1.0, 2.0, 3.0, 4.0);
        let s = serde_json::to_string(&b).unwrap();
        assert_eq!(
            s,
            r#"{"_southWest":{"lat":1.0,"lng":2.0},"_northEast":{"lat":3.0,"lng":4.0}}"#
        );
    }

    #[test]
    fn edges_map_to_corners() {
        let b = GeoBounds::from_edges(-5.0, 10.0, 5.0, 20.0);
        assert_eq!(b, GeoBounds::new(LatLng::new(-5.0, 10.0), LatLng::new(5.0, 20.0)));
    }
}
