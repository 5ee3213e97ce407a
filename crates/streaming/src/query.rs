//! Query-string construction for topology requests.

use foundation::GeoBounds;
use url::form_urlencoded::Serializer;

use crate::config::ViewConfig;

pub const TOPOLOGY_PREFIX: &str = "/proxy_service/topology";

/// Group listings are not paged by the view configuration.
pub const GROUP_LIMIT: u32 = 5000;

/// Geometric relationship between a location's geolocation and a box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpatialFilterMode {
    Contains,
    Intersect,
    Disjoint,
    #[default]
    Within,
}

impl SpatialFilterMode {
    /// Unrecognised names fall back to [`SpatialFilterMode::Within`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "CONTAINS" => Self::Contains,
            "INTERSECT" => Self::Intersect,
            "DISJOINT" => Self::Disjoint,
            _ => Self::Within,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Contains => ">",
            Self::Intersect => ":",
            Self::Disjoint => "!:",
            Self::Within => "<",
        }
    }
}

/// Decoded `_filter` value for `bounds`.
pub fn spatial_filter(mode: SpatialFilterMode, bounds: &GeoBounds) -> String {
    format!(
        "geolocation{}box,{},{},{},{}",
        mode.token(),
        bounds.south_west.lat,
        bounds.south_west.lng,
        bounds.north_east.lat,
        bounds.north_east.lng
    )
}

/// Builds query strings from a view configuration.
///
/// `bounds` is the effective filter box: the caller passes explicit bounds or
/// falls back to the current viewport. `None` omits the spatial clause.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    config: &'a ViewConfig,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(config: &'a ViewConfig) -> Self {
        Self { config }
    }

    /// Projection, limit, spatial filter and relation parameters for location requests.
    pub fn location_params(&self, mode: SpatialFilterMode, bounds: Option<&GeoBounds>) -> String {
        let cfg = self.config;
        let mut q = Serializer::new(String::new());
        q.append_pair("_return_composites", bool_str(cfg.return_composites))
            .append_pair("_field", "name")
            .append_pair("_field", "entityTypes")
            .append_pair("_field", "geolocation")
            .append_pair("_include_status_severity", "true")
            .append_pair("_limit", &cfg.location_limit.to_string());

        if let Some(b) = bounds {
            q.append_pair("_filter", &spatial_filter(mode, b));
        }

        for props in [
            &cfg.lat_props,
            &cfg.long_props,
            &cfg.affected_radius_props,
            &cfg.tooltip_properties,
            &cfg.link_color_props,
        ] {
            for p in props {
                q.append_pair("_field", p);
            }
        }

        if !cfg.hide_links {
            for t in &cfg.location_link_types {
                q.append_pair("_relation", t);
            }
        }

        q.finish()
    }

    /// `/resources` path for one location type.
    pub fn resources_path(&self, location_type: &str, mode: SpatialFilterMode, bounds: Option<&GeoBounds>) -> String {
        let params = self.location_params(mode, bounds);
        let ty: String = Serializer::new(String::new())
            .append_pair("_type", location_type)
            .finish();
        format!("{TOPOLOGY_PREFIX}/resources?{params}&{ty}")
    }

    /// Member locations of the given groups.
    pub fn group_locations_path<S: AsRef<str>>(
        &self,
        group_ids: &[S],
        mode: SpatialFilterMode,
        bounds: Option<&GeoBounds>,
    ) -> String {
        let ids: Vec<&str> = group_ids.iter().map(AsRef::as_ref).collect();
        format!(
            "{TOPOLOGY_PREFIX}/resources/{}/references/out/groups?{}",
            ids.join(","),
            self.location_params(mode, bounds)
        )
    }

    /// Group listing for one group type.
    pub fn groups_path(&self, group_type: &str, mode: SpatialFilterMode, bounds: Option<&GeoBounds>) -> String {
        let mut q = Serializer::new(String::new());
        q.append_pair("_type", group_type)
            .append_pair("_limit", &GROUP_LIMIT.to_string());
        if let Some(b) = bounds {
            q.append_pair("_filter", &spatial_filter(mode, b));
        }
        format!("{TOPOLOGY_PREFIX}/groups?{}", q.finish())
    }
}

fn bool_str(v: bool) -> &'static str {
    if v { "true" } else { "false" }
}
