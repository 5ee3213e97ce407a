use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Layer and type restrictions for one zoom level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomLevelTypes {
    /// Type layers attached to the map at this zoom level.
    #[serde(default)]
    pub location_types: Vec<String>,
    /// Location/group types requested from the server at this zoom level.
    #[serde(default)]
    pub data_types: Vec<String>,
}

/// View configuration consumed by the synchronizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    #[serde(default)]
    pub return_composites: bool,
    #[serde(default = "default_location_limit")]
    pub location_limit: u32,
    #[serde(default)]
    pub lat_props: Vec<String>,
    #[serde(default)]
    pub long_props: Vec<String>,
    #[serde(default)]
    pub affected_radius_props: Vec<String>,
    #[serde(default)]
    pub tooltip_properties: Vec<String>,
    #[serde(default)]
    pub link_color_props: Vec<String>,
    #[serde(default)]
    pub hide_links: bool,
    /// Link types to request, or `["*"]` for every type.
    #[serde(default)]
    pub location_link_types: Vec<String>,
    /// Raw zoom configuration; a non-empty map switches zoom filtering on.
    #[serde(default)]
    pub zoom_type_map: BTreeMap<String, Value>,
    #[serde(default)]
    pub zoom_level_type_map: BTreeMap<u8, ZoomLevelTypes>,
    #[serde(default)]
    pub location_group_types: Vec<String>,
    #[serde(default)]
    pub location_types: Vec<String>,
    /// Upper bound on concurrent sub-requests for group location fetches.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_link_color")]
    pub default_link_color: String,
}

fn default_location_limit() -> u32 {
    5000
}

fn default_max_concurrent_requests() -> usize {
    1
}

fn default_link_color() -> String {
    "#000000".to_string()
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            return_composites: false,
            location_limit: default_location_limit(),
            lat_props: Vec::new(),
            long_props: Vec::new(),
            affected_radius_props: Vec::new(),
            tooltip_properties: Vec::new(),
            link_color_props: Vec::new(),
            hide_links: false,
            location_link_types: Vec::new(),
            zoom_type_map: BTreeMap::new(),
            zoom_level_type_map: BTreeMap::new(),
            location_group_types: Vec::new(),
            location_types: Vec::new(),
            max_concurrent_requests: default_max_concurrent_requests(),
            default_link_color: default_link_color(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read view config: {e}"),
            ConfigError::Parse(e) => write!(f, "invalid view config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl ViewConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Parse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&text)
    }

    /// `true` when every link type is rendered into the single `*` group.
    pub fn all_link_types(&self) -> bool {
        self.location_link_types.first().is_some_and(|t| t == "*")
    }

    pub fn zoom_filtering(&self) -> bool {
        !self.zoom_type_map.is_empty()
    }

    /// Restrictions for `zoom`, or `None` when zoom filtering is off.
    ///
    /// With filtering on, a zoom level that has no entry permits nothing.
    pub fn zoom_types(&self, zoom: u8) -> Option<ZoomLevelTypes> {
        if !self.zoom_filtering() {
            return None;
        }
        Some(
            self.zoom_level_type_map
                .get(&zoom)
                .cloned()
                .unwrap_or_default(),
        )
    }

    /// `types` narrowed to the data types requested at `zoom`, order kept.
    pub fn zoom_level_types(&self, zoom: u8, types: &[String]) -> Vec<String> {
        match self.zoom_types(zoom) {
            None => types.to_vec(),
            Some(z) => types
                .iter()
                .filter(|t| z.data_types.contains(t))
                .cloned()
                .collect(),
        }
    }
}
