//! Derives map links from the references carried by reconciled locations.
//!
//! One pass walks every configured location type, skips references that were
//! already handled in this pass or whose endpoints are not loaded, and either
//! moves an existing link or draws a new one. Each edge id is handled once per
//! pass whatever the outcome, so counts in [`LinkSummary`] are per edge. The processed set is local to
//! a pass; the live link map is what makes repeated passes converge.

use std::collections::HashSet;

use streaming::{Reference, ViewConfig, provided_value};

use crate::service::{LinkStyle, MapLayerService};
use crate::view::{ALL_LINK_TYPES, PlacedLink, ViewContext};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LinkSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Colour from the first provided colour property, else the configured default.
pub fn link_color(config: &ViewConfig, edge: &Reference) -> String {
    provided_value(&config.link_color_props, &edge.properties)
        .and_then(|v| v.as_str())
        .unwrap_or(&config.default_link_color)
        .to_string()
}

impl<M: MapLayerService> ViewContext<M> {
    pub fn sync_links(&mut self) -> LinkSummary {
        let mut summary = LinkSummary::default();
        if self.config.hide_links {
            return summary;
        }

        let all_types = self.config.all_link_types();
        let view = self.buckets.combined(&self.config.location_types);
        let links = &mut self.links;
        let layers = &mut self.layers;
        let mut processed: HashSet<&str> = HashSet::new();

        for location in view.iter() {
            let Some(references) = &location.record.references else {
                continue;
            };
            for edge in references {
                if edge.id.is_empty() || !processed.insert(edge.id.as_str()) {
                    continue;
                }
                let (Some(from), Some(to)) = (view.get(&edge.from_id), view.get(&edge.to_id)) else {
                    summary.skipped += 1;
                    continue;
                };

                let endpoints = [from.position, to.position];
                let style = LinkStyle::with_color(link_color(&self.config, edge));

                if let Some(existing) = links.get_mut(&edge.id) {
                    layers.update_link(existing.handle, endpoints, &style);
                    existing.from_id = edge.from_id.clone();
                    existing.to_id = edge.to_id.clone();
                    existing.endpoints = endpoints;
                    existing.style = style;
                    summary.updated += 1;
                } else {
                    let key = if all_types {
                        ALL_LINK_TYPES
                    } else {
                        edge.edge_type.as_deref().unwrap_or_default()
                    };
                    match self.link_groups.get(key) {
                        Some(&group) => {
                            let handle = layers.add_link(group, endpoints, &style);
                            links.insert(
                                edge.id.clone(),
                                PlacedLink {
                                    handle,
                                    from_id: edge.from_id.clone(),
                                    to_id: edge.to_id.clone(),
                                    endpoints,
                                    style,
                                },
                            );
                            summary.created += 1;
                        }
                        None => {
                            tracing::debug!(edge = %edge.id, link_type = key, "no layer group for link type");
                            summary.skipped += 1;
                        }
                    }
                }
            }
        }

        tracing::debug!(
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            "links synchronized"
        );
        summary
    }
}
