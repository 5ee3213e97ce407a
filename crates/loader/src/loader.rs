//! Drives reconciliation cycles against the topology service.
//!
//! A cycle fans out its requests as one `FuturesUnordered` set, applies each
//! response under a single lock of the view as it arrives, and runs the link
//! pass once the set has drained. Cycles may overlap. Each cycle is scoped to
//! what it loads (the whole view, one tile, one set of group types over some
//! bounds); a newer cycle of the same scope supersedes the older one, whose
//! late responses are dropped instead of merged. Cycles of different scopes,
//! such as the tiles of one grid, never supersede each other.

use std::time::Instant;

use foundation::GeoBounds;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use layers::{MapLayerService, MergeTarget, ViewContext};
use parking_lot::Mutex;
use runtime::metrics::{
    LINKS_CREATED, LINKS_SKIPPED, LINKS_UPDATED, LOCATIONS_ADDED, LOCATIONS_SKIPPED,
    LOCATIONS_UPDATED, PROCESS_MS, REQUESTS_FAILED, RESPONSES_STALE,
};
use runtime::{
    CycleClock, CycleScope, CycleTicket, MetricsSnapshot, RequestDescriptor, RequestId,
    RequestTracker, SegmentCompletion, SyncMetrics, plan_segments,
};
use serde_json::Value;
use streaming::{QueryBuilder, SpatialFilterMode, Transport, TransportError, decode_group_ids, decode_locations};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cycle::{Applied, BatchReport, CycleReport};

/// A grid tile to load.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    pub location_type: String,
    /// Load the tile through this group type's member locations instead.
    pub group_type: Option<String>,
    pub bounds: Option<GeoBounds>,
}

struct Cycle {
    ticket: CycleTicket,
    request: RequestId,
    report: CycleReport,
}

/// Scope key part for the bounds a cycle covers; `view` follows the viewport.
fn bounds_key(bounds: Option<GeoBounds>) -> String {
    match bounds {
        Some(b) => format!(
            "{},{},{},{}",
            b.south_west.lat, b.south_west.lng, b.north_east.lat, b.north_east.lng
        ),
        None => "view".to_string(),
    }
}

pub struct TopologyLoader<T, M> {
    transport: T,
    view: Mutex<ViewContext<M>>,
    tracker: Mutex<RequestTracker>,
    clock: CycleClock,
    metrics: Mutex<SyncMetrics>,
}

impl<T: Transport, M: MapLayerService> TopologyLoader<T, M> {
    pub fn new(transport: T, view: ViewContext<M>) -> Self {
        Self {
            transport,
            view: Mutex::new(view),
            tracker: Mutex::new(RequestTracker::new()),
            clock: CycleClock::new(),
            metrics: Mutex::new(SyncMetrics::new()),
        }
    }

    pub fn set_zoom(&self, zoom: u8) {
        self.view.lock().set_zoom(zoom);
    }

    /// Runs `f` against the view while holding its lock.
    pub fn with_view<R>(&self, f: impl FnOnce(&ViewContext<M>) -> R) -> R {
        f(&self.view.lock())
    }

    pub fn is_loading(&self) -> bool {
        self.tracker.lock().is_loading()
    }

    pub fn outstanding_requests(&self) -> usize {
        self.tracker.lock().outstanding()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.tracker.lock().subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.lock().snapshot()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.metrics.lock().counter(name)
    }

    /// Reloads every location type permitted at the current zoom level.
    ///
    /// A reload supersedes any earlier reload over the same bounds, including
    /// one started before a zoom change.
    pub async fn reload(&self, bounds: Option<GeoBounds>) -> CycleReport {
        let types = self.view.lock().requested_location_types();
        let scope = CycleScope::new(format!("reload:{}", bounds_key(bounds)));
        self.load_types("reload", scope, types, bounds, SpatialFilterMode::Within)
            .await
    }

    /// Loads one grid tile, intersecting the tile bounds.
    pub async fn load_tile(&self, tile: TileRequest) -> CycleReport {
        let mode = SpatialFilterMode::Intersect;
        match tile.group_type {
            Some(group_type) => {
                self.load_groups(Some(vec![group_type]), tile.bounds, mode)
                    .await
            }
            None => {
                let scope = CycleScope::new(format!(
                    "tile:{}:{}",
                    tile.location_type,
                    bounds_key(tile.bounds)
                ));
                self.load_types(
                    "getGridTileLocations",
                    scope,
                    vec![tile.location_type],
                    tile.bounds,
                    mode,
                )
                .await
            }
        }
    }

    /// Loads member locations of every group of the given group types, or of
    /// the group types permitted at the current zoom level when `None`.
    pub async fn load_groups(
        &self,
        group_types: Option<Vec<String>>,
        bounds: Option<GeoBounds>,
        mode: SpatialFilterMode,
    ) -> CycleReport {
        let scope_types = group_types
            .as_ref()
            .map_or_else(|| "*".to_string(), |t| t.join(","));
        let scope = CycleScope::new(format!("groups:{scope_types}:{}", bounds_key(bounds)));
        let mut cycle = self.begin_cycle("groups", scope, bounds);
        let ticket = &cycle.ticket.clone();

        let requests: Vec<(String, String, Option<GeoBounds>)> = {
            let mut view = self.view.lock();
            view.apply_zoom_layers();
            let types = group_types.unwrap_or_else(|| view.requested_group_types());
            let filter_bounds = view.effective_bounds(bounds);
            let qb = QueryBuilder::new(view.config());
            types
                .into_iter()
                .map(|t| {
                    let path = qb.groups_path(&t, mode, filter_bounds.as_ref());
                    (t, path, filter_bounds)
                })
                .collect()
        };

        let mut pending: FuturesUnordered<_> = requests
            .into_iter()
            .enumerate()
            .map(move |(index, (group_type, path, filter_bounds))| async move {
                let mut batch = BatchReport::default();
                let generation = ticket.generation;
                let discriminant = format!("{group_type}-{index}-{generation}");
                let ids = match self.fetch("getGroupTypeIds", &discriminant, bounds, &path).await {
                    Ok(body) => decode_group_ids(&body),
                    Err(_) => {
                        batch.record_failure();
                        return batch;
                    }
                };
                batch.requests += 1;
                if ids.is_empty() {
                    debug!(group_type = %group_type, "no groups in view");
                    return batch;
                }
                if !self.clock.is_current(ticket) {
                    debug!(%generation, group_type = %group_type, "cycle superseded, member fetch skipped");
                    return batch;
                }
                let members = self
                    .load_group_locations(ticket, &ids, bounds, filter_bounds, mode)
                    .await;
                batch.merge(&members);
                batch
            })
            .collect();

        while let Some(batch) = pending.next().await {
            cycle.report.absorb(&batch);
        }
        drop(pending);

        self.finish_cycle(cycle)
    }

    async fn load_types(
        &self,
        op: &'static str,
        scope: CycleScope,
        types: Vec<String>,
        bounds: Option<GeoBounds>,
        mode: SpatialFilterMode,
    ) -> CycleReport {
        let mut cycle = self.begin_cycle(op, scope, bounds);
        let ticket = &cycle.ticket.clone();

        let requests: Vec<(String, String)> = {
            let mut view = self.view.lock();
            view.apply_zoom_layers();
            let filter_bounds = view.effective_bounds(bounds);
            let qb = QueryBuilder::new(view.config());
            types
                .into_iter()
                .map(|t| {
                    let path = qb.resources_path(&t, mode, filter_bounds.as_ref());
                    (t, path)
                })
                .collect()
        };

        let mut pending: FuturesUnordered<_> = requests
            .into_iter()
            .map(move |(location_type, path)| async move {
                let discriminant = format!("{location_type}-{}", ticket.generation);
                let result = self.fetch(op, &discriminant, bounds, &path).await;
                (location_type, result)
            })
            .collect();

        while let Some((location_type, result)) = pending.next().await {
            let mut batch = BatchReport::default();
            match result {
                Ok(body) => batch.record_applied(self.apply_locations(
                    ticket,
                    MergeTarget::Type(&location_type),
                    &body,
                )),
                Err(_) => batch.record_failure(),
            }
            cycle.report.absorb(&batch);
        }
        drop(pending);

        self.finish_cycle(cycle)
    }

    /// Fetches the member locations of `group_ids` in bounded segments.
    ///
    /// Every planned segment signals completion, empty ones without a fetch;
    /// segments still pending afterwards are reported on the batch.
    async fn load_group_locations(
        &self,
        ticket: &CycleTicket,
        group_ids: &[String],
        bounds: Option<GeoBounds>,
        filter_bounds: Option<GeoBounds>,
        mode: SpatialFilterMode,
    ) -> BatchReport {
        let mut batch = BatchReport::default();
        let generation = ticket.generation;

        let (max_concurrency, mut completion, segment_paths) = {
            let view = self.view.lock();
            let max = view.config().max_concurrent_requests;
            let qb = QueryBuilder::new(view.config());
            let segments = plan_segments(group_ids, max);
            let completion = SegmentCompletion::for_segments(&segments);
            let paths: Vec<(usize, Option<(String, String)>)> = segments
                .into_iter()
                .map(|seg| {
                    if seg.is_empty() {
                        return (seg.index, None);
                    }
                    let head: String = seg.ids.join(",").chars().take(5).collect();
                    let path = qb.group_locations_path(seg.ids, mode, filter_bounds.as_ref());
                    (seg.index, Some((format!("{head}-{}-{generation}", seg.index), path)))
                })
                .collect();
            (max, completion, paths)
        };

        let mut pending = FuturesUnordered::new();
        for (index, request) in segment_paths {
            match request {
                // Nothing to fetch for this segment.
                None => {
                    completion.complete(index);
                }
                Some((discriminant, path)) => pending.push(async move {
                    let result = self
                        .fetch("getAllGroupLocations", &discriminant, bounds, &path)
                        .await;
                    (index, result)
                }),
            }
        }

        while let Some((index, result)) = pending.next().await {
            match result {
                Ok(body) => {
                    batch.record_applied(self.apply_locations(ticket, MergeTarget::ByTypeTags, &body))
                }
                Err(_) => batch.record_failure(),
            }
            completion.complete(index);
        }

        batch.pending_segments = completion.pending();
        debug!(
            groups = group_ids.len(),
            segments = completion.len(),
            max_concurrency,
            complete = completion.is_complete(),
            "group locations loaded"
        );
        batch
    }

    /// Issues one tracked request. The request is ended on every path.
    async fn fetch(
        &self,
        op: &'static str,
        discriminant: &str,
        bounds: Option<GeoBounds>,
        path: &str,
    ) -> Result<Value, TransportError> {
        let id = RequestDescriptor::new(op, discriminant, bounds).id();
        self.tracker.lock().start(id.clone());
        let result = self.transport.get_json(path).await;
        self.tracker.lock().end(&id);

        if let Err(err) = &result {
            error!(op, discriminant, "request failed: {err}");
            self.metrics.lock().inc_counter(REQUESTS_FAILED, 1);
        }
        result
    }

    /// Merges one response body, unless a newer cycle of the same scope has
    /// started.
    fn apply_locations(&self, ticket: &CycleTicket, target: MergeTarget<'_>, body: &Value) -> Applied {
        let records = decode_locations(body);
        let mut view = self.view.lock();
        if !self.clock.is_current(ticket) {
            debug!(generation = %ticket.generation, scope = %ticket.scope, "dropping response from superseded cycle");
            self.metrics.lock().inc_counter(RESPONSES_STALE, 1);
            return Applied::Stale;
        }

        let started = Instant::now();
        let summary = view.merge_all(records, target);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        drop(view);

        debug!(
            generation = %ticket.generation,
            added = summary.added,
            updated = summary.updated,
            skipped = summary.skipped,
            elapsed_ms,
            "response merged"
        );
        let mut metrics = self.metrics.lock();
        metrics.inc_counter(LOCATIONS_ADDED, summary.added as u64);
        metrics.inc_counter(LOCATIONS_UPDATED, summary.updated as u64);
        metrics.inc_counter(LOCATIONS_SKIPPED, summary.skipped as u64);
        metrics.record_histogram(PROCESS_MS, elapsed_ms);
        Applied::Merged(summary)
    }

    fn begin_cycle(&self, op: &'static str, scope: CycleScope, bounds: Option<GeoBounds>) -> Cycle {
        let ticket = self.clock.begin(scope);
        let request = RequestDescriptor::new("cycle", format!("{op}-{}", ticket.generation), bounds).id();
        self.tracker.lock().start(request.clone());
        debug!(generation = %ticket.generation, scope = %ticket.scope, op, "cycle started");
        Cycle {
            report: CycleReport::new(ticket.generation),
            ticket,
            request,
        }
    }

    /// Runs the link pass for a cycle that is still current and whose segments
    /// have all completed, then ends the cycle's own tracked request.
    fn finish_cycle(&self, mut cycle: Cycle) -> CycleReport {
        if !self.clock.is_current(&cycle.ticket) {
            cycle.report.superseded = true;
        } else if cycle.report.pending_segments > 0 {
            warn!(
                generation = %cycle.ticket.generation,
                pending = cycle.report.pending_segments,
                "segments incomplete, link pass skipped"
            );
        } else {
            let mut view = self.view.lock();
            if !view.config().hide_links {
                let links = view.sync_links();
                drop(view);
                let mut metrics = self.metrics.lock();
                metrics.inc_counter(LINKS_CREATED, links.created as u64);
                metrics.inc_counter(LINKS_UPDATED, links.updated as u64);
                metrics.inc_counter(LINKS_SKIPPED, links.skipped as u64);
                cycle.report.links = Some(links);
            }
        }

        self.tracker.lock().end(&cycle.request);
        let r = &cycle.report;
        info!(
            generation = %r.generation,
            scope = %cycle.ticket.scope,
            added = r.locations.added,
            updated = r.locations.updated,
            skipped = r.locations.skipped,
            requests = r.requests,
            failed = r.failed_requests,
            stale = r.stale_responses,
            superseded = r.superseded,
            "cycle complete"
        );
        cycle.report
    }
}
