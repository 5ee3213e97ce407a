use std::env;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use foundation::GeoBounds;
use layers::{RecordingLayers, ViewContext};
use loader::{CycleReport, TopologyLoader};
use streaming::{HttpTransport, SpatialFilterMode, ViewConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs one topology reconciliation cycle against a topology service")]
struct Args {
    /// Service base URL (default: $TOPOLOGY_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// View configuration JSON file (default: $TOPOLOGY_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Map zoom level used for type filtering
    #[arg(long, default_value_t = 0)]
    zoom: u8,

    /// Viewport as south,west,north,east
    #[arg(long, value_parser = parse_bounds)]
    bounds: Option<GeoBounds>,

    #[arg(long, value_enum, default_value_t = Mode::Reload)]
    mode: Mode,

    /// Spatial filter for group loads: CONTAINS, INTERSECT, DISJOINT or WITHIN
    #[arg(long, default_value = "WITHIN")]
    filter: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Load every location type in view
    Reload,
    /// Load member locations of every group in view
    Groups,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let base_url = args.base_url.unwrap_or_else(|| {
        env::var("TOPOLOGY_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
    });
    let config_path = match args.config {
        Some(path) => path,
        None => env::var("TOPOLOGY_CONFIG")
            .map(PathBuf::from)
            .map_err(|_| "no view configuration: pass --config or set TOPOLOGY_CONFIG")?,
    };
    let config = ViewConfig::load(&config_path)?;

    let mut layers = RecordingLayers::new();
    layers.set_viewport(args.bounds);
    let loader = TopologyLoader::new(HttpTransport::new(base_url.clone()), ViewContext::new(config, layers));
    loader.set_zoom(args.zoom);

    info!(%base_url, config = ?config_path, zoom = args.zoom, mode = ?args.mode, "starting sync");
    let report = match args.mode {
        Mode::Reload => loader.reload(None).await,
        Mode::Groups => {
            let filter = SpatialFilterMode::from_name(&args.filter);
            loader.load_groups(None, None, filter).await
        }
    };

    print_summary(&loader, &report);
    Ok(())
}

fn print_summary(loader: &TopologyLoader<HttpTransport, RecordingLayers>, report: &CycleReport) {
    loader.with_view(|view| {
        for bucket in view.buckets().iter() {
            println!("{:<24} {}", bucket.name(), bucket.len());
        }
        println!("{:<24} {}", "links", view.link_count());
        println!("{:<24} {}", "attached", view.layers().attached_names().join(","));
    });
    println!(
        "requests {} failed {} added {} updated {} skipped {}",
        report.requests,
        report.failed_requests,
        report.locations.added,
        report.locations.updated,
        report.locations.skipped
    );
}

fn parse_bounds(s: &str) -> Result<GeoBounds, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [s, w, n, e] => Ok(GeoBounds::from_edges(*s, *w, *n, *e)),
        _ => Err(format!("expected south,west,north,east, got {} values", parts.len())),
    }
}
