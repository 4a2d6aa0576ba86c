use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use fellroute_core::{ElevationCache, Waypoint};
use fellroute_server::{
    api::{self, AppState},
    config::AppConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "fellroute", version, about = "Plan running routes through sparse waypoints")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Plan on the synthetic network, no network access
    #[arg(long, global = true)]
    dry_run: bool,
    /// Refetch path networks even when cached
    #[arg(long, global = true)]
    force_refresh: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Plan a single route from a JSON list of waypoints
    Plan {
        /// File holding `[{"name", "lat", "lon", "kind"}]`
        input: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Emit a GeoJSON FeatureCollection instead of the route JSON
        #[arg(long)]
        geojson: bool,
    },
}

fn main() -> BoxResult<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fellroute=info,fellroute_server=info,fellroute_core=info,tower_http=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.planner.dry_run |= cli.dry_run;
    config.planner.force_refresh |= cli.force_refresh;

    // Blocking HTTP clients live in the planner; build it before any runtime exists
    let (planner, elevation_cache) = config.build_planner()?;
    let planner = Arc::new(planner);

    let result = match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(&config, planner.clone())
        }
        Command::Plan {
            input,
            output,
            geojson,
        } => plan(&config, &planner, &input, output.as_deref(), geojson),
    };

    save_elevations(&elevation_cache, &config.cache.elevation_file);
    result
}

fn serve(config: &AppConfig, planner: Arc<fellroute_core::RoutePlanner>) -> BoxResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let state = AppState {
        planner,
        defaults: config.planner.clone(),
    };
    let app = api::router(state, &config.server);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("Server stopped");
        Ok::<_, Box<dyn std::error::Error>>(())
    })?;

    // Handlers may still hold planner clones; drop them with the runtime
    drop(runtime);
    Ok(())
}

fn plan(
    config: &AppConfig,
    planner: &fellroute_core::RoutePlanner,
    input: &Path,
    output: Option<&Path>,
    geojson: bool,
) -> BoxResult<()> {
    let text = fs::read_to_string(input)
        .map_err(|e| format!("cannot read waypoints {}: {e}", input.display()))?;
    let waypoints: Vec<Waypoint> = serde_json::from_str(&text)?;

    let route = planner.plan_route(&waypoints, &config.planner)?;
    tracing::info!(
        legs = route.legs.len(),
        distance_km = route.distance_km(),
        ascent_m = route.ascent_m,
        descent_m = route.descent_m,
        "Route planned"
    );
    for skipped in &route.skipped {
        tracing::warn!(
            "Skipped waypoint '{}' ({:.1} m from the nearest path)",
            skipped.name,
            skipped.nearest_distance_m
        );
    }

    let body = if geojson {
        route.to_geojson_string()?
    } else {
        serde_json::to_string_pretty(&route)?
    };
    match output {
        Some(path) => {
            fs::write(path, body)?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}

fn save_elevations(cache: &ElevationCache, path: &Path) {
    if cache.is_empty() {
        return;
    }
    match cache.save(path) {
        Ok(()) => tracing::info!("Saved {} cached elevations to {}", cache.len(), path.display()),
        Err(e) => tracing::warn!("Failed to save elevation cache: {e}"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
