use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use rescue_dispatch::config::DispatchConfig;
use rescue_dispatch::routing::{build_provider, RoutingProvider, StraightLineProvider};
use rescue_dispatch::store::{JsonFileStore, MemoryStore, VictimStore};
use rescue_dispatch::utils::ScenarioBuilder;
use rescue_dispatch::{CancellationToken, CycleResult, Dispatcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Emergency-priority rescue dispatch
#[derive(Parser, Debug)]
#[command(name = "rescue-dispatch")]
#[command(about = "Assigns rescue teams to victims and orders each team's trip")]
struct Args {
    /// Path to configuration file (default: DISPATCH_CONFIG or config/dispatch.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Victim/team snapshot file (JSON)
    #[arg(short, long, conflicts_with = "demo")]
    snapshot: Option<PathBuf>,

    /// Append status patches to this JSON-lines file
    #[arg(long)]
    patch_log: Option<PathBuf>,

    /// Write the cycle result here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Write one GeoJSON route file per team into this directory
    #[arg(long)]
    geojson_dir: Option<PathBuf>,

    /// Generate a synthetic scenario with this many victims
    #[arg(long)]
    demo: Option<usize>,

    /// Number of teams in the synthetic scenario
    #[arg(long, default_value_t = 3)]
    teams: usize,

    /// Seed for the synthetic scenario
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Re-run a cycle every N seconds
    #[arg(long)]
    watch: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_logging(json: bool) {
    // Default: INFO, use RUST_LOG=debug for per-victim events
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(UtcTime::rfc_3339())
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn write_outputs(args: &Args, result: &CycleResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("failed to serialize cycle result")?;
    match &args.out {
        Some(path) => {
            fs::write(path, &json).with_context(|| format!("failed to write {}", path.display()))?
        }
        None => println!("{}", json),
    }

    if let Some(dir) = &args.geojson_dir {
        write_geojson(dir, result)?;
    }
    Ok(())
}

fn write_geojson(dir: &Path, result: &CycleResult) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    for (team_id, route) in &result.routes {
        let path = dir.join(format!("{}.geojson", team_id));
        let geojson = route.trip.to_geojson(route.degraded);
        fs::write(&path, serde_json::to_string_pretty(&geojson)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(team_id = %team_id, file = %path.display(), "geojson_written");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    let config_path = DispatchConfig::resolve_config_path(args.config.as_deref());
    let config = DispatchConfig::load_from_path(&config_path)
        .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
    info!(config_file = %config_path.display(), "config_loaded");

    let (store, provider): (Box<dyn VictimStore>, Arc<dyn RoutingProvider>) =
        match (&args.snapshot, args.demo) {
            (Some(path), _) => {
                let mut store = JsonFileStore::new(path, config.teams.default_capacity);
                if let Some(log) = &args.patch_log {
                    store = store.with_patch_log(log);
                }
                let provider = build_provider(&config.routing)
                    .context("failed to initialise routing provider")?;
                (Box::new(store), provider)
            }
            (None, Some(victims)) => {
                let snapshot = ScenarioBuilder::new(victims, args.teams)
                    .capacity(config.teams.default_capacity)
                    .seed(args.seed)
                    .taken_at(Utc::now())
                    .build();
                info!(victims, teams = args.teams, seed = args.seed, "demo_scenario_generated");
                let provider = StraightLineProvider::new(config.routing.speed_mps());
                (Box::new(MemoryStore::new(snapshot)), Arc::new(provider))
            }
            (None, None) => bail!("either --snapshot or --demo is required"),
        };

    let dispatcher = Dispatcher::from_config(&config, provider)?;

    loop {
        // A fresh token per cycle; cycles never overlap
        let cancel = CancellationToken::new();
        match dispatcher.run_from_store(store.as_ref(), &cancel) {
            Ok(result) => write_outputs(&args, &result)?,
            Err(e) if args.watch.is_some() => error!(error = %e, "cycle_failed"),
            Err(e) => return Err(e).context("dispatch cycle failed"),
        }

        match args.watch {
            Some(secs) => thread::sleep(Duration::from_secs(secs.max(1))),
            None => break,
        }
    }

    Ok(())
}
