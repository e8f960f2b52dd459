//! Estuaria CLI - coastal indicators for Muara Angke

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use estuaria_cloud::{AssistantClient, ChatMessage, Conversation, GeospatialBackend};
use estuaria_core::io::{read_geotiff, write_geotiff};
use estuaria_core::Raster;
use estuaria_indicators::{
    assess_flood, assess_mangrove, assess_turbidity, BackendKind, Config, Dashboard,
    FloodReport, Layer, MangroveReport, Outcome, TurbidityReport,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "estuaria")]
#[command(author, version, about = "Coastal indicators: flood hazard, mangrove extent, turbidity", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "ESTUARIA_CONFIG")]
    config: Option<PathBuf>,

    /// Raster backend (overrides the config file)
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    /// Root of GeoTIFF exports for the directory backend
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of the HTTP raster service
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Http,
    Directory,
}

#[derive(Subcommand)]
enum Commands {
    /// Tidal-flood hazard
    Flood {
        /// Landsat composite year
        #[arg(short, long)]
        year: Option<i32>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Mangrove extent per year and loss/gain
    Mangrove {
        /// Baseline year for loss/gain
        #[arg(long)]
        baseline: Option<i32>,
        /// Target year for loss/gain
        #[arg(long)]
        target: Option<i32>,
        /// Lower MVI threshold
        #[arg(long)]
        min_mvi: Option<f64>,
        /// Upper MVI threshold
        #[arg(long)]
        max_mvi: Option<f64>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Water turbidity (NDTI over the NDWI water mask)
    Turbidity {
        /// Composite year
        #[arg(short, long)]
        year: Option<i32>,
        /// Maximum cloudy-pixel percentage (up to 30)
        #[arg(long)]
        cloud_max: Option<f64>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run all three indicators
    Dashboard {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Ask the assistant one question
    Ask {
        /// The question
        question: String,
        /// JSON file with earlier messages; updated with this exchange
        #[arg(long)]
        history: Option<PathBuf>,
        /// Assistant API key
        #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    /// Write every layer as GeoTIFF plus report.json into this directory
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn done(name: &str, elapsed: std::time::Duration) {
    println!("{} finished in {:.2?}", name, elapsed);
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(kind) = cli.backend {
        config.backend.kind = match kind {
            BackendArg::Http => BackendKind::Http,
            BackendArg::Directory => BackendKind::Directory,
        };
    }
    if let Some(dir) = &cli.data_dir {
        config.backend.data_dir = dir.clone();
        if cli.backend.is_none() {
            config.backend.kind = BackendKind::Directory;
        }
    }
    if let Some(url) = &cli.base_url {
        config.backend.base_url = url.clone();
    }
    Ok(config)
}

fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    stem.split('_').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("_")
}

fn write_outputs<R: Serialize>(report: &R, layers: &[Layer], dir: &Path) -> Result<()> {
    let pb = spinner("Writing layers...");
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    for layer in layers {
        let path = dir.join(format!("{}.tif", file_stem(&layer.name)));
        write_geotiff(&layer.raster, &path, None)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    let path = dir.join("report.json");
    std::fs::write(&path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    println!("{} layers saved to: {}", layers.len(), dir.display());
    Ok(())
}

fn emit<R: Serialize>(report: &R, layers: &[Layer], output: &OutputArgs, print: impl Fn(&R)) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print(report);
    }
    if let Some(dir) = &output.out_dir {
        write_outputs(report, layers, dir)?;
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>, digits: usize) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.digits$}"))
}

fn print_flood(r: &FloodReport) {
    println!("Flood hazard {}", r.year);
    println!("  Permanent water: {:.2} ha", r.water_ha);
    println!(
        "  Raw hazard: mean {} std {}",
        fmt_opt(r.raw_hazard.map(|s| s.mean), 2),
        fmt_opt(r.raw_hazard.map(|s| s.std_dev), 2)
    );
    println!("  Area per class:");
    for class in 1..=5u8 {
        println!("    {}: {:.2} ha", class, r.class_areas_ha.get(&class).copied().unwrap_or(0.0));
    }
}

fn print_mangrove(r: &MangroveReport) {
    println!("Mangrove extent");
    for y in &r.years {
        match y.area_ha {
            Some(ha) => println!("  {}: {:.2} ha", y.year, ha),
            None => println!("  {}: no data", y.year),
        }
    }
    match &r.change {
        Some(c) => {
            println!("  Change {} -> {}:", c.baseline_year, c.target_year);
            println!("    Loss: {:.2} ha", c.loss_ha);
            println!("    Gain: {:.2} ha", c.gain_ha);
            println!("    Net: {:+.2} ha", c.net_ha());
        }
        None => println!("  Change: no data"),
    }
}

fn print_turbidity(r: &TurbidityReport) {
    println!("Turbidity {} (cloud <= {}%)", r.year, r.cloud_max);
    println!("  Water area: {:.2} ha", r.water_ha);
    println!(
        "  NDWI: mean {} std {}",
        fmt_opt(r.ndwi.map(|s| s.mean), 4),
        fmt_opt(r.ndwi.map(|s| s.std_dev), 4)
    );
    println!(
        "  NDTI: mean {} std {}",
        fmt_opt(r.ndti.map(|s| s.mean), 4),
        fmt_opt(r.ndti.map(|s| s.std_dev), 4)
    );
    if let Some(h) = &r.ndti_histogram {
        println!("  NDTI histogram ({} buckets, {} pixels):", h.counts.len(), h.total());
        for (mean, count) in h.bucket_means.iter().zip(&h.counts) {
            println!("    {:>8.4}: {}", mean, count);
        }
    }
}

fn print_outcome<T>(name: &str, outcome: &Outcome<T>, print: impl Fn(&T)) {
    match outcome {
        Outcome::Ok { report } => print(report),
        Outcome::Failed { error } => println!("{name}: FAILED ({error})"),
    }
}

fn open_backend(config: &Config) -> Result<Box<dyn GeospatialBackend>> {
    let backend = config.backend().context("Failed to set up raster backend")?;
    info!("Backend: {}", backend.name());
    Ok(backend)
}

fn read_history(path: &Path) -> Result<Vec<ChatMessage>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid history file {}", path.display()))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match &cli.command {
        Commands::Flood { year, output } => {
            let mut config = load_config(&cli)?;
            if let Some(y) = year {
                config.flood.year = *y;
            }
            let backend = open_backend(&config)?;
            let start = Instant::now();
            let pb = spinner("Scoring flood hazard...");
            let out = assess_flood(backend.as_ref(), &config.roi, &config.flood);
            pb.finish_and_clear();
            let out = out.context("Flood hazard failed")?;
            emit(&out.report, &out.layers, output, print_flood)?;
            done("Flood hazard", start.elapsed());
        }

        Commands::Mangrove { baseline, target, min_mvi, max_mvi, output } => {
            let mut config = load_config(&cli)?;
            let p = &mut config.mangrove;
            if let Some(y) = baseline {
                p.baseline_year = *y;
            }
            if let Some(y) = target {
                p.target_year = *y;
            }
            if let Some(v) = min_mvi {
                p.min_mvi = *v;
            }
            if let Some(v) = max_mvi {
                p.max_mvi = *v;
            }
            let backend = open_backend(&config)?;
            let start = Instant::now();
            let pb = spinner("Mapping mangroves...");
            let out = assess_mangrove(backend.as_ref(), &config.roi, &config.years, &config.mangrove);
            pb.finish_and_clear();
            let out = out.context("Mangrove extent failed")?;
            emit(&out.report, &out.layers, output, print_mangrove)?;
            done("Mangrove extent", start.elapsed());
        }

        Commands::Turbidity { year, cloud_max, output } => {
            let mut config = load_config(&cli)?;
            if let Some(y) = year {
                config.turbidity.year = *y;
            }
            if let Some(c) = cloud_max {
                config.turbidity.cloud_max = *c;
            }
            let backend = open_backend(&config)?;
            let start = Instant::now();
            let pb = spinner("Computing turbidity...");
            let out = assess_turbidity(backend.as_ref(), &config.roi, &config.turbidity);
            pb.finish_and_clear();
            let out = out.context("Turbidity failed")?;
            emit(&out.report, &out.layers, output, print_turbidity)?;
            done("Turbidity", start.elapsed());
        }

        Commands::Dashboard { json } => {
            let config = load_config(&cli)?;
            let backend = open_backend(&config)?;
            let start = Instant::now();
            let pb = spinner("Running indicators...");
            let report = Dashboard::new(backend.as_ref(), &config).run();
            pb.finish_and_clear();

            let summary = report.summary();
            if *json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_outcome("Flood hazard", &summary.flood, print_flood);
                print_outcome("Mangrove extent", &summary.mangrove, print_mangrove);
                print_outcome("Turbidity", &summary.turbidity, print_turbidity);
            }
            done("Dashboard", start.elapsed());
            if report.failures() > 0 {
                warn!("{} of 3 indicators failed", report.failures());
            }
        }

        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let raster: Raster<f64> = read_geotiff(input).context("Failed to read raster")?;
            pb.finish_and_clear();
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        Commands::Ask { question, history, api_key } => {
            if question.trim().is_empty() {
                bail!("Question is empty");
            }
            let config = load_config(&cli)?;
            let client = config
                .assistant_client(api_key.clone())
                .context("Assistant is not configured")?;

            let mut conversation = Conversation::new(config.assistant.system_prompt.clone());
            if let Some(path) = history {
                for message in read_history(path)? {
                    conversation.push(message);
                }
            }
            conversation.push_user(question.as_str());
            conversation.trim_to(config.assistant.max_history);

            let pb = spinner("Waiting for the assistant...");
            let reply = client.reply(&conversation);
            pb.finish_and_clear();
            let reply = reply.context("Assistant request failed")?;
            println!("{}", reply.content);

            conversation.push(reply);
            if let Some(path) = history {
                std::fs::write(path, serde_json::to_string_pretty(&conversation.messages)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
        }
    }

    Ok(())
}
