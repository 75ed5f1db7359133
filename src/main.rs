use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scenefp::{FingerprintLibrary, ScenefpConfig, match_scene, rescan};

#[derive(Parser, Debug)]
#[command(
    name = "scenefp",
    version,
    about = "Find duplicate scenes in a fingerprint library"
)]
struct Cli {
    /// JSON fingerprint library to scan
    #[arg(long)]
    library: PathBuf,

    /// YAML configuration file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Match only this scene instead of rescanning the whole library
    #[arg(long)]
    scene: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = match &cli.config {
        Some(path) => ScenefpConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ScenefpConfig::default(),
    };

    let library = FingerprintLibrary::from_file(&cli.library)
        .with_context(|| format!("loading library {}", cli.library.display()))?
        .with_max_hash_occurrences(config.rescan.max_hash_occurrences);

    let output = match cli.scene {
        Some(scene_id) => {
            let results = match_scene(
                &library,
                scene_id,
                &config.matcher,
                &config.rescan.modalities,
            )
            .with_context(|| format!("scene {scene_id} is not in the library"))?;
            serde_json::to_string_pretty(&results)?
        }
        None => serde_json::to_string_pretty(&rescan(&library, &config.matcher, &config.rescan))?,
    };

    println!("{output}");
    Ok(())
}
