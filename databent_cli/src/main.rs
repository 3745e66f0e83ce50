use databent_core::codec::{PngRenderer, to_container};
use databent_core::config::DatabentConfig;
use databent_core::pipeline::generate_variants;
use databent_core::store::{OnDiskStore, VariantStore};

use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

const DEFAULT_CONFIG_FILE: &str = "databent.toml";

#[derive(Parser, Debug)]
#[clap(author, version, about = "Glitch images by deleting bytes from their TIFF encoding", long_about = None)]
struct Cli {
    /// Image to glitch.
    input: PathBuf,
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Number of variants to produce.
    #[clap(short = 'n', long)]
    variants: Option<u64>,
    /// Seed of the first variant; later variants use seed + i. Drawn at
    /// random when neither this flag nor `base-seed` is set.
    #[clap(short, long)]
    seed: Option<u64>,
    #[clap(short, long)]
    output_dir: Option<PathBuf>,
    /// Chunks to remove per variant.
    #[clap(long)]
    chunks: Option<usize>,
    #[clap(long)]
    threads: Option<usize>,
    /// Corrupt the input bytes as given instead of re-encoding them as TIFF.
    #[clap(long)]
    raw: bool,
}

fn load_config(cli: &Cli) -> Result<DatabentConfig, anyhow::Error> {
    let mut config = match &cli.config_file {
        Some(config_path) => {
            println!("Loading configuration from specified path: {config_path:?}");
            DatabentConfig::load_from_file(config_path)?
        }
        None => {
            let default_config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_config_path.exists() {
                println!(
                    "No config file specified via CLI, loading default: {default_config_path:?}"
                );
                DatabentConfig::load_from_file(&default_config_path)?
            } else {
                debug!("no {DEFAULT_CONFIG_FILE} found, using built-in defaults");
                DatabentConfig::default()
            }
        }
    };

    if let Some(count) = cli.variants {
        config.variants.count = count;
    }
    if let Some(seed) = cli.seed {
        config.variants.base_seed = Some(seed);
    }
    if let Some(threads) = cli.threads {
        config.variants.threads = threads;
    }
    if let Some(chunks) = cli.chunks {
        config.glitch.target_chunk_count = chunks;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
    config.glitch.validate()?;
    Ok(config)
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    let base_seed = config.variants.pin_base_seed(&mut rand::rng());
    println!("Base seed: {base_seed}");
    debug!("Effective configuration: {config:#?}");

    let source = std::fs::read(&cli.input)
        .map_err(|e| anyhow::anyhow!("Failed to read input image {:?}: {}", cli.input, e))?;
    let source_filename = cli
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.input.display().to_string());

    let container = if cli.raw {
        source
    } else {
        let tiff = to_container(&source)?;
        info!(
            "re-encoded {} ({} bytes) as a {}-byte TIFF",
            source_filename,
            source.len(),
            tiff.len()
        );
        tiff
    };

    let mut store = OnDiskStore::new(
        &config.output.directory,
        &source_filename,
        config.output.write_json,
    )?;

    let start_time = Instant::now();
    let variants = generate_variants(
        &container,
        &source_filename,
        &config.variants,
        &config.glitch,
        &PngRenderer::new(),
    )?;

    let mut failures = 0;
    for variant in &variants {
        store.add(variant)?;
        match &variant.render {
            Ok(_) => println!(
                "Seed {}: OK ({} chunks removed)",
                variant.seed,
                variant.corruption.removed.len()
            ),
            Err(e) => {
                failures += 1;
                println!("Seed {}: Failed - {}", variant.seed, e);
            }
        }
    }

    println!(
        "{} variants saved in {} ({} failed to render) in {:.2?}",
        variants.len(),
        store.output_dir().display(),
        failures,
        start_time.elapsed()
    );
    Ok(())
}
