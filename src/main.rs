//! Temple Globe - interactive globe of temples worldwide
//!
//! CLI commands:
//! - gui: Launch the globe viewer
//! - list: List temples grouped by country
//! - show: Print one temple's detail cards
//! - missing: Report temples without coordinates
//! - geocode: Fill missing coordinates through Nominatim

mod accessibility;
mod carousel;
mod config;
mod dataset;
mod detail;
mod geocode;
mod gui;
mod images;
mod logging;
mod map;
mod rotation;
mod selection;
mod viewer;

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dataset::{Dataset, Status, TempleId};

#[derive(Parser)]
#[command(name = "temple_globe")]
#[command(about = "Interactive globe of temples worldwide")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to viewer.yaml config
    #[arg(short, long, default_value = "viewer.yaml")]
    config: PathBuf,

    /// Dataset JSON file (overrides config and DATASET_PATH)
    #[arg(short, long)]
    dataset: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the globe viewer
    Gui,

    /// List temples grouped by country
    List {
        /// Filter by status, e.g. "Operating" or "Under Construction"
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by country
        #[arg(short = 'C', long)]
        country: Option<String>,
    },

    /// Print the detail cards of one temple
    Show {
        id: TempleId,
    },

    /// Report temples whose coordinates are still (0, 0)
    Missing,

    /// Fill missing coordinates through the geocoder
    Geocode {
        /// Print what would be geocoded without sending requests
        #[arg(long)]
        dry_run: bool,

        /// Geocode at most this many temples
        #[arg(short, long)]
        limit: Option<usize>,

        /// YAML map of temple name -> corrected address; re-geocodes exactly those temples
        #[arg(long)]
        addresses: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging first
    logging::init_logging("logs");
    tracing::info!("Temple Globe starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?} dataset={:?}", cli.config, cli.dataset);

    let config = config::Config::load_or_default(&cli.config)?;
    let secrets = config::Secrets::load();

    match cli.command {
        Commands::Gui => {
            let dataset = load_dataset(cli.dataset.as_deref(), &config, &secrets)?;
            tracing::info!("Launching globe viewer");
            gui::run_viewer(config, dataset, &secrets.user_agent)?;
        }

        Commands::List { status, country } => {
            let dataset = load_dataset(cli.dataset.as_deref(), &config, &secrets)?;
            let status = match status {
                Some(label) => Some(
                    Status::from_label(&label).ok_or_else(|| anyhow::anyhow!("Unknown status: {}", label))?,
                ),
                None => None,
            };
            list_temples(&dataset, status, country.as_deref());
        }

        Commands::Show { id } => {
            let dataset = load_dataset(cli.dataset.as_deref(), &config, &secrets)?;
            show_temple(&dataset, id, &config.carousel)?;
        }

        Commands::Missing => {
            let dataset = load_dataset(cli.dataset.as_deref(), &config, &secrets)?;
            print!("{}", geocode::MissingReport::from_dataset(&dataset));
        }

        Commands::Geocode { dry_run, limit, addresses } => {
            let path = cli
                .dataset
                .or_else(|| config.dataset.clone())
                .unwrap_or_else(|| secrets.dataset_path.clone());
            let options = geocode::BatchOptions { dry_run, limit, ..Default::default() };
            run_geocode(&path, &secrets, addresses.as_deref(), &options).await?;
        }
    }

    Ok(())
}

/// CLI dataset: --dataset, then config, then DATASET_PATH when it exists, then bundled
fn load_dataset(cli_path: Option<&Path>, config: &config::Config, secrets: &config::Secrets) -> anyhow::Result<Dataset> {
    let path = cli_path
        .map(Path::to_path_buf)
        .or_else(|| config.dataset.clone())
        .or_else(|| Some(secrets.dataset_path.clone()).filter(|p| p.exists()));
    let dataset = Dataset::load_or_bundled(path.as_deref())?;
    if dataset.is_empty() {
        tracing::warn!("Dataset has no temples");
    }
    Ok(dataset)
}

/// List temples grouped by country
fn list_temples(dataset: &Dataset, status: Option<Status>, country: Option<&str>) {
    let mut by_country: BTreeMap<&str, Vec<_>> = BTreeMap::new();
    for temple in dataset.temples() {
        if status.is_some_and(|s| s != temple.status) {
            continue;
        }
        if country.is_some_and(|c| !temple.location.country.eq_ignore_ascii_case(c)) {
            continue;
        }
        by_country.entry(temple.location.country.as_str()).or_default().push(temple);
    }

    let count: usize = by_country.values().map(Vec::len).sum();
    println!("Temples ({}):", count);
    println!();

    for (country, temples) in by_country {
        println!("## {}", country);
        for temple in temples {
            let marker = if temple.has_location() { "" } else { "  [no coordinates]" };
            println!(
                "  - {} [{}] {} ({}){}",
                temple.name,
                temple.id,
                temple.place_label(),
                temple.status,
                marker
            );
        }
    }
}

/// Print one temple's detail cards
fn show_temple(dataset: &Dataset, id: TempleId, carousel_config: &config::CarouselConfig) -> anyhow::Result<()> {
    let temple = dataset.get(id)?;

    println!("{}", temple.name);
    println!("{}", "=".repeat(temple.name.chars().count()));
    for card in detail::cards(temple) {
        println!();
        println!("[{}]", card.title);
        for (label, value) in &card.rows {
            println!("  {:<22} {}", format!("{}:", label), value);
        }
        if let Some(body) = &card.body {
            println!();
            println!("  {}", body);
        }
    }

    let images = carousel::image_urls(temple, &carousel_config.fallback_base_url);
    println!();
    println!("[Images]");
    for url in images {
        println!("  {}", url);
    }
    Ok(())
}

/// Geocode missing (or overridden) temples and save with a backup
async fn run_geocode(
    path: &Path,
    secrets: &config::Secrets,
    addresses: Option<&Path>,
    options: &geocode::BatchOptions,
) -> anyhow::Result<()> {
    println!("Loading temples from {:?}...", path);
    let mut dataset = Dataset::load(path)?;

    let targets = match addresses {
        Some(file) => {
            let overrides = geocode::load_address_overrides(file)?;
            let ids = geocode::apply_address_overrides(&mut dataset, &overrides);
            println!("Applied {} of {} address overrides", ids.len(), overrides.len());
            ids
        }
        None => {
            let report = geocode::MissingReport::from_dataset(&dataset);
            print!("{}", report);
            dataset.missing_coordinates().iter().map(|t| t.id).collect()
        }
    };

    if targets.is_empty() {
        println!("Nothing to geocode.");
        return Ok(());
    }

    let client = geocode::NominatimClient::new(&secrets.nominatim_url, &secrets.user_agent)?;
    let outcome = geocode::geocode_batch(&client, &mut dataset, &targets, options).await;

    if options.dry_run {
        println!();
        println!("Dry run complete, dataset unchanged.");
        return Ok(());
    }

    println!();
    println!(
        "Updated {} of {} temples ({} failed)",
        outcome.updated.len(),
        outcome.attempted,
        outcome.failed.len()
    );

    // Overrides change addresses even when the lookup fails
    if outcome.updated.is_empty() && addresses.is_none() {
        println!("No changes to save.");
        return Ok(());
    }

    let backup = geocode::save_with_backup(&dataset, path)?;
    println!("Backup saved to {:?}", backup);
    println!("Saved updated data to {:?}", path);
    println!("Remaining temples with missing coordinates: {}", dataset.missing_coordinates().len());
    Ok(())
}
