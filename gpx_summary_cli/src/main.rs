use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{ArgAction, Parser, ValueHint};
use gpx_summary::export::export_csv;
use gpx_summary::html::export_html;
use gpx_summary::report::{render_header, render_report};
use gpx_summary::{
    analyze_gpx, GeocoderConfig, NominatimGeocoder, OfflineGeocoder, Params, PlaceResolver,
    ReverseGeocoder, TrackSummary,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Summarize GPX tracks: distance, moving speed, time range and start/end places",
    long_about = None
)]
struct Cli {
    /// GPX file to analyze
    #[arg(default_value = "explore.gpx", value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Only process the first N tracks (0 processes all)
    #[arg(long, value_name = "N")]
    max_tracks: Option<usize>,

    /// Text report path
    #[arg(long, default_value = "track_list.txt", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Export per-track data to a CSV file
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    csv: Option<PathBuf>,

    /// Write an animated HTML visualization of all tracks
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    html: Option<PathBuf>,

    /// Skip reverse geocoding and label places by coordinates
    #[arg(long, action = ArgAction::SetTrue)]
    offline: bool,

    /// Base URL of the Nominatim service
    #[arg(long, value_name = "URL")]
    geocoder_url: Option<String>,

    /// Enable verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let started = Instant::now();
    info!("Parsing GPX file: {}", cli.input.display());
    if let Some(limit) = cli.max_tracks.filter(|&n| n > 0) {
        info!("Processing only first {} tracks", limit);
    }

    let bytes = fs::read(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let params = Params {
        max_tracks: cli.max_tracks,
        ..Params::default()
    };
    let resolver = build_resolver(&cli)?;
    let tracks = analyze_gpx(&bytes, &resolver, &params)
        .with_context(|| format!("failed to parse {}", cli.input.display()))?;

    if tracks.is_empty() {
        println!("No tracks found in the GPX file.");
        return Ok(());
    }

    let mut failures = 0usize;
    if let Err(err) = write_report(&tracks, &cli.input, &cli.output) {
        error!("{:#}", err);
        failures += 1;
    }
    if let Some(path) = cli.csv.as_ref() {
        if let Err(err) = export_csv(&tracks, path) {
            error!("Error writing CSV file {}: {}", path.display(), err);
            failures += 1;
        }
    }
    if let Some(path) = cli.html.as_ref() {
        if let Err(err) = export_html(&tracks, path) {
            error!("Error writing HTML file {}: {}", path.display(), err);
            failures += 1;
        }
    }

    info!(
        "Summarized {} tracks in {:.2?}",
        tracks.len(),
        started.elapsed()
    );

    if failures > 0 {
        return Err(anyhow!("{} output(s) could not be written", failures));
    }
    Ok(())
}

fn build_resolver(cli: &Cli) -> Result<PlaceResolver<Box<dyn ReverseGeocoder>>> {
    let mut config = GeocoderConfig::default();
    if let Some(url) = cli.geocoder_url.as_ref() {
        config.endpoint = url.trim_end_matches('/').to_string();
    }

    let geocoder: Box<dyn ReverseGeocoder> = if cli.offline {
        info!("Offline mode: places are labelled by coordinates");
        Box::new(OfflineGeocoder)
    } else {
        Box::new(
            NominatimGeocoder::new(&config).context("failed to set up the geocoding client")?,
        )
    };
    Ok(PlaceResolver::from_config(geocoder, &config))
}

/// Print the report to stdout and save the same text to `output`.
fn write_report(tracks: &[TrackSummary], input: &Path, output: &Path) -> Result<()> {
    let mut text = render_header(&input.display().to_string(), Local::now().naive_local());
    text.push_str(&render_report(tracks));
    print!("{}", text);

    fs::write(output, &text).with_context(|| format!("failed to write {}", output.display()))?;
    println!("\nTrack information written to '{}'", output.display());
    Ok(())
}
