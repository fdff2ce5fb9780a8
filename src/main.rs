use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use garmin2geojson::{ConvertOptions, CoordinateLayout, convert};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Converts GPX or TCX files to GeoJSON", long_about = None)]
struct Cli {
    /// GPX or TCX file to be processed
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Position layout of the LineString coordinates
    #[arg(long, value_enum, default_value_t = LayoutOpt::Extended)]
    layout: LayoutOpt,

    /// Leave track stats and lap summaries out of the feature properties
    #[arg(long, action = ArgAction::SetTrue)]
    no_properties: bool,

    /// Print the GeoJSON on a single line
    #[arg(long, action = ArgAction::SetTrue)]
    compact: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LayoutOpt {
    /// [lon, lat, ele, time, distance, velocity] positions
    Extended,
    /// Strict GeoJSON positions with coordinateProperties
    Standard,
}

impl From<LayoutOpt> for CoordinateLayout {
    fn from(value: LayoutOpt) -> Self {
        match value {
            LayoutOpt::Extended => CoordinateLayout::Extended,
            LayoutOpt::Standard => CoordinateLayout::Standard,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let xml = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    debug!(path = %cli.input.display(), bytes = xml.len(), "read input");

    let opts = ConvertOptions {
        layout: cli.layout.into(),
        include_properties: !cli.no_properties,
    };
    let collection = convert(&xml, &opts)
        .with_context(|| format!("failed to convert {}", cli.input.display()))?;
    let rendered = render(&collection, cli.compact)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}").context("failed to write GeoJSON to stdout")?;

    info!(
        features = collection["features"].as_array().map_or(0, Vec::len),
        "conversion complete"
    );
    Ok(())
}

/// Serialize fully before anything reaches stdout, so a failure leaves no partial output.
fn render(value: &serde_json::Value, compact: bool) -> Result<String> {
    if compact {
        return serde_json::to_string(value).context("failed to serialize GeoJSON");
    }

    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut ser)
        .context("failed to serialize GeoJSON")?;
    String::from_utf8(buf).context("serialized GeoJSON is not UTF-8")
}
