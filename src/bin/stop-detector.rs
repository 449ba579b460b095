//! stop-detector CLI
//!
//! Commands:
//! - detect: Read fixes from CSV, detect and classify stops, name the stationary
//!   ones and write the stop list to CSV
//! - config: Print the effective configuration as JSON

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use stop_detector::csv_io::{read_fixes, write_stops};
use stop_detector::naming::ProgressCallback;
use stop_detector::nominatim::{NominatimGeocoder, DEFAULT_NOMINATIM_URL};
use stop_detector::{StopConfig, StopDetector, StopError};

/// Detect stops in a GPS fix stream
#[derive(Parser)]
#[command(name = "stop-detector")]
#[command(version)]
#[command(about = "Detect, merge and classify stops in a GPS fix stream", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect stops and write them to CSV
    Detect {
        /// Input CSV with timestamp, latitude and longitude columns
        #[arg(short, long, default_value = "output.csv")]
        input: PathBuf,

        /// Output CSV for the stop list
        #[arg(short, long, default_value = "stopped_locations.csv")]
        output: PathBuf,

        /// Skip reverse geocoding
        #[arg(long)]
        no_geocode: bool,

        /// Nominatim base URL
        #[arg(long, env = "NOMINATIM_URL", default_value = DEFAULT_NOMINATIM_URL)]
        geocoder_url: String,

        #[command(flatten)]
        overrides: ConfigArgs,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        overrides: ConfigArgs,
    },
}

/// Configuration sources: an optional JSON file, then per-option overrides.
#[derive(Args)]
struct ConfigArgs {
    /// JSON configuration file; missing keys keep their defaults
    #[arg(long, env = "STOP_CONFIG")]
    config: Option<PathBuf>,

    /// Minimum gap between fixes to count as a stop candidate (s)
    #[arg(long, env = "STOP_MIN_DURATION")]
    minimum_stop_duration: Option<i64>,

    /// Merge consecutive candidates closer than this (m)
    #[arg(long, env = "STOP_MERGE_DIST")]
    merge_dist_threshold: Option<f64>,

    /// Gaps up to this long are Normal (s)
    #[arg(long, env = "STOP_CLASSIFY_TIME")]
    classify_time_threshold: Option<i64>,

    /// Longer gaps with less displacement than this are Stopped (m)
    #[arg(long, env = "STOP_CLASSIFY_DIST")]
    classify_dist_threshold: Option<f64>,

    /// Average speed below this is Stopped (m/s)
    #[arg(long, env = "STOP_STOPPED_SPEED")]
    stopped_speed_threshold: Option<f64>,

    /// Average speed above this is a GPS Error (m/s)
    #[arg(long, env = "STOP_DRIVING_SPEED_MAX")]
    driving_speed_max: Option<f64>,

    /// Minimum delay between geocoding requests (ms)
    #[arg(long, env = "STOP_GEOCODE_DELAY_MS")]
    reverse_geocode_delay_ms: Option<u64>,

    /// User agent sent to the geocoder
    #[arg(long, env = "STOP_GEOCODER_USER_AGENT")]
    geocoder_user_agent: Option<String>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<StopConfig, StopError> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path)?,
            None => StopConfig::default(),
        };

        if let Some(v) = self.minimum_stop_duration {
            config.minimum_stop_duration = v;
        }
        if let Some(v) = self.merge_dist_threshold {
            config.merge_dist_threshold = v;
        }
        if let Some(v) = self.classify_time_threshold {
            config.classify_time_threshold = v;
        }
        if let Some(v) = self.classify_dist_threshold {
            config.classify_dist_threshold = v;
        }
        if let Some(v) = self.stopped_speed_threshold {
            config.stopped_speed_threshold = v;
        }
        if let Some(v) = self.driving_speed_max {
            config.driving_speed_max = v;
        }
        if let Some(v) = self.reverse_geocode_delay_ms {
            config.reverse_geocode_delay_ms = v;
        }
        if let Some(v) = &self.geocoder_user_agent {
            config.geocoder_user_agent = v.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

fn load_config_file(path: &Path) -> Result<StopConfig, StopError> {
    if !path.is_file() {
        return Err(StopError::MissingInput(path.to_path_buf()));
    }
    StopConfig::from_json(&std::fs::read_to_string(path)?)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Detect { input, output, no_geocode, geocoder_url, overrides } => {
            run_detect(&input, &output, no_geocode, &geocoder_url, &overrides).await
        }
        Commands::Config { overrides } => print_config(&overrides),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_detect(
    input: &Path,
    output: &Path,
    no_geocode: bool,
    geocoder_url: &str,
    overrides: &ConfigArgs,
) -> Result<(), StopError> {
    let config = overrides.resolve()?;
    let fixes = read_fixes(input)?;
    let detector = StopDetector::new(config)?;

    let progress: ProgressCallback = Arc::new(|done: u32, total: u32| {
        info!("Processing location names: {}/{}", done, total);
    });

    let (events, _summary) = if no_geocode {
        info!("Reverse geocoding disabled");
        detector.run::<NominatimGeocoder>(fixes, None, None).await?
    } else {
        match NominatimGeocoder::from_config(geocoder_url, detector.config()) {
            Ok(geocoder) => detector.run(fixes, Some(&geocoder), Some(progress)).await?,
            Err(e) => {
                // Naming is never fatal; stopped locations are recorded as errors
                error!("Geocoder unavailable: {}", e);
                detector.run_geocoder_unavailable(fixes)?
            }
        }
    };

    write_stops(output, &events)
}

fn print_config(overrides: &ConfigArgs) -> Result<(), StopError> {
    let config = overrides.resolve()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
