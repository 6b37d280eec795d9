use clap::Parser;
use qrscan::capture::FacingMode;
use qrscan::core::config::{self, CliOverrides};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qrscan", about = "Scan QR codes and open links")]
struct Args {
    /// Directory of frames to scan; repeat for several cameras
    #[arg(short, long = "source", value_name = "DIR")]
    sources: Vec<PathBuf>,

    /// Camera to start with (0-based)
    #[arg(short, long)]
    camera: Option<usize>,

    /// Milliseconds between decode attempts (300..=500)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Move re-scanned payloads to the front instead of repeating them
    #[arg(long)]
    dedup: bool,

    /// Preferred camera facing
    #[arg(long, value_enum)]
    facing: Option<FacingMode>,

    /// Where history and preferences are kept
    #[arg(long, value_name = "DIR")]
    store_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    // Initialize file logger - writes to qrscan.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("qrscan.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config().map_err(|e| {
        log::warn!("{}", e);
        std::io::Error::other(e)
    })?;
    let cli = CliOverrides {
        sources: args.sources,
        camera: args.camera,
        interval_ms: args.interval_ms,
        dedup: args.dedup,
        facing: args.facing,
        store_dir: args.store_dir,
    };
    let resolved = config::resolve(&file_config, &cli);

    log::info!(
        "qrscan starting up with {} source(s), camera {}",
        resolved.sources.len(),
        resolved.camera_index
    );

    qrscan::tui::run(resolved)
}
