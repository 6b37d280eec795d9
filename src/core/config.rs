//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.qrscan/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//!
//! The `[auto_open]` values only seed the persisted preferences: once the
//! user toggles something in the UI, the stored preference wins.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::{FacingMode, IDEAL_HEIGHT, IDEAL_WIDTH, StreamConstraints};
use crate::core::history::{DEFAULT_LINK_CAP, DEFAULT_SCAN_CAP, HistoryPolicy};
use crate::core::preferences::{DEFAULT_DELAY_SECS, Preferences, clamp_delay};
use crate::core::session::SessionSettings;
use crate::decode::{DecodeOptions, InversionAttempts};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct QrScanConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub auto_open: AutoOpenConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ScanConfig {
    pub interval_ms: Option<u64>,
    pub inversion: Option<InversionAttempts>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct HistoryConfig {
    pub scan_cap: Option<usize>,
    pub link_cap: Option<usize>,
    pub dedup: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AutoOpenConfig {
    pub enabled: Option<bool>,
    pub delay_secs: Option<u8>,
    pub sound: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CaptureConfig {
    pub sources: Option<Vec<PathBuf>>,
    pub camera_index: Option<usize>,
    pub facing: Option<FacingMode>,
    pub ideal_width: Option<u32>,
    pub ideal_height: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    pub dir: Option<PathBuf>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_INTERVAL_MS: u64 = 300;
pub const MIN_INTERVAL_MS: u64 = 300;
pub const MAX_INTERVAL_MS: u64 = 500;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub scan_interval: Duration,
    pub inversion: InversionAttempts,
    pub scan_cap: usize,
    pub link_cap: usize,
    pub dedup: bool,
    pub preferences: Preferences,
    pub sources: Vec<PathBuf>,
    pub camera_index: usize,
    pub constraints: StreamConstraints,
    /// `None` means the default `~/.qrscan/store`.
    pub store_dir: Option<PathBuf>,
}

impl ResolvedConfig {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            scan_interval: self.scan_interval,
            scan_policy: HistoryPolicy::new(self.scan_cap, self.dedup),
            link_policy: HistoryPolicy::new(self.link_cap, self.dedup),
            constraints: self.constraints,
            camera_index: self.camera_index,
            preferences: self.preferences,
            decode: DecodeOptions {
                inversion: self.inversion,
            },
        }
    }
}

/// Values from CLI flags. `None`/empty means "not specified".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub sources: Vec<PathBuf>,
    pub camera: Option<usize>,
    pub interval_ms: Option<u64>,
    pub dedup: bool,
    pub facing: Option<FacingMode>,
    pub store_dir: Option<PathBuf>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.qrscan`.
pub fn app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".qrscan"))
}

/// Returns the path to `~/.qrscan/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    app_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.qrscan/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `QrScanConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<QrScanConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(QrScanConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<QrScanConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(QrScanConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: QrScanConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

const DEFAULT_CONFIG: &str = r#"# qrscan configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [scan]
# interval_ms = 300                  # 300..=500, or QRSCAN_INTERVAL_MS
# inversion = "dont_invert"          # "dont_invert", "only_invert", "attempt_both"

# [history]
# scan_cap = 20
# link_cap = 10
# dedup = false                      # Re-scans move to the front instead of repeating

# [auto_open]                        # Initial values; the UI toggles are remembered
# enabled = true
# delay_secs = 3                     # 1..=10, or QRSCAN_DELAY
# sound = true

# [capture]
# sources = ["~/.qrscan/frames"]     # Each directory is one camera, or QRSCAN_SOURCES
# camera_index = 0
# facing = "environment"             # "environment" or "user"
# ideal_width = 1280
# ideal_height = 720

# [storage]
# dir = "~/.qrscan/store"            # Or QRSCAN_STORE_DIR
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &QrScanConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// Same as [`resolve`], reading env vars through `env`.
pub fn resolve_with_env(
    config: &QrScanConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let env_parsed = |key: &str| -> Option<u64> {
        let raw = env(key)?;
        match raw.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring {}={:?}: not a number", key, raw);
                None
            }
        }
    };
    let env_flag = |key: &str| -> Option<bool> {
        match env(key)?.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            other => {
                warn!("Ignoring {}={:?}: not a boolean", key, other);
                None
            }
        }
    };

    // Interval: CLI → env → config → default, then clamped
    let interval_ms = cli
        .interval_ms
        .or_else(|| env_parsed("QRSCAN_INTERVAL_MS"))
        .or(config.scan.interval_ms)
        .unwrap_or(DEFAULT_INTERVAL_MS);
    let clamped_ms = interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS);
    if clamped_ms != interval_ms {
        warn!("Scan interval {}ms out of range, using {}ms", interval_ms, clamped_ms);
    }

    // Dedup: CLI flag only turns it on
    let dedup = cli.dedup
        || env_flag("QRSCAN_DEDUP")
            .or(config.history.dedup)
            .unwrap_or(false);

    // Preference seeds: env → config → default
    let delay_secs = env_parsed("QRSCAN_DELAY")
        .map(|v| v.min(u8::MAX as u64) as u8)
        .or(config.auto_open.delay_secs)
        .unwrap_or(DEFAULT_DELAY_SECS);
    let preferences = Preferences {
        auto_open: env_flag("QRSCAN_AUTO_OPEN")
            .or(config.auto_open.enabled)
            .unwrap_or(true),
        delay_secs: clamp_delay(delay_secs),
        sound: config.auto_open.sound.unwrap_or(true),
    };

    // Sources: CLI → env → config → ~/.qrscan/frames
    let sources = if !cli.sources.is_empty() {
        cli.sources.clone()
    } else if let Some(raw) = env("QRSCAN_SOURCES") {
        std::env::split_paths(&raw).collect()
    } else if let Some(ref dirs) = config.capture.sources {
        dirs.clone()
    } else {
        app_dir().map(|d| vec![d.join("frames")]).unwrap_or_default()
    };
    let sources: Vec<PathBuf> = sources.iter().map(|p| expand_home(p)).collect();

    let camera_index = cli
        .camera
        .or_else(|| env_parsed("QRSCAN_CAMERA").map(|v| v as usize))
        .or(config.capture.camera_index)
        .unwrap_or(0);

    let constraints = StreamConstraints {
        ideal_width: config.capture.ideal_width.unwrap_or(IDEAL_WIDTH),
        ideal_height: config.capture.ideal_height.unwrap_or(IDEAL_HEIGHT),
        facing: cli.facing.or(config.capture.facing).unwrap_or_default(),
    };

    let store_dir = cli
        .store_dir
        .clone()
        .or_else(|| env("QRSCAN_STORE_DIR").map(PathBuf::from))
        .or_else(|| config.storage.dir.clone())
        .map(|p| expand_home(&p));

    ResolvedConfig {
        scan_interval: Duration::from_millis(clamped_ms),
        inversion: config.scan.inversion.unwrap_or_default(),
        scan_cap: config.history.scan_cap.unwrap_or(DEFAULT_SCAN_CAP),
        link_cap: config.history.link_cap.unwrap_or(DEFAULT_LINK_CAP),
        dedup,
        preferences,
        sources,
        camera_index,
        constraints,
        store_dir,
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
