//! Transcoding configuration.
//!
//! [`TranscodeConfig`] bundles every tunable of the engine. It starts from
//! defaults and may be overlaid from an INI file:
//!
//! ```ini
//! [pool]
//! capacity = 32
//! wait_tick_ms = 100
//! quiet_period_secs = 10
//! hard_cap_secs = 30
//!
//! [decode]
//! check_blank = true
//! error_peek_bytes = 1024
//!
//! [terrain]
//! bytes_per_sample = 2
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

/// Default number of rasters the pool lends out at once.
pub const DEFAULT_POOL_CAPACITY: usize = 32;

/// Default interval between cancellation checks while waiting on the pool.
pub const DEFAULT_POOL_WAIT_TICK: Duration = Duration::from_millis(100);

/// Default quiet period before idle pooled rasters are evicted.
pub const DEFAULT_POOL_QUIET_PERIOD: Duration = Duration::from_secs(10);

/// Default upper bound on how long eviction may be postponed by activity.
pub const DEFAULT_POOL_HARD_CAP: Duration = Duration::from_secs(30);

/// Default number of leading bytes kept for error-text recovery.
pub const DEFAULT_ERROR_PEEK_BYTES: usize = 1024;

/// Default sample width of raw terrain rasters (16-bit elevations).
pub const DEFAULT_TERRAIN_BYTES_PER_SAMPLE: usize = 2;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Tunables for decoding, pooling and encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeConfig {
    /// Maximum rasters checked out of the pool at once.
    pub pool_capacity: usize,
    /// How often a blocked `take` re-checks the source's cancellation flag.
    pub pool_wait_tick: Duration,
    /// Idle time after which free pooled rasters are evicted.
    pub pool_quiet_period: Duration,
    /// Eviction happens at the latest this long after the first activity.
    pub pool_hard_cap: Duration,
    /// Short-circuit DXT5 encodes of fully transparent rasters.
    pub check_blank: bool,
    /// Leading bytes logged when no decoder accepts a stream.
    pub error_peek_bytes: usize,
    /// Sample width of raw terrain rasters.
    pub terrain_bytes_per_sample: usize,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            pool_wait_tick: DEFAULT_POOL_WAIT_TICK,
            pool_quiet_period: DEFAULT_POOL_QUIET_PERIOD,
            pool_hard_cap: DEFAULT_POOL_HARD_CAP,
            check_blank: true,
            error_peek_bytes: DEFAULT_ERROR_PEEK_BYTES,
            terrain_bytes_per_sample: DEFAULT_TERRAIN_BYTES_PER_SAMPLE,
        }
    }
}

impl TranscodeConfig {
    /// Load configuration from an INI file.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigFileError::InvalidValue {
            section: String::new(),
            key: String::new(),
            value: String::new(),
            reason: e.to_string(),
        })?;
        parse_ini(&ini)
    }

    /// Set the pool capacity.
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Set the pool wait tick.
    pub fn with_pool_wait_tick(mut self, tick: Duration) -> Self {
        self.pool_wait_tick = tick;
        self
    }

    /// Set the janitor quiet period and hard cap.
    pub fn with_pool_cleanup(mut self, quiet_period: Duration, hard_cap: Duration) -> Self {
        self.pool_quiet_period = quiet_period;
        self.pool_hard_cap = hard_cap;
        self
    }

    /// Enable or disable blank-raster short-circuiting.
    pub fn with_check_blank(mut self, enabled: bool) -> Self {
        self.check_blank = enabled;
        self
    }
}

fn parse_ini(ini: &Ini) -> Result<TranscodeConfig, ConfigFileError> {
    let mut config = TranscodeConfig::default();

    // [pool] section
    if let Some(section) = ini.section(Some("pool")) {
        if let Some(v) = section.get("capacity") {
            let capacity: usize = parse_value("pool", "capacity", v)?;
            if capacity == 0 {
                return Err(invalid("pool", "capacity", v, "must be at least 1"));
            }
            config.pool_capacity = capacity;
        }
        if let Some(v) = section.get("wait_tick_ms") {
            let ms: u64 = parse_value("pool", "wait_tick_ms", v)?;
            if ms == 0 {
                return Err(invalid("pool", "wait_tick_ms", v, "must be at least 1"));
            }
            config.pool_wait_tick = Duration::from_millis(ms);
        }
        if let Some(v) = section.get("quiet_period_secs") {
            config.pool_quiet_period =
                Duration::from_secs(parse_value("pool", "quiet_period_secs", v)?);
        }
        if let Some(v) = section.get("hard_cap_secs") {
            config.pool_hard_cap = Duration::from_secs(parse_value("pool", "hard_cap_secs", v)?);
        }
        if config.pool_hard_cap < config.pool_quiet_period {
            return Err(invalid(
                "pool",
                "hard_cap_secs",
                &config.pool_hard_cap.as_secs().to_string(),
                "must not be shorter than quiet_period_secs",
            ));
        }
    }

    // [decode] section
    if let Some(section) = ini.section(Some("decode")) {
        if let Some(v) = section.get("check_blank") {
            config.check_blank = parse_bool("decode", "check_blank", v)?;
        }
        if let Some(v) = section.get("error_peek_bytes") {
            let peek: usize = parse_value("decode", "error_peek_bytes", v)?;
            if peek == 0 {
                return Err(invalid("decode", "error_peek_bytes", v, "must be at least 1"));
            }
            config.error_peek_bytes = peek;
        }
    }

    // [terrain] section
    if let Some(section) = ini.section(Some("terrain")) {
        if let Some(v) = section.get("bytes_per_sample") {
            let bps: usize = parse_value("terrain", "bytes_per_sample", v)?;
            if ![1, 2, 4].contains(&bps) {
                return Err(invalid(
                    "terrain",
                    "bytes_per_sample",
                    v,
                    "must be one of: 1, 2, 4",
                ));
            }
            config.terrain_bytes_per_sample = bps;
        }
    }

    Ok(config)
}

fn parse_value<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer"))
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
