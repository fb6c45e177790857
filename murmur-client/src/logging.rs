use log::LevelFilter;
use simplelog::*;
use std::fs::File;
use std::path::PathBuf;

/// Logging configuration for the Murmur client
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Master switch to enable/disable all logging
    pub enabled: bool,
    /// Path to the log file
    pub log_file: PathBuf,
    /// Whether to clear the log file on startup
    pub clear_on_startup: bool,
    /// Which log targets are written
    pub features: LogFeatures,
    /// Overall log level
    pub level: LevelFilter,
}

/// Per-target switches; each maps to the `target:` used by the sync layer
#[derive(Debug, Clone)]
pub struct LogFeatures {
    pub feed: bool,
    pub likes: bool,
    pub profile: bool,
    pub media: bool,
    pub session: bool,
    pub api_calls: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_file: PathBuf::from("murmur.log"),
            clear_on_startup: true,
            features: LogFeatures::default(),
            level: LevelFilter::Info,
        }
    }
}

impl Default for LogFeatures {
    fn default() -> Self {
        Self::all(true)
    }
}

impl LogFeatures {
    fn all(on: bool) -> Self {
        Self {
            feed: on,
            likes: on,
            profile: on,
            media: on,
            session: on,
            api_calls: on,
        }
    }

    /// Targets that are switched on
    pub fn enabled_targets(&self) -> Vec<&'static str> {
        [
            ("feed", self.feed),
            ("likes", self.likes),
            ("profile", self.profile),
            ("media", self.media),
            ("session", self.session),
            ("api_calls", self.api_calls),
        ]
        .into_iter()
        .filter_map(|(target, on)| on.then_some(target))
        .collect()
    }

    fn is_all(&self) -> bool {
        self.enabled_targets().len() == 6
    }
}

impl LogConfig {
    /// Create a new log configuration with all logging disabled
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Only warnings and errors, from every target
    pub fn minimal() -> Self {
        Self {
            level: LevelFilter::Warn,
            ..Default::default()
        }
    }

    /// Everything down to trace, including raw API calls
    pub fn verbose() -> Self {
        Self {
            level: LevelFilter::Trace,
            features: LogFeatures::all(true),
            ..Default::default()
        }
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    if !config.enabled {
        // Initialize with no-op logger
        let _ = WriteLogger::init(LevelFilter::Off, Config::default(), std::io::sink());
        return Ok(());
    }

    // Clear log file if requested
    if config.clear_on_startup {
        let _ = File::create(&config.log_file)?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    let mut builder = ConfigBuilder::new();
    builder.set_time_format_rfc3339();
    if !config.features.is_all() {
        for target in config.features.enabled_targets() {
            builder.add_filter_allow_str(target);
        }
    }
    let log_config = builder
        .set_time_offset_to_local()
        .unwrap_or_else(|builder| builder)
        .build();

    WriteLogger::init(config.level, log_config, log_file)?;

    log::info!(
        "Logging initialized: file={}, level={:?}",
        config.log_file.display(),
        config.level
    );
    log::debug!("Log targets: {:?}", config.features.enabled_targets());

    Ok(())
}
