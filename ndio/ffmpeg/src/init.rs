/*!
    Process-wide FFmpeg initialization.
*/

use std::sync::OnceLock;

use ffmpeg_next::util::log::Level as LogLevel;
use tracing::debug;

use ndio_types::{Error, Result};

static INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/**
    Configuration for the one-time FFmpeg initialization.
*/
#[derive(Clone, Copy, Debug)]
pub struct InitConfig {
    /// Level for FFmpeg's own log output.
    pub log_level: LogLevel,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Quiet,
        }
    }
}

impl InitConfig {
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

/**
    Initialize FFmpeg with the default configuration.

    Safe to call any number of times; only the first call does any work.
*/
pub fn init() -> Result<()> {
    init_with(InitConfig::default())
}

/**
    Initialize FFmpeg with the given configuration.

    The configuration of the first call wins, later calls return the
    outcome of that first initialization.
*/
pub fn init_with(config: InitConfig) -> Result<()> {
    INIT.get_or_init(|| {
        ffmpeg_next::init().map_err(|e| e.to_string())?;
        ffmpeg_next::format::network::init();
        ffmpeg_next::util::log::set_level(config.log_level);
        debug!(log_level = ?config.log_level, "initialized ffmpeg");
        Ok(())
    })
    .clone()
    .map_err(Error::InitFailed)
}
