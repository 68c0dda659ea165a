use super::{types::Config, ConfigError};
use crate::converter::{FFMPEG_LOG_LEVELS, MAX_QUALITY, MIN_QUALITY};

/// Validate configuration
/// Currently validates:
/// - Encoding quality is within the encoder's quantizer range
/// - Frame rate is not 0
/// - Progress bar width is not 0
/// - ffmpeg log level is one ffmpeg understands
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Encoding validation
    let quality = config.encoding.quality;
    if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        return Err(ConfigError::ValidationError(format!(
            "encoding.quality must be between {} and {}, got {}",
            MIN_QUALITY, MAX_QUALITY, quality
        )));
    }

    if config.encoding.framerate == 0 {
        return Err(ConfigError::ValidationError(
            "encoding.framerate cannot be 0".to_string(),
        ));
    }

    // Converter validation
    if config.converter.bar_width == 0 {
        return Err(ConfigError::ValidationError(
            "converter.bar_width cannot be 0".to_string(),
        ));
    }

    if !FFMPEG_LOG_LEVELS.contains(&config.converter.ffmpeg_log_level.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "converter.ffmpeg_log_level '{}' is not one of: {}",
            config.converter.ffmpeg_log_level,
            FFMPEG_LOG_LEVELS.join(", ")
        )));
    }

    Ok(())
}
