use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::converter::{ConverterConfig, EncodingParams};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub encoding: EncodingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Encoder settings applied to every job
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EncodingConfig {
    /// Video quality, 1 (best) to 31 (worst)
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Output frame rate
    #[serde(default = "default_framerate")]
    pub framerate: u32,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            framerate: default_framerate(),
        }
    }
}

impl EncodingConfig {
    pub fn params(&self) -> EncodingParams {
        EncodingParams::new(self.quality, self.framerate)
    }
}

fn default_quality() -> u8 {
    5
}

fn default_framerate() -> u32 {
    30
}

/// Output placement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory that receives converted files
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// Keep the source file after a successful conversion
    #[serde(default)]
    pub keep_source: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            keep_source: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
