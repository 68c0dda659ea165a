pub mod config;
pub mod converter;
pub mod session;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config,
    ConfigError, EncodingConfig, OutputConfig,
};
pub use converter::{
    format_time, ConverterConfig, EncodingParams, FfmpegTranscoder, MediaDuration,
    ProgressDisplay, ProgressFrame, ProgressSample, RunOutcome, TerminalDisplay, TranscodeError,
    TranscodeJob, Transcoder,
};
pub use session::{
    cleanup_source, convert_file, output_path_for, CleanupStatus, ConvertReport, ConvertRequest,
};
