pub mod archive;
pub mod batch;
pub mod config;
pub mod converter;
pub mod format;
pub mod metrics;
pub mod testing;

pub use archive::{ArchiveConfig, ArchiveError, ArchiveSummary, Packager, ZipPackager};
pub use batch::{
    BatchConfig, BatchConverter, BatchError, BatchOutcome, BatchProgress, ConversionOptions,
    ConversionResult, FailureKind, InputFile, OutcomeKind, RetryConfig,
};
pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, Config, ConfigError,
    OutputConfig,
};
pub use converter::{
    ConversionJob, ConversionOutput, ConversionProgress, Converter, ConverterConfig,
    ConverterError, FfmpegConverter, MediaInfo,
};
pub use format::{assign_output_names, classify, priority_order, FormatClass, SourceFormat};
