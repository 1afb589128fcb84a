pub mod alias;
pub mod config;
pub mod result;

pub use alias::{AliasError, AliasTable};
pub use config::{
    ConfigError, NormalizeConfig, OcrConfig, PipelineConfig, PreprocessConfig, SectionConfig,
    MAX_KERNEL_SIZE,
};
pub use result::ExtractionResult;
