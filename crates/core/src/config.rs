use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Every tunable constant of the extraction pipeline.
///
/// All sections default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocess: PreprocessConfig,
    pub ocr: OcrConfig,
    pub section: SectionConfig,
    pub normalize: NormalizeConfig,
}

/// Largest accepted `blur_kernel` / `threshold_window`.
pub const MAX_KERNEL_SIZE: u32 = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side of the square Gaussian smoothing kernel. Must be odd and at most
    /// [`MAX_KERNEL_SIZE`].
    pub blur_kernel: u32,
    /// Side of the local window used for adaptive thresholding. Must be odd,
    /// at least 3 and at most [`MAX_KERNEL_SIZE`].
    pub threshold_window: u32,
    /// Subtracted from the local weighted mean to get each pixel's threshold.
    pub threshold_bias: i32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { blur_kernel: 5, threshold_window: 11, threshold_bias: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract executable, looked up on `PATH` when not absolute.
    pub executable: PathBuf,
    /// Directory holding `*.traineddata`; engine default when unset.
    pub data_path: Option<PathBuf>,
    pub language: String,
    /// Tesseract `--psm`. 6 = assume a single uniform block of text.
    pub page_seg_mode: u8,
    /// Tesseract `--oem`. 3 = default, based on what is available.
    pub engine_mode: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("tesseract"),
            data_path: None,
            language: "eng".to_string(),
            page_seg_mode: 6,
            engine_mode: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    /// Headers that introduce the ingredient listing, highest priority first.
    pub headers: Vec<String>,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self { headers: vec!["ingredients".to_string(), "composition".to_string()] }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Tokens whose trimmed length is at or below this are dropped as OCR noise.
    pub min_token_len: usize,
    /// Phrases stripped from the start of a token, e.g. "may contain" footers.
    pub qualifier_prefixes: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { min_token_len: 2, qualifier_prefixes: vec!["may contain".to_string()] }
    }
}

impl PipelineConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.preprocess;
        if p.blur_kernel == 0 || p.blur_kernel % 2 == 0 || p.blur_kernel > MAX_KERNEL_SIZE {
            return Err(ConfigError::Invalid(format!(
                "preprocess.blur_kernel must be odd and at most {MAX_KERNEL_SIZE}, got {}",
                p.blur_kernel
            )));
        }
        if p.threshold_window < 3
            || p.threshold_window % 2 == 0
            || p.threshold_window > MAX_KERNEL_SIZE
        {
            return Err(ConfigError::Invalid(format!(
                "preprocess.threshold_window must be odd, between 3 and {MAX_KERNEL_SIZE}, got {}",
                p.threshold_window
            )));
        }

        if self.ocr.page_seg_mode > 13 {
            return Err(ConfigError::Invalid(format!(
                "ocr.page_seg_mode must be 0-13, got {}",
                self.ocr.page_seg_mode
            )));
        }
        if self.ocr.engine_mode > 3 {
            return Err(ConfigError::Invalid(format!(
                "ocr.engine_mode must be 0-3, got {}",
                self.ocr.engine_mode
            )));
        }
        if self.ocr.language.trim().is_empty() {
            return Err(ConfigError::Invalid("ocr.language must not be empty".into()));
        }

        if self.section.headers.is_empty() {
            return Err(ConfigError::Invalid("section.headers must list at least one header".into()));
        }
        if self.section.headers.iter().any(|h| h.trim().is_empty()) {
            return Err(ConfigError::Invalid("section.headers must not contain blank entries".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let c = PipelineConfig::default();
        assert_eq!(c.preprocess.blur_kernel, 5);
        assert_eq!(c.preprocess.threshold_window, 11);
        assert_eq!(c.preprocess.threshold_bias, 2);
        assert_eq!(c.ocr.page_seg_mode, 6);
        assert_eq!(c.ocr.engine_mode, 3);
        assert_eq!(c.section.headers, vec!["ingredients", "composition"]);
        assert_eq!(c.normalize.min_token_len, 2);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(PipelineConfig::from_toml("").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let c = PipelineConfig::from_toml(
            r#"
            [preprocess]
            threshold_window = 15

            [ocr]
            executable = "/opt/tesseract/bin/tesseract"
            "#,
        )
        .unwrap();
        assert_eq!(c.preprocess.threshold_window, 15);
        assert_eq!(c.preprocess.blur_kernel, 5);
        assert_eq!(c.ocr.executable, PathBuf::from("/opt/tesseract/bin/tesseract"));
        assert_eq!(c.ocr.language, "eng");
    }

    #[test]
    fn even_kernel_rejected() {
        let err = PipelineConfig::from_toml("[preprocess]\nblur_kernel = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn oversized_kernels_rejected() {
        let err = PipelineConfig::from_toml("[preprocess]\nblur_kernel = 100001").unwrap_err();
        assert!(err.to_string().contains("at most 255"), "got: {err}");

        let err = PipelineConfig::from_toml("[preprocess]\nthreshold_window = 257").unwrap_err();
        assert!(err.to_string().contains("threshold_window"), "got: {err}");

        let c = PipelineConfig::from_toml("[preprocess]\nblur_kernel = 255\nthreshold_window = 255")
            .unwrap();
        assert_eq!(c.preprocess.blur_kernel, MAX_KERNEL_SIZE);
    }

    #[test]
    fn tiny_window_rejected() {
        let err = PipelineConfig::from_toml("[preprocess]\nthreshold_window = 1").unwrap_err();
        assert!(err.to_string().contains("threshold_window"));
    }

    #[test]
    fn empty_headers_rejected() {
        let err = PipelineConfig::from_toml("[section]\nheaders = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_psm_rejected() {
        assert!(PipelineConfig::from_toml("[ocr]\npage_seg_mode = 14").is_err());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = PipelineConfig::load(Path::new("/nonexistent/ingredex.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
