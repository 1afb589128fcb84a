use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

use ingredex_core::OcrConfig;

use crate::error::ExtractError;
use crate::preprocess::BinarizedImage;

/// Abstraction over an OCR backend.
///
/// Implementations turn a binarized label image into raw text. An image with
/// no recognizable text yields an empty string, not an error.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, image: &BinarizedImage) -> Result<String, ExtractError>;
}

impl<T: TextExtractor + ?Sized> TextExtractor for Arc<T> {
    fn extract(&self, image: &BinarizedImage) -> Result<String, ExtractError> {
        (**self).extract(image)
    }
}

impl<T: TextExtractor + ?Sized> TextExtractor for Box<T> {
    fn extract(&self, image: &BinarizedImage) -> Result<String, ExtractError> {
        (**self).extract(image)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string — useful for exercising the pipeline without
/// Tesseract installed, or for re-running already recognized text.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextExtractor for MockRecognizer {
    fn extract(&self, _image: &BinarizedImage) -> Result<String, ExtractError> {
        Ok(self.text.clone())
    }
}

// ── Tesseract executable backend ──────────────────────────────────────────────

/// Runs the `tesseract` command-line tool.
///
/// The executable location is part of the configuration handed to the
/// constructor; nothing is read from process-wide settings. The image is
/// streamed as PNG over stdin and the text read back from stdout.
#[derive(Debug, Clone)]
pub struct TesseractCommand {
    executable: PathBuf,
    data_path: Option<PathBuf>,
    language: String,
    page_seg_mode: u8,
    engine_mode: u8,
}

impl TesseractCommand {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            data_path: config.data_path.clone(),
            language: config.language.clone(),
            page_seg_mode: config.page_seg_mode,
            engine_mode: config.engine_mode,
        }
    }

    /// Arguments after the executable, e.g. `stdin stdout --oem 3 --psm 6 -l eng`.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "--oem".to_string(),
            self.engine_mode.to_string(),
            "--psm".to_string(),
            self.page_seg_mode.to_string(),
            "-l".to_string(),
            self.language.clone(),
        ];
        if let Some(dir) = &self.data_path {
            args.push("--tessdata-dir".to_string());
            args.push(dir.display().to_string());
        }
        args
    }

    fn unavailable(&self, detail: impl std::fmt::Display) -> ExtractError {
        ExtractError::OcrEngineUnavailable(format!("{}: {detail}", self.executable.display()))
    }
}

impl TextExtractor for TesseractCommand {
    fn extract(&self, image: &BinarizedImage) -> Result<String, ExtractError> {
        let png = image.to_png()?;

        let mut child = Command::new(&self.executable)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => self.unavailable("executable not found"),
                _ => self.unavailable(e),
            })?;

        // Tesseract reads the whole image before writing anything, so the
        // write cannot block on a full stdout pipe.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png).map_err(|e| self.unavailable(e))?;
        }

        let output = child.wait_with_output().map_err(|e| self.unavailable(e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.unavailable(format!("{} ({})", output.status, stderr.trim())));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!(chars = text.len(), "Tesseract returned text");
        Ok(text)
    }
}

// ── In-process Tesseract backend (optional, gated behind `tesseract` feature) ──

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::TextExtractor;
    use crate::error::ExtractError;
    use crate::preprocess::BinarizedImage;
    use ingredex_core::OcrConfig;
    use leptess::{LepTess, Variable};

    /// libtesseract via `leptess`. The engine mode is fixed at engine
    /// initialisation (`OEM_DEFAULT`); the page segmentation mode is applied per call.
    pub struct TesseractRecognizer {
        data_path: Option<String>,
        language: String,
        page_seg_mode: u8,
    }

    impl TesseractRecognizer {
        pub fn new(config: &OcrConfig) -> Self {
            if config.engine_mode != 3 {
                tracing::warn!(
                    engine_mode = config.engine_mode,
                    "ocr.engine_mode has no effect on the in-process backend; using the engine default"
                );
            }
            Self {
                data_path: config.data_path.as_ref().map(|p| p.display().to_string()),
                language: config.language.clone(),
                page_seg_mode: config.page_seg_mode,
            }
        }
    }

    impl TextExtractor for TesseractRecognizer {
        fn extract(&self, image: &BinarizedImage) -> Result<String, ExtractError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.language)
                .map_err(|e| ExtractError::OcrEngineUnavailable(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, &self.page_seg_mode.to_string())
                .map_err(|e| ExtractError::OcrEngineUnavailable(format!("{e:?}")))?;
            lt.set_image_from_mem(&image.to_png()?)
                .map_err(|e| ExtractError::InvalidImage(e.to_string()))?;
            lt.get_utf8_text()
                .map_err(|e| ExtractError::OcrEngineUnavailable(e.to_string()))
        }
    }
}
