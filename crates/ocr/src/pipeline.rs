use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use ingredex_core::{AliasTable, ExtractionResult, PipelineConfig};

use crate::error::ExtractError;
use crate::locate::SectionLocator;
use crate::normalize::Normalizer;
use crate::preprocess::ImagePreprocessor;
use crate::recognizer::TextExtractor;

/// The text half of the pipeline: locate the ingredient section, then
/// normalize it. Used on its own when the label text is already recognized.
#[derive(Debug, Clone)]
pub struct TextPipeline {
    locator: SectionLocator,
    normalizer: Normalizer,
}

impl TextPipeline {
    pub fn new(aliases: Arc<AliasTable>, config: &PipelineConfig) -> Self {
        Self {
            locator: SectionLocator::new(&config.section),
            normalizer: Normalizer::new(aliases, &config.normalize),
        }
    }

    pub fn run(&self, raw_text: String) -> ExtractionResult {
        let block = self.locator.locate(&raw_text);
        let ingredients = self.normalizer.normalize(&block);
        tracing::info!(
            text_chars = raw_text.len(),
            block_chars = block.len(),
            ingredients = ingredients.len(),
            "Extraction complete"
        );
        ExtractionResult::new(raw_text, ingredients)
    }
}

/// Orchestrates: decode → preprocess → OCR → locate section → normalize.
///
/// Holds no per-run state, so one pipeline can serve many images, including
/// from several threads at once.
pub struct ExtractionPipeline<E: TextExtractor> {
    preprocessor: ImagePreprocessor,
    extractor: E,
    text: TextPipeline,
}

impl<E: TextExtractor> ExtractionPipeline<E> {
    pub fn new(extractor: E, aliases: Arc<AliasTable>, config: &PipelineConfig) -> Self {
        Self {
            preprocessor: ImagePreprocessor::new(config.preprocess.clone()),
            extractor,
            text: TextPipeline::new(aliases, config),
        }
    }

    /// Process an image file on disk.
    pub fn run(&self, image_path: &Path) -> Result<ExtractionResult, ExtractError> {
        let _span = tracing::info_span!("extract", path = %image_path.display()).entered();
        let image = ImagePreprocessor::load(image_path)?;
        self.run_image(&image)
    }

    /// Process encoded image bytes (from a camera capture or upload).
    pub fn run_bytes(&self, data: &[u8]) -> Result<ExtractionResult, ExtractError> {
        let image = ImagePreprocessor::decode(data)?;
        self.run_image(&image)
    }

    /// Process an already decoded image.
    pub fn run_image(&self, image: &DynamicImage) -> Result<ExtractionResult, ExtractError> {
        let binarized = self.preprocessor.preprocess(image)?;
        let raw_text = self.extractor.extract(&binarized)?;
        Ok(self.run_text(raw_text))
    }

    /// Locate and normalize text that was already recognized.
    pub fn run_text(&self, raw_text: String) -> ExtractionResult {
        self.text.run(raw_text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::{MockRecognizer, TesseractCommand};
    use image::{GrayImage, ImageBuffer, Luma};
    use ingredex_core::OcrConfig;
    use std::io::Cursor;
    use std::path::PathBuf;

    const LABEL_TEXT: &str =
        "Ingredients: Water, Glycerin, Aqua, Fragrance.\nMay contain: Glycerin";

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn pipeline(text: &str) -> ExtractionPipeline<MockRecognizer> {
        let aliases: AliasTable = [("aqua", "Water")].into_iter().collect();
        ExtractionPipeline::new(
            MockRecognizer::new(text),
            Arc::new(aliases),
            &PipelineConfig::default(),
        )
    }

    #[test]
    fn end_to_end_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.png");
        std::fs::write(&path, tiny_png()).unwrap();

        let result = pipeline(LABEL_TEXT).run(&path).unwrap();

        assert_eq!(result.raw_text(), LABEL_TEXT);
        assert_eq!(result.ingredients(), ["Water", "Glycerin", "Fragrance"]);
    }

    #[test]
    fn run_bytes_matches_run_text() {
        let p = pipeline(LABEL_TEXT);
        let from_image = p.run_bytes(&tiny_png()).unwrap();
        let from_text = p.run_text(LABEL_TEXT.to_string());
        assert_eq!(from_image, from_text);
    }

    #[test]
    fn no_header_gives_empty_ingredients() {
        let text = "Gentle Shampoo\nWater, Glycerin\n250 ml";
        let result = pipeline(text).run_bytes(&tiny_png()).unwrap();
        assert_eq!(result.raw_text(), text);
        assert!(result.ingredients().is_empty());
    }

    #[test]
    fn empty_ocr_text_is_not_an_error() {
        let result = pipeline("").run_bytes(&tiny_png()).unwrap();
        assert_eq!(result.raw_text(), "");
        assert!(result.is_empty());
    }

    #[test]
    fn composition_header_is_used_when_ingredients_missing() {
        let result = pipeline("").run_text("COMPOSITION: AQUA, PARFUM, LIMONENE".into());
        assert_eq!(result.ingredients(), ["Water", "Parfum", "Limonene"]);
    }

    #[test]
    fn text_pipeline_needs_no_extractor() {
        let aliases: AliasTable = [("aqua", "Water")].into_iter().collect();
        let text = TextPipeline::new(Arc::new(aliases), &PipelineConfig::default());
        let result = text.run(LABEL_TEXT.to_string());
        assert_eq!(result.raw_text(), LABEL_TEXT);
        assert_eq!(result.ingredients(), ["Water", "Glycerin", "Fragrance"]);
        assert_eq!(result, pipeline(LABEL_TEXT).run_text(LABEL_TEXT.to_string()));
    }

    #[test]
    fn missing_file_is_invalid_image() {
        let err = pipeline(LABEL_TEXT)
            .run(Path::new("/nonexistent/label.png"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidImage(_)));
    }

    #[test]
    fn corrupt_bytes_are_invalid_image() {
        let err = pipeline(LABEL_TEXT).run_bytes(b"\x89PNG but not really").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidImage(_)));
    }

    #[test]
    fn empty_image_is_invalid_image() {
        let err = pipeline(LABEL_TEXT)
            .run_image(&DynamicImage::new_luma8(0, 0))
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidImage(_)));
    }

    #[test]
    fn engine_unavailable_propagates_unchanged() {
        let extractor = TesseractCommand::new(&OcrConfig {
            executable: PathBuf::from("/nonexistent/bin/tesseract"),
            ..OcrConfig::default()
        });
        let p = ExtractionPipeline::new(
            extractor,
            Arc::new(AliasTable::new()),
            &PipelineConfig::default(),
        );
        let err = p.run_bytes(&tiny_png()).unwrap_err();
        assert!(matches!(err, ExtractError::OcrEngineUnavailable(_)));
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        let p = Arc::new(pipeline(LABEL_TEXT));
        let png = tiny_png();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = Arc::clone(&p);
                let png = png.clone();
                std::thread::spawn(move || p.run_bytes(&png).unwrap())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().ingredients(), ["Water", "Glycerin", "Fragrance"]);
        }
    }
}
