pub mod error;
pub mod locate;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;

pub use error::ExtractError;
pub use locate::SectionLocator;
pub use normalize::{render, Normalizer};
pub use pipeline::{ExtractionPipeline, TextPipeline};
pub use preprocess::{BinarizedImage, ImagePreprocessor};
pub use recognizer::{MockRecognizer, TesseractCommand, TextExtractor};
#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;
