use thiserror::Error;

/// The two terminal failure kinds of an extraction run.
///
/// Every stage returns this type so the pipeline forwards stage errors with
/// `?` unchanged. Finding no ingredients is not an error.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The input could not be read or decoded, or has no pixels.
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    /// The OCR engine could not be invoked. Usually an installation problem.
    #[error("OCR engine unavailable: {0}")]
    OcrEngineUnavailable(String),
}

impl From<image::ImageError> for ExtractError {
    fn from(e: image::ImageError) -> Self {
        ExtractError::InvalidImage(e.to_string())
    }
}
