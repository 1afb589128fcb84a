use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use ingredex_core::{PreprocessConfig, MAX_KERNEL_SIZE};

use crate::error::ExtractError;

/// Pixel value of recognized ink in a [`BinarizedImage`].
pub const INK: u8 = 0;
/// Pixel value of label background in a [`BinarizedImage`].
pub const BACKGROUND: u8 = 255;

/// Single-channel image whose pixels are either [`INK`] or [`BACKGROUND`].
///
/// Only [`ImagePreprocessor::preprocess`] creates one; it is read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct BinarizedImage(GrayImage);

impl BinarizedImage {
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    pub fn ink_pixels(&self) -> usize {
        self.0.pixels().filter(|p| p[0] == INK).count()
    }

    /// Lossless PNG encoding, the interchange format for OCR backends.
    pub fn to_png(&self) -> Result<Vec<u8>, ExtractError> {
        let mut buf = Vec::new();
        self.0
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| ExtractError::InvalidImage(format!("failed to encode binarized image: {e}")))?;
        Ok(buf)
    }
}

/// Grayscale → Gaussian smoothing → adaptive threshold.
#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Read and decode an image file.
    pub fn load(path: &Path) -> Result<DynamicImage, ExtractError> {
        image::open(path)
            .map_err(|e| ExtractError::InvalidImage(format!("{}: {e}", path.display())))
    }

    /// Decode raw image bytes (JPEG / PNG / WEBP / …).
    pub fn decode(data: &[u8]) -> Result<DynamicImage, ExtractError> {
        Ok(image::load_from_memory(data)?)
    }

    pub fn preprocess(&self, image: &DynamicImage) -> Result<BinarizedImage, ExtractError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(ExtractError::InvalidImage(format!(
                "image has no pixels ({width}x{height})"
            )));
        }

        let gray = to_luma_bt601(image);
        let smoothed = gaussian_blur(&gray, self.config.blur_kernel);
        let binary = adaptive_threshold(
            &smoothed,
            self.config.threshold_window,
            self.config.threshold_bias,
        );

        let binarized = BinarizedImage(binary);
        tracing::debug!(
            width,
            height,
            ink_pixels = binarized.ink_pixels(),
            "Binarized image"
        );
        Ok(binarized)
    }
}

// ── Filters ───────────────────────────────────────────────────────────────────

/// ITU-R BT.601 luminance, the weighting most OCR tooling expects.
fn to_luma_bt601(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y).0;
        let luma = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Normalized 1-D Gaussian weights for an odd kernel `size`, clamped to
/// `1..=MAX_KERNEL_SIZE` for configs that skipped validation.
/// Sigma follows the usual size-derived default: `0.3 * ((size - 1) / 2 - 1) + 0.8`.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let half = (size.clamp(1, MAX_KERNEL_SIZE) / 2) as i64;
    let sigma = 0.3 * (half as f32 - 1.0) + 0.8;
    let weights: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Separable convolution; out-of-range samples replicate the nearest edge pixel.
fn convolve_separable(src: &[f32], width: usize, height: usize, kernel: &[f32]) -> Vec<f32> {
    let half = (kernel.len() / 2) as isize;
    let clamp = |v: isize, len: usize| v.clamp(0, len as isize - 1) as usize;

    let mut horizontal = vec![0.0f32; src.len()];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        for x in 0..width {
            horizontal[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| row[clamp(x as isize + k as isize - half, width)] * w)
                .sum();
        }
    }

    let mut out = vec![0.0f32; src.len()];
    for y in 0..height {
        for x in 0..width {
            out[y * width + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| horizontal[clamp(y as isize + k as isize - half, height) * width + x] * w)
                .sum();
        }
    }
    out
}

fn weighted_mean(gray: &GrayImage, size: u32) -> Vec<u8> {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let src: Vec<f32> = gray.as_raw().iter().map(|&v| v as f32).collect();
    convolve_separable(&src, w, h, &gaussian_kernel(size))
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect()
}

fn gaussian_blur(gray: &GrayImage, size: u32) -> GrayImage {
    let data = weighted_mean(gray, size);
    // Same dimensions as the input, so the buffer length always matches.
    GrayImage::from_raw(gray.width(), gray.height(), data).unwrap_or_else(|| gray.clone())
}

/// Each pixel is compared with the Gaussian-weighted mean of its
/// `window × window` neighbourhood minus `bias`; brighter pixels become background.
fn adaptive_threshold(gray: &GrayImage, window: u32, bias: i32) -> GrayImage {
    let mean = weighted_mean(gray, window);
    let data = gray
        .as_raw()
        .iter()
        .zip(mean)
        .map(|(&src, m)| {
            if src as i32 > m as i32 - bias {
                BACKGROUND
            } else {
                INK
            }
        })
        .collect();
    GrayImage::from_raw(gray.width(), gray.height(), data)
        .unwrap_or_else(|| GrayImage::from_pixel(gray.width(), gray.height(), Luma([BACKGROUND])))
}
