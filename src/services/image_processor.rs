// src/services/image_processor.rs
use crate::errors::StitchyError;
use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat};

const MAX_INPUT_DIMENSION: u32 = 4096;

/// Prepares uploaded photos for the vision capability.
pub struct ImageProcessor {
    max_dimension: u32,
    max_bytes: Option<usize>,
}

impl ImageProcessor {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            max_bytes: None,
        }
    }

    /// Caps the encoded size, for providers that reject large inline images.
    pub fn with_byte_limit(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn validate_image(&self, data: &[u8]) -> Result<(u32, u32), StitchyError> {
        check_dimensions(&load(data)?)
    }

    /// Validates, downsizes and encodes the upload as a `data:` URL.
    pub fn prepare_for_analysis(&self, data: &[u8]) -> Result<String, StitchyError> {
        let img = load(data)?;
        check_dimensions(&img)?;
        let resized = self.resize_if_needed(img);

        let (bytes, mime) = match self.max_bytes {
            Some(limit) => (shrink_to_limit(resized, limit)?, "image/jpeg"),
            None => (encode(&resized, ImgFormat::Png)?, "image/png"),
        };

        Ok(format!(
            "data:{};base64,{}",
            mime,
            general_purpose::STANDARD.encode(bytes)
        ))
    }

    fn resize_if_needed(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();

        if width <= self.max_dimension && height <= self.max_dimension {
            return img;
        }

        let ratio = (self.max_dimension as f32 / width.max(height) as f32).min(1.0);
        let new_width = ((width as f32 * ratio) as u32).max(1);
        let new_height = ((height as f32 * ratio) as u32).max(1);

        img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
    }
}

fn check_dimensions(img: &DynamicImage) -> Result<(u32, u32), StitchyError> {
    let (width, height) = img.dimensions();

    if width > MAX_INPUT_DIMENSION || height > MAX_INPUT_DIMENSION {
        return Err(StitchyError::ImageProcessing(format!(
            "Image dimensions exceed {0}x{0}",
            MAX_INPUT_DIMENSION
        )));
    }

    Ok((width, height))
}

fn load(data: &[u8]) -> Result<DynamicImage, StitchyError> {
    image::load_from_memory(data)
        .map_err(|e| StitchyError::ImageProcessing(format!("Invalid image format: {}", e)))
}

fn encode(img: &DynamicImage, format: ImgFormat) -> Result<Vec<u8>, StitchyError> {
    let mut output = Vec::new();
    let img = match format {
        // JPEG has no alpha channel
        ImgFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img.clone(),
    };
    img.write_to(&mut std::io::Cursor::new(&mut output), format)
        .map_err(|e| StitchyError::ImageProcessing(format!("Failed to encode image: {}", e)))?;
    Ok(output)
}

fn shrink_to_limit(img: DynamicImage, max_bytes: usize) -> Result<Vec<u8>, StitchyError> {
    let mut current = img;
    loop {
        let bytes = encode(&current, ImgFormat::Jpeg)?;
        if bytes.len() <= max_bytes {
            return Ok(bytes);
        }

        let (width, height) = current.dimensions();
        if width <= 256 || height <= 256 {
            return Err(StitchyError::ImageProcessing(format!(
                "Image still exceeds {} bytes at minimum size",
                max_bytes
            )));
        }

        let scale_factor = ((max_bytes as f64 / bytes.len() as f64).sqrt() * 0.9) as f32;
        let new_width = ((width as f32 * scale_factor) as u32).max(256);
        let new_height = ((height as f32 * scale_factor) as u32).max(256);
        current = current.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 120, 40])));
        encode(&img, ImgFormat::Png).unwrap()
    }

    #[test]
    fn rejects_non_images() {
        let processor = ImageProcessor::new(2048);
        let err = processor.validate_image(b"definitely not a png").unwrap_err();
        assert!(matches!(err, StitchyError::ImageProcessing(_)));
    }

    #[test]
    fn reports_dimensions() {
        let processor = ImageProcessor::new(2048);
        assert_eq!(processor.validate_image(&png(40, 30)).unwrap(), (40, 30));
    }

    #[test]
    fn oversized_uploads_are_rejected_before_resizing() {
        let processor = ImageProcessor::new(64);
        let err = processor.prepare_for_analysis(&png(4097, 1)).unwrap_err();
        assert!(matches!(err, StitchyError::ImageProcessing(msg) if msg.contains("4096x4096")));
    }

    #[test]
    fn downsizes_to_max_dimension() {
        let processor = ImageProcessor::new(32);
        let url = processor.prepare_for_analysis(&png(128, 64)).unwrap();
        let encoded = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (32, 16));
    }

    #[test]
    fn byte_limit_switches_to_jpeg() {
        let processor = ImageProcessor::new(512).with_byte_limit(1_000_000);
        let url = processor.prepare_for_analysis(&png(64, 64)).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }
}
