//! Face thumbnail extraction.
//!
//! Crops a padded region around a face box and encodes it as JPEG. Padding
//! is a fraction of the larger box side, applied on all four sides and
//! clamped to the image bounds.

use faceid_core::BoundingBox;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("face box lies outside the image bounds")]
    DegenerateCrop,
    #[error("encode: {0}")]
    Encode(#[from] image::ImageError),
}

/// Crop a padded face region out of `image` and encode it as JPEG.
pub fn render_face_thumbnail(
    image: &DynamicImage,
    bbox: &BoundingBox,
    padding: f32,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ThumbnailError> {
    let (img_w, img_h) = image.dimensions();

    let pad = bbox.width.max(bbox.height) * padding;
    let x1 = (bbox.x - pad).max(0.0) as u32;
    let y1 = (bbox.y - pad).max(0.0) as u32;
    let x2 = ((bbox.x + bbox.width + pad).max(0.0) as u32).min(img_w);
    let y2 = ((bbox.y + bbox.height + pad).max(0.0) as u32).min(img_h);

    if x2 <= x1 || y2 <= y1 {
        return Err(ThumbnailError::DegenerateCrop);
    }

    let crop = image.crop_imm(x1, y1, x2 - x1, y2 - y1).to_rgb8();

    let mut encoded = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut encoded, jpeg_quality);
    crop.write_with_encoder(encoder)?;
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width: w,
            height: h,
            confidence: 0.9,
        }
    }

    fn test_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::new_rgb8(w, h)
    }

    #[test]
    fn test_padded_crop_dimensions() {
        // box 50x40 at (100, 100), padding 20% of 50 = 10 per side
        let bytes =
            render_face_thumbnail(&test_image(640, 480), &bbox(100.0, 100.0, 50.0, 40.0), 0.2, 85)
                .unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!(thumb.dimensions(), (70, 60));
    }

    #[test]
    fn test_clamped_at_image_edge() {
        // box flush against the top-left corner: padding clamps to 0
        let bytes =
            render_face_thumbnail(&test_image(640, 480), &bbox(0.0, 0.0, 50.0, 50.0), 0.2, 85)
                .unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!(thumb.dimensions(), (60, 60));
    }

    #[test]
    fn test_box_outside_image_is_degenerate() {
        let err = render_face_thumbnail(
            &test_image(100, 100),
            &bbox(500.0, 500.0, 50.0, 50.0),
            0.2,
            85,
        )
        .unwrap_err();
        assert!(matches!(err, ThumbnailError::DegenerateCrop));
    }

    #[test]
    fn test_output_is_jpeg() {
        let bytes =
            render_face_thumbnail(&test_image(200, 200), &bbox(50.0, 50.0, 40.0, 40.0), 0.2, 85)
                .unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
