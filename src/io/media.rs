// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Slice image decoding.
//!
//! This module turns the PNG/JPEG bytes served for a slice into an RGBA
//! buffer suitable for display in egui.

use crate::error::SessionError;

/// A decoded RGBA8 image.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

impl DecodedImage {
    /// Convert to an egui image for texture upload.
    pub fn to_color_image(&self) -> egui::ColorImage {
        egui::ColorImage::from_rgba_unmultiplied(
            [self.width as usize, self.height as usize],
            &self.pixels,
        )
    }
}

/// Decode image bytes of any format the `image` crate recognises.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, SessionError> {
    if bytes.is_empty() {
        return Err(SessionError::Decode("empty image body".into()));
    }
    let img = image::load_from_memory(bytes)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(DecodedImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let decoded = decode_image(&png_bytes(3, 2)).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.pixels.len(), 3 * 2 * 4);
        assert_eq!(&decoded.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_image(b""), Err(SessionError::Decode(_))));
        assert!(matches!(
            decode_image(b"{\"error\": \"Original CT not found\"}"),
            Err(SessionError::Decode(_))
        ));
    }
}
