// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module maps pointer positions on the displayed slice image to voxel
//! coordinates of the original volume, and back for drawing point markers.
//! The mapping always uses the volume's x/y extents, never the pixel size of
//! the served image, since the backend may scale slices for display.

use crate::error::SessionError;
use crate::models::case::VolumeInfo;

/// On-screen bounding rectangle of the rendered slice image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Voxel position inside a slice plane. May lie outside the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelCoord {
    pub x: i64,
    pub y: i64,
}

impl VoxelCoord {
    /// Reject coordinates outside `0..width` x `0..height`.
    ///
    /// Clicks outside the image are never clamped onto its border.
    pub fn within(self, info: &VolumeInfo) -> Result<(u32, u32), SessionError> {
        let (width, height) = (info.width(), info.height());
        if self.x < 0 || self.y < 0 || self.x >= width as i64 || self.y >= height as i64 {
            return Err(SessionError::OutOfBounds {
                x: self.x,
                y: self.y,
                width,
                height,
            });
        }
        Ok((self.x as u32, self.y as u32))
    }
}

/// Convert a pointer position to voxel coordinates of the loaded volume.
///
/// `x = floor((pointer_x - rect.left) * (X / rect.width))`, likewise for y.
/// Fails with `NotReady` when no volume info is loaded or the image has not
/// been laid out yet.
pub fn pointer_to_voxel(
    pointer_x: f32,
    pointer_y: f32,
    rect: &DisplayRect,
    volume: Option<&VolumeInfo>,
) -> Result<VoxelCoord, SessionError> {
    let info = volume.ok_or_else(|| SessionError::NotReady("volume info not loaded".into()))?;
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(SessionError::NotReady("slice image has no size".into()));
    }

    let scale_x = info.width() as f64 / rect.width as f64;
    let scale_y = info.height() as f64 / rect.height as f64;
    let x = ((pointer_x as f64 - rect.left as f64) * scale_x).floor() as i64;
    let y = ((pointer_y as f64 - rect.top as f64) * scale_y).floor() as i64;

    Ok(VoxelCoord { x, y })
}

/// Screen position of the centre of voxel (x, y), for drawing markers.
pub fn voxel_to_display(x: u32, y: u32, rect: &DisplayRect, info: &VolumeInfo) -> (f32, f32) {
    let sx = rect.width / info.width().max(1) as f32;
    let sy = rect.height / info.height().max(1) as f32;
    (
        rect.left + (x as f32 + 0.5) * sx,
        rect.top + (y as f32 + 0.5) * sy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(x: u32, y: u32, z: u32) -> VolumeInfo {
        VolumeInfo::new([x, y, z], [1.0, 1.0, 1.0])
    }

    #[test]
    fn test_pointer_to_voxel_scales_by_volume_extent() {
        let info = volume(512, 512, 120);
        let rect = DisplayRect::new(10.0, 20.0, 256.0, 256.0);

        let voxel = pointer_to_voxel(110.0, 95.0, &rect, Some(&info)).unwrap();
        assert_eq!(voxel, VoxelCoord { x: 200, y: 150 });
    }

    #[test]
    fn test_pointer_to_voxel_non_square() {
        // 400x300 display of a 512x256 volume
        let info = volume(512, 256, 40);
        let rect = DisplayRect::new(0.0, 0.0, 400.0, 300.0);

        let voxel = pointer_to_voxel(399.0, 299.0, &rect, Some(&info)).unwrap();
        assert_eq!(voxel.x, (399.0_f64 * (512.0 / 400.0)).floor() as i64);
        assert_eq!(voxel.y, (299.0_f64 * (256.0 / 300.0)).floor() as i64);
    }

    #[test]
    fn test_pointer_to_voxel_requires_volume() {
        let rect = DisplayRect::new(0.0, 0.0, 100.0, 100.0);
        let err = pointer_to_voxel(5.0, 5.0, &rect, None).unwrap_err();
        assert!(matches!(err, SessionError::NotReady(_)));
    }

    #[test]
    fn test_outside_click_computes_then_rejects() {
        let info = volume(512, 512, 120);
        let rect = DisplayRect::new(100.0, 100.0, 512.0, 512.0);

        let voxel = pointer_to_voxel(90.0, 700.0, &rect, Some(&info)).unwrap();
        assert_eq!(voxel, VoxelCoord { x: -10, y: 600 });
        assert!(matches!(
            voxel.within(&info),
            Err(SessionError::OutOfBounds { x: -10, y: 600, .. })
        ));
    }

    #[test]
    fn test_within_accepts_edges() {
        let info = volume(512, 512, 120);
        assert_eq!(VoxelCoord { x: 0, y: 511 }.within(&info).unwrap(), (0, 511));
        assert!(VoxelCoord { x: 512, y: 0 }.within(&info).is_err());
    }

    #[test]
    fn test_voxel_to_display_roundtrip() {
        let info = volume(512, 512, 120);
        let rect = DisplayRect::new(10.0, 20.0, 256.0, 256.0);

        let (px, py) = voxel_to_display(100, 150, &rect, &info);
        let voxel = pointer_to_voxel(px, py, &rect, Some(&info)).unwrap();
        assert_eq!(voxel, VoxelCoord { x: 100, y: 150 });
    }
}
