pub mod core;
pub mod error;
pub mod features;
pub mod geometry;
pub mod locator;
pub mod regions;

pub use self::core::{TrackingContext, VisionCore};
pub use error::{VisionError, VisionResult};
pub use geometry::FrameGeometry;
pub use locator::{LabelLocator, LogoTemplate};
pub use regions::Rect;

use image::RgbImage;

use crate::ocr::preprocess::crop;

/// Crops `rect` out of the frame, clamped to both the session geometry and
/// the frame itself. An empty window is an error.
pub(crate) fn crop_rect(
    frame: &RgbImage,
    geometry: &FrameGeometry,
    rect: &Rect,
) -> VisionResult<RgbImage> {
    let out_of_bounds = || VisionError::CropOutOfBounds {
        rect: *rect,
        width: frame.width(),
        height: frame.height(),
    };

    let bounds = geometry.pixel_bounds(rect).ok_or_else(out_of_bounds)?;
    let window = crop(frame, bounds);
    if window.width() == 0 || window.height() == 0 {
        return Err(out_of_bounds());
    }
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_rect_clamps() {
        let geometry = FrameGeometry::new(200, 100);
        let frame = RgbImage::new(200, 100);

        let window = crop_rect(&frame, &geometry, &Rect::new(150.0, 50.0, 260.0, 90.0)).unwrap();
        assert_eq!(window.dimensions(), (50, 40));
    }

    #[test]
    fn test_crop_rect_outside_frame() {
        let geometry = FrameGeometry::new(200, 100);
        let frame = RgbImage::new(200, 100);

        let err = crop_rect(&frame, &geometry, &Rect::new(250.0, 0.0, 300.0, 10.0)).unwrap_err();
        assert!(matches!(
            err,
            VisionError::CropOutOfBounds {
                width: 200,
                height: 100,
                ..
            }
        ));
    }
}
