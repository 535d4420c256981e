use image::{GrayImage, Luma, RgbImage, imageops};

use crate::vision::geometry::PixelBounds;
use crate::vision::regions::Color;

/// Copies a window out of the frame. `bounds` must already be clamped.
pub fn crop(img: &RgbImage, bounds: PixelBounds) -> RgbImage {
    let (x, y, width, height) = bounds;
    imageops::crop_imm(img, x, y, width, height).to_image()
}

/// Mean luminance of an image, 0.0 to 255.0.
pub fn mean_luma(img: &GrayImage) -> f32 {
    if img.width() == 0 || img.height() == 0 {
        return 0.0;
    }
    let total: u64 = img.pixels().map(|p| p[0] as u64).sum();
    total as f32 / (img.width() as u64 * img.height() as u64) as f32
}

/// Stretches every channel away from the image's mean grey level.
///
/// Each channel becomes `mean + factor * (value - mean)`, clamped. With a
/// large factor this pushes the bright clock digits to white and the
/// overlay background to black.
pub fn enhance_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let mean = mean_luma(&imageops::grayscale(img)).round();
    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            let value = mean + factor * (*channel as f32 - mean);
            *channel = value.clamp(0.0, 255.0) as u8;
        }
    }
    output
}

/// Converts a grayscale image to pure black and white.
///
/// Pixels darker than `level` become black, everything else white.
pub fn threshold(img: &GrayImage, level: u8) -> GrayImage {
    let mut output = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let value = if pixel[0] < level { 0u8 } else { 255u8 };
        output.put_pixel(x, y, Luma([value]));
    }
    output
}

/// Grayscale copy with black and white swapped, for light-on-dark digits.
pub fn inverted_luma(img: &RgbImage) -> GrayImage {
    let mut gray = imageops::grayscale(img);
    imageops::invert(&mut gray);
    gray
}

/// Mean RGB colour of an image.
pub fn mean_color(img: &RgbImage) -> Color {
    let count = img.width() as f64 * img.height() as f64;
    if count == 0.0 {
        return [0.0; 3];
    }
    let mut sums = [0.0f64; 3];
    for pixel in img.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += channel as f64;
        }
    }
    sums.map(|sum| sum / count)
}

/// Euclidean distance between two colours.
pub fn color_distance(a: Color, b: Color) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
