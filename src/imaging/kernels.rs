//! Pixel kernels for the image adjustment engine
//!
//! Colour math follows the 8-bit conventions of common imaging libraries:
//! hue is stored as degrees / 2 (0..180), saturation and value as 0..255.

use rayon::prelude::*;

use crate::media::Frame;

/// BT.601 luma weights
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Hue period on the 8-bit scale
const HUE_PERIOD: i32 = 180;

pub const SHARPEN_KERNEL: [[f32; 3]; 3] = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];

pub fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

pub fn luma([r, g, b]: [u8; 3]) -> u8 {
    clamp_channel(r as f32 * LUMA_WEIGHTS[0] + g as f32 * LUMA_WEIGHTS[1] + b as f32 * LUMA_WEIGHTS[2])
}

/// `p * alpha + beta` on every channel
pub fn convert_scale(frame: &mut Frame, alpha: f32, beta: f32) {
    frame.map_channels(|v| clamp_channel(v as f32 * alpha + beta));
}

pub fn grayscale(frame: &mut Frame) {
    frame.map_pixels(|pixel| [luma(pixel); 3]);
}

/// RGB to 8-bit HSV
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    let h8 = ((h / 2.0).round() as i32).rem_euclid(HUE_PERIOD) as u8;
    [h8, clamp_channel(s), max as u8]
}

/// 8-bit HSV back to RGB
pub fn hsv_to_rgb([h, s, v]: [u8; 3]) -> [u8; 3] {
    let value = v as f32;
    if s == 0 {
        return [v, v, v];
    }

    let saturation = s as f32 / 255.0;
    let sector = (h as f32 * 2.0 / 60.0).rem_euclid(6.0);
    let index = sector.floor();
    let fraction = sector - index;

    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * fraction);
    let t = value * (1.0 - saturation * (1.0 - fraction));

    let (r, g, b) = match index as u8 {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };
    [clamp_channel(r), clamp_channel(g), clamp_channel(b)]
}

/// Shift hue (wrapping) and saturation (clamping) in 8-bit HSV space
pub fn shift_hue_saturation(frame: &mut Frame, hue: i32, saturation: i32) {
    frame.map_pixels(|pixel| {
        let [h, s, v] = rgb_to_hsv(pixel);
        let h = (h as i32 + hue).rem_euclid(HUE_PERIOD) as u8;
        let s = (s as i32 + saturation).clamp(0, 255) as u8;
        hsv_to_rgb([h, s, v])
    });
}

/// Mirror index `i` into `0..len` without repeating the edge pixel
pub fn reflect_101(i: i64, len: usize) -> usize {
    let n = len as i64;
    if n <= 1 {
        return 0;
    }
    let period = 2 * n - 2;
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}

/// Rotate counter-clockwise about `(w / 2, h / 2)` keeping the canvas size
///
/// Corners that leave the canvas are lost and uncovered areas are black.
/// Sampling is bilinear.
pub fn rotate_about_center(frame: &Frame, degrees: f64) -> Frame {
    let (width, height) = frame.dimensions();
    let cx = (width / 2) as f64;
    let cy = (height / 2) as f64;
    let (sin, cos) = degrees.to_radians().sin_cos();

    let mut out = Frame::new_black(width, height);
    let row_len = width as usize * 3;

    out.as_image_mut()
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f64 - cy;
            for x in 0..width as usize {
                let dx = x as f64 - cx;
                let sx = snap(cos * dx - sin * dy + cx);
                let sy = snap(sin * dx + cos * dy + cy);
                row[x * 3..x * 3 + 3].copy_from_slice(&sample_bilinear(frame, sx, sy));
            }
        });

    out
}

/// Drop trigonometric noise so right angles land on whole pixels
fn snap(v: f64) -> f64 {
    let nearest = v.round();
    if (v - nearest).abs() < 1e-9 {
        nearest
    } else {
        v
    }
}

/// Bilinear sample treating everything outside the frame as black
fn sample_bilinear(frame: &Frame, x: f64, y: f64) -> [u8; 3] {
    let (width, height) = (frame.width() as i64, frame.height() as i64);
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = (x - x0) as f32;
    let fy = (y - y0) as f32;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let texel = |px: i64, py: i64| -> [f32; 3] {
        if px < 0 || py < 0 || px >= width || py >= height {
            return [0.0; 3];
        }
        let [r, g, b] = frame.get_pixel(px as u32, py as u32);
        [r as f32, g as f32, b as f32]
    };

    let (a, b, c, d) = (texel(x0, y0), texel(x0 + 1, y0), texel(x0, y0 + 1), texel(x0 + 1, y0 + 1));
    let mut result = [0u8; 3];
    for channel in 0..3 {
        let top = a[channel] * (1.0 - fx) + b[channel] * fx;
        let bottom = c[channel] * (1.0 - fx) + d[channel] * fx;
        result[channel] = clamp_channel(top * (1.0 - fy) + bottom * fy);
    }
    result
}

/// Sigma used for a Gaussian kernel of `size` taps when none is given
pub fn default_sigma(size: usize) -> f64 {
    0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Fixed binomial taps OpenCV uses for 3, 5 and 7 wide kernels
const SMALL_GAUSSIAN_TAPS: [&[f32]; 3] = [
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// Normalized 1-D Gaussian weights for a kernel of `2 * radius + 1` taps
///
/// Radii 1 to 3 use the fixed tables; larger ones are sampled from
/// [`default_sigma`].
pub fn gaussian_weights(radius: u32) -> Vec<f32> {
    if let Some(taps) = (radius as usize).checked_sub(1).and_then(|i| SMALL_GAUSSIAN_TAPS.get(i)) {
        return taps.to_vec();
    }

    let size = 2 * radius as usize + 1;
    let sigma = default_sigma(size);
    let center = radius as f64;

    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| (w / total) as f32).collect()
}

/// Separable Gaussian blur with reflect-101 borders
pub fn gaussian_blur(frame: &Frame, radius: u32) -> Frame {
    if radius == 0 {
        return frame.clone();
    }
    let weights = gaussian_weights(radius);
    let (width, height) = (frame.width() as usize, frame.height() as usize);
    let source = frame.as_rgb_bytes();
    let r = radius as i64;

    // Horizontal pass kept in f32 so the two passes round once
    let mut horizontal = vec![0f32; width * height * 3];
    horizontal
        .par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                for (k, weight) in weights.iter().enumerate() {
                    let sx = reflect_101(x as i64 + k as i64 - r, width);
                    let base = (y * width + sx) * 3;
                    for channel in 0..3 {
                        row[x * 3 + channel] += weight * source[base + channel] as f32;
                    }
                }
            }
        });

    let mut out = Frame::new_black(width as u32, height as u32);
    out.as_image_mut()
        .par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let mut acc = [0f32; 3];
                for (k, weight) in weights.iter().enumerate() {
                    let sy = reflect_101(y as i64 + k as i64 - r, height);
                    let base = (sy * width + x) * 3;
                    for channel in 0..3 {
                        acc[channel] += weight * horizontal[base + channel];
                    }
                }
                for channel in 0..3 {
                    row[x * 3 + channel] = clamp_channel(acc[channel]);
                }
            }
        });

    out
}

/// 3x3 convolution with reflect-101 borders
pub fn convolve3(frame: &Frame, kernel: &[[f32; 3]; 3]) -> Frame {
    let (width, height) = (frame.width() as usize, frame.height() as usize);
    let source = frame.as_rgb_bytes();

    let mut out = Frame::new_black(width as u32, height as u32);
    out.as_image_mut()
        .par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let mut acc = [0f32; 3];
                for (ky, kernel_row) in kernel.iter().enumerate() {
                    let sy = reflect_101(y as i64 + ky as i64 - 1, height);
                    for (kx, weight) in kernel_row.iter().enumerate() {
                        if *weight == 0.0 {
                            continue;
                        }
                        let sx = reflect_101(x as i64 + kx as i64 - 1, width);
                        let base = (sy * width + sx) * 3;
                        for channel in 0..3 {
                            acc[channel] += weight * source[base + channel] as f32;
                        }
                    }
                }
                for channel in 0..3 {
                    row[x * 3 + channel] = clamp_channel(acc[channel]);
                }
            }
        });

    out
}

/// Largest centered square
pub fn center_crop(frame: &Frame) -> Frame {
    let (width, height) = frame.dimensions();
    let side = width.min(height);
    let x = (width - side) / 2;
    let y = (height - side) / 2;
    Frame::new(image::imageops::crop_imm(frame.as_image(), x, y, side, side).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_101() {
        let mapped: Vec<usize> = (-3..8).map(|i| reflect_101(i, 5)).collect();
        assert_eq!(mapped, vec![3, 2, 1, 0, 1, 2, 3, 4, 3, 2, 1]);
        assert_eq!(reflect_101(-4, 1), 0);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(hsv_to_rgb([60, 255, 255]), [0, 255, 0]);
        assert_eq!(hsv_to_rgb([0, 0, 77]), [77, 77, 77]);
    }

    #[test]
    fn test_hue_wraps_and_saturation_clamps() {
        let mut frame = Frame::new_filled(1, 1, [0, 0, 255]);
        // blue (120) + 90 wraps to 30, which is 60 degrees: yellow
        shift_hue_saturation(&mut frame, 90, 0);
        assert_eq!(frame.get_pixel(0, 0), [255, 255, 0]);

        let mut frame = Frame::new_filled(1, 1, [200, 100, 100]);
        shift_hue_saturation(&mut frame, 0, -255);
        let [r, g, b] = frame.get_pixel(0, 0);
        assert_eq!((r, g, b), (200, 200, 200));
    }

    #[test]
    fn test_gaussian_weights() {
        assert_eq!(gaussian_weights(1), vec![0.25, 0.5, 0.25]);
        assert_eq!(gaussian_weights(2), vec![0.0625, 0.25, 0.375, 0.25, 0.0625]);
        assert_eq!(gaussian_weights(3).len(), 7);
        assert_eq!(gaussian_weights(3)[3], 0.28125);

        let weights = gaussian_weights(5);
        assert_eq!(weights.len(), 11);
        assert!((weights.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(weights[5] > weights[4]);
        assert!((default_sigma(3) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_small_blur_matches_binomial_taps() {
        let mut frame = Frame::new_filled(5, 1, [0, 0, 0]);
        frame.set_pixel(2, 0, [200, 200, 200]);
        let blurred = gaussian_blur(&frame, 1);
        assert_eq!(blurred.get_pixel(1, 0), [50, 50, 50]);
        assert_eq!(blurred.get_pixel(2, 0), [100, 100, 100]);
        assert_eq!(blurred.get_pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_blur_and_sharpen_keep_flat_images() {
        let flat = Frame::new_filled(5, 4, [90, 120, 150]);
        assert_eq!(gaussian_blur(&flat, 3), flat);
        assert_eq!(convolve3(&flat, &SHARPEN_KERNEL), flat);
    }

    #[test]
    fn test_sharpen_boosts_a_peak() {
        let mut frame = Frame::new_filled(3, 3, [100, 100, 100]);
        frame.set_pixel(1, 1, [120, 120, 120]);
        let sharpened = convolve3(&frame, &SHARPEN_KERNEL);
        assert_eq!(sharpened.get_pixel(1, 1), [200, 200, 200]);
        assert_eq!(sharpened.get_pixel(1, 0), [60, 60, 60]);
    }

    #[test]
    fn test_rotate_180_about_center() {
        let mut frame = Frame::new_black(4, 4);
        frame.set_pixel(1, 1, [255, 0, 0]);
        let rotated = rotate_about_center(&frame, 180.0);
        // center is (2, 2): (1, 1) lands on (3, 3)
        assert_eq!(rotated.get_pixel(3, 3), [255, 0, 0]);
        assert_eq!(rotated.get_pixel(1, 1), [0, 0, 0]);
    }

    #[test]
    fn test_center_crop() {
        let mut frame = Frame::new_black(6, 2);
        frame.set_pixel(2, 0, [1, 2, 3]);
        let cropped = center_crop(&frame);
        assert_eq!(cropped.dimensions(), (2, 2));
        assert_eq!(cropped.get_pixel(0, 0), [1, 2, 3]);
    }
}
