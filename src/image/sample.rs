//! Sub-pixel intensity and gradient probes.
//!
//! Both helpers replicate the border, so any finite coordinate is safe to
//! query; callers gate on [`ImageView::contains`] to decide whether a
//! position still counts as inside the frame.

use crate::image::ImageU8;

/// Bilinear intensity at a sub-pixel position, replicate border.
#[inline]
pub fn bilinear_sample(img: &ImageU8<'_>, x: f32, y: f32) -> f32 {
    let xf = x.floor();
    let yf = y.floor();
    let x0 = xf as isize;
    let y0 = yf as isize;
    let tx = x - xf;
    let ty = y - yf;

    let p00 = img.get_clamped(x0, y0) as f32;
    let p10 = img.get_clamped(x0 + 1, y0) as f32;
    let p01 = img.get_clamped(x0, y0 + 1) as f32;
    let p11 = img.get_clamped(x0 + 1, y0 + 1) as f32;

    let top = p00 * (1.0 - tx) + p10 * tx;
    let bot = p01 * (1.0 - tx) + p11 * tx;
    top * (1.0 - ty) + bot * ty
}

/// Local intensity gradient from central differences of bilinear samples
/// half a pixel apart. Returns `None` for non-finite coordinates.
#[inline]
pub fn gradient_at(img: &ImageU8<'_>, x: f32, y: f32) -> Option<(f32, f32)> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let gx = bilinear_sample(img, x + 0.5, y) - bilinear_sample(img, x - 0.5, y);
    let gy = bilinear_sample(img, x, y + 0.5) - bilinear_sample(img, x, y - 0.5);
    Some((gx, gy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image<'a>(w: usize, h: usize, data: &'a [u8]) -> ImageU8<'a> {
        ImageU8 {
            w,
            h,
            stride: w,
            data,
        }
    }

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let data = [0u8, 100, 0, 100];
        let img = image(2, 2, &data);
        assert!((bilinear_sample(&img, 0.5, 0.0) - 50.0).abs() < 1e-4);
        assert!((bilinear_sample(&img, 0.5, 1.0) - 50.0).abs() < 1e-4);
        assert!((bilinear_sample(&img, 0.0, 0.5) - 0.0).abs() < 1e-4);
    }

    #[test]
    fn border_is_replicated() {
        let data = [10u8, 20, 30, 40];
        let img = image(2, 2, &data);
        assert!((bilinear_sample(&img, -5.0, -5.0) - 10.0).abs() < 1e-4);
        assert!((bilinear_sample(&img, 10.0, 10.0) - 40.0).abs() < 1e-4);
    }

    #[test]
    fn gradient_across_vertical_step() {
        // columns 0..2 dark, 3..5 bright
        let mut data = vec![0u8; 6 * 3];
        for y in 0..3 {
            for x in 3..6 {
                data[y * 6 + x] = 200;
            }
        }
        let img = image(6, 3, &data);
        let (gx, gy) = gradient_at(&img, 2.5, 1.0).unwrap();
        assert!(gx > 100.0);
        assert!(gy.abs() < 1e-4);
    }
}
