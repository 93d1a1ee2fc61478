//! Perceptual colour distance between two RGBA pixels.
//!
//! Pixels are blended onto a white background, converted to YIQ and compared
//! with a weighted squared distance. Luma dominates the weighting, which keeps
//! sensor noise in the chroma channels from registering as change.

/// Largest possible YIQ distance (black vs. white).
pub const MAX_YIQ_DELTA: f64 = 35215.0;

/// Squared-distance cutoff for a tolerance in `[0, 1]`.
pub fn max_delta(tolerance: f64) -> f64 {
    MAX_YIQ_DELTA * tolerance * tolerance
}

/// Weighted squared YIQ distance between two RGBA pixels.
pub fn color_delta(a: [u8; 4], b: [u8; 4]) -> f64 {
    if a == b {
        return 0.0;
    }

    let (r1, g1, b1) = blend(a);
    let (r2, g2, b2) = blend(b);

    let y = rgb2y(r1, g1, b1) - rgb2y(r2, g2, b2);
    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);

    0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q
}

fn blend(px: [u8; 4]) -> (f64, f64, f64) {
    let [r, g, b, a] = px.map(f64::from);
    if a >= 255.0 {
        return (r, g, b);
    }
    let alpha = a / 255.0;
    (
        255.0 + (r - 255.0) * alpha,
        255.0 + (g - 255.0) * alpha,
        255.0 + (b - 255.0) * alpha,
    )
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.29889531 + g * 0.58662247 + b * 0.11448223
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.59597799 - g * 0.2741761 - b * 0.32180189
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.21147017 - g * 0.52261711 + b * 0.31114694
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [u8; 4] = [0, 0, 0, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    #[test]
    fn identical_pixels_have_no_distance() {
        assert_eq!(color_delta([12, 34, 56, 255], [12, 34, 56, 255]), 0.0);
    }

    #[test]
    fn black_white_is_pure_luma() {
        let delta = color_delta(BLACK, WHITE);
        assert!((delta - 0.5053 * 255.0 * 255.0).abs() < 1.0, "delta = {delta}");
        assert!(delta > max_delta(0.9));
    }

    #[test]
    fn distance_is_symmetric() {
        let a = [200, 10, 90, 255];
        let b = [15, 180, 60, 255];
        assert_eq!(color_delta(a, b), color_delta(b, a));
    }

    #[test]
    fn transparent_pixel_blends_to_white() {
        assert!(color_delta([0, 0, 0, 0], WHITE) < 1e-9);
    }

    #[test]
    fn small_noise_below_default_tolerance() {
        let cutoff = max_delta(0.1);
        assert!(color_delta([100, 100, 100, 255], [104, 103, 101, 255]) < cutoff);
        assert!(color_delta([100, 100, 100, 255], [160, 160, 160, 255]) > cutoff);
    }
}
