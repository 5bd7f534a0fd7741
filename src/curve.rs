//! Curve and force math. All functions are pure apart from the random
//! draws they are handed an RNG for.

use crate::config::{CENTER_X, CENTER_Y};
use rand::Rng;
use std::f64::consts::PI;

/// Parametric heart outline: maps an angle to a surface pixel, scaled
/// about the surface center and floored to integers.
pub(crate) fn heart_point(t: f64, scale: f64) -> (i32, i32) {
    let x = 16.0 * t.sin().powi(3);
    let y = -(13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos());
    (
        (x * scale + CENTER_X).floor() as i32,
        (y * scale + CENTER_Y).floor() as i32,
    )
}

/// Pull a point toward the center by an exponentially distributed random
/// fraction, independently per axis.
pub(crate) fn scatter_inside(rng: &mut impl Rng, x: i32, y: i32, beta: f64) -> (i32, i32) {
    let rx = -beta * rng.gen::<f64>().ln();
    let ry = -beta * rng.gen::<f64>().ln();
    let dx = rx * (x as f64 - CENTER_X);
    let dy = ry * (y as f64 - CENTER_Y);
    ((x as f64 - dx).floor() as i32, (y as f64 - dy).floor() as i32)
}

/// Radial force used for halo points. The force term is negative, so a
/// positive ratio displaces the point outward along the center ray.
pub(crate) fn shrink(x: f64, y: f64, ratio: f64) -> (f64, f64) {
    let dx = x - CENTER_X;
    let dy = y - CENTER_Y;
    let force = -1.0 / (dx * dx + dy * dy).powf(0.6);
    (x - ratio * force * dx, y - ratio * force * dy)
}

/// Breathing displacement: a slightly weaker inverse-power pull toward the
/// center plus one pixel of uniform jitter per axis. A point sitting exactly
/// on the center yields a non-finite result; callers drop that drawable.
pub(crate) fn calc_position(rng: &mut impl Rng, x: f64, y: f64, ratio: f64) -> (f64, f64) {
    let dx = x - CENTER_X;
    let dy = y - CENTER_Y;
    let force = 1.0 / (dx * dx + dy * dy).powf(0.52);
    let ox = ratio * force * dx + rng.gen_range(-1i32..=1) as f64;
    let oy = ratio * force * dy + rng.gen_range(-1i32..=1) as f64;
    (x - ox, y - oy)
}

/// Periodic driver signal for the breathing amplitude and halo envelope.
pub(crate) fn curve(p: f64) -> f64 {
    (4.0 / PI) * (4.0 * p).sin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HALO_ENLARGE, IMAGE_ENLARGE};
    use rand::{rngs::StdRng, SeedableRng};
    use std::f64::consts::TAU;

    #[test]
    fn heart_point_at_angle_zero() {
        let (x, y) = heart_point(0.0, 11.0);
        assert_eq!(x, CENTER_X as i32);
        assert_eq!(y, CENTER_Y as i32 - 55);
    }

    #[test]
    fn driver_signal_known_values() {
        assert!(curve(0.0).abs() < 1e-12);
        assert!((curve(PI / 8.0) - 4.0 / PI).abs() < 1e-12);
    }

    #[test]
    fn scatter_never_moves_outward_for_small_beta() {
        let mut rng = StdRng::seed_from_u64(0xBEA7);
        for i in 0..500 {
            let t = i as f64 / 500.0 * TAU;
            let (x, y) = heart_point(t, IMAGE_ENLARGE);
            let (sx, sy) = scatter_inside(&mut rng, x, y, 0.05);
            assert!((sx as f64 - CENTER_X).abs() <= (x as f64 - CENTER_X).abs());
            assert!((sy as f64 - CENTER_Y).abs() <= (y as f64 - CENTER_Y).abs());
        }
    }

    #[test]
    fn scatter_contracts_on_average() {
        let mut rng = StdRng::seed_from_u64(7);
        let (x, y) = heart_point(1.0, IMAGE_ENLARGE);
        let base = ((x as f64 - CENTER_X).powi(2) + (y as f64 - CENTER_Y).powi(2)).sqrt();
        let mut acc = 0.0;
        for _ in 0..2000 {
            let (sx, sy) = scatter_inside(&mut rng, x, y, 0.17);
            acc += ((sx as f64 - CENTER_X).powi(2) + (sy as f64 - CENTER_Y).powi(2)).sqrt();
        }
        assert!(acc / 2000.0 < base);
    }

    #[test]
    fn shrink_displaces_radially_outward() {
        let (x, y) = heart_point(2.0, HALO_ENLARGE);
        let (sx, sy) = shrink(x as f64, y as f64, 10.0);
        assert!(sx.is_finite() && sy.is_finite());
        assert!((sx - x as f64) * (x as f64 - CENTER_X) >= 0.0);
        assert!((sy - y as f64) * (y as f64 - CENTER_Y) >= 0.0);
    }

    #[test]
    fn breathing_displacement_is_bounded() {
        // |delta| <= |ratio| * d^-0.04 + 1 <= |ratio| + 1 for d >= 1.
        let mut rng = StdRng::seed_from_u64(42);
        let ratio = 10.0 * curve(0.3);
        for i in 0..200 {
            let t = i as f64 / 200.0 * TAU;
            let (x, y) = heart_point(t, IMAGE_ENLARGE);
            let (nx, ny) = calc_position(&mut rng, x as f64, y as f64, ratio);
            assert!(nx.is_finite() && ny.is_finite());
            assert!((nx - x as f64).abs() <= ratio.abs() + 1.0);
            assert!((ny - y as f64).abs() <= ratio.abs() + 1.0);
        }
    }
}
