//! Point-set builder and per-frame generator. Everything here is computed
//! once at startup; playback only reads the cached frame records.

use crate::config::{Args, HALO_ENLARGE, IMAGE_ENLARGE};
use crate::curve::{calc_position, curve, heart_point, scatter_inside, shrink};
use rand::Rng;
use std::collections::HashSet;
use std::f64::consts::{PI, TAU};
use std::ops::RangeInclusive;

// Diffusion tuning
const EDGE_SCATTERS: usize = 3;
const EDGE_BETA: f64 = 0.05;
const CENTER_SAMPLES: usize = 4000;
const CENTER_BETA: f64 = 0.17;

// Halo tuning
const HALO_BASE: f64 = 3000.0;
const HALO_SWELL: f64 = 4000.0;
const HALO_JITTER: i32 = 14;
const HALO_SIZES: [i32; 3] = [1, 2, 2];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Point {
    pub(crate) x: i32,
    pub(crate) y: i32,
}

/// One filled square on the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Drawable {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) size: i32,
}

/// Dedup set that remembers insertion order, so a fixed seed replays the
/// same frames run after run.
#[derive(Default)]
struct PointSet {
    seen: HashSet<Point>,
    items: Vec<Point>,
}

impl PointSet {
    fn insert(&mut self, p: Point) -> bool {
        if self.seen.insert(p) {
            self.items.push(p);
            true
        } else {
            false
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn iter(&self) -> impl Iterator<Item = &Point> {
        self.items.iter()
    }

    fn as_slice(&self) -> &[Point] {
        &self.items
    }
}

pub(crate) struct Heart {
    points: PointSet,
    edge_diffusion: PointSet,
    center_diffusion: PointSet,
    frames: Vec<Vec<Drawable>>,
    generate_frame: usize,
}

impl Heart {
    /// Builds the three point sets, then eagerly computes every frame record.
    pub(crate) fn new(args: &Args, rng: &mut impl Rng) -> Self {
        let mut heart = Self {
            points: PointSet::default(),
            edge_diffusion: PointSet::default(),
            center_diffusion: PointSet::default(),
            frames: Vec::with_capacity(args.frames),
            generate_frame: args.frames,
        };
        heart.build(args.points, rng);
        for frame in 0..args.frames {
            let record = heart.calc_frame(frame, rng);
            heart.frames.push(record);
        }
        heart
    }

    fn build(&mut self, count: usize, rng: &mut impl Rng) {
        for _ in 0..count {
            let t = rng.gen_range(0.0..TAU);
            let (x, y) = heart_point(t, IMAGE_ENLARGE);
            self.points.insert(Point { x, y });
        }

        // Soft edge: a few inward scatters per unique outline point.
        for i in 0..self.points.len() {
            let p = self.points.as_slice()[i];
            for _ in 0..EDGE_SCATTERS {
                let (x, y) = scatter_inside(rng, p.x, p.y, EDGE_BETA);
                self.edge_diffusion.insert(Point { x, y });
            }
        }

        // Interior fill: resample the unique outline points with replacement
        // and scatter harder.
        for _ in 0..CENTER_SAMPLES {
            let p = self.points.as_slice()[rng.gen_range(0..self.points.len())];
            let (x, y) = scatter_inside(rng, p.x, p.y, CENTER_BETA);
            self.center_diffusion.insert(Point { x, y });
        }
    }

    /// Per-frame envelope derived from the driver signal: breathing ratio,
    /// halo radius, halo sample count.
    pub(crate) fn halo_params(frame: usize) -> (f64, i32, usize) {
        let c = curve(frame as f64 / 10.0 * PI);
        let ratio = 10.0 * c;
        let halo_radius = (4.0 + 6.0 * (1.0 + c)).floor() as i32;
        let halo_number = (HALO_BASE + HALO_SWELL * (c * c).abs()).floor() as usize;
        (ratio, halo_radius, halo_number)
    }

    fn calc_frame(&self, frame: usize, rng: &mut impl Rng) -> Vec<Drawable> {
        let (ratio, halo_radius, halo_number) = Self::halo_params(frame);

        let fixed = self.points.len() + self.edge_diffusion.len() + self.center_diffusion.len();
        let mut all = Vec::with_capacity(halo_number + fixed);

        // Halo: freshly scattered every frame, deduped within the frame
        // before jitter is applied.
        let mut halo_seen: HashSet<Point> = HashSet::with_capacity(halo_number);
        for _ in 0..halo_number {
            let t = rng.gen_range(0.0..TAU);
            let (hx, hy) = heart_point(t, HALO_ENLARGE);
            let (sx, sy) = shrink(hx as f64, hy as f64, halo_radius as f64);
            if !sx.is_finite() || !sy.is_finite() {
                continue;
            }
            let p = Point {
                x: sx.floor() as i32,
                y: sy.floor() as i32,
            };
            if !halo_seen.insert(p) {
                continue;
            }
            all.push(Drawable {
                x: p.x + rng.gen_range(-HALO_JITTER..=HALO_JITTER),
                y: p.y + rng.gen_range(-HALO_JITTER..=HALO_JITTER),
                size: HALO_SIZES[rng.gen_range(0..HALO_SIZES.len())],
            });
        }

        // Breathing pass over the three point sets, in build order.
        for p in self.points.iter() {
            push_breathed(&mut all, rng, *p, ratio, 1..=3);
        }
        for p in self.edge_diffusion.iter() {
            push_breathed(&mut all, rng, *p, ratio, 1..=2);
        }
        for p in self.center_diffusion.iter() {
            push_breathed(&mut all, rng, *p, ratio, 1..=2);
        }

        all
    }

    /// Frame record for a monotonically increasing display-frame counter.
    pub(crate) fn frame(&self, display_frame: u64) -> &[Drawable] {
        &self.frames[(display_frame % self.generate_frame as u64) as usize]
    }

    pub(crate) fn generate_frame(&self) -> usize {
        self.generate_frame
    }

    pub(crate) fn counts(&self) -> (usize, usize, usize) {
        (
            self.points.len(),
            self.edge_diffusion.len(),
            self.center_diffusion.len(),
        )
    }
}

fn push_breathed(
    all: &mut Vec<Drawable>,
    rng: &mut impl Rng,
    p: Point,
    ratio: f64,
    sizes: RangeInclusive<i32>,
) {
    let (nx, ny) = calc_position(rng, p.x as f64, p.y as f64, ratio);
    if !nx.is_finite() || !ny.is_finite() {
        // Exactly on the center the force term blows up; skip the square
        // for this frame rather than paint it at a bogus position.
        return;
    }
    all.push(Drawable {
        x: nx.floor() as i32,
        y: ny.floor() as i32,
        size: rng.gen_range(sizes),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CENTER_X, CENTER_Y};
    use rand::{rngs::StdRng, SeedableRng};

    fn small_args() -> Args {
        Args {
            frames: 6,
            delay_ms: 160,
            points: 300,
            seed: 11,
        }
    }

    #[test]
    fn core_points_stay_inside_curve_envelope() {
        let mut rng = StdRng::seed_from_u64(11);
        let heart = Heart::new(&small_args(), &mut rng);
        let (core, _, _) = heart.counts();
        assert!(core > 0 && core <= 300);
        // |x| <= 16, |y| <= 13 + 5 + 2 + 1, plus flooring slack.
        for p in heart.points.iter() {
            assert!((p.x as f64 - CENTER_X).abs() <= 16.0 * IMAGE_ENLARGE + 1.0);
            assert!((p.y as f64 - CENTER_Y).abs() <= 21.0 * IMAGE_ENLARGE + 1.0);
        }
    }

    #[test]
    fn frame_record_length_matches_set_sizes() {
        let mut rng = StdRng::seed_from_u64(3);
        let heart = Heart::new(&small_args(), &mut rng);
        let fixed =
            heart.points.len() + heart.edge_diffusion.len() + heart.center_diffusion.len();
        for frame in 0..heart.generate_frame() {
            let (_, _, halo_number) = Heart::halo_params(frame);
            let len = heart.frames[frame].len();
            assert!(len > fixed, "halo contributed nothing on frame {frame}");
            assert!(len <= fixed + halo_number);
        }
    }

    #[test]
    fn halo_envelope_is_sane() {
        for frame in 0..40 {
            let (ratio, radius, number) = Heart::halo_params(frame);
            assert!(ratio.abs() <= 10.0 * 4.0 / PI + 1e-9);
            assert!(radius >= 2 && radius <= 18);
            assert!((3000..=9500).contains(&number));
        }
    }

    #[test]
    fn playback_is_periodic() {
        let mut rng = StdRng::seed_from_u64(5);
        let heart = Heart::new(&small_args(), &mut rng);
        let gf = heart.generate_frame() as u64;
        for k in 0..2 * gf {
            assert_eq!(heart.frame(k).as_ptr(), heart.frame(k + gf).as_ptr());
        }
    }

    #[test]
    fn same_seed_replays_identical_frames() {
        let a = Heart::new(&small_args(), &mut StdRng::seed_from_u64(9));
        let b = Heart::new(&small_args(), &mut StdRng::seed_from_u64(9));
        assert_eq!(a.frames, b.frames);
    }
}
