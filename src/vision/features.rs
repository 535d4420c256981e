//! Keypoints, BRIEF descriptors and a scale + translation fit.
//!
//! Corners come from FAST-9 and are described with imageproc's BRIEF. Two
//! feature sets are only comparable when they share test pairs, so a scene
//! is always described with the pairs of the template it is matched against.

use image::GrayImage;
use imageproc::binary_descriptors::BinaryDescriptor;
use imageproc::binary_descriptors::brief::{BriefDescriptor, TestPair, brief};
use imageproc::corners::{Corner, corners_fast9};
use imageproc::point::Point;
use imageproc::suppress::local_maxima;
use log::warn;
use std::fmt;

const FAST_THRESHOLD: u8 = 20;
const SUPPRESSION_RADIUS: u32 = 3;
const MAX_KEYPOINTS: usize = 500;

/// BRIEF samples a 31x31 patch, which must lie inside the image.
const PATCH_MARGIN: u32 = 16;
const DESCRIPTOR_BITS: usize = 256;

/// Pairs closer than this in the template say little about scale.
const MIN_SCALE_BASELINE: f32 = 5.0;
const INLIER_TOLERANCE: f32 = 4.0;
const MIN_INLIERS: usize = 3;

/// Described keypoints and the test pairs that produced them.
#[derive(Clone, Default)]
pub struct FeatureSet {
    pub descriptors: Vec<BriefDescriptor>,
    pub test_pairs: Vec<TestPair>,
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureSet")
            .field("keypoints", &self.descriptors.len())
            .field("test_pairs", &self.test_pairs.len())
            .finish()
    }
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn position(&self, index: usize) -> (f32, f32) {
        let corner = self.descriptors[index].corner;
        (corner.x as f32, corner.y as f32)
    }
}

/// Detects FAST corners and describes them with 256-bit BRIEF.
///
/// `test_pairs` of `None` draws a fresh set. Pass another set's pairs to
/// get descriptors that can be matched against it.
pub fn detect_features(image: &GrayImage, test_pairs: Option<&Vec<TestPair>>) -> FeatureSet {
    if image.width() <= 2 * PATCH_MARGIN || image.height() <= 2 * PATCH_MARGIN {
        return FeatureSet::default();
    }

    let keypoints: Vec<Point<u32>> = strongest_corners(image)
        .into_iter()
        .map(Point::from)
        .collect();
    match brief(image, &keypoints, DESCRIPTOR_BITS, test_pairs) {
        Ok((descriptors, test_pairs)) => FeatureSet {
            descriptors,
            test_pairs,
        },
        Err(e) => {
            warn!("Cannot describe {} keypoints: {}", keypoints.len(), e);
            FeatureSet::default()
        }
    }
}

/// Locally strongest corners away from the border, best first, capped at
/// `MAX_KEYPOINTS`.
fn strongest_corners(image: &GrayImage) -> Vec<Corner> {
    let (width, height) = image.dimensions();
    let inside: Vec<Corner> = corners_fast9(image, FAST_THRESHOLD)
        .into_iter()
        .filter(|c| {
            c.x >= PATCH_MARGIN
                && c.y >= PATCH_MARGIN
                && c.x < width - PATCH_MARGIN
                && c.y < height - PATCH_MARGIN
        })
        .collect();

    let mut corners = local_maxima(&inside, SUPPRESSION_RADIUS);
    corners.sort_by(|a, b| b.score.total_cmp(&a.score));
    corners.truncate(MAX_KEYPOINTS);
    corners
}

/// A match between a query keypoint and a train keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureMatch {
    pub query: usize,
    pub train: usize,
    pub distance: u32,
}

/// Brute-force two-nearest-neighbour matching with a ratio test.
///
/// A query keypoint is matched only when its nearest train descriptor is
/// closer than `ratio` times the second nearest.
pub fn match_features(query: &FeatureSet, train: &FeatureSet, ratio: f32) -> Vec<FeatureMatch> {
    if train.descriptors.len() < 2 {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for (query_idx, descriptor) in query.descriptors.iter().enumerate() {
        let mut best: Option<(usize, u32)> = None;
        let mut second = u32::MAX;

        for (train_idx, candidate) in train.descriptors.iter().enumerate() {
            let distance = descriptor.hamming_distance(candidate);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {
                    second = second.min(distance);
                }
                Some((_, best_distance)) => {
                    second = best_distance;
                    best = Some((train_idx, distance));
                }
                None => best = Some((train_idx, distance)),
            }
        }

        if let Some((train_idx, distance)) = best
            && (distance as f32) < ratio * second as f32
        {
            matches.push(FeatureMatch {
                query: query_idx,
                train: train_idx,
                distance,
            });
        }
    }
    matches
}

/// Uniform scale followed by translation: `p' = scale * p + (tx, ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub scale: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.scale * x + self.tx, self.scale * y + self.ty)
    }
}

/// Estimates the similarity mapping `from` points onto `to` points.
///
/// Scale is the median ratio of pairwise distances and translation the
/// median residual, which shrugs off stray matches. The estimate is then
/// refined by least squares over the points it explains. Returns `None`
/// when the correspondences are degenerate.
pub fn fit_similarity(from: &[(f32, f32)], to: &[(f32, f32)]) -> Option<Similarity> {
    if from.len() != to.len() || from.len() < MIN_INLIERS {
        return None;
    }

    let mut ratios = Vec::new();
    for i in 0..from.len() {
        for j in i + 1..from.len() {
            let baseline = distance(from[i], from[j]);
            if baseline >= MIN_SCALE_BASELINE {
                ratios.push(distance(to[i], to[j]) / baseline);
            }
        }
    }
    let scale = median(&mut ratios)?;
    if !(scale.is_finite() && scale > 0.0) {
        return None;
    }

    let mut xs: Vec<f32> = from.iter().zip(to).map(|(p, q)| q.0 - scale * p.0).collect();
    let mut ys: Vec<f32> = from.iter().zip(to).map(|(p, q)| q.1 - scale * p.1).collect();
    let rough = Similarity {
        scale,
        tx: median(&mut xs)?,
        ty: median(&mut ys)?,
    };

    let inliers: Vec<((f32, f32), (f32, f32))> = from
        .iter()
        .zip(to)
        .filter(|(p, q)| distance(rough.apply(p.0, p.1), **q) <= INLIER_TOLERANCE)
        .map(|(p, q)| (*p, *q))
        .collect();
    if inliers.len() < MIN_INLIERS {
        return None;
    }

    refine(&inliers)
}

fn refine(pairs: &[((f32, f32), (f32, f32))]) -> Option<Similarity> {
    let n = pairs.len() as f32;
    let (mut px, mut py, mut qx, mut qy) = (0.0, 0.0, 0.0, 0.0);
    for ((ax, ay), (bx, by)) in pairs {
        px += ax;
        py += ay;
        qx += bx;
        qy += by;
    }
    let (px, py, qx, qy) = (px / n, py / n, qx / n, qy / n);

    let mut covariance = 0.0;
    let mut spread = 0.0;
    for ((ax, ay), (bx, by)) in pairs {
        let (dx, dy) = (ax - px, ay - py);
        covariance += dx * (bx - qx) + dy * (by - qy);
        spread += dx * dx + dy * dy;
    }
    if spread <= f32::EPSILON {
        return None;
    }

    let scale = covariance / spread;
    if !(scale.is_finite() && scale > 0.0) {
        return None;
    }
    Some(Similarity {
        scale,
        tx: qx - scale * px,
        ty: qy - scale * py,
    })
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(values[values.len() / 2])
}
