//! Background intensity estimation.
//!
//! The background of a scan is taken to be the most frequent intensity in
//! the slabs along its six faces. Resampling fills voxels that fall outside
//! the input with this value.

use std::collections::BTreeMap;
use std::ops::Range;

use rayon::prelude::*;

use crate::error::Result;
use crate::image::{with_voxels, Scalar, Volume};

/// Thickness in voxels of the slab sampled on each face.
pub const BORDER_WIDTH: usize = 5;

/// Outcome of a background scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundGuess<T> {
    /// Most frequent border value, zero if nothing was sampled.
    pub level: T,
    /// Occurrences of `level` in the border slabs.
    pub level_count: u64,
    /// Second most frequent value and its count.
    pub runner_up: Option<(T, u64)>,
    /// Voxels sampled; edges and corners are counted once per slab.
    pub voxels_counted: u64,
}

impl<T> BackgroundGuess<T> {
    /// Share of sampled voxels holding `level`, in percent.
    pub fn level_percent(&self) -> f64 {
        percent(self.level_count, self.voxels_counted)
    }

    /// Share of sampled voxels holding the runner-up, in percent.
    pub fn runner_up_percent(&self) -> Option<f64> {
        self.runner_up
            .as_ref()
            .map(|(_, count)| percent(*count, self.voxels_counted))
    }
}

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

type Histogram<K> = BTreeMap<K, u64>;

/// The six border slabs as per-axis ranges `[x, y, z]`.
fn border_slabs(dims: [usize; 3]) -> Vec<[Range<usize>; 3]> {
    let mut slabs = Vec::with_capacity(6);
    for axis in 0..3 {
        let n = dims[axis];
        let width = BORDER_WIDTH.min(n);
        for slab in [0..width, n - width..n] {
            let mut ranges = [0..dims[0], 0..dims[1], 0..dims[2]];
            ranges[axis] = slab;
            slabs.push(ranges);
        }
    }
    slabs
}

fn slab_histogram<T: Scalar>(values: &[T], dims: [usize; 3], slab: &[Range<usize>; 3]) -> Histogram<T::Key> {
    let [nx, ny, _] = dims;
    let mut histogram = Histogram::new();
    for z in slab[2].clone() {
        for y in slab[1].clone() {
            let row = nx * (y + ny * z);
            for x in slab[0].clone() {
                *histogram.entry(values[row + x].key()).or_insert(0) += 1;
            }
        }
    }
    histogram
}

fn merge<K: Ord>(mut into: Histogram<K>, from: Histogram<K>) -> Histogram<K> {
    for (key, count) in from {
        *into.entry(key).or_insert(0) += count;
    }
    into
}

/// Highest count, lowest value on ties, skipping `exclude`.
fn most_frequent<K: Ord + Copy>(histogram: &Histogram<K>, exclude: Option<K>) -> Option<(K, u64)> {
    let mut best: Option<(K, u64)> = None;
    for (&key, &count) in histogram {
        if Some(key) == exclude {
            continue;
        }
        // ascending key order: only a strictly larger count replaces
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((key, count));
        }
    }
    best
}

/// Most frequent value in the six border slabs of a voxel buffer.
///
/// `values` is laid out x fastest over `dims`. Slabs are clamped to the
/// volume for volumes thinner than [`BORDER_WIDTH`]. When two values are
/// equally frequent the numerically lowest one wins.
pub fn guess_background_level<T: Scalar>(values: &[T], dims: [usize; 3]) -> BackgroundGuess<T> {
    let histogram = border_slabs(dims)
        .par_iter()
        .map(|slab| slab_histogram(values, dims, slab))
        .reduce(Histogram::new, merge);

    let voxels_counted: u64 = histogram.values().sum();

    let Some((first, first_count)) = most_frequent(&histogram, None) else {
        return BackgroundGuess {
            level: T::from_f64(0.0),
            level_count: 0,
            runner_up: None,
            voxels_counted,
        };
    };
    let runner_up = most_frequent(&histogram, Some(first)).map(|(k, c)| (T::from_key(k), c));

    let guess = BackgroundGuess {
        level: T::from_key(first),
        level_count: first_count,
        runner_up,
        voxels_counted,
    };

    if let Some((second, _)) = guess.runner_up {
        tracing::info!(
            first = guess.level.to_f64(),
            first_percent = guess.level_percent(),
            second = second.to_f64(),
            second_percent = guess.runner_up_percent().unwrap_or_default(),
            voxels = voxels_counted,
            "background level guess"
        );
    }

    guess
}

/// Background level of a volume, widened to `f64`.
pub fn estimate_background(volume: &Volume) -> Result<f64> {
    let data = volume.require_data()?;
    let dims = volume.dimensions();
    Ok(with_voxels!(data, v => guess_background_level(v.as_slice(), dims).level.to_f64()))
}
