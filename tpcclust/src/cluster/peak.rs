use itertools::iproduct;
use tpccore::geometry::row::RowGeometry;

use crate::cluster::matrix::ChargeMatrix;
use crate::cluster::params::{ClustererParams, Pass};

/// A local maximum of the original charge that still holds residual charge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub pad: usize,
    pub time: usize,
    pub charge: f32,
}

// neighbours visited before / after the centre in pad-major scan order
const EARLIER: [(isize, isize); 4] = [(-1, -1), (-1, 0), (-1, 1), (0, -1)];
const LATER: [(isize, isize); 4] = [(0, 1), (1, -1), (1, 0), (1, 1)];

/// Local-maximum search over the live region of a row.
///
/// The neighbourhood test runs on the original samples, the charge threshold
/// on the residual. A tail left behind by an earlier cluster therefore never
/// turns into a peak of its own, and a cleared peak is not found again.
///
/// Ties between equal neighbours go to the cell found first in scan order
/// (pad-major, time-minor): a candidate must be strictly above the neighbours
/// scanned before it and at least equal to the ones scanned after it.
///
/// Every real cell of the live region is scanned, including the first and
/// last pad and time bin. The zero padding of the [`ChargeMatrix`] is the
/// guard band: all neighbour and window reads of a boundary cell land in it.
#[derive(Clone, Debug)]
pub struct PeakDetector {
    min_charge: f32,
    pad_lo: usize,
    pad_hi: usize,
    time_lo: usize,
    time_hi: usize,
    min_up_down: f32,
    min_left_right: f32,
    reject_isolated: bool,
}

impl PeakDetector {
    pub fn new(geometry: &RowGeometry, params: &ClustererParams, pass: Pass) -> Self {
        let (pad_lo, pad_hi) = geometry.live_pad_range();
        PeakDetector {
            min_charge: params.min_peak_charge(pass),
            pad_lo: pad_lo as usize,
            pad_hi: pad_hi as usize + 1,
            time_lo: geometry.first_live_time_bin(params.ctg_range) as usize,
            time_hi: geometry.time_count as usize,
            min_up_down: params.min_up_down_charge,
            min_left_right: params.min_left_right_charge,
            reject_isolated: params.reject_isolated,
        }
    }

    /// Cells visited by the scan, in scan order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        iproduct!(self.pad_lo..self.pad_hi, self.time_lo..self.time_hi)
    }

    /// Tests one cell: original charge for the shape, residual for the threshold.
    pub fn peak_at(&self, matrix: &ChargeMatrix, pad: usize, time: usize) -> Option<Peak> {
        if pad >= matrix.pads() || time >= matrix.times() {
            return None;
        }
        let (p, t) = (pad as isize, time as isize);
        let q = matrix.residual(p, t);
        if q < self.min_charge {
            return None;
        }
        let centre = matrix.original(p, t);
        if EARLIER.iter().any(|&(dp, dt)| matrix.original(p + dp, t + dt) >= centre) {
            return None;
        }
        if LATER.iter().any(|&(dp, dt)| matrix.original(p + dp, t + dt) > centre) {
            return None;
        }

        let up_down = matrix.residual(p, t - 1) + matrix.residual(p, t + 1);
        let left_right = matrix.residual(p - 1, t) + matrix.residual(p + 1, t);
        if self.reject_isolated && (up_down <= 0.0 || left_right <= 0.0) {
            return None;
        }
        if q + up_down < self.min_up_down || q + left_right < self.min_left_right {
            return None;
        }

        Some(Peak { pad, time, charge: q })
    }

    /// All peaks of the current matrix state, without modifying it.
    pub fn scan(&self, matrix: &ChargeMatrix) -> Vec<Peak> {
        self.cells()
            .filter_map(|(pad, time)| self.peak_at(matrix, pad, time))
            .collect()
    }
}
