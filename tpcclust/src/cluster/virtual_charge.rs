use crate::cluster::matrix::{Mask5, Window5};
use crate::cluster::params::{ClustererParams, Pass};

/// Charges used for one cluster's moments.
///
/// `weights` may contain virtual charge in place of suppressed samples and is
/// only used for the centroid and second moments. `measured` holds the real
/// charge of exactly the cells `weights` covers; it is what the cluster owns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkingWindow {
    pub weights: Window5,
    pub measured: Window5,
}

/// Fills the 5×5 neighbourhood of a peak with the charge the moment
/// calculation should see, replacing suppressed neighbours by an
/// extrapolated value so the spread is not biased by the truncation.
#[derive(Clone, Copy, Debug)]
pub struct VirtualChargeEstimator {
    near_zero: f32,
    reliable: f32,
    decay: f32,
    enabled: bool,
}

impl VirtualChargeEstimator {
    pub fn new(near_zero: f32, reliable: f32, decay: f32, enabled: bool) -> Self {
        VirtualChargeEstimator { near_zero, reliable, decay, enabled }
    }

    /// Virtual charge is only used on the first pass.
    pub fn from_params(params: &ClustererParams, pass: Pass) -> Self {
        Self::new(
            params.near_zero_charge,
            params.reliable_charge,
            params.virtual_decay,
            pass == Pass::First,
        )
    }

    /// Substitute charge of a suppressed neighbour at offset `(di, dj)`.
    ///
    /// Exponential falloff in the variance-scaled distance, normalised by the
    /// mirror neighbour so a fast falloff on the other side predicts little
    /// charge here. Never above the suppression level nor above the peak.
    #[inline]
    pub fn virtual_charge(&self, peak: f32, mirror: f32, di: i32, dj: i32, sigma_pad2: f32, sigma_time2: f32) -> f32 {
        let base = peak - self.near_zero;
        let falloff = (-self.decay
            * (di.abs() as f32 / sigma_pad2.max(f32::EPSILON)
                + dj.abs() as f32 / sigma_time2.max(f32::EPSILON)))
            .exp();
        let amp = base * base / (mirror.max(0.0) + self.near_zero) * falloff;
        if amp.is_finite() {
            amp.clamp(0.0, self.near_zero.min(peak))
        } else {
            0.0
        }
    }

    pub fn estimate(&self, window: &Window5, inside: &Mask5, sigma_pad2: f32, sigma_time2: f32) -> WorkingWindow {
        let mut weights = [[0.0f32; 5]; 5];
        let mut measured = [[0.0f32; 5]; 5];
        let peak = window[2][2];
        weights[2][2] = peak;
        measured[2][2] = peak;

        for di in -1i32..=1 {
            for dj in -1i32..=1 {
                if di == 0 && dj == 0 {
                    continue;
                }
                let (ni, nj) = ((2 + di) as usize, (2 + dj) as usize);
                let amp = window[ni][nj];
                let behind = cells_behind(di, dj);

                if amp < self.near_zero && self.enabled && inside[ni][nj] {
                    let mirror = window[(2 - di) as usize][(2 - dj) as usize];
                    weights[ni][nj] = self.virtual_charge(peak, mirror, di, dj, sigma_pad2, sigma_time2);
                    measured[ni][nj] = amp;
                    continue;
                }

                weights[ni][nj] = amp;
                measured[ni][nj] = amp;
                if amp < self.reliable {
                    // a weak neighbour: the cells behind it belong to someone else
                    continue;
                }
                for &(bi, bj) in behind.iter().flatten() {
                    weights[bi][bj] = window[bi][bj];
                    measured[bi][bj] = window[bi][bj];
                }
            }
        }

        WorkingWindow { weights, measured }
    }
}

/// Window cells further out behind the neighbour at `(di, dj)`.
///
/// Along an axis this is the single 2-step cell; a diagonal neighbour also
/// owns the two mixed cells next to its 2-step corner.
#[inline]
fn cells_behind(di: i32, dj: i32) -> [Option<(usize, usize)>; 3] {
    let corner = Some(((2 + 2 * di) as usize, (2 + 2 * dj) as usize));
    if di != 0 && dj != 0 {
        [
            corner,
            Some(((2 + 2 * di) as usize, (2 + dj) as usize)),
            Some(((2 + di) as usize, (2 + 2 * dj) as usize)),
        ]
    } else {
        [corner, None, None]
    }
}
