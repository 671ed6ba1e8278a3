use crate::cluster::matrix::{ChargeMatrix, Window5};

/// Removes extracted cluster charge from the residual buffer of a row.
///
/// Only the residual is touched; the original samples stay available for
/// the 7×7 unfolding context of later peaks.
pub struct ResidualUpdater;

impl ResidualUpdater {
    /// Caps every cell of `image` to the residual still available under it.
    ///
    /// After capping, subtracting the image leaves no negative cell, so the
    /// charge a cluster reports is exactly the charge it takes away.
    pub fn cap_to_residual(matrix: &ChargeMatrix, pad: usize, time: usize, image: &mut Window5) {
        let available = matrix.residual_window5(pad, time);
        for (row, avail) in image.iter_mut().zip(available.iter()) {
            for (q, &a) in row.iter_mut().zip(avail.iter()) {
                *q = if q.is_finite() { q.clamp(0.0, a.max(0.0)) } else { 0.0 };
            }
        }
    }

    /// Subtracts `image`, anchored with its centre at `(pad, time)`, clipping at zero.
    ///
    /// Returns the charge actually removed.
    pub fn subtract(matrix: &mut ChargeMatrix, pad: usize, time: usize, image: &Window5) -> f32 {
        let (p, t) = (pad as isize, time as isize);
        let mut removed = 0.0f32;
        for (i, row) in image.iter().enumerate() {
            for (j, &q) in row.iter().enumerate() {
                if !(q > 0.0) {
                    continue;
                }
                let cell = matrix.residual_mut(p + i as isize - 2, t + j as isize - 2);
                let before = *cell;
                *cell = (before - q).max(0.0);
                removed += before - *cell;
            }
        }
        removed
    }
}
