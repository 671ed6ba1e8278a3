use crate::cluster::matrix::Window5;

/// Charge-weighted centroid and second central moments of a 5×5 window,
/// in offsets from the window centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowMoments {
    pub sum: f32,
    pub mean_pad: f32,
    pub mean_time: f32,
    pub var_pad: f32,
    pub var_time: f32,
}

impl WindowMoments {
    /// `None` when the window carries no positive charge.
    pub fn of(window: &Window5) -> Option<Self> {
        let mut sum = 0.0f32;
        let mut sum_i = 0.0f32;
        let mut sum_i2 = 0.0f32;
        let mut sum_j = 0.0f32;
        let mut sum_j2 = 0.0f32;
        for (a, row) in window.iter().enumerate() {
            let i = a as f32 - 2.0;
            for (b, &q) in row.iter().enumerate() {
                let j = b as f32 - 2.0;
                sum += q;
                sum_i += i * q;
                sum_i2 += i * i * q;
                sum_j += j * q;
                sum_j2 += j * j * q;
            }
        }
        if !(sum > 0.0) || !sum.is_finite() {
            return None;
        }
        let mean_pad = sum_i / sum;
        let mean_time = sum_j / sum;
        Some(WindowMoments {
            sum,
            mean_pad,
            mean_time,
            var_pad: (sum_i2 / sum - mean_pad * mean_pad).max(0.0),
            var_time: (sum_j2 / sum - mean_time * mean_time).max(0.0),
        })
    }
}

pub fn window_sum(window: &Window5) -> f32 {
    window.iter().flatten().sum()
}
