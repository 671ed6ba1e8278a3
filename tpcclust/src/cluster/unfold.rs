use crate::cluster::matrix::{Window5, Window7};

/// Pedestal added to / removed from projected sums in the decay test.
pub const DECAY_PEDESTAL: f32 = 3.0;
/// A flat or rising neighbour only counts as shared above this projected charge.
pub const SECOND_PEAK_MIN: f32 = 2.0;
/// Weight of the peak itself against its outer neighbour in the split estimate.
pub const NEAR_WEIGHT: f32 = 4.0;
/// Floor of every divisor and of the own-peak split weight.
pub const WEIGHT_EPS: f32 = 1e-6;

/// Projection of a 7×7 window onto one axis, offsets -3..=3.
pub type Profile = [f32; 7];

/// Best single-cluster image of a peak whose window also holds charge of a neighbour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Unfolded {
    /// 5×5 image centred on the peak, `[pad + 2][time + 2]`.
    pub image: Window5,
    /// Largest fraction of the near-window charge handed to a neighbour, per axis.
    pub overlap: f32,
    pub overlap_percent: u8,
    /// Charge-sharing factors of the 3×3 neighbourhood, `1.0` where undisturbed.
    pub ratios: [[f32; 3]; 3],
}

/// Splits the charge of a wide peak from an overlapping neighbour.
///
/// Works on the original (not residual) 7×7 neighbourhood. Each axis is
/// treated on its own: the window is projected onto the axis, each side is
/// tested for a second maximum behind the near neighbour, and when one is
/// found the neighbour's charge is shared between the two peaks. The 2D
/// sharing factor of a cell is the product of the two axis factors.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnfoldingEngine;

impl UnfoldingEngine {
    pub fn unfold(&self, window: &Window7) -> Unfolded {
        let (pad_profile, time_profile) = projections(window);
        let pad_ratios = axis_ratios(&pad_profile);
        let time_ratios = axis_ratios(&time_profile);

        let mut ratios = [[1.0f32; 3]; 3];
        for (a, row) in ratios.iter_mut().enumerate() {
            for (b, r) in row.iter_mut().enumerate() {
                *r = pad_ratios[a] * time_ratios[b];
            }
        }

        let overlap = axis_overlap(&pad_profile, &pad_ratios).max(axis_overlap(&time_profile, &time_ratios));
        let overlap_percent = (overlap * 100.0).floor().clamp(0.0, 100.0) as u8;

        let image = if ratios == [[1.0; 3]; 3] {
            centre5(window)
        } else {
            reconstruct(window, &ratios)
        };

        Unfolded { image, overlap, overlap_percent, ratios }
    }
}

/// Charge-sharing factor of the near neighbour on side `dk` (±1) of the profile
/// centre, or `None` when the profile falls off normally on that side.
///
/// The factor is clamped to `[0, 1]`: a neighbour never gives the peak more
/// charge than it measured.
pub fn split_ratio(profile: &Profile, dk: isize) -> Option<f32> {
    let at = |k: isize| profile[(3 + k) as usize];
    let (centre, near, far) = (at(0), at(dk), at(2 * dk));

    let falloff = (near + DECAY_PEDESTAL) / (centre - DECAY_PEDESTAL).max(WEIGHT_EPS) + 1.0;
    let rise = (far - DECAY_PEDESTAL) / (near + DECAY_PEDESTAL).max(WEIGHT_EPS);
    let second_peak = falloff < rise || (near <= far && near > SECOND_PEAK_MIN);
    if !second_peak {
        return None;
    }

    let own = (NEAR_WEIGHT * centre - at(-dk)).max(WEIGHT_EPS);
    let other = (NEAR_WEIGHT * far - at(3 * dk)).max(0.0);
    let ratio = own / (own + other);
    Some(if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 1.0 })
}

/// Sums of the ±1 band across each pad offset and each time offset.
fn projections(window: &Window7) -> (Profile, Profile) {
    let mut pad = [0.0f32; 7];
    let mut time = [0.0f32; 7];
    for k in 0..7 {
        for l in 2..=4 {
            pad[k] += window[k][l];
            time[k] += window[l][k];
        }
    }
    (pad, time)
}

fn axis_ratios(profile: &Profile) -> [f32; 3] {
    [
        split_ratio(profile, -1).unwrap_or(1.0),
        1.0,
        split_ratio(profile, 1).unwrap_or(1.0),
    ]
}

fn axis_overlap(profile: &Profile, ratios: &[f32; 3]) -> f32 {
    let near = &profile[2..=4];
    let before: f32 = near.iter().sum();
    if before <= WEIGHT_EPS {
        return 0.0;
    }
    let after: f32 = near.iter().zip(ratios.iter()).map(|(q, r)| q * r).sum();
    ((before - after) / before).max(0.0)
}

fn centre5(window: &Window7) -> Window5 {
    let mut image = [[0.0f32; 5]; 5];
    for (i, row) in image.iter_mut().enumerate() {
        row.copy_from_slice(&window[i + 1][1..6]);
    }
    image
}

#[inline]
fn put(image: &mut Window5, di: isize, dj: isize, value: f32) {
    image[(2 + di) as usize][(2 + dj) as usize] = if value.is_finite() { value.max(0.0) } else { 0.0 };
}

/// `value` scaled by its own size relative to `reference`, never above `value`.
#[inline]
fn tail(value: f32, reference: f32) -> f32 {
    (value / reference.max(WEIGHT_EPS)).min(1.0) * value
}

fn reconstruct(window: &Window7, ratios: &[[f32; 3]; 3]) -> Window5 {
    let at = |i: isize, j: isize| window[(3 + i) as usize][(3 + j) as usize];
    let mut image = [[0.0f32; 5]; 5];
    put(&mut image, 0, 0, at(0, 0));

    for di in -1isize..=1 {
        for dj in -1isize..=1 {
            if di == 0 && dj == 0 {
                continue;
            }
            let ratio = ratios[(di + 1) as usize][(dj + 1) as usize];
            let diagonal = di != 0 && dj != 0;

            if ratio >= 1.0 {
                put(&mut image, di, dj, at(di, dj));
                if diagonal {
                    put(&mut image, 2 * di, dj, at(2 * di, dj));
                    put(&mut image, di, 2 * dj, at(di, 2 * dj));
                }
                put(&mut image, 2 * di, 2 * dj, at(2 * di, 2 * dj));
                continue;
            }

            let near = ratio * at(di, dj);
            put(&mut image, di, dj, near);
            if diagonal {
                put(&mut image, 2 * di, dj, tail(near, at(0, dj) + 1.0));
                put(&mut image, di, 2 * dj, tail(near, at(di, 0) + 1.0));
            } else {
                put(&mut image, 2 * di, 2 * dj, tail(near, at(0, 0)));
            }
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two deposits of 100 / 25 / 6 (centre / side / diagonal), two pads apart,
    /// viewed from the lower one.
    fn two_peak_window() -> Window7 {
        let mut m = [[0.0f32; 7]; 7];
        for &centre in &[3usize, 5] {
            for di in -1isize..=1 {
                for dj in -1isize..=1 {
                    let q = match (di.abs(), dj.abs()) {
                        (0, 0) => 100.0,
                        (1, 1) => 6.0,
                        _ => 25.0,
                    };
                    let i = centre as isize + di;
                    if (0..7).contains(&i) {
                        m[i as usize][(3 + dj) as usize] += q;
                    }
                }
            }
        }
        m
    }

    #[test]
    fn test_second_peak_shares_the_middle_pad() {
        let u = UnfoldingEngine.unfold(&two_peak_window());
        assert_relative_eq!(u.ratios[2][1], 0.5, epsilon = 1e-6);
        assert_relative_eq!(u.ratios[0][1], 1.0);
        assert_eq!(u.overlap_percent, 14);

        assert_relative_eq!(u.image[2][2], 100.0);
        assert_relative_eq!(u.image[1][2], 25.0);
        assert_relative_eq!(u.image[3][2], 25.0, epsilon = 1e-4);
        // 25 · 25 / 100
        assert_relative_eq!(u.image[4][2], 6.25, epsilon = 1e-4);
        assert_relative_eq!(u.image[3][1], 6.0, epsilon = 1e-4);
        assert!(u.image[4][2] < 100.0);
    }

    #[test]
    fn test_single_peak_is_copied_unchanged() {
        let mut m = [[0.0f32; 7]; 7];
        m[3][3] = 80.0;
        m[2][3] = 20.0;
        m[4][3] = 20.0;
        m[3][2] = 30.0;
        m[3][4] = 30.0;
        m[1][3] = 4.0;
        let u = UnfoldingEngine.unfold(&m);
        assert_eq!(u.overlap_percent, 0);
        assert_eq!(u.ratios, [[1.0; 3]; 3]);
        assert_eq!(u.image[2][2], 80.0);
        assert_eq!(u.image[0][2], 4.0);
        assert_eq!(u.image.iter().flatten().sum::<f32>(), 184.0);
    }

    #[test]
    fn test_small_overlap_still_scales_the_shared_pad() {
        let mut m = [[0.0f32; 7]; 7];
        m[3][3] = 1000.0;
        m[4][3] = 5.0;
        m[5][3] = 10.0;
        m[6][3] = 16.0;
        let u = UnfoldingEngine.unfold(&m);

        // 4000 / (4000 + 4 · 10 - 16)
        let ratio = 4000.0 / 4024.0;
        assert_relative_eq!(u.ratios[2][1], ratio, epsilon = 1e-6);
        assert_eq!(u.overlap_percent, 0);
        assert_relative_eq!(u.image[3][2], 5.0 * ratio, epsilon = 1e-4);
        assert!(u.image[3][2] < 5.0);
        assert!(u.image[4][2] < 1.0);
        assert_eq!(u.image[2][2], 1000.0);
    }

    #[test]
    fn test_split_ratio_stays_in_unit_interval() {
        // own side dominated by the outer neighbour: floor weight, ratio close to 0
        let profile = [0.0, 0.0, 500.0, 10.0, 40.0, 200.0, 0.0];
        let r = split_ratio(&profile, 1).unwrap();
        assert!((0.0..=1.0).contains(&r));
        assert!(r < 1e-3);

        let flat = [0.0, 30.0, 30.0, 30.0, 30.0, 30.0, 0.0];
        for dk in [-1, 1] {
            let r = split_ratio(&flat, dk).unwrap();
            assert!((0.0..=1.0).contains(&r));
        }
    }

    #[test]
    fn test_falling_profile_does_not_split() {
        let profile = [0.0, 2.0, 20.0, 100.0, 20.0, 2.0, 0.0];
        assert!(split_ratio(&profile, 1).is_none());
        assert!(split_ratio(&profile, -1).is_none());
    }

    #[test]
    fn test_dark_window_is_finite() {
        let m = [[0.0f32; 7]; 7];
        let u = UnfoldingEngine.unfold(&m);
        assert!(u.overlap.is_finite());
        assert!(u.image.iter().flatten().all(|q| *q == 0.0));
    }
}
