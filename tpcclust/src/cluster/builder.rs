use log::trace;
use tpccore::data::cluster::{Cluster, ClusterKind};
use tpccore::geometry::row::RowGeometry;
use tpccore::geometry::sigma::SigmaModel;

use crate::cluster::matrix::ChargeMatrix;
use crate::cluster::moments::WindowMoments;
use crate::cluster::params::{ClustererParams, Pass};
use crate::cluster::peak::Peak;
use crate::cluster::residual::ResidualUpdater;
use crate::cluster::unfold::UnfoldingEngine;
use crate::cluster::virtual_charge::VirtualChargeEstimator;

/// Why a peak did not produce a cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// No positive charge left to compute moments from.
    Degenerate,
    /// Narrower than a single deposit can be; only applied on the second pass.
    TooNarrow,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BuildOutcome {
    Accepted(Cluster),
    Rejected(Rejection),
}

/// Turns one peak into a cluster and removes its charge from the residual.
///
/// The moments of the virtual-charge-augmented 5×5 window are compared to
/// the expected single-deposit spread. Shapes within `wide_ratio` become
/// [`ClusterKind::Simple`] clusters; wider ones go through the
/// [`UnfoldingEngine`] and become [`ClusterKind::Unfolded`].
#[derive(Clone, Debug)]
pub struct ClusterBuilder {
    sigma: SigmaModel,
    estimator: VirtualChargeEstimator,
    unfolder: UnfoldingEngine,
    pass: Pass,
    narrow_ratio: f32,
    wide_ratio: f32,
    unfold: bool,
}

impl ClusterBuilder {
    pub fn new(geometry: &RowGeometry, params: &ClustererParams, pass: Pass) -> Self {
        ClusterBuilder {
            sigma: geometry.sigma_model(),
            estimator: VirtualChargeEstimator::from_params(params, pass),
            unfolder: UnfoldingEngine,
            pass,
            narrow_ratio: params.narrow_ratio,
            wide_ratio: params.wide_ratio,
            unfold: params.unfold,
        }
    }

    pub fn pass(&self) -> Pass {
        self.pass
    }

    /// Measured over expected variance, pad and time.
    pub fn shape_ratios(&self, moments: &WindowMoments, time: usize) -> (f32, f32) {
        let t = time as f32;
        (
            moments.var_pad / self.sigma.expected_pad_variance(t),
            moments.var_time / self.sigma.expected_time_variance(t),
        )
    }

    pub fn build(&self, matrix: &mut ChargeMatrix, peak: Peak) -> BuildOutcome {
        let (pad, time) = (peak.pad, peak.time);
        let t = time as f32;
        let sigma_pad2 = self.sigma.expected_pad_variance(t);
        let sigma_time2 = self.sigma.expected_time_variance(t);

        let window = matrix.residual_window5(pad, time);
        let inside = matrix.mask5(pad, time);
        let working = self.estimator.estimate(&window, &inside, sigma_pad2, sigma_time2);

        let Some(moments) = WindowMoments::of(&working.weights) else {
            trace!("peak ({}, {}): degenerate window", pad, time);
            return BuildOutcome::Rejected(Rejection::Degenerate);
        };
        let (ry, rz) = self.shape_ratios(&moments, time);

        if self.pass == Pass::Second && (ry < self.narrow_ratio || rz < self.narrow_ratio) {
            trace!("peak ({}, {}): too narrow, ry {:.3} rz {:.3}", pad, time, ry, rz);
            return BuildOutcome::Rejected(Rejection::TooNarrow);
        }

        let max_charge = matrix.original(pad as isize, time as isize);

        if !self.unfold || (ry <= self.wide_ratio && rz <= self.wide_ratio) {
            let charge = ResidualUpdater::subtract(matrix, pad, time, &working.measured);
            if charge <= 0.0 {
                return BuildOutcome::Rejected(Rejection::Degenerate);
            }
            trace!("peak ({}, {}): simple, q {:.1} ry {:.3} rz {:.3}", pad, time, charge, ry, rz);
            let mut cluster = Cluster::new(
                pad as f32 + moments.mean_pad,
                t + moments.mean_time,
                charge,
                moments.var_pad,
                moments.var_time,
                max_charge,
                ClusterKind::Simple,
            );
            cluster.pass = self.pass.number();
            return BuildOutcome::Accepted(cluster);
        }

        let unfolded = self.unfolder.unfold(&matrix.original_window7(pad, time));
        let mut image = unfolded.image;
        ResidualUpdater::cap_to_residual(matrix, pad, time, &mut image);
        let Some(split) = WindowMoments::of(&image) else {
            trace!("peak ({}, {}): nothing left after unfolding", pad, time);
            return BuildOutcome::Rejected(Rejection::Degenerate);
        };
        let charge = ResidualUpdater::subtract(matrix, pad, time, &image);
        trace!(
            "peak ({}, {}): unfolded, q {:.1} overlap {}% ry {:.3} rz {:.3}",
            pad,
            time,
            charge,
            unfolded.overlap_percent,
            ry,
            rz
        );

        let mut cluster = Cluster::new(
            pad as f32 + split.mean_pad,
            t + split.mean_time,
            charge,
            split.var_pad,
            split.var_time,
            max_charge,
            ClusterKind::Unfolded,
        );
        cluster.overlap = unfolded.overlap_percent;
        cluster.pass = self.pass.number();
        BuildOutcome::Accepted(cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tpccore::data::digit::Digit;

    fn geometry() -> RowGeometry {
        RowGeometry {
            pad_count: 30,
            time_count: 60,
            z_width: 0.25,
            z_length: 10.0,
            z_sigma: 0.12,
            row_radius: 85.0,
            ..Default::default()
        }
    }

    fn accepted(outcome: BuildOutcome) -> Cluster {
        match outcome {
            BuildOutcome::Accepted(c) => c,
            BuildOutcome::Rejected(r) => panic!("peak rejected: {:?}", r),
        }
    }

    #[test]
    fn test_isolated_digit_is_simple_with_its_own_charge() {
        let g = geometry();
        let (mut m, _) = ChargeMatrix::from_digits(30, 60, &[Digit::new(10, 20, 50)]);
        let builder = ClusterBuilder::new(&g, &ClustererParams::default(), Pass::First);
        let c = accepted(builder.build(&mut m, Peak { pad: 10, time: 20, charge: 50.0 }));
        assert_eq!(c.kind, ClusterKind::Simple);
        assert_relative_eq!(c.charge, 50.0);
        assert_relative_eq!(c.pad, 10.0, epsilon = 1e-5);
        assert_relative_eq!(c.time, 20.0, epsilon = 1e-5);
        assert_eq!(c.max_charge, 50);
        assert_eq!(m.residual(10, 20), 0.0);
        assert_eq!(m.original(10, 20), 50);
    }

    #[test]
    fn test_second_pass_rejects_single_sample_spike() {
        let g = geometry();
        let (mut m, _) = ChargeMatrix::from_digits(30, 60, &[Digit::new(10, 20, 9)]);
        let builder = ClusterBuilder::new(&g, &ClustererParams::default(), Pass::Second);
        assert_eq!(
            builder.build(&mut m, Peak { pad: 10, time: 20, charge: 9.0 }),
            BuildOutcome::Rejected(Rejection::TooNarrow)
        );
        assert_eq!(m.residual(10, 20), 9.0);
    }

    #[test]
    fn test_wide_peak_is_unfolded_and_charge_conserved() {
        let g = geometry();
        let mut digits = Vec::new();
        for &(cp, q) in &[(10u32, 100u16), (12, 100)] {
            for dp in -1i32..=1 {
                for dt in -1i32..=1 {
                    let v = match (dp.abs(), dt.abs()) {
                        (0, 0) => q,
                        (1, 1) => 6,
                        _ => 25,
                    };
                    digits.push(Digit::new((cp as i32 + dp) as u32, (20 + dt) as u32, v));
                }
            }
        }
        let (mut m, _) = ChargeMatrix::from_digits(30, 60, &digits);
        let total = m.original_total() as f32;
        let builder = ClusterBuilder::new(&g, &ClustererParams::default(), Pass::First);

        let first = accepted(builder.build(&mut m, Peak { pad: 10, time: 20, charge: 100.0 }));
        assert_eq!(first.kind, ClusterKind::Unfolded);
        assert_eq!(first.overlap, 14);
        assert!(first.pad > 10.0 && first.pad < 10.2);

        let second = accepted(builder.build(&mut m, Peak { pad: 12, time: 20, charge: 93.75 }));
        assert_relative_eq!(second.pad, 12.0, epsilon = 1e-4);
        assert_relative_eq!(first.charge + second.charge, total, max_relative = 1e-4);
        assert_relative_eq!(m.residual_total() as f32, 0.0, epsilon = 1e-2);
        assert!(m.residual_min() >= 0.0);
    }

    #[test]
    fn test_unfolding_disabled_keeps_wide_peak_simple() {
        let g = geometry();
        let digits: Vec<Digit> = (8..=12).map(|p| Digit::new(p, 20, 40)).collect();
        let (mut m, _) = ChargeMatrix::from_digits(30, 60, &digits);
        let params = ClustererParams { unfold: false, ..Default::default() };
        let builder = ClusterBuilder::new(&g, &params, Pass::First);
        let c = accepted(builder.build(&mut m, Peak { pad: 8, time: 20, charge: 40.0 }));
        assert_eq!(c.kind, ClusterKind::Simple);
        assert_relative_eq!(c.charge, 120.0);
    }
}
