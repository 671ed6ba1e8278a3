use std::collections::BTreeMap;

use log::warn;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tpccore::data::digit::{Digit, RowDigits};
use tpccore::geometry::row::RowGeometry;
use tpccore::geometry::sigma::SigmaModel;

/// Variance a unit-width bin adds to a sampled Gaussian.
const BIN_VARIANCE: f32 = 1.0 / 12.0;
const MIN_SIGMA: f32 = 0.05;
/// Footprint of a deposit in standard deviations.
const FOOTPRINT_SIGMAS: f32 = 5.0;

/// A 2D Gaussian charge deposit in index space of one row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub pad: f32,
    pub time: f32,
    pub charge: f32,
    pub sigma_pad: f32,
    pub sigma_time: f32,
}

impl Deposit {
    pub fn new(pad: f32, time: f32, charge: f32, sigma_pad: f32, sigma_time: f32) -> Self {
        Deposit { pad, time, charge, sigma_pad, sigma_time }
    }

    /// Deposit whose sampled variance matches what `model` expects at `time`.
    pub fn with_expected_shape(pad: f32, time: f32, charge: f32, model: &SigmaModel) -> Self {
        let width = |expected: f32| (expected - BIN_VARIANCE).max(MIN_SIGMA * MIN_SIGMA).sqrt();
        Deposit {
            pad,
            time,
            charge,
            sigma_pad: width(model.expected_pad_variance(time)),
            sigma_time: width(model.expected_time_variance(time)),
        }
    }

    fn axis(mean: f32, sigma: f32) -> Option<Normal> {
        Normal::new(mean as f64, sigma.max(MIN_SIGMA) as f64).ok()
    }

    /// Fraction of the deposit collected by bin `index` of a Gaussian axis.
    fn bin_fraction(axis: &Normal, index: u32) -> f64 {
        let i = index as f64;
        axis.cdf(i + 0.5) - axis.cdf(i - 0.5)
    }

    /// Inclusive bin range covered by the deposit along one axis.
    fn footprint(mean: f32, sigma: f32, bins: u32) -> Option<(u32, u32)> {
        let reach = FOOTPRINT_SIGMAS * sigma.max(MIN_SIGMA) + 1.0;
        let lo = (mean - reach).floor().max(0.0);
        let hi = (mean + reach).ceil().min(bins as f32 - 1.0);
        if !(lo <= hi) {
            return None;
        }
        Some((lo as u32, hi as u32))
    }
}

/// Samples deposits onto the readout grid of a row and zero-suppresses them.
///
/// The charge of every cell is the deposit integrated over the cell; optional
/// Gaussian noise of width `noise_sigma` is added to the cells a deposit
/// touches before rounding. Cells below the row's zero-suppression threshold
/// produce no digit. Digits come out in pad-major order.
pub fn deposit_digits<R: Rng>(
    deposits: &[Deposit],
    geometry: &RowGeometry,
    noise_sigma: f32,
    rng: &mut R,
) -> Vec<Digit> {
    let mut cells: BTreeMap<(u32, u32), f64> = BTreeMap::new();

    for d in deposits {
        let (Some(pad_axis), Some(time_axis)) = (Deposit::axis(d.pad, d.sigma_pad), Deposit::axis(d.time, d.sigma_time)) else {
            warn!("skipping deposit with invalid shape: {:?}", d);
            continue;
        };
        let (Some((p0, p1)), Some((t0, t1))) = (
            Deposit::footprint(d.pad, d.sigma_pad, geometry.pad_count),
            Deposit::footprint(d.time, d.sigma_time, geometry.time_count),
        ) else {
            continue;
        };

        let time_fractions: Vec<f64> = (t0..=t1).map(|t| Deposit::bin_fraction(&time_axis, t)).collect();
        for pad in p0..=p1 {
            let fp = Deposit::bin_fraction(&pad_axis, pad) * d.charge as f64;
            for (time, ft) in (t0..=t1).zip(time_fractions.iter()) {
                *cells.entry((pad, time)).or_insert(0.0) += fp * ft;
            }
        }
    }

    if noise_sigma > 0.0 {
        match Normal::new(0.0, noise_sigma as f64) {
            Ok(noise) => {
                for q in cells.values_mut() {
                    *q += noise.sample(rng);
                }
            }
            Err(e) => warn!("noise disabled: {}", e),
        }
    }

    let threshold = geometry.zero_suppression_threshold.max(1);
    cells
        .into_iter()
        .filter_map(|((pad, time), q)| {
            let charge = q.round().clamp(0.0, u16::MAX as f64) as u16;
            (charge >= threshold).then(|| Digit::new(pad, time, charge))
        })
        .collect()
}

/// Settings of the random event generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub deposits_per_row: usize,
    pub min_charge: f32,
    pub max_charge: f32,
    pub noise_sigma: f32,
    pub seed: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            deposits_per_row: 20,
            min_charge: 200.0,
            max_charge: 2000.0,
            noise_sigma: 0.0,
            seed: 42,
        }
    }
}

/// Digits of one simulated row together with the deposits that made them.
#[derive(Clone, Debug)]
pub struct SimulatedRow {
    pub digits: RowDigits,
    pub truth: Vec<Deposit>,
}

/// Seeded generator of random single-row events.
pub struct DepositSimulator {
    geometry: RowGeometry,
    params: SimParams,
    rng: StdRng,
}

impl DepositSimulator {
    pub fn new(geometry: RowGeometry, params: SimParams) -> Self {
        let rng = StdRng::seed_from_u64(params.seed);
        DepositSimulator { geometry, params, rng }
    }

    /// Uniformly placed deposits with expected shapes, kept 3 cells away from
    /// the live region's border.
    pub fn random_deposits(&mut self, count: usize) -> Vec<Deposit> {
        let model = self.geometry.sigma_model();
        let (pad_lo, pad_hi) = self.geometry.live_pad_range();
        let time_lo = self.geometry.first_live_time_bin(None);
        let pad_range = (pad_lo as f32 + 3.0, pad_hi as f32 - 3.0);
        let time_range = (time_lo as f32 + 3.0, self.geometry.time_count as f32 - 4.0);
        if pad_range.0 >= pad_range.1 || time_range.0 >= time_range.1 {
            return Vec::new();
        }
        let (q_lo, q_hi) = (self.params.min_charge, self.params.max_charge.max(self.params.min_charge));

        (0..count)
            .map(|_| {
                let pad = self.rng.gen_range(pad_range.0..pad_range.1);
                let time = self.rng.gen_range(time_range.0..time_range.1);
                let charge = if q_hi > q_lo { self.rng.gen_range(q_lo..q_hi) } else { q_lo };
                Deposit::with_expected_shape(pad, time, charge, &model)
            })
            .collect()
    }

    pub fn simulate_row(&mut self, sector: u32, row: u32) -> SimulatedRow {
        let truth = self.random_deposits(self.params.deposits_per_row);
        let digits = deposit_digits(&truth, &self.geometry, self.params.noise_sigma, &mut self.rng);
        SimulatedRow {
            digits: RowDigits::new(sector, row, self.geometry.clone(), digits),
            truth,
        }
    }
}
