#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use tpccore::data::digit::{Digit, RowDigits};
use tpccore::geometry::row::RowGeometry;
use tpcclust::sim::deposit::{deposit_digits, Deposit};

/// Short drift row with single-deposit widths of about half a cell on both axes.
pub fn test_geometry(pads: u32, times: u32) -> RowGeometry {
    RowGeometry {
        pad_count: pads,
        time_count: times,
        z_width: 0.25,
        z_length: 10.0,
        z_sigma: 0.12,
        row_radius: 85.0,
        ..Default::default()
    }
}

/// Noise-free digits of deposits whose shapes follow the row's sigma model.
pub fn gaussian_row(geometry: &RowGeometry, centres: &[(f32, f32, f32)]) -> (RowDigits, Vec<Deposit>) {
    let model = geometry.sigma_model();
    let deposits: Vec<Deposit> = centres
        .iter()
        .map(|&(pad, time, charge)| Deposit::with_expected_shape(pad, time, charge, &model))
        .collect();
    let digits = deposit_digits(&deposits, geometry, 0.0, &mut StdRng::seed_from_u64(0));
    (RowDigits::new(0, 0, geometry.clone(), digits), deposits)
}

/// Integer peak of 100 at the centre, 25 on the four sides, 6 on the diagonals.
pub fn grid_peak(pad: u32, time: u32) -> Vec<Digit> {
    let mut digits = Vec::with_capacity(9);
    for dp in -1i32..=1 {
        for dt in -1i32..=1 {
            let charge = match (dp.abs(), dt.abs()) {
                (0, 0) => 100,
                (1, 1) => 6,
                _ => 25,
            };
            digits.push(Digit::new((pad as i32 + dp) as u32, (time as i32 + dt) as u32, charge));
        }
    }
    digits
}
