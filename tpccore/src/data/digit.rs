use std::fmt;
use std::fmt::Formatter;
use serde::{Deserialize, Serialize};

use crate::geometry::row::RowGeometry;

/// A single zero-suppressed charge sample of one pad at one time bin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digit {
    pub pad: u32,
    pub time: u32,
    pub charge: u16,
}

impl Digit {
    /// Creates a new `Digit`.
    ///
    /// # Arguments
    ///
    /// * `pad` - pad index within the row.
    /// * `time` - time-bin index (drift time).
    /// * `charge` - ADC charge, already zero-suppressed.
    ///
    /// # Examples
    ///
    /// ```
    /// use tpccore::data::digit::Digit;
    ///
    /// let digit = Digit::new(10, 20, 50);
    /// assert_eq!(digit.charge, 50);
    /// ```
    pub fn new(pad: u32, time: u32, charge: u16) -> Self {
        Digit { pad, time, charge }
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Digit(pad: {}, time: {}, charge: {})", self.pad, self.time, self.charge)
    }
}

/// All digits of one pad row together with the geometry needed to interpret them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RowDigits {
    pub sector: u32,
    pub row: u32,
    pub geometry: RowGeometry,
    pub digits: Vec<Digit>,
}

impl RowDigits {
    /// Creates a new `RowDigits` container.
    ///
    /// # Arguments
    ///
    /// * `sector` - sector index, carried through to the clusters.
    /// * `row` - pad-row index within the sector.
    /// * `geometry` - row geometry and calibration constants.
    /// * `digits` - digits of this row in any order.
    ///
    /// # Examples
    ///
    /// ```
    /// use tpccore::data::digit::{Digit, RowDigits};
    /// use tpccore::geometry::row::RowGeometry;
    ///
    /// let row = RowDigits::new(0, 3, RowGeometry::default(), vec![Digit::new(1, 2, 30)]);
    /// assert_eq!(row.total_charge(), 30);
    /// ```
    pub fn new(sector: u32, row: u32, geometry: RowGeometry, digits: Vec<Digit>) -> Self {
        RowDigits { sector, row, geometry, digits }
    }

    /// Sum of all digit charges of the row.
    pub fn total_charge(&self) -> u64 {
        self.digits.iter().map(|d| d.charge as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }
}
