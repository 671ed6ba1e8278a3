use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::geometry::sigma::SigmaModel;

/// Side of the central membrane a readout chamber sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectorSide {
    A,
    C,
}

impl SectorSide {
    /// Sign of the global z coordinate on this side.
    pub fn sign(&self) -> f32 {
        match self {
            SectorSide::A => 1.0,
            SectorSide::C => -1.0,
        }
    }
}

/// Geometry and calibration constants of one pad row.
///
/// Lengths are in cm. `time_offset_bins` is the number of time bins the
/// readout window starts before the anode (trigger latency), it shifts the
/// drift length used by the shape model and the delay correction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowGeometry {
    pub pad_count: u32,
    pub time_count: u32,

    pub pad_pitch_width: f32,
    pub pad_length: f32,
    /// Drift length per time bin.
    pub z_width: f32,
    /// Longitudinal/transverse diffusion coefficient (cm^1/2).
    pub diffusion_l: f32,
    pub row_radius: f32,
    /// Electronics time jitter expressed as a length.
    pub z_sigma: f32,
    /// Full drift length from the central membrane to the readout plane.
    pub z_length: f32,
    pub time_offset_bins: f32,

    /// Inclusive range of instrumented pads (min/max strip index); `None` means all.
    pub live_pads: Option<(u32, u32)>,
    pub side: SectorSide,
    pub zero_suppression_threshold: u16,

    /// Pad coordinate mapped to y = 0; `None` means the row centre.
    pub pad_center_offset: Option<f32>,
    pub apply_delay_correction: bool,
}

impl Default for RowGeometry {
    fn default() -> Self {
        RowGeometry {
            pad_count: 68,
            time_count: 1000,
            pad_pitch_width: 0.4,
            pad_length: 0.75,
            z_width: 0.2825,
            diffusion_l: 0.022,
            row_radius: 85.225,
            z_sigma: 0.0412,
            z_length: 250.0,
            time_offset_bins: 0.0,
            live_pads: None,
            side: SectorSide::A,
            zero_suppression_threshold: 2,
            pad_center_offset: None,
            apply_delay_correction: true,
        }
    }
}

impl RowGeometry {
    /// Checks that every constant entering a division is usable.
    ///
    /// # Examples
    ///
    /// ```
    /// use tpccore::geometry::row::RowGeometry;
    ///
    /// let mut geometry = RowGeometry::default();
    /// assert!(geometry.validate().is_ok());
    /// geometry.z_width = 0.0;
    /// assert!(geometry.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.pad_count == 0 || self.time_count == 0 {
            return Err(GeometryError::EmptyGrid { pads: self.pad_count, time_bins: self.time_count });
        }
        let positive = [
            ("pad_pitch_width", self.pad_pitch_width),
            ("pad_length", self.pad_length),
            ("z_width", self.z_width),
            ("row_radius", self.row_radius),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(GeometryError::NonPositive { name, value });
            }
        }
        if let Some((min, max)) = self.live_pads {
            if min > max || max >= self.pad_count {
                return Err(GeometryError::LivePads { min, max, pads: self.pad_count });
            }
        }
        Ok(())
    }

    /// Inclusive `(min, max)` pad range that takes part in the peak search.
    pub fn live_pad_range(&self) -> (u32, u32) {
        let last = self.pad_count.saturating_sub(1);
        match self.live_pads {
            Some((min, max)) => (min.min(last), max.min(last)),
            None => (0, last),
        }
    }

    /// First time bin whose drift length is still inside the track acceptance.
    ///
    /// Bins before it correspond to |z| > `ctg_range * row_radius` and are
    /// skipped by the peak search. `None` disables the cut.
    pub fn first_live_time_bin(&self, ctg_range: Option<f32>) -> u32 {
        let Some(ctg) = ctg_range else { return 0 };
        let cut = (self.z_length - ctg * self.row_radius) / self.z_width - self.time_offset_bins - 5.0;
        if !cut.is_finite() || cut <= 0.0 {
            0
        } else {
            (cut as u32).min(self.time_count)
        }
    }

    pub fn pad_center_offset(&self) -> f32 {
        self.pad_center_offset
            .unwrap_or((self.pad_count as f32 - 1.0) * 0.5)
    }

    /// Fixed drift-length correction for trigger latency and shaping delay.
    pub fn delay_correction(&self) -> f32 {
        if self.apply_delay_correction {
            self.time_offset_bins * self.z_width - 3.0 * self.z_sigma
        } else {
            0.0
        }
    }

    pub fn sigma_model(&self) -> SigmaModel {
        SigmaModel::new(self)
    }
}
