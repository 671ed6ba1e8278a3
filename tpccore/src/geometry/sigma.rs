use crate::geometry::row::RowGeometry;

/// Lower bound of every expected variance (index² units).
pub const MIN_VARIANCE: f32 = 1e-3;

/// Constant pad-response resolution term (pad² units).
pub const PAD_RESOLUTION_VARIANCE: f32 = 0.25;

/// Expected spread of a single, isolated cluster as a function of drift time.
///
/// All constants are folded once from a [`RowGeometry`]; evaluating the model
/// is a handful of multiplications and has no failure modes. The model is
/// `Copy` and is shared read-only by every worker processing the row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SigmaModel {
    z_width: f32,
    z_length: f32,
    time_offset_bins: f32,
    // D² / w²
    pad_diffusion: f32,
    // D² / z_width²
    time_diffusion: f32,
    // pad_length / (row_radius * z_width)
    angular_scale: f32,
    // (z_sigma / z_width)²
    time_resolution: f32,
}

impl SigmaModel {
    /// Folds the geometry constants used by the model.
    ///
    /// # Arguments
    ///
    /// * `geometry` - row geometry; degenerate lengths are floored so the model stays finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use tpccore::geometry::row::RowGeometry;
    /// use tpccore::geometry::sigma::SigmaModel;
    ///
    /// let model = SigmaModel::new(&RowGeometry::default());
    /// assert!(model.expected_pad_variance(100.0) > 0.25);
    /// ```
    pub fn new(geometry: &RowGeometry) -> Self {
        let z_width = geometry.z_width.max(f32::EPSILON);
        let pad_width = geometry.pad_pitch_width.max(f32::EPSILON);
        let radius = geometry.row_radius.max(f32::EPSILON);
        let d2 = geometry.diffusion_l * geometry.diffusion_l;
        let res = geometry.z_sigma / z_width;

        SigmaModel {
            z_width,
            z_length: geometry.z_length,
            time_offset_bins: geometry.time_offset_bins,
            pad_diffusion: d2 / (pad_width * pad_width),
            time_diffusion: d2 / (z_width * z_width),
            angular_scale: geometry.pad_length / (radius * z_width),
            time_resolution: res * res,
        }
    }

    #[inline]
    fn drift_length(&self, time_bin: f32) -> f32 {
        ((time_bin + self.time_offset_bins) * self.z_width).max(0.0)
    }

    /// Expected pad-direction variance in pad² units: diffusion plus pad response.
    #[inline]
    pub fn expected_pad_variance(&self, time_bin: f32) -> f32 {
        let z = self.drift_length(time_bin);
        floor_variance(z * self.pad_diffusion + PAD_RESOLUTION_VARIANCE)
    }

    /// Expected time-direction variance in bin² units.
    ///
    /// Diffusion, the track-inclination term (the dip angle is estimated from a
    /// vertex constraint, `tan λ ≈ z / r`) and the electronics jitter.
    #[inline]
    pub fn expected_time_variance(&self, time_bin: f32) -> f32 {
        let z = self.drift_length(time_bin);
        let diffusion = z * self.time_diffusion;
        let tilt = self.angular_scale * (self.z_length - z);
        let angular = tilt * tilt / 12.0;
        floor_variance(diffusion + angular + self.time_resolution)
    }
}

#[inline]
fn floor_variance(v: f32) -> f32 {
    if v.is_finite() { v.max(MIN_VARIANCE) } else { MIN_VARIANCE }
}
