use thiserror::Error;

/// Reasons a [`RowGeometry`](crate::geometry::row::RowGeometry) cannot be used
/// for cluster finding.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// The row has no pads or no time bins.
    #[error("row has an empty readout grid: {pads} pads x {time_bins} time bins")]
    EmptyGrid { pads: u32, time_bins: u32 },

    /// A length scale that enters a division is zero, negative or not finite.
    #[error("{name} must be finite and positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    /// The live pad range does not fit inside the row.
    #[error("live pad range [{min}, {max}] is outside 0..{pads}")]
    LivePads { min: u32, max: u32, pads: u32 },
}
