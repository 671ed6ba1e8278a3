use thiserror::Error;
use tpccore::error::GeometryError;

/// Errors of the setup paths around cluster finding.
///
/// Row processing itself never fails once the geometry is valid; bad digits
/// and degenerate windows are skipped and counted in the row diagnostics.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid geometry for sector {sector} row {row}: {source}")]
    InvalidGeometry {
        sector: u32,
        row: u32,
        #[source]
        source: GeometryError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
