pub mod matrix;
pub mod params;
pub mod moments;
pub mod virtual_charge;
pub mod peak;
pub mod unfold;
pub mod residual;
pub mod builder;
pub mod transform;
pub mod diagnostics;
pub mod row;

// Re-export commonly used types
pub use builder::{BuildOutcome, ClusterBuilder, Rejection};
pub use diagnostics::RowDiagnostics;
pub use matrix::ChargeMatrix;
pub use params::{ClustererParams, Pass};
pub use peak::{Peak, PeakDetector};
pub use row::{cluster_row, find_clusters_in_row, process_rows, process_sector, RowClusters, RowWorkspace};
