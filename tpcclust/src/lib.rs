// src/lib.rs
pub mod cluster;

pub mod sim {
    pub mod deposit;
}

pub mod config;
pub mod error;

pub use cluster::params::ClustererParams;
pub use cluster::row::{cluster_row, process_rows, process_sector, RowClusters};
pub use error::ClusterError;
