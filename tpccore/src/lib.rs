// data module
pub mod data {
    pub mod digit;
    pub mod cluster;
}

// geometry module
pub mod geometry {
    pub mod row;
    pub mod sigma;
}

pub mod error;

pub use data::cluster::{Cluster, ClusterKind};
pub use data::digit::{Digit, RowDigits};
pub use error::GeometryError;
pub use geometry::row::{RowGeometry, SectorSide};
pub use geometry::sigma::SigmaModel;
