use std::fmt;
use std::fmt::Formatter;
use serde::{Deserialize, Serialize};

/// How a cluster was reconstructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterKind {
    /// Shape matched the expected single-deposit spread; plain centre of gravity.
    Simple,
    /// Shape was too wide; charge shared with a neighbouring deposit was split off.
    Unfolded,
    /// Centroid touches the row boundary; position and charge are usable,
    /// shape statistics are advisory only.
    Edge,
}

impl fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClusterKind::Simple => "simple",
            ClusterKind::Unfolded => "unfolded",
            ClusterKind::Edge => "edge",
        };
        write!(f, "{}", name)
    }
}

/// A reconstructed charge cluster of one pad row.
///
/// `pad`, `time`, `sigma_pad2` and `sigma_time2` are in index units of the
/// unpadded readout grid. `y`, `z`, `sigma_y2` and `sigma_z2` are the same
/// quantities in local detector coordinates (cm), filled by the output
/// transformation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub sector: u32,
    pub row: u32,

    // index space
    pub pad: f32,
    pub time: f32,
    pub sigma_pad2: f32,
    pub sigma_time2: f32,

    // local coordinates
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub sigma_y2: f32,
    pub sigma_z2: f32,

    pub charge: f32,
    pub max_charge: u16,
    pub kind: ClusterKind,
    /// Fraction of the window charge assigned to a neighbouring deposit, in percent.
    pub overlap: u8,
    /// Scan pass that produced the cluster (1 or 2).
    pub pass: u8,
}

impl Cluster {
    /// Creates a cluster in index space; local coordinates start at zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use tpccore::data::cluster::{Cluster, ClusterKind};
    ///
    /// let c = Cluster::new(10.0, 20.0, 50.0, 0.3, 0.4, 50, ClusterKind::Simple);
    /// assert_eq!(c.kind, ClusterKind::Simple);
    /// assert_eq!(c.y, 0.0);
    /// ```
    pub fn new(
        pad: f32,
        time: f32,
        charge: f32,
        sigma_pad2: f32,
        sigma_time2: f32,
        max_charge: u16,
        kind: ClusterKind,
    ) -> Self {
        Cluster {
            sector: 0,
            row: 0,
            pad,
            time,
            sigma_pad2,
            sigma_time2,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            sigma_y2: 0.0,
            sigma_z2: 0.0,
            charge,
            max_charge,
            kind,
            overlap: 0,
            pass: 1,
        }
    }

    pub fn is_edge(&self) -> bool {
        self.kind == ClusterKind::Edge
    }

    /// Whether the shape statistics may be used for precision fits.
    pub fn has_reliable_shape(&self) -> bool {
        !self.is_edge()
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cluster(row: {}/{}, pad: {:.3}, time: {:.3}, q: {:.1}, kind: {}, overlap: {}%)",
            self.sector, self.row, self.pad, self.time, self.charge, self.kind, self.overlap
        )
    }
}
