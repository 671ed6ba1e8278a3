use tpccore::data::cluster::{Cluster, ClusterKind};
use tpccore::geometry::row::RowGeometry;

/// Cells from the row boundary within which a cluster is tagged [`ClusterKind::Edge`].
pub const EDGE_MARGIN: i64 = 1;

/// Maps index-space clusters of one row into local detector coordinates.
#[derive(Clone, Copy, Debug)]
pub struct OutputTransformer {
    sector: u32,
    row: u32,
    pad_count: u32,
    time_count: u32,
    pad_pitch: f32,
    pad_centre: f32,
    z_width: f32,
    z_length: f32,
    delay: f32,
    side_sign: f32,
    row_radius: f32,
}

impl OutputTransformer {
    pub fn new(geometry: &RowGeometry, sector: u32, row: u32) -> Self {
        OutputTransformer {
            sector,
            row,
            pad_count: geometry.pad_count,
            time_count: geometry.time_count,
            pad_pitch: geometry.pad_pitch_width,
            pad_centre: geometry.pad_center_offset(),
            z_width: geometry.z_width,
            z_length: geometry.z_length,
            delay: geometry.delay_correction(),
            side_sign: geometry.side.sign(),
            row_radius: geometry.row_radius,
        }
    }

    /// Local y (cm) of a pad centroid.
    #[inline]
    pub fn local_y(&self, pad: f32) -> f32 {
        (pad - self.pad_centre) * self.pad_pitch
    }

    /// Local z (cm) of a time centroid, signed by the side of the readout plane.
    #[inline]
    pub fn local_z(&self, time: f32) -> f32 {
        let drift = self.z_width * time + self.delay;
        self.side_sign * (self.z_length - drift)
    }

    /// Whether a centroid lies on the outermost cells of the row.
    pub fn touches_edge(&self, pad: f32, time: f32) -> bool {
        let p = pad.round() as i64;
        let t = time.round() as i64;
        p <= EDGE_MARGIN
            || p >= self.pad_count as i64 - 1 - EDGE_MARGIN
            || t <= EDGE_MARGIN
            || t >= self.time_count as i64 - 1 - EDGE_MARGIN
    }

    /// Fills the local coordinates of `cluster` and re-tags edge clusters.
    pub fn apply(&self, cluster: &mut Cluster) {
        cluster.sector = self.sector;
        cluster.row = self.row;

        let pad_max = self.pad_count.saturating_sub(1) as f32;
        let time_max = self.time_count.saturating_sub(1) as f32;
        cluster.pad = cluster.pad.clamp(0.0, pad_max);
        cluster.time = cluster.time.clamp(0.0, time_max);

        cluster.x = self.row_radius;
        cluster.y = self.local_y(cluster.pad);
        cluster.z = self.local_z(cluster.time);
        cluster.sigma_y2 = cluster.sigma_pad2 * self.pad_pitch * self.pad_pitch;
        cluster.sigma_z2 = cluster.sigma_time2 * self.z_width * self.z_width;

        if self.touches_edge(cluster.pad, cluster.time) {
            cluster.kind = ClusterKind::Edge;
        }
    }
}
