use serde::{Deserialize, Serialize};
use tpccore::data::cluster::{Cluster, ClusterKind};

use crate::cluster::builder::{BuildOutcome, Rejection};
use crate::cluster::matrix::FillStats;
use crate::cluster::params::Pass;

/// Bookkeeping of one row (or, after [`RowDiagnostics::absorb`], of many rows).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RowDiagnostics {
    pub digits_filled: usize,
    pub digits_skipped: usize,

    pub peaks_first_pass: usize,
    pub peaks_second_pass: usize,

    pub simple: usize,
    pub unfolded: usize,
    pub edge: usize,
    pub rejected_narrow: usize,
    pub rejected_degenerate: usize,

    pub charge_in: f64,
    pub charge_clustered: f64,
    pub charge_residual: f64,
}

impl RowDiagnostics {
    pub fn record_fill(&mut self, stats: FillStats) {
        self.digits_filled += stats.filled;
        self.digits_skipped += stats.skipped;
    }

    /// Counts a peak and the way it was resolved.
    pub fn record(&mut self, pass: Pass, outcome: &BuildOutcome) {
        match pass {
            Pass::First => self.peaks_first_pass += 1,
            Pass::Second => self.peaks_second_pass += 1,
        }
        match outcome {
            BuildOutcome::Accepted(c) => {
                self.charge_clustered += c.charge as f64;
                match c.kind {
                    ClusterKind::Simple => self.simple += 1,
                    ClusterKind::Unfolded => self.unfolded += 1,
                    ClusterKind::Edge => self.edge += 1,
                }
            }
            BuildOutcome::Rejected(Rejection::TooNarrow) => self.rejected_narrow += 1,
            BuildOutcome::Rejected(Rejection::Degenerate) => self.rejected_degenerate += 1,
        }
    }

    /// Moves a cluster that turned out to touch the row boundary into the edge count.
    pub fn retag_edge(&mut self, before: ClusterKind, cluster: &Cluster) {
        if cluster.kind != ClusterKind::Edge || before == ClusterKind::Edge {
            return;
        }
        match before {
            ClusterKind::Simple => self.simple = self.simple.saturating_sub(1),
            ClusterKind::Unfolded => self.unfolded = self.unfolded.saturating_sub(1),
            ClusterKind::Edge => {}
        }
        self.edge += 1;
    }

    pub fn clusters(&self) -> usize {
        self.simple + self.unfolded + self.edge
    }

    pub fn rejected(&self) -> usize {
        self.rejected_narrow + self.rejected_degenerate
    }

    /// `charge_in − charge_clustered − charge_residual`; zero up to rounding.
    pub fn charge_balance(&self) -> f64 {
        self.charge_in - self.charge_clustered - self.charge_residual
    }

    pub fn absorb(&mut self, other: &RowDiagnostics) {
        self.digits_filled += other.digits_filled;
        self.digits_skipped += other.digits_skipped;
        self.peaks_first_pass += other.peaks_first_pass;
        self.peaks_second_pass += other.peaks_second_pass;
        self.simple += other.simple;
        self.unfolded += other.unfolded;
        self.edge += other.edge;
        self.rejected_narrow += other.rejected_narrow;
        self.rejected_degenerate += other.rejected_degenerate;
        self.charge_in += other.charge_in;
        self.charge_clustered += other.charge_clustered;
        self.charge_residual += other.charge_residual;
    }

    pub fn summary(&self) -> String {
        let peaks = self.peaks_first_pass + self.peaks_second_pass;
        let pct = if self.charge_in > 0.0 {
            self.charge_clustered / self.charge_in * 100.0
        } else {
            100.0
        };

        format!(
            "RowDiagnostics: {} clusters from {} peaks ({} + {}), {:.1}% of charge clustered\n\
             Digits: {} filled, {} skipped\n\
             Clusters by kind:\n\
             - simple: {}\n\
             - unfolded: {}\n\
             - edge: {}\n\
             Rejected peaks:\n\
             - too narrow: {}\n\
             - degenerate: {}\n\
             Charge: {:.1} in, {:.1} clustered, {:.1} residual",
            self.clusters(),
            peaks,
            self.peaks_first_pass,
            self.peaks_second_pass,
            pct,
            self.digits_filled,
            self.digits_skipped,
            self.simple,
            self.unfolded,
            self.edge,
            self.rejected_narrow,
            self.rejected_degenerate,
            self.charge_in,
            self.charge_clustered,
            self.charge_residual,
        )
    }
}
