use log::debug;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tpccore::data::cluster::Cluster;
use tpccore::data::digit::RowDigits;

use crate::cluster::builder::{BuildOutcome, ClusterBuilder};
use crate::cluster::diagnostics::RowDiagnostics;
use crate::cluster::matrix::ChargeMatrix;
use crate::cluster::params::{ClustererParams, Pass};
use crate::cluster::peak::PeakDetector;
use crate::cluster::transform::OutputTransformer;
use crate::error::{ClusterError, Result};

/// Per-worker scratch storage, reused for every row the worker processes.
#[derive(Debug, Default)]
pub struct RowWorkspace {
    matrix: ChargeMatrix,
}

impl RowWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge matrix of the last processed row, with its residual after clustering.
    pub fn matrix(&self) -> &ChargeMatrix {
        &self.matrix
    }
}

/// Clusters of one pad row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowClusters {
    pub sector: u32,
    pub row: u32,
    pub clusters: Vec<Cluster>,
    pub diagnostics: RowDiagnostics,
}

/// Runs the cluster finder on one row.
///
/// Each pass scans the residual buffer once; a peak is built and its charge
/// subtracted as soon as it is found, so later cells of the same scan already
/// see the reduced residual.
///
/// # Arguments
///
/// * `row` - digits and geometry of the row
/// * `params` - clusterer tuning
/// * `workspace` - scratch storage, reset for this row
///
/// # Returns
///
/// * the clusters in scan order, with local coordinates filled in
pub fn find_clusters_in_row(
    row: &RowDigits,
    params: &ClustererParams,
    workspace: &mut RowWorkspace,
) -> Result<RowClusters> {
    let geometry = &row.geometry;
    geometry.validate().map_err(|source| ClusterError::InvalidGeometry {
        sector: row.sector,
        row: row.row,
        source,
    })?;

    let matrix = &mut workspace.matrix;
    matrix.reset(geometry.pad_count as usize, geometry.time_count as usize);

    let mut diagnostics = RowDiagnostics::default();
    diagnostics.record_fill(matrix.fill(&row.digits));
    diagnostics.charge_in = matrix.original_total();
    if row.is_empty() {
        debug!("sector {} row {}: no digits", row.sector, row.row);
        return Ok(RowClusters { sector: row.sector, row: row.row, clusters: Vec::new(), diagnostics });
    }

    let transformer = OutputTransformer::new(geometry, row.sector, row.row);
    let mut clusters = Vec::new();

    let passes: &[Pass] = if params.second_pass { &[Pass::First, Pass::Second] } else { &[Pass::First] };
    for &pass in passes {
        let detector = PeakDetector::new(geometry, params, pass);
        let builder = ClusterBuilder::new(geometry, params, pass);

        for (pad, time) in detector.cells() {
            let Some(peak) = detector.peak_at(matrix, pad, time) else { continue };
            let outcome = builder.build(matrix, peak);
            diagnostics.record(pass, &outcome);

            if let BuildOutcome::Accepted(mut cluster) = outcome {
                let kind = cluster.kind;
                transformer.apply(&mut cluster);
                diagnostics.retag_edge(kind, &cluster);
                clusters.push(cluster);
            }
        }
    }

    diagnostics.charge_residual = matrix.residual_total();
    debug!(
        "sector {} row {}: {} digits, {} clusters ({} simple, {} unfolded, {} edge), {} rejected",
        row.sector,
        row.row,
        diagnostics.digits_filled,
        clusters.len(),
        diagnostics.simple,
        diagnostics.unfolded,
        diagnostics.edge,
        diagnostics.rejected()
    );

    Ok(RowClusters { sector: row.sector, row: row.row, clusters, diagnostics })
}

/// Single-row convenience with a fresh workspace.
pub fn cluster_row(row: &RowDigits, params: &ClustererParams) -> Result<RowClusters> {
    find_clusters_in_row(row, params, &mut RowWorkspace::new())
}

/// Runs the cluster finder on independent rows in parallel.
///
/// Results keep the order of `rows`. Every worker reuses one
/// [`RowWorkspace`]; with `params.num_threads > 0` the rows run in a dedicated
/// pool of that size, otherwise in the global rayon pool.
pub fn process_rows(rows: &[RowDigits], params: &ClustererParams) -> Result<Vec<RowClusters>> {
    let run = || {
        rows.par_iter()
            .map_init(RowWorkspace::new, |workspace, row| find_clusters_in_row(row, params, workspace))
            .collect::<Result<Vec<_>>>()
    };

    if params.num_threads > 0 {
        let thread_pool = ThreadPoolBuilder::new().num_threads(params.num_threads).build()?;
        thread_pool.install(run)
    } else {
        run()
    }
}

/// Like [`process_rows`], with the results ordered by sector and row.
pub fn process_sector(rows: &[RowDigits], params: &ClustererParams) -> Result<Vec<RowClusters>> {
    let mut results = process_rows(rows, params)?;
    results.sort_by_key(|r| (r.sector, r.row));
    Ok(results)
}

/// Diagnostics of all rows summed.
pub fn total_diagnostics(results: &[RowClusters]) -> RowDiagnostics {
    results.iter().fold(RowDiagnostics::default(), |mut acc, r| {
        acc.absorb(&r.diagnostics);
        acc
    })
}
