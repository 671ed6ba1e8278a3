mod common;

use approx::assert_relative_eq;
use common::{gaussian_row, grid_peak, test_geometry};
use tpccore::data::cluster::ClusterKind;
use tpccore::data::digit::{Digit, RowDigits};
use tpccore::geometry::row::RowGeometry;
use tpcclust::cluster::params::{ClustererParams, Pass};
use tpcclust::cluster::peak::PeakDetector;
use tpcclust::cluster::row::{cluster_row, find_clusters_in_row, RowWorkspace};

#[test]
fn gaussian_deposit_gives_one_simple_cluster_at_its_centre() {
    let _ = env_logger::builder().is_test(true).try_init();
    let g = test_geometry(60, 100);
    let (row, _) = gaussian_row(&g, &[(20.25, 30.0, 20000.0)]);

    let out = cluster_row(&row, &ClustererParams::default()).unwrap();
    assert_eq!(out.clusters.len(), 1);
    let c = &out.clusters[0];
    assert_eq!(c.kind, ClusterKind::Simple);
    assert!((c.pad - 20.25).abs() < 0.05, "pad centroid {}", c.pad);
    assert!((c.time - 30.0).abs() < 0.05, "time centroid {}", c.time);
    assert_relative_eq!(c.charge as f64, out.diagnostics.charge_in, max_relative = 1e-4);
}

#[test]
fn deposit_wider_than_the_window_gives_one_cluster() {
    let g = RowGeometry::default();
    let model = g.sigma_model();
    for time in [20.4, 150.0, 400.3, 800.6, 990.2] {
        // the time spread exceeds the 5×5 window for most of the drift
        assert!(model.expected_time_variance(time) > 1.0);

        let (row, _) = gaussian_row(&g, &[(30.3, time, 1500.0)]);
        let mut ws = RowWorkspace::new();
        let out = find_clusters_in_row(&row, &ClustererParams::default(), &mut ws).unwrap();
        assert_eq!(out.clusters.len(), 1, "deposit at time {}: {:?}", time, out.clusters);

        let c = &out.clusters[0];
        assert_ne!(c.kind, ClusterKind::Edge);
        assert!((c.pad - 30.3).abs() < 0.35, "pad centroid {} at time {}", c.pad, time);
        assert!((c.time - time).abs() < 0.5, "time centroid {} at time {}", c.time, time);
        // the tails beyond the window stay in the residual
        assert!(ws.matrix().residual_total() > 0.0);
        assert!(ws.matrix().residual_min() >= 0.0);
    }
}

#[test]
fn isolated_digit_in_large_row() {
    let g = RowGeometry { pad_count: 200, time_count: 200, ..Default::default() };
    let row = RowDigits::new(0, 0, g, vec![Digit::new(10, 20, 50)]);

    let out = cluster_row(&row, &ClustererParams::default()).unwrap();
    assert_eq!(out.clusters.len(), 1);
    let c = &out.clusters[0];
    assert_eq!(c.kind, ClusterKind::Simple);
    assert_relative_eq!(c.charge, 50.0, epsilon = 1e-3);
    assert_relative_eq!(c.pad, 10.0, epsilon = 1e-3);
    assert_relative_eq!(c.time, 20.0, epsilon = 1e-3);
    assert_eq!(c.max_charge, 50);
}

#[test]
fn two_overlapping_peaks_are_unfolded() {
    let g = test_geometry(30, 60);
    let mut digits = grid_peak(10, 20);
    digits.extend(grid_peak(12, 20));
    let row = RowDigits::new(0, 0, g, digits);
    let input = row.total_charge() as f32;

    let mut ws = RowWorkspace::new();
    let out = find_clusters_in_row(&row, &ClustererParams::default(), &mut ws).unwrap();
    assert_eq!(out.clusters.len(), 2);
    assert!(out.clusters.iter().all(|c| c.kind == ClusterKind::Unfolded));

    let charge: f32 = out.clusters.iter().map(|c| c.charge).sum();
    assert_relative_eq!(charge, input, max_relative = 1e-4);

    let (a, b) = (&out.clusters[0], &out.clusters[1]);
    assert!((a.pad - 10.0).abs() < (a.pad - 12.0).abs(), "first centroid {}", a.pad);
    assert!((b.pad - 12.0).abs() < (b.pad - 10.0).abs(), "second centroid {}", b.pad);
    assert!(a.overlap > 0 && b.overlap > 0);
    assert!(ws.matrix().residual_min() >= 0.0);
}

#[test]
fn peak_next_to_the_pad_boundary_is_edge() {
    let g = test_geometry(30, 60);
    let row = RowDigits::new(0, 0, g, vec![Digit::new(1, 20, 50), Digit::new(15, 0, 50)]);

    let out = cluster_row(&row, &ClustererParams::default()).unwrap();
    assert_eq!(out.clusters.len(), 2);
    assert!(out.clusters.iter().all(|c| c.kind == ClusterKind::Edge));
    assert!(out.clusters.iter().all(|c| !c.has_reliable_shape()));
    assert_relative_eq!(out.clusters[0].pad, 1.0, epsilon = 1e-3);
    assert_eq!(out.diagnostics.edge, 2);
    assert_eq!(out.diagnostics.simple, 0);
}

#[test]
fn local_position_follows_pad_pitch_exactly() {
    let g = RowGeometry { apply_delay_correction: false, time_offset_bins: 0.0, ..test_geometry(60, 100) };
    let (row, _) = gaussian_row(&g, &[(20.4, 30.0, 5000.0), (40.0, 60.0, 3000.0)]);

    let out = cluster_row(&row, &ClustererParams::default()).unwrap();
    assert_eq!(out.clusters.len(), 2);
    for c in &out.clusters {
        assert_eq!(c.y, (c.pad - g.pad_center_offset()) * g.pad_pitch_width);
        assert_eq!(c.z, g.z_length - g.z_width * c.time);
        assert_eq!(c.x, g.row_radius);
    }
}

#[test]
fn rescan_after_clustering_finds_nothing() {
    let g = test_geometry(60, 120);
    let (row, _) = gaussian_row(
        &g,
        &[(10.0, 20.0, 3000.0), (30.3, 50.0, 800.0), (45.0, 90.6, 1500.0), (20.0, 100.0, 400.0)],
    );
    let params = ClustererParams::default();
    let mut ws = RowWorkspace::new();
    let out = find_clusters_in_row(&row, &params, &mut ws).unwrap();
    assert_eq!(out.clusters.len(), 4);
    assert_eq!(out.diagnostics.rejected(), 0);

    for pass in [Pass::First, Pass::Second] {
        let detector = PeakDetector::new(&g, &params, pass);
        assert!(detector.scan(ws.matrix()).is_empty());
    }
}

#[test]
fn second_pass_picks_up_small_wide_peaks_and_rejects_spikes() {
    let g = test_geometry(60, 100);
    let digits = vec![
        // wide enough: accepted on the second pass
        Digit::new(30, 40, 7),
        Digit::new(29, 40, 3),
        Digit::new(31, 40, 3),
        Digit::new(30, 39, 3),
        Digit::new(30, 41, 3),
        // single-sample spike
        Digit::new(10, 70, 7),
    ];
    let row = RowDigits::new(0, 0, g.clone(), digits);

    let out = cluster_row(&row, &ClustererParams::default()).unwrap();
    assert_eq!(out.clusters.len(), 1);
    let c = &out.clusters[0];
    assert_eq!(c.pass, 2);
    assert_eq!(c.kind, ClusterKind::Simple);
    assert_relative_eq!(c.charge, 19.0);
    assert_eq!(out.diagnostics.peaks_first_pass, 0);
    assert_eq!(out.diagnostics.peaks_second_pass, 2);
    assert_eq!(out.diagnostics.rejected_narrow, 1);

    let single = ClustererParams { second_pass: false, ..Default::default() };
    let out = cluster_row(&RowDigits::new(0, 0, g, row.digits.clone()), &single).unwrap();
    assert!(out.clusters.is_empty());
}

#[test]
fn strict_preset_drops_isolated_samples() {
    let g = test_geometry(60, 100);
    let row = RowDigits::new(0, 0, g, vec![Digit::new(20, 40, 50)]);
    assert_eq!(cluster_row(&row, &ClustererParams::default()).unwrap().clusters.len(), 1);
    assert!(cluster_row(&row, &ClustererParams::strict()).unwrap().clusters.is_empty());
}
