mod common;

use common::{free_belief, ScriptedOracle};
use mi_explorer::core::classify_grid;
use mi_explorer::navigation::SweepOutcome;
use mi_explorer::{
    Belief, CancelToken, MapInfo, MiSurface, RayOracle, RayOracleConfig, SweepController,
};
use nalgebra::Point2;
use rstest::rstest;

/// 6x6 room: free centre, walls on the border, unknown right half.
fn room() -> Belief {
    #[rustfmt::skip]
    let raw: Vec<i8> = vec![
        100, 100, 100, 100, 100, 100,
        100,   0,   0,  -1,  -1, 100,
        100,   0,   0,  -1,  -1, 100,
        100,   0,   0,  -1,  -1, 100,
        100,   0,   0,  -1,  -1, 100,
        100, 100, 100, 100, 100, 100,
    ];
    let info = MapInfo::new(6, 6, 0.1, Point2::origin(), "map").unwrap();
    Belief::from_classification(classify_grid(info, &raw, 0.1).unwrap())
}

#[rstest]
#[case(1, 1)]
#[case(4, 2)]
#[case(16, 8)]
fn discretized_sweep_samples_every_pair(#[case] angular: usize, #[case] spatial: usize) {
    let oracle = ScriptedOracle::new(vec![]);
    let belief = free_belief(4);
    let mut mi = MiSurface::new(16);
    let mut headings = 0;

    let outcome = SweepController::discretized(angular, spatial)
        .run(&oracle, &belief, &mut mi, &CancelToken::new(), &mut |_| headings += 1)
        .unwrap();

    assert_eq!(outcome, SweepOutcome::Complete { samples: angular * spatial });
    assert_eq!(oracle.accrue_calls.get(), angular * spatial);
    assert_eq!(headings, angular);
}

#[test]
fn surface_never_decreases_during_sweep() {
    let oracle = RayOracle::new(RayOracleConfig::default());
    let belief = room();
    let mut mi = MiSurface::new(36);
    let mut snapshots: Vec<Vec<f64>> = Vec::new();

    SweepController::discretized(8, 4)
        .run(&oracle, &belief, &mut mi, &CancelToken::new(), &mut |mi: &MiSurface| {
            snapshots.push(mi.values().to_vec())
        })
        .unwrap();

    for pair in snapshots.windows(2) {
        assert!(pair[0].iter().zip(&pair[1]).all(|(a, b)| b >= a));
    }
    assert!(mi.max() > 0.0);
}

#[test]
fn repeated_sweeps_are_idempotent() {
    let oracle = RayOracle::new(RayOracleConfig::default());
    let belief = room();
    let sweep = SweepController::discretized(8, 4);
    let mut mi = MiSurface::new(36);

    sweep
        .run(&oracle, &belief, &mut mi, &CancelToken::new(), &mut |_| {})
        .unwrap();
    let first = mi.values().to_vec();
    sweep
        .run(&oracle, &belief, &mut mi, &CancelToken::new(), &mut |_| {})
        .unwrap();

    assert_eq!(mi.values(), first.as_slice());
}

#[test]
fn continuous_sweep_finishes_every_beam() {
    let oracle = ScriptedOracle::new(vec![]);
    let belief = free_belief(3);
    let mut mi = MiSurface::new(9);
    let mut headings = 0;

    let outcome = SweepController::continuous(10)
        .run(&oracle, &belief, &mut mi, &CancelToken::new(), &mut |_| headings += 1)
        .unwrap();

    // The stub needs two calls per beam before its cursor wraps
    assert_eq!(outcome, SweepOutcome::Complete { samples: 20 });
    assert_eq!(headings, 10);
    assert_eq!(mi.values()[0], 20.0);
}

#[test]
fn continuous_sweep_with_ray_oracle_finds_frontier() {
    let oracle = RayOracle::new(RayOracleConfig::default());
    let belief = room();
    let mut mi = MiSurface::new(36);

    let outcome = SweepController::continuous(64)
        .run(&oracle, &belief, &mut mi, &CancelToken::new(), &mut |_| {})
        .unwrap();

    assert!(outcome.is_complete());
    let frontier = belief.info().index(2, 2).unwrap();
    assert!(mi.values()[frontier] > 0.0);
    assert!(mi.values().iter().all(|v| v.is_finite()));
}

#[test]
fn cancelled_sweep_leaves_no_partial_surface() {
    let oracle = RayOracle::new(RayOracleConfig::default());
    let belief = room();
    let cancel = CancelToken::new();
    let mut mi = MiSurface::new(36);
    let mut headings = 0;

    let outcome = SweepController::discretized(8, 4)
        .run(&oracle, &belief, &mut mi, &cancel, &mut |_| {
            headings += 1;
            if headings == 3 {
                cancel.cancel();
            }
        })
        .unwrap();

    assert_eq!(outcome, SweepOutcome::Cancelled { samples: 12 });
    assert_eq!(mi.max(), 0.0);
}
