use mi_explorer::core::{classify, classify_grid};
use mi_explorer::visualization::{encode_mi, encode_states};
use mi_explorer::{ExplorerError, MapError, MapInfo, MapStore, MiSurface, OccupancyState, RawMap};
use nalgebra::Point2;
use rstest::rstest;

#[rstest]
#[case(-1, 0.1, OccupancyState::Unknown)]
#[case(0, 0.1, OccupancyState::Free)]
#[case(39, 0.1, OccupancyState::Free)]
#[case(50, 0.1, OccupancyState::Unknown)]
#[case(61, 0.1, OccupancyState::Occupied)]
#[case(100, 0.1, OccupancyState::Occupied)]
#[case(49, 0.0, OccupancyState::Free)]
#[case(50, 0.0, OccupancyState::Unknown)]
#[case(51, 0.0, OccupancyState::Occupied)]
#[case(10, 0.45, OccupancyState::Unknown)]
fn classifies_raw_values(
    #[case] raw: i8,
    #[case] threshold: f64,
    #[case] expected: OccupancyState,
) {
    assert_eq!(classify(raw, threshold), expected);
}

#[test]
fn classification_keeps_map_metadata() {
    let info = MapInfo::new(3, 2, 0.05, Point2::new(-1.0, 2.0), "map").unwrap();
    let states = classify_grid(info.clone(), &[0, 100, -1, 50, 0, 0], 0.1).unwrap();
    assert_eq!(states.info(), &info);
    assert_eq!(states.get(1, 0), Some(&OccupancyState::Occupied));
    assert_eq!(states.get(2, 0), Some(&OccupancyState::Unknown));
    assert_eq!(states.get(1, 1), Some(&OccupancyState::Free));
}

#[test]
fn map_store_keeps_previous_map_on_bad_update() {
    let info = MapInfo::new(2, 2, 1.0, Point2::origin(), "map").unwrap();
    let mut store = MapStore::new(0.1);
    assert!(matches!(store.require(), Err(ExplorerError::NoMap)));

    store
        .update(&RawMap {
            info: info.clone(),
            data: vec![0, 0, 100, -1],
        })
        .unwrap();
    let rejected = store
        .update(&RawMap {
            info,
            data: vec![0; 3],
        })
        .unwrap();

    assert!(rejected.is_none());
    assert_eq!(store.counts(), (1, 1));
    assert_eq!(
        store.require().unwrap().data()[2],
        OccupancyState::Occupied
    );
}

#[test]
fn first_map_must_be_valid() {
    let info = MapInfo::new(2, 2, 1.0, Point2::origin(), "map").unwrap();
    let mut store = MapStore::new(0.1);
    let err = store.update(&RawMap { info, data: vec![] }).unwrap_err();
    assert!(matches!(
        err,
        ExplorerError::Map(MapError::SizeMismatch { expected: 4, actual: 0 })
    ));
}

#[test]
fn display_encodings() {
    let info = MapInfo::new(3, 1, 1.0, Point2::origin(), "map").unwrap();
    let states = classify_grid(info, &[0, -1, 100], 0.1).unwrap();
    assert_eq!(encode_states(&states), vec![0, 50, 100]);

    let mut mi = MiSurface::new(3);
    mi.accrue(1, 4.0);
    mi.accrue(2, 1.0);
    assert_eq!(encode_mi(&mi), vec![100, 0, 75]);
}
