//! Integration tests for the exhaustive control search and down-selection.

mod common;

use common::{Hydraulics, district, id, objectives, resilient};
use wp_network::LinkStatus;
use wp_search::{
    ConfigurationKind, ControlSearch, ControlSearchConfig, LabeledTable, SearchError, down_select,
};

#[test]
fn two_valves_produce_closed_open_and_eight_combinations() {
    let evaluator = resilient(Hydraulics::new());
    let search = ControlSearch::new(
        district(),
        "class1",
        vec![id("V1"), id("V2")],
        &evaluator,
        ControlSearchConfig::default(),
    )
    .unwrap();
    let table = search.run().unwrap();

    assert_eq!(table.rows.len(), 10);
    assert_eq!(table.rows[0].description, "all_closed");
    assert_eq!(table.rows[9].description, "all_open");
    assert!(
        table.rows[1..9]
            .iter()
            .all(|r| r.kind == ConfigurationKind::Combination)
    );
    // One benchmark evaluation plus one per row.
    assert_eq!(evaluator.inner().calls(), 11);
}

#[test]
fn open_all_combinations_can_be_included() {
    let evaluator = resilient(Hydraulics::new());
    let config = ControlSearchConfig {
        include_open_all_combinations: true,
        ..ControlSearchConfig::default()
    };
    let search =
        ControlSearch::new(district(), "class1", vec![id("V1"), id("V2")], &evaluator, config)
            .unwrap();
    let table = search.run().unwrap();
    assert_eq!(table.rows.len(), 16);
}

#[test]
fn closed_and_open_rows_evaluate_the_modified_network() {
    let evaluator = resilient(Hydraulics::new());
    let search = ControlSearch::new(
        district(),
        "class1",
        vec![id("V1"), id("V2")],
        &evaluator,
        ControlSearchConfig::default(),
    )
    .unwrap();
    let table = search.run().unwrap();

    let closed = &table.rows[0];
    let open = &table.rows[9];
    assert_ne!(closed.objectives, open.objectives);
    assert_eq!(open.objectives.get(wp_eval::ObjectiveId(3)), Some(0.4));

    let ranked = table.ranked();
    assert_eq!(ranked[0].description, "all_open");
    assert!(ranked.windows(2).all(|w| w[0].score <= w[1].score));
}

#[test]
fn base_network_is_left_untouched() {
    let evaluator = resilient(Hydraulics::new());
    let net = district();
    let search = ControlSearch::new(
        net.clone(),
        "class1",
        vec![id("V1")],
        &evaluator,
        ControlSearchConfig::default(),
    )
    .unwrap();
    let lattice = search.lattice();
    // One valve, two regimes: closed, night, morning, open.
    assert_eq!(lattice.len(), 4);

    let mut trial = net.clone();
    lattice[1]
        .apply(&mut trial, &[id("V1")], &ControlSearchConfig::default().regimes)
        .unwrap();
    assert_eq!(trial.controls_for(&id("V1")).count(), 1);
    assert_eq!(
        trial.valve(&id("V1")).unwrap().initial_status,
        LinkStatus::Closed
    );
    assert!(net.controls().is_empty());
}

#[test]
fn unknown_valve_is_rejected() {
    let evaluator = resilient(Hydraulics::new());
    let err = ControlSearch::new(
        district(),
        "class1",
        vec![id("P0")],
        &evaluator,
        ControlSearchConfig::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, SearchError::Network(_)));
}

#[test]
fn down_select_picks_best_rows_per_table() {
    let evaluator = resilient(Hydraulics::new());
    let table = ControlSearch::new(
        district(),
        "class1",
        vec![id("V1"), id("V2")],
        &evaluator,
        ControlSearchConfig::default(),
    )
    .unwrap()
    .run()
    .unwrap();

    let picked = down_select(
        &[LabeledTable {
            label: "y1",
            table: &table,
        }],
        &objectives(),
        3,
    );
    assert_eq!(picked.len(), 3);
    assert_eq!(picked[0].row.description, "all_open");
    assert_eq!(picked[0].position, 10);
    assert!(picked.iter().all(|s| s.group == "class1" && s.label == "y1"));
}
