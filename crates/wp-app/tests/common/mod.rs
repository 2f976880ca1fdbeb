//! Fake scoring engine and a small district network.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use wp_core::{ElementId, m, mm, to_mm};
use wp_eval::{
    EvalResult, Evaluation, Evaluator, LeakSummary, ObjectiveDef, ObjectiveId, ObjectiveSet,
    ObjectiveVector, Sense,
};
use wp_network::{LinkStatus, Network, NetworkBuilder};
use wp_project::{RunConfig, ValveGroups};
use wp_results::RunStore;

/// Objective 1 (max): mean pipe diameter / 800 mm.
/// Objective 2 (min): 0.1 per (l/s)/m of leak coefficient.
/// Objective 3 (max): 0.2 per open valve plus 0.05 per control rule.
#[derive(Default)]
pub struct Hydraulics {
    calls: AtomicUsize,
}

impl Hydraulics {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Evaluator for Hydraulics {
    fn evaluate(&self, networks: &[&Network]) -> EvalResult<Evaluation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let net = networks[0];

        let mut flows = BTreeMap::new();
        let mut headlosses = BTreeMap::new();
        let mut diameter_sum = 0.0;
        let mut count = 0.0;
        for pipe in net.pipes() {
            let d = to_mm(pipe.diameter);
            diameter_sum += d;
            count += 1.0;
            flows.insert(pipe.id.clone(), d);
            headlosses.insert(pipe.id.clone(), 10.0 / d);
        }

        let mut leaks = Vec::new();
        let mut coefficient_sum = 0.0;
        for leak in net.leaks() {
            let c = leak.emitter_coefficient * 1000.0;
            coefficient_sum += c;
            if let Some(flow) = flows.get_mut(&leak.host_link) {
                *flow += 100.0 * c;
            }
            let origin = net
                .pipe(&leak.host_link)
                .map(|p| p.origin.clone())
                .unwrap_or_else(|| leak.host_link.clone());
            leaks.push(LeakSummary {
                leak_id: leak.id.clone(),
                pipe: origin,
                link: leak.host_link.clone(),
                total_water_loss: c * 10.0,
                total_cost: 1_000.0,
            });
        }

        let open = net
            .valves()
            .filter(|v| v.initial_status == LinkStatus::Open)
            .count() as f64;
        let mean = if count > 0.0 { diameter_sum / count } else { 0.0 };
        let objectives = ObjectiveVector::from([
            (1, (mean / 800.0).min(1.0)),
            (2, (0.1 * coefficient_sum).min(1.0)),
            (3, (0.2 * open + 0.05 * net.controls().len() as f64).min(1.0)),
        ]);

        Ok(Evaluation {
            objectives,
            flows,
            pressures: BTreeMap::new(),
            headlosses,
            leaks,
            total_demand: 10.0,
            total_supply: 10.0 + coefficient_sum,
        })
    }
}

pub fn objectives() -> ObjectiveSet {
    ObjectiveSet::new(vec![
        ObjectiveDef {
            id: ObjectiveId(1),
            sense: Sense::Maximize,
        },
        ObjectiveDef {
            id: ObjectiveId(2),
            sense: Sense::Minimize,
        },
        ObjectiveDef {
            id: ObjectiveId(3),
            sense: Sense::Maximize,
        },
    ])
}

pub fn config(budget: f64) -> RunConfig {
    let mut config = RunConfig::new("district-test");
    config.objectives = objectives();
    config.greedy.budget = budget;
    config.greedy.actions_ratio = 0.0;
    config.greedy.loss_threshold = 0.05;
    config.greedy.n_leaks = 10;
    config.greedy.reevaluate_ratio = 0.5;
    config.greedy.total_run_time_h = 0.001;
    config
}

pub fn district() -> Network {
    let mut b = NetworkBuilder::new("district");
    b.add_reservoir("R", m(50.0));
    for j in ["A", "B", "C", "D", "sp_1", "sp_2"] {
        b.add_junction(j, m(0.0));
    }
    b.add_pipe("P0", "R", "A", m(10.0), mm(400.0), 110.0);
    b.add_pipe_segment("P1", "P1", "A", "sp_1", m(40.0), mm(100.0), 90.0);
    b.add_pipe_segment("P1_1", "P1", "sp_1", "B", m(60.0), mm(100.0), 90.0);
    b.add_pipe_segment("P2", "P2", "B", "sp_2", m(30.0), mm(75.0), 90.0);
    b.add_pipe_segment("P2_1", "P2", "sp_2", "C", m(30.0), mm(75.0), 90.0);
    b.add_pipe("P3", "C", "D", m(80.0), mm(150.0), 100.0);
    b.add_leak("Leak_1", "LeakPipe_1", "sp_1", "P1", 0.003);
    b.add_leak("Leak_2", "LeakPipe_2", "sp_2", "P2_1", 0.001);
    b.add_valve("V1", "B", "D", mm(100.0), LinkStatus::Closed);
    b.add_valve("V2", "D", "A", mm(100.0), LinkStatus::Closed);
    b.build().expect("valid network")
}

pub fn groups() -> ValveGroups {
    ValveGroups::from([
        ("class1", vec![ElementId::from("V1"), ElementId::from("V2")]),
        ("class2", vec![ElementId::from("V2")]),
    ])
}

pub fn temp_store(prefix: &str) -> RunStore {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir: PathBuf = std::env::temp_dir().join(format!("{prefix}_{nanos}"));
    RunStore::new(dir).expect("failed to create run store")
}
