//! Deterministic stand-in for the hydraulic scoring engine.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use wp_core::{ElementId, m, mm, to_mm};
use wp_eval::{
    EvalError, EvalResult, Evaluation, Evaluator, LeakSummary, ObjectiveDef, ObjectiveId,
    ObjectiveSet, ObjectiveVector, ResilientEvaluator, RetryPolicy, Sense,
};
use wp_network::{LinkStatus, Network, NetworkBuilder};

/// Objective 1 (maximised): mean pipe diameter / 800 mm.
/// Objective 2 (minimised): 0.1 per (l/s)/m of leak emitter coefficient.
///
/// Flows are the pipe diameter in mm plus 100 per (l/s)/m of leaks hosted on
/// the pipe; head loss is 10 / diameter in mm.
pub struct Hydraulics {
    calls: AtomicUsize,
    /// Calls after this many successes fail.
    fail_after: Option<usize>,
}

impl Hydraulics {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_after: None,
        }
    }

    pub fn failing_after(successes: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_after: Some(successes),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Evaluator for Hydraulics {
    fn evaluate(&self, networks: &[&Network]) -> EvalResult<Evaluation> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| n >= limit) {
            return Err(EvalError::simulation("hydraulics did not converge"));
        }
        let net = networks
            .first()
            .ok_or_else(|| EvalError::InvalidInput {
                what: "no network".into(),
            })?;

        let mut flows = BTreeMap::new();
        let mut headlosses = BTreeMap::new();
        let mut diameter_sum = 0.0;
        let mut pipe_count = 0.0;
        for pipe in net.pipes() {
            let d = to_mm(pipe.diameter);
            diameter_sum += d;
            pipe_count += 1.0;
            flows.insert(pipe.id.clone(), d);
            headlosses.insert(pipe.id.clone(), 10.0 / d);
        }

        let mut leaks = Vec::new();
        let mut leak_coefficient = 0.0;
        for leak in net.leaks() {
            let coefficient = leak.emitter_coefficient * 1000.0;
            leak_coefficient += coefficient;
            if let Some(flow) = flows.get_mut(&leak.host_link) {
                *flow += 100.0 * coefficient;
            }
            let origin = net
                .pipe(&leak.host_link)
                .map(|p| p.origin.clone())
                .unwrap_or_else(|| leak.host_link.clone());
            leaks.push(LeakSummary {
                leak_id: leak.id.clone(),
                pipe: origin,
                link: leak.host_link.clone(),
                total_water_loss: coefficient * 10.0,
                total_cost: 1_000.0,
            });
        }

        let open_valves = net
            .valves()
            .filter(|v| v.initial_status == LinkStatus::Open)
            .count() as f64;
        let mean_diameter = if pipe_count > 0.0 {
            diameter_sum / pipe_count
        } else {
            0.0
        };
        let objectives = ObjectiveVector::from([
            (1, (mean_diameter / 800.0).min(1.0)),
            (2, (0.1 * leak_coefficient).min(1.0)),
            (3, (0.2 * open_valves + 0.05 * net.controls().len() as f64).min(1.0)),
        ]);

        Ok(Evaluation {
            objectives,
            flows,
            pressures: BTreeMap::new(),
            headlosses,
            leaks,
            total_demand: 10.0,
            total_supply: 10.0 + leak_coefficient,
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

pub fn resilient(hydraulics: Hydraulics) -> ResilientEvaluator<Hydraulics> {
    ResilientEvaluator::new(hydraulics, objectives(), RetryPolicy::default())
}

/// R --P0--> A --P1--> sp_1 --P1_1--> B, with Leak_1 on P1.
///
/// P0 is wide and loses little head; P1 is narrow.
pub fn one_pipe_one_leak() -> Network {
    let mut b = NetworkBuilder::new("one-pipe-one-leak");
    b.add_reservoir("R", m(40.0));
    b.add_junction("A", m(0.0));
    b.add_junction("sp_1", m(0.0));
    b.add_junction("B", m(0.0));
    b.add_pipe("P0", "R", "A", m(10.0), mm(300.0), 110.0);
    b.add_pipe_segment("P1", "P1", "A", "sp_1", m(25.0), mm(100.0), 100.0);
    b.add_pipe_segment("P1_1", "P1", "sp_1", "B", m(25.0), mm(100.0), 100.0);
    b.add_leak("Leak_1", "LeakPipe_1", "sp_1", "P1", 0.002);
    b.build().expect("valid network")
}

/// Three narrow pipes, two of them leaking, plus a group of two valves.
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

pub fn id(s: &str) -> ElementId {
    ElementId::from(s)
}
