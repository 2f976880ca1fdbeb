//! Run execution and persistence service.

use std::time::Instant;
use wp_eval::{Evaluator, ObjectiveSet, ResilientEvaluator};
use wp_network::Network;
use wp_project::{RunConfig, ValveGroups, check_groups_against, validate_config, validate_groups};
use wp_results::{GreedySummary, RunManifest, RunStore, RunType, compute_run_id};
use wp_search::{
    ControlProgress, ControlSearch, ControlTable, GreedyOptimizer, LabeledTable, RoundRecord,
    Shortlisted, down_select,
};

use crate::error::{AppError, AppResult};
use crate::progress::{ControlSearchProgress, GreedyProgress, RunProgressEvent, RunStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Greedy,
    ControlSearch,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Return a stored run with the same id instead of running again.
    pub use_cache: bool,
    pub engine_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Request to run the greedy optimizer.
pub struct GreedyRequest<'a> {
    pub config: &'a RunConfig,
    pub network: &'a Network,
    pub store: &'a RunStore,
    /// Stored run whose last checkpoint seeds this one.
    pub resume_from: Option<&'a str>,
    pub options: RunOptions,
}

/// Request to search the control schedules of every valve group.
pub struct ControlSearchRequest<'a> {
    pub config: &'a RunConfig,
    pub network: &'a Network,
    pub groups: &'a ValveGroups,
    pub store: &'a RunStore,
    pub options: RunOptions,
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
}

#[derive(Debug, Clone)]
pub struct GreedyResponse {
    pub run: RunResponse,
    pub summary: GreedySummary,
}

#[derive(Debug, Clone)]
pub struct ControlSearchResponse {
    pub run: RunResponse,
    pub tables: Vec<ControlTable>,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    mode: RunMode,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    greedy: Option<GreedyProgress>,
    control: Option<ControlSearchProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            mode,
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            greedy,
            control,
        });
    }
}

fn stage(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    mode: RunMode,
    stage: RunStage,
    started: Instant,
    message: &str,
) {
    emit_progress(
        progress_cb,
        mode,
        stage,
        started,
        Some(message.to_string()),
        None,
        None,
    );
}

fn start_run(
    store: &RunStore,
    run_id: &str,
    network: &Network,
    config: &RunConfig,
    run_type: RunType,
    engine_version: &str,
) -> AppResult<RunManifest> {
    // Leftovers of an interrupted or uncached run with the same id.
    store.delete_run(run_id)?;
    let manifest = RunManifest {
        run_id: run_id.to_string(),
        network: network.name().to_string(),
        config_name: config.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        run_type,
        engine_version: engine_version.to_string(),
    };
    store.save_manifest(&manifest)?;
    Ok(manifest)
}

/// Run the greedy optimizer and persist its rounds.
pub fn run_greedy<E: Evaluator>(request: &GreedyRequest, evaluator: E) -> AppResult<GreedyResponse> {
    run_greedy_with_progress(request, evaluator, None)
}

/// Run the greedy optimizer, streaming progress events.
///
/// Each round's checkpoint and evaluation rows are stored as soon as the round
/// ends; the round log, ledger, summary and final network once the budget is spent.
pub fn run_greedy_with_progress<E: Evaluator>(
    request: &GreedyRequest,
    evaluator: E,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<GreedyResponse> {
    let started = Instant::now();
    let mode = RunMode::Greedy;
    let store = request.store;

    stage(&mut progress_cb, mode, RunStage::ValidatingConfig, started, "Validating configuration");
    validate_config(request.config)?;
    request.network.validate()?;

    let run_type = RunType::Greedy {
        budget: request.config.greedy.budget,
        resumed_from: request.resume_from.map(str::to_string),
    };
    let run_id = compute_run_id(
        request.config,
        request.network,
        &run_type,
        &request.options.engine_version,
    );

    stage(&mut progress_cb, mode, RunStage::CheckingCache, started, "Checking run store");
    if request.options.use_cache
        && store.has_run(&run_id)
        && let Ok(summary) = store.load_summary(&run_id)
    {
        stage(&mut progress_cb, mode, RunStage::LoadingCachedResult, started, "Loading stored run");
        let manifest = store.load_manifest(&run_id)?;
        stage(&mut progress_cb, mode, RunStage::Completed, started, "Completed");
        return Ok(GreedyResponse {
            run: RunResponse {
                run_id,
                manifest,
                loaded_from_cache: true,
            },
            summary,
        });
    }

    let checkpoint = match request.resume_from {
        Some(previous) => {
            stage(&mut progress_cb, mode, RunStage::LoadingCheckpoint, started, "Loading checkpoint");
            Some(store.latest_checkpoint(previous)?)
        }
        None => None,
    };

    let manifest = start_run(
        store,
        &run_id,
        request.network,
        request.config,
        run_type,
        &request.options.engine_version,
    )?;

    stage(&mut progress_cb, mode, RunStage::DerivingCatalog, started, "Deriving candidate catalog");
    let evaluator = ResilientEvaluator::new(
        evaluator,
        request.config.objectives.clone(),
        request.config.evaluation.clone(),
    );
    let mut optimizer = GreedyOptimizer::new(
        request.network.clone(),
        &evaluator,
        request.config.greedy.clone(),
        request.config.costs.clone(),
    )?;
    if let Some(checkpoint) = checkpoint {
        optimizer.resume_from(checkpoint);
    }
    tracing::info!(run_id = %run_id, budget = request.config.greedy.budget, "greedy run started");

    let budget = request.config.greedy.budget;
    let mut save_error = None;
    let mut on_round = |record: &RoundRecord| {
        if save_error.is_none()
            && let Err(err) = store.save_round(&run_id, record)
        {
            save_error = Some(err);
        }
        emit_progress(
            &mut progress_cb,
            mode,
            RunStage::Optimizing,
            started,
            Some(format!(
                "Round {} committed {} action(s)",
                record.round,
                record.actions.len()
            )),
            Some(GreedyProgress {
                round: record.round,
                evaluations: record.evaluations,
                actions: record.actions.len(),
                used_budget: record.used_budget,
                budget,
            }),
            None,
        );
    };
    let outcome = optimizer.run_with_progress(Some(&mut on_round))?;
    if let Some(err) = save_error {
        return Err(err.into());
    }

    stage(&mut progress_cb, mode, RunStage::SavingResults, started, "Saving run output");
    store.save_greedy_outcome(&run_id, &outcome)?;
    let summary = GreedySummary::from(&outcome);
    tracing::info!(
        run_id = %run_id,
        rounds = summary.rounds,
        actions = summary.actions,
        used_budget = summary.used_budget,
        "greedy run finished"
    );

    stage(&mut progress_cb, mode, RunStage::Completed, started, "Completed");
    Ok(GreedyResponse {
        run: RunResponse {
            run_id,
            manifest,
            loaded_from_cache: false,
        },
        summary,
    })
}

/// Search every valve group and persist one table per group.
pub fn run_control_search<E: Evaluator>(
    request: &ControlSearchRequest,
    evaluator: E,
) -> AppResult<ControlSearchResponse> {
    run_control_search_with_progress(request, evaluator, None)
}

pub fn run_control_search_with_progress<E: Evaluator>(
    request: &ControlSearchRequest,
    evaluator: E,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<ControlSearchResponse> {
    let started = Instant::now();
    let mode = RunMode::ControlSearch;
    let store = request.store;

    stage(&mut progress_cb, mode, RunStage::ValidatingConfig, started, "Validating configuration");
    validate_config(request.config)?;
    if request.groups.is_empty() {
        return Err(AppError::InvalidInput("no valve groups to search".to_string()));
    }
    validate_groups(request.groups)?;
    check_groups_against(request.groups, request.network)?;
    request.network.validate()?;

    let search_config = request.config.control_search.clone().unwrap_or_default();
    let names: Vec<String> = request.groups.iter().map(|(g, _)| g.to_string()).collect();
    let run_type = RunType::ControlSearch {
        groups: request.groups.clone(),
    };
    let run_id = compute_run_id(
        request.config,
        request.network,
        &run_type,
        &request.options.engine_version,
    );

    stage(&mut progress_cb, mode, RunStage::CheckingCache, started, "Checking run store");
    if request.options.use_cache && store.has_run(&run_id) {
        let stored: Result<Vec<ControlTable>, _> = names
            .iter()
            .map(|group| store.load_control_table(&run_id, group))
            .collect();
        if let Ok(tables) = stored {
            stage(&mut progress_cb, mode, RunStage::LoadingCachedResult, started, "Loading stored run");
            let manifest = store.load_manifest(&run_id)?;
            stage(&mut progress_cb, mode, RunStage::Completed, started, "Completed");
            return Ok(ControlSearchResponse {
                run: RunResponse {
                    run_id,
                    manifest,
                    loaded_from_cache: true,
                },
                tables,
            });
        }
    }

    let manifest = start_run(
        store,
        &run_id,
        request.network,
        request.config,
        run_type,
        &request.options.engine_version,
    )?;

    let evaluator = ResilientEvaluator::new(
        evaluator,
        request.config.objectives.clone(),
        request.config.evaluation.clone(),
    );
    let mut tables = Vec::with_capacity(names.len());
    for (group, valves) in request.groups.iter() {
        let search = ControlSearch::new(
            request.network.clone(),
            group,
            valves.to_vec(),
            &evaluator,
            search_config.clone(),
        )?;
        let mut on_step = |step: ControlProgress| {
            emit_progress(
                &mut progress_cb,
                mode,
                RunStage::SearchingControls,
                started,
                None,
                None,
                Some(ControlSearchProgress {
                    group: group.to_string(),
                    done: step.done,
                    total: step.total,
                    description: step.description,
                }),
            );
        };
        let table = search.run_with_progress(Some(&mut on_step))?;

        stage(&mut progress_cb, mode, RunStage::SavingResults, started, "Saving control table");
        store.save_control_table(&run_id, &table)?;
        tables.push(table);
    }

    stage(&mut progress_cb, mode, RunStage::Completed, started, "Completed");
    Ok(ControlSearchResponse {
        run: RunResponse {
            run_id,
            manifest,
            loaded_from_cache: false,
        },
        tables,
    })
}

/// The `n_best` configurations of `group` in each stored run, labelled by run id.
pub fn shortlist_controls(
    store: &RunStore,
    run_ids: &[&str],
    group: &str,
    objectives: &ObjectiveSet,
    n_best: usize,
) -> AppResult<Vec<Shortlisted>> {
    let tables = run_ids
        .iter()
        .map(|run_id| store.load_control_table(run_id, group))
        .collect::<Result<Vec<_>, _>>()?;
    let labeled: Vec<LabeledTable<'_>> = run_ids
        .iter()
        .zip(&tables)
        .map(|(&label, table)| LabeledTable { label, table })
        .collect();
    Ok(down_select(&labeled, objectives, n_best))
}

/// Manifests of the stored runs that started from `network`, oldest first.
pub fn list_runs(store: &RunStore, network: &str) -> AppResult<Vec<RunManifest>> {
    Ok(store.list_runs(network)?)
}
