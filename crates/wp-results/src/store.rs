//! Run storage API.
//!
//! Each run lives in `<root>/<run_id>/`:
//!
//! - `manifest.json`
//! - `checkpoint_<n>.json`, `evaluations_<n>.json` per greedy round
//! - `rounds.json`, `actions.json`, `summary.json`, `final_network.json`
//! - `controls_<group>.json` per searched valve group

use crate::types::{GreedySummary, RoundLog, RunManifest};
use crate::{ResultsError, ResultsResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use wp_network::Network;
use wp_search::{ActionRow, CandidateCheckpoint, ControlTable, GreedyOutcome, LedgerEntry, RoundRecord};

#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    fn write_json<T: Serialize + ?Sized>(&self, run_id: &str, file: &str, value: &T) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        fs::create_dir_all(&run_dir)?;
        let content = serde_json::to_string_pretty(value)?;
        fs::write(run_dir.join(file), content)?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, run_id: &str, file: &str) -> ResultsResult<T> {
        if !self.has_run(run_id) {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let path = self.run_dir(run_id).join(file);
        if !path.exists() {
            return Err(ResultsError::Missing {
                run_id: run_id.to_string(),
                what: file.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_manifest(&self, manifest: &RunManifest) -> ResultsResult<()> {
        self.write_json(&manifest.run_id, "manifest.json", manifest)
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        self.read_json(run_id, "manifest.json")
    }

    /// Persist one greedy round: its checkpoint and its evaluation rows.
    pub fn save_round(&self, run_id: &str, record: &RoundRecord) -> ResultsResult<()> {
        self.write_json(
            run_id,
            &format!("checkpoint_{}.json", record.round),
            &record.checkpoint,
        )?;
        self.write_json(
            run_id,
            &format!("evaluations_{}.json", record.round),
            &record.evaluations_snapshot,
        )
    }

    /// Persist the round log, action ledger, summary and final network of a finished run.
    pub fn save_greedy_outcome(&self, run_id: &str, outcome: &GreedyOutcome) -> ResultsResult<()> {
        let rounds: Vec<RoundLog> = outcome.rounds.iter().map(RoundLog::from).collect();
        self.write_json(run_id, "rounds.json", &rounds)?;
        self.write_json(run_id, "actions.json", &outcome.ledger)?;
        self.write_json(run_id, "summary.json", &GreedySummary::from(outcome))?;
        self.write_json(run_id, "final_network.json", &outcome.network)
    }

    pub fn load_rounds(&self, run_id: &str) -> ResultsResult<Vec<RoundLog>> {
        self.read_json(run_id, "rounds.json")
    }

    pub fn load_actions(&self, run_id: &str) -> ResultsResult<Vec<LedgerEntry>> {
        self.read_json(run_id, "actions.json")
    }

    pub fn load_summary(&self, run_id: &str) -> ResultsResult<GreedySummary> {
        self.read_json(run_id, "summary.json")
    }

    pub fn load_final_network(&self, run_id: &str) -> ResultsResult<Network> {
        self.read_json(run_id, "final_network.json")
    }

    pub fn load_evaluations(&self, run_id: &str, round: usize) -> ResultsResult<Vec<ActionRow>> {
        self.read_json(run_id, &format!("evaluations_{round}.json"))
    }

    pub fn load_checkpoint(&self, run_id: &str, round: usize) -> ResultsResult<CandidateCheckpoint> {
        self.read_json(run_id, &format!("checkpoint_{round}.json"))
    }

    /// The checkpoint of the last stored round, for resuming a later period.
    pub fn latest_checkpoint(&self, run_id: &str) -> ResultsResult<CandidateCheckpoint> {
        if !self.has_run(run_id) {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let mut last = None;
        for entry in fs::read_dir(self.run_dir(run_id))? {
            let name = entry?.file_name().to_string_lossy().to_string();
            let round = name
                .strip_prefix("checkpoint_")
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|n| n.parse::<usize>().ok());
            if let Some(round) = round {
                last = last.max(Some(round));
            }
        }
        match last {
            Some(round) => self.load_checkpoint(run_id, round),
            None => Err(ResultsError::Missing {
                run_id: run_id.to_string(),
                what: "checkpoint".to_string(),
            }),
        }
    }

    pub fn save_control_table(&self, run_id: &str, table: &ControlTable) -> ResultsResult<()> {
        self.write_json(run_id, &format!("controls_{}.json", table.group), table)
    }

    pub fn load_control_table(&self, run_id: &str, group: &str) -> ResultsResult<ControlTable> {
        self.read_json(run_id, &format!("controls_{group}.json"))
    }

    /// Manifests of every stored run that started from `network`.
    pub fn list_runs(&self, network: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.network == network
                {
                    runs.push(manifest);
                }
            }
        }
        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
