use crate::run_service::RunMode;

#[derive(Debug, Clone, PartialEq)]
pub enum RunStage {
    ValidatingConfig,
    CheckingCache,
    LoadingCachedResult,
    LoadingCheckpoint,
    DerivingCatalog,
    Optimizing,
    SearchingControls,
    SavingResults,
    Completed,
}

#[derive(Debug, Clone, Default)]
pub struct GreedyProgress {
    pub round: usize,
    pub evaluations: usize,
    pub actions: usize,
    pub used_budget: f64,
    pub budget: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ControlSearchProgress {
    pub group: String,
    pub done: usize,
    pub total: usize,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub mode: RunMode,
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub greedy: Option<GreedyProgress>,
    pub control: Option<ControlSearchProgress>,
}

impl RunProgressEvent {
    pub fn stage(
        mode: RunMode,
        stage: RunStage,
        elapsed_wall_s: f64,
        message: Option<String>,
    ) -> Self {
        Self {
            mode,
            stage,
            elapsed_wall_s,
            message,
            greedy: None,
            control: None,
        }
    }
}
