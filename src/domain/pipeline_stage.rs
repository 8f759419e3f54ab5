use std::fmt;

/// Step of the pipeline a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    GetInputData,
    ExtractStructure,
    GenerateProblem,
    SaveResult,
    UpdateStatusCompleted,
    Reconcile,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::GetInputData => "get_input_data",
            PipelineStage::ExtractStructure => "extract_structure",
            PipelineStage::GenerateProblem => "generate_problem",
            PipelineStage::SaveResult => "save_result",
            PipelineStage::UpdateStatusCompleted => "update_status_completed",
            PipelineStage::Reconcile => "reconcile",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single message recorded on a failed job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed at stage '{stage}': {cause}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub cause: String,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, cause: impl fmt::Display) -> Self {
        Self {
            stage,
            cause: cause.to_string(),
        }
    }
}
