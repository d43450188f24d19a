use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ScriptGen,
    Synthesis,
    Render,
    Archive,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Fatal,
    LogAndContinue,
}

impl Stage {
    pub fn policy(self) -> FailurePolicy {
        match self {
            Stage::ScriptGen | Stage::Synthesis | Stage::Render => FailurePolicy::Fatal,
            Stage::Archive | Stage::Upload => FailurePolicy::LogAndContinue,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ScriptGen => "script generation",
            Stage::Synthesis => "speech synthesis",
            Stage::Render => "render",
            Stage::Archive => "archive update",
            Stage::Upload => "upload",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("script generation failed: {0}")]
    ScriptGen(#[source] BoxError),
    #[error("speech synthesis failed: {0}")]
    Synthesis(#[source] BoxError),
    #[error("render failed: {0}")]
    Render(#[source] BoxError),
    #[error("archive update failed: {0}")]
    Archive(#[source] BoxError),
    #[error("upload failed: {0}")]
    Upload(#[source] BoxError),
}

impl StageError {
    pub fn new(stage: Stage, err: impl Into<BoxError>) -> Self {
        let err = err.into();
        match stage {
            Stage::ScriptGen => StageError::ScriptGen(err),
            Stage::Synthesis => StageError::Synthesis(err),
            Stage::Render => StageError::Render(err),
            Stage::Archive => StageError::Archive(err),
            Stage::Upload => StageError::Upload(err),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            StageError::ScriptGen(_) => Stage::ScriptGen,
            StageError::Synthesis(_) => Stage::Synthesis,
            StageError::Render(_) => Stage::Render,
            StageError::Archive(_) => Stage::Archive,
            StageError::Upload(_) => Stage::Upload,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.stage().policy() == FailurePolicy::Fatal
    }
}
