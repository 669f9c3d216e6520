use thiserror::Error;

use super::context::PipelineError;

/// Failures that abort startup. Nothing is retried.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("No suitable physical device found.")]
    NoPhysicalDevice,

    #[error("Unsupported windowing platform.")]
    UnsupportedPlatform,

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl SetupError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Pipeline(_) => -1,
            Self::NoPhysicalDevice | Self::UnsupportedPlatform => 1,
        }
    }

    /// Exit code for any startup error, typed or not.
    pub fn exit_code_of(error: &anyhow::Error) -> i32 {
        error.downcast_ref::<Self>().map_or(1, Self::exit_code)
    }
}
