use thiserror::Error;

/// Recoverable failures of the inference core.
///
/// Every variant is reported to the caller as a distinct outcome; nothing in the
/// core retries or aborts on its own.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error(
        "IRLS did not converge within {max_iterations} iterations (last coefficient change {last_change:.3e})"
    )]
    NonConvergence {
        max_iterations: usize,
        last_change: f64,
    },

    #[error("Design matrix is not full rank: {0}")]
    SingularDesign(String),

    #[error("Interval for '{term}' is undefined: standard error is {std_error}")]
    UndefinedInterval { term: String, std_error: f64 },

    #[error("Invalid grouping: {0}")]
    InvalidGrouping(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl InferenceError {
    /// Process exit code used by the `logit` binary for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            InferenceError::InvalidInput(_) | InferenceError::InvalidGrouping(_) => 2,
            InferenceError::NonConvergence { .. } | InferenceError::SingularDesign(_) => 3,
            InferenceError::UndefinedInterval { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<InferenceError> for AppError {
    fn from(err: InferenceError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_errors_map_to_exit_codes() {
        let err: AppError = InferenceError::SingularDesign("rank 2 < 4".to_string()).into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("rank 2 < 4"));

        let err: AppError = InferenceError::InvalidGrouping("unknown key 'color'".to_string()).into();
        assert_eq!(err.exit_code(), 2);
    }
}
