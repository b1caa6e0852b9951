use lab_structs::config::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    Disconnected { expected: usize, received: usize },
    InvalidConfig { reason: String },
    InvalidInput { reason: String },
    Kernel { reason: String },
    Spawn { reason: String },
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::Disconnected { expected, received } => write!(
                f,
                "The worker pool stopped after {} of {} completions",
                received, expected
            ),
            SolverError::InvalidConfig { reason } => write!(f, "Invalid configuration: {}", reason),
            SolverError::InvalidInput { reason } => write!(f, "Invalid input: {}", reason),
            SolverError::Kernel { reason } => write!(f, "Simulation failed: {}", reason),
            SolverError::Spawn { reason } => write!(f, "Failed to spawn a worker: {}", reason),
        }
    }
}

impl std::error::Error for SolverError {}

impl From<ConfigError> for SolverError {
    fn from(error: ConfigError) -> Self {
        SolverError::InvalidConfig {
            reason: error.to_string(),
        }
    }
}

pub type SolverResult<T> = std::result::Result<T, SolverError>;
