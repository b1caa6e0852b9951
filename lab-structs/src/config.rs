use crate::serializable_struct_with_getters;
use lab_utils::parse_natural_index;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

serializable_struct_with_getters! {
    Config {
        system: SystemConfig,
        probability: ProbabilityConfig,
        analysis: AnalysisConfig,
        interpolation: InterpolationConfig,
        solver: Option<SolverConfig>,
        assessment: Option<AssessmentConfig>,
    }
}

serializable_struct_with_getters! {
    SystemConfig {
        seed: u64,
        cores: usize,
        tasks: usize,
        // The cores whose temperature is observed; empty for all cores.
        #[serde(default)]
        core_index: String,
        // The tasks whose execution time is uncertain; empty for all tasks.
        #[serde(default)]
        task_index: String,
        #[serde(default)]
        target: Target,
    }
}

/// The quantity a simulation reports.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Temperature of the observed cores at every step.
    #[default]
    Temperature,
    /// Average power of the observed cores at every step.
    Power,
    /// End-to-end delay of the application.
    Delay,
    /// Dynamic energy of the application and its square.
    Energy,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Temperature => write!(f, "temperature"),
            Target::Power => write!(f, "power"),
            Target::Delay => write!(f, "delay"),
            Target::Energy => write!(f, "energy"),
        }
    }
}

serializable_struct_with_getters! {
    ProbabilityConfig {
        // Maximal delay of a task as a fraction of its execution time, in [0, 1).
        max_delay: f64,
        // Marginal distribution of the delays, e.g. "Beta(2, 5)" or "Uniform()".
        marginal: String,
        corr_length: f64,
        // Portion of the variance preserved by the reduced model, in (0, 1].
        var_threshold: f64,
    }
}

serializable_struct_with_getters! {
    AnalysisConfig {
        time_step: f64,
        ambience: f64,
        capacitance: f64,
        conductance: f64,
    }
}

serializable_struct_with_getters! {
    InterpolationConfig {
        min_level: usize,
        max_level: usize,
        tolerance: f64,
        max_nodes: Option<usize>,
    }
}

serializable_struct_with_getters! {
    SolverConfig {
        workers: Option<usize>,
        cache_capacity: Option<usize>,
    }
}

serializable_struct_with_getters! {
    AssessmentConfig {
        seed: u64,
        samples: usize,
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            workers: None,
            cache_capacity: None,
        }
    }
}

impl SolverConfig {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, |count| count.get())
        })
    }

    pub fn cache_capacity_or_default(&self) -> usize {
        self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
    InvalidIndex { field: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "The value of '{}' is invalid: {}", field, reason)
            }
            ConfigError::InvalidIndex { field, reason } => {
                write!(f, "The index '{}' is invalid: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

impl Config {
    pub fn validate(&self) -> ConfigResult<()> {
        self.system.validate()?;
        self.probability.validate()?;
        self.analysis.validate()?;
        self.interpolation.validate()?;
        if let Some(solver) = &self.solver {
            solver.validate()?;
        }
        Ok(())
    }

    pub fn solver_config(&self) -> SolverConfig {
        self.solver.clone().unwrap_or_default()
    }
}

impl SystemConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.cores == 0 {
            return Err(invalid("system.cores", "should be positive"));
        }
        if self.tasks == 0 {
            return Err(invalid("system.tasks", "should be positive"));
        }
        self.core_index()?;
        self.task_index()?;
        Ok(())
    }

    pub fn core_index(&self) -> ConfigResult<Vec<usize>> {
        parse_natural_index(&self.core_index, 0, self.cores.saturating_sub(1)).map_err(|e| {
            ConfigError::InvalidIndex {
                field: "system.core_index",
                reason: e.to_string(),
            }
        })
    }

    pub fn task_index(&self) -> ConfigResult<Vec<usize>> {
        parse_natural_index(&self.task_index, 0, self.tasks.saturating_sub(1)).map_err(|e| {
            ConfigError::InvalidIndex {
                field: "system.task_index",
                reason: e.to_string(),
            }
        })
    }
}

impl ProbabilityConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..1.0).contains(&self.max_delay) {
            return Err(invalid("probability.max_delay", "should be in [0, 1)"));
        }
        if !(self.corr_length > 0.0) {
            return Err(invalid("probability.corr_length", "should be positive"));
        }
        if !(self.var_threshold > 0.0 && self.var_threshold <= 1.0) {
            return Err(invalid("probability.var_threshold", "should be in (0, 1]"));
        }
        Ok(())
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.time_step > 0.0 && self.time_step.is_finite()) {
            return Err(invalid("analysis.time_step", "should be positive"));
        }
        if !self.ambience.is_finite() {
            return Err(invalid("analysis.ambience", "should be finite"));
        }
        if !(self.capacitance > 0.0) {
            return Err(invalid("analysis.capacitance", "should be positive"));
        }
        if !(self.conductance > 0.0) {
            return Err(invalid("analysis.conductance", "should be positive"));
        }
        Ok(())
    }
}

impl InterpolationConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            return Err(invalid(
                "interpolation.tolerance",
                "should be finite and nonnegative",
            ));
        }
        if self.min_level > self.max_level {
            return Err(invalid(
                "interpolation.min_level",
                "should not exceed the maximal level",
            ));
        }
        if self.max_nodes == Some(0) {
            return Err(invalid("interpolation.max_nodes", "should be positive"));
        }
        Ok(())
    }
}

impl SolverConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.workers == Some(0) {
            return Err(invalid("solver.workers", "should be positive"));
        }
        if self.cache_capacity == Some(0) {
            return Err(invalid("solver.cache_capacity", "should be positive"));
        }
        Ok(())
    }
}
