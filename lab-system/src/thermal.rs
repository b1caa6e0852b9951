use lab_structs::config::AnalysisConfig;
use ndarray::Array2;

/// Lumped thermal model: every core is an independent RC circuit driven by
/// its power and coupled to the ambience.
#[derive(Debug, Clone, PartialEq)]
pub struct Thermal {
    ambience: f64,
    decay: f64,
    gain: f64,
}

impl Thermal {
    pub fn new(config: &AnalysisConfig) -> Self {
        let decay = (-config.conductance * config.time_step / config.capacitance).exp();
        Self {
            ambience: config.ambience,
            decay,
            gain: (1.0 - decay) / config.conductance,
        }
    }

    /// Temperature at the end of every step, steps by cores, row-major.
    /// Power is constant within a step, so the update is exact.
    pub fn compute(&self, power: &Array2<f64>) -> Vec<f64> {
        let cores = power.ncols();
        let mut temperature = vec![self.ambience; cores];
        let mut result = Vec::with_capacity(power.len());
        for row in power.rows() {
            for (t, &p) in temperature.iter_mut().zip(row.iter()) {
                *t = self.ambience + (*t - self.ambience) * self.decay + p * self.gain;
            }
            result.extend_from_slice(&temperature);
        }
        result
    }
}
