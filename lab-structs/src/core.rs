use crate::serializable_struct_with_getters;
use serde::{Deserialize, Serialize};

serializable_struct_with_getters! {
    Progress {
        round: usize,
        // Highest total level among the nodes of the round.
        level: usize,
        requested: usize,
        misses: usize,
        total_requested: usize,
        total_misses: usize,
    }
}

serializable_struct_with_getters! {
    BatchStats {
        requested: usize,
        misses: usize,
    }
}

serializable_struct_with_getters! {
    Sample {
        inputs: usize,
        outputs: usize,
        points: Vec<f64>,
        values: Vec<f64>,
    }
}

impl Progress {
    pub fn miss_rate(&self) -> f64 {
        rate(self.misses, self.requested)
    }

    pub fn total_miss_rate(&self) -> f64 {
        rate(self.total_misses, self.total_requested)
    }
}

impl BatchStats {
    pub fn hits(&self) -> usize {
        self.requested - self.misses
    }
}

impl Sample {
    pub fn len(&self) -> usize {
        if self.outputs == 0 {
            0
        } else {
            self.values.len() / self.outputs
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values of one output across all points.
    pub fn output(&self, index: usize) -> Vec<f64> {
        lab_utils::column(&self.values, self.outputs, index)
    }
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
