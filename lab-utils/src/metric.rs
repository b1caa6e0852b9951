use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub mean_error: f64,
    pub variance_error: f64,
    pub distance: f64,
}

/// Compares an approximation against a reference sample of the same quantity.
///
/// Moment errors are relative to the reference, or absolute where the
/// reference moment is zero.
pub fn assess(reference: &[f64], approximation: &[f64]) -> Assessment {
    let (mu1, v1) = (reference.iter().mean(), reference.iter().variance());
    let (mu2, v2) = (approximation.iter().mean(), approximation.iter().variance());
    Assessment {
        mean_error: error(mu1, mu2),
        variance_error: error(v1, v2),
        distance: kolmogorov_smirnov(reference, approximation),
    }
}

fn error(reference: f64, approximation: f64) -> f64 {
    if reference == 0.0 {
        (reference - approximation).abs()
    } else {
        ((reference - approximation) / reference).abs()
    }
}

/// Two-sample Kolmogorov–Smirnov statistic.
pub fn kolmogorov_smirnov(data1: &[f64], data2: &[f64]) -> f64 {
    if data1.is_empty() || data2.is_empty() {
        return 0.0;
    }

    let mut data1 = data1.to_vec();
    let mut data2 = data2.to_vec();
    data1.sort_by(|a, b| a.total_cmp(b));
    data2.sort_by(|a, b| a.total_cmp(b));

    let (n1, n2) = (data1.len() as f64, data2.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut distance: f64 = 0.0;
    while i < data1.len() && j < data2.len() {
        let x = data1[i].min(data2[j]);
        while i < data1.len() && data1[i] <= x {
            i += 1;
        }
        while j < data2.len() && data2[j] <= x {
            j += 1;
        }
        distance = distance.max((i as f64 / n1 - j as f64 / n2).abs());
    }

    distance
}
