use rand::{distributions::Open01, rngs::SmallRng, Rng, SeedableRng};

/// Draws `count` points uniformly from the open unit cube of `dimensions`
/// dimensions. Points are laid out row by row.
pub fn generate(dimensions: usize, count: usize, seed: u64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..dimensions * count)
        .map(|_| rng.sample::<f64, _>(Open01))
        .collect()
}

/// Extracts column `offset` of a row-major table with `width` entries per row.
pub fn column(data: &[f64], width: usize, offset: usize) -> Vec<f64> {
    data.chunks_exact(width).map(|row| row[offset]).collect()
}
