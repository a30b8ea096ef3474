mod cell_test;
mod golden_test;
mod model_test;

use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;

/// Deterministic RNG for tests that build cells or models.
pub(crate) fn test_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Fresh per-test output directory under the system temp dir.
pub(crate) fn test_out_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("recurrent_goldens_{}", tag));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
