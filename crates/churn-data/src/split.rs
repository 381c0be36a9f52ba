//! Seeded train/holdout split of row indices.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::DataError;

/// Row indices for the training and holdout sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    /// Rows used to fit the tree.
    pub train: Vec<usize>,
    /// Rows held out for evaluation.
    pub test: Vec<usize>,
}

/// Shuffle `0..n_rows` with a seeded ChaCha8 RNG and cut it in two.
///
/// The first `ceil(test_fraction * n_rows)` shuffled indices form the
/// holdout set, clamped so both sets keep at least one row.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::InvalidTestFraction`] | fraction not in (0.0, 1.0) |
/// | [`DataError::TooFewRows`] | fewer than 2 rows |
pub fn train_test_split(
    n_rows: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, DataError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(DataError::InvalidTestFraction {
            fraction: test_fraction,
        });
    }
    if n_rows < 2 {
        return Err(DataError::TooFewRows { n_rows });
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((test_fraction * n_rows as f64).ceil() as usize).clamp(1, n_rows - 1);
    let train = indices.split_off(n_test);
    debug!(n_train = train.len(), n_test, "split rows");

    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}
