use da_rpc_client::Cell;
use rand::seq::index;
use rand::Rng;

/// Shape of the block's data matrix as encoded by the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatrixDimensions {
    pub rows: u32,
    pub cols: u32,
}

impl MatrixDimensions {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Number of cells in the matrix.
    pub fn cells(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.cols)
    }
}

/// Picks the cells challenged for a block.
///
/// By default every coordinate is drawn independently, so the same cell may be
/// challenged twice within one block. With `distinct` set the draws are made
/// without replacement.
#[derive(Clone, Debug)]
pub struct SamplingStrategy {
    dims: MatrixDimensions,
    distinct: bool,
}

impl SamplingStrategy {
    pub fn new(dims: MatrixDimensions, distinct: bool) -> Self {
        Self { dims, distinct }
    }

    pub fn dimensions(&self) -> MatrixDimensions {
        self.dims
    }

    /// Returns exactly `k` cells drawn with the thread-local RNG.
    pub fn choose_samples(&self, k: usize) -> Vec<Cell> {
        self.choose_samples_with(&mut rand::thread_rng(), k)
    }

    pub fn choose_samples_with<R: Rng + ?Sized>(&self, rng: &mut R, k: usize) -> Vec<Cell> {
        let capacity = self.dims.cells();
        if self.distinct && (k as u64) <= capacity {
            let cols = u64::from(self.dims.cols);
            return index::sample(rng, capacity as usize, k)
                .into_iter()
                .map(|i| {
                    let i = i as u64;
                    Cell::new((i / cols) as u32, (i % cols) as u32)
                })
                .collect();
        }

        (0..k)
            .map(|_| {
                let col = rng.gen_range(0..self.dims.cols);
                let row = rng.gen_range(0..self.dims.rows);
                Cell::new(row, col)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_samples_are_counted_and_in_bounds() {
        let dims = MatrixDimensions::new(256, 256);
        let strategy = SamplingStrategy::new(dims, false);
        let mut rng = StdRng::seed_from_u64(7);

        for k in [1, 3, 16, 200] {
            let cells = strategy.choose_samples_with(&mut rng, k);
            assert_eq!(cells.len(), k);
            assert!(cells.iter().all(|c| c.row < dims.rows && c.col < dims.cols));
        }
    }

    #[test]
    fn test_non_square_matrix_respects_each_axis() {
        let dims = MatrixDimensions::new(2, 64);
        let strategy = SamplingStrategy::new(dims, false);
        let mut rng = StdRng::seed_from_u64(11);

        let cells = strategy.choose_samples_with(&mut rng, 500);
        assert!(cells.iter().all(|c| c.row < 2 && c.col < 64));
        assert!(cells.iter().any(|c| c.col >= 2), "columns must span the full width");
    }

    #[test]
    fn test_replacement_mode_allows_duplicates() {
        let strategy = SamplingStrategy::new(MatrixDimensions::new(1, 2), false);
        let mut rng = StdRng::seed_from_u64(3);

        let cells = strategy.choose_samples_with(&mut rng, 10);
        assert_eq!(cells.len(), 10);
        let unique: HashSet<_> = cells.iter().collect();
        assert!(unique.len() <= 2);
    }

    #[test]
    fn test_distinct_mode_never_repeats() {
        let dims = MatrixDimensions::new(4, 4);
        let strategy = SamplingStrategy::new(dims, true);
        let mut rng = StdRng::seed_from_u64(5);

        let cells = strategy.choose_samples_with(&mut rng, 16);
        let unique: HashSet<_> = cells.iter().collect();
        assert_eq!(cells.len(), 16);
        assert_eq!(unique.len(), 16);
        assert!(cells.iter().all(|c| c.row < 4 && c.col < 4));
    }

    #[test]
    fn test_distinct_mode_still_returns_k_when_matrix_is_too_small() {
        let strategy = SamplingStrategy::new(MatrixDimensions::new(1, 2), true);
        let cells = strategy.choose_samples(5);
        assert_eq!(cells.len(), 5);
    }

    #[test]
    fn test_zero_samples() {
        let strategy = SamplingStrategy::new(MatrixDimensions::new(256, 256), false);
        assert!(strategy.choose_samples(0).is_empty());
    }
}
