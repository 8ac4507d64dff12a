use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::dataset::{DataSet, Datasets};
use crate::error::Result;
use crate::network::model::NUM_CLASSES;

const SIDE: usize = 32;
const BLOCK: usize = 8;

/// Generates a deterministic, linearly separable 10-class dataset of 32×32
/// images.
///
/// Class `c` lights up the `c`-th 8×8 cell of a 4×4 grid; every pixel also
/// gets uniform noise in `[0, 0.2)`. The same seed always yields the same
/// data.
pub fn synthetic(n_train: usize, n_test: usize, seed: u64) -> Result<Datasets> {
    let mut rng = StdRng::seed_from_u64(seed);
    let train = partition(n_train, &mut rng)?;
    let test = partition(n_test, &mut rng)?;
    Ok(Datasets { train, test })
}

fn partition(n: usize, rng: &mut StdRng) -> Result<DataSet> {
    let mut images = Vec::with_capacity(n * SIDE * SIDE);
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let class = rng.gen_range(0..NUM_CLASSES);
        let (cell_row, cell_col) = (class / 4, class % 4);
        for r in 0..SIDE {
            for c in 0..SIDE {
                let lit = r / BLOCK == cell_row && c / BLOCK == cell_col;
                let noise: f64 = rng.gen_range(0.0..0.2);
                images.push(if lit { 0.8 + noise } else { noise });
            }
        }
        labels.push(class);
    }
    DataSet::new(images, vec![SIDE * SIDE], labels, NUM_CLASSES)
}
