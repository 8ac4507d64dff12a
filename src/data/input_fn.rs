use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::dataset::DataSet;
use crate::math::matrix::Matrix;

/// Feeds `(features, labels)` mini-batches from an in-memory `DataSet`.
///
/// - `num_epochs: None` repeats the data forever; `Some(n)` stops after `n`
///   full passes.
/// - With `shuffle` on, every pass uses a fresh permutation drawn from a
///   seeded RNG, so the batch sequence is reproducible.
/// - Batches run across pass boundaries: `n` examples over `e` epochs give
///   `ceil(n * e / batch_size)` batches, and only the final one may be
///   smaller than `batch_size`.
pub struct InputFn<'a> {
    data: &'a DataSet,
    batch_size: usize,
    num_epochs: Option<usize>,
    shuffle: bool,
    rng: StdRng,
    order: Vec<usize>,
    cursor: usize,
    epoch: usize,
}

impl<'a> InputFn<'a> {
    /// One unshuffled pass in batches of `batch_size` (at least 1).
    pub fn new(data: &'a DataSet, batch_size: usize) -> InputFn<'a> {
        InputFn {
            data,
            batch_size: batch_size.max(1),
            num_epochs: Some(1),
            shuffle: false,
            rng: StdRng::seed_from_u64(0),
            order: (0..data.num_examples()).collect(),
            cursor: 0,
            epoch: 0,
        }
    }

    pub fn num_epochs(mut self, num_epochs: Option<usize>) -> Self {
        self.num_epochs = num_epochs;
        self
    }

    pub fn shuffle(mut self, shuffle: bool, seed: u64) -> Self {
        self.shuffle = shuffle;
        self.rng = StdRng::seed_from_u64(seed);
        if shuffle {
            self.order.shuffle(&mut self.rng);
        }
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Completed passes over the data so far.
    pub fn epochs_completed(&self) -> usize {
        self.epoch
    }

    fn exhausted(&self) -> bool {
        self.data.is_empty() || self.num_epochs.is_some_and(|n| self.epoch >= n)
    }
}

impl Iterator for InputFn<'_> {
    type Item = (Matrix, Vec<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted() {
            return None;
        }

        // A batch that reaches the end of a pass is topped up from the next
        // one, so only the very last batch can come up short.
        let mut indices = Vec::with_capacity(self.batch_size);
        while indices.len() < self.batch_size && !self.exhausted() {
            let take = (self.batch_size - indices.len()).min(self.order.len() - self.cursor);
            indices.extend_from_slice(&self.order[self.cursor..self.cursor + take]);
            self.cursor += take;

            if self.cursor == self.order.len() {
                self.cursor = 0;
                self.epoch += 1;
                if self.shuffle {
                    self.order.shuffle(&mut self.rng);
                }
            }
        }

        Some(self.data.gather(&indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> DataSet {
        DataSet::new((0..n).map(|i| i as f64).collect(), vec![1], (0..n).map(|i| i % 10).collect(), 10)
            .unwrap()
    }

    #[test]
    fn single_pass_ends_with_partial_batch() {
        let ds = dataset(7);
        let batches: Vec<_> = InputFn::new(&ds, 3).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].0.data, vec![0.0, 1.0, 2.0]);
        assert_eq!(batches[2].1, vec![6]);
    }

    #[test]
    fn epochs_bound_the_number_of_examples() {
        let ds = dataset(10);
        let seen: usize = InputFn::new(&ds, 4)
            .num_epochs(Some(3))
            .shuffle(true, 9)
            .map(|(_, labels)| labels.len())
            .sum();
        assert_eq!(seen, 30);
    }

    #[test]
    fn batches_span_epoch_boundaries() {
        let ds = dataset(10);
        let batches: Vec<_> = InputFn::new(&ds, 4).num_epochs(Some(2)).collect();
        let sizes: Vec<usize> = batches.iter().map(|(_, labels)| labels.len()).collect();
        assert_eq!(sizes, vec![4, 4, 4, 4, 4]);
        // Third batch closes the first pass and opens the second.
        assert_eq!(batches[2].0.data, vec![8.0, 9.0, 0.0, 1.0]);
    }

    #[test]
    fn each_shuffled_pass_is_a_permutation() {
        let ds = dataset(12);
        let mut input = InputFn::new(&ds, 12).num_epochs(Some(2)).shuffle(true, 1);
        for _ in 0..2 {
            let (x, _) = input.next().unwrap();
            let mut values = x.data.clone();
            values.sort_by(f64::total_cmp);
            assert_eq!(values, (0..12).map(|i| i as f64).collect::<Vec<_>>());
        }
        assert!(input.next().is_none());
        assert_eq!(input.epochs_completed(), 2);
    }

    #[test]
    fn same_seed_gives_same_batches() {
        let ds = dataset(20);
        let a: Vec<_> = InputFn::new(&ds, 5).shuffle(true, 3).map(|(_, y)| y).collect();
        let b: Vec<_> = InputFn::new(&ds, 5).shuffle(true, 3).map(|(_, y)| y).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn unbounded_input_keeps_going() {
        let ds = dataset(3);
        let count = InputFn::new(&ds, 2).num_epochs(None).take(50).count();
        assert_eq!(count, 50);
    }

    #[test]
    fn empty_dataset_yields_nothing_even_when_repeating() {
        let ds = DataSet::new(vec![], vec![4], vec![], 10).unwrap();
        assert!(InputFn::new(&ds, 2).num_epochs(None).next().is_none());
    }
}
