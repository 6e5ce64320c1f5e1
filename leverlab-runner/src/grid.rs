//! Lazy cartesian-product iteration over the hyperparameter grid.
//!
//! The grid is never materialized; an odometer over candidate indices yields
//! one `ParamSet` at a time so a sweep over millions of combinations holds
//! a single set in memory per worker.

use crate::config::ParamSpec;
use std::collections::BTreeMap;

/// One concrete hyperparameter assignment. BTreeMap keeps serialization and
/// logging order stable.
pub type ParamSet = BTreeMap<String, f64>;

/// Restartable lazy iterator over every combination of parameter candidates.
#[derive(Debug, Clone)]
pub struct GridIter {
    names: Vec<String>,
    candidates: Vec<Vec<f64>>,
    /// Odometer digits; None once exhausted.
    cursor: Option<Vec<usize>>,
}

impl GridIter {
    pub fn new(params: &BTreeMap<String, ParamSpec>) -> Self {
        let mut names = Vec::with_capacity(params.len());
        let mut candidates = Vec::with_capacity(params.len());
        for (name, spec) in params {
            names.push(name.clone());
            candidates.push(spec.candidates());
        }
        let cursor = if candidates.iter().any(|c| c.is_empty()) {
            None
        } else {
            Some(vec![0; candidates.len()])
        };
        Self {
            names,
            candidates,
            cursor,
        }
    }

    /// Total number of combinations.
    pub fn total(&self) -> usize {
        if self.candidates.iter().any(|c| c.is_empty()) {
            return 0;
        }
        self.candidates.iter().map(|c| c.len()).product()
    }

    /// Rewind to the first combination.
    pub fn reset(&mut self) {
        self.cursor = if self.candidates.iter().any(|c| c.is_empty()) {
            None
        } else {
            Some(vec![0; self.candidates.len()])
        };
    }

    /// Pull up to `n` combinations into a batch.
    pub fn take_batch(&mut self, n: usize) -> Vec<ParamSet> {
        let mut batch = Vec::with_capacity(n);
        for _ in 0..n {
            match self.next() {
                Some(set) => batch.push(set),
                None => break,
            }
        }
        batch
    }
}

impl Iterator for GridIter {
    type Item = ParamSet;

    fn next(&mut self) -> Option<ParamSet> {
        let cursor = self.cursor.as_mut()?;
        let mut set = ParamSet::new();
        for (i, name) in self.names.iter().enumerate() {
            set.insert(name.clone(), self.candidates[i][cursor[i]]);
        }

        // Advance the odometer, rightmost digit fastest.
        let mut i = cursor.len();
        loop {
            if i == 0 {
                self.cursor = None;
                break;
            }
            i -= 1;
            cursor[i] += 1;
            if cursor[i] < self.candidates[i].len() {
                break;
            }
            cursor[i] = 0;
        }
        Some(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ParamRange, ParamSpec};

    fn two_by_three() -> BTreeMap<String, ParamSpec> {
        let mut params = BTreeMap::new();
        params.insert(
            "a".to_string(),
            ParamSpec {
                value: 1.0,
                range: Some(ParamRange::Values {
                    values: vec![1.0, 2.0],
                }),
            },
        );
        params.insert(
            "b".to_string(),
            ParamSpec {
                value: 10.0,
                range: Some(ParamRange::Span {
                    min: 10.0,
                    max: 30.0,
                    step: 10.0,
                }),
            },
        );
        params
    }

    #[test]
    fn yields_full_cartesian_product() {
        let grid = GridIter::new(&two_by_three());
        assert_eq!(grid.total(), 6);
        let all: Vec<ParamSet> = grid.collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0]["a"], 1.0);
        assert_eq!(all[0]["b"], 10.0);
        assert_eq!(all[5]["a"], 2.0);
        assert_eq!(all[5]["b"], 30.0);
    }

    #[test]
    fn batches_partition_without_overlap() {
        let mut grid = GridIter::new(&two_by_three());
        let first = grid.take_batch(4);
        let second = grid.take_batch(4);
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 2);
        assert!(grid.take_batch(4).is_empty());
    }

    #[test]
    fn reset_restarts_iteration() {
        let mut grid = GridIter::new(&two_by_three());
        let first: Vec<ParamSet> = grid.by_ref().collect();
        grid.reset();
        let second: Vec<ParamSet> = grid.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_grid_yields_single_empty_set() {
        let grid = GridIter::new(&BTreeMap::new());
        let all: Vec<ParamSet> = grid.collect();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_empty());
    }

    #[test]
    fn fixed_params_appear_in_every_set() {
        let mut params = two_by_three();
        params.insert("c".to_string(), ParamSpec::fixed(42.0));
        let grid = GridIter::new(&params);
        assert_eq!(grid.total(), 6);
        assert!(grid.into_iter().all(|set| set["c"] == 42.0));
    }
}
