//! Weighted gesture selection
//!
//! Each gesture file is repeated `weight` times in a flat pool and picked
//! uniformly, so the chance of a gesture is proportional to its weight.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct GesturePool {
    pool: Vec<PathBuf>,
}

impl GesturePool {
    /// Expand `weights` (file name -> weight) with every file resolved against `dir`
    pub fn from_weights(weights: &BTreeMap<String, u32>, dir: &Path) -> Self {
        let mut pool = Vec::with_capacity(weights.values().map(|w| *w as usize).sum());
        for (name, weight) in weights {
            if *weight == 0 {
                debug!(gesture = %name, "skipping zero-weight gesture");
                continue;
            }
            let path = dir.join(name);
            pool.extend(std::iter::repeat(path).take(*weight as usize));
        }
        GesturePool { pool }
    }

    /// Uniform pick over the expanded pool; `None` when no gestures are configured
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Path> {
        if self.pool.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.pool.len());
        Some(self.pool[index].as_path())
    }

    /// Expanded pool size (sum of weights)
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn weights(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_expansion_repeats_by_weight() {
        let pool = GesturePool::from_weights(
            &weights(&[("b.json", 1), ("a.json", 2), ("c.json", 0)]),
            Path::new("resources"),
        );

        assert_eq!(pool.len(), 3);
        let names: Vec<_> = pool
            .entries()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.json", "a.json", "b.json"]);
        assert!(pool.entries()[0].starts_with("resources"));
    }

    #[test]
    fn test_empty_pool_picks_nothing() {
        let pool = GesturePool::from_weights(&BTreeMap::new(), Path::new("."));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(pool.is_empty());
        assert!(pool.pick(&mut rng).is_none());
    }

    #[test]
    fn test_two_to_one_ratio() {
        let pool = GesturePool::from_weights(&weights(&[("a", 2), ("b", 1)]), Path::new(""));
        let mut rng = StdRng::seed_from_u64(0xD15C);

        let samples = 30_000;
        let mut a = 0u32;
        for _ in 0..samples {
            if pool.pick(&mut rng).unwrap() == Path::new("a") {
                a += 1;
            }
        }
        let b = samples - a;
        let ratio = a as f64 / b as f64;
        assert!((ratio - 2.0).abs() < 0.15, "ratio {}", ratio);
    }

    #[test]
    fn test_seeded_picks_are_reproducible() {
        let pool = GesturePool::from_weights(&weights(&[("a", 3), ("b", 5)]), Path::new(""));
        let mut first = StdRng::seed_from_u64(42);
        let mut second = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            assert_eq!(pool.pick(&mut first), pool.pick(&mut second));
        }
    }
}
