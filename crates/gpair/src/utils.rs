//! Parallelism configuration shared by the execution dispatcher.

use rayon::prelude::*;

/// Whether parallel execution is allowed.
///
/// A simple flag passed through the dispatcher. When `Parallel`, elementwise
/// sweeps may use `rayon` parallel iterators; when `Sequential` they iterate
/// in order on the calling thread. The thread pool itself is owned by the
/// caller; this crate only respects the flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if the rayon pool has multiple threads)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Fill `out[i] = f(i)` for every index, in parallel when allowed.
    ///
    /// Elements are written independently, so this is safe for any pure `f`.
    #[inline]
    pub fn maybe_par_fill<T, F>(self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        if self.is_parallel() {
            out.par_iter_mut()
                .enumerate()
                .for_each(|(i, slot)| *slot = f(i));
        } else {
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = f(i);
            }
        }
    }

    /// Map each element of `data` in place, in parallel when allowed.
    #[inline]
    pub fn maybe_par_map_inplace<T, F>(self, data: &mut [T], f: F)
    where
        T: Send + Copy,
        F: Fn(T) -> T + Sync,
    {
        if self.is_parallel() {
            data.par_iter_mut().for_each(|x| *x = f(*x));
        } else {
            for x in data.iter_mut() {
                *x = f(*x);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_threads_semantics() {
        assert!(!Parallelism::from_threads(1).is_parallel());
        assert!(Parallelism::from_threads(2).is_parallel());
        assert!(Parallelism::from_threads(8).is_parallel());
    }

    #[test]
    fn maybe_par_fill_matches_sequential() {
        let mut seq = vec![0usize; 100];
        let mut par = vec![0usize; 100];
        Parallelism::Sequential.maybe_par_fill(&mut seq, |i| i * 3);
        Parallelism::Parallel.maybe_par_fill(&mut par, |i| i * 3);
        assert_eq!(seq, par);
        assert_eq!(seq[7], 21);
    }

    #[test]
    fn maybe_par_map_inplace() {
        let mut data = vec![1.0f32, 2.0, 3.0];
        Parallelism::Parallel.maybe_par_map_inplace(&mut data, |x| x + 0.5);
        assert_eq!(data, vec![1.5, 2.5, 3.5]);
    }
}
