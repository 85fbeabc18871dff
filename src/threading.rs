//! Fork-join map-reduce over element ranges.
//!
//! The element range is halved recursively with `rayon::join` until either the
//! thread budget is exhausted or the range is no longer than
//! [`MIN_PARALLEL_LENGTH`]; each leaf is mapped sequentially and the partial
//! results are combined with an associative `reduce`.

use std::ops::Range;

use crate::MIN_PARALLEL_LENGTH;

/// Map every leaf range of `0..len` and combine the partial results.
///
/// `map` must return the identity of `reduce` for an empty range.
pub(crate) fn map_reduce<T, M, R>(len: usize, map: M, reduce: R) -> T
where
    T: Send,
    M: Fn(Range<usize>) -> T + Sync,
    R: Fn(T, T) -> T + Sync,
{
    #[cfg(feature = "parallel")]
    let nthreads = rayon::current_num_threads();
    #[cfg(not(feature = "parallel"))]
    let nthreads = 1;

    map_reduce_split(0..len, nthreads, &map, &reduce)
}

fn map_reduce_split<T, M, R>(range: Range<usize>, nthreads: usize, map: &M, reduce: &R) -> T
where
    T: Send,
    M: Fn(Range<usize>) -> T + Sync,
    R: Fn(T, T) -> T + Sync,
{
    if nthreads <= 1 || range.len() <= MIN_PARALLEL_LENGTH {
        return map(range);
    }

    let mid = range.start + range.len() / 2;
    let nt_left = nthreads / 2;
    let nt_right = nthreads - nt_left;

    #[cfg(feature = "parallel")]
    let (left, right) = rayon::join(
        || map_reduce_split(range.start..mid, nt_left, map, reduce),
        || map_reduce_split(mid..range.end, nt_right, map, reduce),
    );
    #[cfg(not(feature = "parallel"))]
    let (left, right) = (
        map_reduce_split(range.start..mid, nt_left, map, reduce),
        map_reduce_split(mid..range.end, nt_right, map, reduce),
    );

    reduce(left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_reduce_small_is_sequential() {
        let total = map_reduce(100, |r| r.sum::<usize>(), |a, b| a + b);
        assert_eq!(total, 4950);
    }

    #[test]
    fn test_map_reduce_large_matches_sequential() {
        let len = 4 * MIN_PARALLEL_LENGTH + 3;
        let total = map_reduce(len, |r| r.map(|i| i as u64).sum::<u64>(), |a, b| a + b);
        let expected = (len as u64 - 1) * len as u64 / 2;
        assert_eq!(total, expected);
    }

    #[test]
    fn test_map_reduce_empty() {
        let max = map_reduce(0, |r| r.max().unwrap_or(0), usize::max);
        assert_eq!(max, 0);
    }

    #[test]
    fn test_split_covers_every_index_once() {
        let len = 3 * MIN_PARALLEL_LENGTH;
        let ranges = map_reduce_split(
            0..len,
            8,
            &|r: Range<usize>| vec![r],
            &|mut a: Vec<Range<usize>>, b| {
                a.extend(b);
                a
            },
        );
        assert!(ranges.len() > 1);
        let mut next = 0;
        for r in ranges {
            assert_eq!(r.start, next);
            next = r.end;
        }
        assert_eq!(next, len);
    }
}
