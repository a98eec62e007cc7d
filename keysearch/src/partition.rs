//! Static partitioning of the file list across a fixed number of workers.
//!
//! The first `workers - 1` chunks hold `len / workers` items each and the last
//! chunk absorbs the remainder. When there are fewer items than workers the
//! leading chunks are empty and the last chunk holds everything.
use std::num::NonZeroUsize;
use std::ops::Range;

/// Index ranges of each chunk, in order
pub fn chunk_bounds(len: usize, workers: NonZeroUsize) -> Vec<Range<usize>> {
    let workers = workers.get();
    let chunk_size = len / workers;

    (0..workers)
        .map(|i| {
            let start = i * chunk_size;
            let end = if i == workers - 1 {
                len
            } else {
                (i + 1) * chunk_size
            };
            start..end
        })
        .collect()
}

/// Splits `items` into exactly `workers` contiguous chunks
pub fn partition<T>(items: &[T], workers: NonZeroUsize) -> Vec<&[T]> {
    chunk_bounds(items.len(), workers)
        .into_iter()
        .map(|range| &items[range])
        .collect()
}
