//! Partitioning of the simulation horizon into overlapping chunks.
use std::ops::Range;

/// A window of snapshots which is optimised in one go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the sequence
    pub index: usize,
    /// Indices of all the snapshots optimised in this chunk
    pub snapshots: Range<usize>,
    /// Indices of the snapshots whose results are kept
    pub retained: Range<usize>,
}

impl Chunk {
    /// Number of snapshots which are optimised but whose results are discarded
    pub fn overlap(&self) -> usize {
        self.snapshots.len() - self.retained.len()
    }
}

/// Split a horizon of `n` snapshots into chunks of `set_size` snapshots with `overlap` extra
/// snapshots of lookahead.
///
/// Chunk `i` covers `[i * set_size, min(i * set_size + set_size + overlap, n))` and retains its
/// first `set_size` snapshots. If `n` is not a multiple of `set_size`, a final chunk covers (and
/// retains) the remaining snapshots. A `set_size` of zero gives a single chunk covering the whole
/// horizon.
///
/// The retained ranges of the chunks are contiguous and together cover `0..n` exactly.
pub fn partition_horizon(n: usize, set_size: usize, overlap: usize) -> Vec<Chunk> {
    if n == 0 {
        return Vec::new();
    }
    if set_size == 0 {
        return vec![Chunk {
            index: 0,
            snapshots: 0..n,
            retained: 0..n,
        }];
    }

    let mut chunks: Vec<Chunk> = (0..n / set_size)
        .map(|index| {
            let start = index * set_size;
            Chunk {
                index,
                snapshots: start..(start + set_size + overlap).min(n),
                retained: start..start + set_size,
            }
        })
        .collect();

    let remainder = n % set_size;
    if remainder != 0 {
        let start = n - remainder;
        chunks.push(Chunk {
            index: chunks.len(),
            snapshots: start..n,
            retained: start..n,
        });
    }

    chunks
}
