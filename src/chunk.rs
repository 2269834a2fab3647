//! A chunk is a half-open, block-aligned index window; a blocks descriptor records how many
//! chunks cover each axis and where each chunk's compressed payload begins in the stream.

use crate::error::{Error, Result};
use crate::field::Shape;

/// A half-open axis-aligned window, in element coordinates, aligned to 4-element block
/// boundaries except that the last window on an axis may end exactly at the axis extent.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Chunk {
    pub rank: usize,
    pub begin: [usize; 4],
    pub end: [usize; 4],
}

impl Chunk {
    pub fn whole_field(shape: &Shape) -> Self {
        let mut end = [1usize; 4];
        for axis in 0..shape.rank() {
            end[axis] = shape.extent(axis);
        }
        Self { rank: shape.rank(), begin: [0; 4], end }
    }

    /// Number of 4-wide blocks covered per active axis.
    pub fn block_counts(&self) -> [usize; 4] {
        let mut counts = [1usize; 4];
        for axis in 0..self.rank {
            counts[axis] = (self.end[axis] - self.begin[axis] + 3) / 4;
        }
        counts
    }

    pub fn block_count(&self) -> usize {
        (0..self.rank).map(|axis| self.block_counts()[axis]).product()
    }
}

/// Per-axis chunk counts plus the (nbeg+1)-long table of bit offsets delimiting each chunk's
/// compressed payload. `begs[nbeg]` is always the total payload length in bits.
#[derive(Debug, Clone)]
pub struct BlocksDescriptor {
    pub counts: [usize; 4],
    pub rank: usize,
    pub chunks: Vec<Chunk>,
    pub begs: Vec<u64>,
}

impl BlocksDescriptor {
    pub fn nbeg(&self) -> usize {
        self.chunks.len()
    }

    /// Validates the two invariants every blocks descriptor must satisfy after a compress pass:
    /// `begs` is strictly non-decreasing, and it has exactly `nbeg + 1` entries.
    pub fn validate(&self) -> Result<()> {
        if self.begs.len() != self.nbeg() + 1 {
            return Err(Error::bad_header(format!(
                "begs table has {} entries, expected {}", self.begs.len(), self.nbeg() + 1
            )));
        }
        if self.begs.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::bad_header("begs table is not non-decreasing"));
        }
        Ok(())
    }

    /// Exact bit length of chunk `i`'s compressed payload.
    pub fn chunk_bit_len(&self, i: usize) -> u64 {
        self.begs[i + 1] - self.begs[i]
    }

    /// Total payload length, in bits, across every chunk.
    pub fn total_bits(&self) -> u64 {
        *self.begs.last().unwrap_or(&0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whole_field_chunk_covers_every_block() {
        let shape = Shape::new([17, 0, 0, 0]).unwrap();
        let chunk = Chunk::whole_field(&shape);
        assert_eq!(chunk.block_counts(), [5, 1, 1, 1]);
        assert_eq!(chunk.block_count(), 5);
    }

    #[test]
    fn descriptor_validates_strictly_nondecreasing_begs() {
        let descriptor = BlocksDescriptor {
            counts: [2, 1, 1, 1],
            rank: 1,
            chunks: vec![
                Chunk { rank: 1, begin: [0, 0, 0, 0], end: [4, 1, 1, 1] },
                Chunk { rank: 1, begin: [4, 0, 0, 0], end: [8, 1, 1, 1] },
            ],
            begs: vec![0, 64, 128],
        };
        assert!(descriptor.validate().is_ok());
        assert_eq!(descriptor.chunk_bit_len(0), 64);
        assert_eq!(descriptor.total_bits(), 128);
    }

    #[test]
    fn descriptor_rejects_decreasing_begs() {
        let descriptor = BlocksDescriptor {
            counts: [1, 1, 1, 1],
            rank: 1,
            chunks: vec![Chunk { rank: 1, begin: [0, 0, 0, 0], end: [4, 1, 1, 1] }],
            begs: vec![64, 0],
        };
        assert!(descriptor.validate().is_err());
    }
}
