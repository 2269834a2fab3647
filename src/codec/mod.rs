//! The block codec boundary: every scalar transform this crate knows how to run on a single
//! 4^rank (or smaller, at the array edge) block lives behind the [`BlockCodec`] trait.

pub mod reference;

use crate::bitstream::BitStream;
use crate::error::{Error, Result};
use crate::field::{Scalar, ScalarKind};
use crate::params::Params;

/// Encodes and decodes one block at a time for a fixed (scalar kind, rank) pair.
///
/// A block is always presented to the codec as a flat, fully-populated `4^rank` buffer in
/// storage order (x fastest); at the edge of the array, the driver first copies the partial
/// block into such a buffer by repeating the last valid sample along each truncated axis, the
/// same convention real ZFP uses to keep the per-block transform oblivious to edges.
pub trait BlockCodec<S: Scalar> {
    /// Writes one full block's compressed representation and returns the number of bits used.
    fn encode_block(&self, block: &[S], params: &Params, stream: &mut BitStream<'_>) -> Result<u32>;

    /// Reconstructs one full block from `stream`, starting at its current read cursor.
    fn decode_block(&self, stream: &mut BitStream<'_>, params: &Params, out: &mut [S]);
}

/// Block side length along every axis; blocks are always 4-wide regardless of rank.
pub const BLOCK_SIDE: usize = 4;

/// Number of scalars in a full block of the given rank.
pub fn block_len(rank: usize) -> usize {
    BLOCK_SIDE.pow(rank as u32)
}

/// Resolves the registered codec for `(S::KIND, rank)`. This crate ships exactly one concrete
/// codec family (`reference::ReferenceCodec`), registered for every rank 1..=4 and every scalar
/// kind; the dispatch still goes through this function so a future codec family (e.g. a real
/// ZFP bit-plane transform) can be added without touching callers.
pub fn resolve<S: Scalar>(rank: usize) -> Result<reference::ReferenceCodec> {
    if rank == 0 || rank > 4 {
        return Err(Error::BadRank(rank));
    }
    match S::KIND {
        ScalarKind::I32 | ScalarKind::I64 | ScalarKind::F32 | ScalarKind::F64 => {
            Ok(reference::ReferenceCodec::new(rank))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn block_len_matches_four_to_the_rank() {
        assert_eq!(block_len(1), 4);
        assert_eq!(block_len(2), 16);
        assert_eq!(block_len(3), 64);
        assert_eq!(block_len(4), 256);
    }

    #[test]
    fn resolve_rejects_out_of_range_rank() {
        assert!(resolve::<f32>(0).is_err());
        assert!(resolve::<f32>(5).is_err());
    }
}
