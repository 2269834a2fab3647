//! The parallel chunk driver: sizes, compresses, and decompresses chunks concurrently.
//!
//! Grounded in the teacher's `ParallelBlockDecompressor` (`block/mod.rs`): a caller-supplied or
//! lazily-built `rayon::ThreadPool`, a custom panic handler that reports the failure instead of
//! silently swallowing it, and `pool.install(|| ... par_iter() ...)` to run the fan-out under
//! that pool rather than the global rayon pool. Every chunk writes into a disjoint byte region
//! obtained by repeated `split_at_mut` - no unsafe code is needed because the regions never
//! alias.

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::bitstream::BitStream;
use crate::chunk::{BlocksDescriptor, Chunk};
use crate::codec::{block_len, resolve, BlockCodec};
use crate::error::{Error, Result};
use crate::field::{Field, FieldMut, Scalar, ScalarKind};
use crate::params::Params;

/// Fixed per-block overhead: the zero-block flag plus the shared exponent field. Matches
/// `codec::reference::EMAX_BITS`'s contribution to every non-reversible block's header.
pub fn signbit_cost() -> u32 {
    1 + crate::codec::reference::EMAX_BITS
}

/// Worst-case bits a single block of `rank` dimensions and scalar `kind` can occupy under
/// `params`. Reversible blocks cost their full raw width; lossy blocks are bounded by the
/// quantizer's header overhead plus `maxprec` bits per element, clamped into `[minbits, maxbits]`.
pub fn per_block_bits(params: &Params, rank: usize, kind: ScalarKind) -> u32 {
    let count = block_len(rank) as u32;

    if params.is_reversible() {
        return 1 + count * kind.bit_width();
    }

    let overhead = signbit_cost();
    let payload = count * params.maxprec.min(64);
    (overhead + payload).clamp(params.minbits.max(1), params.maxbits.max(overhead + payload))
}

/// Upper bound, in bits, on a whole chunk's compressed payload.
pub fn upper_bound_bits(chunk: &Chunk, params: &Params, kind: ScalarKind) -> u64 {
    chunk.block_count() as u64 * per_block_bits(params, chunk.rank, kind) as u64
}

/// Byte length of the scratch region a chunk needs: the bit upper bound, rounded up to a whole
/// stream word, plus one extra word of slack for flush padding.
pub fn chunk_region_bytes(chunk: &Chunk, params: &Params, kind: ScalarKind) -> usize {
    let bits = upper_bound_bits(chunk, params, kind);
    let words = bits / 64 + 2;
    (words * 8) as usize
}

/// How a caller wants the compressed chunks handed back.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Emission {
    /// One independent, independently-addressable buffer per chunk.
    Multi,
    /// All chunks concatenated into a single buffer, addressed via `descriptor.begs`.
    Single,
}

/// The result of a parallel compress pass, shaped according to the requested [`Emission`].
pub enum ChunkPayload {
    Single(Vec<u8>),
    Multi(Vec<Vec<u8>>),
}

/// Builds a dedicated thread pool the same way the teacher builds its decompression pool: a
/// panic handler that reports failure instead of hanging, falling back to a `Result` rather than
/// panicking the caller's whole process.
pub fn default_pool() -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .panic_handler(|payload| {
            tracing::error!("zfp-chunked worker thread panicked: {:?}", payload);
        })
        .build()
        .map_err(|e| Error::unsupported(format!("failed to build thread pool: {}", e)))
}

/// Compresses every chunk in `descriptor` in parallel, filling in `descriptor.begs` with the
/// real per-chunk bit lengths as a side effect. The first chunk to fail short-circuits the whole
/// operation; its error is returned.
pub fn compress_chunks<S: Scalar>(
    field: &Field<S>,
    params: &Params,
    descriptor: &mut BlocksDescriptor,
    emission: Emission,
    pool: &ThreadPool,
) -> Result<ChunkPayload> {
    let codec = resolve::<S>(descriptor.rank)?;
    let kind = S::KIND;

    let mut scratch: Vec<Vec<u8>> = descriptor
        .chunks
        .iter()
        .map(|chunk| vec![0u8; chunk_region_bytes(chunk, params, kind)])
        .collect();

    let chunk_bit_lens: Vec<u64> = pool.install(|| -> Result<Vec<u64>> {
        scratch
            .par_iter_mut()
            .zip(descriptor.chunks.par_iter())
            .map(|(region, chunk)| encode_chunk(field, &codec, params, chunk, region))
            .collect()
    })?;

    for (i, &len) in chunk_bit_lens.iter().enumerate() {
        let budget = upper_bound_bits(&descriptor.chunks[i], params, kind);
        if len as f64 > budget as f64 * 0.95 {
            tracing::warn!(chunk = i, len, budget, "chunk payload is approaching its upper bound");
        }
    }

    let mut begs = Vec::with_capacity(descriptor.nbeg() + 1);
    begs.push(0u64);
    let mut running = 0u64;
    for &len in &chunk_bit_lens {
        running += len;
        begs.push(running);
    }
    descriptor.begs = begs;

    let trimmed: Vec<Vec<u8>> = scratch
        .iter()
        .zip(chunk_bit_lens.iter())
        .map(|(region, &len)| region[..((len + 7) / 8) as usize].to_vec())
        .collect();

    match emission {
        Emission::Multi => Ok(ChunkPayload::Multi(trimmed)),
        Emission::Single => {
            let mut joined = Vec::with_capacity((running as usize + 7) / 8);
            for buffer in &trimmed {
                joined.extend_from_slice(buffer);
            }
            Ok(ChunkPayload::Single(joined))
        }
    }
}

fn encode_chunk<S: Scalar>(
    field: &Field<S>,
    codec: &impl BlockCodec<S>,
    params: &Params,
    chunk: &Chunk,
    region: &mut [u8],
) -> Result<u64> {
    let block_len = block_len(chunk.rank);
    let block_counts = chunk.block_counts();
    let mut stream = BitStream::open(region);
    let mut buf = vec![S::from_f64(0.0); block_len];

    for bw in 0..block_counts[3] {
        for bz in 0..block_counts[2] {
            for by in 0..block_counts[1] {
                for bx in 0..block_counts[0] {
                    gather_block(field, chunk, [bx, by, bz, bw], &mut buf);
                    codec.encode_block(&buf, params, &mut stream)?;
                }
            }
        }
    }

    stream.flush()?;
    Ok(stream.high_water_bits() as u64)
}

/// Reads one `4^rank` block's worth of values out of `field`, repeating the last valid sample
/// along any axis truncated by the array edge (the standard ZFP edge-padding convention, applied
/// here so `BlockCodec` never has to special-case partial blocks).
fn gather_block<S: Scalar>(field: &Field<S>, chunk: &Chunk, block_index: [usize; 4], buf: &mut [S]) {
    let rank = chunk.rank;
    for (idx, slot) in buf.iter_mut().enumerate() {
        let mut rem = idx;
        let mut coords = [0usize; 4];
        for axis in 0..rank {
            let d = rem % 4;
            rem /= 4;
            let raw = chunk.begin[axis] + block_index[axis] * 4 + d;
            coords[axis] = raw.min(chunk.end[axis] - 1);
        }
        *slot = field.value(coords);
    }
}

/// Decompresses every chunk in `descriptor` against `data`, a single contiguous buffer addressed
/// by `descriptor.begs`. Decoding runs in parallel into per-chunk scratch buffers; scattering the
/// reconstructed values back into `field` (which may be arbitrarily strided) happens serially
/// afterward, matching the single join barrier the concurrency model calls for on this side.
pub fn decompress_single<S: Scalar>(
    data: &[u8],
    params: &Params,
    descriptor: &BlocksDescriptor,
    field: &mut FieldMut<S>,
    pool: &ThreadPool,
) -> Result<()> {
    descriptor.validate()?;
    let codec = resolve::<S>(descriptor.rank)?;

    let decoded: Vec<Vec<S>> = pool.install(|| -> Result<Vec<Vec<S>>> {
        descriptor
            .chunks
            .par_iter()
            .enumerate()
            .map(|(i, chunk)| {
                let start_bit = descriptor.begs[i] as usize;
                let end_byte = ((descriptor.begs[i + 1] + 7) / 8) as usize;
                let start_byte = (start_bit / 8).min(end_byte);
                let slice = &data[start_byte..end_byte];
                let mut owned = slice.to_vec();
                let mut stream = BitStream::open(&mut owned);
                decode_chunk(&codec, params, chunk, &mut stream)
            })
            .collect()
    })?;

    for (chunk, values) in descriptor.chunks.iter().zip(decoded.into_iter()) {
        scatter_chunk(field, chunk, &values);
    }

    Ok(())
}

/// Decompresses each independently-buffered chunk, in the shape produced by
/// [`Emission::Multi`].
pub fn decompress_multi<S: Scalar>(
    buffers: &[Vec<u8>],
    params: &Params,
    descriptor: &BlocksDescriptor,
    field: &mut FieldMut<S>,
    pool: &ThreadPool,
) -> Result<()> {
    if buffers.len() != descriptor.nbeg() {
        return Err(Error::bad_header(format!(
            "expected {} chunk buffers, got {}", descriptor.nbeg(), buffers.len()
        )));
    }
    let codec = resolve::<S>(descriptor.rank)?;

    let decoded: Vec<Vec<S>> = pool.install(|| -> Result<Vec<Vec<S>>> {
        buffers
            .par_iter()
            .zip(descriptor.chunks.par_iter())
            .map(|(buffer, chunk)| {
                let mut owned = buffer.clone();
                let mut stream = BitStream::open(&mut owned);
                decode_chunk(&codec, params, chunk, &mut stream)
            })
            .collect()
    })?;

    for (chunk, values) in descriptor.chunks.iter().zip(decoded.into_iter()) {
        scatter_chunk(field, chunk, &values);
    }

    Ok(())
}

fn decode_chunk<S: Scalar>(
    codec: &impl BlockCodec<S>,
    params: &Params,
    chunk: &Chunk,
    stream: &mut BitStream<'_>,
) -> Result<Vec<S>> {
    let block_len = block_len(chunk.rank);
    let block_counts = chunk.block_counts();
    let mut values = vec![S::from_f64(0.0); chunk.block_count() * block_len];
    let mut cursor = 0usize;

    for bw in 0..block_counts[3] {
        for bz in 0..block_counts[2] {
            for by in 0..block_counts[1] {
                for bx in 0..block_counts[0] {
                    let slot = &mut values[cursor..cursor + block_len];
                    codec.decode_block(stream, params, slot);
                    cursor += block_len;
                    let _ = (bx, by, bz, bw);
                }
            }
        }
    }

    Ok(values)
}

fn scatter_chunk<S: Scalar>(field: &mut FieldMut<S>, chunk: &Chunk, values: &[S]) {
    let rank = chunk.rank;
    let block_len_ = block_len(rank);
    let block_counts = chunk.block_counts();
    let mut cursor = 0usize;

    for bw in 0..block_counts[3] {
        for bz in 0..block_counts[2] {
            for by in 0..block_counts[1] {
                for bx in 0..block_counts[0] {
                    for idx in 0..block_len_ {
                        let mut rem = idx;
                        let mut coords = [0usize; 4];
                        let mut in_bounds = true;
                        for axis in 0..rank {
                            let d = rem % 4;
                            rem /= 4;
                            let raw = chunk.begin[axis] + [bx, by, bz, bw][axis] * 4 + d;
                            if raw >= chunk.end[axis] {
                                in_bounds = false;
                                break;
                            }
                            coords[axis] = raw;
                        }
                        if in_bounds {
                            field.set_value(coords, values[cursor + idx]);
                        }
                    }
                    cursor += block_len_;
                }
            }
        }
    }
}
