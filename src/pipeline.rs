//! The public, top-level compress/decompress entry points.
//!
//! Mirrors the C API's "return a sentinel on failure" convention at this outermost layer only:
//! everything below (`driver`, `header`, `codec`) propagates a typed [`Error`]; `compress`
//! collapses a failure to an empty `Vec`, and `decompress` collapses it to `false`, so callers
//! porting code from the original library see the behavior they expect. Prefer
//! `compress_fallible`/`decompress_fallible` for normal Rust error handling.

use crate::chunk::Chunk;
use crate::config::Config;
use crate::driver::{self, Emission};
use crate::error::{Error, Result};
use crate::field::{Field, FieldMut, Scalar};
use crate::header::{self, HeaderKind};
use crate::params::Params;
use crate::tiling;

/// Upper bound, in bytes, on the compressed size of a field with the given `extents` under
/// `params` - header plus every chunk's worst-case payload, for a single whole-field chunk.
pub fn maximum_size<S: Scalar>(extents: [usize; 4], params: &Params) -> Result<usize> {
    let shape = crate::field::Shape::new(extents)?;
    let chunk = Chunk::whole_field(&shape);
    let payload = driver::chunk_region_bytes(&chunk, params, S::KIND);
    let header = (32 + 52 + 64) / 8 + 8; // classical header, long mode, rounded up with slack
    Ok(header + payload)
}

/// Compresses `field` under `params` using `config`'s tiling strategy and thread pool.
pub fn compress_fallible<S: Scalar>(config: &Config, params: &Params, field: &Field<S>) -> Result<Vec<u8>> {
    params.validate()?;
    let _span = tracing::info_span!("zfp_chunked::compress", rank = field.shape.rank()).entered();

    let mut descriptor = tiling::plan(&field.shape, config.target_blocks_per_chunk(), config.tiling_method())?;
    let pool = config.pool()?;

    let payload = driver::compress_chunks(field, params, &mut descriptor, Emission::Single, &pool)?;
    let bytes = match payload {
        driver::ChunkPayload::Single(bytes) => bytes,
        driver::ChunkPayload::Multi(_) => unreachable!("Emission::Single always yields ChunkPayload::Single"),
    };

    let mut out = Vec::with_capacity(bytes.len() + 64);
    if descriptor.nbeg() <= 1 {
        header::write_classical(&mut out, &field.shape, S::KIND, params)?;
    } else {
        header::write_chunked(&mut out, &field.shape, S::KIND, params, &descriptor)?;
    }
    out.extend_from_slice(&bytes);

    tracing::trace!(bytes = out.len(), chunks = descriptor.nbeg(), "compress finished");
    Ok(out)
}

/// Decompresses `data` into `field`, whose extents must already match the encoded shape.
pub fn decompress_fallible<S: Scalar>(config: &Config, data: &[u8], field: &mut FieldMut<S>) -> Result<()> {
    let _span = tracing::info_span!("zfp_chunked::decompress").entered();

    let header_kind = header::peek_kind(data)?;
    let parsed = match header_kind {
        HeaderKind::Classical => header::read_classical(data)?,
        HeaderKind::Chunked => header::read_chunked(data)?,
    };

    if parsed.shape.extents() != field.shape.extents() {
        tracing::error!("shape mismatch decompressing stream");
        return Err(Error::bad_header("decoded shape does not match destination field's extents"));
    }
    if parsed.kind != S::KIND {
        tracing::error!("scalar kind mismatch decompressing stream");
        return Err(Error::bad_scalar("stream scalar kind does not match destination field's scalar type"));
    }

    let pool = config.pool()?;
    let payload = &data[parsed.header_len_bytes..];

    let descriptor = match parsed.descriptor {
        Some(descriptor) => descriptor,
        None => tiling::rebuild(&parsed.shape, [1, 1, 1, 1], vec![0, (payload.len() * 8) as u64])?,
    };

    driver::decompress_single(payload, &parsed.params, &descriptor, field, &pool)?;
    tracing::trace!(chunks = descriptor.nbeg(), "decompress finished");
    Ok(())
}

/// Like [`compress_fallible`], but collapses any error to an empty `Vec`, matching the original
/// C API's "return 0 on failure" convention for callers porting code directly from it.
pub fn compress<S: Scalar>(config: &Config, params: &Params, field: &Field<S>) -> Vec<u8> {
    compress_fallible(config, params, field).unwrap_or_default()
}

/// Like [`decompress_fallible`], but collapses any error to `false`.
pub fn decompress<S: Scalar>(config: &Config, data: &[u8], field: &mut FieldMut<S>) -> bool {
    decompress_fallible(config, data, field).is_ok()
}

/// Compresses `field`, returning each chunk as an independently-addressable buffer alongside the
/// descriptor needed to make sense of them, for callers that want random access to sub-regions.
pub fn compress_chunks<S: Scalar>(
    config: &Config,
    params: &Params,
    field: &Field<S>,
) -> Result<(Vec<Vec<u8>>, crate::chunk::BlocksDescriptor)> {
    params.validate()?;
    let mut descriptor = tiling::plan(&field.shape, config.target_blocks_per_chunk(), config.tiling_method())?;
    let pool = config.pool()?;

    let payload = driver::compress_chunks(field, params, &mut descriptor, Emission::Multi, &pool)?;
    let buffers = match payload {
        driver::ChunkPayload::Multi(buffers) => buffers,
        driver::ChunkPayload::Single(_) => unreachable!("Emission::Multi always yields ChunkPayload::Multi"),
    };
    Ok((buffers, descriptor))
}

/// The symmetric inverse of [`compress_chunks`].
pub fn decompress_chunks<S: Scalar>(
    config: &Config,
    buffers: &[Vec<u8>],
    params: &Params,
    descriptor: &crate::chunk::BlocksDescriptor,
    field: &mut FieldMut<S>,
) -> Result<()> {
    let pool = config.pool()?;
    driver::decompress_multi(buffers, params, descriptor, field, &pool)
}
