//! Stream header codecs: the classical single-payload layout (small header, short-or-long mode)
//! and the chunked layout (fixed-size long-mode header plus a `begs` random-access table).

use crate::bitstream::BitStream;
use crate::chunk::BlocksDescriptor;
use crate::consts::{CODEC_VERSION, MAGIC_BITS, META_BITS};
use crate::error::{Error, Result};
use crate::field::{ScalarKind, Shape};
use crate::params::Params;
use crate::tiling;

const MAGIC_TAG: u64 = 0x7a_66_70; // "zfp", ascii, top 24 bits of the magic word

fn magic_word() -> u64 {
    (MAGIC_TAG << 8) | CODEC_VERSION as u64
}

/// The chunked header packs extents, `nbeg`, and per-axis chunk counts into 32-bit fields; reject
/// anything that would silently truncate rather than write a header that decodes to a wrong shape.
fn check_fits_u32(values: impl Iterator<Item = usize>, what: &str) -> Result<()> {
    for value in values {
        if value > u32::MAX as usize {
            return Err(Error::bad_header(format!("{} {} does not fit the chunked header's 32-bit field", what, value)));
        }
    }
    Ok(())
}

fn check_magic(found: u64) -> Result<()> {
    if found != magic_word() {
        return Err(Error::bad_header(format!(
            "bad magic/version: found {:#x}, expected {:#x}", found, magic_word()
        )));
    }
    Ok(())
}

/// Reads `n` bits, failing with `BadHeader` instead of panicking when `data` is too short to
/// contain a well-formed header (corrupt or truncated input).
fn read_checked(stream: &mut BitStream<'_>, n: u32) -> Result<u64> {
    if stream.tell_r() + n as usize > stream.capacity_bits() {
        return Err(Error::bad_header("stream truncated while reading header"));
    }
    Ok(stream.read_bits(n))
}

/// Advances past any alignment padding, failing if that padding would run past the buffer.
fn align_checked(stream: &mut BitStream<'_>) -> Result<()> {
    stream.align();
    if stream.tell_r() > stream.capacity_bits() {
        return Err(Error::bad_header("stream truncated while reading header"));
    }
    Ok(())
}

/// Which header layout a stream uses. Chosen by the pipeline based on whether the field was
/// split into more than one chunk: a single chunk never needs a `begs` table at all.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum HeaderKind {
    Classical,
    Chunked,
}

impl HeaderKind {
    fn tag(self) -> u64 {
        match self {
            HeaderKind::Classical => 0,
            HeaderKind::Chunked => 1,
        }
    }

    fn from_tag(tag: u64) -> Result<Self> {
        match tag {
            0 => Ok(HeaderKind::Classical),
            1 => Ok(HeaderKind::Chunked),
            other => Err(Error::bad_header(format!("unknown header kind tag {}", other))),
        }
    }
}

/// Reads just enough of `data` (magic plus a 1-byte kind tag) to know which of
/// [`read_classical`]/[`read_chunked`] to call next.
pub fn peek_kind(data: &[u8]) -> Result<HeaderKind> {
    if data.len() < 5 {
        return Err(Error::bad_header("stream too short to contain a header"));
    }
    let mut scratch = data[..5].to_vec();
    let mut stream = BitStream::open(&mut scratch);
    check_magic(read_checked(&mut stream, MAGIC_BITS)?)?;
    HeaderKind::from_tag(read_checked(&mut stream, 8)?)
}

/// Writes the small classical header: magic, the 52-bit packed shape/scalar metadata, and the
/// mode in its short (<=12-bit) or long (64-bit) form. Byte-aligned on exit.
pub fn write_classical(out: &mut Vec<u8>, shape: &Shape, kind: ScalarKind, params: &Params) -> Result<()> {
    let mut scratch = vec![0u8; 32];
    {
        let mut stream = BitStream::open(&mut scratch);
        stream.write_bits(magic_word(), MAGIC_BITS)?;
        stream.write_bits(HeaderKind::Classical.tag(), 8)?;
        stream.write_bits(shape.metadata(kind)?, META_BITS)?;

        if params.needs_long_encoding() {
            stream.write_bits(params.to_long_bits(), 64)?;
        } else {
            stream.write_bits(params.encode_mode(), 12)?;
        }
        stream.flush()?;
        let len = (stream.high_water_bits() + 7) / 8;
        out.extend_from_slice(&scratch[..len]);
    }
    Ok(())
}

/// The parsed result of reading either header layout.
pub struct ParsedHeader {
    pub shape: Shape,
    pub kind: ScalarKind,
    pub params: Params,
    pub descriptor: Option<BlocksDescriptor>,
    pub header_len_bytes: usize,
}

/// Reads a classical header from the front of `data`. Every read is bounds-checked against
/// `data`'s actual length, so a truncated or corrupt stream fails with `BadHeader` rather than
/// panicking.
pub fn read_classical(data: &[u8]) -> Result<ParsedHeader> {
    if data.len() < 8 {
        return Err(Error::bad_header("stream too short for a classical header"));
    }
    let mut scratch = data.to_vec();
    let mut stream = BitStream::open(&mut scratch);

    check_magic(read_checked(&mut stream, MAGIC_BITS)?)?;
    let found_kind = HeaderKind::from_tag(read_checked(&mut stream, 8)?)?;
    if found_kind != HeaderKind::Classical {
        return Err(Error::bad_header("expected a classical header"));
    }
    let meta = read_checked(&mut stream, META_BITS)?;
    let (shape, kind) = Shape::from_metadata(meta)?;

    // peek 12 bits to decide short vs long, then re-read the right width
    let before_mode = stream.tell_r();
    let probe = read_checked(&mut stream, 12)?;
    let params = if probe & 0xfff == 0xfff {
        stream.seek_r(before_mode);
        Params::from_long_bits(read_checked(&mut stream, 64)?)
    } else {
        Params::decode_mode(probe)?
    };

    align_checked(&mut stream)?;
    let header_len_bytes = stream.tell_r() / 8;
    if header_len_bytes > data.len() {
        return Err(Error::bad_header("stream truncated while reading header"));
    }
    Ok(ParsedHeader { shape, kind, params, descriptor: None, header_len_bytes })
}

/// Writes the chunked header: magic, the kind-tag byte, scalar tag, per-axis extents (zero marks
/// an absent axis, rank is recovered from this on read), the long-form mode, `nbeg`, per-axis
/// chunk counts, word-alignment padding, then the `begs` table itself. Field widths (everything
/// past the kind tag) follow the chunked header layout exactly: extents and `nbeg` are 32 bits.
pub fn write_chunked(
    out: &mut Vec<u8>,
    shape: &Shape,
    kind: ScalarKind,
    params: &Params,
    descriptor: &BlocksDescriptor,
) -> Result<()> {
    descriptor.validate()?;
    check_fits_u32(shape.extents().iter().copied(), "extent")?;
    check_fits_u32(std::iter::once(descriptor.nbeg()), "nbeg")?;
    check_fits_u32(descriptor.counts.iter().copied(), "chunk count")?;

    let header_bits = 32 + 8 + 8 + 4 * 32 + 64 + 32 + 4 * 32;
    let header_words = (header_bits + 63) / 64 + 1;
    let begs_words = descriptor.begs.len();
    let mut scratch = vec![0u8; (header_words + begs_words) * 8];

    let len;
    {
        let mut stream = BitStream::open(&mut scratch);
        stream.write_bits(magic_word(), MAGIC_BITS)?;
        stream.write_bits(HeaderKind::Chunked.tag(), 8)?;
        stream.write_bits(kind.code() as u64, 8)?;
        for axis in 0..4 {
            stream.write_bits(shape.extents()[axis] as u64, 32)?;
        }
        stream.write_bits(params.to_long_bits(), 64)?;
        stream.write_bits(descriptor.nbeg() as u64, 32)?;
        for axis in 0..4 {
            stream.write_bits(descriptor.counts[axis] as u64, 32)?;
        }
        stream.flush()?; // word-align before the begs table

        for &beg in &descriptor.begs {
            stream.write_bits(beg, 64)?;
        }
        stream.flush()?;
        len = (stream.high_water_bits() + 7) / 8;
    }
    out.extend_from_slice(&scratch[..len]);
    Ok(())
}

/// Reads a chunked header from the front of `data`, rebuilding the exact chunk windows the
/// original `plan` call produced. Every read is bounds-checked against `data`'s actual length,
/// so a truncated or corrupt stream fails with `BadHeader` rather than panicking or attempting an
/// unreasonably large allocation for the `begs` table.
pub fn read_chunked(data: &[u8]) -> Result<ParsedHeader> {
    if data.len() < 8 {
        return Err(Error::bad_header("stream too short for a chunked header"));
    }
    let mut scratch = data.to_vec();
    let mut stream = BitStream::open(&mut scratch);

    check_magic(read_checked(&mut stream, MAGIC_BITS)?)?;
    let found_kind = HeaderKind::from_tag(read_checked(&mut stream, 8)?)?;
    if found_kind != HeaderKind::Chunked {
        return Err(Error::bad_header("expected a chunked header"));
    }
    let kind = ScalarKind::from_code(read_checked(&mut stream, 8)? as u8)?;

    let mut extents = [0usize; 4];
    for axis in 0..4 {
        extents[axis] = read_checked(&mut stream, 32)? as usize;
    }
    let shape = Shape::new(extents)?;

    let params = Params::from_long_bits(read_checked(&mut stream, 64)?);
    let nbeg = read_checked(&mut stream, 32)? as usize;

    let mut counts = [1usize; 4];
    for axis in 0..4 {
        counts[axis] = read_checked(&mut stream, 32)? as usize;
    }
    align_checked(&mut stream)?;

    // Validate nbeg against the remaining buffer before allocating `begs`, so a corrupt/hostile
    // nbeg can't drive an unreasonably large allocation ahead of the per-read bounds check below.
    let remaining_bits = (stream.capacity_bits() - stream.tell_r()) as u128;
    let required_bits = (nbeg as u128 + 1) * 64;
    if required_bits > remaining_bits {
        return Err(Error::bad_header("begs table length is inconsistent with the stream length"));
    }

    let mut begs = Vec::with_capacity(nbeg + 1);
    for _ in 0..=nbeg {
        begs.push(read_checked(&mut stream, 64)?);
    }
    align_checked(&mut stream)?;

    let descriptor = tiling::rebuild(&shape, counts, begs)?;
    let header_len_bytes = stream.tell_r() / 8;
    if header_len_bytes > data.len() {
        return Err(Error::bad_header("stream truncated while reading header"));
    }
    Ok(ParsedHeader { shape, kind, params, descriptor: Some(descriptor), header_len_bytes })
}
