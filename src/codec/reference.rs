//! A block floating-point quantizer standing in for the real ZFP orthogonal transform and
//! embedded bit-plane coder (out of scope for this crate; see the module-level docs in
//! `codec/mod.rs`). Every (scalar, rank) combination is served by the same generic core,
//! parameterized only over [`Scalar`].

use crate::bitstream::BitStream;
use crate::codec::{block_len, BlockCodec};
use crate::error::Result;
use crate::field::Scalar;
use crate::params::{Mode, Params};

/// Width of the shared per-block exponent field, stored as a biased two's-complement value.
pub(crate) const EMAX_BITS: u32 = 16;

#[derive(Debug, Clone, Copy)]
pub struct ReferenceCodec {
    rank: usize,
}

impl ReferenceCodec {
    pub fn new(rank: usize) -> Self {
        Self { rank }
    }

    pub fn block_len(&self) -> usize {
        block_len(self.rank)
    }
}

impl<S: Scalar> BlockCodec<S> for ReferenceCodec {
    fn encode_block(&self, block: &[S], params: &Params, stream: &mut BitStream<'_>) -> Result<u32> {
        debug_assert_eq!(block.len(), self.block_len());
        let start = stream.tell_w();
        let mode = params.mode();

        let is_zero = block.iter().all(|v| v.to_f64() == 0.0);
        if mode != Mode::FixedRate && is_zero {
            stream.write_bits(1, 1)?;
            return Ok((stream.tell_w() - start) as u32);
        }

        stream.write_bits(0, 1)?;

        if params.is_reversible() {
            for &v in block {
                stream.write_bits(v.to_raw_bits(), S::KIND.bit_width())?;
            }
            return Ok((stream.tell_w() - start) as u32);
        }

        let emax = block_emax(block, params.minexp);
        stream.write_bits((emax as i64 as u64) & mask(EMAX_BITS), EMAX_BITS)?;

        let prec = block_precision(params, emax, block.len() as u32, mode);
        // Values range over [2^emax, 2^(emax+1)) in magnitude, so normalizing by 2^(emax+1)
        // (one exponent above emax) is what maps that range inside a signed prec-bit field.
        let scale = 2f64.powi(emax - prec as i32 + 2);
        let half = (1u64 << (prec - 1)) as f64;

        for &v in block {
            let q = (v.to_f64() / scale).round().clamp(-half, half - 1.0) as i64;
            stream.write_bits(q as u64 & mask(prec), prec)?;
        }

        if mode == Mode::FixedRate {
            let used = (stream.tell_w() - start) as u32;
            let mut pad = params.maxbits.saturating_sub(used);
            // `pad` can exceed 64 bits (e.g. maxprec clamps prec well below maxbits/count), so it
            // has to be written in `write_bits`-sized chunks rather than a single call.
            while pad > 0 {
                let chunk = pad.min(64);
                stream.write_bits(0, chunk)?;
                pad -= chunk;
            }
        }

        Ok((stream.tell_w() - start) as u32)
    }

    fn decode_block(&self, stream: &mut BitStream<'_>, params: &Params, out: &mut [S]) {
        debug_assert_eq!(out.len(), self.block_len());
        let start = stream.tell_r();
        let mode = params.mode();

        let flag = stream.read_bits(1);
        if flag == 1 {
            for v in out.iter_mut() {
                *v = S::from_f64(0.0);
            }
            return;
        }

        if params.is_reversible() {
            for v in out.iter_mut() {
                let bits = stream.read_bits(S::KIND.bit_width());
                *v = S::from_raw_bits(bits);
            }
            return;
        }

        let emax = sign_extend(stream.read_bits(EMAX_BITS), EMAX_BITS) as i32;
        let prec = block_precision(params, emax, out.len() as u32, mode);
        let scale = 2f64.powi(emax - prec as i32 + 2);

        for v in out.iter_mut() {
            let raw = stream.read_bits(prec);
            let q = sign_extend(raw, prec);
            let value = q as f64 * scale;
            *v = if S::KIND.is_float() { S::from_f64(value) } else { S::from_signed_int(value.round() as i64) };
        }

        if mode == Mode::FixedRate {
            stream.seek_r(start + params.maxbits as usize);
        }
    }
}

/// The shared exponent of a block: the base-2 exponent of the largest magnitude present,
/// or `minexp` for an all-zero block (only reached from `FixedRate` mode, where the all-zero
/// short-circuit is disabled to preserve the exact-length invariant).
fn block_emax<S: Scalar>(block: &[S], minexp: i32) -> i32 {
    let max_abs = block.iter().map(|v| v.to_f64().abs()).fold(0.0_f64, f64::max);
    if max_abs == 0.0 {
        minexp
    } else {
        max_abs.log2().floor() as i32
    }
}

/// Per-block mantissa width. For `FixedAccuracy`/`Expert`, chosen so
/// `prec >= emax - minexp + 1`, which makes `|v - v'| <= 2^minexp` hold by construction. For
/// `FixedRate`, chosen (with zero-padding) so every block occupies exactly `maxbits`.
pub fn block_precision(params: &Params, emax: i32, count: u32, mode: Mode) -> u32 {
    let prec = match mode {
        Mode::FixedPrecision => params.maxprec,
        Mode::FixedAccuracy | Mode::Expert => {
            let needed = (emax - params.minexp + 1).max(1);
            (needed as u32).min(params.maxprec)
        }
        Mode::FixedRate => {
            let header_bits = 1 + EMAX_BITS;
            let remaining = params.maxbits.saturating_sub(header_bits);
            (remaining / count.max(1)).max(1)
        }
        Mode::Reversible => params.maxprec,
    };
    prec.clamp(1, 64)
}

fn mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

fn sign_extend(raw: u64, bits: u32) -> i64 {
    if bits >= 64 {
        return raw as i64;
    }
    let sign_bit = 1u64 << (bits - 1);
    if raw & sign_bit != 0 {
        (raw as i64) - (1i64 << bits)
    } else {
        raw as i64
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::BlockCodec;

    fn round_trip<S: Scalar + PartialEq + std::fmt::Debug>(block: &[S], params: &Params) -> Vec<S> {
        let codec = ReferenceCodec::new(1);
        let mut bytes = vec![0u8; 4096];
        let used;
        {
            let mut stream = BitStream::open(&mut bytes);
            used = codec.encode_block(block, params, &mut stream).unwrap();
            stream.flush().unwrap();
        }
        let mut out = vec![S::from_f64(0.0); block.len()];
        {
            let mut stream = BitStream::open(&mut bytes);
            codec.decode_block(&mut stream, params, &mut out);
        }
        let _ = used;
        out
    }

    #[test]
    fn all_zero_block_costs_a_single_bit() {
        let block = [0.0f32; 4];
        let params = Params::fixed_precision(20);
        let codec = ReferenceCodec::new(1);
        let mut bytes = vec![0u8; 64];
        let mut stream = BitStream::open(&mut bytes);
        let used = codec.encode_block(&block, &params, &mut stream).unwrap();
        assert_eq!(used, 1);
    }

    #[test]
    fn reversible_block_round_trips_exactly() {
        let block = [1.5f64, -2.25, 0.0, 12345.6789];
        let params = Params::reversible();
        let out = round_trip(&block, &params);
        assert_eq!(out, block);
    }

    #[test]
    fn fixed_accuracy_bounds_the_reconstruction_error() {
        let block = [1.0f32, -2.0, 3.5, -4.25];
        let minexp = -10;
        let params = Params::fixed_accuracy(minexp);
        let out = round_trip(&block, &params);
        for (original, reconstructed) in block.iter().zip(out.iter()) {
            let error = (*original as f64 - *reconstructed as f64).abs();
            assert!(error <= 2f64.powi(minexp), "error {} exceeds bound", error);
        }
    }

    #[test]
    fn fixed_rate_block_always_costs_exactly_maxbits() {
        let codec = ReferenceCodec::new(1);
        let params = Params::fixed_rate(128);
        for block in [[0.0f32; 4], [1.0, -1.0, 2.0, -2.0], [100.0, 0.0, -0.5, 7.0]] {
            let mut bytes = vec![0u8; 64];
            let mut stream = BitStream::open(&mut bytes);
            let used = codec.encode_block(&block, &params, &mut stream).unwrap();
            assert_eq!(used, 128);
        }
    }

    #[test]
    fn fixed_rate_with_a_maxbits_far_above_the_maxprec_ceiling_pads_without_panicking() {
        // maxprec clamps prec to 64 well before remaining/count would, so the zero-padding at the
        // end of the block has to span far more than one 64-bit `write_bits` call.
        let codec = ReferenceCodec::new(1);
        let params = Params::fixed_rate(2000);
        let block = [1.0f32, -1.0, 2.0, -2.0];
        let mut bytes = vec![0u8; 512];
        let mut stream = BitStream::open(&mut bytes);
        let used = codec.encode_block(&block, &params, &mut stream).unwrap();
        assert_eq!(used, 2000);
    }

    #[test]
    fn integer_blocks_round_trip_under_reversible_mode() {
        let block = [100i32, -50, 0, 2_000_000];
        let params = Params::reversible();
        let out = round_trip(&block, &params);
        assert_eq!(out, block);
    }
}
