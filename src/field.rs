//! Scalar kinds and the field descriptor: shape, strides, and the 52-bit metadata word.

use crate::error::{Error, Result};

/// The four scalar kinds this codec understands.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    I32,
    I64,
    F32,
    F64,
}

impl ScalarKind {
    /// Bit width of the scalar's in-memory representation.
    pub fn bit_width(self) -> u32 {
        match self {
            ScalarKind::I32 | ScalarKind::F32 => 32,
            ScalarKind::I64 | ScalarKind::F64 => 64,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarKind::F32 | ScalarKind::F64)
    }

    pub fn byte_size(self) -> usize {
        (self.bit_width() / 8) as usize
    }

    /// The 1-based code packed into 2 bits of the classical metadata word (kind - 1).
    pub fn code(self) -> u8 {
        match self {
            ScalarKind::I32 => 0,
            ScalarKind::I64 => 1,
            ScalarKind::F32 => 2,
            ScalarKind::F64 => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ScalarKind::I32),
            1 => Ok(ScalarKind::I64),
            2 => Ok(ScalarKind::F32),
            3 => Ok(ScalarKind::F64),
            other => Err(Error::bad_scalar(format!("code {}", other))),
        }
    }
}

/// Rust-level scalar trait: connects a concrete numeric type to its [`ScalarKind`] and gives the
/// reference block codec (`codec::reference`) the bit-level and arithmetic views it needs, without
/// ever reaching for unsafe pointer casts.
pub trait Scalar: Copy + Send + Sync + Default + 'static {
    const KIND: ScalarKind;

    /// Full-width reversible bit pattern: two's complement for integers, IEEE-754 bits for floats.
    fn to_raw_bits(self) -> u64;
    fn from_raw_bits(bits: u64) -> Self;

    /// Signed-integer view used by the integer quantization path (identity for i32/i64).
    fn to_signed_int(self) -> i64;
    fn from_signed_int(v: i64) -> Self;

    /// `f64` view used by the float quantization path; exact for both f32 and f64 widening.
    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
}

impl Scalar for i32 {
    const KIND: ScalarKind = ScalarKind::I32;
    fn to_raw_bits(self) -> u64 { (self as u32) as u64 }
    fn from_raw_bits(bits: u64) -> Self { bits as u32 as i32 }
    fn to_signed_int(self) -> i64 { self as i64 }
    fn from_signed_int(v: i64) -> Self { v as i32 }
    fn to_f64(self) -> f64 { self as f64 }
    fn from_f64(v: f64) -> Self { v as i32 }
}

impl Scalar for i64 {
    const KIND: ScalarKind = ScalarKind::I64;
    fn to_raw_bits(self) -> u64 { self as u64 }
    fn from_raw_bits(bits: u64) -> Self { bits as i64 }
    fn to_signed_int(self) -> i64 { self }
    fn from_signed_int(v: i64) -> Self { v }
    fn to_f64(self) -> f64 { self as f64 }
    fn from_f64(v: f64) -> Self { v as i64 }
}

impl Scalar for f32 {
    const KIND: ScalarKind = ScalarKind::F32;
    fn to_raw_bits(self) -> u64 { self.to_bits() as u64 }
    fn from_raw_bits(bits: u64) -> Self { f32::from_bits(bits as u32) }
    fn to_signed_int(self) -> i64 { self as i64 }
    fn from_signed_int(v: i64) -> Self { v as f32 }
    fn to_f64(self) -> f64 { self as f64 }
    fn from_f64(v: f64) -> Self { v as f32 }
}

impl Scalar for f64 {
    const KIND: ScalarKind = ScalarKind::F64;
    fn to_raw_bits(self) -> u64 { self.to_bits() }
    fn from_raw_bits(bits: u64) -> Self { f64::from_bits(bits) }
    fn to_signed_int(self) -> i64 { self as i64 }
    fn from_signed_int(v: i64) -> Self { v as f64 }
    fn to_f64(self) -> f64 { self }
    fn from_f64(v: f64) -> Self { v }
}

/// Shape of a field: rank, per-axis extents, and per-axis strides (in elements). Strides are
/// always non-negative: a zero stride at construction time is normalized to its natural value,
/// so the lattice map stays injective without needing signed-stride bookkeeping.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Shape {
    extents: [usize; 4],
    strides: [usize; 4],
    rank: usize,
}

impl Shape {
    /// Builds a shape from extents alone; strides are the natural (row-major) ones.
    pub fn new(extents: [usize; 4]) -> Result<Self> {
        Self::with_strides(extents, [0, 0, 0, 0])
    }

    /// Builds a shape from extents and strides; any zero stride is normalized to natural.
    pub fn with_strides(extents: [usize; 4], strides: [usize; 4]) -> Result<Self> {
        let rank = extents.iter().take_while(|&&e| e != 0).count();
        if rank == 0 || rank > 4 {
            return Err(Error::BadRank(rank));
        }

        // every extent beyond `rank` must be absent (zero), matching "trailing zeros mark lower rank"
        if extents[rank..].iter().any(|&e| e != 0) {
            return Err(Error::BadRank(rank));
        }

        let mut natural = [1usize; 4];
        for axis in 1..4 {
            natural[axis] = natural[axis - 1] * extents[axis - 1].max(1);
        }

        let mut resolved = strides;
        for axis in 0..rank {
            if resolved[axis] == 0 {
                resolved[axis] = natural[axis];
            }
        }

        Ok(Self { extents, strides: resolved, rank })
    }

    pub fn rank(&self) -> usize { self.rank }
    pub fn extents(&self) -> [usize; 4] { self.extents }
    pub fn strides(&self) -> [usize; 4] { self.strides }

    pub fn extent(&self, axis: usize) -> usize {
        if axis < self.rank { self.extents[axis].max(1) } else { 1 }
    }

    pub fn stride(&self, axis: usize) -> usize {
        if axis < self.rank { self.strides[axis] } else { 0 }
    }

    /// Total element count: the product of active-axis extents.
    pub fn len(&self) -> usize {
        (0..self.rank).map(|axis| self.extent(axis)).product()
    }

    /// Number of elements spanned from the first to the last addressable element, inclusive.
    /// Strides are non-negative so the minimum offset is always 0.
    pub fn element_span(&self) -> usize {
        let max_offset: usize = (0..self.rank)
            .map(|axis| self.strides[axis] * (self.extent(axis) - 1))
            .sum();
        max_offset + 1
    }

    /// `(max_offset - min_offset + 1) * scalar_bytes`.
    pub fn byte_span(&self, scalar_bytes: usize) -> usize {
        self.element_span() * scalar_bytes
    }

    /// Number of 4-wide blocks per active axis (1 for inactive axes), rounding up.
    pub fn block_counts(&self) -> [usize; 4] {
        let mut counts = [1usize; 4];
        for axis in 0..self.rank {
            counts[axis] = (self.extent(axis) + 3) / 4;
        }
        counts
    }

    /// True unless every stride equals its natural (contiguous row-major) value.
    pub fn is_strided(&self) -> bool {
        let mut natural = [1usize; 4];
        for axis in 1..4 {
            natural[axis] = natural[axis - 1] * self.extent(axis - 1);
        }
        (0..self.rank).any(|axis| self.strides[axis] != natural[axis])
    }

    /// Flat element offset of the given per-axis coordinates (coordinates beyond `rank` ignored).
    pub fn offset(&self, coords: [usize; 4]) -> usize {
        (0..self.rank).map(|axis| coords[axis] * self.strides[axis]).sum()
    }

    /// Packs extents and a scalar kind into the 52-bit classical metadata word:
    /// 48 bits of `extent - 1` values (48/24/16/12 bits per axis for rank 1/2/3/4),
    /// 2 bits of `rank - 1`, 2 bits of `scalar kind - 1` (stored as `kind.code()`).
    pub fn metadata(&self, kind: ScalarKind) -> Result<u64> {
        let per_axis_bits: u32 = match self.rank {
            1 => 48,
            2 => 24,
            3 => 16,
            4 => 12,
            other => return Err(Error::BadRank(other)),
        };

        let mut packed: u64 = 0;
        let mut shift = 0u32;
        for axis in 0..self.rank {
            let value = (self.extent(axis) - 1) as u64;
            if per_axis_bits < 64 && value >= (1u64 << per_axis_bits) {
                return Err(Error::MetadataTooLarge { axis, extent: self.extent(axis) });
            }
            packed |= value << shift;
            shift += per_axis_bits;
        }

        packed |= ((self.rank as u64 - 1) & 0b11) << 48;
        packed |= (kind.code() as u64 & 0b11) << 50;
        Ok(packed)
    }

    /// The symmetric inverse of [`Shape::metadata`].
    pub fn from_metadata(meta: u64) -> Result<(Self, ScalarKind)> {
        let rank = ((meta >> 48) & 0b11) as usize + 1;
        let kind = ScalarKind::from_code(((meta >> 50) & 0b11) as u8)?;

        let per_axis_bits: u32 = match rank {
            1 => 48,
            2 => 24,
            3 => 16,
            4 => 12,
            other => return Err(Error::BadRank(other)),
        };

        let mut extents = [0usize; 4];
        let mask = if per_axis_bits >= 64 { u64::MAX } else { (1u64 << per_axis_bits) - 1 };
        for axis in 0..rank {
            let shift = per_axis_bits * axis as u32;
            extents[axis] = (((meta >> shift) & mask) + 1) as usize;
        }

        Ok((Self::new(extents)?, kind))
    }
}

/// A read-only field view: shape plus a borrowed slice of scalars, used by `compress`.
#[derive(Debug)]
pub struct Field<'a, S: Scalar> {
    pub shape: Shape,
    pub data: &'a [S],
}

impl<'a, S: Scalar> Field<'a, S> {
    pub fn new(data: &'a [S], extents: [usize; 4]) -> Result<Self> {
        let shape = Shape::new(extents)?;
        Self::checked(data, shape)
    }

    pub fn with_strides(data: &'a [S], extents: [usize; 4], strides: [usize; 4]) -> Result<Self> {
        let shape = Shape::with_strides(extents, strides)?;
        Self::checked(data, shape)
    }

    fn checked(data: &'a [S], shape: Shape) -> Result<Self> {
        let required = shape.element_span();
        if data.len() < required {
            return Err(Error::bad_scalar(format!(
                "field data slice too short: need {} elements, have {}", required, data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn value(&self, coords: [usize; 4]) -> S {
        self.data[self.shape.offset(coords)]
    }
}

/// A mutable field view, used by `decompress` to write reconstructed values back in place.
#[derive(Debug)]
pub struct FieldMut<'a, S: Scalar> {
    pub shape: Shape,
    pub data: &'a mut [S],
}

impl<'a, S: Scalar> FieldMut<'a, S> {
    pub fn new(data: &'a mut [S], extents: [usize; 4]) -> Result<Self> {
        let shape = Shape::new(extents)?;
        Self::checked(data, shape)
    }

    pub fn with_strides(data: &'a mut [S], extents: [usize; 4], strides: [usize; 4]) -> Result<Self> {
        let shape = Shape::with_strides(extents, strides)?;
        Self::checked(data, shape)
    }

    fn checked(data: &'a mut [S], shape: Shape) -> Result<Self> {
        let required = shape.element_span();
        if data.len() < required {
            return Err(Error::bad_scalar(format!(
                "field data slice too short: need {} elements, have {}", required, data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn set_value(&mut self, coords: [usize; 4], value: S) {
        let offset = self.shape.offset(coords);
        self.data[offset] = value;
    }

    pub fn value(&self, coords: [usize; 4]) -> S {
        self.data[self.shape.offset(coords)]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn natural_strides_are_row_major() {
        let shape = Shape::new([4, 3, 2, 0]).unwrap();
        assert_eq!(shape.rank(), 3);
        assert_eq!(shape.stride(0), 1);
        assert_eq!(shape.stride(1), 4);
        assert_eq!(shape.stride(2), 12);
        assert_eq!(shape.len(), 24);
        assert!(!shape.is_strided());
    }

    #[test]
    fn zero_stride_normalizes_to_natural_and_is_not_flagged_strided() {
        let shape = Shape::with_strides([17, 0, 0, 0], [0, 0, 0, 0]).unwrap();
        assert_eq!(shape.stride(0), 1);
        assert!(!shape.is_strided());
    }

    #[test]
    fn explicit_nonnatural_stride_is_flagged_strided() {
        // 500x500 field reading every other row: sx=1, sy=1000
        let shape = Shape::with_strides([500, 500, 0, 0], [1, 1000, 0, 0]).unwrap();
        assert!(shape.is_strided());
        assert_eq!(shape.block_counts(), [125, 125, 1, 1]);
    }

    #[test]
    fn metadata_round_trips_for_every_rank() {
        for (extents, kind) in [
            ([17usize, 0, 0, 0], ScalarKind::I32),
            ([8, 100, 0, 0], ScalarKind::I64),
            ([8, 100, 146, 0], ScalarKind::F32),
            ([8, 100, 100, 146], ScalarKind::F64),
        ] {
            let shape = Shape::new(extents).unwrap();
            let meta = shape.metadata(kind).unwrap();
            let (restored, restored_kind) = Shape::from_metadata(meta).unwrap();
            assert_eq!(restored.extents(), shape.extents());
            assert_eq!(restored.rank(), shape.rank());
            assert_eq!(restored_kind, kind);
        }
    }

    #[test]
    fn metadata_rejects_extent_exceeding_rank_budget() {
        // rank 4 gives only 12 bits per axis => max extent is 4096
        let shape = Shape::new([4097, 2, 2, 2]).unwrap();
        assert!(matches!(shape.metadata(ScalarKind::F32), Err(Error::MetadataTooLarge { axis: 0, .. })));
    }

    #[test]
    fn block_counts_round_up() {
        let shape = Shape::new([17, 0, 0, 0]).unwrap();
        assert_eq!(shape.block_counts(), [5, 1, 1, 1]);
    }
}
