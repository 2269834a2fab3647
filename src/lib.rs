#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused_extern_crates,
    unused,

    missing_copy_implementations,
    missing_debug_implementations,
)]

#![deny(
    unused_variables,
    unused_assignments,
    dead_code,
    unused_must_use,
    trivial_numeric_casts,
    redundant_semicolon
)]

#![forbid(unsafe_code)]

//! Parallel, randomly-addressable chunked compression for regular 1-4D numeric arrays, in the
//! style of ZFP's chunked (`zfp-par`) stream format: a field is tiled into block-aligned chunks,
//! each chunk is compressed independently (in parallel, if the `rayon` feature is enabled), and a
//! `begs` bit-offset table lets a caller decompress any one chunk without touching the others.
//!
//! The real ZFP per-block transform (the orthogonal lifting transform plus embedded bit-plane
//! coder) is out of scope here; [`codec::reference::ReferenceCodec`] is a simpler block
//! floating-point quantizer that satisfies the same `minbits`/`maxbits`/`maxprec`/`minexp`
//! contract, so the chunking, tiling, and parallel-driver machinery has a concrete, testable
//! collaborator to sit on top of.

pub mod bitstream;
pub mod chunk;
pub mod codec;
pub mod consts;
pub mod error;
pub mod field;
pub mod header;
pub mod params;
pub mod tiling;

#[cfg(feature = "rayon")]
pub mod config;
#[cfg(feature = "rayon")]
pub mod driver;
#[cfg(feature = "rayon")]
pub mod pipeline;

/// Re-exports of the types needed for a straightforward compress/decompress round trip.
pub mod prelude {
    pub use crate::chunk::{BlocksDescriptor, Chunk};
    pub use crate::error::{Error, Result};
    pub use crate::field::{Field, FieldMut, Scalar, ScalarKind, Shape};
    pub use crate::params::{Mode, Params};
    pub use crate::tiling::TilingMethod;

    #[cfg(feature = "rayon")]
    pub use crate::config::Config;
    #[cfg(feature = "rayon")]
    pub use crate::pipeline::{compress, compress_fallible, decompress, decompress_fallible};
}
