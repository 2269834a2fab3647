//! Property-style round-trip checks over randomly generated fields, in place of an exhaustive
//! encode/decode grid: shape, stride, and value are all randomized per run.

use zfp_chunked::config::Config;
use zfp_chunked::field::{Field, FieldMut};
use zfp_chunked::params::Params;
use zfp_chunked::pipeline;
use zfp_chunked::tiling::TilingMethod;

fn random_extents(rank: usize) -> [usize; 4] {
    let mut extents = [0usize; 4];
    for axis in 0..rank {
        extents[axis] = 1 + (rand::random::<u32>() % 23) as usize;
    }
    extents
}

#[test]
fn random_fixed_accuracy_fields_of_every_rank_stay_within_the_error_bound() {
    for rank in 1..=4 {
        for _ in 0..8 {
            let extents = random_extents(rank);
            let len: usize = extents.iter().filter(|&&e| e > 0).product();
            let data: Vec<f32> = (0..len).map(|_| rand::random::<f32>() * 200.0 - 100.0).collect();
            let field = Field::new(&data, extents).unwrap();

            let params = Params::fixed_accuracy(-8);
            let config = Config::new().with_tiling(TilingMethod::MakeEqual, 64);

            let bytes = pipeline::compress_fallible(&config, &params, &field).unwrap();
            let mut out = vec![0.0f32; len];
            let mut out_field = FieldMut::new(&mut out, extents).unwrap();
            pipeline::decompress_fallible(&config, &bytes, &mut out_field).unwrap();

            for (original, reconstructed) in data.iter().zip(out.iter()) {
                assert!(
                    (original - reconstructed).abs() <= 2f32.powi(-8) + 1e-3,
                    "rank {rank}, extents {extents:?}: {original} vs {reconstructed}"
                );
            }
        }
    }
}

#[test]
fn random_reversible_integer_fields_round_trip_bit_exactly() {
    for _ in 0..8 {
        let extents = random_extents(2);
        let len: usize = extents.iter().filter(|&&e| e > 0).product();
        let data: Vec<i32> = (0..len).map(|_| rand::random::<i32>() % 10_000).collect();
        let field = Field::new(&data, extents).unwrap();

        let params = Params::reversible();
        let config = Config::new();

        let bytes = pipeline::compress_fallible(&config, &params, &field).unwrap();
        let mut out = vec![0i32; len];
        let mut out_field = FieldMut::new(&mut out, extents).unwrap();
        pipeline::decompress_fallible(&config, &bytes, &mut out_field).unwrap();

        assert_eq!(out, data, "extents {extents:?}");
    }
}
