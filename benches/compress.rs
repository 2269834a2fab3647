#[macro_use]
extern crate bencher;

use bencher::Bencher;

use zfp_chunked::config::Config;
use zfp_chunked::field::Field;
use zfp_chunked::params::Params;
use zfp_chunked::pipeline;
use zfp_chunked::tiling::TilingMethod;

fn cosine_plane(side: usize) -> Vec<f32> {
    (0..side * side)
        .map(|i| {
            let x = (i % side) as f64;
            let y = (i / side) as f64;
            ((x * 0.05).cos() * (y * 0.05).cos()) as f32
        })
        .collect()
}

/// Single-chunk compress of a modest plane, exercising the serial path (one chunk, no fan-out).
fn compress_single_chunk(bench: &mut Bencher) {
    let side = 64;
    let data = cosine_plane(side);
    let field = Field::new(&data, [side, side, 0, 0]).unwrap();
    let params = Params::fixed_accuracy(-16);
    let config = Config::new();

    bench.iter(|| {
        let bytes = pipeline::compress(&config, &params, &field);
        bencher::black_box(bytes);
    })
}

/// Multi-chunk parallel compress of a larger plane, with a small per-chunk target so the
/// parallel driver actually fans out across many chunks.
fn compress_many_chunks_parallel(bench: &mut Bencher) {
    let side = 512;
    let data = cosine_plane(side);
    let field = Field::new(&data, [side, side, 0, 0]).unwrap();
    let params = Params::fixed_accuracy(-16);
    let config = Config::new().with_tiling(TilingMethod::BestCache, 256);

    bench.iter(|| {
        let bytes = pipeline::compress(&config, &params, &field);
        bencher::black_box(bytes);
    })
}

/// The same workload as above, but tiled with `MakeEqual` instead of `BestCache`.
fn compress_many_chunks_make_equal(bench: &mut Bencher) {
    let side = 512;
    let data = cosine_plane(side);
    let field = Field::new(&data, [side, side, 0, 0]).unwrap();
    let params = Params::fixed_accuracy(-16);
    let config = Config::new().with_tiling(TilingMethod::MakeEqual, 256);

    bench.iter(|| {
        let bytes = pipeline::compress(&config, &params, &field);
        bencher::black_box(bytes);
    })
}

benchmark_group!(
    compress,
    compress_single_chunk,
    compress_many_chunks_parallel,
    compress_many_chunks_make_equal
);

benchmark_main!(compress);
