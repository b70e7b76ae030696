use attlib_core::consts::SEGMENT_END;
use attlib_core::hash::{decode, encode};
use attlib_core::{ImageBuilder, IndexSegment, LayoutConfig, PageStore, SegmentStream};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_names(n: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(27);
    (0..n)
        .map(|_| {
            let len = rng.random_range(1..=6);
            (0..len).map(|_| char::from(b'A' + rng.random_range(0..26u8))).collect()
        })
        .collect()
}

/// 64 pages of index records with one anchor, followed by filler pages.
fn index_image() -> PageStore {
    let names = random_names(64 * 255);
    let mut words: Vec<u32> = names
        .iter()
        .enumerate()
        .flat_map(|(i, n)| [encode(n).unwrap_or(0x81BF2), (i as u32 % 4096) + 1])
        .collect();
    words.extend([encode("ELBO").unwrap_or(0x81BF2), 1, SEGMENT_END]);
    let mut b = ImageBuilder::new();
    b.page(8, &words);
    b.ensure_pages(96);
    PageStore::from_bytes(b.to_bytes(), &LayoutConfig::default(), 128).unwrap()
}

fn bench_codec(c: &mut Criterion) {
    let names = random_names(10_000);
    let hashes: Vec<u32> = names.iter().filter_map(|n| encode(n).ok()).collect();
    c.bench_function("encode", |bch| bch.iter(|| names.iter().filter_map(|n| encode(black_box(n)).ok()).count()));
    c.bench_function("decode", |bch| bch.iter(|| hashes.iter().filter_map(|h| decode(black_box(*h))).count()));
}

fn bench_segments(c: &mut Criterion) {
    let store = index_image();
    let anchors = [encode("ELBO").unwrap(), encode("SITE").unwrap()];
    c.bench_function("stream_words", |bch| bch.iter(|| SegmentStream::new(&store, 8).count()));
    c.bench_function("discover_index", |bch| {
        bch.iter(|| black_box(IndexSegment::discover(&store, &anchors).map(|s| s.len()).unwrap_or(0)))
    });
}

criterion_group!(benches, bench_codec, bench_segments);
criterion_main!(benches);
