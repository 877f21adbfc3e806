use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lull_core::noise::{self, NoiseColor};
use lull_core::rng::create_rng;
use lull_core::texture::{self, TextureKind};

const SR: u32 = 48_000;

fn bench_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise_2s_stereo");
    for color in NoiseColor::ALL {
        group.bench_function(color.as_str(), |b| {
            let mut rng = create_rng(7);
            b.iter(|| noise::synthesize(black_box(color), 2 * SR as usize, 2, SR, &mut rng));
        });
    }
    group.finish();
}

fn bench_texture(c: &mut Criterion) {
    let mut group = c.benchmark_group("texture_4s_stereo");
    group.sample_size(20);
    for kind in TextureKind::ALL {
        group.bench_function(kind.as_str(), |b| {
            let mut rng = create_rng(7);
            b.iter(|| texture::synthesize(black_box(kind), 4 * SR as usize, 2, SR, &mut rng));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_noise, bench_texture);
criterion_main!(benches);
