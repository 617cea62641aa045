use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bulwark_augment::{CutMix, CutMixConfig};
use ndarray::{Array1, Array4};
use rand::{rngs::StdRng, SeedableRng};

fn bench_cutmix(c: &mut Criterion) {
    let mut group = c.benchmark_group("CutMix");

    let cutmix = CutMix::new(CutMixConfig::new(10).with_probability(1.0)).unwrap();
    let batch_size = 16;

    for (width, height) in [(32, 32), (224, 224), (416, 416)].iter() {
        group.throughput(criterion::Throughput::Elements(
            (batch_size * *width * *height) as u64,
        ));

        let parameter_string = format!("{}x{}", width, height);

        // NHWC batch with class index labels
        let images = Array4::<f32>::zeros((batch_size, *height, *width, 3)).into_dyn();
        let labels = Array1::from_shape_fn(batch_size, |i| (i % 10) as f32).into_dyn();

        group.bench_with_input(
            BenchmarkId::new("cutmix_f32", &parameter_string),
            &(&images, &labels),
            |b, i| {
                let (x, y) = (i.0.view(), i.1.view());
                let mut rng = StdRng::seed_from_u64(0);
                b.iter(|| {
                    let _ = black_box(cutmix.apply(x.clone(), y.clone(), &mut rng)).unwrap();
                })
            },
        );

        let images_u8 = images.mapv(|v| v as u8);

        group.bench_with_input(
            BenchmarkId::new("cutmix_u8", &parameter_string),
            &(&images_u8, &labels),
            |b, i| {
                let (x, y) = (i.0.view(), i.1.view());
                let mut rng = StdRng::seed_from_u64(0);
                b.iter(|| {
                    let _ = black_box(cutmix.apply(x.clone(), y.clone(), &mut rng)).unwrap();
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_cutmix);
criterion_main!(benches);
