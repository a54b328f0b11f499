use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashMap as HashbrownMap;
use paged_hash::LongLongHashMap;
use paged_hash::PagePool;
use paged_hash::hash_table::DEFAULT_MAX_LOAD_FACTOR;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Distribution;
use rand_distr::Zipf;

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn random_keys(count: usize, seed: u64) -> Vec<i64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count).map(|_| rng.random()).collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_random");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    let pool = PagePool::default();

    for &size in SIZES {
        let keys = random_keys(size, size as u64);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("paged_hash/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut map = LongLongHashMap::new(&pool).unwrap();
                    for key in keys {
                        black_box(map.put(key, key).unwrap());
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut map = HashbrownMap::new();
                    for key in keys {
                        black_box(map.insert(key, key));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_insert_preallocated(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_random_preallocated");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    let pool = PagePool::default();

    for &size in SIZES {
        let keys = random_keys(size, !(size as u64));
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("paged_hash/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut map =
                        LongLongHashMap::with_capacity(size, DEFAULT_MAX_LOAD_FACTOR, &pool)
                            .unwrap();
                    for key in keys {
                        black_box(map.put(key, key).unwrap());
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || keys.clone(),
                |keys| {
                    let mut map = HashbrownMap::with_capacity(size);
                    for key in keys {
                        black_box(map.insert(key, key));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_hit_miss");
    let pool = PagePool::default();

    for &size in SIZES {
        let keys = random_keys(size, 42 + size as u64);
        let mut probes = keys.clone();
        probes.extend(random_keys(size, 4242 + size as u64));
        probes.shuffle(&mut SmallRng::seed_from_u64(7));

        let mut paged = LongLongHashMap::new(&pool).unwrap();
        let mut brown = HashbrownMap::new();
        for &key in &keys {
            paged.put(key, key).unwrap();
            brown.insert(key, key);
        }

        group.throughput(Throughput::Elements(probes.len() as u64));
        group.bench_function(format!("paged_hash/{size}"), |b| {
            b.iter(|| {
                for &key in &probes {
                    black_box(paged.get(key));
                }
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for key in &probes {
                    black_box(brown.get(key));
                }
            })
        });
    }

    group.finish();
}

fn bench_zipf_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("zipf_counts");
    let pool = PagePool::default();

    for &size in SIZES {
        let zipf = Zipf::new(size as f64, 1.1).unwrap();
        let mut rng = SmallRng::seed_from_u64(size as u64);
        let keys: Vec<i64> = (0..size).map(|_| zipf.sample(&mut rng) as i64).collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("paged_hash/{size}"), |b| {
            b.iter(|| {
                let mut counts = LongLongHashMap::new(&pool).unwrap();
                for &key in &keys {
                    let current = counts.get(key).unwrap_or(0);
                    counts.put(key, current + 1).unwrap();
                }
                black_box(counts)
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                let mut counts = HashbrownMap::new();
                for &key in &keys {
                    *counts.entry(key).or_insert(0i64) += 1;
                }
                black_box(counts)
            })
        });
    }

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    let pool = PagePool::default();

    for &size in SIZES {
        let keys = random_keys(size, 99 + size as u64);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("paged_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut map = LongLongHashMap::new(&pool).unwrap();
                    for &key in &keys {
                        map.put(key, key).unwrap();
                    }
                    map
                },
                |mut map| {
                    for &key in &keys {
                        black_box(map.remove(key));
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            )
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || keys.iter().map(|&k| (k, k)).collect::<HashbrownMap<i64, i64>>(),
                |mut map| {
                    for key in &keys {
                        black_box(map.remove(key));
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_insert_preallocated,
    bench_find_hit_miss,
    bench_zipf_counts,
    bench_remove,
);

criterion_main!(benches);
